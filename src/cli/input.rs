//! Local checks applied to flag values before anything is sent to the hub.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::AnkrError;
use crate::hub::proto::{CustomValue, TaskType, custom_value};

const MAX_NAME_LEN: usize = 63;

static DNS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").unwrap());

fn invalid(msg: String) -> AnkrError {
    AnkrError::InvalidInput(msg)
}

/// Resource names become Kubernetes object names, so they must be DNS labels.
pub(crate) fn resource_name(name: &str) -> Result<(), AnkrError> {
    if name.len() > MAX_NAME_LEN || !DNS_LABEL.is_match(name) {
        return Err(invalid(format!(
            "`{name}` is not a valid name: use at most {MAX_NAME_LEN} lowercase letters, digits \
             or '-', starting and ending with a letter or digit"
        )));
    }
    Ok(())
}

pub(crate) fn replica(n: i64) -> Result<i32, AnkrError> {
    match i32::try_from(n) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(format!("replica must be a positive number, got {n}"))),
    }
}

pub(crate) fn task_type(s: &str) -> Result<TaskType, AnkrError> {
    match s.trim().to_lowercase().as_str() {
        "" | "deployment" => Ok(TaskType::Deployment),
        "job" => Ok(TaskType::Job),
        "cronjob" => Ok(TaskType::CronJob),
        _ => Err(invalid(format!(
            "unknown task type `{s}`; expected one of: Deployment, Job, CronJob"
        ))),
    }
}

/// CronJob tasks need a schedule; other kinds must not carry one.
pub(crate) fn schedule(kind: TaskType, schedule: &str) -> Result<(), AnkrError> {
    match (kind, schedule.trim().is_empty()) {
        (TaskType::CronJob, true) => Err(AnkrError::MissingArguments(String::from(
            "ankr.task.create.schedule",
        ))),
        (TaskType::CronJob, false) => {
            let fields = schedule.split_whitespace().count();
            if fields == 5 {
                Ok(())
            } else {
                Err(invalid(format!(
                    "schedule `{schedule}` must have 5 cron fields, found {fields}"
                )))
            }
        }
        (_, true) => Ok(()),
        (other, false) => Err(invalid(format!(
            "--schedule only applies to CronJob tasks, not {}",
            other.as_str()
        ))),
    }
}

/// An empty version selects the chart's latest release.
pub(crate) fn chart_version(version: &str) -> Result<(), AnkrError> {
    if version.is_empty() {
        return Ok(());
    }
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|e| invalid(format!("chart version `{version}` is not semver: {e}")))
}

/// Parses `key:value` pairs. Values become booleans or integers when they
/// look like one, strings otherwise.
pub(crate) fn custom_values(entries: &[String]) -> Result<Vec<CustomValue>, AnkrError> {
    entries
        .iter()
        .map(|entry| {
            let (key, value) = entry
                .split_once(':')
                .filter(|(key, _)| !key.trim().is_empty())
                .ok_or_else(|| {
                    invalid(format!("custom value `{entry}` must look like key:value"))
                })?;

            let value = value.trim();
            let typed = if let Ok(b) = value.parse::<bool>() {
                custom_value::Value::Bool(b)
            } else if let Ok(i) = value.parse::<i64>() {
                custom_value::Value::Int(i)
            } else {
                custom_value::Value::Str(value.to_string())
            };

            Ok(CustomValue {
                key: key.trim().to_string(),
                value: Some(typed),
            })
        })
        .collect()
}

pub(crate) fn amount(amount: &str) -> Result<String, AnkrError> {
    let amount = amount.trim();
    let positive =
        DECIMAL.is_match(amount) && amount.chars().any(|c| c.is_ascii_digit() && c != '0');
    if !positive {
        return Err(invalid(format!("amount `{amount}` must be a positive decimal")));
    }
    Ok(amount.to_string())
}

pub(crate) fn email(email: &str) -> Result<(), AnkrError> {
    match email.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(invalid(format!("`{email}` is not an email address"))),
    }
}
