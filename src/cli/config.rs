use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::error::AnkrError;

/// Namespace of the root command. Keys looked up under it are not prefixed.
pub(crate) const NS_ROOT: &str = "ankr";

pub(crate) const ENV_PREFIX: &str = "ANKR";
pub(crate) const DEFAULT_CONTEXT: &str = "default";
pub(crate) const CONFIG_FILE_NAME: &str = "config.yaml";

const REQUIRED_PREFIX: &str = "required";
const AUTH_CONTEXTS: &str = "auth-contexts";
const CURRENT_CONTEXT: &str = "current-context";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConfigValue {
    Str(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
}

impl ConfigValue {
    fn render(&self) -> String {
        match self {
            ConfigValue::Str(s) => s.clone(),
            ConfigValue::Bool(b) => b.to_string(),
            ConfigValue::Int(i) => i.to_string(),
            ConfigValue::List(items) => items.join(","),
        }
    }

    fn from_yaml(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ConfigValue::Str(s.clone())),
            Value::Bool(b) => Some(ConfigValue::Bool(*b)),
            Value::Number(n) => Some(
                n.as_i64()
                    .map(ConfigValue::Int)
                    .unwrap_or_else(|| ConfigValue::Str(n.to_string())),
            ),
            Value::Sequence(items) => Some(ConfigValue::List(
                items
                    .iter()
                    .filter_map(|item| Self::from_yaml(item).map(|v| v.render()))
                    .collect(),
            )),
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
            Value::Null | Value::Mapping(_) => None,
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(value: Vec<String>) -> Self {
        ConfigValue::List(value)
    }
}

/// Stored credentials for one auth context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub(crate) struct Credentials {
    pub(crate) token: String,
    pub(crate) refresh_token: String,
    pub(crate) user_id: String,
}

/// Layered key/value settings for a single invocation.
///
/// Lookups resolve, in order: values given on the command line (or written
/// with [`Config::set`]), `ANKR_*` environment variables, the YAML config
/// file, and finally flag defaults.
#[derive(Debug, Default)]
pub(crate) struct Config {
    explicit: BTreeMap<String, ConfigValue>,
    env: BTreeMap<String, String>,
    file: BTreeMap<String, ConfigValue>,
    defaults: BTreeMap<String, ConfigValue>,
    document: Mapping,
    path: Option<PathBuf>,
    from_command_line: BTreeSet<String>,
}

impl Config {
    pub(crate) fn new(env: BTreeMap<String, String>) -> Self {
        Self {
            env,
            ..Default::default()
        }
    }

    pub(crate) fn from_process_env() -> Self {
        Self::new(std::env::vars().collect())
    }

    /// `$XDG_CONFIG_HOME/ankr/config.yaml`, or `ANKR_CONFIG` when set.
    pub(crate) fn default_path(&self) -> Result<PathBuf, AnkrError> {
        if let Some(path) = self.env.get(&format!("{ENV_PREFIX}_CONFIG")) {
            return Ok(PathBuf::from(path));
        }

        let xdg = xdg::BaseDirectories::with_prefix("ankr")?;
        Ok(xdg.get_config_file(CONFIG_FILE_NAME))
    }

    /// Replaces the file layer with the contents of `path`. A missing file is
    /// treated as empty.
    #[tracing::instrument(skip(self))]
    pub(crate) fn load_file(&mut self, path: &Path) -> Result<(), AnkrError> {
        let document = match std::fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Mapping::new(),
            Ok(contents) => match serde_yaml::from_str::<Value>(&contents)? {
                Value::Mapping(mapping) => mapping,
                Value::Null => Mapping::new(),
                _ => {
                    return Err(AnkrError::InvalidInput(format!(
                        "{} must contain a mapping at the top level",
                        path.display()
                    )));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config file at {}", path.display());
                Mapping::new()
            }
            Err(e) => return Err(e.into()),
        };

        self.document = document;
        self.path = Some(path.to_path_buf());
        self.reflatten();

        Ok(())
    }

    pub(crate) fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn save(&self) -> Result<(), AnkrError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => self.default_path()?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_yaml::to_string(&Value::Mapping(self.document.clone()))?;
        std::fs::write(&path, contents)?;
        tracing::debug!("wrote config to {}", path.display());

        Ok(())
    }

    fn reflatten(&mut self) {
        let mut file = BTreeMap::new();
        flatten("", &self.document, &mut file);
        self.file = file;
    }

    fn storage_key(ns: &str, key: &str) -> String {
        if ns == NS_ROOT {
            key.to_string()
        } else {
            format!("{ns}.{key}")
        }
    }

    fn env_key(storage_key: &str) -> String {
        let stripped = storage_key
            .strip_prefix(&format!("{NS_ROOT}."))
            .unwrap_or(storage_key);
        format!(
            "{ENV_PREFIX}_{}",
            stripped.replace(['.', '-'], "_").to_uppercase()
        )
    }

    fn lookup(&self, storage_key: &str) -> Option<ConfigValue> {
        if let Some(value) = self.explicit.get(storage_key) {
            return Some(value.clone());
        }
        if let Some(value) = self.env.get(&Self::env_key(storage_key)) {
            return Some(ConfigValue::Str(value.clone()));
        }
        self.file
            .get(storage_key)
            .or_else(|| self.defaults.get(storage_key))
            .cloned()
    }

    fn is_required(&self, ns: &str, key: &str) -> Result<bool, AnkrError> {
        if ns == NS_ROOT {
            return Ok(false);
        }

        let marker = format!("{REQUIRED_PREFIX}.{ns}.{key}");
        self.get_bool(NS_ROOT, &marker)
    }

    fn missing(ns: &str, key: &str) -> AnkrError {
        AnkrError::MissingArguments(Self::storage_key(ns, key))
    }

    pub(crate) fn get_string(&self, ns: &str, key: &str) -> Result<String, AnkrError> {
        let value = self
            .lookup(&Self::storage_key(ns, key))
            .map(|v| v.render())
            .unwrap_or_default();

        if value.is_empty() && self.is_required(ns, key)? {
            return Err(Self::missing(ns, key));
        }

        Ok(value)
    }

    pub(crate) fn get_bool(&self, ns: &str, key: &str) -> Result<bool, AnkrError> {
        let storage_key = Self::storage_key(ns, key);
        match self.lookup(&storage_key) {
            None => Ok(false),
            Some(ConfigValue::Bool(b)) => Ok(b),
            Some(ConfigValue::Int(i)) => Ok(i != 0),
            Some(ConfigValue::Str(s)) => parse_bool(&s).ok_or_else(|| {
                AnkrError::InvalidInput(format!("{storage_key}: `{s}` is not a boolean"))
            }),
            Some(ConfigValue::List(_)) => Err(AnkrError::InvalidInput(format!(
                "{storage_key}: expected a boolean, found a list"
            ))),
        }
    }

    pub(crate) fn get_int(&self, ns: &str, key: &str) -> Result<i64, AnkrError> {
        let storage_key = Self::storage_key(ns, key);
        let value = match self.lookup(&storage_key) {
            None => 0,
            Some(ConfigValue::Int(i)) => i,
            Some(ConfigValue::Bool(b)) => i64::from(b),
            Some(ConfigValue::Str(s)) if s.trim().is_empty() => 0,
            Some(ConfigValue::Str(s)) => s.trim().parse::<i64>().map_err(|_| {
                AnkrError::InvalidInput(format!("{storage_key}: `{s}` is not an integer"))
            })?,
            Some(ConfigValue::List(_)) => {
                return Err(AnkrError::InvalidInput(format!(
                    "{storage_key}: expected an integer, found a list"
                )));
            }
        };

        if value == 0 && self.is_required(ns, key)? {
            return Err(Self::missing(ns, key));
        }

        Ok(value)
    }

    pub(crate) fn get_string_slice(&self, ns: &str, key: &str) -> Result<Vec<String>, AnkrError> {
        let values = match self.lookup(&Self::storage_key(ns, key)) {
            None => Vec::new(),
            Some(ConfigValue::List(items)) => items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !is_empty_placeholder(item))
                .collect(),
            Some(other) => split_list(&other.render()),
        };

        if values.is_empty() && self.is_required(ns, key)? {
            return Err(Self::missing(ns, key));
        }

        Ok(values)
    }

    /// Writes a value directly, skipping required checks.
    pub(crate) fn set(&mut self, ns: &str, key: &str, value: impl Into<ConfigValue>) {
        self.explicit
            .insert(Self::storage_key(ns, key), value.into());
    }

    pub(crate) fn mark_required(&mut self, ns: &str, key: &str) {
        self.explicit
            .insert(format!("{REQUIRED_PREFIX}.{ns}.{key}"), ConfigValue::Bool(true));
    }

    pub(crate) fn bind_command_line(&mut self, ns: &str, key: &str, value: ConfigValue) {
        self.from_command_line.insert(Self::storage_key(ns, key));
        self.set(ns, key, value);
    }

    pub(crate) fn bind_default(&mut self, ns: &str, key: &str, value: ConfigValue) {
        self.defaults.insert(Self::storage_key(ns, key), value);
    }

    /// Whether the flag `key` of command `ns` was given on the command line
    /// for this invocation, regardless of its resolved value.
    pub(crate) fn is_set(&self, ns: &str, key: &str) -> bool {
        self.from_command_line.contains(&Self::storage_key(ns, key))
    }

    pub(crate) fn current_context(&self) -> Result<String, AnkrError> {
        let flag = self.get_string(NS_ROOT, "context")?;
        if !flag.is_empty() {
            return Ok(flag);
        }

        let current = self.get_string(NS_ROOT, CURRENT_CONTEXT)?;
        if current.is_empty() {
            Ok(DEFAULT_CONTEXT.to_string())
        } else {
            Ok(current)
        }
    }

    pub(crate) fn context_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self
            .auth_contexts()
            .map(|contexts| {
                contexts
                    .keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        names.insert(DEFAULT_CONTEXT.to_string());

        names.into_iter().collect()
    }

    fn auth_contexts(&self) -> Option<&Mapping> {
        self.document.get(AUTH_CONTEXTS).and_then(Value::as_mapping)
    }

    fn update_auth_contexts(&mut self, update: impl FnOnce(&mut Mapping)) {
        let mut contexts = match self.document.remove(AUTH_CONTEXTS) {
            Some(Value::Mapping(contexts)) => contexts,
            _ => Mapping::new(),
        };
        update(&mut contexts);
        self.document
            .insert(Value::String(AUTH_CONTEXTS.to_string()), Value::Mapping(contexts));
        self.reflatten();
    }

    pub(crate) fn credentials(&self, context: &str) -> Result<Option<Credentials>, AnkrError> {
        match self.auth_contexts().and_then(|contexts| contexts.get(context)) {
            Some(value) => Ok(Some(serde_yaml::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub(crate) fn store_credentials(
        &mut self,
        context: &str,
        credentials: &Credentials,
    ) -> Result<(), AnkrError> {
        let value = serde_yaml::to_value(credentials)?;
        self.update_auth_contexts(|contexts| {
            contexts.insert(Value::String(context.to_string()), value);
        });

        Ok(())
    }

    pub(crate) fn clear_credentials(&mut self, context: &str) {
        self.update_auth_contexts(|contexts| {
            contexts.remove(context);
        });
    }

    pub(crate) fn switch_context(&mut self, context: &str) -> Result<(), AnkrError> {
        if !self.context_names().iter().any(|name| name == context) {
            return Err(AnkrError::UnknownContext(context.to_string()));
        }

        self.document.insert(
            Value::String(CURRENT_CONTEXT.to_string()),
            Value::String(context.to_string()),
        );
        self.reflatten();

        Ok(())
    }

    /// The token sent to the hub: `--access-token` first, then the current
    /// auth context's stored token.
    pub(crate) fn access_token(&self) -> Result<Option<String>, AnkrError> {
        let flag = self.get_string(NS_ROOT, "access-token")?;
        if !flag.is_empty() {
            return Ok(Some(flag));
        }

        let context = self.current_context()?;
        Ok(self
            .credentials(&context)?
            .map(|creds| creds.token)
            .filter(|token| !token.is_empty()))
    }
}

fn flatten(prefix: &str, mapping: &Mapping, out: &mut BTreeMap<String, ConfigValue>) {
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            continue;
        };
        let full = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Mapping(nested) => flatten(&full, nested, out),
            other => {
                if let Some(value) = ConfigValue::from_yaml(other) {
                    out.insert(full, value);
                }
            }
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "" | "0" | "f" | "false" | "no" => Some(false),
        "1" | "t" | "true" | "yes" => Some(true),
        _ => None,
    }
}

// An empty slice flag serializes as `[]`.
fn is_empty_placeholder(s: &str) -> bool {
    s.is_empty() || s == "[]"
}

fn split_list(s: &str) -> Vec<String> {
    let s = s.trim();
    let s = s
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(s);

    s.split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !is_empty_placeholder(item))
        .collect()
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::{Config, ConfigValue, Credentials, NS_ROOT};
    use crate::cli::error::AnkrError;

    const NS: &str = "ankr.app.create";

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn required_string_missing_is_an_error() {
        let mut config = Config::default();
        config.mark_required(NS, "chart-name");

        let err = config.get_string(NS, "chart-name").unwrap_err();
        assert!(
            matches!(&err, AnkrError::MissingArguments(key) if key == "ankr.app.create.chart-name")
        );

        config.set(NS, "chart-name", "");
        assert!(matches!(
            config.get_string(NS, "chart-name"),
            Err(AnkrError::MissingArguments(_))
        ));

        config.set(NS, "chart-name", "wordpress");
        assert_eq!(config.get_string(NS, "chart-name").unwrap(), "wordpress");
    }

    #[test]
    fn optional_values_default_to_zero() {
        let config = Config::default();
        assert_eq!(config.get_string(NS, "chart-repo").unwrap(), "");
        assert_eq!(config.get_int(NS, "replica").unwrap(), 0);
        assert!(!config.get_bool(NS, "force").unwrap());
        assert!(config.get_string_slice(NS, "custom-value").unwrap().is_empty());
    }

    #[test]
    fn required_int_and_slice() {
        let mut config = Config::default();
        config.mark_required(NS, "replica");
        config.mark_required(NS, "custom-value");
        config.bind_default(NS, "replica", ConfigValue::Int(0));
        config.bind_default(NS, "custom-value", ConfigValue::List(vec![]));

        assert!(matches!(
            config.get_int(NS, "replica"),
            Err(AnkrError::MissingArguments(_))
        ));
        assert!(matches!(
            config.get_string_slice(NS, "custom-value"),
            Err(AnkrError::MissingArguments(_))
        ));

        config.set(NS, "replica", 3_i64);
        assert_eq!(config.get_int(NS, "replica").unwrap(), 3);
    }

    #[test]
    fn root_namespace_is_not_prefixed_or_required() {
        let mut config = Config::default();
        config.mark_required(NS_ROOT, "output");
        config.set(NS_ROOT, "output", "json");
        assert_eq!(config.get_string(NS_ROOT, "output").unwrap(), "json");

        config.set(NS_ROOT, "output", "");
        assert_eq!(config.get_string(NS_ROOT, "output").unwrap(), "");
    }

    #[test]
    fn empty_slice_placeholder_is_zero_length() {
        let mut config = Config::default();
        config.set(NS, "custom-value", "[]");
        assert!(config.get_string_slice(NS, "custom-value").unwrap().is_empty());

        config.set(NS, "custom-value", ConfigValue::List(vec!["[]".into()]));
        assert!(config.get_string_slice(NS, "custom-value").unwrap().is_empty());

        config.set(NS, "custom-value", "a:1, b:2");
        assert_eq!(
            config.get_string_slice(NS, "custom-value").unwrap(),
            vec!["a:1".to_string(), "b:2".to_string()]
        );
    }

    #[test]
    fn layers_resolve_in_precedence_order() {
        let mut config = Config::new(env(&[
            ("ANKR_HUB_URL", "env.hub"),
            ("ANKR_APP_CREATE_CHART_REPO", "env-repo"),
        ]));
        config.bind_default(NS_ROOT, "hub-url", ConfigValue::from("default.hub"));
        config.bind_default(NS, "chart-repo", ConfigValue::from("stable"));
        config.bind_default(NS, "chart-version", ConfigValue::from("1.0.0"));

        assert_eq!(config.get_string(NS_ROOT, "hub-url").unwrap(), "env.hub");
        assert_eq!(config.get_string(NS, "chart-repo").unwrap(), "env-repo");
        assert_eq!(config.get_string(NS, "chart-version").unwrap(), "1.0.0");

        config.bind_command_line(NS_ROOT, "hub-url", ConfigValue::from("flag.hub"));
        assert_eq!(config.get_string(NS_ROOT, "hub-url").unwrap(), "flag.hub");
    }

    #[test]
    fn is_set_only_tracks_command_line_values() {
        let mut config = Config::default();
        config.bind_default(NS, "force", ConfigValue::Bool(false));
        config.set(NS, "force", true);
        assert!(!config.is_set(NS, "force"));

        config.bind_command_line(NS, "force", ConfigValue::Bool(false));
        assert!(config.is_set(NS, "force"));
    }

    #[test]
    fn is_set_is_scoped_to_the_command() {
        let mut config = Config::default();
        config.bind_command_line(NS_ROOT, "output", ConfigValue::from("json"));

        assert!(config.is_set(NS_ROOT, "output"));
        assert!(!config.is_set(NS, "output"));

        config.bind_command_line(NS, "replica", ConfigValue::Int(2));
        assert!(config.is_set(NS, "replica"));
        assert!(!config.is_set(NS_ROOT, "replica"));
        assert!(!config.is_set("ankr.task.update", "replica"));
    }

    #[test]
    fn unparseable_int_is_invalid_input() {
        let mut config = Config::default();
        config.set(NS, "replica", "three");
        assert!(matches!(
            config.get_int(NS, "replica"),
            Err(AnkrError::InvalidInput(_))
        ));
    }

    #[test]
    fn config_file_round_trips_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.load_file(&path).unwrap();
        let creds = Credentials {
            token: "tok".into(),
            refresh_token: "refresh".into(),
            user_id: "user-1".into(),
        };
        config.store_credentials("work", &creds).unwrap();
        config.switch_context("work").unwrap();
        config.save().unwrap();

        let mut reloaded = Config::default();
        reloaded.load_file(&path).unwrap();
        assert_eq!(reloaded.current_context().unwrap(), "work");
        assert_eq!(reloaded.credentials("work").unwrap(), Some(creds));
        assert_eq!(reloaded.access_token().unwrap().as_deref(), Some("tok"));
        assert_eq!(
            reloaded.context_names(),
            vec!["default".to_string(), "work".to_string()]
        );
        assert_eq!(
            reloaded.get_string(NS_ROOT, "auth-contexts.work.user-id").unwrap(),
            "user-1"
        );
    }

    #[test]
    fn nested_file_values_are_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "output: json\nankr:\n  task:\n    create:\n      replica: 2\n      image: nginx\n",
        )
        .unwrap();

        let mut config = Config::default();
        config.load_file(&path).unwrap();
        assert_eq!(config.get_string(NS_ROOT, "output").unwrap(), "json");
        assert_eq!(config.get_int("ankr.task.create", "replica").unwrap(), 2);
        assert_eq!(config.get_string("ankr.task.create", "image").unwrap(), "nginx");
    }

    #[test]
    fn switching_to_an_unknown_context_fails() {
        let mut config = Config::default();
        assert!(matches!(
            config.switch_context("nope"),
            Err(AnkrError::UnknownContext(_))
        ));
        config.switch_context("default").unwrap();
    }

    #[test]
    fn access_token_flag_wins_over_context() {
        let mut config = Config::default();
        config
            .store_credentials(
                "default",
                &Credentials {
                    token: "stored".into(),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(config.access_token().unwrap().as_deref(), Some("stored"));

        config.set(NS_ROOT, "access-token", "override");
        assert_eq!(config.access_token().unwrap().as_deref(), Some("override"));
    }
}
