use std::io::Write;
use std::sync::Arc;

use serde_json::Value;

use super::{CmdConfig, WAIT_INTERVAL, WAIT_TIMEOUT, fan_out, handler, wait_for};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command, required_opt};
use crate::cli::display::{self, Column, Displayable, Row};
use crate::cli::error::AnkrError;
use crate::cli::input;
use crate::hub::proto::{App, AppStatus};

const COLUMNS: &[Column] = &[
    Column::new("ID", "ID"),
    Column::new("Name", "Name"),
    Column::new("Chart", "Chart"),
    Column::new("Version", "Version"),
    Column::new("Namespace", "Namespace"),
    Column::new("Status", "Status"),
    Column::new("Created", "Created"),
];

pub(crate) struct Apps(pub(crate) Vec<App>);

impl Displayable for Apps {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|a| {
                let chart = if a.chart_repo.is_empty() {
                    a.chart_name.clone()
                } else {
                    format!("{}/{}", a.chart_repo, a.chart_name)
                };
                Row::from([
                    ("ID", a.id.clone()),
                    ("Name", a.name.clone()),
                    ("Chart", chart),
                    ("Version", a.chart_version.clone()),
                    ("Namespace", a.namespace_id.clone()),
                    ("Status", a.status().as_str().to_string()),
                    ("Created", display::timestamp(a.creation_date)),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let app = b.build(
        root,
        None,
        "app",
        "Manage applications deployed from charts",
        &[CmdOpt::DocCategories(&["app"])],
    )?;

    let create = b.build(
        app,
        Some(handler!(create)),
        "create <name>",
        "Deploy an application from a chart",
        &[],
    )?;
    b.add_string_flag(create, "chart-name", None, "", "Chart to deploy", &[required_opt()]);
    b.add_string_flag(create, "chart-repo", None, "stable", "Chart repository", &[]);
    b.add_string_flag(
        create,
        "chart-version",
        None,
        "",
        "Chart version, latest when empty",
        &[],
    );
    b.add_string_flag(create, "ns-id", None, "", "Namespace to deploy into", &[]);
    b.add_string_slice_flag(
        create,
        "custom-value",
        None,
        &[],
        "Chart value overrides as key:value",
        &[],
    );
    b.add_bool_flag(create, "wait", None, false, "Wait until the app is running", &[]);

    b.build(
        app,
        Some(handler!(list)),
        "list",
        "List applications",
        &[CmdOpt::Aliases(&["ls"]), CmdOpt::Display(COLUMNS)],
    )?;

    b.build(
        app,
        Some(handler!(detail)),
        "detail <id>",
        "Show an application",
        &[CmdOpt::Aliases(&["get"]), CmdOpt::Display(COLUMNS)],
    )?;

    b.build(
        app,
        Some(handler!(cancel)),
        "cancel <id>...",
        "Stop one or more applications",
        &[],
    )?;

    let purge = b.build(
        app,
        Some(handler!(purge)),
        "purge <id>...",
        "Remove one or more applications for good",
        &[CmdOpt::Aliases(&["rm"])],
    )?;
    b.add_bool_flag(purge, "force", Some('f'), false, "Purge without confirmation", &[]);

    Ok(())
}

async fn create(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let name = c.args[0].clone();
    input::resource_name(&name)?;

    let chart_name = c.get_string("chart-name")?;
    let chart_repo = c.get_string("chart-repo")?;
    let chart_version = c.get_string("chart-version")?;
    input::chart_version(&chart_version)?;
    let namespace_id = c.get_string("ns-id")?;
    let custom_values = input::custom_values(&c.get_string_slice("custom-value")?)?;
    let wait = c.get_bool("wait")?;

    let hub = c.hub().await?;
    let app_id = hub
        .create_app(App {
            name: name.clone(),
            chart_name,
            chart_repo,
            chart_version,
            namespace_id,
            custom_values,
            ..Default::default()
        })
        .await?;
    tracing::info!("created app {name} as {app_id}");

    if wait {
        wait_for(&format!("app {app_id}"), WAIT_TIMEOUT, WAIT_INTERVAL, || {
            let hub = Arc::clone(&hub);
            let app_id = app_id.clone();
            async move {
                match hub.app_detail(&app_id).await?.status() {
                    AppStatus::Running => Ok(true),
                    status @ (AppStatus::LaunchFailed
                    | AppStatus::Failed
                    | AppStatus::Cancelled) => Err(AnkrError::Unhealthy {
                        kind: "app",
                        id: app_id,
                        status: status.as_str(),
                    }),
                    _ => Ok(false),
                }
            }
        })
        .await?;
    }

    c.message(format_args!("App {name} created with id {app_id}"))?;
    Ok(())
}

async fn list(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let hub = c.hub().await?;
    let apps = hub.list_apps().await?;
    c.display(&Apps(apps))?;
    Ok(())
}

async fn detail(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let app_id = c.args[0].clone();

    let hub = c.hub().await?;
    let app = hub.app_detail(&app_id).await?;
    c.display(&Apps(vec![app]))?;
    Ok(())
}

async fn cancel(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;

    let hub = c.hub().await?;
    let results = fan_out(&c.args, |id| {
        let hub = Arc::clone(&hub);
        async move { hub.cancel_app(&id).await }
    })
    .await;

    for id in results.succeeded() {
        writeln!(c.out, "App {id} cancelled")?;
    }
    results.into_result()?;
    Ok(())
}

async fn purge(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    c.confirm_unless_forced(&format!("purge {} app(s)", c.args.len()))?;

    let hub = c.hub().await?;
    let results = fan_out(&c.args, |id| {
        let hub = Arc::clone(&hub);
        async move { hub.purge_app(&id).await }
    })
    .await;

    for id in results.succeeded() {
        writeln!(c.out, "App {id} purged")?;
    }
    results.into_result()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use crate::cli::cmd::harness::{run, run_with_config};
    use crate::cli::config::Config;
    use crate::cli::error::AnkrError;
    use crate::hub::mock::MockHub;
    use crate::hub::proto::custom_value::Value;

    #[tokio::test]
    async fn chart_name_can_come_from_the_environment() {
        let hub = Arc::new(MockHub::default());
        let config = Config::new(BTreeMap::from([(
            "ANKR_APP_CREATE_CHART_NAME".to_string(),
            "wp".to_string(),
        )]));
        let outcome =
            run_with_config(&["app", "create", "foo"], Arc::clone(&hub), &[], config).await;
        outcome.result.unwrap();

        let created = hub.created_apps.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].chart_name, "wp");
    }

    #[tokio::test]
    async fn global_output_flag_before_the_subcommand() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(&["-o", "json", "app", "list"], hub, &[]).await;
        outcome.result.unwrap();

        let json: serde_json::Value = serde_json::from_str(&outcome.output).unwrap();
        assert!(json.is_array());
    }

    #[tokio::test]
    async fn create_without_chart_name_issues_no_call() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(&["app", "create", "foo"], Arc::clone(&hub), &[]).await;

        assert!(matches!(
            outcome.error(),
            Some(AnkrError::MissingArguments(key)) if key == "ankr.app.create.chart-name"
        ));
        assert!(hub.calls().is_empty());
    }

    #[tokio::test]
    async fn create_sends_typed_custom_values() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(
            &[
                "app",
                "create",
                "blog",
                "--chart-name",
                "wordpress",
                "--chart-version",
                "5.6.2",
                "--custom-value",
                "replicaCount:2,persistence.enabled:false",
                "--custom-value",
                "service.type:NodePort",
            ],
            Arc::clone(&hub),
            &[],
        )
        .await;
        outcome.result.unwrap();

        let created = hub.created_apps.lock().unwrap();
        assert_eq!(created.len(), 1);
        let app = &created[0];
        assert_eq!(app.chart_name, "wordpress");
        assert_eq!(app.chart_repo, "stable");
        assert_eq!(app.chart_version, "5.6.2");
        let values: Vec<_> = app
            .custom_values
            .iter()
            .map(|v| (v.key.as_str(), v.value.clone()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("replicaCount", Some(Value::Int(2))),
                ("persistence.enabled", Some(Value::Bool(false))),
                ("service.type", Some(Value::Str("NodePort".into()))),
            ]
        );
        assert!(outcome.output.contains("app-1"));
    }

    #[tokio::test]
    async fn bad_chart_version_is_rejected() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(
            &["app", "create", "blog", "--chart-name", "wordpress", "--chart-version", "latest"],
            Arc::clone(&hub),
            &[],
        )
        .await;

        assert!(matches!(outcome.error(), Some(AnkrError::InvalidInput(_))));
        assert!(hub.calls().is_empty());
    }

    #[tokio::test]
    async fn detail_renders_the_app() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(
            &["app", "detail", "a1", "--format", "ID,Status", "--no-header"],
            hub,
            &[],
        )
        .await;
        outcome.result.unwrap();
        assert!(outcome.output.contains("a1"));
        assert!(outcome.output.contains("Launching"));
        assert!(!outcome.output.contains("Status"));
    }

    #[tokio::test]
    async fn unknown_column_fails_after_fetching() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(&["app", "list", "--format", "Nope"], hub, &[]).await;
        assert!(matches!(outcome.error(), Some(AnkrError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn purge_deletes_every_app_once_confirmed() {
        let hub = Arc::new(MockHub::failing(&["a2"]));
        let outcome = run(&["app", "purge", "a1", "a2", "a3"], Arc::clone(&hub), &["y"]).await;

        assert!(matches!(
            outcome.error(),
            Some(AnkrError::Partial { total: 3, failed }) if failed.len() == 1
        ));
        assert_eq!(hub.calls().len(), 3);
    }

    #[tokio::test]
    async fn template_output() {
        let hub = Arc::new(MockHub::default());
        let outcome = run(
            &["app", "detail", "a1", "--template", "{{id}} is {{status}}"],
            hub,
            &[],
        )
        .await;
        outcome.result.unwrap();
        assert_eq!(outcome.output, "a1 is Launching\n");
    }
}
