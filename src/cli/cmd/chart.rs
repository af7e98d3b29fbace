use serde_json::Value;

use super::{CmdConfig, handler};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command};
use crate::cli::display::{Column, Displayable, Row};
use crate::cli::error::AnkrError;
use crate::hub::proto::Chart;

const COLUMNS: &[Column] = &[
    Column::new("Name", "Name"),
    Column::new("Repo", "Repo"),
    Column::new("Version", "Latest Version"),
    Column::new("AppVersion", "App Version"),
    Column::new("Description", "Description"),
];

struct Charts(Vec<Chart>);

impl Displayable for Charts {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|ch| {
                Row::from([
                    ("Name", ch.name.clone()),
                    ("Repo", ch.repo.clone()),
                    ("Version", ch.latest_version.clone()),
                    ("AppVersion", ch.app_version.clone()),
                    ("Description", ch.description.clone()),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let chart = b.build(
        root,
        None,
        "chart",
        "Browse charts that apps can be deployed from",
        &[CmdOpt::DocCategories(&["app"])],
    )?;

    let list = b.build(
        chart,
        Some(handler!(list)),
        "list",
        "List charts in a repository",
        &[CmdOpt::Aliases(&["ls"]), CmdOpt::Display(COLUMNS)],
    )?;
    b.add_string_flag(list, "repo", None, "stable", "Chart repository", &[]);

    Ok(())
}

async fn list(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let repo = c.get_string("repo")?;

    let hub = c.hub().await?;
    let charts = hub.list_charts(&repo).await?;
    c.display(&Charts(charts))?;
    Ok(())
}
