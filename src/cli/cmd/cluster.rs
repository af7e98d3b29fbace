use serde_json::Value;

use super::{CmdConfig, handler};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command};
use crate::cli::display::{Column, Displayable, Row};
use crate::cli::error::AnkrError;
use crate::hub::proto::Cluster;

const COLUMNS: &[Column] = &[
    Column::new("ID", "ID"),
    Column::new("Name", "Name"),
    Column::new("Region", "Region"),
    Column::new("Status", "Status"),
    Column::new("Nodes", "Nodes"),
    Column::new("CPU", "CPU (m)"),
    Column::new("Memory", "Memory (MiB)"),
];

struct Clusters(Vec<Cluster>);

impl Displayable for Clusters {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|cl| {
                Row::from([
                    ("ID", cl.id.clone()),
                    ("Name", cl.name.clone()),
                    ("Region", cl.region.clone()),
                    ("Status", cl.status.clone()),
                    ("Nodes", cl.nodes.to_string()),
                    ("CPU", cl.cpu_total.to_string()),
                    ("Memory", cl.mem_total.to_string()),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let cluster = b.build(
        root,
        None,
        "cluster",
        "Inspect the data center clusters backing the network",
        &[CmdOpt::DocCategories(&["cluster"])],
    )?;

    b.build(
        cluster,
        Some(handler!(list)),
        "list",
        "List clusters",
        &[CmdOpt::Aliases(&["ls"]), CmdOpt::Display(COLUMNS)],
    )?;

    Ok(())
}

async fn list(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let hub = c.hub().await?;
    let clusters = hub.list_clusters().await?;
    c.display(&Clusters(clusters))?;
    Ok(())
}
