use std::io::Write;
use std::sync::Arc;

use serde_json::Value;

use super::{CmdConfig, fan_out, handler};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command};
use crate::cli::display::{self, Column, Displayable, Row};
use crate::cli::error::AnkrError;
use crate::cli::input;
use crate::hub::proto::Namespace;

const COLUMNS: &[Column] = &[
    Column::new("ID", "ID"),
    Column::new("Name", "Name"),
    Column::new("CPU", "CPU Limit (m)"),
    Column::new("Memory", "Memory Limit (MiB)"),
    Column::new("Storage", "Storage Limit (GiB)"),
    Column::new("Created", "Created"),
];

pub(crate) struct Namespaces(pub(crate) Vec<Namespace>);

impl Displayable for Namespaces {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|ns| {
                Row::from([
                    ("ID", ns.id.clone()),
                    ("Name", ns.name.clone()),
                    ("CPU", ns.cpu_limit.to_string()),
                    ("Memory", ns.mem_limit.to_string()),
                    ("Storage", ns.storage_limit.to_string()),
                    ("Created", display::timestamp(ns.creation_date)),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let namespace = b.build(
        root,
        None,
        "namespace",
        "Manage namespaces and their resource limits",
        &[CmdOpt::Aliases(&["ns"]), CmdOpt::DocCategories(&["namespace"])],
    )?;

    let create = b.build(
        namespace,
        Some(handler!(create)),
        "create <name>",
        "Create a namespace",
        &[],
    )?;
    b.add_int_flag(create, "cpu-limit", None, 1000, "CPU limit in millicores", &[]);
    b.add_int_flag(create, "mem-limit", None, 1024, "Memory limit in MiB", &[]);
    b.add_int_flag(create, "storage-limit", None, 10, "Storage limit in GiB", &[]);

    b.build(
        namespace,
        Some(handler!(list)),
        "list",
        "List namespaces",
        &[CmdOpt::Aliases(&["ls"]), CmdOpt::Display(COLUMNS)],
    )?;

    let delete = b.build(
        namespace,
        Some(handler!(delete)),
        "delete <id>...",
        "Delete one or more namespaces",
        &[CmdOpt::Aliases(&["rm"])],
    )?;
    b.add_bool_flag(delete, "force", Some('f'), false, "Delete without confirmation", &[]);

    Ok(())
}

fn positive_limit(c: &CmdConfig, key: &str) -> Result<i64, AnkrError> {
    match c.get_int(key)? {
        n if n > 0 => Ok(n),
        n => Err(AnkrError::InvalidInput(format!(
            "--{key} must be positive, got {n}"
        ))),
    }
}

async fn create(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let name = c.args[0].clone();
    input::resource_name(&name)?;

    let cpu_limit = positive_limit(c, "cpu-limit")?;
    let mem_limit = positive_limit(c, "mem-limit")?;
    let storage_limit = positive_limit(c, "storage-limit")?;

    let hub = c.hub().await?;
    let namespace_id = hub
        .create_namespace(Namespace {
            name: name.clone(),
            cpu_limit,
            mem_limit,
            storage_limit,
            ..Default::default()
        })
        .await?;

    c.message(format_args!("Namespace {name} created with id {namespace_id}"))?;
    Ok(())
}

async fn list(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let hub = c.hub().await?;
    let namespaces = hub.list_namespaces().await?;
    c.display(&Namespaces(namespaces))?;
    Ok(())
}

async fn delete(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    c.confirm_unless_forced(&format!("delete {} namespace(s)", c.args.len()))?;

    let hub = c.hub().await?;
    let results = fan_out(&c.args, |id| {
        let hub = Arc::clone(&hub);
        async move { hub.delete_namespace(&id).await }
    })
    .await;

    for id in results.succeeded() {
        writeln!(c.out, "Namespace {id} deleted")?;
    }
    results.into_result()?;
    Ok(())
}
