use std::io::Write;
use std::sync::Arc;

use serde_json::Value;

use super::{CmdConfig, WAIT_INTERVAL, WAIT_TIMEOUT, fan_out, handler, wait_for};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command, beta_opt, required_opt};
use crate::cli::display::{self, Column, Displayable, Row};
use crate::cli::error::AnkrError;
use crate::cli::input;
use crate::hub::Hub;
use crate::hub::proto::{Task, TaskStatus};

const COLUMNS: &[Column] = &[
    Column::new("ID", "ID"),
    Column::new("Name", "Name"),
    Column::new("Type", "Type"),
    Column::new("Image", "Image"),
    Column::new("Replica", "Replica"),
    Column::new("Status", "Status"),
    Column::new("DataCenter", "Data Center"),
    Column::new("Created", "Created"),
];

pub(crate) struct Tasks(pub(crate) Vec<Task>);

impl Displayable for Tasks {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|t| {
                Row::from([
                    ("ID", t.id.clone()),
                    ("Name", t.name.clone()),
                    ("Type", t.r#type().as_str().to_string()),
                    ("Image", t.image.clone()),
                    ("Replica", t.replica.to_string()),
                    ("Status", t.status().as_str().to_string()),
                    ("DataCenter", t.data_center_name.clone()),
                    ("Created", display::timestamp(t.creation_date)),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let task = b.build(
        root,
        None,
        "task",
        "Manage tasks running on the network",
        &[
            CmdOpt::LongAbout(
                "Tasks are containers scheduled onto a data center: long running \
                 deployments, one-off jobs or cron jobs.",
            ),
            CmdOpt::DocCategories(&["task"]),
        ],
    )?;

    let create = b.build(
        task,
        Some(handler!(create)),
        "create <name>",
        "Create a task",
        &[],
    )?;
    b.add_string_flag(create, "image", None, "", "Container image to run", &[required_opt()]);
    b.add_int_flag(create, "replica", None, 1, "Number of replicas", &[]);
    b.add_string_flag(
        create,
        "type",
        None,
        "Deployment",
        "Task type: Deployment, Job or CronJob",
        &[],
    );
    b.add_string_flag(
        create,
        "schedule",
        None,
        "",
        "Cron schedule, required for CronJob tasks",
        &[],
    );
    b.add_string_flag(
        create,
        "dc-name",
        None,
        "",
        "Data center to run on, chosen by the hub when empty",
        &[beta_opt()],
    );
    b.add_bool_flag(create, "wait", None, false, "Wait until the task is running", &[]);

    b.build(
        task,
        Some(handler!(list)),
        "list",
        "List tasks",
        &[CmdOpt::Aliases(&["ls"]), CmdOpt::Display(COLUMNS)],
    )?;

    b.build(
        task,
        Some(handler!(detail)),
        "detail <id>",
        "Show a task",
        &[CmdOpt::Aliases(&["get"]), CmdOpt::Display(COLUMNS)],
    )?;

    let update = b.build(
        task,
        Some(handler!(update)),
        "update <id>",
        "Change a task's image or replica count",
        &[],
    )?;
    b.add_string_flag(update, "image", None, "", "New container image", &[]);
    b.add_int_flag(update, "replica", None, 0, "New number of replicas", &[]);
    b.add_bool_flag(update, "wait", None, false, "Wait until the update is rolled out", &[]);

    b.build(
        task,
        Some(handler!(cancel)),
        "cancel <id>...",
        "Cancel one or more tasks",
        &[],
    )?;

    let purge = b.build(
        task,
        Some(handler!(purge)),
        "purge <id>...",
        "Remove one or more tasks for good",
        &[CmdOpt::Aliases(&["rm"])],
    )?;
    b.add_bool_flag(purge, "force", Some('f'), false, "Purge without confirmation", &[]);

    Ok(())
}

async fn wait_running(hub: Arc<dyn Hub>, task_id: &str) -> Result<(), AnkrError> {
    wait_for(
        &format!("task {task_id}"),
        WAIT_TIMEOUT,
        WAIT_INTERVAL,
        || {
            let hub = Arc::clone(&hub);
            let task_id = task_id.to_string();
            async move {
                let status = hub.task_detail(&task_id).await?.status();
                tracing::debug!("task {task_id} is {}", status.as_str());
                match status {
                    TaskStatus::Running | TaskStatus::Done => Ok(true),
                    TaskStatus::StartFailed
                    | TaskStatus::UpdateFailed
                    | TaskStatus::Failed
                    | TaskStatus::Cancelled => Err(AnkrError::Unhealthy {
                        kind: "task",
                        id: task_id,
                        status: status.as_str(),
                    }),
                    _ => Ok(false),
                }
            }
        },
    )
    .await
}

async fn create(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let name = c.args[0].clone();
    input::resource_name(&name)?;

    let image = c.get_string("image")?;
    let replica = input::replica(c.get_int("replica")?)?;
    let kind = input::task_type(&c.get_string("type")?)?;
    let schedule = c.get_string("schedule")?;
    input::schedule(kind, &schedule)?;
    let data_center_name = c.get_string("dc-name")?;
    let wait = c.get_bool("wait")?;

    let hub = c.hub().await?;
    let task_id = hub
        .create_task(Task {
            name: name.clone(),
            r#type: kind as i32,
            image,
            replica,
            schedule,
            data_center_name,
            ..Default::default()
        })
        .await?;
    tracing::info!("created task {name} as {task_id}");

    if wait {
        wait_running(hub, &task_id).await?;
    }

    c.message(format_args!("Task {name} created with id {task_id}"))?;
    Ok(())
}

async fn list(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let hub = c.hub().await?;
    let tasks = hub.list_tasks().await?;
    c.display(&Tasks(tasks))?;
    Ok(())
}

async fn detail(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let task_id = c.args[0].clone();

    let hub = c.hub().await?;
    let task = hub.task_detail(&task_id).await?;
    c.display(&Tasks(vec![task]))?;
    Ok(())
}

async fn update(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let task_id = c.args[0].clone();

    let image = c.get_string("image")?;
    let replica = match c.get_int("replica")? {
        0 if !c.is_set("replica") => 0,
        n => input::replica(n)?,
    };
    if image.is_empty() && replica == 0 {
        return Err(
            AnkrError::MissingArguments(format!("{ns}.image or {ns}.replica", ns = c.ns)).into(),
        );
    }
    let wait = c.get_bool("wait")?;

    let hub = c.hub().await?;
    hub.update_task(Task {
        id: task_id.clone(),
        image,
        replica,
        ..Default::default()
    })
    .await?;

    if wait {
        wait_running(hub, &task_id).await?;
    }

    c.message(format_args!("Task {task_id} updated"))?;
    Ok(())
}

async fn cancel(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;

    let hub = c.hub().await?;
    let results = fan_out(&c.args, |id| {
        let hub = Arc::clone(&hub);
        async move { hub.cancel_task(&id).await }
    })
    .await;

    for id in results.succeeded() {
        writeln!(c.out, "Task {id} cancelled")?;
    }
    results.into_result()?;
    Ok(())
}

async fn purge(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    c.confirm_unless_forced(&format!("purge {} task(s)", c.args.len()))?;

    let hub = c.hub().await?;
    let results = fan_out(&c.args, |id| {
        let hub = Arc::clone(&hub);
        async move { hub.purge_task(&id).await }
    })
    .await;

    for id in results.succeeded() {
        writeln!(c.out, "Task {id} purged")?;
    }
    results.into_result()?;
    Ok(())
}
