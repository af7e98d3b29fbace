use serde::Serialize;
use serde_json::Value;

use super::{CmdConfig, handler};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command};
use crate::cli::config::DEFAULT_CONTEXT;
use crate::cli::display::{Column, Displayable, Row};
use crate::cli::error::AnkrError;

const COLUMNS: &[Column] = &[
    Column::new("Current", "Current"),
    Column::new("Name", "Name"),
    Column::new("User", "User"),
];

#[derive(Serialize)]
struct Context {
    name: String,
    current: bool,
    user_id: String,
}

struct Contexts(Vec<Context>);

impl Displayable for Contexts {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|ctx| {
                Row::from([
                    ("Current", if ctx.current { "*" } else { "" }.to_string()),
                    ("Name", ctx.name.clone()),
                    ("User", ctx.user_id.clone()),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let auth = b.build(
        root,
        None,
        "auth",
        "Switch between saved login contexts",
        &[
            CmdOpt::LongAbout(
                "Each auth context holds one login session. `user login` stores its token \
                 in the current context; select another with --context or `auth switch`.",
            ),
            CmdOpt::DocCategories(&["account"]),
        ],
    )?;

    b.build(
        auth,
        Some(handler!(list)),
        "list",
        "List auth contexts",
        &[CmdOpt::Aliases(&["ls"]), CmdOpt::Display(COLUMNS)],
    )?;
    b.build(
        auth,
        Some(handler!(switch)),
        "switch <context>",
        "Make a context the default",
        &[],
    )?;
    b.build(
        auth,
        Some(handler!(remove)),
        "remove <context>",
        "Forget a context's credentials",
        &[CmdOpt::Aliases(&["rm"])],
    )?;

    Ok(())
}

async fn list(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let current = c.config.current_context()?;
    let contexts = c
        .config
        .context_names()
        .into_iter()
        .map(|name| -> Result<Context, AnkrError> {
            let user_id = c
                .config
                .credentials(&name)?
                .map(|creds| creds.user_id)
                .unwrap_or_default();
            Ok(Context {
                current: name == current,
                name,
                user_id,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    c.display(&Contexts(contexts))?;
    Ok(())
}

async fn switch(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let context = c.args[0].clone();

    c.config.switch_context(&context)?;
    c.config.save()?;

    c.message(format_args!("Now using context {context}"))?;
    Ok(())
}

async fn remove(c: &mut CmdConfig) -> color_eyre::Result<()> {
    c.require_args(1)?;
    let context = c.args[0].clone();
    if !c.config.context_names().contains(&context) {
        return Err(AnkrError::UnknownContext(context).into());
    }

    let was_current = c.config.current_context()? == context;
    c.config.clear_credentials(&context);
    if was_current {
        c.config.switch_context(DEFAULT_CONTEXT)?;
    }
    c.config.save()?;

    c.message(format_args!("Removed context {context}"))?;
    Ok(())
}
