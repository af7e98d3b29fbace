use serde_json::Value;

use super::{CmdConfig, handler};
use crate::cli::builder::{CmdBuilder, CmdOpt, Command};
use crate::cli::config::Credentials;
use crate::cli::confirm::Prompt;
use crate::cli::display::{self, Column, Displayable, Row};
use crate::cli::error::AnkrError;
use crate::cli::input;
use crate::hub::proto::{RegisterRequest, User};

const COLUMNS: &[Column] = &[
    Column::new("ID", "ID"),
    Column::new("Name", "Name"),
    Column::new("Email", "Email"),
    Column::new("Created", "Created"),
];

struct Users(Vec<User>);

impl Displayable for Users {
    fn columns(&self) -> &'static [Column] {
        COLUMNS
    }

    fn rows(&self) -> Vec<Row> {
        self.0
            .iter()
            .map(|u| {
                Row::from([
                    ("ID", u.id.clone()),
                    ("Name", u.name.clone()),
                    ("Email", u.email.clone()),
                    ("Created", display::timestamp(u.creation_date)),
                ])
            })
            .collect()
    }

    fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.0)
    }
}

pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    let user = b.build(
        root,
        None,
        "user",
        "Manage your account and login session",
        &[CmdOpt::DocCategories(&["account"])],
    )?;

    let signup = b.build(
        user,
        Some(handler!(signup)),
        "register [name]",
        "Create an account",
        &[CmdOpt::LongAbout(
            "Create an account. The name defaults to your local user name; the email and \
             password are prompted for when not given as flags.",
        )],
    )?;
    b.add_string_flag(signup, "email", None, "", "Account email", &[]);
    b.add_string_flag(signup, "password", None, "", "Account password", &[]);

    let login = b.build(user, Some(handler!(login)), "login", "Log in to the hub", &[])?;
    b.add_string_flag(login, "email", None, "", "Account email", &[]);
    b.add_string_flag(login, "password", None, "", "Account password", &[]);

    b.build(
        user,
        Some(handler!(logout)),
        "logout",
        "Forget the current context's session",
        &[],
    )?;

    b.build(
        user,
        Some(handler!(detail)),
        "detail",
        "Show the logged in user",
        &[CmdOpt::Display(COLUMNS)],
    )?;

    Ok(())
}

fn flag_or_prompt(
    c: &CmdConfig,
    key: &str,
    label: &str,
    secret: bool,
) -> Result<String, AnkrError> {
    let value = c.get_string(key)?;
    if !value.is_empty() {
        return Ok(value);
    }
    if secret {
        Prompt::password(label)
    } else {
        Prompt::string(label)
    }
}

async fn signup(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let name = match c.args.first() {
        Some(name) => name.clone(),
        None => whoami::username(),
    };
    let email = flag_or_prompt(c, "email", "Email:", false)?;
    input::email(&email)?;
    let password = flag_or_prompt(c, "password", "Password:", true)?;

    let hub = c.hub().await?;
    let user = hub
        .register(RegisterRequest {
            name,
            email,
            password,
        })
        .await?;
    tracing::info!("registered user {}", user.id);

    c.message(format_args!(
        "Registered {} <{}>; check your inbox to confirm the address",
        user.name, user.email
    ))?;
    Ok(())
}

async fn login(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let email = flag_or_prompt(c, "email", "Email:", false)?;
    let password = flag_or_prompt(c, "password", "Password:", true)?;

    let hub = c.hub().await?;
    let auth = hub.login(&email, &password).await?;

    let context = c.config.current_context()?;
    c.config.store_credentials(
        &context,
        &Credentials {
            token: auth.access_token,
            refresh_token: auth.refresh_token,
            user_id: auth.user_id.clone(),
        },
    )?;
    c.config.save()?;

    c.message(format_args!(
        "Logged in as {} (context {context})",
        auth.user_id
    ))?;
    Ok(())
}

async fn logout(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let context = c.config.current_context()?;
    let credentials = c
        .config
        .credentials(&context)?
        .filter(|creds| !creds.token.is_empty())
        .ok_or(AnkrError::NotLoggedIn)?;

    let hub = c.hub().await?;
    hub.logout(&credentials.refresh_token).await?;

    c.config.clear_credentials(&context);
    c.config.save()?;

    c.message(format_args!("Logged out of context {context}"))?;
    Ok(())
}

async fn detail(c: &mut CmdConfig) -> color_eyre::Result<()> {
    let hub = c.hub().await?;
    let user = hub.user_detail().await?;
    c.display(&Users(vec![user]))?;
    Ok(())
}
