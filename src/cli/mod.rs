pub(crate) mod builder;
pub(crate) mod cmd;
pub(crate) mod config;
pub(crate) mod confirm;
pub(crate) mod display;
pub(crate) mod error;
pub(crate) mod input;

use std::ffi::OsString;
use std::path::PathBuf;

use self::builder::{CmdBuilder, Command};
use self::cmd::CmdConfig;
use self::config::{Config, NS_ROOT};
use self::error::AnkrError;

pub(crate) const DEFAULT_HUB_URL: &str = "hub.ankr.network";

/// Builds the full command tree, registering flag metadata in `config`.
pub(crate) fn build_root(config: &mut Config) -> Result<Command, AnkrError> {
    let mut b = CmdBuilder::new(config)?;
    let mut root = b.root(
        "ankrctl",
        "ankrctl: a CLI for deploying tasks and apps onto the Ankr network",
    );

    b.add_string_flag(
        &mut root,
        "hub-url",
        Some('u'),
        DEFAULT_HUB_URL,
        "Hub address, as host or host:port",
        &[],
    );
    b.add_string_flag(&mut root, "config", Some('c'), "", "Config file to use", &[]);
    b.add_string_flag(
        &mut root,
        "context",
        None,
        "",
        "Auth context to use instead of the current one",
        &[],
    );
    b.add_string_flag(
        &mut root,
        "access-token",
        Some('t'),
        "",
        "Access token, overriding the auth context's",
        &[],
    );
    b.add_string_flag(
        &mut root,
        "output",
        Some('o'),
        "text",
        "Output format: text, csv or json",
        &[],
    );
    b.add_string_flag(
        &mut root,
        "template",
        None,
        "",
        "Handlebars template applied to each result item",
        &[],
    );
    b.add_bool_flag(&mut root, "verbose", Some('v'), false, "Enable debug logging", &[]);

    cmd::register(&mut b, &mut root)?;

    Ok(root)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_error::ErrorLayer::default())
        .try_init();
}

/// Parses `args`, resolves configuration and runs the selected command.
pub(crate) async fn run<I, T>(args: I) -> color_eyre::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut config = Config::from_process_env();
    let default_path = config.default_path()?;
    config.load_file(&default_path)?;

    let root = build_root(&mut config)?;
    let matches = root.to_clap().get_matches_from(args);
    let invocation = root.bind(&mut config, &matches)?;

    init_tracing(config.get_bool(NS_ROOT, "verbose")?);

    if config.is_set(NS_ROOT, "config") {
        let path = PathBuf::from(config.get_string(NS_ROOT, "config")?);
        config.load_file(&path)?;
    }
    tracing::debug!(
        config = ?config.path(),
        context = %config.current_context()?,
        "resolved configuration"
    );

    let handler = invocation.command.handler().ok_or_else(|| {
        AnkrError::MissingArguments(invocation.command.ns().to_string())
    })?;
    let mut c = CmdConfig::new(
        invocation,
        config,
        Box::new(std::io::stdout()),
        confirm::stdin_read_line(),
    );

    handler(&mut c).await
}
