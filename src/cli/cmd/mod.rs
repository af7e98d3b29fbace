pub(crate) mod app;
pub(crate) mod auth;
pub(crate) mod chart;
pub(crate) mod cluster;
pub(crate) mod completion;
pub(crate) mod namespace;
pub(crate) mod task;
pub(crate) mod user;
pub(crate) mod wallet;

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use super::builder::{CmdBuilder, Command, Invocation};
use super::config::{Config, NS_ROOT};
use super::confirm::{self, ReadLine};
use super::display::{self, Column, DisplayOptions, Displayable, OutputKind};
use super::error::AnkrError;
use crate::hub::{GrpcHub, Hub};

/// Upper bound on concurrent hub calls issued by a bulk command.
pub(crate) const MAX_IN_FLIGHT: usize = 8;

pub(crate) const WAIT_INTERVAL: Duration = Duration::from_secs(2);
pub(crate) const WAIT_TIMEOUT: Duration = Duration::from_secs(300);

pub(crate) type Handler =
    for<'a> fn(&'a mut CmdConfig) -> LocalBoxFuture<'a, color_eyre::Result<()>>;

/// Wraps an `async fn(&mut CmdConfig) -> color_eyre::Result<()>` as a
/// [`Handler`].
macro_rules! handler {
    ($f:path) => {{
        fn boxed(
            c: &mut $crate::cli::cmd::CmdConfig,
        ) -> futures::future::LocalBoxFuture<'_, color_eyre::Result<()>> {
            Box::pin($f(c))
        }
        boxed as $crate::cli::cmd::Handler
    }};
}
pub(crate) use handler;

/// Registers every command group below `root`.
pub(crate) fn register(b: &mut CmdBuilder<'_>, root: &mut Command) -> Result<(), AnkrError> {
    task::register(b, root)?;
    app::register(b, root)?;
    namespace::register(b, root)?;
    cluster::register(b, root)?;
    chart::register(b, root)?;
    user::register(b, root)?;
    wallet::register(b, root)?;
    auth::register(b, root)?;
    completion::register(b, root)?;
    Ok(())
}

/// Everything a handler needs for one invocation.
pub(crate) struct CmdConfig {
    pub(crate) ns: String,
    pub(crate) args: Vec<String>,
    pub(crate) config: Config,
    pub(crate) out: Box<dyn Write>,
    pub(crate) read_line: ReadLine,
    columns: Option<&'static [Column]>,
    hub: Option<Arc<dyn Hub>>,
}

impl CmdConfig {
    pub(crate) fn new(
        invocation: Invocation<'_>,
        config: Config,
        out: Box<dyn Write>,
        read_line: ReadLine,
    ) -> Self {
        Self {
            ns: invocation.command.ns().to_string(),
            args: invocation.args,
            config,
            out,
            read_line,
            columns: invocation.command.columns(),
            hub: None,
        }
    }

    /// Uses `hub` instead of dialing one.
    #[cfg(test)]
    pub(crate) fn with_hub(mut self, hub: Arc<dyn Hub>) -> Self {
        self.hub = Some(hub);
        self
    }

    /// The hub connection, dialed on first use.
    pub(crate) async fn hub(&mut self) -> Result<Arc<dyn Hub>, AnkrError> {
        if let Some(hub) = &self.hub {
            return Ok(Arc::clone(hub));
        }

        let hub_url = self.config.get_string(NS_ROOT, "hub-url")?;
        let token = self.config.access_token()?;
        let hub: Arc<dyn Hub> = Arc::new(GrpcHub::connect(&hub_url, token).await?);
        self.hub = Some(Arc::clone(&hub));

        Ok(hub)
    }

    pub(crate) fn get_string(&self, key: &str) -> Result<String, AnkrError> {
        self.config.get_string(&self.ns, key)
    }

    pub(crate) fn is_set(&self, key: &str) -> bool {
        self.config.is_set(&self.ns, key)
    }

    pub(crate) fn get_int(&self, key: &str) -> Result<i64, AnkrError> {
        self.config.get_int(&self.ns, key)
    }

    pub(crate) fn get_bool(&self, key: &str) -> Result<bool, AnkrError> {
        self.config.get_bool(&self.ns, key)
    }

    pub(crate) fn get_string_slice(&self, key: &str) -> Result<Vec<String>, AnkrError> {
        self.config.get_string_slice(&self.ns, key)
    }

    /// Fails with [`AnkrError::MissingArguments`] naming this command when
    /// fewer than `n` positional arguments were given.
    pub(crate) fn require_args(&self, n: usize) -> Result<(), AnkrError> {
        if self.args.len() < n {
            return Err(AnkrError::MissingArguments(self.ns.clone()));
        }
        Ok(())
    }

    pub(crate) fn ask_for_confirm(&mut self, prompt: &str) -> Result<(), AnkrError> {
        let res = confirm::ask_for_confirm(&mut *self.out, &mut self.read_line, prompt);
        writeln!(self.out)?;
        res
    }

    /// Confirms unless `--force` was given.
    pub(crate) fn confirm_unless_forced(&mut self, prompt: &str) -> Result<(), AnkrError> {
        if self.get_bool("force")? {
            return Ok(());
        }
        self.ask_for_confirm(prompt)
    }

    fn display_options(&self) -> Result<DisplayOptions, AnkrError> {
        let kind = self.config.get_string(NS_ROOT, "output")?.parse::<OutputKind>()?;
        let template = Some(self.config.get_string(NS_ROOT, "template")?).filter(|t| !t.is_empty());

        let (columns, no_header) = match self.columns {
            Some(_) => (
                self.get_string("format")?
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect(),
                self.get_bool("no-header")?,
            ),
            None => (Vec::new(), false),
        };

        Ok(DisplayOptions {
            kind,
            columns,
            no_header,
            template,
        })
    }

    pub(crate) fn display(&mut self, item: &dyn Displayable) -> Result<(), AnkrError> {
        let opts = self.display_options()?;
        display::display(&mut *self.out, item, &opts)
    }

    pub(crate) fn message(&mut self, msg: impl std::fmt::Display) -> Result<(), AnkrError> {
        writeln!(self.out, "{msg}")?;
        Ok(())
    }
}

/// Outcome of applying one operation to several ids.
#[derive(Debug)]
pub(crate) struct BulkResults {
    results: Vec<(String, Result<(), AnkrError>)>,
}

impl BulkResults {
    pub(crate) fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|(_, res)| res.is_ok())
            .map(|(id, _)| id.as_str())
    }

    /// Collapses the batch into a single result. Failures are reported
    /// together, in input order.
    pub(crate) fn into_result(self) -> Result<(), AnkrError> {
        let total = self.results.len();
        let failed: Vec<String> = self
            .results
            .into_iter()
            .filter_map(|(id, res)| res.err().map(|e| format!("{id}: {e}")))
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            Err(AnkrError::Partial { total, failed })
        }
    }
}

/// Runs `op` once per id with at most [`MAX_IN_FLIGHT`] calls outstanding.
/// A failure does not stop the remaining ids.
pub(crate) async fn fan_out<F, Fut>(ids: &[String], op: F) -> BulkResults
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<(), AnkrError>>,
{
    let results = stream::iter(ids.iter().cloned())
        .map(|id| {
            let call = op(id.clone());
            async move {
                let res = call.await;
                if let Err(e) = &res {
                    tracing::debug!("{id} failed: {e}");
                }
                (id, res)
            }
        })
        .buffered(MAX_IN_FLIGHT)
        .collect()
        .await;

    BulkResults { results }
}

/// Polls `done` every `interval` until it reports completion or `timeout`
/// elapses.
pub(crate) async fn wait_for<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut done: F,
) -> Result<(), AnkrError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, AnkrError>>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner());
    pb.set_message(format!("Waiting for {what}"));
    pb.enable_steady_tick(Duration::from_millis(100));

    let polling = async {
        loop {
            if done().await? {
                return Ok::<(), AnkrError>(());
            }
            tokio::time::sleep(interval).await;
        }
    };

    let res = match tokio::time::timeout(timeout, polling).await {
        Ok(res) => res,
        Err(_) => Err(AnkrError::WaitTimeout(what.to_string())),
    };
    pb.finish_and_clear();

    res
}

#[cfg(test)]
pub(crate) mod harness {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io::Write;
    use std::rc::Rc;
    use std::sync::Arc;

    use super::CmdConfig;
    use crate::cli::build_root;
    use crate::cli::config::Config;
    use crate::cli::error::AnkrError;
    use crate::hub::mock::MockHub;

    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub(crate) struct Outcome {
        pub(crate) result: color_eyre::Result<()>,
        pub(crate) output: String,
        pub(crate) config: Config,
    }

    impl Outcome {
        pub(crate) fn error(&self) -> Option<&AnkrError> {
            self.result
                .as_ref()
                .err()
                .and_then(|e| e.downcast_ref::<AnkrError>())
        }
    }

    pub(crate) async fn run(argv: &[&str], hub: Arc<MockHub>, answers: &[&str]) -> Outcome {
        run_with_config(argv, hub, answers, Config::default()).await
    }

    pub(crate) async fn run_with_config(
        argv: &[&str],
        hub: Arc<MockHub>,
        answers: &[&str],
        mut config: Config,
    ) -> Outcome {
        let root = build_root(&mut config).unwrap();
        let matches = root
            .to_clap()
            .try_get_matches_from(std::iter::once("ankrctl").chain(argv.iter().copied()))
            .unwrap();
        let invocation = root.bind(&mut config, &matches).unwrap();
        let handler = invocation.command.handler().unwrap();

        let mut answers: VecDeque<String> = answers.iter().map(|a| format!("{a}\n")).collect();
        let out = SharedBuf::default();
        let mut c = CmdConfig::new(
            invocation,
            config,
            Box::new(out.clone()),
            Box::new(move || {
                answers.pop_front().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no more answers")
                })
            }),
        )
        .with_hub(hub);

        let result = handler(&mut c).await;

        Outcome {
            result,
            output: out.contents(),
            config: c.config,
        }
    }
}
