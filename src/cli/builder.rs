use clap::{Arg, ArgAction, ArgMatches, parser::ValueSource};

use super::cmd::Handler;
use super::config::{Config, ConfigValue, NS_ROOT};
use super::display::Column;
use super::error::AnkrError;

const ARGS_ID: &str = "args";

/// Dotted path of a command below `parent` (the parent's namespace), or below
/// the root token when there is no parent.
pub(crate) fn namespace(parent: Option<&str>, name: &str) -> String {
    format!("{}.{name}", parent.unwrap_or(NS_ROOT))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagKind {
    Str,
    Int,
    Bool,
    StrSlice,
}

#[derive(Debug, Clone)]
struct FlagBinding {
    key: &'static str,
    kind: FlagKind,
    default: ConfigValue,
}

/// Modifiers for registered flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlagOpt {
    Required,
    Beta,
}

pub(crate) fn required_opt() -> FlagOpt {
    FlagOpt::Required
}

pub(crate) fn beta_opt() -> FlagOpt {
    FlagOpt::Beta
}

/// Modifiers for built commands.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CmdOpt {
    Aliases(&'static [&'static str]),
    LongAbout(&'static str),
    DocCategories(&'static [&'static str]),
    Display(&'static [Column]),
}

/// A node of the command tree: the clap command plus what the CLI needs to
/// bind flags into the config and run the handler.
pub(crate) struct Command {
    cmd: clap::Command,
    ns: String,
    handler: Option<Handler>,
    flags: Vec<FlagBinding>,
    doc_categories: &'static [&'static str],
    columns: Option<&'static [Column]>,
    children: Vec<Command>,
}

impl Command {
    pub(crate) fn ns(&self) -> &str {
        &self.ns
    }

    pub(crate) fn name(&self) -> &str {
        self.cmd.get_name()
    }

    pub(crate) fn handler(&self) -> Option<Handler> {
        self.handler
    }

    pub(crate) fn columns(&self) -> Option<&'static [Column]> {
        self.columns
    }

    pub(crate) fn child(&self, name: &str) -> Option<&Command> {
        self.children.iter().find(|c| c.name() == name)
    }

    /// Freezes the tree into a clap command ready for parsing.
    pub(crate) fn to_clap(&self) -> clap::Command {
        let mut cmd = self.cmd.clone();

        if !self.doc_categories.is_empty() {
            cmd = cmd.after_help(format!("Categories: {}", self.doc_categories.join(", ")));
        }
        if self.handler.is_none() && !self.children.is_empty() {
            cmd = cmd.subcommand_required(true).arg_required_else_help(true);
        }

        for child in &self.children {
            cmd = cmd.subcommand(child.to_clap());
        }

        cmd
    }

    /// Walks `matches` down to the invoked command, binding the root's and
    /// that command's flags into `config`.
    pub(crate) fn bind<'t>(
        &'t self,
        config: &mut Config,
        matches: &ArgMatches,
    ) -> Result<Invocation<'t>, AnkrError> {
        let mut node = self;
        let mut matches = matches;
        while let Some((name, sub)) = matches.subcommand() {
            node = node.child(name).ok_or_else(|| {
                AnkrError::InvalidInput(format!("unknown command `{name}`"))
            })?;
            matches = sub;
        }

        // Root flags are global, so the leaf's matches carry them too.
        for flag in &self.flags {
            bind_flag(config, &self.ns, flag, matches);
        }
        if !std::ptr::eq(node, self) {
            for flag in &node.flags {
                bind_flag(config, &node.ns, flag, matches);
            }
        }

        let args = matches
            .try_get_many::<String>(ARGS_ID)
            .ok()
            .flatten()
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        tracing::debug!(ns = %node.ns, "bound invocation");

        Ok(Invocation {
            command: node,
            args,
        })
    }
}

pub(crate) struct Invocation<'t> {
    pub(crate) command: &'t Command,
    pub(crate) args: Vec<String>,
}

fn bind_flag(config: &mut Config, ns: &str, flag: &FlagBinding, matches: &ArgMatches) {
    let key = flag.key;
    let parsed = match flag.kind {
        FlagKind::Str => matches
            .try_get_one::<String>(key)
            .ok()
            .flatten()
            .cloned()
            .map(ConfigValue::Str),
        FlagKind::Int => matches
            .try_get_one::<i64>(key)
            .ok()
            .flatten()
            .copied()
            .map(ConfigValue::Int),
        FlagKind::Bool => matches
            .try_get_one::<bool>(key)
            .ok()
            .flatten()
            .copied()
            .map(ConfigValue::Bool),
        FlagKind::StrSlice => matches
            .try_get_many::<String>(key)
            .ok()
            .flatten()
            .map(|values| ConfigValue::List(values.cloned().collect())),
    };

    match (matches.value_source(key), parsed) {
        (Some(ValueSource::CommandLine), Some(value)) => {
            config.bind_command_line(ns, key, value)
        }
        _ => config.bind_default(ns, key, flag.default.clone()),
    }
}

/// Assembles the command tree, registering flag metadata in the config as it
/// goes.
pub(crate) struct CmdBuilder<'c> {
    config: &'c mut Config,
    beta: bool,
}

impl<'c> CmdBuilder<'c> {
    pub(crate) fn new(config: &'c mut Config) -> Result<Self, AnkrError> {
        let beta = config.get_bool(NS_ROOT, "enable-beta")?;
        Ok(Self { config, beta })
    }

    pub(crate) fn root(&mut self, name: &'static str, about: &'static str) -> Command {
        Command {
            cmd: clap::Command::new(name).about(about),
            ns: NS_ROOT.to_string(),
            handler: None,
            flags: Vec::new(),
            doc_categories: &[],
            columns: None,
            children: Vec::new(),
        }
    }

    /// Adds a child to `parent`. The first word of `usage` is the command
    /// name; the remainder documents its positional arguments.
    pub(crate) fn build<'p>(
        &mut self,
        parent: &'p mut Command,
        handler: Option<Handler>,
        usage: &'static str,
        short: &'static str,
        opts: &[CmdOpt],
    ) -> Result<&'p mut Command, AnkrError> {
        let mut words = usage.splitn(2, ' ');
        let name = words.next().unwrap_or_default();
        let positional = words.next().map(str::trim).filter(|s| !s.is_empty());

        if parent.child(name).is_some() {
            return Err(AnkrError::DuplicateCommand(namespace(Some(&parent.ns), name)));
        }

        let mut cmd = clap::Command::new(name).about(short);
        if handler.is_some() {
            let mut args = Arg::new(ARGS_ID).num_args(0..).action(ArgAction::Append);
            if let Some(positional) = positional {
                let name = positional.trim_matches(|c| matches!(c, '<' | '>' | '[' | ']' | '.'));
                args = args.value_name(name.to_uppercase());
            }
            cmd = cmd.arg(args);
        }

        let mut child = Command {
            cmd,
            ns: namespace(Some(&parent.ns), name),
            handler,
            flags: Vec::new(),
            doc_categories: &[],
            columns: None,
            children: Vec::new(),
        };

        for opt in opts {
            match *opt {
                CmdOpt::Aliases(aliases) => {
                    child.cmd = child.cmd.visible_aliases(aliases.iter().copied());
                }
                CmdOpt::LongAbout(long) => child.cmd = child.cmd.long_about(long),
                CmdOpt::DocCategories(categories) => child.doc_categories = categories,
                CmdOpt::Display(columns) => {
                    child.columns = Some(columns);
                    let possible = columns.iter().map(|c| c.id).collect::<Vec<_>>().join(", ");
                    self.add_string_flag(
                        &mut child,
                        "format",
                        None,
                        "",
                        &format!(
                            "Columns for output in a comma-separated list. Possible values: {possible}"
                        ),
                        &[],
                    );
                    self.add_bool_flag(
                        &mut child,
                        "no-header",
                        None,
                        false,
                        "Return raw data with no headers",
                        &[],
                    );
                }
            }
        }

        parent.children.push(child);
        let last = parent.children.len() - 1;
        Ok(&mut parent.children[last])
    }

    fn add_flag(
        &mut self,
        cmd: &mut Command,
        arg: Arg,
        binding: FlagBinding,
        help: &str,
        opts: &[FlagOpt],
    ) {
        let mut arg = arg.long(binding.key).help(help.to_string());

        if cmd.ns == NS_ROOT {
            arg = arg.global(true);
        }

        for opt in opts {
            match opt {
                FlagOpt::Required => {
                    self.config.mark_required(&cmd.ns, binding.key);
                    arg = arg.help(format!("{help} (required)"));
                }
                FlagOpt::Beta => arg = arg.hide(!self.beta),
            }
        }

        cmd.cmd = std::mem::take(&mut cmd.cmd).arg(arg);
        cmd.flags.push(binding);
    }

    pub(crate) fn add_string_flag(
        &mut self,
        cmd: &mut Command,
        key: &'static str,
        short: Option<char>,
        default: &str,
        help: &str,
        opts: &[FlagOpt],
    ) {
        let mut arg = Arg::new(key).num_args(1).action(ArgAction::Set);
        if let Some(short) = short {
            arg = arg.short(short);
        }
        if !default.is_empty() {
            arg = arg.default_value(default.to_string());
        }

        let binding = FlagBinding {
            key,
            kind: FlagKind::Str,
            default: ConfigValue::from(default),
        };
        self.add_flag(cmd, arg, binding, help, opts);
    }

    pub(crate) fn add_int_flag(
        &mut self,
        cmd: &mut Command,
        key: &'static str,
        short: Option<char>,
        default: i64,
        help: &str,
        opts: &[FlagOpt],
    ) {
        let mut arg = Arg::new(key)
            .num_args(1)
            .action(ArgAction::Set)
            .value_parser(clap::value_parser!(i64))
            .default_value(default.to_string());
        if let Some(short) = short {
            arg = arg.short(short);
        }

        let binding = FlagBinding {
            key,
            kind: FlagKind::Int,
            default: ConfigValue::Int(default),
        };
        self.add_flag(cmd, arg, binding, help, opts);
    }

    pub(crate) fn add_bool_flag(
        &mut self,
        cmd: &mut Command,
        key: &'static str,
        short: Option<char>,
        default: bool,
        help: &str,
        opts: &[FlagOpt],
    ) {
        let action = if default {
            ArgAction::SetFalse
        } else {
            ArgAction::SetTrue
        };
        let mut arg = Arg::new(key).action(action);
        if let Some(short) = short {
            arg = arg.short(short);
        }

        let binding = FlagBinding {
            key,
            kind: FlagKind::Bool,
            default: ConfigValue::Bool(default),
        };
        self.add_flag(cmd, arg, binding, help, opts);
    }

    pub(crate) fn add_string_slice_flag(
        &mut self,
        cmd: &mut Command,
        key: &'static str,
        short: Option<char>,
        default: &[&str],
        help: &str,
        opts: &[FlagOpt],
    ) {
        let mut arg = Arg::new(key)
            .num_args(1)
            .action(ArgAction::Append)
            .value_delimiter(',');
        if let Some(short) = short {
            arg = arg.short(short);
        }
        if !default.is_empty() {
            arg = arg.default_values(default.iter().map(|d| d.to_string()));
        }

        let binding = FlagBinding {
            key,
            kind: FlagKind::StrSlice,
            default: ConfigValue::List(default.iter().map(|d| d.to_string()).collect()),
        };
        self.add_flag(cmd, arg, binding, help, opts);
    }
}
