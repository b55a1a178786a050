// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process;

use tracing::debug;

use crate::arg::{Arg, ArgInfo, Argument, Handle, Handler, Param, Policy, Repeat, Signature};
use crate::config;
use crate::error::{Error, Result};
use crate::group::GroupBuilder;
use crate::help;
use crate::registry::{GroupId, Registry};
use crate::resolve::resolve;
use crate::route::{route, Routing};
use crate::value::{Cast, Value};

const HELP_TEXT: &str = "Display this help message and exit";

const CONFIG_TEXT: &str = "Path to a config file that contains additional args. \
     If no path is given, a config.json or config.toml file next to the program is used";

/// Settings used to control the parsers behaviour.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialOrd, Default, PartialEq)]
pub struct Settings {
    /// If set, the root group does not get a `-c`/`--config` argument and
    /// no config pass is run.
    no_config_arg: bool,
}

impl Settings {
    /// Create a new settings object.
    pub fn new() -> Self {
        Settings::default()
    }

    /// Specify that the `-c`/`--config` argument should not be added to the
    /// root group (which frees up both keys for the program's own use).
    pub fn no_config_arg(self) -> Self {
        Settings {
            no_config_arg: true,
            ..self
        }
    }
}

/// How a resolution run ended.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Outcome {
    /// All passes completed: values can be read through the handles.
    Resolved,
    /// Help was requested and written; nothing after the help token was
    /// resolved.
    Help,
}

/// Get a list of all command-line arguments specified to the program with
/// the program name (the first argument) removed.
///
/// # Note
///
/// Used with [Parser::resolve_with_args()]. However, this isn't usually
/// required: just call [Parser::resolve()].
pub fn get_args() -> Vec<String> {
    env::args().skip(1).collect()
}

// Resolution passes, in order.
#[derive(Debug)]
enum Pass {
    Primary(Vec<String>),
    ConfigCheck,
    Config(PathBuf),
    Done,
}

/// The entry point: owns the group registry and runs the command-line pass
/// followed by the optional config file pass.
#[derive(Debug, Default)]
pub struct Parser {
    registry: Registry,
    settings: Settings,
    config: Option<Handle<Option<PathBuf>>>,
    help: Option<ArgInfo>,
}

impl Parser {
    /// Create a new parser.
    pub fn new() -> Self {
        Parser::default()
    }

    /// Specify the settings. Must be called before [Parser::set_root()].
    pub fn settings(self, settings: Settings) -> Self {
        Parser { settings, ..self }
    }

    /// Designate the root group: the group active before any `:name` token.
    ///
    /// Unless disabled with [Settings::no_config_arg()], the `-c`/`--config`
    /// argument is added to the group first.
    ///
    /// If `prog` is not specified, the program name is taken from the
    /// command-line.
    pub fn set_root<C: 'static>(
        &mut self,
        mut builder: GroupBuilder<C>,
        prog: Option<&str>,
    ) -> Result<GroupId> {
        let (help, _) = Arg::<(), bool>::flag("help", Handler::unbound(|_| Ok(true)))
            .alias("h")
            .help(HELP_TEXT)
            .bind()?;

        if !self.settings.no_config_arg {
            self.config = Some(builder.arg(config_arg())?);
        }

        let id = self.registry.designate_root(builder.build()?, prog)?;

        self.help = Some(help.info().clone());

        Ok(id)
    }

    /// Register a group that can be switched to with its `:name` token.
    pub fn add_group<C: 'static>(&mut self, builder: GroupBuilder<C>) -> Result<GroupId> {
        Ok(self.registry.register(builder.build()?))
    }

    /// The group registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The config file in use, if any.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.as_ref().and_then(|h| h.get()).flatten()
    }

    /// Resolve `args` (without the program name), then the config file if
    /// one was given. Help is written to `writer`.
    pub fn resolve_with_writer<W>(
        &mut self,
        writer: &mut W,
        args: Vec<String>,
    ) -> Result<Outcome>
    where
        W: Write,
    {
        let mut seen = Vec::<GroupId>::new();
        let mut pass = Pass::Primary(args);

        loop {
            debug!(?pass, "resolution pass");

            pass = match pass {
                Pass::Primary(tokens) => match self.run(writer, &tokens, false, &mut seen)? {
                    Outcome::Help => return Ok(Outcome::Help),
                    Outcome::Resolved => Pass::ConfigCheck,
                },
                Pass::ConfigCheck => match self.config_path() {
                    Some(path) => Pass::Config(path),
                    None => Pass::Done,
                },
                Pass::Config(path) => {
                    let tokens = config::load(&path)?;

                    match self.run(writer, &tokens, true, &mut seen)? {
                        Outcome::Help => return Ok(Outcome::Help),
                        Outcome::Resolved => Pass::Done,
                    }
                }
                Pass::Done => break,
            };
        }

        for (id, group) in self.registry.groups() {
            if group.config().is_required() && !seen.contains(&id) {
                return Err(Error::MissingGroup(group.config().name().into()));
            }
        }

        Ok(Outcome::Resolved)
    }

    /// Like [Parser::resolve_with_writer()], writing help to stdout.
    pub fn resolve_with_args(&mut self, args: Vec<String>) -> Result<Outcome> {
        self.resolve_with_writer(&mut std::io::stdout(), args)
    }

    /// Simplest interface to the parser: resolve the program's arguments,
    /// exiting the process with status 0 if help was requested.
    pub fn resolve(&mut self) -> Result<()> {
        if self.resolve_with_args(get_args())? == Outcome::Help {
            process::exit(0);
        }

        Ok(())
    }

    fn run<W>(
        &mut self,
        writer: &mut W,
        tokens: &[String],
        from_config: bool,
        seen: &mut Vec<GroupId>,
    ) -> Result<Outcome>
    where
        W: Write,
    {
        match route(&self.registry, tokens)? {
            Routing::Help(current) => {
                let help = self.help.as_ref().ok_or(Error::NoRootGroup)?;

                help::render(writer, &self.registry, current, help)?;

                Ok(Outcome::Help)
            }
            Routing::Stream(stream) => {
                for id in resolve(&mut self.registry, stream, from_config)? {
                    if !seen.contains(&id) {
                        seen.push(id);
                    }
                }

                Ok(Outcome::Resolved)
            }
        }
    }
}

fn config_arg<C>() -> Arg<C, Option<PathBuf>> {
    Arg::new(
        "config",
        Handler::unbound(|values: Vec<Value>| {
            let path = values.first().map(Value::as_path).transpose()?;

            config::locate(path.as_deref()).map(Some)
        }),
    )
    .alias("c")
    .signature(Signature::new().param(Param::of(Cast::Path).optional()))
    .default(None)
    .policy(Policy::uniform(Repeat::Error))
    .help(CONFIG_TEXT)
}
