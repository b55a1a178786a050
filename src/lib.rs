// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

#![deny(missing_docs)]
#![forbid(unsafe_code)]

//! Declarative command-line argument resolution with sub-command groups
//! and config file overrides.
//!
//! ---
//!
//! Table of contents:
//!
//! * [Overview](#overview)
//! * [Quickstart](#quickstart)
//! * [Examples](#examples)
//! * [Details](#details)
//! * [Terminology](#terminology)
//! * [Token grammar](#token-grammar)
//! * [Resolution order](#resolution-order)
//! * [Config files](#config-files)
//! * [Limitations](#limitations)
//!
//! ---
//!
//! # Overview
//!
//! Each argument is described by an [Arg]: its keys, the number of values
//! it takes, how those values are converted and checked, and a [Handler]
//! that turns the converted values into the argument's final value.
//! Arguments are bundled into groups. One group is the _root_ group, the
//! others act like sub-commands and are switched to with a `:name` token.
//!
//! Adding an argument to a group returns a [Handle] which is used to read
//! the value once the command-line has been resolved.
//!
//! # Quickstart
//!
//! ```rust
//! use argtier::{
//!     Arg, Cast, Group, GroupConfig, Handler, Outcome, Parser, Result, Signature, Value,
//! };
//!
//! fn main() -> Result<()> {
//!     let mut root = Group::<()>::with_default(GroupConfig::new("main")?);
//!
//!     // A required positional argument.
//!     let name = root.arg(
//!         Arg::new("name", Handler::unbound(|v: Vec<Value>| Ok(v[0].to_string())))
//!             .signature(Signature::of(Cast::Str))
//!             .position(0)
//!             .required(),
//!     )?;
//!
//!     // "-n <count>" or "--count <count>".
//!     let count = root.arg(
//!         Arg::new("count", Handler::unbound(|v: Vec<Value>| v[0].as_int()))
//!             .alias("n")
//!             .signature(Signature::of(Cast::Int))
//!             .default(1),
//!     )?;
//!
//!     let mut parser = Parser::new();
//!     parser.set_root(root, Some("greet"))?;
//!
//!     let args = vec!["world".to_string(), "-n".into(), "3".into()];
//!
//!     assert_eq!(parser.resolve_with_args(args)?, Outcome::Resolved);
//!
//!     assert_eq!(name.value()?, "world");
//!     assert_eq!(count.value()?, 3);
//!
//!     Ok(())
//! }
//! ```
//!
//! Real programs call [Parser::resolve()], which reads the process
//! arguments and exits if help was requested.
//!
//! # Examples
//!
//! Try out the programs in the `demos/` directory:
//!
//! ```bash
//! $ cargo run --example simple -- -v hello --times 3
//! $ cargo run --example subcommands -- hello --bar 15 -ab :other -n /usr/bin/browser --sum 1 2 3
//! $ cargo run --example error-handler -- --level 0
//! ```
//!
//! Set `RUST_LOG=argtier=trace` to see how each token is routed.
//!
//! # Details
//!
//! ## Terminology
//!
//! - An _argument_ has up to one alias (`-x`), any number of long names
//!   (`--name`) and optionally a _position_. When no name is given, the
//!   handler name passed to [Arg::new()] is used.
//!
//! - The [Signature] lists the parameters of the handler. It fixes the
//!   [Arity] of the argument: the minimum and maximum number of values.
//!   An argument whose arity is zero is a _flag_.
//!
//! - A _group_ is a named set of arguments. Its handlers may be bound to
//!   the group configuration ([Handler::type_bound()]) or to a context
//!   object created for the group the first time it is needed
//!   ([Handler::instance()]).
//!
//! - _Positional overflow_ is every bare value not taken by a named
//!   argument. It is spread across the positional arguments of the group
//!   in slot order.
//!
//! - The [Policy] of an argument decides what happens when it is given
//!   again: the repeat is ignored, is an error, or overwrites the value.
//!   There is one rule for the command-line pass and one for the config
//!   pass.
//!
//! ## Token grammar
//!
//! ```text
//! :name          switch to group ":name"
//! -x             alias
//! -xyz           several flag aliases
//! --name         long name
//! --name=value   long name with an attached value
//! -h, --help     show help for the current group
//! anything else  a bare value
//! ```
//!
//! A named argument consumes exactly its _minimum_ number of values from the
//! tokens that follow it. Bare values after those are still given to the
//! argument, up to its maximum; anything beyond that is positional overflow.
//!
//! ## Resolution order
//!
//! Within a group, handlers are called for arguments with a non-negative
//! [Arg::order()] first (ascending), then for arguments without an order
//! (by alias, else by smallest long name), then for arguments with a
//! negative order (ascending).
//!
//! ## Config files
//!
//! Unless disabled with [Settings::no_config_arg()], the root group accepts
//! `-c`/`--config [path]`. Once the command-line has been resolved, the file
//! is turned into tokens (see [config]) and resolved again as a second pass.
//! By default a value given on the command-line wins over the config file.
//!
//! # Limitations
//!
//! - Aliases are single ASCII letters.
//! - There is no `--` end of options marker.
//! - Help output is not wrapped to the terminal width.
//! - Groups are single level: a `:name` token always switches between
//!   registered groups.
//! - The root group cannot be switched back to. Its arguments must come
//!   before the first `:name` token.

mod arg;
pub mod config;
mod error;
mod group;
mod help;
mod parser;
mod registry;
mod resolve;
mod route;
mod value;

pub use error::{Error, ErrorKind, Result};

pub use arg::{
    validate_alias, validate_name, Arg, ArgInfo, Arity, Binding, Handle, Handler, Param, Policy,
    Repeat, Signature,
};
pub use group::{ArgGroup, Group, GroupBuilder, GroupConfig, Unit};
pub use help::render as render_help;
pub use parser::{get_args, Outcome, Parser, Settings};
pub use registry::{GroupId, Registry};
pub use resolve::resolve;
pub use route::{route, Routed, Routing, Token, HELP_KEYS};
pub use value::{Cast, Constraint, Value};
