// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use thiserror::Error;

/// Broad classes of failure, used to decide how a failure should be
/// reported (and whether it is the user's or the programmer's fault).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed alias, name, signature or positional layout. Raised while
    /// groups and arguments are being declared.
    Specification,
    /// The command-line (or config file) could not be routed or violates a
    /// required or repeat rule.
    Parsing,
    /// A supplied value failed its arity, cast or constraint check.
    Value,
    /// The crate was used incorrectly (programmer error).
    Internal,
    /// The config file could not be read or understood.
    Config,
}

/// The error type.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    //------------------------------
    // Declaration errors (programmer error)
    //------------------------------
    /// An alias, name, signature or positional layout is invalid.
    #[error("invalid specification: {0}")]
    Specification(String),

    /// The root group was requested before one was designated.
    #[error("no root group designated")]
    NoRootGroup,

    //------------------------------
    // Runtime errors (user error)
    //------------------------------
    /// A group switch token named a group that does not exist.
    #[error("{0} not a group name")]
    UnknownGroup(String),

    /// An argument token is not known to the current group.
    #[error("no argument with key {key:?} in argument group {group:?}")]
    UnknownKey {
        /// The key (`-x` or `--name`) that was looked up.
        key: String,
        /// Name of the group that was searched.
        group: String,
    },

    /// A required argument was never given a value.
    #[error("argument {0} is required but was not specified")]
    MissingRequired(String),

    /// A required group was never switched to.
    #[error("group {0} is required but was not specified")]
    MissingGroup(String),

    /// An argument was given again and its policy forbids that.
    #[error("argument {0} given multiple times")]
    Repeated(String),

    /// A combined short flag token contained an argument that needs values.
    #[error("{alias} in {token:?} takes values and cannot be combined")]
    Bundled {
        /// The full token, for example `-abc`.
        token: String,
        /// The offending alias, for example `-b`.
        alias: String,
    },

    /// Bare values that no positional argument of the group could take.
    #[error("no positional argument in group {group:?} for {values:?}")]
    Unclaimed {
        /// Name of the group.
        group: String,
        /// The values left over.
        values: Vec<String>,
    },

    //------------------------------
    // Value errors (user error)
    //------------------------------
    /// Wrong number of values for an argument.
    #[error("argument {arg} expects {expected} value(s), got {got}")]
    Arity {
        /// Display name of the argument.
        arg: String,
        /// Human readable arity, for example `1` or `0-1` or `1+`.
        expected: String,
        /// Number of values supplied.
        got: usize,
    },

    /// Values not found in a choice list.
    #[error("args {values:?} are not in constraints {choices:?}")]
    NotInChoices {
        /// The offending raw values.
        values: Vec<String>,
        /// The permitted values.
        choices: Vec<String>,
    },

    /// Values rejected by a validator predicate.
    #[error("args {0:?} returned false when passed to validator function")]
    Rejected(Vec<String>),

    /// A raw value could not be converted.
    #[error("cannot cast {value:?} with {caster}: {reason}")]
    Cast {
        /// The raw value.
        value: String,
        /// Name of the caster.
        caster: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// A value was requested from an argument that holds nothing.
    #[error("{0:?} is empty")]
    Empty(String),

    /// A handler function reported a failure.
    #[error("handler error: {0}")]
    Handler(String),

    //------------------------------
    // Config errors
    //------------------------------
    /// The config file could not be read or parsed.
    #[error("config {path:?}: {reason}")]
    Config {
        /// Path of the config file.
        path: String,
        /// Why it could not be used.
        reason: String,
    },

    /// Writing output (help text) failed.
    #[error("io error: {0}")]
    Io(String),
}

impl Error {
    /// Returns the class of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Specification(_) => ErrorKind::Specification,
            Error::NoRootGroup | Error::Io(_) => ErrorKind::Internal,
            Error::UnknownGroup(_)
            | Error::UnknownKey { .. }
            | Error::MissingRequired(_)
            | Error::MissingGroup(_)
            | Error::Repeated(_)
            | Error::Bundled { .. }
            | Error::Unclaimed { .. } => ErrorKind::Parsing,
            Error::Arity { .. }
            | Error::NotInChoices { .. }
            | Error::Rejected(_)
            | Error::Cast { .. }
            | Error::Empty(_)
            | Error::Handler(_) => ErrorKind::Value,
            Error::Config { .. } => ErrorKind::Config,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Convenience type that allows a function to be defined as returning a
/// [Result], but which only requires the success type to be specified,
/// defaulting the error type to this crates `Error` type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
