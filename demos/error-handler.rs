// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

/// An example showing how to return an error from a handler, and how to
/// report errors by kind.
use argtier::{
    Arg, Cast, Constraint, Error, ErrorKind, Group, GroupConfig, Handler, Parser, Result,
    Signature, Value,
};
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn setup() -> Result<Parser> {
    let mut root = Group::<()>::with_default(GroupConfig::new("errors")?);

    // Handler errors are reported as `Error::Handler`.
    root.arg(
        Arg::new(
            "level",
            Handler::unbound(|v: Vec<Value>| match v[0].as_int()? {
                level @ 1..=9 => Ok(level),
                level => Err(Error::Handler(format!("level {} not in 1-9", level))),
            }),
        )
        .alias("l")
        .signature(Signature::of(Cast::Int))
        .help("a level from 1 to 9"),
    )?;

    // Only accept vowels.
    root.arg(
        Arg::new("vowel", Handler::unbound(|v: Vec<Value>| Ok(v[0].to_string())))
            .signature(Signature::of(Cast::Str))
            .constraint(Constraint::choices(["a", "e", "i", "o", "u"])),
    )?;

    let mut parser = Parser::new();
    parser.set_root(root, None)?;

    Ok(parser)
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = setup().and_then(|mut parser| parser.resolve());

    if let Err(e) = result {
        let code = match e.kind() {
            ErrorKind::Specification | ErrorKind::Internal => 70,
            ErrorKind::Config => 78,
            ErrorKind::Parsing | ErrorKind::Value => 64,
        };

        eprintln!("ERROR: {}", e);

        exit(code);
    }
}
