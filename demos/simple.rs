// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

/// A simple example showing a positional argument, a flag and an option
/// with a converted value.
use argtier::{Arg, Cast, Group, GroupConfig, Handler, Parser, Result, Signature, Value};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut root = Group::<()>::with_default(
        GroupConfig::new("simple")?
            .about("Repeat a word")
            .usage_example("${indent}${root} -v hello --times 3"),
    );

    // Support "<word>".
    let word = root.arg(
        Arg::new("word", Handler::unbound(|v: Vec<Value>| Ok(v[0].to_string())))
            .signature(Signature::of(Cast::Str))
            .position(0)
            .required()
            .help("word to repeat"),
    )?;

    // Support "-v" and "--verbose".
    let verbose = root.arg(
        Arg::flag("verbose", Handler::unbound(|_| Ok(true)))
            .alias("v")
            .help("show the settings"),
    )?;

    // Support "-t <count>" and "--times <count>".
    let times = root.arg(
        Arg::new("times", Handler::unbound(|v: Vec<Value>| v[0].as_int()))
            .alias("t")
            .signature(Signature::of(Cast::Int))
            .default(1)
            .help("number of repeats"),
    )?;

    let mut parser = Parser::new();
    parser.set_root(root, None)?;

    // Parse the command-line
    parser.resolve()?;

    let word = word.value()?;
    let times = times.value()?;

    if verbose.value()? {
        println!("INFO: word: {:?}, times: {}", word, times);
    }

    for _ in 0..times {
        println!("{}", word);
    }

    Ok(())
}
