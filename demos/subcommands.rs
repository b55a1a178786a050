// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

/// An example with a root group and a sub-command group, using handlers
/// bound to a per-group context object.
use std::path::PathBuf;

use argtier::{Arg, Cast, Group, GroupConfig, Handler, Param, Parser, Result, Signature, Value};
use tracing_subscriber::EnvFilter;

/// Context for the root group handlers.
#[derive(Debug, Default)]
struct Thresholds {
    limit: i64,
}

/// Context for the `:other` group handlers.
#[derive(Debug, Default)]
struct Totals {
    sum: i64,
}

fn above(t: &mut Thresholds, v: Vec<Value>) -> Result<bool> {
    Ok(v[0].as_int()? > t.limit)
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut root = Group::builder(GroupConfig::new("root")?, || Thresholds { limit: 10 });

    let string = root.arg(
        Arg::new("string", Handler::unbound(|v: Vec<Value>| Ok(v[0].to_string())))
            .signature(Signature::of(Cast::Str))
            .position(0),
    )?;

    let foo = root.arg(
        Arg::new("foo", Handler::instance(above))
            .signature(Signature::of(Cast::Int))
            .help("whether the number is above the limit"),
    )?;

    let bar = root.arg(
        Arg::new("bar", Handler::instance(above))
            .signature(Signature::of(Cast::Int))
            .required(),
    )?;

    let a = root.arg(Arg::flag("arg_a", Handler::unbound(|_| Ok(true))).alias("a"))?;
    let b = root.arg(Arg::flag("arg_b", Handler::unbound(|_| Ok(true))).alias("b"))?;

    let mut other = Group::<Totals>::with_default(
        GroupConfig::new("other")?
            .about("Settings for other things")
            .usage_example("${indent}${root} :other -n /usr/bin/browser --sum 1 2 3"),
    );

    let not_headless =
        other.arg(Arg::flag("not_headless", Handler::unbound(|_| Ok(true))).alias("n"))?;

    let browser = other.arg(
        Arg::<Totals, PathBuf>::new("browser_location", Handler::unbound(|v| v[0].as_path()))
            .alias("b")
            .signature(Signature::of(Cast::Path))
            .position(0)
            .help("Location of browser"),
    )?;

    let sum = other.arg(
        Arg::new(
            "sum",
            Handler::instance(|t: &mut Totals, v: Vec<Value>| {
                for x in v {
                    t.sum += x.as_int()?;
                }
                Ok(t.sum)
            }),
        )
        .signature(Signature::new().param(Param::of(Cast::Int).variadic()))
        .default(0),
    )?;

    let mut parser = Parser::new();
    parser.set_root(root, None)?;
    parser.add_group(other)?;

    parser.resolve()?;

    println!("string={:?}", string.get());
    println!("foo={:?}", foo.get());
    println!("bar={:?}", bar.value()?);
    println!("arg_a={:?}", a.value()?);
    println!("arg_b={:?}", b.value()?);
    println!("not_headless={:?}", not_headless.value()?);
    println!("browser_location={:?}", browser.get());
    println!("sum={:?}", sum.value()?);
    println!("config={:?}", parser.config_path());

    Ok(())
}
