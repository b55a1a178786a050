// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fmt;
use std::io::Write;

use crate::arg::ArgInfo;
use crate::error::Result;
use crate::registry::{GroupId, Registry};
use crate::value::Cast;

const USAGE_PREFIX_SPACES: &str = "    ";
const OPTIONS_STR: &str = "[OPTIONS,...]";

/// String to show in usage if an argument is required
const REQUIRED_STR: &str = " (required)";

/// String to show in usage if an argument has a default
const DEFAULT_STR: &str = " (default)";

impl fmt::Display for ArgInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_name())?;

        if !self.is_flag() {
            write!(f, " n={}", self.arity())?;
        }

        if let Some(position) = self.position() {
            write!(f, " p={}", position)?;
        }

        if self.required() {
            write!(f, "{}", REQUIRED_STR)?;
        }

        if self.has_default() {
            write!(f, "{}", DEFAULT_STR)?;
        }

        match self.cast() {
            Some(cast) => write!(f, " type={}", cast.name())?,
            None if self.params().iter().any(|p| p.cast.is_some()) => {
                let names: Vec<&str> = self
                    .params()
                    .iter()
                    .map(|p| p.cast.as_ref().map_or("str", Cast::name))
                    .collect();

                write!(f, " type={}", names.join(","))?;
            }
            None => (),
        }

        match self.constraint() {
            Some(constraint) => write!(f, " [{}]", constraint)?,
            None => {
                for choices in self.params().iter().filter_map(|p| p.choices.as_ref()) {
                    write!(f, " [{}]", choices.join(","))?;
                }
            }
        }

        if let Some(help) = self.help() {
            write!(f, " # {}", help)?;
        }

        Ok(())
    }
}

/// Write help for the `current` group.
///
/// The root group's help also lists every registered group. `help` is the
/// argument that requested help; it is shown separately since it belongs to
/// no group.
pub fn render<W>(
    writer: &mut W,
    registry: &Registry,
    current: GroupId,
    help: &ArgInfo,
) -> Result<()>
where
    W: Write,
{
    let is_root = registry.root()? == current;
    let group = registry.group(current);
    let config = group.config();
    let prog = registry.prog();

    let groups = match is_root {
        true => registry.groups(),
        false => Vec::new(),
    };

    let mut lines = Vec::<String>::new();

    lines.push(format!("NAME:\n{}{}\n", USAGE_PREFIX_SPACES, prog));

    lines.push("USAGE:".into());

    let mut usage = format!("{}{} {}", USAGE_PREFIX_SPACES, prog, OPTIONS_STR);

    if !is_root {
        usage = format!("{} {} {}", usage, config.name(), OPTIONS_STR);
    } else if !groups.is_empty() {
        usage = format!("{} [:GROUPNAME,...]", usage);
    }

    lines.push(format!("{}\n", usage));

    if let Some(about) = config.description() {
        lines.push(format!("ABOUT:\n{}{}\n", USAGE_PREFIX_SPACES, about.trim()));
    }

    //------------------------------------------------------------

    if !groups.is_empty() {
        lines.push("GROUPS:".into());

        let width = groups
            .iter()
            .map(|(_, g)| g.config().name().len())
            .max()
            .unwrap_or_default();

        for (_, g) in groups.iter() {
            let about = g.config().description().unwrap_or_default();

            let line = format!(
                "{}{:<width$}  {}",
                USAGE_PREFIX_SPACES,
                g.config().name(),
                about,
                width = width
            );

            lines.push(line.trim_end().into());
        }

        lines.push(format!(
            "\n{}For details of a group run '{} :GROUPNAME -h'\n",
            USAGE_PREFIX_SPACES, prog
        ));
    }

    //------------------------------------------------------------

    let args = group.ordered();

    if !args.is_empty() {
        lines.push("ARGUMENTS:".into());

        for info in args {
            lines.push(format!("{}{}", USAGE_PREFIX_SPACES, info));
        }

        lines.push("".into());
    }

    lines.push("HELP:".into());
    lines.push(format!("{}{}\n", USAGE_PREFIX_SPACES, help));

    //------------------------------------------------------------

    if let Some(example) = config.example() {
        let example = example
            .trim_end()
            .replace("${indent}", USAGE_PREFIX_SPACES)
            .replace("${root}", &format!("{} {}", prog, OPTIONS_STR));

        lines.push(format!("EXAMPLE:\n{}", example));
    }

    // Join all the lines together, remove white space at either end and
    // finally append a single newline.
    let mut final_lines = lines.join("\n").trim().to_string();
    final_lines.push('\n');

    writeln!(writer, "{}", final_lines)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::arg::{Arg, Argument, Handler, Param, Signature};
    use crate::group::{Group, GroupConfig};
    use crate::value::{Constraint, Value};
    use regex::Regex;

    fn help_info() -> ArgInfo {
        let (spec, _) = Arg::<(), bool>::flag("help", Handler::unbound(|_| Ok(true)))
            .alias("h")
            .help("show this help")
            .bind()
            .unwrap();

        spec.info().clone()
    }

    fn text(name: &str) -> Arg<(), String> {
        Arg::new(
            name,
            Handler::unbound(|v: Vec<Value>| Ok(v.iter().map(|x| x.to_string()).collect())),
        )
        .signature(Signature::of(Cast::Str))
    }

    fn registry() -> (Registry, GroupId, GroupId) {
        let mut root = Group::<()>::with_default(
            GroupConfig::new("main")
                .unwrap()
                .about("does things")
                .usage_example("${indent}${root} -v file\n${indent}${root} :sub --size 3"),
        );

        root.arg(text("file").position(0).required().help("input file")).unwrap();
        root.arg(
            Arg::flag("verbose", Handler::unbound(|_| Ok(true)))
                .alias("v")
                .help("chatty"),
        )
        .unwrap();
        root.arg(
            Arg::<(), i64>::new("size", Handler::unbound(|v: Vec<Value>| v[0].as_int()))
                .alias("s")
                .signature(Signature::of(Cast::Int))
                .default(1),
        )
        .unwrap();

        let config = GroupConfig::new("sub").unwrap().about("a subgroup");
        let mut sub = Group::<()>::with_default(config);
        sub.arg(
            text("mode").signature(Signature::new().param(Param::new().choices(["up", "down"]))),
        )
        .unwrap();
        sub.arg(
            text("level")
                .cast(Cast::Int)
                .constraint(Constraint::predicate("level > 0", |s| s != "0"))
                .order(-1),
        )
        .unwrap();
        sub.arg(
            text("pair").signature(
                Signature::new()
                    .param(Param::of(Cast::Int))
                    .param(Param::new().optional()),
            ),
        )
        .unwrap();

        let empty = Group::<()>::with_default(GroupConfig::new("another").unwrap());

        let mut registry = Registry::new();
        let sub = registry.register(sub.build().unwrap());
        registry.register(empty.build().unwrap());
        let root = registry
            .designate_root(root.build().unwrap(), Some("my-prog"))
            .unwrap();

        (registry, root, sub)
    }

    fn render_string(registry: &Registry, current: GroupId) -> String {
        let mut output = Vec::<u8>::new();

        render(&mut output, registry, current, &help_info()).unwrap();

        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_arg_info_display() {
        assert_eq!(help_info().to_string(), "-h/--help (default) # show this help");

        let (spec, _) = text("name").alias("n").required().bind().unwrap();
        assert_eq!(spec.info().to_string(), "-n/--name n=1 (required) type=str");
    }

    #[test]
    fn test_render_root() {
        let (registry, root, _) = registry();

        let output = render_string(&registry, root);

        let tests = &[
            r#"^NAME:\n\s+my-prog\n"#.to_string(),
            r#"USAGE:\n\s+my-prog \[OPTIONS,...\] \[:GROUPNAME,...\]\n"#.into(),
            r#"ABOUT:\n\s+does things\n"#.into(),
            concat!(
                r#"GROUPS:\n"#,
                r#"\s+:another\n"#,
                r#"\s+:sub      a subgroup\n"#,
            )
            .into(),
            concat!(
                r#"ARGUMENTS:\n"#,
                r#"\s+--file n=1 p=0 \(required\) type=str # input file\n"#,
                r#"\s+-s/--size n=1 \(default\) type=int\n"#,
                r#"\s+-v/--verbose \(default\) # chatty\n"#,
            )
            .into(),
            r#"HELP:\n\s+-h/--help \(default\) # show this help\n"#.into(),
            concat!(
                r#"EXAMPLE:\n"#,
                r#"    my-prog \[OPTIONS,...\] -v file\n"#,
                r#"    my-prog \[OPTIONS,...\] :sub --size 3\n"#,
            )
            .into(),
        ];

        for (i, re) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}, output: {:?}", i, re, output);

            let re = Regex::new(re).unwrap();

            assert!(re.is_match(&output), "{}", msg);
        }
    }

    #[test]
    fn test_render_group() {
        let (registry, _, sub) = registry();

        let output = render_string(&registry, sub);

        let tests = &[
            r#"USAGE:\n\s+my-prog \[OPTIONS,...\] :sub \[OPTIONS,...\]\n"#,
            r#"ABOUT:\n\s+a subgroup\n"#,
            concat!(
                r#"ARGUMENTS:\n"#,
                r#"\s+--mode n=1 \[up,down\]\n"#,
                r#"\s+--pair n=1-2 type=int,str\n"#,
                r#"\s+--level n=1 type=int \[level > 0\]\n"#,
            ),
        ];

        for (i, re) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}, output: {:?}", i, re, output);

            let re = Regex::new(re).unwrap();

            assert!(re.is_match(&output), "{}", msg);
        }

        assert!(!output.contains("GROUPS:"));
        assert!(!output.contains("EXAMPLE:"));
    }
}
