// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::registry::{GroupId, Registry};

/// Tokens that request help, wherever they appear.
pub const HELP_KEYS: [&str; 2] = ["-h", "--help"];

static GROUP_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:\w[\w\d-]*[\w\d]$").expect("static regex must compile"));
static ALIAS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-[a-zA-Z]$").expect("static regex must compile"));
static LONG_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(--\w[\w\d-]*[\w\d])(?:=(.*))?$").expect("static regex must compile")
});
static ALIASES_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-[a-zA-Z]+$").expect("static regex must compile"));

/// Classification of a raw command-line token.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Token<'a> {
    /// `:name`
    Group(&'a str),
    /// `-x`
    Alias(&'a str),
    /// `--name` or `--name=value`
    Long {
        /// The `--name` part.
        name: &'a str,
        /// The part after `=`.
        attached: Option<&'a str>,
    },
    /// `-xyz`
    Aliases(&'a str),
    /// Anything else.
    Value(&'a str),
}

impl<'a> Token<'a> {
    /// Classify a token. The first matching class wins, in the order
    /// group, alias, long name, combined aliases.
    pub fn classify(raw: &'a str) -> Self {
        if GROUP_TOKEN.is_match(raw) {
            return Token::Group(raw);
        }

        if ALIAS_TOKEN.is_match(raw) {
            return Token::Alias(raw);
        }

        if let Some(caps) = LONG_TOKEN.captures(raw) {
            if let Some(name) = caps.get(1) {
                return Token::Long {
                    name: name.as_str(),
                    attached: caps.get(2).map(|m| m.as_str()),
                };
            }
        }

        if ALIASES_TOKEN.is_match(raw) {
            return Token::Aliases(raw);
        }

        Token::Value(raw)
    }

    fn is_help(&self) -> bool {
        match self {
            Token::Alias(key) | Token::Long { name: key, .. } => HELP_KEYS.contains(key),
            _ => false,
        }
    }
}

/// One element of the routed stream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Routed {
    /// Subsequent elements belong to this group.
    Group(GroupId),
    /// An argument (index within the current group).
    Arg(usize),
    /// A bare value.
    Value(String),
}

/// Result of routing a token sequence.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Routing {
    /// The routed stream, always starting with the root group marker.
    Stream(Vec<Routed>),
    /// Help was requested while this group was current.
    Help(GroupId),
}

/// Classify and route `tokens`, left to right, starting in the root group.
///
/// Arguments that take values consume their _minimum_ number of values from
/// the tokens that follow, whatever those tokens look like. Any further bare
/// values are collected later by the resolver.
pub fn route(registry: &Registry, tokens: &[String]) -> Result<Routing> {
    let mut current = registry.root()?;
    let mut stream = vec![Routed::Group(current)];

    let mut index = 0;

    while index < tokens.len() {
        let raw = tokens[index].as_str();
        let token = Token::classify(raw);

        index += 1;

        trace!(token = raw, class = ?token, "routing");

        if token.is_help() {
            return Ok(Routing::Help(current));
        }

        let group = registry.group(current);

        let (id, attached) = match token {
            Token::Value(value) => {
                stream.push(Routed::Value(value.into()));
                continue;
            }
            Token::Group(name) => {
                current = registry
                    .find(name)
                    .ok_or_else(|| Error::UnknownGroup(name.into()))?;

                stream.push(Routed::Group(current));
                continue;
            }
            Token::Aliases(letters) => {
                for c in letters.chars().skip(1) {
                    let alias = format!("-{}", c);
                    let id = group.route(&alias)?;

                    let is_flag = group.info(id).map_or(false, |i| i.is_flag());

                    if !is_flag {
                        return Err(Error::Bundled {
                            token: raw.into(),
                            alias,
                        });
                    }

                    stream.push(Routed::Arg(id));
                }
                continue;
            }
            Token::Alias(key) => (group.route(key)?, None),
            Token::Long { name, attached } => (group.route(name)?, attached),
        };

        let info = group.info(id);

        stream.push(Routed::Arg(id));

        if let Some(value) = attached {
            // A flag has nowhere to put an attached value.
            if let Some(info) = info.filter(|i| i.is_flag()) {
                return Err(Error::Arity {
                    arg: info.display_name(),
                    expected: info.arity().to_string(),
                    got: 1,
                });
            }

            stream.push(Routed::Value(value.into()));
            continue;
        }

        let min = info.map_or(0, |i| i.arity().min);

        stream.extend(
            tokens[index..]
                .iter()
                .take(min)
                .map(|v| Routed::Value(v.clone())),
        );

        index += min;
    }

    Ok(Routing::Stream(stream))
}
