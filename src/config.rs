// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Turn a structured config file into the synthetic token stream resolved
//! by the config pass.
//!
//! Every key of a mapping becomes an argument token:
//!
//! | Config value | Tokens |
//! |-|-|
//! | scalar | `--key value` |
//! | list | `--key v1 v2 ...` |
//! | mapping | `:key` followed by the flattened mapping |
//! | null | `--key` |
//!
//! Single letter keys produce an alias token (`-k`) instead of a long name.
//! Within a mapping, nested mappings are emitted after all other keys so
//! that those keys stay in the enclosing group.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::error::{Error, Result};

/// File names searched for when the config argument is given without a
/// path, in order.
pub const CONFIG_NAMES: &[&str] = &["config.json", "config.toml"];

/// Supported config file formats.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Format {
    /// JSON; key order is preserved.
    Json,
    /// TOML; key order is preserved.
    Toml,
}

impl Format {
    /// Determine the format from the file extension. Anything that is not
    /// `.toml` is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

fn config_error(path: &Path, reason: impl ToString) -> Error {
    Error::Config {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Read a config file and flatten it into tokens.
pub fn load(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| config_error(path, e))?;

    let format = Format::from_path(path);

    debug!(path = %path.display(), ?format, "loading config");

    let data = parse(&content, format).map_err(|e| config_error(path, e))?;

    tokens(&data).ok_or_else(|| config_error(path, "top level must be a mapping"))
}

/// Parse config text into a JSON document.
pub fn parse(content: &str, format: Format) -> std::result::Result<Json, String> {
    match format {
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => {
            let table: toml::Table = toml::from_str(content).map_err(|e| e.to_string())?;

            Ok(from_toml(toml::Value::Table(table)))
        }
    }
}

fn from_toml(value: toml::Value) -> Json {
    match value {
        toml::Value::String(s) => Json::String(s),
        toml::Value::Integer(i) => Json::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(f.to_string())),
        toml::Value::Boolean(b) => Json::Bool(b),
        toml::Value::Datetime(d) => Json::String(d.to_string()),
        toml::Value::Array(a) => Json::Array(a.into_iter().map(from_toml).collect()),
        toml::Value::Table(t) => Json::Object(
            t.into_iter()
                .map(|(k, v)| (k, from_toml(v)))
                .collect::<Map<String, Json>>(),
        ),
    }
}

/// Flatten a document into tokens. Returns [None] if the document is not a
/// mapping.
pub fn tokens(data: &Json) -> Option<Vec<String>> {
    let map = data.as_object()?;

    let mut output = Vec::new();

    flatten(map, &mut output);

    Some(output)
}

fn key_token(key: &str) -> String {
    if key.chars().count() == 1 {
        format!("-{}", key)
    } else {
        format!("--{}", key)
    }
}

fn text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Mappings switch group, so they come after every other key of `map`.
fn flatten(map: &Map<String, Json>, output: &mut Vec<String>) {
    for (key, value) in map {
        match value {
            Json::Object(_) => (),
            Json::Array(items) => {
                output.push(key_token(key));
                output.extend(items.iter().map(text));
            }
            Json::Null => output.push(key_token(key)),
            scalar => {
                output.push(key_token(key));
                output.push(text(scalar));
            }
        }
    }

    for (key, value) in map {
        if let Json::Object(inner) = value {
            output.push(format!(":{}", key));
            flatten(inner, output);
        }
    }
}

/// Find the config file to load.
///
/// An explicit path must exist and is returned in canonical form. Without
/// one, the directory holding the running executable is searched for the
/// [CONFIG_NAMES].
pub fn locate(path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = path {
        return path.canonicalize().map_err(|e| config_error(path, e));
    }

    let exe = env::current_exe()?;

    let dir = exe
        .parent()
        .ok_or_else(|| config_error(&exe, "executable has no parent directory"))?;

    search(dir)
}

pub(crate) fn search(dir: &Path) -> Result<PathBuf> {
    CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            config_error(
                dir,
                format!("none of {} found", CONFIG_NAMES.join(", ")),
            )
        })
}
