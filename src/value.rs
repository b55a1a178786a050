// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::error::{Error, Result};

/// A raw command-line token after it has been converted by a [Cast].
///
/// Handlers receive a `Vec<Value>` and turn it into whatever type the
/// argument finally holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unconverted string.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Filesystem path.
    Path(PathBuf),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Path(_) => "path",
        }
    }

    fn mismatch(&self, wanted: &str) -> Error {
        Error::Handler(format!(
            "expected {} value, found {} ({})",
            wanted,
            self.type_name(),
            self
        ))
    }

    /// Returns the string, failing for any other variant.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            _ => Err(self.mismatch("str")),
        }
    }

    /// Returns the integer, failing for any other variant.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            _ => Err(self.mismatch("int")),
        }
    }

    /// Returns the number, widening integers.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(self.mismatch("float")),
        }
    }

    /// Returns the boolean, failing for any other variant.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.mismatch("bool")),
        }
    }

    /// Returns the path. Strings are accepted too.
    pub fn as_path(&self) -> Result<PathBuf> {
        match self {
            Value::Path(p) => Ok(p.clone()),
            Value::Str(s) => Ok(PathBuf::from(s)),
            _ => Err(self.mismatch("path")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

type CastFn = dyn Fn(&str) -> std::result::Result<Value, String>;

/// Converts a raw token into a [Value].
#[derive(Clone)]
pub enum Cast {
    /// Keep the token as a string.
    Str,
    /// Parse as `i64`.
    Int,
    /// Parse as `f64`.
    Float,
    /// Parse `true/false`, `1/0`, `yes/no`, `on/off` (any case).
    Bool,
    /// Treat as a filesystem path.
    Path,
    /// Caller supplied conversion.
    Custom(String, Rc<CastFn>),
}

impl Cast {
    /// Create a named custom caster.
    pub fn custom<F>(name: &str, f: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, String> + 'static,
    {
        Cast::Custom(name.into(), Rc::new(f))
    }

    /// Name used in help output and error messages.
    pub fn name(&self) -> &str {
        match self {
            Cast::Str => "str",
            Cast::Int => "int",
            Cast::Float => "float",
            Cast::Bool => "bool",
            Cast::Path => "path",
            Cast::Custom(name, _) => name,
        }
    }

    /// Convert a single raw token.
    pub fn cast(&self, raw: &str) -> Result<Value> {
        let converted = match self {
            Cast::Str => Ok(Value::Str(raw.into())),
            Cast::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| e.to_string()),
            Cast::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| e.to_string()),
            Cast::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err("not a boolean".to_string()),
            },
            Cast::Path => Ok(Value::Path(PathBuf::from(raw))),
            Cast::Custom(_, f) => f(raw),
        };

        converted.map_err(|reason| Error::Cast {
            value: raw.into(),
            caster: self.name().into(),
            reason,
        })
    }
}

impl fmt::Debug for Cast {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Cast({})", self.name())
    }
}

impl PartialEq for Cast {
    fn eq(&self, other: &Cast) -> bool {
        match (self, other) {
            (Cast::Custom(a, fa), Cast::Custom(b, fb)) => a == b && Rc::ptr_eq(fa, fb),
            _ => self.name() == other.name(),
        }
    }
}

type PredicateFn = dyn Fn(&str) -> bool;

/// A check applied to every raw value before it is cast.
#[derive(Clone)]
pub enum Constraint {
    /// Every value must be one of these.
    Choices(Vec<String>),
    /// Every value must satisfy the predicate. The string describes the
    /// rule for help output.
    Predicate(String, Rc<PredicateFn>),
}

impl Constraint {
    /// Create an allow-list constraint.
    pub fn choices<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::Choices(choices.into_iter().map(Into::into).collect())
    }

    /// Create a predicate constraint.
    pub fn predicate<F>(about: &str, f: F) -> Self
    where
        F: Fn(&str) -> bool + 'static,
    {
        Constraint::Predicate(about.into(), Rc::new(f))
    }

    /// Check all values, naming every value that fails.
    pub fn check(&self, values: &[String]) -> Result<()> {
        match self {
            Constraint::Choices(choices) => {
                let failed: Vec<String> = values
                    .iter()
                    .filter(|v| !choices.contains(v))
                    .cloned()
                    .collect();

                if failed.is_empty() {
                    return Ok(());
                }

                Err(Error::NotInChoices {
                    values: failed,
                    choices: choices.clone(),
                })
            }
            Constraint::Predicate(_, f) => {
                let failed: Vec<String> = values.iter().filter(|v| !f(v)).cloned().collect();

                if failed.is_empty() {
                    return Ok(());
                }

                Err(Error::Rejected(failed))
            }
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constraint::Choices(c) => write!(f, "Choices({:?})", c),
            Constraint::Predicate(about, _) => write!(f, "Predicate({:?})", about),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Constraint::Choices(c) => write!(f, "{}", c.join(",")),
            Constraint::Predicate(about, _) => write!(f, "{}", about),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast() {
        #[derive(Debug)]
        struct TestData<'a> {
            cast: Cast,
            raw: &'a str,
            result: Result<Value>,
        }

        let tests = &[
            TestData {
                cast: Cast::Str,
                raw: " spaced ",
                result: Ok(Value::Str(" spaced ".into())),
            },
            TestData {
                cast: Cast::Int,
                raw: "15",
                result: Ok(Value::Int(15)),
            },
            TestData {
                cast: Cast::Int,
                raw: "-3",
                result: Ok(Value::Int(-3)),
            },
            TestData {
                cast: Cast::Float,
                raw: "2.5",
                result: Ok(Value::Float(2.5)),
            },
            TestData {
                cast: Cast::Bool,
                raw: "Yes",
                result: Ok(Value::Bool(true)),
            },
            TestData {
                cast: Cast::Bool,
                raw: "off",
                result: Ok(Value::Bool(false)),
            },
            TestData {
                cast: Cast::Path,
                raw: "/tmp/x",
                result: Ok(Value::Path(PathBuf::from("/tmp/x"))),
            },
            TestData {
                cast: Cast::Bool,
                raw: "maybe",
                result: Err(Error::Cast {
                    value: "maybe".into(),
                    caster: "bool".into(),
                    reason: "not a boolean".into(),
                }),
            },
        ];

        for (i, d) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            let result = d.cast.cast(d.raw);

            assert_eq!(result, d.result, "{}", msg);
        }

        let result = Cast::Int.cast("abc");
        assert!(matches!(result, Err(Error::Cast { ref caster, .. }) if caster == "int"));
    }

    #[test]
    fn test_custom_cast() {
        let upper = Cast::custom("upper", |s| Ok(Value::Str(s.to_uppercase())));

        assert_eq!(upper.name(), "upper");
        assert_eq!(upper.cast("abc"), Ok(Value::Str("ABC".into())));

        let never = Cast::custom("never", |_| Err("nope".to_string()));
        assert_eq!(
            never.cast("x"),
            Err(Error::Cast {
                value: "x".into(),
                caster: "never".into(),
                reason: "nope".into(),
            })
        );
    }

    #[test]
    fn test_constraint() {
        let values = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<String>>();

        let choices = Constraint::choices(["a", "b"]);
        assert!(choices.check(&values(&["a", "b", "a"])).is_ok());
        assert_eq!(
            choices.check(&values(&["a", "c", "d"])),
            Err(Error::NotInChoices {
                values: values(&["c", "d"]),
                choices: values(&["a", "b"]),
            })
        );

        let short = Constraint::predicate("at most 3 chars", |s| s.len() <= 3);
        assert!(short.check(&values(&["abc", ""])).is_ok());
        assert_eq!(
            short.check(&values(&["abcd", "ab", "xxxxx"])),
            Err(Error::Rejected(values(&["abcd", "xxxxx"])))
        );

        assert_eq!(short.to_string(), "at most 3 chars");
        assert_eq!(choices.to_string(), "a,b");
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(3).as_int(), Ok(3));
        assert_eq!(Value::Int(3).as_float(), Ok(3.0));
        assert_eq!(Value::Str("p".into()).as_path(), Ok(PathBuf::from("p")));
        assert_eq!(Value::Bool(true).as_bool(), Ok(true));
        assert!(Value::Str("1".into()).as_int().is_err());
        assert!(Value::Int(1).as_str().is_err());
    }
}
