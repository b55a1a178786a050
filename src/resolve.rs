// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use tracing::debug;

use crate::error::{Error, Result};
use crate::group::{ArgGroup, Unit};
use crate::registry::{GroupId, Registry};
use crate::route::Routed;

/// The part of a routed stream belonging to one group marker.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub(crate) struct Bucket {
    pub group: GroupId,
    /// Bare values seen before the first argument.
    pub leading: Vec<String>,
    pub units: Vec<Unit>,
}

impl Bucket {
    fn new(group: GroupId) -> Self {
        Bucket {
            group,
            ..Default::default()
        }
    }

    fn close(&mut self, arg: Option<usize>, values: Vec<String>) {
        match arg {
            Some(arg) => self.units.push(Unit::new(arg, values)),
            None => self.leading.extend(values),
        }
    }
}

/// Split a routed stream into one bucket per group marker. Within a bucket,
/// every argument collects the bare values that follow it.
pub(crate) fn partition(stream: Vec<Routed>) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut current: Option<usize> = None;
    let mut values: Vec<String> = Vec::new();

    for item in stream {
        match item {
            Routed::Group(group) => {
                if let Some(bucket) = buckets.last_mut() {
                    bucket.close(current.take(), std::mem::take(&mut values));
                }

                buckets.push(Bucket::new(group));
            }
            Routed::Arg(arg) => {
                if let Some(bucket) = buckets.last_mut() {
                    bucket.close(current.take(), std::mem::take(&mut values));
                }

                current = Some(arg);
            }
            Routed::Value(value) => values.push(value),
        }
    }

    if let Some(bucket) = buckets.last_mut() {
        bucket.close(current, values);
    }

    buckets
}

/// Turn a bucket into the units its group resolves.
///
/// Values an argument collected beyond its maximum arity are positional
/// overflow, as are the bucket's leading values. Overflow is spread across
/// the positional slots in order: each bounded slot takes up to its maximum,
/// an unbounded slot takes the rest.
pub(crate) fn distribute(group: &dyn ArgGroup, bucket: Bucket) -> Result<Vec<Unit>> {
    let mut overflow = bucket.leading;
    let mut units = Vec::with_capacity(bucket.units.len());

    for mut unit in bucket.units {
        let max = group.info(unit.arg).and_then(|i| i.arity().max);

        if let Some(max) = max {
            if unit.values.len() > max {
                overflow.extend(unit.values.split_off(max));
            }
        }

        units.push(unit);
    }

    if overflow.is_empty() {
        return Ok(units);
    }

    debug!(group = %group.config().name(), values = ?overflow, "positional overflow");

    let mut rest = overflow.as_slice();

    for &slot in group.positional() {
        if rest.is_empty() {
            break;
        }

        let take = match group.info(slot).and_then(|i| i.arity().max) {
            Some(max) => max.min(rest.len()),
            None => rest.len(),
        };

        let (head, tail) = rest.split_at(take);

        units.push(Unit::new(slot, head.to_vec()));
        rest = tail;
    }

    if !rest.is_empty() {
        return Err(Error::Unclaimed {
            group: group.config().name().into(),
            values: rest.to_vec(),
        });
    }

    Ok(units)
}

/// Resolve a routed stream: every group named in it is handed its units and
/// resolved once, in order of first appearance. Returns those groups.
///
/// On failure, units still queued in any of those groups are dropped.
pub fn resolve(
    registry: &mut Registry,
    stream: Vec<Routed>,
    from_config: bool,
) -> Result<Vec<GroupId>> {
    let mut touched: Vec<GroupId> = Vec::new();

    if let Err(e) = resolve_groups(registry, stream, from_config, &mut touched) {
        for &id in &touched {
            registry.group_mut(id).discard();
        }

        return Err(e);
    }

    Ok(touched)
}

fn resolve_groups(
    registry: &mut Registry,
    stream: Vec<Routed>,
    from_config: bool,
    touched: &mut Vec<GroupId>,
) -> Result<()> {
    for bucket in partition(stream) {
        let id = bucket.group;
        let group = registry.group_mut(id);

        let units = distribute(group, bucket)?;
        group.accumulate(units);

        if !touched.contains(&id) {
            touched.push(id);
        }
    }

    for &id in touched.iter() {
        debug!(group = %registry.group(id).config().name(), from_config, "resolving group");

        registry.group_mut(id).resolve(from_config)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::arg::{Arg, Handle, Handler, Param, Policy, Repeat, Signature};
    use crate::group::{Group, GroupConfig};
    use crate::value::{Cast, Value};

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn collect(name: &str, signature: Signature) -> Arg<(), Vec<String>> {
        Arg::new(
            name,
            Handler::unbound(|v: Vec<Value>| Ok(v.iter().map(|x| x.to_string()).collect())),
        )
        .signature(signature)
    }

    fn one() -> Signature {
        Signature::of(Cast::Str)
    }

    fn many() -> Signature {
        Signature::new().param(Param::new().variadic())
    }

    fn value(s: &str) -> Routed {
        Routed::Value(s.into())
    }

    #[test]
    fn test_partition() {
        let stream = vec![
            Routed::Group(0),
            value("a"),
            value("b"),
            Routed::Arg(1),
            value("c"),
            Routed::Arg(2),
            Routed::Group(1),
            Routed::Arg(0),
            value("d"),
            Routed::Group(0),
            value("e"),
        ];

        let buckets = partition(stream);

        assert_eq!(
            buckets,
            vec![
                Bucket {
                    group: 0,
                    leading: strings(&["a", "b"]),
                    units: vec![
                        Unit::new(1, strings(&["c"])),
                        Unit::new(2, vec![]),
                    ],
                },
                Bucket {
                    group: 1,
                    leading: vec![],
                    units: vec![Unit::new(0, strings(&["d"]))],
                },
                Bucket {
                    group: 0,
                    leading: strings(&["e"]),
                    units: vec![],
                },
            ]
        );

        assert!(partition(vec![]).is_empty());
    }

    #[test]
    fn test_distribute() {
        // 0: fixed(1) at position 0, 1: variable at position 1, 2: --flag,
        // 3: --opt (1 value)
        let mut builder = Group::<()>::with_default(GroupConfig::new("root").unwrap());
        builder.arg(collect("first", one()).position(0)).unwrap();
        builder.arg(collect("others", many()).position(1)).unwrap();
        builder
            .arg(Arg::flag("flag", Handler::unbound(|_| Ok(true))))
            .unwrap();
        builder.arg(collect("opt", one())).unwrap();
        let group = builder.build().unwrap();

        #[derive(Debug)]
        struct TestData {
            bucket: Bucket,
            result: Result<Vec<Unit>>,
        }

        let tests = vec![
            TestData {
                bucket: Bucket {
                    group: 0,
                    leading: strings(&["a", "b", "c", "d"]),
                    units: vec![],
                },
                result: Ok(vec![
                    Unit::new(0, strings(&["a"])),
                    Unit::new(1, strings(&["b", "c", "d"])),
                ]),
            },
            TestData {
                bucket: Bucket {
                    group: 0,
                    leading: strings(&["a"]),
                    units: vec![],
                },
                result: Ok(vec![Unit::new(0, strings(&["a"]))]),
            },
            TestData {
                // A flag never keeps the bare values that follow it.
                bucket: Bucket {
                    group: 0,
                    leading: vec![],
                    units: vec![Unit::new(2, strings(&["a", "b"]))],
                },
                result: Ok(vec![
                    Unit::new(2, vec![]),
                    Unit::new(0, strings(&["a"])),
                    Unit::new(1, strings(&["b"])),
                ]),
            },
            TestData {
                // Leading values come before spilled ones.
                bucket: Bucket {
                    group: 0,
                    leading: strings(&["x"]),
                    units: vec![Unit::new(3, strings(&["v", "y", "z"]))],
                },
                result: Ok(vec![
                    Unit::new(3, strings(&["v"])),
                    Unit::new(0, strings(&["x"])),
                    Unit::new(1, strings(&["y", "z"])),
                ]),
            },
            TestData {
                bucket: Bucket {
                    group: 0,
                    leading: vec![],
                    units: vec![Unit::new(3, vec![])],
                },
                result: Ok(vec![Unit::new(3, vec![])]),
            },
        ];

        for (i, d) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            let result = distribute(&group, d.bucket.clone());

            assert_eq!(result, d.result, "{}", msg);
        }
    }

    #[test]
    fn test_distribute_unclaimed() {
        let mut builder = Group::<()>::with_default(GroupConfig::new("root").unwrap());
        builder.arg(collect("first", one()).position(0)).unwrap();
        builder.arg(collect("second", one()).position(1)).unwrap();
        let group = builder.build().unwrap();

        let bucket = Bucket {
            group: 0,
            leading: strings(&["a", "b", "c"]),
            units: vec![],
        };

        assert_eq!(
            distribute(&group, bucket),
            Err(Error::Unclaimed {
                group: ":root".into(),
                values: strings(&["c"]),
            })
        );

        let empty = Group::<()>::with_default(GroupConfig::new("bare").unwrap())
            .build()
            .unwrap();

        let bucket = Bucket {
            group: 0,
            leading: strings(&["stray"]),
            units: vec![],
        };

        assert!(matches!(
            distribute(&empty, bucket),
            Err(Error::Unclaimed { .. })
        ));
    }

    struct Fixture {
        registry: Registry,
        root: GroupId,
        other: GroupId,
        first: Handle<Vec<String>>,
        opt: Handle<Vec<String>>,
        rest: Handle<Vec<String>>,
    }

    fn fixture() -> Fixture {
        let mut root = Group::<()>::with_default(GroupConfig::new("root").unwrap());
        let first = root.arg(collect("first", one()).position(0)).unwrap();
        let opt = root.arg(collect("opt", one())).unwrap();

        let mut other = Group::<()>::with_default(GroupConfig::new("other").unwrap());
        let rest = other.arg(collect("rest", many()).position(0)).unwrap();

        let mut registry = Registry::new();
        let other = registry.register(other.build().unwrap());
        let root = registry
            .designate_root(root.build().unwrap(), Some("t"))
            .unwrap();

        Fixture {
            registry,
            root,
            other,
            first,
            opt,
            rest,
        }
    }

    #[test]
    fn test_resolve() {
        let mut f = fixture();

        let stream = vec![
            Routed::Group(f.other),
            value("r1"),
            value("r2"),
            Routed::Group(f.root),
            value("x"),
            Routed::Arg(1),
            value("o"),
        ];

        let touched = resolve(&mut f.registry, stream, false).unwrap();

        assert_eq!(touched, vec![f.other, f.root]);
        assert_eq!(f.first.value(), Ok(strings(&["x"])));
        assert_eq!(f.opt.value(), Ok(strings(&["o"])));
        assert_eq!(f.rest.value(), Ok(strings(&["r1", "r2"])));
    }

    #[test]
    fn test_resolve_group_once() {
        let mut f = fixture();

        let stream = vec![
            Routed::Group(f.root),
            value("x"),
            Routed::Group(f.other),
            value("r1"),
            Routed::Group(f.other),
            value("r2"),
        ];

        // Both :other buckets are queued before the group resolves, so the
        // positional is given twice.
        assert_eq!(
            resolve(&mut f.registry, stream, false),
            Err(Error::Repeated("--rest".into()))
        );

        // Groups resolve in order of first appearance.
        assert_eq!(f.first.value(), Ok(strings(&["x"])));
        assert_eq!(f.rest.value(), Ok(strings(&["r1"])));
    }

    #[test]
    fn test_resolve_failure_drops_queued_units() {
        let mut f = fixture();

        // The second root bucket has one value too many.
        let stream = vec![
            Routed::Group(f.root),
            value("x"),
            Routed::Group(f.other),
            value("r1"),
            Routed::Group(f.root),
            value("y"),
            value("z"),
        ];

        assert_eq!(
            resolve(&mut f.registry, stream, false),
            Err(Error::Unclaimed {
                group: ":root".into(),
                values: strings(&["z"]),
            })
        );

        assert!(!f.first.is_resolved());
        assert!(!f.rest.is_resolved());

        let stream = vec![Routed::Group(f.other), value("r9")];
        let touched = resolve(&mut f.registry, stream, false).unwrap();

        assert_eq!(touched, vec![f.other]);
        assert_eq!(f.rest.value(), Ok(strings(&["r9"])));
        assert!(!f.first.is_resolved());
    }

    #[test]
    fn test_resolve_repeat_within_config_pass() {
        #[derive(Debug)]
        struct TestData {
            rule: Repeat,
            result: Result<Vec<GroupId>>,
            value: Option<Vec<String>>,
        }

        let tests = vec![
            TestData {
                rule: Repeat::Error,
                result: Err(Error::Repeated("-o/--opt".into())),
                value: Some(strings(&["first"])),
            },
            TestData {
                rule: Repeat::Ignore,
                result: Ok(vec![0]),
                value: Some(strings(&["first"])),
            },
            TestData {
                rule: Repeat::Overwrite,
                result: Ok(vec![0]),
                value: Some(strings(&["second"])),
            },
        ];

        for (i, d) in tests.iter().enumerate() {
            let msg = format!("test[{}]: {:?}", i, d);

            let mut root = Group::<()>::with_default(GroupConfig::new("root").unwrap());
            let opt = root
                .arg(
                    collect("opt", one())
                        .alias("o")
                        .policy(Policy::new(Repeat::Error, d.rule)),
                )
                .unwrap();

            let mut registry = Registry::new();
            let id = registry
                .designate_root(root.build().unwrap(), Some("t"))
                .unwrap();

            // As produced by a config file holding both "o" and "opt".
            let stream = vec![
                Routed::Group(id),
                Routed::Arg(0),
                value("first"),
                Routed::Arg(0),
                value("second"),
            ];

            let result = resolve(&mut registry, stream, true);

            assert_eq!(result, d.result, "{}", msg);
            assert_eq!(opt.get(), d.value, "{}", msg);
        }
    }

    #[test]
    fn test_resolve_config_pass() {
        let mut f = fixture();

        let stream = vec![Routed::Group(f.root), value("x")];
        resolve(&mut f.registry, stream, false).unwrap();

        // The default policy ignores repeats from the config pass.
        let stream = vec![Routed::Group(f.root), value("y"), Routed::Arg(1), value("o")];
        let touched = resolve(&mut f.registry, stream, true).unwrap();

        assert_eq!(touched, vec![f.root]);
        assert_eq!(f.first.value(), Ok(strings(&["x"])));
        assert_eq!(f.opt.value(), Ok(strings(&["o"])));
        assert!(!f.rest.is_resolved());
    }
}
