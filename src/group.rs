// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::collections::{hash_map::Entry, HashMap};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::arg::{Arg, ArgInfo, Argument, Binding, Handle, Receiver};
use crate::error::{Error, Result};
use crate::route::HELP_KEYS;

pub(crate) const GROUP_PREFIX: &str = ":";

static VALID_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?\w[\w\d-]*[\w\d]$").expect("static regex must compile"));

/// Identity and presentation details of a group.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct GroupConfig {
    name: String,
    required: bool,
    usage_example: Option<String>,
    about: Option<String>,
}

impl GroupConfig {
    /// Create a group configuration. The name is the group's routing
    /// token and is normalized to `:name`.
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim();

        if !VALID_GROUP.is_match(name) {
            return Err(Error::Specification(format!(
                "legality check ({}) failed for group name {:?}",
                VALID_GROUP.as_str(),
                name
            )));
        }

        Ok(GroupConfig {
            name: format!("{}{}", GROUP_PREFIX, name.trim_start_matches(':')),
            required: false,
            usage_example: None,
            about: None,
        })
    }

    /// Specify that the group must appear on the command-line or in the
    /// config file.
    pub fn required(self) -> Self {
        GroupConfig {
            required: true,
            ..self
        }
    }

    /// Specify an example shown in help. `${indent}` and `${root}` are
    /// expanded.
    pub fn usage_example(self, example: &str) -> Self {
        GroupConfig {
            usage_example: Some(example.into()),
            ..self
        }
    }

    /// Specify a description of the group.
    pub fn about(self, about: &str) -> Self {
        GroupConfig {
            about: Some(about.into()),
            ..self
        }
    }

    /// The `:name` routing token.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set if the group must be given.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The usage example.
    pub fn example(&self) -> Option<&str> {
        self.usage_example.as_deref()
    }

    /// The description.
    pub fn description(&self) -> Option<&str> {
        self.about.as_deref()
    }
}

/// A resolution unit: an argument of a group (by index) and the raw
/// values collected for it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Unit {
    /// Index of the argument within its group.
    pub arg: usize,
    /// Raw values, in command-line order.
    pub values: Vec<String>,
}

impl Unit {
    /// Create a unit.
    pub fn new(arg: usize, values: Vec<String>) -> Self {
        Unit { arg, values }
    }
}

/// Type-erased view of a group, as held by the [Registry](crate::Registry).
pub trait ArgGroup {
    /// The group's configuration.
    fn config(&self) -> &GroupConfig;

    /// Look up an argument index by `-x` or `--name` key.
    fn route(&self, key: &str) -> Result<usize>;

    /// Details of the argument at `index`.
    fn info(&self, index: usize) -> Option<&ArgInfo>;

    /// Indexes of the positional arguments, in slot order.
    fn positional(&self) -> &[usize];

    /// All arguments in resolution order.
    fn ordered(&self) -> Vec<&ArgInfo>;

    /// Queue units for the next [ArgGroup::resolve].
    fn accumulate(&mut self, units: Vec<Unit>);

    /// Apply all queued units in resolution order, then enforce every
    /// argument's required check.
    fn resolve(&mut self, from_config: bool) -> Result<()>;

    /// Drop any queued units without applying them.
    fn discard(&mut self);
}

/// Order by explicit non-negative order, then by sort key for arguments
/// without an order, then by explicit negative order. Returns indexes into
/// `infos`.
pub(crate) fn resolution_order(infos: &[&ArgInfo]) -> Vec<usize> {
    let mut first = Vec::new();
    let mut named = Vec::new();
    let mut last = Vec::new();

    for (i, info) in infos.iter().enumerate() {
        match info.order() {
            None => named.push(i),
            Some(order) if order < 0 => last.push(i),
            Some(_) => first.push(i),
        }
    }

    first.sort_by_key(|&i| infos[i].order());
    named.sort_by(|&a, &b| infos[a].sort_key().cmp(infos[b].sort_key()));
    last.sort_by_key(|&i| infos[i].order());

    first.into_iter().chain(named).chain(last).collect()
}

/// Memoized handler context: built on first use, at most once.
struct Context<C> {
    ctor: Box<dyn Fn() -> C>,
    instance: Option<C>,
}

impl<C> Context<C> {
    fn get(&mut self, group: &str) -> &mut C {
        let ctor = &self.ctor;

        self.instance.get_or_insert_with(|| {
            debug!(group, "creating handler context");
            ctor()
        })
    }
}

/// Collects the arguments of a group before it is built.
pub struct GroupBuilder<C> {
    config: GroupConfig,
    ctor: Box<dyn Fn() -> C>,
    args: Vec<Box<dyn Argument<C>>>,
}

impl<C: 'static> GroupBuilder<C> {
    /// Bind an argument to the group, returning the handle its value is
    /// read through.
    pub fn arg<T: 'static>(&mut self, arg: Arg<C, T>) -> Result<Handle<T>> {
        let (spec, handle) = arg.bind()?;

        trace!(group = %self.config.name, arg = %spec.info().display_name(), "bound argument");

        self.args.push(Box::new(spec));

        Ok(handle)
    }

    /// Build the routing indexes and check the positional layout.
    pub fn build(self) -> Result<Group<C>> {
        let mut keys = HashMap::<String, usize>::new();
        let mut positions = Vec::<(usize, usize)>::new();

        for (index, arg) in self.args.iter().enumerate() {
            let info = arg.info();

            for key in info.keys() {
                if HELP_KEYS.contains(&key) {
                    return Err(Error::Specification(format!(
                        "key {:?} is reserved for help in group {:?}",
                        key, self.config.name
                    )));
                }

                match keys.entry(key.to_string()) {
                    Entry::Occupied(_) => {
                        return Err(Error::Specification(format!(
                            "key {:?} used more than once in group {:?}",
                            key, self.config.name
                        )))
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(index);
                    }
                }
            }

            if let Some(position) = info.position() {
                positions.push((position, index));
            }
        }

        positions.sort_unstable();

        let mut positional = Vec::with_capacity(positions.len());
        let mut variable_seen = false;

        for (expected, (position, index)) in positions.into_iter().enumerate() {
            if variable_seen {
                return Err(Error::Specification(format!(
                    "a positional argument with a variable number of inputs must be the last \
                     positional argument (was {} of {}) in group {:?}",
                    expected - 1,
                    positional.len() + 1,
                    self.config.name
                )));
            }

            if position != expected {
                return Err(Error::Specification(format!(
                    "positional arguments must start from 0 and increment in steps of 1 \
                     in group {:?}",
                    self.config.name
                )));
            }

            variable_seen = self.args[index].info().arity().is_variable();

            positional.push(index);
        }

        Ok(Group {
            config: self.config,
            args: self.args,
            keys,
            positional,
            pending: Vec::new(),
            context: Context {
                ctor: self.ctor,
                instance: None,
            },
        })
    }
}

/// A named bundle of arguments: the routing target of a `:name` token.
///
/// `C` is the handler context type: instance-bound handlers receive a
/// `&mut C` that is created on first need, at most once.
pub struct Group<C> {
    config: GroupConfig,
    args: Vec<Box<dyn Argument<C>>>,
    keys: HashMap<String, usize>,
    positional: Vec<usize>,
    pending: Vec<Unit>,
    context: Context<C>,
}

impl<C: 'static> Group<C> {
    /// Start a group whose context is created by `ctor`.
    pub fn builder<F>(config: GroupConfig, ctor: F) -> GroupBuilder<C>
    where
        F: Fn() -> C + 'static,
    {
        GroupBuilder {
            config,
            ctor: Box::new(ctor),
            args: Vec::new(),
        }
    }
}

impl<C: Default + 'static> Group<C> {
    /// Start a group whose context is `C::default()`.
    pub fn with_default(config: GroupConfig) -> GroupBuilder<C> {
        Group::builder(config, C::default)
    }
}

impl<C> fmt::Debug for Group<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Group")
            .field("config", &self.config)
            .field("args", &self.args.len())
            .field("positional", &self.positional)
            .field("pending", &self.pending)
            .finish()
    }
}

impl<C> ArgGroup for Group<C> {
    fn config(&self) -> &GroupConfig {
        &self.config
    }

    fn route(&self, key: &str) -> Result<usize> {
        self.keys.get(key).copied().ok_or_else(|| Error::UnknownKey {
            key: key.into(),
            group: self.config.name.clone(),
        })
    }

    fn info(&self, index: usize) -> Option<&ArgInfo> {
        self.args.get(index).map(|a| a.info())
    }

    fn positional(&self) -> &[usize] {
        &self.positional
    }

    fn ordered(&self) -> Vec<&ArgInfo> {
        let infos: Vec<&ArgInfo> = self.args.iter().map(|a| a.info()).collect();

        resolution_order(&infos)
            .into_iter()
            .map(|i| infos[i])
            .collect()
    }

    fn accumulate(&mut self, units: Vec<Unit>) {
        self.pending.extend(units);
    }

    fn resolve(&mut self, from_config: bool) -> Result<()> {
        let units = std::mem::take(&mut self.pending);

        let order = {
            let infos: Vec<&ArgInfo> = units
                .iter()
                .map(|u| self.args[u.arg].info())
                .collect();

            resolution_order(&infos)
        };

        let Group {
            config,
            args,
            context,
            ..
        } = self;

        for i in order {
            let unit = &units[i];
            let arg = &mut args[unit.arg];

            trace!(
                group = %config.name,
                arg = %arg.info().display_name(),
                values = ?unit.values,
                from_config,
                "applying"
            );

            let receiver = match arg.info().binding() {
                Binding::Unbound => Receiver::Unbound,
                Binding::Type => Receiver::Type(config),
                Binding::Instance => Receiver::Instance(context.get(&config.name)),
            };

            arg.apply(receiver, &unit.values, from_config)?;
        }

        for arg in args.iter() {
            arg.check_required()?;
        }

        Ok(())
    }

    fn discard(&mut self) {
        self.pending.clear();
    }
}
