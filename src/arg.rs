// Copyright (c) 2021 James O. D. Hunt.
//
// SPDX-License-Identifier: Apache-2.0
//

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::group::GroupConfig;
use crate::value::{Cast, Constraint, Value};

pub(crate) const ALIAS_PREFIX: &str = "-";
pub(crate) const NAME_PREFIX: &str = "--";

static VALID_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[a-zA-Z]$").expect("static regex must compile"));
static VALID_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(--)?\w[\w\d-]*[\w\d]$").expect("static regex must compile"));

/// Check an alias and return it in canonical `-x` form.
pub fn validate_alias(alias: &str) -> Result<String> {
    let alias = alias.trim();

    if !VALID_ALIAS.is_match(alias) {
        return Err(Error::Specification(format!(
            "legality check ({}) failed for argument alias {:?}",
            VALID_ALIAS.as_str(),
            alias
        )));
    }

    Ok(format!("{}{}", ALIAS_PREFIX, alias.trim_start_matches('-')))
}

/// Check a long name and return it in canonical `--name` form.
pub fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();

    if !VALID_NAME.is_match(name) {
        return Err(Error::Specification(format!(
            "legality check ({}) failed for argument name {:?}",
            VALID_NAME.as_str(),
            name
        )));
    }

    Ok(format!("{}{}", NAME_PREFIX, name.trim_start_matches('-')))
}

/// Number of values an argument accepts.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Arity {
    /// Values that must be supplied.
    pub min: usize,
    /// Upper limit, [None] meaning unbounded.
    pub max: Option<usize>,
}

impl Arity {
    /// Create an arity range.
    pub fn new(min: usize, max: Option<usize>) -> Self {
        Arity { min, max }
    }

    /// A flag takes no values at all.
    pub fn is_flag(&self) -> bool {
        self.min == 0 && self.max == Some(0)
    }

    /// Set if the number of values is not fixed.
    pub fn is_variable(&self) -> bool {
        self.max != Some(self.min)
    }

    /// Determine if `count` values are acceptable.
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.min, self.max) {
            (min, Some(max)) if min == max => write!(f, "{}", min),
            (0, None) => write!(f, "*"),
            (min, None) => write!(f, "{}+", min),
            (0, Some(1)) => write!(f, "?"),
            (min, Some(max)) => write!(f, "{}-{}", min, max),
        }
    }
}

/// One parameter of a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Param {
    /// Conversion for values landing on this parameter (string if unset).
    pub cast: Option<Cast>,
    /// Permitted raw values for this parameter.
    pub choices: Option<Vec<String>>,
    /// The handler copes without this value.
    pub optional: bool,
    /// The parameter soaks up all remaining values (must be last).
    pub variadic: bool,
}

impl Param {
    /// Create a required string parameter.
    pub fn new() -> Self {
        Param::default()
    }

    /// Create a required parameter with the given conversion.
    pub fn of(cast: Cast) -> Self {
        Param::new().cast(cast)
    }

    /// Specify the conversion.
    pub fn cast(self, cast: Cast) -> Self {
        Param {
            cast: Some(cast),
            ..self
        }
    }

    /// Restrict the raw values.
    pub fn choices<I, S>(self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Param {
            choices: Some(choices.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    /// Mark the parameter as having a default inside the handler.
    pub fn optional(self) -> Self {
        Param {
            optional: true,
            ..self
        }
    }

    /// Mark the parameter as accepting any number of values.
    pub fn variadic(self) -> Self {
        Param {
            variadic: true,
            ..self
        }
    }
}

/// Static description of a handler: the parameters it takes plus any
/// signature-wide conversion or constraint.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Param>,
    cast: Option<Cast>,
    constraint: Option<Constraint>,
}

impl Signature {
    /// A handler that takes no values (a flag).
    pub fn new() -> Self {
        Signature::default()
    }

    /// A handler that takes exactly one value converted by `cast`.
    pub fn of(cast: Cast) -> Self {
        Signature::new().param(Param::of(cast))
    }

    /// Append a parameter.
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Convert every value with this caster, ignoring per-parameter casters.
    pub fn cast(self, cast: Cast) -> Self {
        Signature {
            cast: Some(cast),
            ..self
        }
    }

    /// Check every value with this constraint, ignoring per-parameter choices.
    pub fn constraint(self, constraint: Constraint) -> Self {
        Signature {
            constraint: Some(constraint),
            ..self
        }
    }

    /// The declared parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Derive the arity, failing if a variadic parameter is not last.
    pub fn arity(&self) -> Result<Arity> {
        let mut min = 0;

        for (i, param) in self.params.iter().enumerate() {
            if param.variadic {
                if i + 1 != self.params.len() {
                    return Err(Error::Specification(
                        "a variadic parameter must be the last parameter".into(),
                    ));
                }

                return Ok(Arity::new(min, None));
            }

            if !param.optional {
                min += 1;
            }
        }

        Ok(Arity::new(min, Some(self.params.len())))
    }
}

/// How a handler is attached to its group.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Binding {
    /// Plain function of the values.
    Unbound,
    /// Receives the group's configuration.
    Type,
    /// Receives the group's lazily created context object.
    Instance,
}

type UnboundFn<T> = dyn Fn(Vec<Value>) -> Result<T>;
type TypeFn<T> = dyn Fn(&GroupConfig, Vec<Value>) -> Result<T>;
type InstanceFn<C, T> = dyn Fn(&mut C, Vec<Value>) -> Result<T>;

/// The function that turns cast values into the argument's final value.
pub enum Handler<C, T> {
    /// See [Binding::Unbound].
    Unbound(Box<UnboundFn<T>>),
    /// See [Binding::Type].
    Type(Box<TypeFn<T>>),
    /// See [Binding::Instance].
    Instance(Box<InstanceFn<C, T>>),
}

impl<C, T> Handler<C, T> {
    /// Create a handler that needs no context.
    pub fn unbound<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<T> + 'static,
    {
        Handler::Unbound(Box::new(f))
    }

    /// Create a handler that receives the group configuration.
    pub fn type_bound<F>(f: F) -> Self
    where
        F: Fn(&GroupConfig, Vec<Value>) -> Result<T> + 'static,
    {
        Handler::Type(Box::new(f))
    }

    /// Create a handler that receives the group context object.
    pub fn instance<F>(f: F) -> Self
    where
        F: Fn(&mut C, Vec<Value>) -> Result<T> + 'static,
    {
        Handler::Instance(Box::new(f))
    }

    /// Returns the binding kind.
    pub fn binding(&self) -> Binding {
        match self {
            Handler::Unbound(_) => Binding::Unbound,
            Handler::Type(_) => Binding::Type,
            Handler::Instance(_) => Binding::Instance,
        }
    }

    fn call(&self, receiver: Receiver<'_, C>, values: Vec<Value>) -> Result<T> {
        match (self, receiver) {
            (Handler::Unbound(f), _) => f(values),
            (Handler::Type(f), Receiver::Type(config)) => f(config, values),
            (Handler::Instance(f), Receiver::Instance(ctx)) => f(ctx, values),
            (h, _) => Err(Error::Handler(format!(
                "{:?} handler called without its receiver",
                h.binding()
            ))),
        }
    }
}

/// What a group hands to an argument when it is applied.
pub(crate) enum Receiver<'a, C> {
    Unbound,
    Type(&'a GroupConfig),
    Instance(&'a mut C),
}

/// What happens when an already resolved argument is given again.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Repeat {
    /// Keep the first value, silently dropping later ones.
    Ignore,
    /// Keep the first value and fail.
    Error,
    /// Replace the value.
    Overwrite,
}

impl Repeat {
    fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(Repeat::Ignore),
            'r' => Some(Repeat::Error),
            't' => Some(Repeat::Overwrite),
            _ => None,
        }
    }
}

/// Override policy: one [Repeat] rule for repeats seen while resolving the
/// command-line and one for repeats seen while resolving the config file.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Policy {
    /// Rule used during the primary (command-line) pass.
    pub primary: Repeat,
    /// Rule used during the config pass.
    pub config: Repeat,
}

impl Policy {
    /// Create a policy.
    pub fn new(primary: Repeat, config: Repeat) -> Self {
        Policy { primary, config }
    }

    /// Use the same rule for both passes.
    pub fn uniform(rule: Repeat) -> Self {
        Policy::new(rule, rule)
    }

    fn rule(&self, from_config: bool) -> Repeat {
        if from_config {
            self.config
        } else {
            self.primary
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::new(Repeat::Error, Repeat::Ignore)
    }
}

/// Parse the compact form: `s` (ignore), `r` (error), `t` (overwrite),
/// either alone (both passes) or as a pair such as `rs`.
impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let rules: Option<Vec<Repeat>> = s.chars().map(Repeat::from_char).collect();

        match rules.as_deref() {
            Some([rule]) => Ok(Policy::uniform(*rule)),
            Some([primary, config]) => Ok(Policy::new(*primary, *config)),
            _ => Err(Error::Specification(format!("invalid policy {:?}", s))),
        }
    }
}

/// The type-independent description of an argument.
#[derive(Debug, Clone)]
pub struct ArgInfo {
    alias: Option<String>,
    position: Option<usize>,
    names: Vec<String>,
    required: bool,
    arity: Arity,
    order: Option<i64>,
    policy: Policy,
    help: Option<String>,
    binding: Binding,
    has_default: bool,
    cast: Option<Cast>,
    constraint: Option<Constraint>,
    params: Vec<Param>,
}

impl ArgInfo {
    /// The `-x` alias.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The positional slot.
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// The `--name` long names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Set if a value must be resolved.
    pub fn required(&self) -> bool {
        self.required
    }

    /// Number of values accepted.
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Explicit resolution order.
    pub fn order(&self) -> Option<i64> {
        self.order
    }

    /// The override policy.
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Description of the argument.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// How the handler is bound.
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// Set if a default value or producer was given.
    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Signature-wide caster.
    pub fn cast(&self) -> Option<&Cast> {
        self.cast.as_ref()
    }

    /// Signature-wide constraint.
    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    /// The handler's parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Set if the argument takes no values.
    pub fn is_flag(&self) -> bool {
        self.arity.is_flag()
    }

    /// All routing keys: the alias followed by the names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.alias.iter().chain(self.names.iter()).map(String::as_str)
    }

    /// Tie-break key used when no explicit order is set: the alias, else
    /// the smallest long name.
    pub fn sort_key(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.names.iter().min().map_or("", String::as_str),
        }
    }

    /// Name used in messages.
    pub fn display_name(&self) -> String {
        let keys: Vec<&str> = self.keys().collect();

        if keys.is_empty() {
            return format!("<{}>", self.position.unwrap_or_default());
        }

        keys.join("/")
    }

    fn check_constraints(&self, values: &[String]) -> Result<()> {
        if let Some(constraint) = &self.constraint {
            return constraint.check(values);
        }

        for (i, value) in values.iter().enumerate() {
            let choices = self.param_at(i).and_then(|p| p.choices.as_ref());

            if let Some(choices) = choices {
                if !choices.contains(value) {
                    return Err(Error::NotInChoices {
                        values: vec![value.clone()],
                        choices: choices.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn cast_values(&self, values: &[String]) -> Result<Vec<Value>> {
        values
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let cast = self
                    .cast
                    .as_ref()
                    .or_else(|| self.param_at(i).and_then(|p| p.cast.as_ref()));

                match cast {
                    Some(cast) => cast.cast(raw),
                    None => Ok(Value::Str(raw.clone())),
                }
            })
            .collect()
    }

    // Positions beyond the declared parameters reuse the last one.
    fn param_at(&self, i: usize) -> Option<&Param> {
        self.params.get(i).or_else(|| self.params.last())
    }
}

enum Fallback<T> {
    Value(T),
    Producer(Box<dyn Fn() -> T>),
}

struct Slot<T> {
    name: String,
    value: Option<T>,
    fallback: Option<Fallback<T>>,
    resolved: bool,
}

/// Read access to the value an argument resolves to.
///
/// Returned when an [Arg] is added to a group; clone it freely.
pub struct Handle<T> {
    slot: Rc<RefCell<Slot<T>>>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            slot: self.slot.clone(),
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let slot = self.slot.borrow();

        write!(f, "Handle({}, resolved={})", slot.name, slot.resolved)
    }
}

impl<T: Clone> Handle<T> {
    /// Returns the value, falling back to the default when nothing was
    /// resolved. A default producer is called at most once.
    pub fn get(&self) -> Option<T> {
        let mut slot = self.slot.borrow_mut();

        if slot.value.is_none() && !slot.resolved {
            slot.value = match &slot.fallback {
                Some(Fallback::Value(v)) => Some(v.clone()),
                Some(Fallback::Producer(f)) => Some(f()),
                None => None,
            };
        }

        slot.value.clone()
    }

    /// Like [Handle::get] but fails when the argument holds nothing.
    pub fn value(&self) -> Result<T> {
        self.get()
            .ok_or_else(|| Error::Empty(self.slot.borrow().name.clone()))
    }
}

impl<T> Handle<T> {
    /// Set once any pass has assigned a value.
    pub fn is_resolved(&self) -> bool {
        self.slot.borrow().resolved
    }
}

/// Declaration of a single argument, generic over the value type its
/// handler produces.
pub struct Arg<C, T> {
    handler_name: String,
    alias: Option<String>,
    position: Option<usize>,
    names: Vec<String>,
    include_handler_name: bool,
    required: bool,
    fallback: Option<Fallback<T>>,
    signature: Signature,
    cast: Option<Cast>,
    constraint: Option<Constraint>,
    policy: Policy,
    order: Option<i64>,
    help: Option<String>,
    handler: Handler<C, T>,
}

impl<C, T> Arg<C, T> {
    /// Create an argument. `handler_name` becomes the long name unless
    /// explicit names are given.
    pub fn new(handler_name: &str, handler: Handler<C, T>) -> Self {
        Arg {
            handler_name: handler_name.into(),
            alias: None,
            position: None,
            names: Vec::new(),
            include_handler_name: false,
            required: false,
            fallback: None,
            signature: Signature::new(),
            cast: None,
            constraint: None,
            policy: Policy::default(),
            order: None,
            help: None,
            handler,
        }
    }

    /// Specify the `-x` alias.
    pub fn alias(self, alias: &str) -> Self {
        Arg {
            alias: Some(alias.into()),
            ..self
        }
    }

    /// Add a `--name` long name.
    pub fn name(mut self, name: &str) -> Self {
        self.names.push(name.into());
        self
    }

    /// Also route the handler name when explicit names are given.
    pub fn with_handler_name(self) -> Self {
        Arg {
            include_handler_name: true,
            ..self
        }
    }

    /// Specify the positional slot.
    pub fn position(self, position: usize) -> Self {
        Arg {
            position: Some(position),
            ..self
        }
    }

    /// Specify that the argument must be resolved.
    pub fn required(self) -> Self {
        Arg {
            required: true,
            ..self
        }
    }

    /// Specify a default value.
    pub fn default(self, value: T) -> Self {
        Arg {
            fallback: Some(Fallback::Value(value)),
            ..self
        }
    }

    /// Specify a function producing the default value on first access.
    pub fn default_with<F>(self, f: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Arg {
            fallback: Some(Fallback::Producer(Box::new(f))),
            ..self
        }
    }

    /// Specify the handler's signature.
    pub fn signature(self, signature: Signature) -> Self {
        Arg { signature, ..self }
    }

    /// Override the signature's caster.
    pub fn cast(self, cast: Cast) -> Self {
        Arg {
            cast: Some(cast),
            ..self
        }
    }

    /// Override the signature's constraint.
    pub fn constraint(self, constraint: Constraint) -> Self {
        Arg {
            constraint: Some(constraint),
            ..self
        }
    }

    /// Specify the override policy.
    pub fn policy(self, policy: Policy) -> Self {
        Arg { policy, ..self }
    }

    /// Specify the resolution order: non-negative values go first, negative
    /// values go last.
    pub fn order(self, order: i64) -> Self {
        Arg {
            order: Some(order),
            ..self
        }
    }

    /// Specify the help text.
    pub fn help(self, help: &str) -> Self {
        Arg {
            help: Some(help.into()),
            ..self
        }
    }

    /// Validate the declaration and fix its arity.
    pub(crate) fn bind(self) -> Result<(ArgSpec<C, T>, Handle<T>)> {
        let mut names = self
            .names
            .iter()
            .map(|n| validate_name(n))
            .collect::<Result<Vec<String>>>()?;

        if names.is_empty() || self.include_handler_name {
            names.push(validate_name(&self.handler_name.replace('_', "-"))?);
        }

        let alias = self.alias.as_deref().map(validate_alias).transpose()?;

        let arity = self.signature.arity()?;

        let info = ArgInfo {
            alias,
            position: self.position,
            names,
            required: self.required,
            arity,
            order: self.order,
            policy: self.policy,
            help: self.help,
            binding: self.handler.binding(),
            has_default: self.fallback.is_some(),
            cast: self.cast.or_else(|| self.signature.cast.clone()),
            constraint: self.constraint.or_else(|| self.signature.constraint.clone()),
            params: self.signature.params,
        };

        if info.required && info.is_flag() {
            warn!(
                arg = %info.display_name(),
                "argument is a flag but is required; it could be omitted"
            );
        }

        let slot = Rc::new(RefCell::new(Slot {
            name: info.display_name(),
            value: None,
            fallback: self.fallback,
            resolved: false,
        }));

        let spec = ArgSpec {
            info,
            handler: self.handler,
            slot: slot.clone(),
        };

        Ok((spec, Handle { slot }))
    }
}

impl<C> Arg<C, bool> {
    /// Create a flag: no values, defaults to `false`, repeats ignored.
    pub fn flag(handler_name: &str, handler: Handler<C, bool>) -> Self {
        Arg::new(handler_name, handler)
            .default(false)
            .policy(Policy::uniform(Repeat::Ignore))
    }
}

/// Type-erased view of a bound argument, as stored by a group.
pub(crate) trait Argument<C> {
    fn info(&self) -> &ArgInfo;

    fn apply(
        &mut self,
        receiver: Receiver<'_, C>,
        values: &[String],
        from_config: bool,
    ) -> Result<()>;

    fn check_required(&self) -> Result<()>;
}

/// A bound argument.
pub(crate) struct ArgSpec<C, T> {
    info: ArgInfo,
    handler: Handler<C, T>,
    slot: Rc<RefCell<Slot<T>>>,
}

impl<C, T> Argument<C> for ArgSpec<C, T> {
    fn info(&self) -> &ArgInfo {
        &self.info
    }

    fn apply(
        &mut self,
        receiver: Receiver<'_, C>,
        values: &[String],
        from_config: bool,
    ) -> Result<()> {
        if self.slot.borrow().resolved {
            match self.info.policy.rule(from_config) {
                Repeat::Ignore => {
                    trace!(arg = %self.info.display_name(), from_config, "repeat ignored");
                    return Ok(());
                }
                Repeat::Error => return Err(Error::Repeated(self.info.display_name())),
                Repeat::Overwrite => (),
            }
        }

        if !self.info.arity.accepts(values.len()) {
            return Err(Error::Arity {
                arg: self.info.display_name(),
                expected: self.info.arity.to_string(),
                got: values.len(),
            });
        }

        self.info.check_constraints(values)?;

        let values = self.info.cast_values(values)?;

        // The slot must not be borrowed while the handler runs.
        let result = self.handler.call(receiver, values)?;

        let mut slot = self.slot.borrow_mut();
        slot.value = Some(result);
        slot.resolved = true;

        Ok(())
    }

    fn check_required(&self) -> Result<()> {
        if self.info.required && !self.slot.borrow().resolved {
            return Err(Error::MissingRequired(self.info.display_name()));
        }

        Ok(())
    }
}
