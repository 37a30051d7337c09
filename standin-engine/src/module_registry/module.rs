use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::double::Double;
use crate::entities::{Callable, ThrownError, Value};

use super::ModuleRegistryError;

/// An exported member of a module
#[derive(Clone)]
pub enum Member {
    /// A plain function
    Function(Callable),

    /// A double standing in for a function
    Double(Double),

    /// A non callable value
    Value(Value),
}

impl Member {
    /// Wrap a function
    pub fn function<F>(function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync + 'static,
    {
        Member::Function(Arc::new(function))
    }

    /// Check if the member can be called
    pub fn is_callable(&self) -> bool {
        !matches!(self, Member::Value(_))
    }

    /// Call the member, `None` if it is not callable
    pub fn call(&self, args: Vec<Value>) -> Option<Result<Value, ThrownError>> {
        match self {
            Member::Function(function) => Some(function(&args)),
            Member::Double(double) => Some(double.invoke(args)),
            Member::Value(_) => None,
        }
    }

    /// The double behind this member, if any
    pub fn as_double(&self) -> Option<&Double> {
        match self {
            Member::Double(double) => Some(double),
            _ => None,
        }
    }

    /// The value behind this member, if any
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Member::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl Debug for Member {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Member::Function(_) => write!(f, "Function(..)"),
            Member::Double(double) => f.debug_tuple("Double").field(double).finish(),
            Member::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl From<Double> for Member {
    fn from(double: Double) -> Self {
        Member::Double(double)
    }
}

impl From<Value> for Member {
    fn from(value: Value) -> Self {
        Member::Value(value)
    }
}

/// A genuine module: a named set of members.
#[derive(Debug, Clone)]
pub struct Module {
    id: String,
    members: BTreeMap<String, Member>,
}

impl Module {
    /// Create a module without members
    pub fn new<I: Into<String>>(id: I) -> Self {
        Self {
            id: id.into(),
            members: BTreeMap::new(),
        }
    }

    /// Add or replace a member
    pub fn with_member<N: Into<String>, M: Into<Member>>(mut self, name: N, member: M) -> Self {
        self.members.insert(name.into(), member.into());
        self
    }

    /// Add or replace a function member
    pub fn with_function<N, F>(self, name: N, function: F) -> Self
    where
        N: Into<String>,
        F: Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync + 'static,
    {
        self.with_member(name, Member::function(function))
    }

    /// Add or replace a value member
    pub fn with_value<N: Into<String>, V: Into<Value>>(self, name: N, value: V) -> Self {
        self.with_member(name, Member::Value(value.into()))
    }

    /// Identifier of the module
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Member by name
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Names of every member
    pub fn member_names(&self) -> BTreeSet<String> {
        self.members.keys().cloned().collect()
    }
}

/// Typed composition record: one optional override per member name.
///
/// Members without an override fall back to the genuine module.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    members: BTreeMap<String, Member>,
}

impl Overrides {
    /// No override at all, every member passes through
    pub fn new() -> Self {
        Self::default()
    }

    /// Override a member with a double
    pub fn with_double<N: Into<String>>(mut self, name: N, double: &Double) -> Self {
        self.members
            .insert(name.into(), Member::Double(double.clone()));
        self
    }

    /// Override a member with a plain function
    pub fn with_function<N, F>(mut self, name: N, function: F) -> Self
    where
        N: Into<String>,
        F: Fn(&[Value]) -> Result<Value, ThrownError> + Send + Sync + 'static,
    {
        self.members.insert(name.into(), Member::function(function));
        self
    }

    /// Override a member with a value
    pub fn with_value<N: Into<String>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.members.insert(name.into(), Member::Value(value.into()));
        self
    }

    /// Number of overridden members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if no member is overridden
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A genuine module composed with overrides.
///
/// Every genuine member stays reachable, either overridden or passed through unmodified.
#[derive(Debug, Clone)]
pub struct Substitution {
    genuine: Arc<Module>,
    overrides: BTreeMap<String, Member>,
}

impl Substitution {
    pub(crate) fn compose(genuine: Arc<Module>, overrides: Overrides) -> Self {
        Self {
            genuine,
            overrides: overrides.members,
        }
    }

    /// Identifier of the substituted module
    pub fn id(&self) -> &str {
        self.genuine.id()
    }

    /// The genuine module behind the substitution
    pub fn genuine(&self) -> &Arc<Module> {
        &self.genuine
    }

    /// Member by name: the override if any, the genuine member otherwise
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.overrides
            .get(name)
            .or_else(|| self.genuine.member(name))
    }

    /// Check if the member is overridden
    pub fn is_overridden(&self, name: &str) -> bool {
        self.overrides.contains_key(name)
    }

    /// Names of every member, genuine and added by overrides
    pub fn member_names(&self) -> BTreeSet<String> {
        let mut names = self.genuine.member_names();
        names.extend(self.overrides.keys().cloned());
        names
    }

    /// Doubles installed by the overrides
    pub fn doubles(&self) -> Vec<Double> {
        self.overrides
            .values()
            .filter_map(Member::as_double)
            .cloned()
            .collect()
    }
}

/// Handle on a module as resolved by the registry, the one code under test is given.
#[derive(Debug, Clone)]
pub enum ResolvedModule {
    /// No substitution is installed
    Genuine(Arc<Module>),

    /// A substitution is installed
    Substitute(Arc<Substitution>),
}

impl ResolvedModule {
    /// Identifier of the module
    pub fn id(&self) -> &str {
        match self {
            ResolvedModule::Genuine(module) => module.id(),
            ResolvedModule::Substitute(substitution) => substitution.id(),
        }
    }

    /// Check if this handle is a substitute
    pub fn is_substitute(&self) -> bool {
        matches!(self, ResolvedModule::Substitute(_))
    }

    /// Member by name
    pub fn member(&self, name: &str) -> Option<&Member> {
        match self {
            ResolvedModule::Genuine(module) => module.member(name),
            ResolvedModule::Substitute(substitution) => substitution.member(name),
        }
    }

    /// Member by name, failing if the module has no such member
    pub fn require_member(&self, name: &str) -> Result<&Member, ModuleRegistryError> {
        self.member(name)
            .ok_or_else(|| ModuleRegistryError::UnknownMember {
                module: self.id().to_string(),
                member: name.to_string(),
            })
    }

    /// The double installed for a member, if any
    pub fn double(&self, name: &str) -> Option<Double> {
        self.member(name).and_then(Member::as_double).cloned()
    }

    /// Names of every member
    pub fn member_names(&self) -> BTreeSet<String> {
        match self {
            ResolvedModule::Genuine(module) => module.member_names(),
            ResolvedModule::Substitute(substitution) => substitution.member_names(),
        }
    }

    /// Call a member.
    ///
    /// Calling a missing or non callable member raises a `TypeError`, like calling an
    /// undefined export would.
    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, ThrownError> {
        match self.member(name) {
            Some(member) => member.call(args).unwrap_or_else(|| {
                Err(ThrownError::with_kind(
                    "TypeError",
                    format!("{}.{name} is not a function", self.id()),
                ))
            }),
            None => Err(ThrownError::with_kind(
                "TypeError",
                format!("{}.{name} is not a function", self.id()),
            )),
        }
    }
}
