//! Module substitution: code under test resolves its dependencies through a registry
//! which can hand out a substitute composed of overrides and genuine members.

mod module;
mod registry;
mod scope_policy;

pub use module::{Member, Module, Overrides, ResolvedModule, Substitution};
pub use registry::{ModuleLoader, ModuleRegistry, ModuleRegistryError};
pub use scope_policy::ScopePolicy;
