use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock};
use std::thread::{self, ThreadId};

use anyhow::Context;
use slog::{debug, Logger};
use thiserror::Error;

use crate::double::Double;
use crate::logging::{discard_logger, LoggerExtensions};
use crate::StdResult;

use super::{Module, Overrides, ResolvedModule, ScopePolicy, Substitution};

/// Builds the genuine module, run once per declaration unless loads race on different threads
pub type ModuleLoader = Arc<dyn Fn() -> StdResult<Module> + Send + Sync>;

/// Module registry related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleRegistryError {
    /// No module is declared under this identifier
    #[error("Unknown module '{0}'")]
    UnknownModule(String),

    /// The module has no member under this name
    #[error("Module '{module}' has no member '{member}'")]
    UnknownMember {
        /// Identifier of the module
        module: String,
        /// Name of the missing member
        member: String,
    },

    /// The loader did not produce the genuine module
    #[error("Could not load genuine module '{0}'")]
    LoaderFailed(String),

    /// The loader of the module required the module it is loading
    #[error("Module '{0}' was required by its own loader")]
    CyclicLoad(String),

    /// A lock was poisoned by a panicking thread
    #[error("Module registry lock is poisoned")]
    PoisonedLock,
}

enum GenuineState {
    Unloaded,
    Loading(ThreadId),
    Loaded(Arc<Module>),
}

struct ModuleEntry {
    loader: ModuleLoader,
    genuine: Mutex<GenuineState>,
}

impl ModuleEntry {
    fn new(loader: ModuleLoader) -> Self {
        Self {
            loader,
            genuine: Mutex::new(GenuineState::Unloaded),
        }
    }

    fn lock_genuine(&self, id: &str) -> StdResult<MutexGuard<'_, GenuineState>> {
        self.genuine
            .lock()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| format!("Module registry can not lock genuine module '{id}'"))
    }

    /// Load the genuine module once.
    ///
    /// The loader runs without holding the entry lock so it may itself resolve other modules.
    /// When loads race on different threads the first stored module wins and every caller gets it.
    fn genuine(&self, id: &str) -> StdResult<Arc<Module>> {
        let current = thread::current().id();
        {
            let mut genuine = self.lock_genuine(id)?;
            match *genuine {
                GenuineState::Loaded(ref module) => return Ok(module.clone()),
                GenuineState::Loading(loading) if loading == current => {
                    return Err(ModuleRegistryError::CyclicLoad(id.to_string()).into());
                }
                GenuineState::Loading(_) => {}
                GenuineState::Unloaded => *genuine = GenuineState::Loading(current),
            }
        }

        let loaded = (self.loader)();
        let mut genuine = self.lock_genuine(id)?;
        if let GenuineState::Loaded(ref module) = *genuine {
            return Ok(module.clone());
        }
        match loaded {
            Ok(module) => {
                let module = Arc::new(module);
                *genuine = GenuineState::Loaded(module.clone());
                Ok(module)
            }
            Err(error) => {
                if matches!(*genuine, GenuineState::Loading(loading) if loading == current) {
                    *genuine = GenuineState::Unloaded;
                }
                Err(error.context(ModuleRegistryError::LoaderFailed(id.to_string())))
            }
        }
    }
}

/// Maps module identifiers to their genuine module and, optionally, an installed substitution.
///
/// Code under test obtains its dependencies through [ModuleRegistry::resolve]: it gets the
/// substitute while one is installed and the genuine module otherwise.
pub struct ModuleRegistry {
    entries: RwLock<BTreeMap<String, Arc<ModuleEntry>>>,
    substitutions: RwLock<BTreeMap<String, Arc<Substitution>>>,
    logger: Logger,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new(logger: &Logger) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            substitutions: RwLock::new(BTreeMap::new()),
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Process wide registry
    pub fn global() -> &'static ModuleRegistry {
        static GLOBAL: OnceLock<ModuleRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| ModuleRegistry::new(&discard_logger()))
    }

    /// Declare a module, its loader runs on first use.
    ///
    /// Declaring an identifier again replaces its loader, forgets the loaded genuine module
    /// and uninstalls its substitution.
    pub fn declare<I, F>(&self, id: I, loader: F) -> StdResult<()>
    where
        I: Into<String>,
        F: Fn() -> StdResult<Module> + Send + Sync + 'static,
    {
        let id = id.into();
        let previous = self
            .entries
            .write()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| "Module registry can not lock entries for writing")?
            .insert(id.clone(), Arc::new(ModuleEntry::new(Arc::new(loader))));
        if previous.is_some() {
            self.restore(&id)?;
        }
        debug!(self.logger, "Module declared"; "module" => &id, "redeclared" => previous.is_some());

        Ok(())
    }

    /// Check if a module is declared
    pub fn is_declared(&self, id: &str) -> StdResult<bool> {
        Ok(self.entry(id)?.is_some())
    }

    fn entry(&self, id: &str) -> StdResult<Option<Arc<ModuleEntry>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| "Module registry can not lock entries for reading")?;

        Ok(entries.get(id).cloned())
    }

    fn substitution(&self, id: &str) -> StdResult<Option<Arc<Substitution>>> {
        let substitutions = self
            .substitutions
            .read()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| "Module registry can not lock substitutions for reading")?;

        Ok(substitutions.get(id).cloned())
    }

    /// The genuine module, ignoring any installed substitution
    pub fn require_actual(&self, id: &str) -> StdResult<Arc<Module>> {
        let entry = self
            .entry(id)?
            .ok_or_else(|| ModuleRegistryError::UnknownModule(id.to_string()))?;

        entry.genuine(id)
    }

    /// The module as seen by code under test: the substitute if installed, the genuine otherwise
    pub fn resolve(&self, id: &str) -> StdResult<ResolvedModule> {
        match self.substitution(id)? {
            Some(substitution) => Ok(ResolvedModule::Substitute(substitution)),
            None => Ok(ResolvedModule::Genuine(self.require_actual(id)?)),
        }
    }

    /// Install a substitution composed by `factory` from the genuine module.
    ///
    /// Replaces any substitution already installed for this identifier.
    pub fn substitute<F>(&self, id: &str, factory: F) -> StdResult<Arc<Substitution>>
    where
        F: FnOnce(&Module) -> Overrides,
    {
        let genuine = self
            .require_actual(id)
            .with_context(|| format!("Module registry can not substitute module '{id}'"))?;
        let overrides = factory(&genuine);
        let overridden = overrides.len();
        let substitution = Arc::new(Substitution::compose(genuine, overrides));

        self.substitutions
            .write()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| "Module registry can not lock substitutions for writing")?
            .insert(id.to_string(), substitution.clone());
        debug!(self.logger, "Substitution installed"; "module" => id, "overridden_members" => overridden);

        Ok(substitution)
    }

    /// Check if a substitution is installed
    pub fn is_substituted(&self, id: &str) -> StdResult<bool> {
        Ok(self.substitution(id)?.is_some())
    }

    fn installed_doubles(&self, id: Option<&str>) -> StdResult<Vec<Double>> {
        let substitutions = self
            .substitutions
            .read()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| "Module registry can not lock substitutions for reading")?;

        Ok(substitutions
            .iter()
            .filter(|(key, _)| match id {
                Some(id) => id == key.as_str(),
                None => true,
            })
            .flat_map(|(_, substitution)| substitution.doubles())
            .collect())
    }

    /// Clear the call history of the installed doubles, of one module or of all of them
    pub fn clear_all(&self, id: Option<&str>) -> StdResult<()> {
        let doubles = self.installed_doubles(id)?;
        for double in &doubles {
            double.clear();
        }
        debug!(self.logger, "Doubles cleared"; "module" => id, "doubles" => doubles.len());

        Ok(())
    }

    /// Reset the installed doubles, of one module or of all of them
    pub fn reset_all(&self, id: Option<&str>) -> StdResult<()> {
        let doubles = self.installed_doubles(id)?;
        for double in &doubles {
            double.reset();
        }
        debug!(self.logger, "Doubles reset"; "module" => id, "doubles" => doubles.len());

        Ok(())
    }

    /// Uninstall the substitution of a module, nothing happens if none is installed
    pub fn restore(&self, id: &str) -> StdResult<()> {
        let removed = self
            .substitutions
            .write()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| "Module registry can not lock substitutions for writing")?
            .remove(id);
        if removed.is_some() {
            debug!(self.logger, "Substitution restored"; "module" => id);
        }

        Ok(())
    }

    /// Uninstall every substitution
    pub fn restore_all(&self) -> StdResult<()> {
        let mut substitutions = self
            .substitutions
            .write()
            .map_err(|_| ModuleRegistryError::PoisonedLock)
            .with_context(|| "Module registry can not lock substitutions for writing")?;
        let restored = substitutions.len();
        substitutions.clear();
        debug!(self.logger, "Substitutions restored"; "restored" => restored);

        Ok(())
    }

    /// Apply a scope policy when a new test scope starts
    pub fn enter_scope(&self, policy: &ScopePolicy) -> StdResult<()> {
        if policy.restore_substitutions {
            self.restore_all()?;
        }
        if policy.reset_doubles {
            self.reset_all(None)?;
        }
        if policy.clear_doubles {
            self.clear_all(None)?;
        }

        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new(&discard_logger())
    }
}
