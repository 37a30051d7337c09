//! Engine configuration, layered from defaults and `STANDIN_` prefixed environment variables.

use std::time::Duration;

use anyhow::Context;
use config::{ConfigError, Environment, Map, Source, Value, ValueKind};
use serde::{Deserialize, Serialize};
use slog::Logger;

use crate::equality::EqualityEngine;
use crate::matcher::Matchers;
use crate::module_registry::ScopePolicy;
use crate::StdResult;

/// Prefix of the environment variables read by [EngineConfiguration::load]
pub const ENVIRONMENT_PREFIX: &str = "STANDIN";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfiguration {
    /// Nesting depth after which structural comparisons fail
    pub max_comparison_depth: usize,

    /// Bound in milliseconds for waiting on futures in asynchronous matchers.
    ///
    /// Waits without bound when not set.
    pub settle_timeout_ms: Option<u64>,

    /// Clear the call history of installed doubles when a scope starts
    pub clear_doubles: bool,

    /// Reset installed doubles when a scope starts
    pub reset_doubles: bool,

    /// Restore substituted modules when a scope starts
    pub restore_substitutions: bool,
}

impl EngineConfiguration {
    /// Load the configuration from the defaults overridden by the environment
    pub fn load() -> StdResult<Self> {
        Self::load_from(Environment::with_prefix(ENVIRONMENT_PREFIX).try_parsing(true))
    }

    /// Load the configuration from the defaults overridden by the given source
    pub fn load_from<S: Source + Send + Sync + 'static>(source: S) -> StdResult<Self> {
        config::Config::builder()
            .add_source(DefaultConfiguration::default())
            .add_source(source)
            .build()
            .with_context(|| "configuration build error")?
            .try_deserialize()
            .with_context(|| "configuration deserialize error")
    }

    /// Scope policy described by the configuration
    pub fn scope_policy(&self) -> ScopePolicy {
        ScopePolicy {
            clear_doubles: self.clear_doubles,
            reset_doubles: self.reset_doubles,
            restore_substitutions: self.restore_substitutions,
        }
    }

    /// Equality engine bounded by the configured depth
    pub fn equality_engine(&self) -> EqualityEngine {
        EqualityEngine::new(self.max_comparison_depth)
    }

    /// Bound for asynchronous matchers
    pub fn settle_timeout(&self) -> Option<Duration> {
        self.settle_timeout_ms.map(Duration::from_millis)
    }

    /// Matchers using the configured equality engine and settle timeout
    pub fn matchers(&self, logger: &Logger) -> Matchers {
        Matchers::new(self.equality_engine(), logger).with_settle_timeout(self.settle_timeout())
    }
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        let defaults = DefaultConfiguration::default();
        let policy = ScopePolicy::default();

        Self {
            max_comparison_depth: defaults.max_comparison_depth as usize,
            settle_timeout_ms: None,
            clear_doubles: policy.clear_doubles,
            reset_doubles: policy.reset_doubles,
            restore_substitutions: policy.restore_substitutions,
        }
    }
}

/// Default configuration with all the default values for configurations.
#[derive(Debug, Clone)]
pub struct DefaultConfiguration {
    /// Nesting depth after which structural comparisons fail
    pub max_comparison_depth: u64,

    /// Clear installed doubles when a scope starts
    pub clear_doubles: bool,

    /// Reset installed doubles when a scope starts
    pub reset_doubles: bool,

    /// Restore substituted modules when a scope starts
    pub restore_substitutions: bool,
}

impl DefaultConfiguration {
    fn namespace() -> String {
        "default configuration".to_string()
    }
}

impl Default for DefaultConfiguration {
    fn default() -> Self {
        let policy = ScopePolicy::default();

        Self {
            max_comparison_depth: EqualityEngine::DEFAULT_MAX_DEPTH as u64,
            clear_doubles: policy.clear_doubles,
            reset_doubles: policy.reset_doubles,
            restore_substitutions: policy.restore_substitutions,
        }
    }
}

impl Source for DefaultConfiguration {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        fn into_value<V: Into<ValueKind>>(value: V) -> Value {
            Value::new(Some(&DefaultConfiguration::namespace()), value.into())
        }
        let mut result = Map::new();
        let myself = self.clone();

        result.insert(
            "max_comparison_depth".to_string(),
            into_value(myself.max_comparison_depth),
        );

        result.insert("clear_doubles".to_string(), into_value(myself.clear_doubles));

        result.insert("reset_doubles".to_string(), into_value(myself.reset_doubles));

        result.insert(
            "restore_substitutions".to_string(),
            into_value(myself.restore_substitutions),
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(variables: &[(&str, &str)]) -> Environment {
        let source: Map<String, String> = variables
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Environment::with_prefix(ENVIRONMENT_PREFIX)
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn load_without_override_gives_the_defaults() {
        let configuration = EngineConfiguration::load_from(environment(&[])).unwrap();

        assert_eq!(EngineConfiguration::default(), configuration);
        assert_eq!(ScopePolicy::default(), configuration.scope_policy());
        assert_eq!(None, configuration.settle_timeout());
        assert_eq!(
            EqualityEngine::DEFAULT_MAX_DEPTH,
            configuration.equality_engine().max_depth()
        );
    }

    #[test]
    fn environment_overrides_the_defaults() {
        let configuration = EngineConfiguration::load_from(environment(&[
            ("STANDIN_MAX_COMPARISON_DEPTH", "16"),
            ("STANDIN_SETTLE_TIMEOUT_MS", "250"),
            ("STANDIN_CLEAR_DOUBLES", "false"),
            ("STANDIN_RESTORE_SUBSTITUTIONS", "true"),
        ]))
        .unwrap();

        assert_eq!(16, configuration.equality_engine().max_depth());
        assert_eq!(
            Some(Duration::from_millis(250)),
            configuration.settle_timeout()
        );
        assert_eq!(
            ScopePolicy {
                clear_doubles: false,
                reset_doubles: false,
                restore_substitutions: true,
            },
            configuration.scope_policy()
        );
    }

    #[test]
    fn matchers_carry_the_configured_bounds() {
        let configuration = EngineConfiguration::load_from(environment(&[
            ("STANDIN_MAX_COMPARISON_DEPTH", "8"),
            ("STANDIN_SETTLE_TIMEOUT_MS", "40"),
        ]))
        .unwrap();

        let matchers = configuration.matchers(&crate::logging::discard_logger());

        assert_eq!(8, matchers.equality().max_depth());
        assert_eq!(Some(Duration::from_millis(40)), matchers.settle_timeout());
    }

    #[test]
    fn invalid_value_is_rejected() {
        let result = EngineConfiguration::load_from(environment(&[(
            "STANDIN_MAX_COMPARISON_DEPTH",
            "deep",
        )]));

        assert!(result.is_err());
    }
}
