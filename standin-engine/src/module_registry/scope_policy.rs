use serde::{Deserialize, Serialize};

/// What happens to doubles and substitutions when a new test scope starts.
///
/// Steps are applied in this order: restore, reset, clear. A step that is not
/// enabled leaves the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopePolicy {
    /// Empty the call history of every installed double
    pub clear_doubles: bool,

    /// Empty the call history and drop every configured behavior of every installed double
    pub reset_doubles: bool,

    /// Uninstall every substitution
    pub restore_substitutions: bool,
}

impl ScopePolicy {
    /// Policy leaving everything untouched
    pub fn none() -> Self {
        Self {
            clear_doubles: false,
            reset_doubles: false,
            restore_substitutions: false,
        }
    }
}

impl Default for ScopePolicy {
    fn default() -> Self {
        Self {
            clear_doubles: true,
            ..Self::none()
        }
    }
}
