//! Serializable machine settings.

use crate::builder::error::ConfigError;
use crate::core::DEFAULT_HISTORY_CAPACITY;
use crate::machine::RestartPolicy;
use serde::{Deserialize, Serialize};

/// The designer-set fields of a machine, as stored in authoring data.
///
/// # Example
///
/// ```rust
/// use statetree::builder::MachineConfig;
/// use statetree::RestartPolicy;
///
/// let config = MachineConfig::from_json(r#"{
///     "name": "Guard",
///     "default_state": "Idle",
///     "restart_policy": "unpause"
/// }"#).unwrap();
///
/// assert_eq!(config.restart_policy, RestartPolicy::Unpause);
/// assert!(config.error_on_invalid_switch);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Name of the state enabled on first activation
    pub default_state: String,

    #[serde(default)]
    pub restart_policy: RestartPolicy,

    /// Report switches to states that don't exist
    #[serde(default = "default_error_on_invalid_switch")]
    pub error_on_invalid_switch: bool,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_error_on_invalid_switch() -> bool {
    true
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl MachineConfig {
    pub fn new(default_state: impl Into<String>) -> Self {
        Self {
            name: None,
            default_state: default_state.into(),
            restart_policy: RestartPolicy::default(),
            error_on_invalid_switch: default_error_on_invalid_switch(),
            history_capacity: default_history_capacity(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }
}
