//! Configuration errors. Any of these stops a machine from being built.

use crate::core::StateHash;
use crate::host::EntityId;
use std::fmt;
use thiserror::Error;

/// A fatal configuration problem.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No entity supplied to the FSM '{machine}'. Call .entity(id) before .build()")]
    MissingEntity { machine: String },

    #[error("The FSM '{machine}' is attached to {entity}, which does not exist in the scene")]
    UnknownEntity { machine: String, entity: EntityId },

    #[error("No default state supplied to the FSM '{machine}'")]
    MissingDefaultState { machine: String },

    #[error("Default state id '{hash}' is not attached to the FSM '{machine}'")]
    UnknownDefaultState { machine: String, hash: StateHash },

    #[error("No FSM associated with the nested FSM state '{state}'")]
    MissingChildMachine { state: String },

    #[error(
        "The nested FSM state '{state}' is pointing to the FSM '{child}', which is not a direct child of the FSM '{machine}'"
    )]
    ChildNotContained {
        state: String,
        machine: String,
        child: String,
    },

    #[error("Invalid machine configuration: {0}")]
    InvalidConfig(String),
}

/// Every configuration problem found while building one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErrors(Vec<ConfigError>);

impl ConfigErrors {
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<ConfigError> {
        self.0
    }
}

impl From<Vec<ConfigError>> for ConfigErrors {
    fn from(errors: Vec<ConfigError>) -> Self {
        Self(errors)
    }
}

impl From<ConfigError> for ConfigErrors {
    fn from(error: ConfigError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => single.fmt(f),
            errors => {
                write!(f, "{} configuration errors:", errors.len())?;
                for error in errors {
                    write!(f, "\n  - {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigErrors {}
