//! Recoverable errors raised while a machine runs.

use crate::core::StateHash;
use thiserror::Error;

/// Per-entry failure while rebuilding a machine's registry.
///
/// The offending state is skipped; the rest of the registry is rebuilt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error(
        "State name '{name}' is already in use in the FSM '{machine}' (taken by '{existing}', hash {hash}). \
         If that name isn't in use then a duplicate hash id has been generated and one of the offending state names must change"
    )]
    DuplicateId {
        machine: String,
        name: String,
        existing: String,
        hash: StateHash,
    },
}

/// Per-call failure of a switch. The current state is left unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SwitchError {
    #[error("State id '{hash}' does not belong to the FSM '{machine}'")]
    UnknownState { machine: String, hash: StateHash },

    #[error("FSM '{machine}' cannot switch to state id '{hash}' before its first activation")]
    NotStarted { machine: String, hash: StateHash },

    #[error("FSM '{machine}' exceeded {limit} chained transition requests; dropped {dropped} pending request(s)")]
    TransitionChainExceeded {
        machine: String,
        limit: usize,
        dropped: usize,
    },
}

/// Reasons a state cannot be detached from its machine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetachError {
    #[error("No state with id '{hash}' is attached to the FSM '{machine}'")]
    NotAttached { machine: String, hash: StateHash },

    #[error("State '{name}' is the default state of the FSM '{machine}'")]
    DefaultState { machine: String, name: String },

    #[error("State '{name}' is the current state of the FSM '{machine}'")]
    CurrentState { machine: String, name: String },
}
