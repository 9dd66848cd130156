//! Machine construction and configuration.
//!
//! [`MachineBuilder`] is the only way to obtain a [`Machine`](crate::Machine),
//! so every machine in existence has passed configuration validation:
//! an entity, a default state that is attached, and states whose own
//! `configure` checks succeed.

pub mod config;
pub mod error;
pub mod machine;

pub use config::MachineConfig;
pub use error::{ConfigError, ConfigErrors};
pub use machine::MachineBuilder;
