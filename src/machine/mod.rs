//! The state machine runtime.
//!
//! A [`Machine`] owns its states, keeps exactly one of them enabled while its
//! host entity is enabled, and performs every switch between them:
//!
//! - **Registry**: states are keyed by hash and rebuilt on every activation
//! - **Switching**: deactivate the outgoing state, then activate the incoming one
//! - **Lifecycle**: pause on deactivation, then restart or unpause per [`RestartPolicy`]

mod error;
#[allow(clippy::module_inception)]
mod machine;

pub use error::{DetachError, RegistrationError, SwitchError};
pub use machine::{Machine, RestartPolicy, MAX_CHAINED_TRANSITIONS};
pub(crate) use machine::MachineSettings;
