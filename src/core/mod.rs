//! Core types shared by every machine.
//!
//! - `HashedId`: stable `(name, hash)` keys for states
//! - `State`: the behavior-unit contract and the context handed to its hooks
//! - `SwitchHistory`: bounded journal of performed switches

mod history;
mod identifier;
mod state;

pub use history::{SwitchCause, SwitchHistory, SwitchRecord, DEFAULT_HISTORY_CAPACITY};
pub use identifier::{HashedId, StateHash};
pub use state::{AsAny, State, StateContext, StateSetup, TransitionRequest};
