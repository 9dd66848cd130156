//! Statetree: hierarchical single-active-state machines
//!
//! A [`Machine`] is attached to an entity of a host scene and owns a set of
//! [`State`]s. While the entity is enabled exactly one state is active; the
//! machine performs every switch between them, and pauses or restarts when the
//! entity is disabled and re-enabled. A [`NestedMachine`] is a state that runs
//! a whole child machine in its place, which turns flat machines into trees.
//!
//! # Core Concepts
//!
//! - **State**: a behavior unit keyed by a stable [`HashedId`]
//! - **Machine**: registry of states, switch path, and host lifecycle
//! - **Restart policy**: resume the paused state or return to the default one
//! - **Diagnostics**: recoverable errors go to a sink instead of failing calls
//!
//! # Example
//!
//! ```rust
//! use statetree::core::{HashedId, State, StateContext};
//! use statetree::host::SceneTree;
//! use statetree::{MachineBuilder, RestartPolicy};
//!
//! #[derive(Debug)]
//! struct Idle {
//!     id: HashedId,
//!     waited: u32,
//! }
//!
//! impl State for Idle {
//!     fn id(&self) -> &HashedId {
//!         &self.id
//!     }
//!
//!     fn on_update(&mut self, ctx: &mut StateContext<'_>) {
//!         self.waited += 1;
//!         if self.waited == 2 {
//!             ctx.request_transition_named("Walk");
//!         }
//!     }
//!
//!     fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {
//!         self.waited = 0;
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct Walk(HashedId);
//!
//! impl State for Walk {
//!     fn id(&self) -> &HashedId {
//!         &self.0
//!     }
//!
//!     fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {}
//! }
//!
//! let mut scene = SceneTree::new();
//! let guard = scene.spawn("Guard");
//!
//! let mut machine = MachineBuilder::new()
//!     .entity(guard)
//!     .default_state_named("Idle")
//!     .restart_policy(RestartPolicy::Unpause)
//!     .state(Idle { id: HashedId::new("Idle"), waited: 0 })
//!     .state(Walk(HashedId::new("Walk")))
//!     .build(&scene)
//!     .unwrap();
//!
//! machine.activate();
//! machine.update();
//! machine.update();
//! assert_eq!(machine.current_id().map(|id| id.name.as_str()), Some("Walk"));
//!
//! machine.deactivate();
//! machine.activate();
//! assert_eq!(machine.current_id().map(|id| id.name.as_str()), Some("Walk"));
//! ```

pub mod builder;
pub mod core;
pub mod diagnostics;
pub mod host;
pub mod machine;
pub mod nested;

// Re-export commonly used types
pub use builder::{ConfigError, MachineBuilder};
pub use crate::core::{HashedId, State, StateContext, StateHash};
pub use machine::{Machine, RestartPolicy};
pub use nested::NestedMachine;
