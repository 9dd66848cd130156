//! The `State` contract implemented by every behavior unit a machine owns.

use super::identifier::{HashedId, StateHash};
use crate::builder::ConfigError;
use crate::host::{EntityId, Hierarchy};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt::Debug;

/// Downcasting support for boxed states.
///
/// Blanket-implemented for every `'static` type, so state authors never
/// implement it by hand.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One mutually-exclusive behavior unit owned by a [`Machine`](crate::Machine).
///
/// The owning machine decides when a state is enabled. Hooks are notified of
/// those decisions; a state has no way to flip its own enabled flag, which is
/// what keeps at most one state per machine active.
///
/// # Example
///
/// ```rust
/// use statetree::core::{HashedId, State, StateContext};
///
/// #[derive(Debug)]
/// struct Charging {
///     id: HashedId,
///     progress: f32,
/// }
///
/// impl State for Charging {
///     fn id(&self) -> &HashedId {
///         &self.id
///     }
///
///     fn on_update(&mut self, ctx: &mut StateContext<'_>) {
///         self.progress += 0.5;
///         if self.progress >= 1.0 {
///             ctx.request_transition(HashedId::hash_of("Fire"), false);
///         }
///     }
///
///     fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {
///         self.progress = 0.0;
///     }
/// }
/// ```
pub trait State: AsAny + Debug {
    /// Identifier under which the machine registers this state.
    ///
    /// Must return the same value for the whole lifetime of the state.
    fn id(&self) -> &HashedId;

    /// Called when the owning machine enables this state.
    fn on_activated(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called when the owning machine disables this state.
    fn on_deactivated(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Per-frame hook, forwarded only to the current state of an active machine.
    fn on_update(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called on every registered state whenever the owning machine restarts,
    /// whether or not this state is active.
    fn on_restarted(&mut self, ctx: &mut StateContext<'_>);

    /// Validate this state against the machine it is being attached to.
    ///
    /// An error here is fatal for the machine being built.
    fn configure(&self, _setup: &StateSetup<'_>) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// A switch requested from inside a state hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    pub hash: StateHash,
    pub force: bool,
}

/// Handle a state receives on its owning machine during a hook.
///
/// Requests are queued and carried out by the machine once the current hook
/// has returned, so the outgoing state always finishes its deactivation
/// before the next one is activated.
pub struct StateContext<'a> {
    machine: &'a str,
    entity: EntityId,
    state: StateHash,
    requests: &'a mut VecDeque<TransitionRequest>,
}

impl<'a> StateContext<'a> {
    pub(crate) fn new(
        machine: &'a str,
        entity: EntityId,
        state: StateHash,
        requests: &'a mut VecDeque<TransitionRequest>,
    ) -> Self {
        Self {
            machine,
            entity,
            state,
            requests,
        }
    }

    /// Name of the owning machine.
    pub fn machine_name(&self) -> &str {
        self.machine
    }

    /// Entity the owning machine is attached to.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Registry key of the state receiving the hook.
    pub fn state_hash(&self) -> StateHash {
        self.state
    }

    /// Ask the owning machine to switch to `hash`.
    ///
    /// `force` is passed through to [`Machine::switch_to`](crate::Machine::switch_to).
    pub fn request_transition(&mut self, hash: StateHash, force: bool) {
        self.requests.push_back(TransitionRequest { hash, force });
    }

    /// Ask the owning machine to switch to the state called `name`.
    pub fn request_transition_named(&mut self, name: &str) {
        self.request_transition(HashedId::hash_of(name), false);
    }
}

/// What a state can see about its future owner while being configured.
pub struct StateSetup<'a> {
    machine: &'a str,
    entity: EntityId,
    hierarchy: &'a dyn Hierarchy,
}

impl<'a> StateSetup<'a> {
    pub(crate) fn new(machine: &'a str, entity: EntityId, hierarchy: &'a dyn Hierarchy) -> Self {
        Self {
            machine,
            entity,
            hierarchy,
        }
    }

    pub fn machine_name(&self) -> &str {
        self.machine
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn hierarchy(&self) -> &dyn Hierarchy {
        self.hierarchy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Counter {
        id: HashedId,
        restarts: usize,
    }

    impl State for Counter {
        fn id(&self) -> &HashedId {
            &self.id
        }

        fn on_activated(&mut self, ctx: &mut StateContext<'_>) {
            ctx.request_transition_named("Next");
        }

        fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {
            self.restarts += 1;
        }
    }

    #[test]
    fn context_queues_requests_in_order() {
        let mut queue = VecDeque::new();
        let mut ctx = StateContext::new("fsm", EntityId::new(3), 11, &mut queue);

        ctx.request_transition(5, false);
        ctx.request_transition(6, true);

        assert_eq!(ctx.machine_name(), "fsm");
        assert_eq!(ctx.entity(), EntityId::new(3));
        assert_eq!(ctx.state_hash(), 11);
        assert_eq!(
            queue.into_iter().collect::<Vec<_>>(),
            vec![
                TransitionRequest {
                    hash: 5,
                    force: false
                },
                TransitionRequest {
                    hash: 6,
                    force: true
                },
            ]
        );
    }

    #[test]
    fn hooks_receive_context() {
        let mut state = Counter {
            id: HashedId::new("Counter"),
            restarts: 0,
        };
        let mut queue = VecDeque::new();

        {
            let mut ctx = StateContext::new("fsm", EntityId::new(0), state.id.hash, &mut queue);
            state.on_activated(&mut ctx);
            state.on_restarted(&mut ctx);
        }

        assert_eq!(state.restarts, 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].hash, HashedId::hash_of("Next"));
    }

    #[test]
    fn boxed_state_downcasts_to_concrete_type() {
        let state: Box<dyn State> = Box::new(Counter {
            id: HashedId::new("Counter"),
            restarts: 2,
        });

        let counter = (*state).as_any().downcast_ref::<Counter>();
        assert_eq!(counter.map(|c| c.restarts), Some(2));
    }
}
