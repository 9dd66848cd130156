//! Single-active-state machine driven by its host entity's lifecycle.

use crate::builder::ConfigError;
use crate::core::{
    HashedId, State, StateContext, StateHash, StateSetup, SwitchCause, SwitchHistory,
    SwitchRecord, TransitionRequest,
};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::host::{EntityId, Hierarchy};
use crate::machine::error::{DetachError, RegistrationError, SwitchError};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::{debug, trace};

/// Upper bound on transition requests carried out after a single operation.
pub const MAX_CHAINED_TRANSITIONS: usize = 64;

/// What a machine does when its entity is re-enabled after being disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Notify every state of the restart and return to the default state
    #[default]
    Restart,
    /// Re-enable the state that was current when the entity was disabled
    Unpause,
}

struct StateSlot {
    state: Box<dyn State>,
    enabled: bool,
}

#[derive(Clone, Copy)]
enum Hook {
    Activated,
    Deactivated,
    Restarted,
    Update,
}

fn notify(
    slot: &mut StateSlot,
    machine: &str,
    entity: EntityId,
    requests: &mut VecDeque<TransitionRequest>,
    hook: Hook,
) {
    let hash = slot.state.id().hash;
    let mut ctx = StateContext::new(machine, entity, hash, requests);
    match hook {
        Hook::Activated => slot.state.on_activated(&mut ctx),
        Hook::Deactivated => slot.state.on_deactivated(&mut ctx),
        Hook::Restarted => slot.state.on_restarted(&mut ctx),
        Hook::Update => slot.state.on_update(&mut ctx),
    }
}

/// Settings the builder has validated.
pub(crate) struct MachineSettings {
    pub name: String,
    pub entity: EntityId,
    pub default_state: StateHash,
    pub restart_policy: RestartPolicy,
    pub error_on_invalid_switch: bool,
    pub history_capacity: usize,
    pub diagnostics: Box<dyn DiagnosticSink>,
}

/// A finite state machine with exactly one active state while running.
///
/// States are attached explicitly and keyed by their [`HashedId`] hash. The
/// host drives the machine through [`activate`](Self::activate),
/// [`deactivate`](Self::deactivate) and [`update`](Self::update); states and
/// callers move it with [`switch_to`](Self::switch_to). Transitions are not
/// filtered: any registered state can be switched to from any other.
///
/// Build one with [`MachineBuilder`](crate::MachineBuilder).
pub struct Machine {
    name: String,
    entity: EntityId,
    default_state: StateHash,
    restart_policy: RestartPolicy,
    error_on_invalid_switch: bool,
    slots: Vec<StateSlot>,
    registry: HashMap<StateHash, usize>,
    current: Option<StateHash>,
    active: bool,
    first_run: bool,
    restarted_while_paused: bool,
    pending: VecDeque<TransitionRequest>,
    history: SwitchHistory,
    diagnostics: Box<dyn DiagnosticSink>,
}

impl Machine {
    pub(crate) fn assemble(settings: MachineSettings, states: Vec<Box<dyn State>>) -> Self {
        let mut machine = Self {
            name: settings.name,
            entity: settings.entity,
            default_state: settings.default_state,
            restart_policy: settings.restart_policy,
            error_on_invalid_switch: settings.error_on_invalid_switch,
            slots: states
                .into_iter()
                .map(|state| StateSlot {
                    state,
                    enabled: false,
                })
                .collect(),
            registry: HashMap::new(),
            current: None,
            active: false,
            first_run: true,
            restarted_while_paused: false,
            pending: VecDeque::new(),
            history: SwitchHistory::with_capacity(settings.history_capacity),
            diagnostics: settings.diagnostics,
        };
        machine.rebuild_registry();
        machine
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn default_state(&self) -> StateHash {
        self.default_state
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        self.restart_policy
    }

    pub fn set_restart_policy(&mut self, policy: RestartPolicy) {
        self.restart_policy = policy;
    }

    pub fn error_on_invalid_switch(&self) -> bool {
        self.error_on_invalid_switch
    }

    /// Choose whether switches to unknown states are reported or silent.
    pub fn set_error_on_invalid_switch(&mut self, enabled: bool) {
        self.error_on_invalid_switch = enabled;
    }

    /// Whether the host entity currently has this machine enabled.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current state, or `None` before the first activation.
    ///
    /// While the machine is inactive this is the paused state.
    pub fn current_state(&self) -> Option<&dyn State> {
        self.current_index().map(|i| self.slots[i].state.as_ref())
    }

    pub fn current_hash(&self) -> Option<StateHash> {
        self.current
    }

    pub fn current_id(&self) -> Option<&HashedId> {
        self.current_state().map(|state| state.id())
    }

    /// Whether the registered state `hash` is currently enabled.
    pub fn is_state_active(&self, hash: StateHash) -> bool {
        self.registry
            .get(&hash)
            .is_some_and(|&index| self.slots[index].enabled)
    }

    /// Number of enabled states. Never more than one.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.enabled).count()
    }

    pub fn contains(&self, hash: StateHash) -> bool {
        self.registry.contains_key(&hash)
    }

    pub fn state(&self, hash: StateHash) -> Option<&dyn State> {
        self.registry
            .get(&hash)
            .map(|&index| self.slots[index].state.as_ref())
    }

    pub fn state_mut(&mut self, hash: StateHash) -> Option<&mut dyn State> {
        let index = *self.registry.get(&hash)?;
        Some(self.slots[index].state.as_mut())
    }

    /// Registered state `hash` as its concrete type.
    pub fn state_as<T: State>(&self, hash: StateHash) -> Option<&T> {
        let index = *self.registry.get(&hash)?;
        (*self.slots[index].state).as_any().downcast_ref::<T>()
    }

    pub fn state_as_mut<T: State>(&mut self, hash: StateHash) -> Option<&mut T> {
        let index = *self.registry.get(&hash)?;
        (*self.slots[index].state).as_any_mut().downcast_mut::<T>()
    }

    /// Identifiers of registered states, in attachment order.
    pub fn registered_ids(&self) -> Vec<&HashedId> {
        self.registered_indices()
            .map(|index| self.slots[index].state.id())
            .collect()
    }

    /// Number of registered states.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of attached states, including ones the registry rejected.
    pub fn attached_len(&self) -> usize {
        self.slots.len()
    }

    pub fn history(&self) -> &SwitchHistory {
        &self.history
    }

    /// Attach a state after the machine was built.
    ///
    /// The state is validated immediately and joins the registry on the next
    /// [`refresh_states`](Self::refresh_states), which every activation runs.
    pub fn attach(
        &mut self,
        state: Box<dyn State>,
        hierarchy: &dyn Hierarchy,
    ) -> Result<(), ConfigError> {
        let setup = StateSetup::new(&self.name, self.entity, hierarchy);
        state.configure(&setup)?;
        debug!(machine = %self.name, state = %state.id(), "attached state");
        self.slots.push(StateSlot {
            state,
            enabled: false,
        });
        Ok(())
    }

    /// Remove an attached state and rebuild the registry without it.
    ///
    /// When several attached states share `hash`, the ones the registry
    /// skipped are removed first, newest first. The registered default state
    /// and the registered current state cannot be detached.
    pub fn detach(&mut self, hash: StateHash) -> Result<Box<dyn State>, DetachError> {
        let candidates: Vec<usize> = (0..self.slots.len())
            .filter(|&index| self.slots[index].state.id().hash == hash)
            .collect();
        // Shadowed duplicates go first, most recently attached first.
        let position = candidates
            .iter()
            .rev()
            .copied()
            .find(|&index| !self.is_registered(index))
            .or_else(|| candidates.first().copied())
            .ok_or_else(|| DetachError::NotAttached {
                machine: self.name.clone(),
                hash,
            })?;

        if self.is_registered(position) {
            let name = self.slots[position].state.id().name.clone();
            if hash == self.default_state {
                return Err(DetachError::DefaultState {
                    machine: self.name.clone(),
                    name,
                });
            }
            if self.current == Some(hash) {
                return Err(DetachError::CurrentState {
                    machine: self.name.clone(),
                    name,
                });
            }
        }

        let slot = self.slots.remove(position);
        debug!(machine = %self.name, state = %slot.state.id(), "detached state");
        self.rebuild_registry();
        self.drain_requests();
        Ok(slot.state)
    }

    /// Rebuild the registry from the attached states.
    ///
    /// Each state is inserted under its hash unless the hash is taken, in
    /// which case the state is skipped and a [`RegistrationError`] is reported
    /// and returned. A skipped state is disabled.
    pub fn refresh_states(&mut self) -> Vec<RegistrationError> {
        let collisions = self.rebuild_registry();
        self.drain_requests();
        collisions
    }

    /// Host callback: the owning entity became enabled.
    ///
    /// Rebuilds the registry. The first activation enables the default state
    /// and makes it current. Later ones follow the [`RestartPolicy`], except
    /// that a machine restarted while paused just resumes its default state.
    pub fn activate(&mut self) {
        if self.active {
            return;
        }
        self.active = true;
        self.rebuild_registry();

        if self.first_run {
            self.first_run = false;
            self.start();
        } else if self.restarted_while_paused {
            self.restarted_while_paused = false;
            self.resume();
        } else {
            match self.restart_policy {
                RestartPolicy::Restart => self.restart_registered(),
                RestartPolicy::Unpause => self.resume(),
            }
        }
        self.drain_requests();
    }

    /// Host callback: the owning entity became disabled.
    ///
    /// Disables the current state but keeps it current, so it can be resumed
    /// or restarted on the next activation.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        if let Some(index) = self.current_index() {
            self.set_enabled(index, false);
        }
        self.active = false;
        debug!(machine = %self.name, paused = ?self.current_id().map(|id| &id.name), "deactivated");
        self.drain_requests();
    }

    /// Notify every registered state of a restart, then switch to the default
    /// state.
    ///
    /// The switch always deactivates and reactivates, even when the default
    /// state is already current. On an inactive machine the default state
    /// becomes the paused state instead, and the next activation resumes it
    /// without restarting again.
    pub fn restart(&mut self) {
        self.restart_registered();
        self.drain_requests();
    }

    /// Switch to the registered state `hash`.
    ///
    /// The outgoing state is deactivated before the incoming one is
    /// activated. Returns `false` and leaves the machine untouched when no
    /// state is registered under `hash`, reporting it if
    /// [`error_on_invalid_switch`](Self::error_on_invalid_switch) is set.
    ///
    /// `force` is accepted for callers written against transition filters;
    /// there are none, so every registered state is reachable either way.
    pub fn switch_to(&mut self, hash: StateHash, force: bool) -> bool {
        let switched = self.perform_switch(hash, force, SwitchCause::Request);
        self.drain_requests();
        switched
    }

    /// Make the registered state `hash` current. Same as `switch_to(hash, false)`.
    pub fn set_current_state(&mut self, hash: StateHash) -> bool {
        self.switch_to(hash, false)
    }

    /// Host callback: per-frame tick, forwarded to the current state.
    pub fn update(&mut self) {
        if !self.active {
            return;
        }
        if let Some(index) = self.current_index() {
            if self.slots[index].enabled {
                notify(
                    &mut self.slots[index],
                    &self.name,
                    self.entity,
                    &mut self.pending,
                    Hook::Update,
                );
            }
        }
        self.drain_requests();
    }

    fn current_index(&self) -> Option<usize> {
        self.current.and_then(|hash| self.registry.get(&hash).copied())
    }

    fn registered_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.slots.len()).filter(move |&index| self.is_registered(index))
    }

    fn is_registered(&self, index: usize) -> bool {
        let hash = self.slots[index].state.id().hash;
        self.registry.get(&hash) == Some(&index)
    }

    fn rebuild_registry(&mut self) -> Vec<RegistrationError> {
        self.registry.clear();
        let mut collisions = Vec::new();

        for (index, slot) in self.slots.iter().enumerate() {
            let id = slot.state.id();
            match self.registry.entry(id.hash) {
                Entry::Vacant(entry) => {
                    entry.insert(index);
                }
                Entry::Occupied(entry) => {
                    collisions.push(RegistrationError::DuplicateId {
                        machine: self.name.clone(),
                        name: id.name.clone(),
                        existing: self.slots[*entry.get()].state.id().name.clone(),
                        hash: id.hash,
                    });
                }
            }
        }

        for index in 0..self.slots.len() {
            if self.slots[index].enabled && !self.is_registered(index) {
                self.set_enabled(index, false);
            }
        }

        for collision in &collisions {
            self.report(Diagnostic::Registration(collision.clone()));
        }
        trace!(machine = %self.name, registered = self.registry.len(), skipped = collisions.len(), "refreshed states");
        collisions
    }

    fn start(&mut self) {
        let default_state = self.default_state;
        let registered: Vec<usize> = self.registered_indices().collect();
        for &index in &registered {
            if self.slots[index].state.id().hash != default_state {
                self.set_enabled(index, false);
            }
        }

        // The builder and `detach` keep the default state registered.
        let Some(&index) = self.registry.get(&default_state) else {
            return;
        };
        self.current = Some(default_state);
        self.set_enabled(index, true);

        let to = self.slots[index].state.id().clone();
        debug!(machine = %self.name, state = %to, "started");
        self.history
            .record(SwitchRecord::new(None, to, SwitchCause::Start));
    }

    fn resume(&mut self) {
        // `detach` refuses the current state, so it stays registered.
        if let Some(index) = self.current_index() {
            self.set_enabled(index, true);
            debug!(machine = %self.name, state = %self.slots[index].state.id(), "resumed");
        }
    }

    fn restart_registered(&mut self) {
        let registered: Vec<usize> = self.registered_indices().collect();
        for index in registered {
            notify(
                &mut self.slots[index],
                &self.name,
                self.entity,
                &mut self.pending,
                Hook::Restarted,
            );
        }

        if self.current.is_none() {
            trace!(machine = %self.name, "restarted before first activation");
            return;
        }
        debug!(machine = %self.name, "restarting");
        let switched = self.perform_switch(self.default_state, false, SwitchCause::Restart);
        self.restarted_while_paused = switched && !self.active;
    }

    fn perform_switch(&mut self, hash: StateHash, _force: bool, cause: SwitchCause) -> bool {
        let Some(&target) = self.registry.get(&hash) else {
            if self.error_on_invalid_switch {
                self.report(Diagnostic::Switch(SwitchError::UnknownState {
                    machine: self.name.clone(),
                    hash,
                }));
            }
            return false;
        };
        let Some(previous) = self.current else {
            self.report(Diagnostic::Switch(SwitchError::NotStarted {
                machine: self.name.clone(),
                hash,
            }));
            return false;
        };

        let previous_index = self.registry.get(&previous).copied();
        if let Some(index) = previous_index {
            self.set_enabled(index, false);
        }
        self.current = Some(hash);
        if cause == SwitchCause::Request {
            self.restarted_while_paused = false;
        }
        if self.active {
            self.set_enabled(target, true);
        }

        let from = previous_index.map(|index| self.slots[index].state.id().clone());
        let to = self.slots[target].state.id().clone();
        debug!(
            machine = %self.name,
            from = ?from.as_ref().map(|id| &id.name),
            to = %to.name,
            ?cause,
            "switched state"
        );
        self.history.record(SwitchRecord::new(from, to, cause));
        true
    }

    fn drain_requests(&mut self) {
        let mut performed = 0;
        while let Some(request) = self.pending.pop_front() {
            if performed == MAX_CHAINED_TRANSITIONS {
                let dropped = self.pending.len() + 1;
                self.pending.clear();
                self.report(Diagnostic::Switch(SwitchError::TransitionChainExceeded {
                    machine: self.name.clone(),
                    limit: MAX_CHAINED_TRANSITIONS,
                    dropped,
                }));
                return;
            }
            performed += 1;
            self.perform_switch(request.hash, request.force, SwitchCause::Request);
        }
    }

    fn set_enabled(&mut self, index: usize, enabled: bool) {
        if self.slots[index].enabled == enabled {
            return;
        }
        self.slots[index].enabled = enabled;
        let hook = if enabled {
            Hook::Activated
        } else {
            Hook::Deactivated
        };
        notify(
            &mut self.slots[index],
            &self.name,
            self.entity,
            &mut self.pending,
            hook,
        );
    }

    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.report(&diagnostic);
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("active", &self.active)
            .field("current", &self.current_id())
            .field("states", &self.registered_ids())
            .field("restart_policy", &self.restart_policy)
            .finish_non_exhaustive()
    }
}
