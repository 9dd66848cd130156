//! Builder for constructing machines.

use crate::builder::config::MachineConfig;
use crate::builder::error::{ConfigError, ConfigErrors};
use crate::core::{HashedId, State, StateHash, StateSetup, DEFAULT_HISTORY_CAPACITY};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::host::{EntityId, Hierarchy};
use crate::machine::{Machine, MachineSettings, RestartPolicy};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

const FALLBACK_MACHINE_NAME: &str = "fsm";

/// Builder for machines with a fluent API.
///
/// Building validates the whole configuration in one pass and reports every
/// problem it finds, not just the first.
///
/// # Example
///
/// ```rust
/// use statetree::core::{HashedId, State, StateContext};
/// use statetree::host::SceneTree;
/// use statetree::MachineBuilder;
///
/// #[derive(Debug)]
/// struct Idle(HashedId);
///
/// impl State for Idle {
///     fn id(&self) -> &HashedId {
///         &self.0
///     }
///
///     fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {}
/// }
///
/// let mut scene = SceneTree::new();
/// let guard = scene.spawn("Guard");
///
/// let mut machine = MachineBuilder::new()
///     .entity(guard)
///     .default_state_named("Idle")
///     .state(Idle(HashedId::new("Idle")))
///     .build(&scene)
///     .unwrap();
///
/// machine.activate();
/// assert_eq!(machine.current_hash(), Some(HashedId::hash_of("Idle")));
/// ```
pub struct MachineBuilder {
    name: Option<String>,
    entity: Option<EntityId>,
    default_state: Option<StateHash>,
    restart_policy: RestartPolicy,
    error_on_invalid_switch: bool,
    history_capacity: usize,
    diagnostics: Option<Box<dyn DiagnosticSink>>,
    states: Vec<Box<dyn State>>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self {
            name: None,
            entity: None,
            default_state: None,
            restart_policy: RestartPolicy::default(),
            error_on_invalid_switch: true,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            diagnostics: None,
            states: Vec::new(),
        }
    }

    /// Start from authoring data. Entity and states still have to be supplied.
    pub fn from_config(config: &MachineConfig) -> Self {
        let mut builder = Self::new()
            .default_state_named(&config.default_state)
            .restart_policy(config.restart_policy)
            .error_on_invalid_switch(config.error_on_invalid_switch)
            .history_capacity(config.history_capacity);
        builder.name = config.name.clone();
        builder
    }

    /// Name used in diagnostics. Defaults to the entity's name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Entity the machine is attached to (required).
    pub fn entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// State enabled on first activation (required).
    pub fn default_state(mut self, hash: StateHash) -> Self {
        self.default_state = Some(hash);
        self
    }

    pub fn default_state_named(self, name: &str) -> Self {
        self.default_state(HashedId::hash_of(name))
    }

    pub fn restart_policy(mut self, policy: RestartPolicy) -> Self {
        self.restart_policy = policy;
        self
    }

    pub fn error_on_invalid_switch(mut self, enabled: bool) -> Self {
        self.error_on_invalid_switch = enabled;
        self
    }

    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Where recoverable errors go. Defaults to [`TracingSink`].
    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Some(Box::new(sink));
        self
    }

    /// Attach a state.
    pub fn state(mut self, state: impl State) -> Self {
        self.states.push(Box::new(state));
        self
    }

    /// Attach several boxed states at once.
    pub fn states(mut self, states: impl IntoIterator<Item = Box<dyn State>>) -> Self {
        self.states.extend(states);
        self
    }

    /// Check the configuration, accumulating every problem.
    pub fn validate(&self, hierarchy: &dyn Hierarchy) -> Validation<(), NonEmptyVec<ConfigError>> {
        let machine = self.resolve_name(hierarchy);
        let mut checks: Vec<Validation<(), NonEmptyVec<ConfigError>>> = Vec::new();

        let entity_check = match self.entity {
            None => Validation::fail(ConfigError::MissingEntity {
                machine: machine.clone(),
            }),
            Some(entity) if !hierarchy.contains(entity) => {
                Validation::fail(ConfigError::UnknownEntity {
                    machine: machine.clone(),
                    entity,
                })
            }
            Some(_) => Validation::success(()),
        };
        checks.push(entity_check);

        let default_check = match self.default_state {
            None => Validation::fail(ConfigError::MissingDefaultState {
                machine: machine.clone(),
            }),
            Some(hash) if !self.states.iter().any(|s| s.id().hash == hash) => {
                Validation::fail(ConfigError::UnknownDefaultState {
                    machine: machine.clone(),
                    hash,
                })
            }
            Some(_) => Validation::success(()),
        };
        checks.push(default_check);

        if let Some(entity) = self.entity {
            let setup = StateSetup::new(&machine, entity, hierarchy);
            for state in &self.states {
                let check = match state.configure(&setup) {
                    Ok(()) => Validation::success(()),
                    Err(error) => Validation::fail(error),
                };
                checks.push(check);
            }
        }

        Validation::all_vec(checks).map(|_| ())
    }

    /// Validate and build the machine.
    ///
    /// Duplicate state ids are not fatal: they are reported to the
    /// diagnostic sink and the later state is left out of the registry.
    pub fn build(self, hierarchy: &dyn Hierarchy) -> Result<Machine, ConfigErrors> {
        if let Validation::Failure(errors) = self.validate(hierarchy) {
            return Err(errors.iter().cloned().collect::<Vec<_>>().into());
        }

        let name = self.resolve_name(hierarchy);
        let entity = self.entity.ok_or_else(|| ConfigError::MissingEntity {
            machine: name.clone(),
        })?;
        let default_state = self
            .default_state
            .ok_or_else(|| ConfigError::MissingDefaultState {
                machine: name.clone(),
            })?;

        let settings = MachineSettings {
            name,
            entity,
            default_state,
            restart_policy: self.restart_policy,
            error_on_invalid_switch: self.error_on_invalid_switch,
            history_capacity: self.history_capacity,
            diagnostics: self
                .diagnostics
                .unwrap_or_else(|| Box::new(TracingSink)),
        };
        let machine = Machine::assemble(settings, self.states);
        debug!(machine = %machine.name(), entity = %machine.entity(), states = machine.len(), "built machine");
        Ok(machine)
    }

    fn resolve_name(&self, hierarchy: &dyn Hierarchy) -> String {
        self.name
            .clone()
            .or_else(|| {
                self.entity
                    .and_then(|entity| hierarchy.name_of(entity))
                    .map(str::to_string)
            })
            .unwrap_or_else(|| FALLBACK_MACHINE_NAME.to_string())
    }
}

impl Default for MachineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
