//! A state that runs a whole child machine in its place.
//!
//! Nesting turns a flat machine into a tree: the parent sees one state, and
//! while that state is active its child machine runs with its own registry,
//! current state and restart policy. The child must live on an entity that is
//! a direct child of the parent machine's entity, which keeps lifetimes nested
//! the same way the scene is.

use crate::builder::ConfigError;
use crate::core::{HashedId, State, StateContext, StateSetup};
use crate::machine::Machine;
use tracing::trace;

/// State variant that forwards its lifecycle to a child [`Machine`].
///
/// | parent event | child machine |
/// | --- | --- |
/// | state activated | [`Machine::activate`] |
/// | state deactivated | [`Machine::deactivate`] |
/// | parent restarted | [`Machine::restart`], once the child is paused |
/// | parent update | [`Machine::update`] |
///
/// # Example
///
/// ```rust
/// use statetree::core::{HashedId, State, StateContext};
/// use statetree::host::SceneTree;
/// use statetree::{MachineBuilder, NestedMachine};
///
/// #[derive(Debug)]
/// struct Leaf(HashedId);
///
/// impl State for Leaf {
///     fn id(&self) -> &HashedId {
///         &self.0
///     }
///
///     fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {}
/// }
///
/// let mut scene = SceneTree::new();
/// let guard = scene.spawn("Guard");
/// let combat = scene.spawn_child(guard, "Combat").unwrap();
///
/// let child = MachineBuilder::new()
///     .entity(combat)
///     .default_state_named("Aim")
///     .state(Leaf(HashedId::new("Aim")))
///     .build(&scene)
///     .unwrap();
///
/// let mut parent = MachineBuilder::new()
///     .entity(guard)
///     .default_state_named("Fight")
///     .state(NestedMachine::new(HashedId::new("Fight"), child))
///     .build(&scene)
///     .unwrap();
///
/// parent.activate();
/// let fight = parent.state_as::<NestedMachine>(HashedId::hash_of("Fight")).unwrap();
/// assert!(fight.child().is_active());
/// ```
#[derive(Debug)]
pub struct NestedMachine {
    id: HashedId,
    child: Machine,
    restart_pending: bool,
}

impl NestedMachine {
    pub fn new(id: impl Into<HashedId>, child: Machine) -> Self {
        Self {
            id: id.into(),
            child,
            restart_pending: false,
        }
    }

    pub fn builder(id: impl Into<HashedId>) -> NestedMachineBuilder {
        NestedMachineBuilder {
            id: id.into(),
            child: None,
        }
    }

    pub fn child(&self) -> &Machine {
        &self.child
    }

    pub fn child_mut(&mut self) -> &mut Machine {
        &mut self.child
    }

    pub fn into_child(self) -> Machine {
        self.child
    }
}

impl State for NestedMachine {
    fn id(&self) -> &HashedId {
        &self.id
    }

    fn on_activated(&mut self, ctx: &mut StateContext<'_>) {
        trace!(machine = ctx.machine_name(), child = self.child.name(), "activating nested machine");
        self.child.activate();
    }

    fn on_deactivated(&mut self, ctx: &mut StateContext<'_>) {
        trace!(machine = ctx.machine_name(), child = self.child.name(), "deactivating nested machine");
        self.child.deactivate();
        if std::mem::take(&mut self.restart_pending) {
            self.child.restart();
        }
    }

    fn on_update(&mut self, _ctx: &mut StateContext<'_>) {
        self.child.update();
    }

    /// A running child is restarted only after the parent's restart switch
    /// has deactivated this state.
    fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {
        if self.child.is_active() {
            self.restart_pending = true;
        } else {
            self.child.restart();
        }
    }

    fn configure(&self, setup: &StateSetup<'_>) -> Result<(), ConfigError> {
        if setup
            .hierarchy()
            .is_direct_child(self.child.entity(), setup.entity())
        {
            Ok(())
        } else {
            Err(ConfigError::ChildNotContained {
                state: self.id.name.clone(),
                machine: setup.machine_name().to_string(),
                child: self.child.name().to_string(),
            })
        }
    }
}

/// Builder for a [`NestedMachine`] whose child is supplied separately.
#[derive(Debug)]
pub struct NestedMachineBuilder {
    id: HashedId,
    child: Option<Machine>,
}

impl NestedMachineBuilder {
    /// Child machine to run in place of this state (required).
    pub fn child(mut self, child: Machine) -> Self {
        self.child = Some(child);
        self
    }

    pub fn build(self) -> Result<NestedMachine, ConfigError> {
        let child = self.child.ok_or_else(|| ConfigError::MissingChildMachine {
            state: self.id.name.clone(),
        })?;
        Ok(NestedMachine::new(self.id, child))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MachineBuilder;
    use crate::host::{EntityId, SceneTree};
    use crate::machine::RestartPolicy;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    #[derive(Debug)]
    struct Leaf {
        id: HashedId,
        log: Log,
    }

    impl Leaf {
        fn new(name: &str, log: &Log) -> Self {
            Self {
                id: HashedId::new(name),
                log: Rc::clone(log),
            }
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.id.name));
        }
    }

    impl State for Leaf {
        fn id(&self) -> &HashedId {
            &self.id
        }

        fn on_activated(&mut self, _ctx: &mut StateContext<'_>) {
            self.push("on");
        }

        fn on_deactivated(&mut self, _ctx: &mut StateContext<'_>) {
            self.push("off");
        }

        fn on_update(&mut self, ctx: &mut StateContext<'_>) {
            self.push("tick");
            if self.id.name == "Aim" {
                ctx.request_transition_named("Shoot");
            }
        }

        fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {
            self.push("restart");
        }
    }

    struct Fixture {
        scene: SceneTree,
        guard: EntityId,
        combat: EntityId,
        log: Log,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneTree::new();
        let guard = scene.spawn("Guard");
        let combat = scene.spawn_child(guard, "Combat").unwrap();
        Fixture {
            scene,
            guard,
            combat,
            log: Log::default(),
        }
    }

    fn child_machine(f: &Fixture, entity: EntityId, policy: RestartPolicy) -> Machine {
        MachineBuilder::new()
            .entity(entity)
            .default_state_named("Aim")
            .restart_policy(policy)
            .state(Leaf::new("Aim", &f.log))
            .state(Leaf::new("Shoot", &f.log))
            .build(&f.scene)
            .unwrap()
    }

    fn parent_machine(f: &Fixture, child: Machine) -> Machine {
        MachineBuilder::new()
            .entity(f.guard)
            .default_state_named("Patrol")
            .restart_policy(RestartPolicy::Restart)
            .state(Leaf::new("Patrol", &f.log))
            .state(NestedMachine::new("Fight", child))
            .build(&f.scene)
            .unwrap()
    }

    fn fight(parent: &Machine) -> &NestedMachine {
        parent
            .state_as::<NestedMachine>(HashedId::hash_of("Fight"))
            .unwrap()
    }

    #[test]
    fn child_runs_only_while_nested_state_is_active() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Unpause);
        let mut parent = parent_machine(&f, child);

        parent.activate();
        assert!(!fight(&parent).child().is_active());

        assert!(parent.switch_to(HashedId::hash_of("Fight"), false));
        assert!(fight(&parent).child().is_active());
        assert_eq!(
            fight(&parent).child().current_hash(),
            Some(HashedId::hash_of("Aim"))
        );

        assert!(parent.switch_to(HashedId::hash_of("Patrol"), false));
        let child = fight(&parent).child();
        assert!(!child.is_active());
        assert_eq!(child.active_count(), 0);
        assert_eq!(child.current_hash(), Some(HashedId::hash_of("Aim")));
    }

    #[test]
    fn deactivating_nested_state_deactivates_child() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Unpause);
        let mut parent = parent_machine(&f, child);
        parent.activate();
        parent.switch_to(HashedId::hash_of("Fight"), false);
        f.log.borrow_mut().clear();

        parent.deactivate();

        assert_eq!(*f.log.borrow(), vec!["Aim:off".to_string()]);
        assert!(!fight(&parent).child().is_active());
    }

    #[test]
    fn parent_update_reaches_child_states() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Unpause);
        let mut parent = parent_machine(&f, child);
        parent.activate();
        parent.switch_to(HashedId::hash_of("Fight"), false);

        parent.update();

        let child = fight(&parent).child();
        assert_eq!(child.current_hash(), Some(HashedId::hash_of("Shoot")));
        assert_eq!(
            parent.current_hash(),
            Some(HashedId::hash_of("Fight")),
            "child switches stay inside the child machine"
        );
    }

    #[test]
    fn parent_restart_cascades_into_child() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Unpause);
        let mut parent = parent_machine(&f, child);
        parent.activate();
        parent.switch_to(HashedId::hash_of("Fight"), false);
        parent.update();
        f.log.borrow_mut().clear();

        parent.restart();

        let log = f.log.borrow().clone();
        assert!(log.contains(&"Aim:restart".to_string()));
        assert!(log.contains(&"Shoot:restart".to_string()));
        assert_eq!(parent.current_hash(), Some(HashedId::hash_of("Patrol")));

        let child = fight(&parent).child();
        assert!(!child.is_active());
        assert_eq!(child.current_hash(), Some(HashedId::hash_of("Aim")));
    }

    #[test]
    fn restart_reaches_child_once_when_nested_state_is_default() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Restart);
        let mut parent = MachineBuilder::new()
            .entity(f.guard)
            .default_state_named("Fight")
            .restart_policy(RestartPolicy::Restart)
            .state(Leaf::new("Patrol", &f.log))
            .state(NestedMachine::new("Fight", child))
            .build(&f.scene)
            .unwrap();
        parent.activate();
        parent.update();
        f.log.borrow_mut().clear();

        parent.restart();

        let log = f.log.borrow().clone();
        let count = |event: &str| log.iter().filter(|e| e.as_str() == event).count();
        assert_eq!(count("Aim:restart"), 1, "{log:?}");
        assert_eq!(count("Shoot:restart"), 1, "{log:?}");
        assert_eq!(count("Patrol:restart"), 1, "{log:?}");
        assert_eq!(log.last().map(String::as_str), Some("Aim:on"));

        let child = fight(&parent).child();
        assert!(child.is_active());
        assert_eq!(child.current_hash(), Some(HashedId::hash_of("Aim")));
        assert_eq!(child.active_count(), 1);
    }

    #[test]
    fn reactivating_parent_restarts_paused_child_once() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Restart);
        let mut parent = MachineBuilder::new()
            .entity(f.guard)
            .default_state_named("Fight")
            .restart_policy(RestartPolicy::Restart)
            .state(NestedMachine::new("Fight", child))
            .build(&f.scene)
            .unwrap();
        parent.activate();
        parent.deactivate();
        f.log.borrow_mut().clear();

        parent.activate();

        assert_eq!(
            *f.log.borrow(),
            vec![
                "Aim:restart".to_string(),
                "Shoot:restart".to_string(),
                "Aim:on".to_string(),
            ]
        );
    }

    #[test]
    fn restart_of_paused_child_does_not_enable_states() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Unpause);
        let mut parent = parent_machine(&f, child);
        parent.activate();
        parent.switch_to(HashedId::hash_of("Fight"), false);
        parent.update();
        parent.switch_to(HashedId::hash_of("Patrol"), false);

        parent.restart();

        let child = fight(&parent).child();
        assert_eq!(child.active_count(), 0);
        assert_eq!(child.current_hash(), Some(HashedId::hash_of("Aim")));
    }

    #[test]
    fn child_must_be_direct_descendant() {
        let mut f = fixture();
        let stranger = f.scene.spawn("Stranger");
        let child = child_machine(&f, stranger, RestartPolicy::Unpause);

        let result = MachineBuilder::new()
            .entity(f.guard)
            .default_state_named("Fight")
            .state(NestedMachine::new("Fight", child))
            .build(&f.scene);

        assert_eq!(
            result.unwrap_err().errors(),
            &[ConfigError::ChildNotContained {
                state: "Fight".to_string(),
                machine: "Guard".to_string(),
                child: "Stranger".to_string(),
            }]
        );
    }

    #[test]
    fn grandchild_entity_is_not_contained() {
        let mut f = fixture();
        let deep = f.scene.spawn_child(f.combat, "Deep").unwrap();
        let child = child_machine(&f, deep, RestartPolicy::Unpause);

        let result = MachineBuilder::new()
            .entity(f.guard)
            .default_state_named("Fight")
            .state(NestedMachine::new("Fight", child))
            .build(&f.scene);

        assert!(matches!(
            result.unwrap_err().errors(),
            [ConfigError::ChildNotContained { .. }]
        ));
    }

    #[test]
    fn builder_requires_child_machine() {
        let result = NestedMachine::builder("Fight").build();

        assert_eq!(
            result.unwrap_err(),
            ConfigError::MissingChildMachine {
                state: "Fight".to_string()
            }
        );
    }

    #[test]
    fn builder_with_child_builds() {
        let f = fixture();
        let child = child_machine(&f, f.combat, RestartPolicy::Restart);

        let nested = NestedMachine::builder("Fight").child(child).build().unwrap();

        assert_eq!(nested.id().name, "Fight");
        assert_eq!(nested.child().entity(), f.combat);
        assert_eq!(nested.into_child().name(), "Combat");
    }
}
