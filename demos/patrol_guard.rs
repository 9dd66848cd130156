//! A guard that patrols until it spots an intruder, then fights with a nested
//! combat machine until the intruder is gone.
//!
//! Run with `RUST_LOG=statetree=debug cargo run --example patrol_guard` to see
//! every switch.
//!
//! Walkthroughs live in `demos/` and are registered as Cargo examples by
//! `[[example]]` entries in `Cargo.toml`, so `cargo run --example` still works.

use statetree::core::{HashedId, State, StateContext};
use statetree::diagnostics::TracingSink;
use statetree::host::SceneTree;
use statetree::{MachineBuilder, NestedMachine, RestartPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Patrol {
    id: HashedId,
    steps: u32,
}

impl State for Patrol {
    fn id(&self) -> &HashedId {
        &self.id
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>) {
        self.steps += 1;
        println!("  patrol step {}", self.steps);
        if self.steps % 3 == 0 {
            println!("  intruder spotted");
            ctx.request_transition_named("Fight");
        }
    }

    fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {
        self.steps = 0;
    }
}

#[derive(Debug)]
struct Aim {
    id: HashedId,
}

impl State for Aim {
    fn id(&self) -> &HashedId {
        &self.id
    }

    fn on_activated(&mut self, _ctx: &mut StateContext<'_>) {
        println!("  taking aim");
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>) {
        ctx.request_transition_named("Shoot");
    }

    fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {}
}

#[derive(Debug)]
struct Shoot {
    id: HashedId,
    shots: u32,
}

impl State for Shoot {
    fn id(&self) -> &HashedId {
        &self.id
    }

    fn on_update(&mut self, ctx: &mut StateContext<'_>) {
        self.shots += 1;
        println!("  shot {}", self.shots);
        ctx.request_transition_named("Aim");
    }

    fn on_restarted(&mut self, _ctx: &mut StateContext<'_>) {
        self.shots = 0;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut scene = SceneTree::new();
    let guard = scene.spawn("Guard");
    let combat = scene.spawn_child(guard, "Combat")?;

    let combat_machine = MachineBuilder::new()
        .entity(combat)
        .default_state_named("Aim")
        .restart_policy(RestartPolicy::Unpause)
        .diagnostics(TracingSink)
        .state(Aim {
            id: HashedId::new("Aim"),
        })
        .state(Shoot {
            id: HashedId::new("Shoot"),
            shots: 0,
        })
        .build(&scene)?;

    let mut guard_machine = MachineBuilder::new()
        .entity(guard)
        .default_state_named("Patrol")
        .restart_policy(RestartPolicy::Restart)
        .diagnostics(TracingSink)
        .state(Patrol {
            id: HashedId::new("Patrol"),
            steps: 0,
        })
        .state(NestedMachine::new("Fight", combat_machine))
        .build(&scene)?;

    println!("guard enabled");
    guard_machine.activate();

    for frame in 1..=6 {
        println!("frame {frame}: {}", current_path(&guard_machine));
        guard_machine.update();
    }

    println!("intruder gone");
    guard_machine.switch_to(HashedId::hash_of("Patrol"), false);

    println!("guard disabled and re-enabled");
    guard_machine.deactivate();
    guard_machine.activate();
    println!("now: {}", current_path(&guard_machine));

    println!("history:");
    for record in guard_machine.history().records() {
        let from = record
            .from
            .as_ref()
            .map_or("-", |id| id.name.as_str());
        println!("  {from} -> {} ({:?})", record.to.name, record.cause);
    }

    Ok(())
}

fn current_path(machine: &statetree::Machine) -> String {
    let Some(id) = machine.current_id() else {
        return "<not started>".to_string();
    };
    match machine.state_as::<NestedMachine>(id.hash) {
        Some(nested) => match nested.child().current_id() {
            Some(child) => format!("{} / {}", id.name, child.name),
            None => id.name.clone(),
        },
        None => id.name.clone(),
    }
}
