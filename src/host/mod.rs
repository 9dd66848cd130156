//! The host entity model the runtime is driven by.
//!
//! Machines are attached to entities of a host scene. The runtime only needs
//! to ask the host about structure (who is whose parent); lifecycle callbacks
//! are delivered by the host calling [`Machine::activate`](crate::Machine::activate),
//! [`Machine::deactivate`](crate::Machine::deactivate) and
//! [`Machine::update`](crate::Machine::update).

mod scene;

pub use scene::SceneTree;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Handle to an entity of the host scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Structural queries the runtime needs from the host scene.
pub trait Hierarchy {
    /// Parent of `entity`, or `None` for roots and unknown entities.
    fn parent_of(&self, entity: EntityId) -> Option<EntityId>;

    /// Display name of `entity`, or `None` if the host does not know it.
    fn name_of(&self, entity: EntityId) -> Option<&str>;

    fn contains(&self, entity: EntityId) -> bool {
        self.name_of(entity).is_some()
    }

    /// Whether `child` sits directly under `parent`.
    fn is_direct_child(&self, child: EntityId, parent: EntityId) -> bool {
        self.parent_of(child) == Some(parent)
    }
}

/// Errors raised by scene edits.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("Entity {0} does not exist in this scene")]
    UnknownEntity(EntityId),

    #[error("Cannot parent {entity} under {parent}: {parent} is {entity} or one of its descendants")]
    Cycle { entity: EntityId, parent: EntityId },
}
