//! Arena-backed scene tree.

use super::{EntityId, Hierarchy, HostError};

#[derive(Clone, Debug)]
struct Node {
    name: String,
    parent: Option<EntityId>,
}

/// Minimal host scene: named entities arranged in a forest.
///
/// # Example
///
/// ```rust
/// use statetree::host::{Hierarchy, SceneTree};
///
/// let mut scene = SceneTree::new();
/// let guard = scene.spawn("Guard");
/// let legs = scene.spawn_child(guard, "Legs").unwrap();
///
/// assert!(scene.is_direct_child(legs, guard));
/// assert!(!scene.is_direct_child(guard, legs));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SceneTree {
    nodes: Vec<Node>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root entity.
    pub fn spawn(&mut self, name: impl Into<String>) -> EntityId {
        self.push(name.into(), None)
    }

    /// Add an entity directly under `parent`.
    pub fn spawn_child(
        &mut self,
        parent: EntityId,
        name: impl Into<String>,
    ) -> Result<EntityId, HostError> {
        self.node(parent)?;
        Ok(self.push(name.into(), Some(parent)))
    }

    /// Move `entity` under `parent`, or make it a root when `parent` is `None`.
    pub fn reparent(&mut self, entity: EntityId, parent: Option<EntityId>) -> Result<(), HostError> {
        self.node(entity)?;
        if let Some(parent) = parent {
            self.node(parent)?;
            if self.ancestors_inclusive(parent).any(|e| e == entity) {
                return Err(HostError::Cycle { entity, parent });
            }
        }
        self.nodes[entity.raw() as usize].parent = parent;
        Ok(())
    }

    pub fn children_of(&self, entity: EntityId) -> Vec<EntityId> {
        self.ids()
            .filter(|&id| self.parent_of(id) == Some(entity))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, name: String, parent: Option<EntityId>) -> EntityId {
        let id = EntityId::new(self.nodes.len() as u32);
        self.nodes.push(Node { name, parent });
        id
    }

    fn node(&self, entity: EntityId) -> Result<&Node, HostError> {
        self.nodes
            .get(entity.raw() as usize)
            .ok_or(HostError::UnknownEntity(entity))
    }

    fn ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.nodes.len() as u32).map(EntityId::new)
    }

    fn ancestors_inclusive(&self, entity: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        std::iter::successors(Some(entity), move |&e| self.parent_of(e))
    }
}

impl Hierarchy for SceneTree {
    fn parent_of(&self, entity: EntityId) -> Option<EntityId> {
        self.nodes.get(entity.raw() as usize).and_then(|n| n.parent)
    }

    fn name_of(&self, entity: EntityId) -> Option<&str> {
        self.nodes.get(entity.raw() as usize).map(|n| n.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_entities_are_named_roots() {
        let mut scene = SceneTree::new();
        let root = scene.spawn("Root");

        assert_eq!(scene.name_of(root), Some("Root"));
        assert_eq!(scene.parent_of(root), None);
        assert!(scene.contains(root));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn direct_child_is_only_one_level_deep() {
        let mut scene = SceneTree::new();
        let root = scene.spawn("Root");
        let child = scene.spawn_child(root, "Child").unwrap();
        let grandchild = scene.spawn_child(child, "Grandchild").unwrap();

        assert!(scene.is_direct_child(child, root));
        assert!(scene.is_direct_child(grandchild, child));
        assert!(!scene.is_direct_child(grandchild, root));
        assert_eq!(scene.children_of(root), vec![child]);
    }

    #[test]
    fn spawn_child_rejects_unknown_parent() {
        let mut scene = SceneTree::new();
        let result = scene.spawn_child(EntityId::new(9), "Orphan");

        assert_eq!(result, Err(HostError::UnknownEntity(EntityId::new(9))));
        assert!(scene.is_empty());
    }

    #[test]
    fn reparent_moves_entity() {
        let mut scene = SceneTree::new();
        let a = scene.spawn("A");
        let b = scene.spawn("B");
        let c = scene.spawn_child(a, "C").unwrap();

        scene.reparent(c, Some(b)).unwrap();
        assert!(scene.is_direct_child(c, b));

        scene.reparent(c, None).unwrap();
        assert_eq!(scene.parent_of(c), None);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut scene = SceneTree::new();
        let a = scene.spawn("A");
        let b = scene.spawn_child(a, "B").unwrap();

        assert_eq!(
            scene.reparent(a, Some(b)),
            Err(HostError::Cycle {
                entity: a,
                parent: b
            })
        );
        assert_eq!(
            scene.reparent(a, Some(a)),
            Err(HostError::Cycle {
                entity: a,
                parent: a
            })
        );
    }
}
