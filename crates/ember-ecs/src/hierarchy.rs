//! Transform parent/child policy.
//!
//! The relation lives inside [`Transform`] as ids, never pointers. Every
//! mutation goes through these methods so the parent's child list and the
//! child's back-reference stay mutually consistent, and destruction can
//! never leave a dangling reference: children of a destroyed entity are
//! detached to `EntityId::INVALID`.

use ember_core::{EntityId, Transform};
use tracing::warn;

use crate::component::ComponentManager;

impl ComponentManager {
    /// Set (or clear, with `EntityId::INVALID`) the parent of `child`.
    ///
    /// Both entities must carry a [`Transform`]. Reparenting an already
    /// parented child detaches it from the old parent first. Returns
    /// `false` without mutating anything if the relation is impossible
    /// (missing transform, self-parenting, or a would-be cycle).
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> bool {
        if !self.has::<Transform>(child) {
            return false;
        }
        if parent.is_valid() {
            if parent == child || !self.has::<Transform>(parent) {
                return false;
            }
            if self.is_descendant_of(parent, child) {
                warn!(%child, %parent, "rejected reparent that would create a cycle");
                return false;
            }
        }

        self.detach_from_parent(child);

        if let Some(transform) = self.get_mut::<Transform>(child) {
            transform.parent = parent;
        }
        if parent.is_valid() {
            if let Some(transform) = self.get_mut::<Transform>(parent) {
                if !transform.children.contains(&child) {
                    transform.children.push(child);
                }
            }
        }
        true
    }

    /// Attach `child` under `parent`. Equivalent to `set_parent`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        self.set_parent(child, parent)
    }

    /// Detach `child` from `parent`. Returns `false` if `child` is not
    /// currently parented to `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        match self.get::<Transform>(child) {
            Some(transform) if transform.parent == parent => {
                self.detach_from_parent(child);
                true
            }
            _ => false,
        }
    }

    /// Detach both sides of the hierarchy relation for a dying entity:
    /// leave the parent's child list, and reparent children to the invalid
    /// id (documented detach-to-null policy).
    pub(crate) fn detach_hierarchy(&mut self, entity: EntityId) {
        let Some(transform) = self.get::<Transform>(entity) else {
            return;
        };
        let children = transform.children.clone();

        self.detach_from_parent(entity);
        for child in children {
            if let Some(child_transform) = self.get_mut::<Transform>(child) {
                child_transform.parent = EntityId::INVALID;
            }
        }
        if let Some(transform) = self.get_mut::<Transform>(entity) {
            transform.children.clear();
        }
    }

    fn detach_from_parent(&mut self, child: EntityId) {
        let Some(parent) = self.get::<Transform>(child).map(|t| t.parent) else {
            return;
        };
        if !parent.is_valid() {
            return;
        }
        if let Some(parent_transform) = self.get_mut::<Transform>(parent) {
            parent_transform.children.retain(|&c| c != child);
        }
        if let Some(child_transform) = self.get_mut::<Transform>(child) {
            child_transform.parent = EntityId::INVALID;
        }
    }

    /// Whether `candidate` sits anywhere below `ancestor` in the tree.
    fn is_descendant_of(&self, candidate: EntityId, ancestor: EntityId) -> bool {
        let mut current = candidate;
        while current.is_valid() {
            if current == ancestor {
                return true;
            }
            current = match self.get::<Transform>(current) {
                Some(transform) => transform.parent,
                None => EntityId::INVALID,
            };
        }
        false
    }
}
