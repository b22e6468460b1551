use std::collections::HashMap;

use crate::runtime::InstanceId;

/// An epoch-tagged pin on a managed object.
///
/// The zero handle is the sentinel for "no managed counterpart". A handle
/// resolves only while its epoch matches the table's current epoch, so a
/// reload (which bumps the epoch) invalidates every outstanding handle in
/// one step. Stale handles are harmless: resolution returns `None` and the
/// caller no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GcHandle {
    slot: u32,
    epoch: u32,
}

impl GcHandle {
    /// The sentinel handle: no managed counterpart.
    pub const INVALID: GcHandle = GcHandle { slot: 0, epoch: 0 };

    pub fn is_valid(&self) -> bool {
        *self != GcHandle::INVALID
    }
}

impl Default for GcHandle {
    fn default() -> Self {
        GcHandle::INVALID
    }
}

/// Maps live handles to runtime instances. Owned by the `ScriptEngine`.
pub struct HandleTable {
    epoch: u32,
    next_slot: u32,
    instances: HashMap<u32, InstanceId>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            epoch: 1,
            next_slot: 1,
            instances: HashMap::new(),
        }
    }

    /// Pin a managed instance, returning a handle valid for the current
    /// epoch.
    pub fn pin(&mut self, instance: InstanceId) -> GcHandle {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.instances.insert(slot, instance);
        GcHandle {
            slot,
            epoch: self.epoch,
        }
    }

    /// Resolve a handle to its instance. `None` for the sentinel, stale
    /// epochs, and released slots.
    pub fn resolve(&self, handle: GcHandle) -> Option<InstanceId> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.instances.get(&handle.slot).copied()
    }

    /// Release one handle, returning the instance it pinned (if live).
    pub fn release(&mut self, handle: GcHandle) -> Option<InstanceId> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.instances.remove(&handle.slot)
    }

    /// Release every handle at once by advancing the epoch. Returns the
    /// instances that were pinned so the runtime can drop them.
    pub fn invalidate_all(&mut self) -> Vec<InstanceId> {
        self.epoch += 1;
        self.instances.drain().map(|(_, id)| id).collect()
    }

    /// Number of live pins.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Current epoch (advances once per reload).
    pub fn epoch(&self) -> u32 {
        self.epoch
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridge state attached to every script-backed system and component: the
/// per-frame-callback flag, the pinned handle, and the managed type name.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedData {
    /// Whether per-frame managed callbacks should fire.
    pub callbacks_enabled: bool,
    /// Pin on the managed counterpart; `GcHandle::INVALID` means none.
    pub handle: GcHandle,
    /// Managed type backing this object.
    pub class: String,
}

impl ManagedData {
    /// Bridge state for the given class, unbound until first use.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            callbacks_enabled: true,
            handle: GcHandle::INVALID,
            class: class.into(),
        }
    }

    /// Whether a managed counterpart is (possibly) bound. Stale handles
    /// still resolve to nothing; this only filters the obvious sentinel.
    pub fn is_bound(&self) -> bool {
        self.handle.is_valid()
    }

    /// Drop the managed reference ahead of a reload.
    pub fn detach(&mut self) {
        self.handle = GcHandle::INVALID;
    }
}

impl Default for ManagedData {
    fn default() -> Self {
        Self {
            callbacks_enabled: false,
            handle: GcHandle::INVALID,
            class: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_never_resolves() {
        let table = HandleTable::new();
        assert_eq!(table.resolve(GcHandle::INVALID), None);
        assert!(!GcHandle::INVALID.is_valid());
    }

    #[test]
    fn pin_resolve_release() {
        let mut table = HandleTable::new();
        let handle = table.pin(InstanceId(42));
        assert!(handle.is_valid());
        assert_eq!(table.resolve(handle), Some(InstanceId(42)));
        assert_eq!(table.release(handle), Some(InstanceId(42)));
        assert_eq!(table.resolve(handle), None);
    }

    #[test]
    fn epoch_bump_invalidates_everything() {
        let mut table = HandleTable::new();
        let a = table.pin(InstanceId(1));
        let b = table.pin(InstanceId(2));

        let released = table.invalidate_all();
        assert_eq!(released.len(), 2);
        assert_eq!(table.resolve(a), None);
        assert_eq!(table.resolve(b), None);
        assert_eq!(table.release(a), None);
    }

    #[test]
    fn new_epoch_handles_differ_from_old() {
        let mut table = HandleTable::new();
        let before = table.pin(InstanceId(1));
        table.invalidate_all();
        let after = table.pin(InstanceId(1));
        assert_ne!(before, after);
        assert_eq!(table.resolve(after), Some(InstanceId(1)));
    }

    #[test]
    fn managed_data_defaults_to_no_counterpart() {
        let data = ManagedData::default();
        assert!(!data.is_bound());
        assert!(!data.callbacks_enabled);

        let mut named = ManagedData::new("Game.Player");
        assert!(named.callbacks_enabled);
        assert!(!named.is_bound());
        named.detach();
        assert!(!named.is_bound());
    }
}
