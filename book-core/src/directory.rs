//! The order directory (component D): order-id → slab handle.
//!
//! Exists exactly the records present in the price-level index; a record
//! is inserted here on successful book insertion and removed on
//! cancellation, full fill, or `clear`. Collisions are not allowed —
//! `order_id` uniqueness is a system-wide invariant enforced by the
//! façade's monotonic id counter.

use crate::slab::Handle;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

#[derive(Default)]
pub struct OrderDirectory {
    by_id: HashMap<u64, Handle>,
}

impl OrderDirectory {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
        }
    }

    /// Returns `false` (and leaves the directory unchanged) if `order_id`
    /// is already resident.
    #[must_use]
    pub fn insert(&mut self, order_id: u64, handle: Handle) -> bool {
        match self.by_id.entry(order_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    pub fn get(&self, order_id: u64) -> Option<Handle> {
        self.by_id.get(&order_id).copied()
    }

    pub fn remove(&mut self, order_id: u64) -> Option<Handle> {
        self.by_id.remove(&order_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }
}
