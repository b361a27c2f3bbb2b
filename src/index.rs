use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A stable handle to a group that survives the removal of other groups
#[derive(
    Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GroupKey(u64);

/// Maps stable group keys to their current slot in a packed collection.
///
/// Slots follow swap-removal: removing slot `i` moves the key in the last
/// slot into slot `i`.
#[derive(Clone, Debug, Default)]
pub(crate) struct GroupIndex {
    next_key: u64,
    keys: Vec<GroupKey>,
    slots: HashMap<GroupKey, usize>,
}

impl GroupIndex {
    /// Append a new key in the next slot
    pub(crate) fn push(&mut self) -> GroupKey {
        let key = GroupKey(self.next_key);
        self.next_key += 1;
        self.slots.insert(key, self.keys.len());
        self.keys.push(key);
        key
    }

    /// Remove the key in `slot`, moving the last key into its place. Returns
    /// the removed key.
    pub(crate) fn swap_remove(&mut self, slot: usize) -> GroupKey {
        let key = self.keys.swap_remove(slot);
        self.slots.remove(&key);
        if let Some(moved) = self.keys.get(slot) {
            self.slots.insert(*moved, slot);
        }
        key
    }

    pub(crate) fn slot(&self, key: GroupKey) -> Option<usize> {
        self.slots.get(&key).copied()
    }

    pub(crate) fn key(&self, slot: usize) -> Option<GroupKey> {
        self.keys.get(slot).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}
