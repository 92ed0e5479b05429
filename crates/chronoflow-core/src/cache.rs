//! Group-key-indexed table builders.

use std::collections::{HashMap, HashSet};

use crate::builder::TableBuilder;
use crate::group_key::GroupKey;

/// Builders keyed by output group key, kept in creation order.
///
/// Slots are dense; expiring or releasing a key leaves a hole that `drain`
/// skips. Released keys are remembered until retracted.
#[derive(Debug, Default)]
pub struct TableBuilderCache {
    index: HashMap<GroupKey, usize>,
    slots: Vec<Option<TableBuilder>>,
    released: HashSet<GroupKey>,
}

impl TableBuilderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder for `key`, and whether it was created by this call.
    pub fn table_builder(&mut self, key: &GroupKey) -> (&mut TableBuilder, bool) {
        let existing = match self.index.get(key) {
            Some(&i) if self.slots[i].is_some() => Some(i),
            _ => None,
        };
        let (i, created) = match existing {
            Some(i) => (i, false),
            None => {
                self.index.insert(key.clone(), self.slots.len());
                self.slots.push(None);
                (self.slots.len() - 1, true)
            }
        };
        let b = self.slots[i].get_or_insert_with(|| TableBuilder::new(key.clone()));
        (b, created)
    }

    pub fn get(&self, key: &GroupKey) -> Option<&TableBuilder> {
        self.index
            .get(key)
            .and_then(|&i| self.slots[i].as_ref())
    }

    pub fn contains(&self, key: &GroupKey) -> bool {
        self.get(key).is_some()
    }

    /// Whether the table for `key` already left the cache through [`release`](Self::release).
    pub fn is_released(&self, key: &GroupKey) -> bool {
        self.released.contains(key)
    }

    /// Take every builder whose key satisfies `ready`, in creation order.
    pub fn release(&mut self, mut ready: impl FnMut(&GroupKey) -> bool) -> Vec<TableBuilder> {
        let mut out = Vec::new();
        for slot in &mut self.slots {
            if !slot.as_ref().is_some_and(|b| ready(b.key())) {
                continue;
            }
            if let Some(b) = slot.take() {
                self.index.remove(b.key());
                self.released.insert(b.key().clone());
                out.push(b);
            }
        }
        self.slots.retain(Option::is_some);
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(b) = slot {
                self.index.insert(b.key().clone(), i);
            }
        }
        out
    }

    /// Forget the builder for `key`, and that its table was released.
    /// Returns whether a builder existed.
    pub fn expire_table(&mut self, key: &GroupKey) -> bool {
        self.released.remove(key);
        match self.index.remove(key) {
            Some(i) => self.slots[i].take().is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Remove every builder, in creation order.
    pub fn drain(&mut self) -> Vec<TableBuilder> {
        self.index.clear();
        self.slots.drain(..).flatten().collect()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.released.clear();
    }
}
