//! Dense per-partition state.

use std::collections::HashMap;

use chronoflow_core::group_key::GroupKey;

/// Partition states stored contiguously and addressed by group key.
///
/// Indices stay valid until [`PartitionArena::clear`], so operators may keep
/// them in side tables (e.g. memoized pairings).
#[derive(Debug)]
pub struct PartitionArena<S> {
    index: HashMap<GroupKey, usize>,
    slots: Vec<S>,
}

impl<S> Default for PartitionArena<S> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            slots: Vec::new(),
        }
    }
}

impl<S> PartitionArena<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index_of(&self, key: &GroupKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Index and state for `key`, creating the state with `init` if absent.
    /// The flag reports whether it was created.
    pub fn get_or_insert_with(
        &mut self,
        key: &GroupKey,
        init: impl FnOnce() -> S,
    ) -> (usize, &mut S, bool) {
        let (i, created) = match self.index.get(key) {
            Some(&i) => (i, false),
            None => {
                self.slots.push(init());
                let i = self.slots.len() - 1;
                self.index.insert(key.clone(), i);
                (i, true)
            }
        };
        (i, &mut self.slots[i], created)
    }

    /// Same as [`get_or_insert_with`](Self::get_or_insert_with) for fallible init.
    pub fn try_get_or_insert_with<E>(
        &mut self,
        key: &GroupKey,
        init: impl FnOnce() -> Result<S, E>,
    ) -> Result<(usize, &mut S, bool), E> {
        let (i, created) = match self.index.get(key) {
            Some(&i) => (i, false),
            None => {
                self.slots.push(init()?);
                let i = self.slots.len() - 1;
                self.index.insert(key.clone(), i);
                (i, true)
            }
        };
        Ok((i, &mut self.slots[i], created))
    }

    pub fn get(&self, i: usize) -> Option<&S> {
        self.slots.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut S> {
        self.slots.get_mut(i)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &S)> {
        self.slots.iter().enumerate()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_addressed_by_key() {
        let mut arena: PartitionArena<u32> = PartitionArena::new();
        let a = GroupKey::from_pairs([("host", "a")]);
        let b = GroupKey::from_pairs([("host", "b")]);
        let (ia, s, created) = arena.get_or_insert_with(&a, || 1);
        *s += 1;
        assert!(created);
        let (ib, _, _) = arena.get_or_insert_with(&b, || 10);
        let (ia2, s, created) = arena.get_or_insert_with(&a, || 100);
        assert!(!created);
        assert_eq!((ia, ia2, *s), (0, 0, 2));
        assert_eq!(ib, 1);
        assert_eq!(arena.index_of(&b).and_then(|i| arena.get(i)), Some(&10));
        arena.clear();
        assert!(arena.is_empty());
    }
}
