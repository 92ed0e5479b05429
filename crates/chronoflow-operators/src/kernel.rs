//! Type-specialized kernels over the closed set of column types.

use std::collections::HashSet;
use std::hash::Hash;

use chronoflow_core::column::{Column, Primitive};
use chronoflow_core::time::Time;
use chronoflow_core::types::{float_bits, ColType};

/// Element types that can be deduplicated.
pub trait SetKey: Primitive {
    type Key: Hash + Eq;
    fn set_key(&self) -> Self::Key;
}

macro_rules! identity_set_key {
    ($($t:ty),*) => {
        $(impl SetKey for $t {
            type Key = $t;
            fn set_key(&self) -> $t {
                self.clone()
            }
        })*
    };
}

identity_set_key!(bool, i64, u64, String, Time);

impl SetKey for f64 {
    type Key = u64;
    fn set_key(&self) -> u64 {
        float_bits(*self)
    }
}

/// Values seen so far for one column type.
#[derive(Debug)]
pub struct TypedSet<T: SetKey> {
    seen: HashSet<T::Key>,
}

impl<T: SetKey> Default for TypedSet<T> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }
}

impl<T: SetKey> TypedSet<T> {
    /// Indices of `vs` whose value had not been seen, recording them.
    pub fn fresh_indices(&mut self, vs: &[T]) -> Vec<usize> {
        vs.iter()
            .enumerate()
            .filter(|(_, v)| self.seen.insert(v.set_key()))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// A [`TypedSet`] for whichever type a column turns out to have.
#[derive(Debug)]
pub enum ValueSet {
    Bool(TypedSet<bool>),
    Int(TypedSet<i64>),
    UInt(TypedSet<u64>),
    Float(TypedSet<f64>),
    String(TypedSet<String>),
    Time(TypedSet<Time>),
}

impl ValueSet {
    pub fn new(col_type: ColType) -> Self {
        match col_type {
            ColType::Bool => ValueSet::Bool(TypedSet::default()),
            ColType::Int => ValueSet::Int(TypedSet::default()),
            ColType::UInt => ValueSet::UInt(TypedSet::default()),
            ColType::Float => ValueSet::Float(TypedSet::default()),
            ColType::String => ValueSet::String(TypedSet::default()),
            ColType::Time => ValueSet::Time(TypedSet::default()),
        }
    }

    /// Rows of `col` holding a value not seen before. `None` when the column
    /// type differs from the set's.
    pub fn fresh_indices(&mut self, col: &Column) -> Option<Vec<usize>> {
        let idx = match (self, col) {
            (ValueSet::Bool(s), Column::Bool(v)) => s.fresh_indices(v),
            (ValueSet::Int(s), Column::Int(v)) => s.fresh_indices(v),
            (ValueSet::UInt(s), Column::UInt(v)) => s.fresh_indices(v),
            (ValueSet::Float(s), Column::Float(v)) => s.fresh_indices(v),
            (ValueSet::String(s), Column::String(v)) => s.fresh_indices(v),
            (ValueSet::Time(s), Column::Time(v)) => s.fresh_indices(v),
            _ => return None,
        };
        Some(idx)
    }
}

/// Difference `cur - prev` of two integers, saturated to the int64 range.
pub fn saturating_diff<T: Into<i128>>(cur: T, prev: T) -> i64 {
    let d = cur.into() - prev.into();
    d.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_indices_span_batches() {
        let mut set = ValueSet::new(ColType::Int);
        let a = set.fresh_indices(&Column::Int(vec![1, 2, 1])).expect("int");
        let b = set.fresh_indices(&Column::Int(vec![2, 3])).expect("int");
        assert_eq!(a, vec![0, 1]);
        assert_eq!(b, vec![1]);
        assert!(set.fresh_indices(&Column::Float(vec![1.0])).is_none());
    }

    #[test]
    fn diff_saturates() {
        assert_eq!(saturating_diff(u64::MAX, 0), i64::MAX);
        assert_eq!(saturating_diff(0u64, u64::MAX), i64::MIN);
        assert_eq!(saturating_diff(3u64, 5), -2);
        assert_eq!(saturating_diff(i64::MIN, 1), i64::MIN);
    }
}
