//! Group keys: the ordered `(label, value)` pairs that identify a partition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{col_idx, ColMeta, Value};

/// Ordered list of labelled values shared by every row of a table.
///
/// Equality and hashing are structural, so two keys built independently from
/// the same columns and values land in the same partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    cols: Vec<ColMeta>,
    values: Vec<Value>,
}

impl GroupKey {
    pub fn new(cols: Vec<ColMeta>, values: Vec<Value>) -> Result<Self> {
        if cols.len() != values.len() {
            return Err(Error::Schema(format!(
                "group key has {} columns but {} values",
                cols.len(),
                values.len()
            )));
        }
        for (c, v) in cols.iter().zip(&values) {
            if c.col_type != v.col_type() {
                return Err(Error::TypeMismatch {
                    label: c.label.clone(),
                    expected: c.col_type,
                    actual: v.col_type(),
                });
            }
        }
        Ok(Self { cols, values })
    }

    /// Build from `(label, value)` pairs; column types follow the values.
    pub fn from_pairs<L, V>(pairs: impl IntoIterator<Item = (L, V)>) -> Self
    where
        L: Into<String>,
        V: Into<Value>,
    {
        let (cols, values) = pairs
            .into_iter()
            .map(|(l, v)| {
                let v = v.into();
                (ColMeta::new(l, v.col_type()), v)
            })
            .unzip();
        Self { cols, values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    pub fn has_col(&self, label: &str) -> bool {
        self.col_idx(label).is_some()
    }

    pub fn col_idx(&self, label: &str) -> Option<usize> {
        col_idx(label, &self.cols)
    }

    pub fn value(&self, j: usize) -> &Value {
        &self.values[j]
    }

    pub fn label_value(&self, label: &str) -> Option<&Value> {
        self.col_idx(label).map(|j| &self.values[j])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColMeta, &Value)> {
        self.cols.iter().zip(&self.values)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (j, (c, v)) in self.iter().enumerate() {
            if j > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", c.label, v)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColType;
    use std::collections::HashMap;

    #[test]
    fn equal_keys_share_a_partition() {
        let a = GroupKey::from_pairs([("host", "a"), ("region", "west")]);
        let b = GroupKey::new(
            vec![
                ColMeta::new("host", ColType::String),
                ColMeta::new("region", ColType::String),
            ],
            vec!["a".into(), "west".into()],
        )
        .expect("valid key");
        let mut m = HashMap::new();
        m.insert(a, 1);
        assert_eq!(m.get(&b), Some(&1));
    }

    #[test]
    fn renders_labels_in_order() {
        let k = GroupKey::from_pairs([("host", Value::from("a")), ("n", Value::Int(3))]);
        assert_eq!(k.to_string(), "{host=a,n=3}");
        assert_eq!(k.label_value("n"), Some(&Value::Int(3)));
        assert!(!k.has_col("missing"));
    }

    #[test]
    fn rejects_mistyped_values() {
        let err = GroupKey::new(vec![ColMeta::new("n", ColType::Int)], vec!["x".into()]);
        assert!(err.is_err());
    }
}
