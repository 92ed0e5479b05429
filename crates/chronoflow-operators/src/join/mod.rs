//! Inner equi-join of two parent streams.
//!
//! Columns shared by both sides but not joined on are suffixed with the
//! side's table name (`_value` becomes `_value_left` / `_value_right`);
//! columns present on one side only keep their label. Output columns and
//! output group keys are sorted by label.

mod merge;

pub use merge::MergeJoin;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use chronoflow_core::config::EngineConfig;
use chronoflow_core::group_key::GroupKey;
use chronoflow_core::types::{ColMeta, Value};

use crate::traits::{OpError, Result};

pub(crate) const OP: &str = "join";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinSpec {
    /// Join columns. Empty means every column both sides share, except the
    /// value column.
    pub on: Vec<String>,
    /// Suffixes for the left and right parent.
    pub table_names: [String; 2],
    pub value_column: String,
}

impl JoinSpec {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            on: Vec::new(),
            table_names: ["left".to_string(), "right".to_string()],
            value_column: cfg.value_column.clone(),
        }
    }

    pub fn on<S: Into<String>>(mut self, on: impl IntoIterator<Item = S>) -> Self {
        self.on = on.into_iter().map(Into::into).collect();
        self
    }

    pub fn named(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.table_names = [left.into(), right.into()];
        self
    }
}

impl Default for JoinSpec {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Output layout, fixed once both sides have shown their columns.
#[derive(Debug, Clone)]
pub(crate) struct JoinSchema {
    pub on: Vec<String>,
    /// Per side, the input column index of each `on` column.
    pub on_idx: [Vec<usize>; 2],
    pub out_cols: Vec<ColMeta>,
    /// Per side, output column of each input column. Right-side join columns
    /// map to `None`; the left side supplies them.
    pub col_map: [Vec<Option<usize>>; 2],
    /// Per side, input label to output label.
    pub labels: [HashMap<String, String>; 2],
}

impl JoinSchema {
    pub fn build(spec: &JoinSpec, left: &[ColMeta], right: &[ColMeta]) -> Result<Self> {
        let shared: Vec<&str> = left
            .iter()
            .filter(|l| right.iter().any(|r| r.label == l.label))
            .map(|c| c.label.as_str())
            .collect();
        let on: Vec<String> = if spec.on.is_empty() {
            shared
                .iter()
                .filter(|l| **l != spec.value_column)
                .map(|l| l.to_string())
                .collect()
        } else {
            spec.on.clone()
        };

        let sides = [left, right];
        let mut on_idx: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        for label in &on {
            let mut types = Vec::with_capacity(2);
            for (s, cols) in sides.iter().enumerate() {
                let j = cols
                    .iter()
                    .position(|c| &c.label == label)
                    .ok_or_else(|| OpError::MissingColumn {
                        op: OP,
                        column: format!("{label} ({})", spec.table_names[s]),
                    })?;
                on_idx[s].push(j);
                types.push(cols[j].col_type);
            }
            if types[0] != types[1] {
                return Err(chronoflow_core::Error::TypeMismatch {
                    label: label.clone(),
                    expected: types[0],
                    actual: types[1],
                }
                .into());
            }
        }

        let mut out_cols: Vec<ColMeta> = Vec::with_capacity(left.len() + right.len());
        let mut labels: [HashMap<String, String>; 2] = [HashMap::new(), HashMap::new()];
        for (s, cols) in sides.iter().enumerate() {
            for c in cols.iter() {
                let renamed = if shared.contains(&c.label.as_str()) && !on.contains(&c.label) {
                    format!("{}_{}", c.label, spec.table_names[s])
                } else {
                    c.label.clone()
                };
                if !out_cols.iter().any(|o| o.label == renamed) {
                    out_cols.push(ColMeta::new(renamed.clone(), c.col_type));
                }
                labels[s].insert(c.label.clone(), renamed);
            }
        }
        out_cols.sort_by(|a, b| a.label.cmp(&b.label));

        let mut col_map: [Vec<Option<usize>>; 2] = [Vec::new(), Vec::new()];
        for (s, cols) in sides.iter().enumerate() {
            for c in cols.iter() {
                let idx = if s == 1 && on.contains(&c.label) {
                    None
                } else {
                    let out = &labels[s][&c.label];
                    out_cols.iter().position(|o| &o.label == out)
                };
                col_map[s].push(idx);
            }
        }

        Ok(Self {
            on,
            on_idx,
            out_cols,
            col_map,
            labels,
        })
    }

    /// Whether two partitions agree on every join column both keys carry.
    pub fn compatible(&self, left: &GroupKey, right: &GroupKey) -> bool {
        self.on
            .iter()
            .all(|label| match (left.label_value(label), right.label_value(label)) {
                (Some(l), Some(r)) => l == r,
                _ => true,
            })
    }

    /// Output key for a pair of partitions: both keys with renamed labels,
    /// first occurrence wins, sorted by label.
    pub fn output_key(&self, left: &GroupKey, right: &GroupKey) -> Result<GroupKey> {
        let mut pairs: Vec<(ColMeta, Value)> = Vec::with_capacity(left.len() + right.len());
        for (s, key) in [left, right].into_iter().enumerate() {
            for (c, v) in key.iter() {
                let label = self.labels[s]
                    .get(&c.label)
                    .cloned()
                    .unwrap_or_else(|| c.label.clone());
                if !pairs.iter().any(|(p, _)| p.label == label) {
                    pairs.push((ColMeta::new(label, c.col_type), v.clone()));
                }
            }
        }
        pairs.sort_by(|a, b| a.0.label.cmp(&b.0.label));
        let (cols, values) = pairs.into_iter().unzip();
        Ok(GroupKey::new(cols, values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronoflow_core::types::ColType;

    fn cols(spec: &[(&str, ColType)]) -> Vec<ColMeta> {
        spec.iter().map(|(l, t)| ColMeta::new(*l, *t)).collect()
    }

    #[test]
    fn shared_columns_are_suffixed_and_sorted() {
        let left = cols(&[("_time", ColType::Time), ("host", ColType::String), ("_value", ColType::Float)]);
        let right = cols(&[("_time", ColType::Time), ("_value", ColType::Int), ("dc", ColType::String)]);
        let schema = JoinSchema::build(&JoinSpec::default().on(["_time"]), &left, &right)
            .expect("schema");
        let labels: Vec<&str> = schema.out_cols.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["_time", "_value_left", "_value_right", "dc", "host"]);
        assert_eq!(schema.col_map[1][0], None);
    }

    #[test]
    fn default_on_skips_the_value_column() {
        let left = cols(&[("_time", ColType::Time), ("_value", ColType::Float)]);
        let right = left.clone();
        let schema = JoinSchema::build(&JoinSpec::default(), &left, &right).expect("schema");
        assert_eq!(schema.on, vec!["_time".to_string()]);
    }

    #[test]
    fn missing_join_column_is_an_error() {
        let left = cols(&[("_time", ColType::Time)]);
        let right = cols(&[("t", ColType::Time)]);
        let err = JoinSchema::build(&JoinSpec::default().on(["_time"]), &left, &right);
        assert!(matches!(err, Err(OpError::MissingColumn { .. })));
    }
}
