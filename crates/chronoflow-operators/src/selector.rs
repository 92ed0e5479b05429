//! Row selectors: one full row per table, chosen by the value column.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use chronoflow_core::builder::add_table_cols;
use chronoflow_core::column::Column;
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::types::{ColType, Value};

use crate::traits::{
    ensure_open, forward_single_parent, fresh_builder, OpError, Result, Transformation,
};

const OP: &str = "selector";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    /// Smallest value; the earliest row wins ties.
    Min,
    /// Largest value; the earliest row wins ties.
    Max,
    /// Last row of the table.
    Last,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub kind: SelectorKind,
    pub column: String,
}

impl SelectorSpec {
    pub fn from_config(kind: SelectorKind, cfg: &EngineConfig) -> Self {
        Self {
            kind,
            column: cfg.value_column.clone(),
        }
    }

    pub fn new(kind: SelectorKind) -> Self {
        Self::from_config(kind, &EngineConfig::default())
    }
}

/// Index of the last value in `vs` that beats `best` (and every value before
/// it) in direction `want`, updating `best`.
fn select_extremum<T: PartialOrd + Copy>(
    best: &mut Option<T>,
    vs: &[T],
    want: Ordering,
) -> Option<usize> {
    let mut idx = None;
    for (i, &v) in vs.iter().enumerate() {
        let better = match *best {
            None => true,
            Some(b) => v.partial_cmp(&b) == Some(want),
        };
        if better {
            *best = Some(v);
            idx = Some(i);
        }
    }
    idx
}

/// Per-table selector state, specialized on the value column's type.
#[derive(Debug)]
enum RowSelector {
    Int(Option<i64>, Ordering),
    UInt(Option<u64>, Ordering),
    Float(Option<f64>, Ordering),
    Last,
}

impl RowSelector {
    /// `None` when `kind` has no implementation for `col_type`.
    fn new(kind: SelectorKind, col_type: ColType) -> Option<Self> {
        let want = match kind {
            SelectorKind::Last => return Some(RowSelector::Last),
            SelectorKind::Min => Ordering::Less,
            SelectorKind::Max => Ordering::Greater,
        };
        match col_type {
            ColType::Int => Some(RowSelector::Int(None, want)),
            ColType::UInt => Some(RowSelector::UInt(None, want)),
            ColType::Float => Some(RowSelector::Float(None, want)),
            _ => None,
        }
    }

    /// Row of `col` that replaces the current selection, if any.
    fn select(&mut self, col: &Column) -> Option<usize> {
        match (self, col) {
            (RowSelector::Int(best, want), Column::Int(vs)) => select_extremum(best, vs, *want),
            (RowSelector::UInt(best, want), Column::UInt(vs)) => select_extremum(best, vs, *want),
            (RowSelector::Float(best, want), Column::Float(vs)) => {
                select_extremum(best, vs, *want)
            }
            (RowSelector::Last, col) => col.len().checked_sub(1),
            _ => None,
        }
    }
}

pub struct Selector {
    spec: SelectorSpec,
    dataset: Dataset,
}

impl Selector {
    pub fn new(spec: SelectorSpec, dataset: Dataset) -> Self {
        Self { spec, dataset }
    }
}

impl Transformation for Selector {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let builder = fresh_builder(&mut self.dataset, table.key(), OP)?;
        add_table_cols(table.cols(), builder)?;
        let value_idx = table
            .col_idx(&self.spec.column)
            .ok_or_else(|| OpError::MissingColumn {
                op: OP,
                column: self.spec.column.clone(),
            })?;
        let col_type = table.cols()[value_idx].col_type;
        let mut selector =
            RowSelector::new(self.spec.kind, col_type).ok_or_else(|| OpError::Unsupported {
                op: OP,
                detail: format!("{:?} has no implementation for type {col_type}", self.spec.kind),
            })?;

        let mut row: Option<Vec<Value>> = None;
        for cr in table.chunks() {
            if let Some(i) = selector.select(cr.column(value_idx)) {
                row = Some(cr.row(i));
            }
        }
        if let Some(row) = row {
            for (j, v) in row.into_iter().enumerate() {
                builder.append_value(j, v)?;
            }
        }
        crate::trace::table_processed(OP, table.key(), table.rows());
        Ok(())
    }

    forward_single_parent!();

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.dataset.finish(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earliest_extremum_wins() {
        let mut best = None;
        assert_eq!(select_extremum(&mut best, &[3i64, 7, 7], Ordering::Greater), Some(1));
        assert_eq!(select_extremum(&mut best, &[7i64, 1], Ordering::Greater), None);
        assert_eq!(best, Some(7));
    }

    #[test]
    fn strings_have_no_min() {
        assert!(RowSelector::new(SelectorKind::Min, ColType::String).is_none());
        assert!(RowSelector::new(SelectorKind::Last, ColType::String).is_some());
    }
}
