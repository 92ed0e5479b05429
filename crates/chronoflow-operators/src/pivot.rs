//! Long-to-wide reshaping.
//!
//! Rows sharing a row identity (the row-key values) collapse into one output
//! row; every distinct column identity (the column-key values joined with
//! `_`) becomes an output column holding the value column. Cells never
//! written keep the type's default, so the result stays rectangular.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use chronoflow_core::builder::add_table_cols;
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::group_key::GroupKey;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::{ColReader, Table};
use chronoflow_core::types::{ColMeta, ColType, Value};

use crate::state::PartitionArena;
use crate::traits::{ensure_open, table_builder, OpError, Result, Transformation};

const OP: &str = "pivot";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotSpec {
    pub row_key: Vec<String>,
    pub column_key: Vec<String>,
    pub value_column: String,
}

impl PivotSpec {
    pub fn from_config<S: Into<String>>(
        row_key: impl IntoIterator<Item = S>,
        column_key: impl IntoIterator<Item = S>,
        cfg: &EngineConfig,
    ) -> Self {
        Self {
            row_key: row_key.into_iter().map(Into::into).collect(),
            column_key: column_key.into_iter().map(Into::into).collect(),
            value_column: cfg.value_column.clone(),
        }
    }

    pub fn new<S: Into<String>>(
        row_key: impl IntoIterator<Item = S>,
        column_key: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::from_config(row_key, column_key, &EngineConfig::default())
    }

    fn validate(&self) -> Result<()> {
        if self.row_key.is_empty() || self.column_key.is_empty() {
            return Err(OpError::Config(
                "pivot needs a non-empty row key and column key".into(),
            ));
        }
        if let Some(c) = self.row_key.iter().find(|c| self.column_key.contains(c)) {
            return Err(OpError::Config(format!(
                "column {c:?} is in both the row key and the column key"
            )));
        }
        if self.row_key.contains(&self.value_column) || self.column_key.contains(&self.value_column)
        {
            return Err(OpError::Config(format!(
                "value column {:?} cannot be part of the row key or column key",
                self.value_column
            )));
        }
        Ok(())
    }
}

/// Input column positions for one table.
struct Layout {
    /// Columns copied onto each new row, with their input index.
    carried: Vec<(ColMeta, usize)>,
    row_idx: Vec<usize>,
    col_idx: Vec<usize>,
    value_idx: usize,
    key: GroupKey,
}

impl Layout {
    fn new(spec: &PivotSpec, table: &Table) -> Result<Self> {
        let missing = |c: &String| OpError::MissingColumn {
            op: OP,
            column: c.clone(),
        };
        for c in spec.row_key.iter().chain(&spec.column_key) {
            table.col_idx(c).ok_or_else(|| missing(c))?;
        }
        let value_idx = table
            .col_idx(&spec.value_column)
            .ok_or_else(|| missing(&spec.value_column))?;

        let in_key = table.key();
        let mut carried = Vec::new();
        let (mut row_idx, mut col_idx) = (Vec::new(), Vec::new());
        let (mut key_cols, mut key_values) = (Vec::new(), Vec::new());
        for (j, c) in table.cols().iter().enumerate() {
            if j == value_idx {
                continue;
            }
            if spec.column_key.contains(&c.label) {
                col_idx.push(j);
                continue;
            }
            let is_row = spec.row_key.contains(&c.label);
            if is_row {
                row_idx.push(j);
            }
            if let Some(v) = in_key.label_value(&c.label) {
                key_cols.push(c.clone());
                key_values.push(v.clone());
                carried.push((c.clone(), j));
            } else if is_row {
                carried.push((c.clone(), j));
            }
        }
        Ok(Self {
            carried,
            row_idx,
            col_idx,
            value_idx,
            key: GroupKey::new(key_cols, key_values)?,
        })
    }
}

/// Identity of row `i` over the columns `idx`, values rendered to text.
fn identity(cr: &ColReader, idx: &[usize], i: usize, sep: &str) -> String {
    idx.iter()
        .map(|&j| cr.value(i, j).to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

#[derive(Debug)]
struct PivotState {
    carried: Vec<ColMeta>,
    value_type: ColType,
    columns: HashMap<String, usize>,
    rows: HashMap<String, usize>,
    next_row: usize,
}

pub struct Pivot {
    spec: PivotSpec,
    dataset: Dataset,
    states: PartitionArena<PivotState>,
}

impl Pivot {
    pub fn new(spec: PivotSpec, dataset: Dataset) -> Result<Self> {
        spec.validate()?;
        Ok(Self {
            spec,
            dataset,
            states: PartitionArena::new(),
        })
    }
}

impl Transformation for Pivot {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let layout = Layout::new(&self.spec, table)?;
        let carried: Vec<ColMeta> = layout.carried.iter().map(|(c, _)| c.clone()).collect();
        let value_type = table.cols()[layout.value_idx].col_type;

        let (_, state, created) = self.states.get_or_insert_with(&layout.key, || PivotState {
            carried: carried.clone(),
            value_type,
            columns: HashMap::new(),
            rows: HashMap::new(),
            next_row: 0,
        });
        let (builder, _) = table_builder(&mut self.dataset, &layout.key, OP)?;
        if created {
            crate::trace::partition_opened(OP, &layout.key);
            add_table_cols(&carried, builder)?;
        } else if state.carried != carried {
            return Err(OpError::Unsupported {
                op: OP,
                detail: format!("tables pivoting into {} disagree on columns", layout.key),
            });
        }

        for cr in table.chunks() {
            for i in 0..cr.len() {
                let row_id = identity(cr, &layout.row_idx, i, "");
                let col_id = identity(cr, &layout.col_idx, i, "_");

                let col = match state.columns.get(&col_id) {
                    Some(&j) => j,
                    None => {
                        let j = builder.add_col(ColMeta::new(col_id.clone(), state.value_type))?;
                        builder.grow(j, state.next_row)?;
                        state.columns.insert(col_id, j);
                        j
                    }
                };

                let row = match state.rows.get(&row_id) {
                    Some(&r) => r,
                    None => {
                        for (out, (_, src)) in layout.carried.iter().enumerate() {
                            builder.append_value(out, cr.value(i, *src))?;
                        }
                        for &j in state.columns.values() {
                            builder.grow(j, 1)?;
                        }
                        let r = state.next_row;
                        state.rows.insert(row_id, r);
                        state.next_row += 1;
                        r
                    }
                };

                let v: Value = cr.value(i, layout.value_idx);
                builder.set_value(row, col, v)?;
            }
        }
        crate::trace::table_processed(OP, &layout.key, table.rows());
        Ok(())
    }

    fn retract_table(&mut self, _id: DatasetId, _key: &GroupKey) -> Result<()> {
        Err(OpError::NotImplemented {
            op: OP,
            what: "retraction",
        })
    }

    fn update_watermark(&mut self, _id: DatasetId, mark: chronoflow_core::time::Time) -> Result<()> {
        Ok(self.dataset.update_watermark(mark)?)
    }

    fn update_processing_time(
        &mut self,
        _id: DatasetId,
        t: chronoflow_core::time::Time,
    ) -> Result<()> {
        Ok(self.dataset.update_processing_time(t)?)
    }

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.states.clear();
        self.dataset.finish(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_keys_are_rejected() {
        let spec = PivotSpec::new(["_time", "host"], ["host"]);
        assert!(matches!(spec.validate(), Err(OpError::Config(_))));
        let spec = PivotSpec::new(["_time"], ["_value"]);
        assert!(matches!(spec.validate(), Err(OpError::Config(_))));
        assert!(PivotSpec::new(["_time"], ["_field"]).validate().is_ok());
    }
}
