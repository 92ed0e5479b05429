//! Distinct values of one column, one output row per value.

use serde::{Deserialize, Serialize};

use chronoflow_core::builder::add_table_key_cols;
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::types::{ColMeta, ColType, Value};

use crate::kernel::ValueSet;
use crate::state::PartitionArena;
use crate::traits::{ensure_open, forward_single_parent, fresh_builder, Result, Transformation};

const OP: &str = "distinct";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistinctSpec {
    /// Column whose distinct values are reported.
    pub column: String,
    /// Label of the output value column.
    pub output_column: String,
}

impl DistinctSpec {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            column: cfg.value_column.clone(),
            output_column: cfg.value_column.clone(),
        }
    }
}

impl Default for DistinctSpec {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Output: the partition's key columns followed by the value column.
///
/// A table without the column yields a single empty-string row; a column
/// that is part of the group key yields its key value once.
pub struct Distinct {
    spec: DistinctSpec,
    dataset: Dataset,
    seen: PartitionArena<ValueSet>,
}

impl Distinct {
    pub fn new(spec: DistinctSpec, dataset: Dataset) -> Self {
        Self {
            spec,
            dataset,
            seen: PartitionArena::new(),
        }
    }
}

impl Transformation for Distinct {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let key = table.key();
        let builder = fresh_builder(&mut self.dataset, key, OP)?;
        add_table_key_cols(key, builder)?;

        let Some(col_idx) = table.col_idx(&self.spec.column) else {
            crate::trace::fallback(OP, "column missing, emitting empty value");
            let out = builder.add_col(ColMeta::new(self.spec.output_column.clone(), ColType::String))?;
            builder.append_value(out, Value::String(String::new()))?;
            builder.append_key_values()?;
            return Ok(());
        };

        let col_type = table.cols()[col_idx].col_type;
        let out = builder.add_col(ColMeta::new(self.spec.output_column.clone(), col_type))?;

        if let Some(v) = key.label_value(&self.spec.column) {
            builder.append_value(out, v.clone())?;
            builder.append_key_values()?;
            return Ok(());
        }

        let (_, seen, _) = self.seen.get_or_insert_with(key, || ValueSet::new(col_type));
        crate::trace::partition_opened(OP, key);
        for cr in table.chunks() {
            let col = cr.column(col_idx);
            let fresh = seen.fresh_indices(col).ok_or_else(|| {
                chronoflow_core::Error::TypeMismatch {
                    label: self.spec.column.clone(),
                    expected: col_type,
                    actual: col.col_type(),
                }
            })?;
            for i in fresh {
                builder.append_value(out, col.value(i))?;
                builder.append_key_values()?;
            }
        }
        crate::trace::table_processed(OP, key, table.rows());
        Ok(())
    }

    forward_single_parent!();

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.seen.clear();
        self.dataset.finish(err);
    }
}
