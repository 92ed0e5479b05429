//! Rows whose value in one column has not been seen before.

use serde::{Deserialize, Serialize};

use chronoflow_core::builder::{add_table_cols, append_record};
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;

use crate::kernel::ValueSet;
use crate::state::PartitionArena;
use crate::traits::{
    ensure_open, forward_single_parent, fresh_builder, OpError, Result, Transformation,
};

const OP: &str = "unique";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniqueSpec {
    pub column: String,
}

impl UniqueSpec {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            column: cfg.value_column.clone(),
        }
    }
}

impl Default for UniqueSpec {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

pub struct Unique {
    spec: UniqueSpec,
    dataset: Dataset,
    seen: PartitionArena<ValueSet>,
}

impl Unique {
    pub fn new(spec: UniqueSpec, dataset: Dataset) -> Self {
        Self {
            spec,
            dataset,
            seen: PartitionArena::new(),
        }
    }
}

impl Transformation for Unique {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let col_idx = table
            .col_idx(&self.spec.column)
            .ok_or_else(|| OpError::MissingColumn {
                op: OP,
                column: self.spec.column.clone(),
            })?;
        let builder = fresh_builder(&mut self.dataset, table.key(), OP)?;
        add_table_cols(table.cols(), builder)?;

        let col_type = table.cols()[col_idx].col_type;
        let (_, seen, _) = self
            .seen
            .get_or_insert_with(table.key(), || ValueSet::new(col_type));
        crate::trace::partition_opened(OP, table.key());
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
                append_record(i, cr, builder)?;
            }
        }
        crate::trace::table_processed(OP, table.key(), table.rows());
        Ok(())
    }

    forward_single_parent!();

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.seen.clear();
        self.dataset.finish(err);
    }
}
