//! Column-list transforms: rename, drop/keep and duplicate.
//!
//! A [`SchemaMutation`] runs its mutators over a [`BuilderContext`] once per
//! input table, then copies every row through the resulting column mapping.

mod context;
mod mutators;

pub use context::BuilderContext;
pub use mutators::{DropKeep, Duplicate, LabelFn, LabelPredicate, Rename};

use chronoflow_core::builder::{add_table_cols, append_mapped_record_with_defaults};
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;

use crate::traits::{ensure_open, forward_single_parent, table_builder, Result, Transformation};

const OP: &str = "schema";

/// One step of a schema mutation pipeline.
pub trait SchemaMutator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Context after this step. Referenced columns must exist in `ctx`.
    fn mutate(&self, ctx: BuilderContext) -> Result<BuilderContext>;
}

pub struct SchemaMutation {
    mutators: Vec<Box<dyn SchemaMutator>>,
    dataset: Dataset,
}

impl SchemaMutation {
    pub fn new(mutators: Vec<Box<dyn SchemaMutator>>, dataset: Dataset) -> Self {
        Self { mutators, dataset }
    }

    /// Run every mutator over `table`'s layout.
    pub fn context(&self, table: &Table) -> Result<BuilderContext> {
        self.mutators
            .iter()
            .try_fold(BuilderContext::new(table), |ctx, m| m.mutate(ctx))
    }
}

impl Transformation for SchemaMutation {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let ctx = self.context(table)?;
        let (builder, created) = table_builder(&mut self.dataset, ctx.key(), OP)?;
        if created {
            crate::trace::partition_opened(OP, ctx.key());
            add_table_cols(ctx.cols(), builder)?;
        }
        let mapping = ctx.mapping();
        for cr in table.chunks() {
            for i in 0..cr.len() {
                append_mapped_record_with_defaults(i, cr, builder, &mapping)?;
            }
        }
        crate::trace::table_processed(OP, ctx.key(), table.rows());
        Ok(())
    }

    forward_single_parent!();

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.dataset.finish(err);
    }
}
