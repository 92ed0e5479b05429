//! First `n` rows of each table after skipping `offset`.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use chronoflow_core::builder::{add_table_cols, append_cols_range};
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;

use crate::state::PartitionArena;
use crate::traits::{
    ensure_open, forward_single_parent, fresh_builder, OpError, Result, Transformation,
};

const OP: &str = "limit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSpec {
    pub n: i64,
    #[serde(default)]
    pub offset: i64,
}

impl LimitSpec {
    pub fn new(n: i64) -> Self {
        Self { n, offset: 0 }
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Rows still to skip and still to take for one partition.
#[derive(Debug, Clone, Copy)]
struct Remaining {
    n: usize,
    offset: usize,
}

impl Remaining {
    /// Row range of a chunk of `len` rows to keep, if any.
    fn take(&mut self, len: usize) -> Option<(usize, usize)> {
        if len <= self.offset {
            self.offset -= len;
            return None;
        }
        let start = self.offset;
        let stop = len.min(start + self.n);
        self.offset = 0;
        self.n -= stop - start;
        Some((start, stop))
    }
}

pub struct Limit {
    spec: LimitSpec,
    dataset: Dataset,
    remaining: PartitionArena<Remaining>,
}

impl Limit {
    pub fn new(spec: LimitSpec, dataset: Dataset) -> Result<Self> {
        if spec.offset < 0 {
            return Err(OpError::Config(format!(
                "limit offset must not be negative, got {}",
                spec.offset
            )));
        }
        Ok(Self {
            spec,
            dataset,
            remaining: PartitionArena::new(),
        })
    }
}

impl Transformation for Limit {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let builder = fresh_builder(&mut self.dataset, table.key(), OP)?;
        add_table_cols(table.cols(), builder)?;

        let spec = self.spec;
        let (_, left, _) = self.remaining.get_or_insert_with(table.key(), || Remaining {
            n: usize::try_from(spec.n).unwrap_or(0),
            offset: usize::try_from(spec.offset).unwrap_or(0),
        });
        table.try_for_each_chunk(|cr| {
            if left.n == 0 {
                return Ok::<_, OpError>(ControlFlow::Break(()));
            }
            if let Some((start, stop)) = left.take(cr.len()) {
                append_cols_range(cr, start, stop, builder)?;
            }
            Ok(ControlFlow::Continue(()))
        })?;
        crate::trace::table_processed(OP, table.key(), table.rows());
        Ok(())
    }

    forward_single_parent!();

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.remaining.clear();
        self.dataset.finish(err);
    }
}
