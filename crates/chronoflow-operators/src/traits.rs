//! Operator protocol + common error type.
//!
//! A host drives a transformation with one `process` call per input table,
//! interleaved with progress marks, and ends with exactly one `finish` per
//! parent. Output goes through the operator's `Dataset`.

use chronoflow_core::dataset::Dataset;
use chronoflow_core::group_key::GroupKey;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::time::Time;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpError>;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("{op}: found duplicate table with key {key}")]
    DuplicateTable { op: &'static str, key: String },

    #[error("{op}: no column {column:?} exists")]
    MissingColumn { op: &'static str, column: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{op}: {detail}")]
    Unsupported { op: &'static str, detail: String },

    #[error("{op}: {what} is not implemented")]
    NotImplemented { op: &'static str, what: &'static str },

    #[error("{op}: transformation already finished")]
    Finished { op: &'static str },

    #[error("{op}: table from unknown parent {id}")]
    UnknownParent { op: &'static str, id: DatasetId },

    #[error("label function failed: {0}")]
    Eval(String),

    #[error(transparent)]
    Core(#[from] chronoflow_core::Error),
}

impl From<OpError> for chronoflow_core::Error {
    fn from(e: OpError) -> Self {
        match e {
            OpError::Core(e) => e,
            other => chronoflow_core::Error::Upstream(other.to_string()),
        }
    }
}

/// A streaming transformation over grouped tables.
pub trait Transformation: Send {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Consume one input table. `id` names the parent that produced it.
    fn process(&mut self, id: DatasetId, table: &Table) -> Result<()>;

    fn retract_table(&mut self, id: DatasetId, key: &GroupKey) -> Result<()>;

    fn update_watermark(&mut self, id: DatasetId, mark: Time) -> Result<()>;

    fn update_processing_time(&mut self, id: DatasetId, t: Time) -> Result<()>;

    /// Parent `id` is done. An error aborts the operator and is forwarded.
    fn finish(&mut self, id: DatasetId, err: Option<chronoflow_core::Error>);
}

/// Fail once the operator's dataset has finished.
pub(crate) fn ensure_open(dataset: &Dataset, op: &'static str) -> Result<()> {
    if dataset.is_finished() {
        crate::trace::protocol_violation(op, "process after finish");
        return Err(OpError::Finished { op });
    }
    Ok(())
}

fn duplicate(key: &GroupKey, op: &'static str) -> OpError {
    crate::trace::protocol_violation(op, "duplicate group key");
    OpError::DuplicateTable {
        op,
        key: key.to_string(),
    }
}

/// Builder for `key`, and whether it was just created. A key whose table
/// was already emitted is a duplicate.
pub(crate) fn table_builder<'a>(
    dataset: &'a mut Dataset,
    key: &GroupKey,
    op: &'static str,
) -> Result<(&'a mut chronoflow_core::builder::TableBuilder, bool)> {
    if dataset.is_released(key) {
        return Err(duplicate(key, op));
    }
    Ok(dataset.table_builder(key)?)
}

/// Builder for `key` that must not exist yet.
pub(crate) fn fresh_builder<'a>(
    dataset: &'a mut Dataset,
    key: &GroupKey,
    op: &'static str,
) -> Result<&'a mut chronoflow_core::builder::TableBuilder> {
    let (builder, created) = table_builder(dataset, key, op)?;
    if !created {
        return Err(duplicate(key, op));
    }
    Ok(builder)
}

/// Forward retractions and progress marks of a single-parent operator to
/// its `dataset` field.
macro_rules! forward_single_parent {
    () => {
        fn retract_table(
            &mut self,
            _id: chronoflow_core::id::DatasetId,
            key: &chronoflow_core::group_key::GroupKey,
        ) -> $crate::traits::Result<()> {
            Ok(self.dataset.retract_table(key)?)
        }

        fn update_watermark(
            &mut self,
            _id: chronoflow_core::id::DatasetId,
            mark: chronoflow_core::time::Time,
        ) -> $crate::traits::Result<()> {
            Ok(self.dataset.update_watermark(mark)?)
        }

        fn update_processing_time(
            &mut self,
            _id: chronoflow_core::id::DatasetId,
            t: chronoflow_core::time::Time,
        ) -> $crate::traits::Result<()> {
            Ok(self.dataset.update_processing_time(t)?)
        }
    };
}

pub(crate) use forward_single_parent;
