//! Chaining: a transformation as the downstream sink of another dataset.

use chronoflow_core::dataset::TableSink;
use chronoflow_core::group_key::GroupKey;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::time::Time;
use chronoflow_core::Result;

use crate::traits::Transformation;

pub struct TransformationSink {
    inner: Box<dyn Transformation>,
}

impl TransformationSink {
    pub fn new(inner: impl Transformation + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl TableSink for TransformationSink {
    fn process(&mut self, id: DatasetId, table: Table) -> Result<()> {
        Ok(self.inner.process(id, &table)?)
    }

    fn retract_table(&mut self, id: DatasetId, key: &GroupKey) -> Result<()> {
        Ok(self.inner.retract_table(id, key)?)
    }

    fn update_watermark(&mut self, id: DatasetId, mark: Time) -> Result<()> {
        Ok(self.inner.update_watermark(id, mark)?)
    }

    fn update_processing_time(&mut self, id: DatasetId, t: Time) -> Result<()> {
        Ok(self.inner.update_processing_time(id, t)?)
    }

    fn finish(&mut self, id: DatasetId, err: Option<chronoflow_core::Error>) {
        self.inner.finish(id, err)
    }
}
