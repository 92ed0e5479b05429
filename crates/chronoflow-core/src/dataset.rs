//! Output datasets and the downstream sink contract.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::builder::TableBuilder;
use crate::cache::TableBuilderCache;
use crate::error::{Error, Result};
use crate::group_key::GroupKey;
use crate::id::DatasetId;
use crate::table::Table;
use crate::time::Time;
use crate::types::Value;

/// Receiver of a dataset's output. `id` names the dataset that emits.
pub trait TableSink: Send {
    fn process(&mut self, id: DatasetId, table: Table) -> Result<()>;
    fn retract_table(&mut self, id: DatasetId, key: &GroupKey) -> Result<()>;
    fn update_watermark(&mut self, id: DatasetId, mark: Time) -> Result<()>;
    fn update_processing_time(&mut self, id: DatasetId, t: Time) -> Result<()>;
    fn finish(&mut self, id: DatasetId, err: Option<Error>);
}

/// An operator's output: a builder cache plus the downstream sink.
///
/// A table is released downstream once the watermark reaches the `_stop`
/// value of its group key, or when the watermark is [`Time::MAX`]. Whatever
/// remains is materialized when the dataset finishes cleanly. Both happen in
/// the order the builders were created.
pub struct Dataset {
    id: DatasetId,
    cache: TableBuilderCache,
    sink: Box<dyn TableSink>,
    stop_column: String,
    finished: bool,
}

impl Dataset {
    pub fn new(id: DatasetId, sink: Box<dyn TableSink>) -> Self {
        Self {
            id,
            cache: TableBuilderCache::new(),
            sink,
            stop_column: "_stop".to_string(),
            finished: false,
        }
    }

    /// Key column whose time value bounds a table for watermark release.
    pub fn with_stop_column(mut self, label: impl Into<String>) -> Self {
        self.stop_column = label.into();
        self
    }

    pub fn id(&self) -> DatasetId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Builder for `key`, and whether it was just created. Keys whose table
    /// was already released are refused.
    pub fn table_builder(&mut self, key: &GroupKey) -> Result<(&mut TableBuilder, bool)> {
        if self.finished {
            return Err(Error::Invariant(format!(
                "{} already finished, no builder for {key}",
                self.id
            )));
        }
        if self.cache.is_released(key) {
            return Err(Error::Invariant(format!(
                "{} already emitted the table for {key}",
                self.id
            )));
        }
        Ok(self.cache.table_builder(key))
    }

    pub fn is_released(&self, key: &GroupKey) -> bool {
        self.cache.is_released(key)
    }

    pub fn has_table(&self, key: &GroupKey) -> bool {
        self.cache.contains(key)
    }

    pub fn expire_table(&mut self, key: &GroupKey) -> bool {
        self.cache.expire_table(key)
    }

    /// Drop any builder for `key` and forward the retraction.
    pub fn retract_table(&mut self, key: &GroupKey) -> Result<()> {
        self.cache.expire_table(key);
        self.sink.retract_table(self.id, key)
    }

    /// Emit every table the watermark has passed, then forward it.
    pub fn update_watermark(&mut self, mark: Time) -> Result<()> {
        if !self.finished {
            let stop = &self.stop_column;
            let ready = self.cache.release(|key| {
                mark == Time::MAX
                    || key
                        .label_value(stop)
                        .and_then(Value::as_time)
                        .is_some_and(|t| t <= mark)
            });
            for b in ready {
                self.sink.process(self.id, b.table()?)?;
            }
        }
        self.sink.update_watermark(self.id, mark)
    }

    pub fn update_processing_time(&mut self, t: Time) -> Result<()> {
        self.sink.update_processing_time(self.id, t)
    }

    /// Emit every cached table and finish downstream. With an error, the
    /// cached tables are discarded and the error is forwarded instead.
    /// Later calls are ignored.
    pub fn finish(&mut self, err: Option<Error>) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Some(e) = err {
            self.cache.clear();
            self.sink.finish(self.id, Some(e));
            return;
        }
        for b in self.cache.drain() {
            let sent = b.table().and_then(|t| self.sink.process(self.id, t));
            if let Err(e) = sent {
                self.sink.finish(self.id, Some(e));
                return;
            }
        }
        self.sink.finish(self.id, None);
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.id)
            .field("tables", &self.cache.len())
            .field("finished", &self.finished)
            .finish()
    }
}

/// Everything a [`CollectingSink`] has seen.
#[derive(Debug, Default, Clone)]
pub struct Collected {
    pub tables: Vec<Table>,
    pub retracted: Vec<GroupKey>,
    pub watermarks: Vec<Time>,
    pub processing_times: Vec<Time>,
    /// `None` until finished; then `Ok` or the error text.
    pub finished: Option<std::result::Result<(), String>>,
}

/// Terminal sink that records its input. Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    inner: Arc<Mutex<Collected>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn snapshot(&self) -> Collected {
        self.lock().clone()
    }

    pub fn tables(&self) -> Vec<Table> {
        self.lock().tables.clone()
    }

    pub fn finished(&self) -> Option<std::result::Result<(), String>> {
        self.lock().finished.clone()
    }

    /// The emitted table with group key `key`, if any.
    pub fn table(&self, key: &GroupKey) -> Option<Table> {
        self.lock().tables.iter().find(|t| t.key() == key).cloned()
    }
}

impl TableSink for CollectingSink {
    fn process(&mut self, _id: DatasetId, table: Table) -> Result<()> {
        self.lock().tables.push(table);
        Ok(())
    }

    fn retract_table(&mut self, _id: DatasetId, key: &GroupKey) -> Result<()> {
        self.lock().retracted.push(key.clone());
        Ok(())
    }

    fn update_watermark(&mut self, _id: DatasetId, mark: Time) -> Result<()> {
        self.lock().watermarks.push(mark);
        Ok(())
    }

    fn update_processing_time(&mut self, _id: DatasetId, t: Time) -> Result<()> {
        self.lock().processing_times.push(t);
        Ok(())
    }

    fn finish(&mut self, _id: DatasetId, err: Option<Error>) {
        self.lock().finished = Some(match err {
            Some(e) => Err(e.to_string()),
            None => Ok(()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColMeta, ColType};

    fn dataset() -> (Dataset, CollectingSink) {
        let sink = CollectingSink::new();
        (Dataset::new(DatasetId::new(7), Box::new(sink.clone())), sink)
    }

    #[test]
    fn finish_emits_tables_in_creation_order() {
        let (mut d, sink) = dataset();
        for h in ["b", "a"] {
            let key = GroupKey::from_pairs([("host", h)]);
            let (b, created) = d.table_builder(&key).expect("builder");
            assert!(created);
            b.add_col(ColMeta::new("host", ColType::String)).expect("col");
            b.append_key_values().expect("key values");
        }
        d.finish(None);
        let hosts: Vec<String> = sink.tables().iter().map(|t| t.key().to_string()).collect();
        assert_eq!(hosts, vec!["{host=b}", "{host=a}"]);
        assert_eq!(sink.finished(), Some(Ok(())));
        assert!(d.table_builder(&GroupKey::empty()).is_err());
    }

    #[test]
    fn finish_with_error_discards_tables() {
        let (mut d, sink) = dataset();
        d.table_builder(&GroupKey::empty()).expect("builder");
        d.finish(Some(Error::Config("boom".into())));
        assert!(sink.tables().is_empty());
        assert!(matches!(sink.finished(), Some(Err(ref m)) if m.contains("boom")));
    }

    fn bucket(d: &mut Dataset, stop_secs: i64) -> GroupKey {
        let key = GroupKey::from_pairs([("_stop", Time::from_secs(stop_secs))]);
        let (b, _) = d.table_builder(&key).expect("builder");
        b.add_col(ColMeta::new("_stop", ColType::Time)).expect("col");
        b.append_key_values().expect("key values");
        key
    }

    #[test]
    fn watermark_releases_passed_tables() {
        let (mut d, sink) = dataset();
        let early = bucket(&mut d, 60);
        let late = bucket(&mut d, 120);
        let unbounded = GroupKey::from_pairs([("host", "a")]);
        let (b, _) = d.table_builder(&unbounded).expect("builder");
        b.add_col(ColMeta::new("host", ColType::String)).expect("col");
        b.append_key_values().expect("key values");

        d.update_watermark(Time::from_secs(90)).expect("watermark");
        assert_eq!(sink.tables().len(), 1);
        assert_eq!(sink.tables()[0].key(), &early);
        assert!(d.is_released(&early));
        assert!(d.table_builder(&early).is_err());

        d.update_watermark(Time::MAX).expect("watermark");
        let keys: Vec<GroupKey> = sink.tables().iter().map(|t| t.key().clone()).collect();
        assert_eq!(keys, vec![early, late, unbounded]);
        assert_eq!(
            sink.snapshot().watermarks,
            vec![Time::from_secs(90), Time::MAX]
        );

        d.finish(None);
        assert_eq!(sink.tables().len(), 3);
    }

    #[test]
    fn retraction_forgets_a_released_table() {
        let (mut d, _sink) = dataset();
        let key = bucket(&mut d, 60);
        d.update_watermark(Time::from_secs(60)).expect("watermark");
        d.retract_table(&key).expect("retract");
        assert!(d.table_builder(&key).expect("builder").1);
    }

    #[test]
    fn retraction_expires_the_builder() {
        let (mut d, sink) = dataset();
        let key = GroupKey::from_pairs([("host", "a")]);
        d.table_builder(&key).expect("builder");
        d.retract_table(&key).expect("retract");
        assert!(!d.has_table(&key));
        assert_eq!(sink.snapshot().retracted, vec![key]);
    }
}
