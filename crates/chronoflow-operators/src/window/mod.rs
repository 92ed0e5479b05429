//! Fixed (tumbling or sliding) windows over a time column.
//!
//! Each input row is copied into every bucket that contains its timestamp.
//! The output group key is the input key plus the bucket's start/stop
//! columns, so one input partition fans out into one table per bucket.

mod bounds;

pub use bounds::Bucketer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use chronoflow_core::builder::add_table_cols;
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::group_key::GroupKey;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::time::{Bounds, Duration, Time};
use chronoflow_core::types::{ColMeta, ColType, Value};

use crate::state::PartitionArena;
use crate::traits::{ensure_open, OpError, Result, Transformation};

const OP: &str = "window";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    /// Distance between consecutive bucket stops. Defaults to `period`.
    pub every: Option<Duration>,
    /// Bucket width. Defaults to `every`.
    pub period: Option<Duration>,
    /// Carried for hosts; bucketing ignores it.
    pub round: Option<Duration>,
    /// Alignment reference for bucket edges.
    pub start: Time,
    pub time_column: String,
    pub start_column: String,
    pub stop_column: String,
    /// Emit a table for every bucket of the query bounds, even without rows.
    pub create_empty: bool,
}

impl WindowSpec {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            every: None,
            period: None,
            round: None,
            start: Time::default(),
            time_column: cfg.time_column.clone(),
            start_column: cfg.start_column.clone(),
            stop_column: cfg.stop_column.clone(),
            create_empty: false,
        }
    }

    /// Tumbling windows of width `every`.
    pub fn every(every: Duration) -> Self {
        Self {
            every: Some(every),
            ..Self::default()
        }
    }

    /// Resolved `(every, period)`.
    pub fn durations(&self) -> Result<(Duration, Duration)> {
        let (every, period) = match (self.every, self.period) {
            (Some(e), Some(p)) => (e, p),
            (Some(e), None) => (e, e),
            (None, Some(p)) => (p, p),
            (None, None) => {
                return Err(OpError::Config(
                    "window needs at least one of every and period".into(),
                ))
            }
        };
        if !every.is_positive() || !period.is_positive() {
            return Err(OpError::Config(format!(
                "window every ({every}) and period ({period}) must be positive"
            )));
        }
        if period.is_infinite() && !every.is_infinite() {
            return Err(OpError::Config(
                "an infinite window period needs an infinite every".into(),
            ));
        }
        Ok((every, period))
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Where an output key column takes its value from.
#[derive(Debug, Clone, Copy)]
enum KeySource {
    Input(usize),
    Start,
    Stop,
}

/// Output layout of one input partition plus its memoized bucket keys.
#[derive(Debug)]
struct WindowPartition {
    input_cols: Vec<ColMeta>,
    new_cols: Vec<ColMeta>,
    key_cols: Vec<(ColMeta, KeySource)>,
    start_idx: usize,
    stop_idx: usize,
    keys: HashMap<Bounds, GroupKey>,
}

impl WindowPartition {
    fn new(table: &Table, spec: &WindowSpec) -> Result<Self> {
        let key = table.key();
        let mut new_cols = Vec::with_capacity(table.cols().len() + 2);
        let mut key_cols = Vec::with_capacity(key.len() + 2);
        let (mut start_idx, mut stop_idx) = (None, None);
        for (j, c) in table.cols().iter().enumerate() {
            let source = if c.label == spec.start_column {
                start_idx = Some(j);
                Some(KeySource::Start)
            } else if c.label == spec.stop_column {
                stop_idx = Some(j);
                Some(KeySource::Stop)
            } else {
                key.col_idx(&c.label).map(KeySource::Input)
            };
            if matches!(source, Some(KeySource::Start | KeySource::Stop))
                && c.col_type != ColType::Time
            {
                return Err(chronoflow_core::Error::TypeMismatch {
                    label: c.label.clone(),
                    expected: ColType::Time,
                    actual: c.col_type,
                }
                .into());
            }
            if let Some(source) = source {
                key_cols.push((c.clone(), source));
            }
            new_cols.push(c.clone());
        }
        let mut append_bound = |label: &str, source: KeySource| {
            let meta = ColMeta::new(label, ColType::Time);
            new_cols.push(meta.clone());
            key_cols.push((meta, source));
            new_cols.len() - 1
        };
        let start_idx = match start_idx {
            Some(j) => j,
            None => append_bound(&spec.start_column, KeySource::Start),
        };
        let stop_idx = match stop_idx {
            Some(j) => j,
            None => append_bound(&spec.stop_column, KeySource::Stop),
        };
        Ok(Self {
            input_cols: table.cols().to_vec(),
            new_cols,
            key_cols,
            start_idx,
            stop_idx,
            keys: HashMap::new(),
        })
    }

    fn key_for(&mut self, input: &GroupKey, b: Bounds) -> Result<GroupKey> {
        if let Some(k) = self.keys.get(&b) {
            return Ok(k.clone());
        }
        let (cols, values): (Vec<ColMeta>, Vec<Value>) = self
            .key_cols
            .iter()
            .map(|(c, source)| {
                let v = match source {
                    KeySource::Input(k) => input.value(*k).clone(),
                    KeySource::Start => Value::Time(b.start),
                    KeySource::Stop => Value::Time(b.stop),
                };
                (c.clone(), v)
            })
            .unzip();
        let key = GroupKey::new(cols, values)?;
        self.keys.insert(b, key.clone());
        Ok(key)
    }
}

pub struct Window {
    spec: WindowSpec,
    buckets: Bucketer,
    all_bounds: Vec<Bounds>,
    dataset: Dataset,
    partitions: PartitionArena<WindowPartition>,
}

impl Window {
    /// `bounds` are the query bounds every bucket is clipped to.
    pub fn new(spec: WindowSpec, bounds: Bounds, dataset: Dataset) -> Result<Self> {
        let (every, period) = spec.durations()?;
        let buckets = Bucketer::new(every, period, spec.start, bounds);
        let all_bounds = if spec.create_empty {
            buckets.all_bounds()
        } else {
            Vec::new()
        };
        let dataset = dataset.with_stop_column(spec.stop_column.clone());
        Ok(Self {
            spec,
            buckets,
            all_bounds,
            dataset,
            partitions: PartitionArena::new(),
        })
    }
}

/// Builder for bucket `key`; `None` once the watermark released the bucket.
fn builder_for<'a>(
    dataset: &'a mut Dataset,
    key: &GroupKey,
    cols: &[ColMeta],
) -> Result<Option<&'a mut chronoflow_core::builder::TableBuilder>> {
    if dataset.is_released(key) {
        return Ok(None);
    }
    let (builder, created) = dataset.table_builder(key)?;
    if created {
        add_table_cols(cols, builder)?;
    }
    Ok(Some(builder))
}

impl Transformation for Window {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let time_idx = table
            .col_idx(&self.spec.time_column)
            .ok_or_else(|| OpError::MissingColumn {
                op: OP,
                column: self.spec.time_column.clone(),
            })?;

        let spec = &self.spec;
        let (_, part, created) = self
            .partitions
            .try_get_or_insert_with(table.key(), || WindowPartition::new(table, spec))?;
        if created {
            crate::trace::partition_opened(OP, table.key());
        } else if part.input_cols != table.cols() {
            return Err(OpError::Unsupported {
                op: OP,
                detail: format!("columns of partition {} changed between tables", table.key()),
            });
        }

        if self.buckets.query_bounds().is_empty() {
            crate::trace::fallback(OP, "empty query bounds");
            return Ok(());
        }

        for &b in &self.all_bounds {
            let key = part.key_for(table.key(), b)?;
            builder_for(&mut self.dataset, &key, &part.new_cols)?;
        }

        for cr in table.chunks() {
            let times = cr.values::<Time>(time_idx)?;
            for (i, &t) in times.iter().enumerate() {
                for b in self.buckets.bounds_for(t) {
                    let key = part.key_for(table.key(), b)?;
                    let Some(builder) = builder_for(&mut self.dataset, &key, &part.new_cols)?
                    else {
                        crate::trace::fallback(OP, "late row for an emitted bucket");
                        continue;
                    };
                    for j in 0..part.new_cols.len() {
                        if j == part.start_idx {
                            builder.append(j, b.start)?;
                        } else if j == part.stop_idx {
                            builder.append(j, b.stop)?;
                        } else {
                            builder.append_value(j, cr.value(i, j))?;
                        }
                    }
                }
            }
        }
        crate::trace::table_processed(OP, table.key(), table.rows());
        Ok(())
    }

    fn retract_table(&mut self, _id: DatasetId, _key: &GroupKey) -> Result<()> {
        Err(OpError::NotImplemented {
            op: OP,
            what: "retraction",
        })
    }

    fn update_watermark(&mut self, _id: DatasetId, mark: Time) -> Result<()> {
        Ok(self.dataset.update_watermark(mark)?)
    }

    fn update_processing_time(&mut self, _id: DatasetId, t: Time) -> Result<()> {
        Ok(self.dataset.update_processing_time(t)?)
    }

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.partitions.clear();
        self.dataset.finish(err);
    }
}
