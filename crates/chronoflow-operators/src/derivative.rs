//! Rate of change of the selected numeric columns per `unit` of time.

use serde::{Deserialize, Serialize};

use chronoflow_core::column::{Column, Primitive};
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::time::{Duration, Time};
use chronoflow_core::types::{ColMeta, ColType};

use crate::running::{aggregated, FirstRow};
use crate::state::PartitionArena;
use crate::traits::{
    ensure_open, forward_single_parent, fresh_builder, OpError, Result, Transformation,
};

const OP: &str = "derivative";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivativeSpec {
    pub columns: Vec<String>,
    pub time_column: String,
    pub unit: Duration,
    /// Use the current value in place of a negative difference.
    pub non_negative: bool,
    pub keep_first: bool,
}

impl DerivativeSpec {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            columns: vec![cfg.value_column.clone()],
            time_column: cfg.time_column.clone(),
            unit: cfg.derivative_unit,
            non_negative: false,
            keep_first: false,
        }
    }
}

impl Default for DerivativeSpec {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

trait Rate: Primitive + Copy {
    /// `self - prev` as a float, without intermediate overflow.
    fn delta(self, prev: Self) -> f64;
    fn as_f64(self) -> f64;
}

impl Rate for i64 {
    fn delta(self, prev: i64) -> f64 {
        (self as i128 - prev as i128) as f64
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Rate for u64 {
    fn delta(self, prev: u64) -> f64 {
        (self as i128 - prev as i128) as f64
    }
    fn as_f64(self) -> f64 {
        self as f64
    }
}

impl Rate for f64 {
    fn delta(self, prev: f64) -> f64 {
        self - prev
    }
    fn as_f64(self) -> f64 {
        self
    }
}

struct RateCtx<'a> {
    times: &'a [Time],
    skip: usize,
    unit: f64,
    non_negative: bool,
}

fn rate_chunk<T: Rate>(prev: &mut Option<(Time, T)>, vs: &[T], cx: &RateCtx<'_>) -> Vec<f64> {
    let mut out = Vec::with_capacity(vs.len().saturating_sub(cx.skip));
    for (i, (&v, &t)) in vs.iter().zip(cx.times).enumerate() {
        let r = match prev.replace((t, v)) {
            None => f64::NAN,
            Some((pt, pv)) => {
                let mut diff = v.delta(pv);
                if cx.non_negative && diff < 0.0 {
                    diff = v.as_f64();
                }
                let elapsed = t.since(pt).nanos() as f64 / cx.unit;
                diff / elapsed
            }
        };
        if i >= cx.skip {
            out.push(r);
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
enum Prev {
    Int(Option<(Time, i64)>),
    UInt(Option<(Time, u64)>),
    Float(Option<(Time, f64)>),
    Pass,
}

#[derive(Debug)]
struct Partition {
    prev: Vec<Prev>,
    first: FirstRow,
}

pub struct Derivative {
    spec: DerivativeSpec,
    dataset: Dataset,
    partitions: PartitionArena<Partition>,
}

impl Derivative {
    pub fn new(spec: DerivativeSpec, dataset: Dataset) -> Result<Self> {
        if !spec.unit.is_positive() {
            return Err(OpError::Config(format!(
                "derivative unit must be positive, got {}",
                spec.unit
            )));
        }
        Ok(Self {
            spec,
            dataset,
            partitions: PartitionArena::new(),
        })
    }
}

impl Transformation for Derivative {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let spec = &self.spec;
        let time_idx = match table.col_idx(&spec.time_column) {
            Some(j) if table.cols()[j].col_type == ColType::Time => j,
            Some(j) => {
                return Err(chronoflow_core::Error::TypeMismatch {
                    label: spec.time_column.clone(),
                    expected: ColType::Time,
                    actual: table.cols()[j].col_type,
                }
                .into())
            }
            None => {
                return Err(OpError::MissingColumn {
                    op: OP,
                    column: spec.time_column.clone(),
                })
            }
        };

        let builder = fresh_builder(&mut self.dataset, table.key(), OP)?;
        let mut prev = Vec::with_capacity(table.cols().len());
        for c in table.cols() {
            if aggregated(&spec.columns, &c.label, c.col_type) {
                builder.add_col(ColMeta::new(c.label.clone(), ColType::Float))?;
                prev.push(match c.col_type {
                    ColType::Int => Prev::Int(None),
                    ColType::UInt => Prev::UInt(None),
                    _ => Prev::Float(None),
                });
            } else {
                builder.add_col(c.clone())?;
                prev.push(Prev::Pass);
            }
        }
        let (_, part, _) = self.partitions.get_or_insert_with(table.key(), || Partition {
            prev,
            first: FirstRow::new(spec.keep_first),
        });
        crate::trace::partition_opened(OP, table.key());

        for cr in table.chunks() {
            let cx = RateCtx {
                times: cr.values::<Time>(time_idx)?,
                skip: part.first.skip(cr.len()),
                unit: spec.unit.nanos() as f64,
                non_negative: spec.non_negative,
            };
            for (j, p) in part.prev.iter_mut().enumerate() {
                let out = match (p, cr.column(j)) {
                    (Prev::Int(p), Column::Int(vs)) => rate_chunk(p, vs, &cx),
                    (Prev::UInt(p), Column::UInt(vs)) => rate_chunk(p, vs, &cx),
                    (Prev::Float(p), Column::Float(vs)) => rate_chunk(p, vs, &cx),
                    (_, col) => {
                        builder.append_column_range(j, col, cx.skip, col.len())?;
                        continue;
                    }
                };
                builder.append_slice(j, &out)?;
            }
        }
        crate::trace::table_processed(OP, table.key(), table.rows());
        Ok(())
    }

    forward_single_parent!();

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.partitions.clear();
        self.dataset.finish(err);
    }
}
