//! Row-to-row difference of the selected numeric columns.
//!
//! Integer inputs (signed or unsigned) produce int output; floats stay float.
//! The first row of a partition has no predecessor and is dropped unless
//! `keep_first` is set, in which case it reads 0 (ints) or NaN (floats).

use serde::{Deserialize, Serialize};

use chronoflow_core::column::{Column, Primitive};
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::types::{ColMeta, ColType};

use crate::kernel::saturating_diff;
use crate::running::{aggregated, FirstRow};
use crate::state::PartitionArena;
use crate::traits::{ensure_open, forward_single_parent, fresh_builder, Result, Transformation};

const OP: &str = "difference";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferenceSpec {
    pub columns: Vec<String>,
    /// Replace a negative difference with the current value.
    pub non_negative: bool,
    pub keep_first: bool,
}

impl DifferenceSpec {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            columns: vec![cfg.value_column.clone()],
            non_negative: false,
            keep_first: false,
        }
    }
}

impl Default for DifferenceSpec {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

trait Differ: Primitive + Copy {
    type Out: Primitive + Copy;
    /// Output for a row without predecessor.
    const FIRST: Self::Out;

    fn diff(self, prev: Self) -> Self::Out;
    fn as_out(self) -> Self::Out;
    fn is_negative(d: Self::Out) -> bool;
}

impl Differ for i64 {
    type Out = i64;
    const FIRST: i64 = 0;

    fn diff(self, prev: i64) -> i64 {
        saturating_diff(self, prev)
    }
    fn as_out(self) -> i64 {
        self
    }
    fn is_negative(d: i64) -> bool {
        d < 0
    }
}

impl Differ for u64 {
    type Out = i64;
    const FIRST: i64 = 0;

    fn diff(self, prev: u64) -> i64 {
        saturating_diff(self, prev)
    }
    fn as_out(self) -> i64 {
        i64::try_from(self).unwrap_or(i64::MAX)
    }
    fn is_negative(d: i64) -> bool {
        d < 0
    }
}

impl Differ for f64 {
    type Out = f64;
    const FIRST: f64 = f64::NAN;

    fn diff(self, prev: f64) -> f64 {
        self - prev
    }
    fn as_out(self) -> f64 {
        self
    }
    fn is_negative(d: f64) -> bool {
        d < 0.0
    }
}

fn diff_chunk<T: Differ>(
    prev: &mut Option<T>,
    vs: &[T],
    skip: usize,
    non_negative: bool,
) -> Vec<T::Out> {
    let mut out = Vec::with_capacity(vs.len().saturating_sub(skip));
    for (i, &v) in vs.iter().enumerate() {
        let d = match prev.replace(v) {
            None => T::FIRST,
            Some(p) => {
                let d = v.diff(p);
                if non_negative && T::is_negative(d) {
                    v.as_out()
                } else {
                    d
                }
            }
        };
        if i >= skip {
            out.push(d);
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
enum Prev {
    Int(Option<i64>),
    UInt(Option<u64>),
    Float(Option<f64>),
    Pass,
}

#[derive(Debug)]
struct Partition {
    prev: Vec<Prev>,
    first: FirstRow,
}

pub struct Difference {
    spec: DifferenceSpec,
    dataset: Dataset,
    partitions: PartitionArena<Partition>,
}

impl Difference {
    pub fn new(spec: DifferenceSpec, dataset: Dataset) -> Self {
        Self {
            spec,
            dataset,
            partitions: PartitionArena::new(),
        }
    }
}

impl Transformation for Difference {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let builder = fresh_builder(&mut self.dataset, table.key(), OP)?;

        let spec = &self.spec;
        let mut prev = Vec::with_capacity(table.cols().len());
        for c in table.cols() {
            if aggregated(&spec.columns, &c.label, c.col_type) {
                let out = if c.col_type == ColType::Float {
                    ColType::Float
                } else {
                    ColType::Int
                };
                builder.add_col(ColMeta::new(c.label.clone(), out))?;
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

        let nn = spec.non_negative;
        for cr in table.chunks() {
            let skip = part.first.skip(cr.len());
            for (j, p) in part.prev.iter_mut().enumerate() {
                match (p, cr.column(j)) {
                    (Prev::Int(p), Column::Int(vs)) => {
                        builder.append_slice(j, &diff_chunk(p, vs, skip, nn))?
                    }
                    (Prev::UInt(p), Column::UInt(vs)) => {
                        builder.append_slice(j, &diff_chunk(p, vs, skip, nn))?
                    }
                    (Prev::Float(p), Column::Float(vs)) => {
                        builder.append_slice(j, &diff_chunk(p, vs, skip, nn))?
                    }
                    (_, col) => builder.append_column_range(j, col, skip, col.len())?,
                }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_difference_does_not_wrap() {
        let mut prev = None;
        let out = diff_chunk(&mut prev, &[0u64, u64::MAX, 5], 0, false);
        assert_eq!(out, vec![0, i64::MAX, i64::MIN]);
    }

    #[test]
    fn non_negative_substitutes_current_value() {
        let mut prev = None;
        let out = diff_chunk(&mut prev, &[10i64, 4, 6], 1, true);
        assert_eq!(out, vec![4, 2]);
    }

    #[test]
    fn float_first_row_is_nan() {
        let mut prev = None;
        let out = diff_chunk(&mut prev, &[1.0f64, 3.5], 0, false);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 2.5);
    }
}
