//! Running sum of the selected numeric columns.

use serde::{Deserialize, Serialize};

use chronoflow_core::builder::add_table_cols;
use chronoflow_core::column::{Column, Primitive};
use chronoflow_core::config::EngineConfig;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::types::ColType;

use crate::state::PartitionArena;
use crate::traits::{ensure_open, forward_single_parent, fresh_builder, Result, Transformation};

const OP: &str = "cumulative_sum";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CumulativeSumSpec {
    /// Columns to sum. Non-numeric columns listed here pass through.
    pub columns: Vec<String>,
}

impl CumulativeSumSpec {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            columns: vec![cfg.value_column.clone()],
        }
    }
}

impl Default for CumulativeSumSpec {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Element types with a running sum. Integers wrap on overflow.
trait RunningSum: Primitive + Copy {
    fn accumulate(self, v: Self) -> Self;
}

impl RunningSum for i64 {
    fn accumulate(self, v: i64) -> i64 {
        self.wrapping_add(v)
    }
}

impl RunningSum for u64 {
    fn accumulate(self, v: u64) -> u64 {
        self.wrapping_add(v)
    }
}

impl RunningSum for f64 {
    fn accumulate(self, v: f64) -> f64 {
        self + v
    }
}

fn cumulate<T: RunningSum>(sum: &mut T, vs: &[T]) -> Vec<T> {
    vs.iter()
        .map(|&v| {
            *sum = sum.accumulate(v);
            *sum
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Accumulator {
    Int(i64),
    UInt(u64),
    Float(f64),
    Pass,
}

impl Accumulator {
    fn for_column(col_type: ColType, selected: bool) -> Self {
        match (selected, col_type) {
            (true, ColType::Int) => Accumulator::Int(0),
            (true, ColType::UInt) => Accumulator::UInt(0),
            (true, ColType::Float) => Accumulator::Float(0.0),
            _ => Accumulator::Pass,
        }
    }
}

pub struct CumulativeSum {
    spec: CumulativeSumSpec,
    dataset: Dataset,
    sums: PartitionArena<Vec<Accumulator>>,
}

impl CumulativeSum {
    pub fn new(spec: CumulativeSumSpec, dataset: Dataset) -> Self {
        Self {
            spec,
            dataset,
            sums: PartitionArena::new(),
        }
    }
}

impl Transformation for CumulativeSum {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, _id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let builder = fresh_builder(&mut self.dataset, table.key(), OP)?;
        add_table_cols(table.cols(), builder)?;

        let columns = &self.spec.columns;
        let (_, accs, _) = self.sums.get_or_insert_with(table.key(), || {
            table
                .cols()
                .iter()
                .map(|c| Accumulator::for_column(c.col_type, columns.contains(&c.label)))
                .collect()
        });
        crate::trace::partition_opened(OP, table.key());

        for cr in table.chunks() {
            for (j, acc) in accs.iter_mut().enumerate() {
                match (acc, cr.column(j)) {
                    (Accumulator::Int(s), Column::Int(vs)) => {
                        builder.append_slice(j, &cumulate(s, vs))?
                    }
                    (Accumulator::UInt(s), Column::UInt(vs)) => {
                        builder.append_slice(j, &cumulate(s, vs))?
                    }
                    (Accumulator::Float(s), Column::Float(vs)) => {
                        builder.append_slice(j, &cumulate(s, vs))?
                    }
                    (_, col) => builder.append_column(j, col)?,
                }
            }
        }
        crate::trace::table_processed(OP, table.key(), table.rows());
        Ok(())
    }

    forward_single_parent!();

    fn finish(&mut self, _id: DatasetId, err: Option<chronoflow_core::Error>) {
        crate::trace::operator_finished(OP, err.as_ref());
        self.sums.clear();
        self.dataset.finish(err);
    }
}
