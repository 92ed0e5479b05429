use std::collections::HashMap;

use chronoflow_core::builder::add_table_cols;
use chronoflow_core::dataset::Dataset;
use chronoflow_core::group_key::GroupKey;
use chronoflow_core::id::DatasetId;
use chronoflow_core::table::Table;
use chronoflow_core::time::Time;
use chronoflow_core::types::{ColMeta, Value};

use super::{JoinSchema, JoinSpec, OP};
use crate::state::PartitionArena;
use crate::traits::{ensure_open, table_builder, OpError, Result, Transformation};

type Row = Vec<Value>;

/// Join-column values of `row`. `None` when one is NaN: NaN never matches.
fn join_values(row: &Row, on_idx: &[usize]) -> Option<Vec<Value>> {
    on_idx
        .iter()
        .map(|&j| match &row[j] {
            Value::Float(v) if v.is_nan() => None,
            v => Some(v.clone()),
        })
        .collect()
}

/// Rows of one input partition, indexed by join-column values once the
/// output schema is known.
#[derive(Debug)]
struct Buffered {
    key: GroupKey,
    pending: Vec<Row>,
    by_on: HashMap<Vec<Value>, Vec<Row>>,
}

impl Buffered {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            pending: Vec::new(),
            by_on: HashMap::new(),
        }
    }

    fn index(&mut self, on_idx: &[usize]) {
        for row in self.pending.drain(..) {
            if let Some(k) = join_values(&row, on_idx) {
                self.by_on.entry(k).or_default().push(row);
            }
        }
    }
}

#[derive(Debug)]
struct Side {
    cols: Option<Vec<ColMeta>>,
    partitions: PartitionArena<Buffered>,
    mark: Time,
    processing: Time,
    finished: bool,
}

impl Side {
    fn new() -> Self {
        Self {
            cols: None,
            partitions: PartitionArena::new(),
            mark: Time::MIN,
            processing: Time::MIN,
            finished: false,
        }
    }
}

/// Streaming inner join of exactly two parents.
///
/// Every row is buffered by partition and, once both sides have produced a
/// table, probed against the other side's compatible partitions. A pair of
/// rows matching on every join column yields one output row, so `n` left
/// and `m` right rows sharing a join value produce `n * m` rows. When one
/// parent finishes, the other side's buffer can no longer match anything
/// and is released. A NaN in a join column matches nothing.
pub struct MergeJoin {
    spec: JoinSpec,
    parents: [DatasetId; 2],
    dataset: Dataset,
    sides: [Side; 2],
    schema: Option<JoinSchema>,
    pairs: HashMap<(usize, usize), Option<GroupKey>>,
}

impl MergeJoin {
    pub fn new(spec: JoinSpec, parents: [DatasetId; 2], dataset: Dataset) -> Result<Self> {
        if parents[0] == parents[1] {
            return Err(OpError::Config(format!(
                "join needs two distinct parents, got {} twice",
                parents[0]
            )));
        }
        if spec.table_names[0].is_empty() || spec.table_names[0] == spec.table_names[1] {
            return Err(OpError::Config(format!(
                "join table names must be distinct and non-empty, got {:?}",
                spec.table_names
            )));
        }
        Ok(Self {
            spec,
            parents,
            dataset,
            sides: [Side::new(), Side::new()],
            schema: None,
            pairs: HashMap::new(),
        })
    }

    fn side_of(&self, id: DatasetId) -> Result<usize> {
        self.parents
            .iter()
            .position(|p| *p == id)
            .ok_or(OpError::UnknownParent { op: OP, id })
    }

    fn ensure_schema(&mut self) -> Result<()> {
        if self.schema.is_some() {
            return Ok(());
        }
        let (Some(left), Some(right)) = (&self.sides[0].cols, &self.sides[1].cols) else {
            return Ok(());
        };
        let schema = JoinSchema::build(&self.spec, left, right)?;
        for (s, side) in self.sides.iter_mut().enumerate() {
            for i in 0..side.partitions.len() {
                if let Some(b) = side.partitions.get_mut(i) {
                    b.index(&schema.on_idx[s]);
                }
            }
        }
        self.schema = Some(schema);
        Ok(())
    }

    /// Output key for left partition `l` and right partition `r`, `None`
    /// when their keys disagree on a join column.
    fn pair_key(&mut self, l: usize, r: usize) -> Result<Option<GroupKey>> {
        if let Some(k) = self.pairs.get(&(l, r)) {
            return Ok(k.clone());
        }
        let schema = self.schema.as_ref().ok_or_else(|| {
            chronoflow_core::Error::Invariant("join schema not built".into())
        })?;
        let (Some(lb), Some(rb)) = (
            self.sides[0].partitions.get(l),
            self.sides[1].partitions.get(r),
        ) else {
            return Ok(None);
        };
        let key = if schema.compatible(&lb.key, &rb.key) {
            Some(schema.output_key(&lb.key, &rb.key)?)
        } else {
            None
        };
        self.pairs.insert((l, r), key.clone());
        Ok(key)
    }

    /// Join `row` from side `s` against every compatible partition of the
    /// other side.
    fn probe(&mut self, s: usize, part: usize, row: &Row) -> Result<usize> {
        let Some(schema) = self.schema.as_ref() else {
            return Ok(0);
        };
        let Some(probe_key) = join_values(row, &schema.on_idx[s]) else {
            return Ok(0);
        };
        let other = 1 - s;
        let mut emitted = 0;
        for o in 0..self.sides[other].partitions.len() {
            let (l, r) = if s == 0 { (part, o) } else { (o, part) };
            let Some(out_key) = self.pair_key(l, r)? else {
                continue;
            };
            let (Some(schema), Some(buffered)) =
                (self.schema.as_ref(), self.sides[other].partitions.get(o))
            else {
                continue;
            };
            let Some(matches) = buffered.by_on.get(&probe_key) else {
                continue;
            };
            let (builder, created) = table_builder(&mut self.dataset, &out_key, OP)?;
            if created {
                add_table_cols(&schema.out_cols, builder)?;
            }
            for m in matches {
                let (left, right) = if s == 0 { (row, m) } else { (m, row) };
                let mut out: Vec<Option<Value>> = vec![None; schema.out_cols.len()];
                for (side, values) in [left, right].into_iter().enumerate() {
                    for (j, v) in values.iter().enumerate() {
                        if let Some(Some(o)) = schema.col_map[side].get(j) {
                            if out[*o].is_none() {
                                out[*o] = Some(v.clone());
                            }
                        }
                    }
                }
                for (j, v) in out.into_iter().enumerate() {
                    match v {
                        Some(v) => builder.append_value(j, v)?,
                        None => builder.grow(j, 1)?,
                    }
                }
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    fn release(&mut self) {
        for side in &mut self.sides {
            side.partitions.clear();
        }
        self.pairs.clear();
    }
}

impl Transformation for MergeJoin {
    fn name(&self) -> &'static str {
        OP
    }

    fn process(&mut self, id: DatasetId, table: &Table) -> Result<()> {
        ensure_open(&self.dataset, OP)?;
        let s = self.side_of(id)?;
        let cols = self.sides[s]
            .cols
            .get_or_insert_with(|| table.cols().to_vec());
        if cols.as_slice() != table.cols() {
            return Err(OpError::Unsupported {
                op: OP,
                detail: format!(
                    "table {} on {} has different columns than earlier tables",
                    table.key(),
                    self.spec.table_names[s]
                ),
            });
        }
        self.ensure_schema()?;

        let (part, _, created) = self.sides[s]
            .partitions
            .get_or_insert_with(table.key(), || Buffered::new(table.key().clone()));
        if created {
            crate::trace::partition_opened(OP, table.key());
        }
        let keep = !self.sides[1 - s].finished;
        let mut emitted = 0;
        for cr in table.chunks() {
            for i in 0..cr.len() {
                let row = cr.row(i);
                emitted += self.probe(s, part, &row)?;
                if !keep {
                    continue;
                }
                let on_idx = self.schema.as_ref().map(|schema| &schema.on_idx[s]);
                if let Some(b) = self.sides[s].partitions.get_mut(part) {
                    match on_idx {
                        Some(on_idx) => {
                            if let Some(k) = join_values(&row, on_idx) {
                                b.by_on.entry(k).or_default().push(row);
                            }
                        }
                        None => b.pending.push(row),
                    }
                }
            }
        }
        crate::trace::table_processed(OP, table.key(), emitted);
        Ok(())
    }

    fn retract_table(&mut self, _id: DatasetId, _key: &GroupKey) -> Result<()> {
        Err(OpError::NotImplemented {
            op: OP,
            what: "retraction",
        })
    }

    fn update_watermark(&mut self, id: DatasetId, mark: Time) -> Result<()> {
        let s = self.side_of(id)?;
        self.sides[s].mark = mark;
        let min = self.sides.iter().map(|side| side.mark).min().unwrap_or(mark);
        Ok(self.dataset.update_watermark(min)?)
    }

    fn update_processing_time(&mut self, id: DatasetId, t: Time) -> Result<()> {
        let s = self.side_of(id)?;
        self.sides[s].processing = t;
        let min = self
            .sides
            .iter()
            .map(|side| side.processing)
            .min()
            .unwrap_or(t);
        Ok(self.dataset.update_processing_time(min)?)
    }

    fn finish(&mut self, id: DatasetId, err: Option<chronoflow_core::Error>) {
        if let Some(e) = err {
            crate::trace::operator_finished(OP, Some(&e));
            self.release();
            self.dataset.finish(Some(e));
            return;
        }
        let Ok(s) = self.side_of(id) else {
            crate::trace::protocol_violation(OP, "finish from unknown parent");
            return;
        };
        self.sides[s].finished = true;
        // Nothing can arrive from `s` to match the other side's rows.
        self.sides[1 - s].partitions.clear();
        self.pairs.clear();
        if self.sides.iter().all(|side| side.finished) {
            crate::trace::operator_finished(OP, None);
            self.release();
            self.dataset.finish(None);
        }
    }
}
