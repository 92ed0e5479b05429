//! Tables and their column-oriented chunks.

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::column::{Column, Primitive};
use crate::error::{Error, Result};
use crate::group_key::GroupKey;
use crate::types::{col_idx, ColMeta, Value};

/// One column-oriented sub-batch of a table. All columns share a length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColReader {
    cols: Vec<ColMeta>,
    columns: Vec<Column>,
    len: usize,
}

impl ColReader {
    pub fn new(cols: Vec<ColMeta>, columns: Vec<Column>) -> Result<Self> {
        if cols.len() != columns.len() {
            return Err(Error::Schema(format!(
                "chunk has {} column descriptors but {} columns",
                cols.len(),
                columns.len()
            )));
        }
        for (meta, col) in cols.iter().zip(&columns) {
            if meta.col_type != col.col_type() {
                return Err(Error::TypeMismatch {
                    label: meta.label.clone(),
                    expected: meta.col_type,
                    actual: col.col_type(),
                });
            }
        }
        let len = columns.first().map(Column::len).unwrap_or(0);
        if let Some((meta, col)) = cols.iter().zip(&columns).find(|(_, c)| c.len() != len) {
            return Err(Error::RaggedTable(format!(
                "column {:?} has {} rows, expected {}",
                meta.label,
                col.len(),
                len
            )));
        }
        Ok(Self { cols, columns, len })
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn column(&self, j: usize) -> &Column {
        &self.columns[j]
    }

    pub fn value(&self, i: usize, j: usize) -> Value {
        self.columns[j].value(i)
    }

    /// Typed view of column `j`.
    pub fn values<T: Primitive>(&self, j: usize) -> Result<&[T]> {
        let col = self.columns.get(j).ok_or(Error::ColumnIndex {
            idx: j,
            len: self.columns.len(),
        })?;
        T::slice(col).ok_or_else(|| Error::TypeMismatch {
            label: self.cols[j].label.clone(),
            expected: T::COL_TYPE,
            actual: col.col_type(),
        })
    }

    /// All values of row `i`, in column order.
    pub fn row(&self, i: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.value(i)).collect()
    }
}

/// A group key, an ordered column list and one or more chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    key: GroupKey,
    cols: Vec<ColMeta>,
    chunks: Vec<ColReader>,
}

impl Table {
    /// Every key column must be a table column of the same type and every
    /// chunk must carry exactly `cols`.
    pub fn new(key: GroupKey, cols: Vec<ColMeta>, chunks: Vec<ColReader>) -> Result<Self> {
        for kc in key.cols() {
            match col_idx(&kc.label, &cols) {
                Some(j) if cols[j].col_type == kc.col_type => {}
                Some(j) => {
                    return Err(Error::TypeMismatch {
                        label: kc.label.clone(),
                        expected: kc.col_type,
                        actual: cols[j].col_type,
                    })
                }
                None => {
                    return Err(Error::Schema(format!(
                        "group key column {:?} is not a table column",
                        kc.label
                    )))
                }
            }
        }
        if let Some(chunk) = chunks.iter().find(|c| c.cols() != cols.as_slice()) {
            return Err(Error::Schema(format!(
                "chunk columns {:?} differ from table columns",
                chunk.cols().iter().map(|c| &c.label).collect::<Vec<_>>()
            )));
        }
        Ok(Self { key, cols, chunks })
    }

    /// Convenience for single-chunk tables.
    pub fn from_columns(key: GroupKey, cols: Vec<ColMeta>, columns: Vec<Column>) -> Result<Self> {
        let chunk = ColReader::new(cols.clone(), columns)?;
        Self::new(key, cols, vec![chunk])
    }

    /// Split into chunks at the given row offsets (ascending, exclusive).
    pub fn rechunk(&self, splits: &[usize]) -> Result<Table> {
        let rows = self.rows();
        let mut bounds: Vec<usize> = splits.iter().copied().filter(|&s| s < rows).collect();
        bounds.push(rows);
        let mut chunks = Vec::with_capacity(bounds.len());
        let mut start = 0;
        for stop in bounds {
            let mut columns: Vec<Column> =
                self.cols.iter().map(|c| Column::new(c.col_type)).collect();
            let mut offset = 0;
            for chunk in &self.chunks {
                let (lo, hi) = (offset, offset + chunk.len());
                offset = hi;
                let (s, e) = (start.max(lo), stop.min(hi));
                if s >= e {
                    continue;
                }
                for (j, col) in columns.iter_mut().enumerate() {
                    col.extend_from(chunk.column(j), s - lo, e - lo)?;
                }
            }
            chunks.push(ColReader::new(self.cols.clone(), columns)?);
            start = stop;
        }
        Self::new(self.key.clone(), self.cols.clone(), chunks)
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    pub fn col_idx(&self, label: &str) -> Option<usize> {
        col_idx(label, &self.cols)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &ColReader> {
        self.chunks.iter()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn rows(&self) -> usize {
        self.chunks.iter().map(ColReader::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    /// Visit chunks in order until `f` breaks or fails.
    pub fn try_for_each_chunk<E, F>(&self, mut f: F) -> std::result::Result<(), E>
    where
        F: FnMut(&ColReader) -> std::result::Result<ControlFlow<()>, E>,
    {
        for chunk in &self.chunks {
            if let ControlFlow::Break(()) = f(chunk)? {
                break;
            }
        }
        Ok(())
    }

    /// Column `j` flattened across chunks.
    pub fn column_values(&self, j: usize) -> Vec<Value> {
        self.chunks
            .iter()
            .flat_map(|c| (0..c.len()).map(move |i| c.value(i, j)))
            .collect()
    }

    /// Column labelled `label` flattened across chunks.
    pub fn column_by_label(&self, label: &str) -> Option<Vec<Value>> {
        self.col_idx(label).map(|j| self.column_values(j))
    }
}
