//! Mutable table construction.
//!
//! A [`TableBuilder`] accumulates columns for one output group key. Columns
//! may be added at any time and grown with defaults, which is what pivoting
//! needs; [`TableBuilder::table`] checks the result is rectangular.

use crate::column::{Column, Primitive};
use crate::error::{Error, Result};
use crate::group_key::GroupKey;
use crate::table::{ColReader, Table};
use crate::types::{col_idx, ColMeta, Value};

#[derive(Debug, Clone)]
pub struct TableBuilder {
    key: GroupKey,
    cols: Vec<ColMeta>,
    columns: Vec<Column>,
}

impl TableBuilder {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            cols: Vec::new(),
            columns: Vec::new(),
        }
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

    /// Number of rows in the longest column.
    pub fn nrows(&self) -> usize {
        self.columns.iter().map(Column::len).max().unwrap_or(0)
    }

    pub fn ncols(&self) -> usize {
        self.cols.len()
    }

    /// Add an empty column and return its index. Labels must be unique.
    pub fn add_col(&mut self, meta: ColMeta) -> Result<usize> {
        if self.col_idx(&meta.label).is_some() {
            return Err(Error::DuplicateColumn(meta.label));
        }
        self.columns.push(Column::new(meta.col_type));
        self.cols.push(meta);
        Ok(self.cols.len() - 1)
    }

    fn column_mut(&mut self, j: usize) -> Result<&mut Column> {
        let len = self.columns.len();
        self.columns
            .get_mut(j)
            .ok_or(Error::ColumnIndex { idx: j, len })
    }

    fn typed_mut<T: Primitive>(&mut self, j: usize) -> Result<&mut Vec<T>> {
        let label = self
            .cols
            .get(j)
            .map(|c| c.label.clone())
            .unwrap_or_default();
        let col = self.column_mut(j)?;
        let actual = col.col_type();
        T::vec_mut(col).ok_or(Error::TypeMismatch {
            label,
            expected: T::COL_TYPE,
            actual,
        })
    }

    pub fn append<T: Primitive>(&mut self, j: usize, v: T) -> Result<()> {
        self.typed_mut::<T>(j)?.push(v);
        Ok(())
    }

    pub fn append_slice<T: Primitive>(&mut self, j: usize, vs: &[T]) -> Result<()> {
        self.typed_mut::<T>(j)?.extend_from_slice(vs);
        Ok(())
    }

    pub fn append_value(&mut self, j: usize, v: Value) -> Result<()> {
        let label = self.cols.get(j).map(|c| c.label.clone());
        self.column_mut(j)?.push_value(v).map_err(|e| relabel(e, label))
    }

    /// Append every value of `src` to column `j`.
    pub fn append_column(&mut self, j: usize, src: &Column) -> Result<()> {
        self.append_column_range(j, src, 0, src.len())
    }

    /// Append rows `[start, stop)` of `src` to column `j`.
    pub fn append_column_range(
        &mut self,
        j: usize,
        src: &Column,
        start: usize,
        stop: usize,
    ) -> Result<()> {
        let label = self.cols.get(j).map(|c| c.label.clone());
        self.column_mut(j)?
            .extend_from(src, start, stop)
            .map_err(|e| relabel(e, label))
    }

    /// Append `n` default values to column `j`.
    pub fn grow(&mut self, j: usize, n: usize) -> Result<()> {
        self.column_mut(j)?.grow(n);
        Ok(())
    }

    pub fn set<T: Primitive>(&mut self, i: usize, j: usize, v: T) -> Result<()> {
        let col = self.typed_mut::<T>(j)?;
        let len = col.len();
        let slot = col.get_mut(i).ok_or_else(|| {
            Error::Invariant(format!("row {i} out of range for column of length {len}"))
        })?;
        *slot = v;
        Ok(())
    }

    pub fn set_value(&mut self, i: usize, j: usize, v: Value) -> Result<()> {
        let label = self.cols.get(j).map(|c| c.label.clone());
        self.column_mut(j)?
            .set_value(i, v)
            .map_err(|e| relabel(e, label))
    }

    /// Append the builder's own key value to every builder column that is a
    /// key column, once.
    pub fn append_key_values(&mut self) -> Result<()> {
        let key = self.key.clone();
        for (kc, v) in key.iter() {
            let j = self.col_idx(&kc.label).ok_or_else(|| {
                Error::Schema(format!("builder has no key column {:?}", kc.label))
            })?;
            self.append_value(j, v.clone())?;
        }
        Ok(())
    }

    /// Materialize the accumulated columns into a single-chunk table.
    pub fn table(self) -> Result<Table> {
        let n = self.nrows();
        if let Some((meta, col)) = self.cols.iter().zip(&self.columns).find(|(_, c)| c.len() != n)
        {
            return Err(Error::RaggedTable(format!(
                "table {}: column {:?} has {} rows, expected {}",
                self.key,
                meta.label,
                col.len(),
                n
            )));
        }
        let chunk = ColReader::new(self.cols.clone(), self.columns)?;
        Table::new(self.key, self.cols, vec![chunk])
    }
}

fn relabel(e: Error, label: Option<String>) -> Error {
    match (e, label) {
        (
            Error::TypeMismatch {
                expected, actual, ..
            },
            Some(label),
        ) => Error::TypeMismatch {
            label,
            expected,
            actual,
        },
        (e, _) => e,
    }
}

/// Add every column of `cols` to the builder.
pub fn add_table_cols(cols: &[ColMeta], b: &mut TableBuilder) -> Result<()> {
    for c in cols {
        b.add_col(c.clone())?;
    }
    Ok(())
}

/// Add the key columns of `key` to the builder.
pub fn add_table_key_cols(key: &GroupKey, b: &mut TableBuilder) -> Result<()> {
    add_table_cols(key.cols(), b)
}

/// Append rows `[start, stop)` of `cr`.
pub fn append_cols_range(
    cr: &ColReader,
    start: usize,
    stop: usize,
    b: &mut TableBuilder,
) -> Result<()> {
    for j in 0..cr.cols().len() {
        let label = cr.cols()[j].label.clone();
        b.column_mut(j)?
            .extend_from(cr.column(j), start, stop)
            .map_err(|e| relabel(e, Some(label)))?;
    }
    Ok(())
}

/// Append row `i` of `cr` to the positionally matching builder columns.
pub fn append_record(i: usize, cr: &ColReader, b: &mut TableBuilder) -> Result<()> {
    for j in 0..cr.cols().len() {
        b.append_value(j, cr.value(i, j))?;
    }
    Ok(())
}

/// Append row `i` of `cr` through a mapping from builder column label to
/// source column index. Builder columns absent from `mapping` get a default.
pub fn append_mapped_record_with_defaults(
    i: usize,
    cr: &ColReader,
    b: &mut TableBuilder,
    mapping: &[(String, usize)],
) -> Result<()> {
    for j in 0..b.ncols() {
        let label = &b.cols[j].label;
        match mapping.iter().find(|(l, _)| l == label) {
            Some(&(_, src)) => {
                let v = cr.value(i, src);
                b.append_value(j, v)?;
            }
            None => b.grow(j, 1)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColType;

    #[test]
    fn grow_then_set_fills_holes() {
        let mut b = TableBuilder::new(GroupKey::empty());
        let a = b.add_col(ColMeta::new("a", ColType::Float)).expect("add");
        b.grow(a, 3).expect("grow");
        b.set(1, a, 2.5f64).expect("set");
        let t = b.table().expect("table");
        assert_eq!(
            t.column_values(0),
            vec![Value::Float(0.0), Value::Float(2.5), Value::Float(0.0)]
        );
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut b = TableBuilder::new(GroupKey::empty());
        b.add_col(ColMeta::new("a", ColType::Int)).expect("add");
        assert!(matches!(
            b.add_col(ColMeta::new("a", ColType::Float)),
            Err(Error::DuplicateColumn(_))
        ));
    }

    #[test]
    fn ragged_builders_fail_to_materialize() {
        let mut b = TableBuilder::new(GroupKey::empty());
        b.add_col(ColMeta::new("a", ColType::Int)).expect("add");
        b.add_col(ColMeta::new("b", ColType::Int)).expect("add");
        b.append(0, 1i64).expect("append");
        assert!(matches!(b.table(), Err(Error::RaggedTable(_))));
    }

    #[test]
    fn typed_append_checks_type() {
        let mut b = TableBuilder::new(GroupKey::empty());
        b.add_col(ColMeta::new("a", ColType::Int)).expect("add");
        let err = b.append(0, 1.0f64).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref label, .. } if label == "a"));
    }
}
