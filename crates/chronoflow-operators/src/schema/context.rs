use std::collections::HashSet;

use chronoflow_core::group_key::GroupKey;
use chronoflow_core::table::Table;
use chronoflow_core::types::{col_idx, ColMeta, Value};

use crate::traits::{OpError, Result};

/// Output layout of one table as seen by a chain of schema mutators.
///
/// `col_map[j]` is the input column that feeds output column `j`. Mutators
/// take a context by value and return a new one; a failing mutator leaves
/// the caller's previous context untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderContext {
    cols: Vec<ColMeta>,
    key: GroupKey,
    col_map: Vec<usize>,
}

impl BuilderContext {
    /// Identity layout of `table`.
    pub fn new(table: &Table) -> Self {
        Self {
            cols: table.cols().to_vec(),
            key: table.key().clone(),
            col_map: (0..table.cols().len()).collect(),
        }
    }

    pub fn cols(&self) -> &[ColMeta] {
        &self.cols
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn col_map(&self) -> &[usize] {
        &self.col_map
    }

    /// Output label to input column, in output order.
    pub fn mapping(&self) -> Vec<(String, usize)> {
        self.cols
            .iter()
            .zip(&self.col_map)
            .map(|(c, &src)| (c.label.clone(), src))
            .collect()
    }

    pub(crate) fn check_col(&self, op: &'static str, label: &str) -> Result<()> {
        match col_idx(label, &self.cols) {
            Some(_) => Ok(()),
            None => Err(OpError::MissingColumn {
                op,
                column: label.to_string(),
            }),
        }
    }

    /// New context from `(current index, new meta)` pairs. Key columns
    /// follow their column, in output order. Labels must stay unique.
    pub(crate) fn rebuild(&self, kept: Vec<(usize, ColMeta)>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(kept.len());
        for (_, meta) in &kept {
            if !seen.insert(meta.label.as_str()) {
                return Err(chronoflow_core::Error::DuplicateColumn(meta.label.clone()).into());
            }
        }
        let mut key_cols = Vec::new();
        let mut key_values: Vec<Value> = Vec::new();
        let mut cols = Vec::with_capacity(kept.len());
        let mut col_map = Vec::with_capacity(kept.len());
        for (j, meta) in kept {
            if let Some(v) = self.key.label_value(&self.cols[j].label) {
                key_cols.push(meta.clone());
                key_values.push(v.clone());
            }
            col_map.push(self.col_map[j]);
            cols.push(meta);
        }
        Ok(Self {
            cols,
            key: GroupKey::new(key_cols, key_values)?,
            col_map,
        })
    }

    /// Insert `meta` right after column `j`, fed by the same input column.
    /// The key is unchanged.
    pub(crate) fn insert_after(mut self, j: usize, meta: ColMeta) -> Result<Self> {
        if col_idx(&meta.label, &self.cols).is_some() {
            return Err(chronoflow_core::Error::DuplicateColumn(meta.label).into());
        }
        let src = self.col_map[j];
        self.cols.insert(j + 1, meta);
        self.col_map.insert(j + 1, src);
        Ok(self)
    }
}
