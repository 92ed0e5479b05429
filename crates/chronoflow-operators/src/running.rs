//! Shared pieces of the running aggregates (difference, derivative).

use chronoflow_core::types::ColType;

/// Whether an aggregate replaces column `label` of type `col_type`.
pub(crate) fn aggregated(columns: &[String], label: &str, col_type: ColType) -> bool {
    col_type.is_numeric() && columns.iter().any(|c| c == label)
}

/// Drops the first row of a partition unless told to keep it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FirstRow {
    keep_first: bool,
    seen: bool,
}

impl FirstRow {
    pub(crate) fn new(keep_first: bool) -> Self {
        Self {
            keep_first,
            seen: false,
        }
    }

    /// Number of leading rows of a chunk of `len` rows to drop.
    pub(crate) fn skip(&mut self, len: usize) -> usize {
        if self.seen || len == 0 {
            return 0;
        }
        self.seen = true;
        usize::from(!self.keep_first)
    }
}
