use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chronoflow_core::types::ColMeta;

use super::{BuilderContext, SchemaMutator};
use crate::traits::{OpError, Result};

/// Compiled label function supplied by the host. `Err` carries the
/// evaluation failure message.
pub type LabelFn = Arc<dyn Fn(&str) -> std::result::Result<String, String> + Send + Sync>;

/// Compiled label predicate supplied by the host.
pub type LabelPredicate = Arc<dyn Fn(&str) -> std::result::Result<bool, String> + Send + Sync>;

#[derive(Clone)]
enum Renaming {
    Map(HashMap<String, String>),
    Fn(LabelFn),
}

/// Renames columns; group-key columns are renamed with them.
#[derive(Clone)]
pub struct Rename {
    how: Renaming,
}

impl Rename {
    /// Static `old -> new` table. Every old label must exist.
    pub fn columns<K: Into<String>, V: Into<String>>(map: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            how: Renaming::Map(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// New label for every column computed by `f`.
    pub fn with_fn(f: LabelFn) -> Self {
        Self {
            how: Renaming::Fn(f),
        }
    }
}

impl fmt::Debug for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.how {
            Renaming::Map(m) => f.debug_struct("Rename").field("columns", m).finish(),
            Renaming::Fn(_) => f.debug_struct("Rename").field("fn", &"..").finish(),
        }
    }
}

impl SchemaMutator for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn mutate(&self, ctx: BuilderContext) -> Result<BuilderContext> {
        if let Renaming::Map(m) = &self.how {
            for old in m.keys() {
                ctx.check_col(self.name(), old)?;
            }
        }
        let mut kept = Vec::with_capacity(ctx.cols().len());
        for (j, c) in ctx.cols().iter().enumerate() {
            let label = match &self.how {
                Renaming::Map(m) => m.get(&c.label).cloned().unwrap_or_else(|| c.label.clone()),
                Renaming::Fn(f) => f(&c.label).map_err(OpError::Eval)?,
            };
            kept.push((j, ColMeta::new(label, c.col_type)));
        }
        ctx.rebuild(kept)
    }
}

#[derive(Clone)]
enum Selection {
    Columns(HashSet<String>),
    Predicate(LabelPredicate),
}

/// Removes columns. `keep` variants drop the complement.
#[derive(Clone)]
pub struct DropKeep {
    selection: Selection,
    keep: bool,
}

impl DropKeep {
    pub fn drop_columns<S: Into<String>>(cols: impl IntoIterator<Item = S>) -> Self {
        Self {
            selection: Selection::Columns(cols.into_iter().map(Into::into).collect()),
            keep: false,
        }
    }

    pub fn keep_columns<S: Into<String>>(cols: impl IntoIterator<Item = S>) -> Self {
        Self {
            keep: true,
            ..Self::drop_columns(cols)
        }
    }

    pub fn drop_where(pred: LabelPredicate) -> Self {
        Self {
            selection: Selection::Predicate(pred),
            keep: false,
        }
    }

    pub fn keep_where(pred: LabelPredicate) -> Self {
        Self {
            selection: Selection::Predicate(pred),
            keep: true,
        }
    }

    fn selected(&self, label: &str) -> Result<bool> {
        match &self.selection {
            Selection::Columns(set) => Ok(set.contains(label)),
            Selection::Predicate(p) => p(label).map_err(OpError::Eval),
        }
    }
}

impl fmt::Debug for DropKeep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("DropKeep");
        match &self.selection {
            Selection::Columns(set) => d.field("columns", set),
            Selection::Predicate(_) => d.field("predicate", &".."),
        };
        d.field("keep", &self.keep).finish()
    }
}

impl SchemaMutator for DropKeep {
    fn name(&self) -> &'static str {
        if self.keep {
            "keep"
        } else {
            "drop"
        }
    }

    fn mutate(&self, ctx: BuilderContext) -> Result<BuilderContext> {
        if let Selection::Columns(set) = &self.selection {
            for label in set {
                ctx.check_col(self.name(), label)?;
            }
        }
        let mut kept = Vec::with_capacity(ctx.cols().len());
        for (j, c) in ctx.cols().iter().enumerate() {
            if self.selected(&c.label)? == self.keep {
                kept.push((j, c.clone()));
            }
        }
        ctx.rebuild(kept)
    }
}

/// Copies `column` as `as_label`, placed right after the original.
#[derive(Debug, Clone)]
pub struct Duplicate {
    pub column: String,
    pub as_label: String,
}

impl Duplicate {
    pub fn new(column: impl Into<String>, as_label: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            as_label: as_label.into(),
        }
    }
}

impl SchemaMutator for Duplicate {
    fn name(&self) -> &'static str {
        "duplicate"
    }

    fn mutate(&self, ctx: BuilderContext) -> Result<BuilderContext> {
        ctx.check_col(self.name(), &self.column)?;
        let Some(j) = ctx.cols().iter().position(|c| c.label == self.column) else {
            return Ok(ctx);
        };
        let meta = ColMeta::new(self.as_label.clone(), ctx.cols()[j].col_type);
        ctx.insert_after(j, meta)
    }
}
