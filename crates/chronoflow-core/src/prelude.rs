//! Convenient re-exports for downstream crates.

pub use crate::builder::{
    add_table_cols, add_table_key_cols, append_cols_range,
    append_mapped_record_with_defaults, append_record, TableBuilder,
};
pub use crate::cache::TableBuilderCache;
pub use crate::column::{Column, Primitive};
pub use crate::config::EngineConfig;
pub use crate::dataset::{CollectingSink, Dataset, TableSink};
pub use crate::error::{Error, Result};
pub use crate::group_key::GroupKey;
pub use crate::id::DatasetId;
pub use crate::table::{ColReader, Table};
pub use crate::time::{Bounds, Duration, Time};
pub use crate::types::{col_idx, ColMeta, ColType, Value};
