#![forbid(unsafe_code)]
//! chronoflow-core: the table model shared by every streaming operator.
//!
//! A [`Table`](table::Table) is a group key, an ordered column list and one or
//! more column-oriented chunks. Operators read chunks, write into a
//! [`TableBuilder`](builder::TableBuilder) obtained from a
//! [`TableBuilderCache`](cache::TableBuilderCache) and hand finished tables to
//! the downstream [`TableSink`](dataset::TableSink) through a
//! [`Dataset`](dataset::Dataset).

pub mod builder;
pub mod cache;
pub mod column;
pub mod config;
pub mod dataset;
pub mod error;
pub mod group_key;
pub mod id;
pub mod prelude;
pub mod table;
pub mod time;
pub mod types;

pub use error::{Error, Result};
