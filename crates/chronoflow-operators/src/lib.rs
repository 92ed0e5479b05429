#![forbid(unsafe_code)]
//! chronoflow-operators: streaming transformations over grouped tables.
//!
//! Every operator implements [`Transformation`]: it is fed whole tables, one
//! group key at a time, writes its output through a
//! [`Dataset`](chronoflow_core::dataset::Dataset), and emits when finished.
//!
//! Design intent:
//! - Per-partition state lives in a dense [`PartitionArena`] indexed by
//!   group key.
//! - Closed-type dispatch happens once per chunk; kernels are generic over
//!   [`Primitive`](chronoflow_core::column::Primitive).
//! - Permissive fallbacks never error; configuration and structural problems
//!   do, and abort the operator.

pub mod traits;

pub mod kernel;
pub mod sink;
pub mod state;
pub mod trace;

mod running;

pub mod cumulative_sum;
pub mod derivative;
pub mod difference;
pub mod distinct;
pub mod join;
pub mod limit;
pub mod pivot;
pub mod schema;
pub mod selector;
pub mod unique;
pub mod window;

pub use sink::TransformationSink;
pub use state::PartitionArena;
pub use traits::{OpError, Result, Transformation};
