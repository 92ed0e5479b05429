//! chronoflow: streaming time-series transformations over grouped tables.
//!
//! Facade over the workspace crates. Hosts usually want [`core`] for the
//! table model and datasets and [`operators`] for the transformations.

pub use chronoflow_core as core;
pub use chronoflow_operators as operators;

pub use chronoflow_core::{Error, Result};
pub use chronoflow_operators::{OpError, Transformation, TransformationSink};
