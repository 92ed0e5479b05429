//! Tracing hooks.
//!
//! No-ops unless the `tracing` feature is enabled. Subscribers are the
//! host's business.

use chronoflow_core::group_key::GroupKey;

#[cfg(feature = "tracing")]
pub fn partition_opened(op: &'static str, key: &GroupKey) {
    tracing::trace!(op, key = %key, "partition opened");
}

#[cfg(not(feature = "tracing"))]
pub fn partition_opened(_op: &'static str, _key: &GroupKey) { /* no-op */
}

#[cfg(feature = "tracing")]
pub fn table_processed(op: &'static str, key: &GroupKey, rows: usize) {
    tracing::trace!(op, key = %key, rows, "table processed");
}

#[cfg(not(feature = "tracing"))]
pub fn table_processed(_op: &'static str, _key: &GroupKey, _rows: usize) { /* no-op */
}

#[cfg(feature = "tracing")]
pub fn operator_finished(op: &'static str, err: Option<&chronoflow_core::Error>) {
    match err {
        Some(e) => tracing::debug!(op, error = %e, "finished with error"),
        None => tracing::debug!(op, "finished"),
    }
}

#[cfg(not(feature = "tracing"))]
pub fn operator_finished(_op: &'static str, _err: Option<&chronoflow_core::Error>) { /* no-op */
}

#[cfg(feature = "tracing")]
pub fn fallback(op: &'static str, detail: &str) {
    tracing::debug!(op, detail, "permissive fallback");
}

#[cfg(not(feature = "tracing"))]
pub fn fallback(_op: &'static str, _detail: &str) { /* no-op */
}

#[cfg(feature = "tracing")]
pub fn protocol_violation(op: &'static str, detail: &str) {
    tracing::warn!(op, detail, "protocol violation");
}

#[cfg(not(feature = "tracing"))]
pub fn protocol_violation(_op: &'static str, _detail: &str) { /* no-op */
}
