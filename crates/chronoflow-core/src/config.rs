//! Engine configuration shared by every operator.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::time::Duration;

/// Default column labels and units. Operator specs read their defaults from
/// here, so a host can relabel the conventional columns in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timestamp column used by derivative and window.
    pub time_column: String,

    /// Value column used by the selectors, distinct, unique and running aggregates.
    pub value_column: String,

    /// Window start/stop columns.
    pub start_column: String,
    pub stop_column: String,

    /// Unit a derivative's rate is expressed in.
    pub derivative_unit: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_column: "_time".to_string(),
            value_column: "_value".to_string(),
            start_column: "_start".to_string(),
            stop_column: "_stop".to_string(),
            derivative_unit: Duration::from_secs(1),
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `CHRONOFLOW_TIME_COLUMN`
    /// - `CHRONOFLOW_VALUE_COLUMN`
    /// - `CHRONOFLOW_START_COLUMN`
    /// - `CHRONOFLOW_STOP_COLUMN`
    /// - `CHRONOFLOW_DERIVATIVE_UNIT_NS`: derivative unit in nanoseconds
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("CHRONOFLOW_TIME_COLUMN") {
            cfg.time_column = s;
        }

        if let Ok(s) = std::env::var("CHRONOFLOW_VALUE_COLUMN") {
            cfg.value_column = s;
        }

        if let Ok(s) = std::env::var("CHRONOFLOW_START_COLUMN") {
            cfg.start_column = s;
        }

        if let Ok(s) = std::env::var("CHRONOFLOW_STOP_COLUMN") {
            cfg.stop_column = s;
        }

        if let Ok(s) = std::env::var("CHRONOFLOW_DERIVATIVE_UNIT_NS") {
            if let Ok(v) = s.parse::<i64>() {
                if v > 0 {
                    cfg.derivative_unit = Duration::from_nanos(v);
                }
            }
        }

        cfg
    }

    /// Parse a JSON document; missing fields keep their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_overrides_merge_with_defaults() {
        let cfg = EngineConfig::from_json(r#"{"value_column":"v"}"#).expect("parse");
        assert_eq!(cfg.value_column, "v");
        assert_eq!(cfg.time_column, "_time");
        assert_eq!(cfg.derivative_unit, Duration::from_secs(1));
    }

    #[test]
    fn env_overrides_defaults() {
        std::env::set_var("CHRONOFLOW_VALUE_COLUMN", "reading");
        std::env::set_var("CHRONOFLOW_DERIVATIVE_UNIT_NS", "60000000000");
        std::env::set_var("CHRONOFLOW_STOP_COLUMN", "end");
        let cfg = EngineConfig::from_env();
        std::env::remove_var("CHRONOFLOW_VALUE_COLUMN");
        std::env::remove_var("CHRONOFLOW_DERIVATIVE_UNIT_NS");
        std::env::remove_var("CHRONOFLOW_STOP_COLUMN");

        assert_eq!(cfg.value_column, "reading");
        assert_eq!(cfg.stop_column, "end");
        assert_eq!(cfg.derivative_unit, Duration::from_mins(1));
        assert_eq!(cfg.time_column, "_time");

        // A non-positive unit keeps the default.
        std::env::set_var("CHRONOFLOW_DERIVATIVE_UNIT_NS", "-5");
        let unit = EngineConfig::from_env().derivative_unit;
        std::env::remove_var("CHRONOFLOW_DERIVATIVE_UNIT_NS");
        assert_eq!(unit, Duration::from_secs(1));
    }
}
