//! The closed set of column types and the dynamically-typed [`Value`].
//!
//! Hot paths never go through `Value`; they dispatch once per chunk on the
//! column's type and then work on typed slices (see [`crate::column`]).

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::time::Time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColType {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Time,
}

impl ColType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColType::Int | ColType::UInt | ColType::Float)
    }
}

impl fmt::Display for ColType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColType::Bool => "bool",
            ColType::Int => "int",
            ColType::UInt => "uint",
            ColType::Float => "float",
            ColType::String => "string",
            ColType::Time => "time",
        };
        f.write_str(s)
    }
}

/// Column metadata: label and type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColMeta {
    pub label: String,
    pub col_type: ColType,
}

impl ColMeta {
    pub fn new(label: impl Into<String>, col_type: ColType) -> Self {
        Self {
            label: label.into(),
            col_type,
        }
    }
}

/// Index of the column labelled `label`, if any.
pub fn col_idx(label: &str, cols: &[ColMeta]) -> Option<usize> {
    cols.iter().position(|c| c.label == label)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Time(Time),
}

impl Value {
    pub fn col_type(&self) -> ColType {
        match self {
            Value::Bool(_) => ColType::Bool,
            Value::Int(_) => ColType::Int,
            Value::UInt(_) => ColType::UInt,
            Value::Float(_) => ColType::Float,
            Value::String(_) => ColType::String,
            Value::Time(_) => ColType::Time,
        }
    }

    pub fn as_time(&self) -> Option<Time> {
        match self {
            Value::Time(t) => Some(*t),
            _ => None,
        }
    }
}

/// Hashable bit pattern of a float: -0.0 folds into 0.0 and every NaN into
/// one, so floats can key hash maps.
pub fn float_bits(f: f64) -> u64 {
    if f.is_nan() {
        f64::NAN.to_bits()
    } else if f == 0.0 {
        0
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => float_bits(*a) == float_bits(*b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::UInt(v) => v.hash(state),
            Value::Float(v) => float_bits(*v).hash(state),
            Value::String(v) => v.hash(state),
            Value::Time(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write_scientific(f, *v),
            Value::String(v) => f.write_str(v),
            Value::Time(v) => write!(f, "{v}"),
        }
    }
}

/// Shortest scientific form with a signed, two-digit minimum exponent:
/// `1.5E+00`, `1E-07`, `+Inf`.
fn write_scientific(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("NaN");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "+Inf" } else { "-Inf" });
    }
    let s = format!("{v:E}");
    let (mantissa, exp) = s.split_once('E').unwrap_or((s.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    write!(f, "{mantissa}E{sign}{:02}", exp.unsigned_abs())
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Time> for Value {
    fn from(v: Time) -> Self {
        Value::Time(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn float_values_hash_by_normalized_bits() {
        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        set.insert(Value::Float(-0.0));
        set.insert(Value::Float(f64::NAN));
        set.insert(Value::Float(-f64::NAN));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn values_of_different_types_differ() {
        assert_ne!(Value::Int(1), Value::UInt(1));
        assert_eq!(Value::from("a"), Value::String("a".into()));
    }

    #[test]
    fn float_renders_scientific() {
        assert_eq!(Value::Float(1.5).to_string(), "1.5E+00");
        assert_eq!(Value::Float(1200.0).to_string(), "1.2E+03");
        assert_eq!(Value::Float(1e-7).to_string(), "1E-07");
        assert_eq!(Value::Float(1e100).to_string(), "1E+100");
        assert_eq!(Value::Float(0.0).to_string(), "0E+00");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_string(), "-Inf");
    }
}
