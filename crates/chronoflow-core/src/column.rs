//! Typed column storage and the [`Primitive`] trait that maps each Rust
//! element type onto its [`ColType`].
//!
//! Operators dispatch on [`Column`] once per chunk and then run a generic
//! kernel over `&[T]`, instead of switching on the type row by row.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::Time;
use crate::types::{ColType, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
    String(Vec<String>),
    Time(Vec<Time>),
}

impl Column {
    pub fn new(col_type: ColType) -> Self {
        match col_type {
            ColType::Bool => Column::Bool(Vec::new()),
            ColType::Int => Column::Int(Vec::new()),
            ColType::UInt => Column::UInt(Vec::new()),
            ColType::Float => Column::Float(Vec::new()),
            ColType::String => Column::String(Vec::new()),
            ColType::Time => Column::Time(Vec::new()),
        }
    }

    pub fn col_type(&self) -> ColType {
        match self {
            Column::Bool(_) => ColType::Bool,
            Column::Int(_) => ColType::Int,
            Column::UInt(_) => ColType::UInt,
            Column::Float(_) => ColType::Float,
            Column::String(_) => ColType::String,
            Column::Time(_) => ColType::Time,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::UInt(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::String(v) => v.len(),
            Column::Time(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at row `i`. Panics when `i` is out of range, like slice indexing.
    pub fn value(&self, i: usize) -> Value {
        match self {
            Column::Bool(v) => Value::Bool(v[i]),
            Column::Int(v) => Value::Int(v[i]),
            Column::UInt(v) => Value::UInt(v[i]),
            Column::Float(v) => Value::Float(v[i]),
            Column::String(v) => Value::String(v[i].clone()),
            Column::Time(v) => Value::Time(v[i]),
        }
    }

    pub fn push_value(&mut self, value: Value) -> Result<()> {
        match (self, value) {
            (Column::Bool(v), Value::Bool(x)) => v.push(x),
            (Column::Int(v), Value::Int(x)) => v.push(x),
            (Column::UInt(v), Value::UInt(x)) => v.push(x),
            (Column::Float(v), Value::Float(x)) => v.push(x),
            (Column::String(v), Value::String(x)) => v.push(x),
            (Column::Time(v), Value::Time(x)) => v.push(x),
            (col, value) => {
                return Err(Error::TypeMismatch {
                    label: String::new(),
                    expected: col.col_type(),
                    actual: value.col_type(),
                })
            }
        }
        Ok(())
    }

    pub fn set_value(&mut self, i: usize, value: Value) -> Result<()> {
        let len = self.len();
        if i >= len {
            return Err(Error::Invariant(format!(
                "row {i} out of range for column of length {len}"
            )));
        }
        match (self, value) {
            (Column::Bool(v), Value::Bool(x)) => v[i] = x,
            (Column::Int(v), Value::Int(x)) => v[i] = x,
            (Column::UInt(v), Value::UInt(x)) => v[i] = x,
            (Column::Float(v), Value::Float(x)) => v[i] = x,
            (Column::String(v), Value::String(x)) => v[i] = x,
            (Column::Time(v), Value::Time(x)) => v[i] = x,
            (col, value) => {
                return Err(Error::TypeMismatch {
                    label: String::new(),
                    expected: col.col_type(),
                    actual: value.col_type(),
                })
            }
        }
        Ok(())
    }

    /// Append `n` default values.
    pub fn grow(&mut self, n: usize) {
        let len = self.len() + n;
        match self {
            Column::Bool(v) => v.resize(len, false),
            Column::Int(v) => v.resize(len, 0),
            Column::UInt(v) => v.resize(len, 0),
            Column::Float(v) => v.resize(len, 0.0),
            Column::String(v) => v.resize(len, String::new()),
            Column::Time(v) => v.resize(len, Time::default()),
        }
    }

    /// Append rows `[start, stop)` of `src`, which must have the same type.
    pub fn extend_from(&mut self, src: &Column, start: usize, stop: usize) -> Result<()> {
        match (self, src) {
            (Column::Bool(d), Column::Bool(s)) => d.extend_from_slice(&s[start..stop]),
            (Column::Int(d), Column::Int(s)) => d.extend_from_slice(&s[start..stop]),
            (Column::UInt(d), Column::UInt(s)) => d.extend_from_slice(&s[start..stop]),
            (Column::Float(d), Column::Float(s)) => d.extend_from_slice(&s[start..stop]),
            (Column::String(d), Column::String(s)) => d.extend_from_slice(&s[start..stop]),
            (Column::Time(d), Column::Time(s)) => d.extend_from_slice(&s[start..stop]),
            (d, s) => {
                return Err(Error::TypeMismatch {
                    label: String::new(),
                    expected: d.col_type(),
                    actual: s.col_type(),
                })
            }
        }
        Ok(())
    }
}

/// Rust element type of one [`ColType`].
pub trait Primitive: Clone + Sized + 'static {
    const COL_TYPE: ColType;

    fn slice(col: &Column) -> Option<&[Self]>;
    fn vec_mut(col: &mut Column) -> Option<&mut Vec<Self>>;
    fn into_value(self) -> Value;
}

macro_rules! impl_primitive {
    ($t:ty, $variant:ident) => {
        impl Primitive for $t {
            const COL_TYPE: ColType = ColType::$variant;

            fn slice(col: &Column) -> Option<&[Self]> {
                match col {
                    Column::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn vec_mut(col: &mut Column) -> Option<&mut Vec<Self>> {
                match col {
                    Column::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl From<Vec<$t>> for Column {
            fn from(v: Vec<$t>) -> Self {
                Column::$variant(v)
            }
        }
    };
}

impl_primitive!(bool, Bool);
impl_primitive!(i64, Int);
impl_primitive!(u64, UInt);
impl_primitive!(f64, Float);
impl_primitive!(String, String);
impl_primitive!(Time, Time);

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::String(v.into_iter().map(str::to_string).collect())
    }
}
