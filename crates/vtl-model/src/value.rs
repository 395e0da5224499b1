//! Scalar values: a closed tagged union with null-aware total ordering.
//!
//! The variant set is fixed so that every operator can be checked for
//! missing cases at compile time. Host values outside the closed set are
//! rejected with `UnsupportedType` at construction.

use std::cmp::Ordering as Cmp;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::DataType;
use crate::error::{Result, VtlError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VtlValue {
    Null,
    Str(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl VtlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, VtlValue::Null)
    }

    /// The declared type of the payload; `None` for the null marker.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            VtlValue::Null => None,
            VtlValue::Str(_) => Some(DataType::String),
            VtlValue::Integer(_) => Some(DataType::Integer),
            VtlValue::Float(_) => Some(DataType::Float),
            VtlValue::Boolean(_) => Some(DataType::Boolean),
            VtlValue::Date(_) => Some(DataType::Date),
        }
    }

    /// Null-first total comparison.
    ///
    /// `Null` sorts before any value. Integers and floats are compared
    /// numerically in a common domain, so `Integer(1) == Float(1.0)`.
    /// Comparing fundamentally incompatible payloads is a `TypeMismatch`.
    pub fn compare(&self, other: &VtlValue) -> Result<Cmp> {
        use VtlValue::*;
        match (self, other) {
            (Null, Null) => Ok(Cmp::Equal),
            (Null, _) => Ok(Cmp::Less),
            (_, Null) => Ok(Cmp::Greater),
            (Str(a), Str(b)) => Ok(a.cmp(b)),
            (Integer(a), Integer(b)) => Ok(a.cmp(b)),
            (Float(a), Float(b)) => Ok(cmp_float(*a, *b)),
            (Integer(a), Float(b)) => Ok(cmp_float(*a as f64, *b)),
            (Float(a), Integer(b)) => Ok(cmp_float(*a, *b as f64)),
            (Boolean(a), Boolean(b)) => Ok(a.cmp(b)),
            (Date(a), Date(b)) => Ok(a.cmp(b)),
            (left, right) => Err(VtlError::TypeMismatch {
                // Both null arms returned above, so the payload types exist.
                left: left.data_type().unwrap_or(DataType::String),
                right: right.data_type().unwrap_or(DataType::String),
            }),
        }
    }
}

/// Floats compare with NaN greatest so sorting stays total.
fn cmp_float(a: f64, b: f64) -> Cmp {
    if a.is_nan() && b.is_nan() {
        Cmp::Equal
    } else if a.is_nan() {
        Cmp::Greater
    } else if b.is_nan() {
        Cmp::Less
    } else {
        a.partial_cmp(&b).unwrap_or(Cmp::Equal)
    }
}

// Host numeric subtypes normalize to the two numeric variants.

impl From<i64> for VtlValue {
    fn from(v: i64) -> Self {
        VtlValue::Integer(v)
    }
}

impl From<i32> for VtlValue {
    fn from(v: i32) -> Self {
        VtlValue::Integer(v as i64)
    }
}

impl From<f64> for VtlValue {
    fn from(v: f64) -> Self {
        VtlValue::Float(v)
    }
}

impl From<f32> for VtlValue {
    fn from(v: f32) -> Self {
        VtlValue::Float(v as f64)
    }
}

impl From<bool> for VtlValue {
    fn from(v: bool) -> Self {
        VtlValue::Boolean(v)
    }
}

impl From<&str> for VtlValue {
    fn from(v: &str) -> Self {
        VtlValue::Str(v.to_string())
    }
}

impl From<String> for VtlValue {
    fn from(v: String) -> Self {
        VtlValue::Str(v)
    }
}

impl From<DateTime<Utc>> for VtlValue {
    fn from(v: DateTime<Utc>) -> Self {
        VtlValue::Date(v)
    }
}

impl<T: Into<VtlValue>> From<Option<T>> for VtlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(VtlValue::Null)
    }
}

/// Entry point for untyped host values, e.g. rows read by a connector.
///
/// Arrays and objects have no scalar counterpart and are rejected.
impl TryFrom<serde_json::Value> for VtlValue {
    type Error = VtlError;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(VtlValue::Null),
            Value::Bool(b) => Ok(VtlValue::Boolean(b)),
            Value::String(s) => Ok(VtlValue::Str(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(VtlValue::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(VtlValue::Float(f))
                } else {
                    Err(VtlError::UnsupportedType(n.to_string()))
                }
            }
            other @ (Value::Array(_) | Value::Object(_)) => {
                Err(VtlError::UnsupportedType(other.to_string()))
            }
        }
    }
}

impl fmt::Display for VtlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VtlValue::Null => f.write_str("null"),
            VtlValue::Str(s) => write!(f, "\"{}\"", s),
            VtlValue::Integer(i) => write!(f, "{}", i),
            VtlValue::Float(v) => write!(f, "{}", v),
            VtlValue::Boolean(b) => write!(f, "{}", b),
            VtlValue::Date(d) => write!(f, "{}", d.to_rfc3339()),
        }
    }
}
