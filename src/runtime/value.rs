//! Runtime value representation

use crate::ast::ValueType;
use fhex::ToHex;
use std::fmt;

/// A runtime value: exactly one of the four numeric kinds.
///
/// Values are immutable once constructed. `PartialEq` follows the native
/// float semantics (NaN != NaN); conformance comparison uses [`Value::same_bits`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// Get the kind of this value
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
        }
    }

    /// The zero value of a kind, used to initialize locals and globals.
    pub fn zero(typ: ValueType) -> Self {
        match typ {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
        }
    }

    /// Convert to i32, returning None if wrong kind
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to i64, returning None if wrong kind
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f32, returning None if wrong kind
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f64, returning None if wrong kind
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Bitwise equality within a kind: integers compare directly, floats
    /// compare their raw bit patterns (so NaN == NaN, and +0.0 != -0.0).
    pub fn same_bits(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }

    /// Create from a kind string and value string (conformance scripts).
    ///
    /// Integers parse as their unsigned decimal bit pattern or as a signed
    /// decimal; floats parse as a decimal bit pattern, a `0x` hex bit
    /// pattern, or (as a fallback) a decimal float literal.
    pub fn from_strings(typ: &str, value: &str) -> Result<Self, String> {
        match typ {
            "i32" => value
                .parse::<u32>()
                .or_else(|_| value.parse::<i32>().map(|v| v as u32))
                .map(|v| Value::I32(v as i32))
                .map_err(|e| format!("Failed to parse i32: {e}")),
            "i64" => value
                .parse::<u64>()
                .or_else(|_| value.parse::<i64>().map(|v| v as u64))
                .map(|v| Value::I64(v as i64))
                .map_err(|e| format!("Failed to parse i64: {e}")),
            "f32" => {
                if let Some(hex) = value.strip_prefix("0x") {
                    u32::from_str_radix(hex, 16)
                        .map(|bits| Value::F32(f32::from_bits(bits)))
                        .map_err(|e| format!("Failed to parse f32 hex: {e}"))
                } else {
                    value
                        .parse::<u32>()
                        .map(|bits| Value::F32(f32::from_bits(bits)))
                        .or_else(|_| value.parse::<f32>().map(Value::F32))
                        .map_err(|e| format!("Failed to parse f32: {e}"))
                }
            }
            "f64" => {
                if let Some(hex) = value.strip_prefix("0x") {
                    u64::from_str_radix(hex, 16)
                        .map(|bits| Value::F64(f64::from_bits(bits)))
                        .map_err(|e| format!("Failed to parse f64 hex: {e}"))
                } else {
                    value
                        .parse::<u64>()
                        .map(|bits| Value::F64(f64::from_bits(bits)))
                        .or_else(|_| value.parse::<f64>().map(Value::F64))
                        .map_err(|e| format!("Failed to parse f64: {e}"))
                }
            }
            t => Err(format!("Unknown value kind: {t}")),
        }
    }

    /// Convert to kind and value strings for conformance comparison.
    pub fn to_strings(&self) -> (String, String) {
        match self {
            Value::I32(v) => ("i32".to_string(), (*v as u32).to_string()),
            Value::I64(v) => ("i64".to_string(), (*v as u64).to_string()),
            Value::F32(v) => ("f32".to_string(), v.to_bits().to_string()),
            Value::F64(v) => ("f64".to_string(), v.to_bits().to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
        }
    }
}
