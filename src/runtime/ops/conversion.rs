//! Conversions between value kinds
//!
//! Float-to-integer truncation rounds toward zero and never faults: the
//! unsigned-target form takes the truncated magnitude modulo 2^width and
//! reinterprets the low bits as the target kind, while negative, non-finite,
//! or >= 2^width inputs collapse to the target's zero. The signed-target
//! form mirrors that policy for its own range. This is observable behavior
//! pinned by the conformance vectors; later instruction-set revisions trap
//! here instead, and this interpreter deliberately does not.

use super::{kind_fault, Fault, Value};
use crate::ast::ConvertOp;

/// Apply a conversion operator.
pub fn convert(op: ConvertOp, operand: Value) -> Result<Value, Fault> {
    match op {
        ConvertOp::TruncToI32S => float_operand(operand).map(|v| Value::I32(trunc_i32_s(v))),
        ConvertOp::TruncToI32U => float_operand(operand).map(|v| Value::I32(trunc_i32_u(v))),
        ConvertOp::TruncToI64S => float_operand(operand).map(|v| Value::I64(trunc_i64_s(v))),
        ConvertOp::TruncToI64U => float_operand(operand).map(|v| Value::I64(trunc_i64_u(v))),

        ConvertOp::WrapToI32 => match operand {
            Value::I64(v) => Ok(Value::I32(v as i32)),
            v => Err(kind_fault("i64", 0, &v)),
        },
        ConvertOp::ExtendToI64S => match operand {
            Value::I32(v) => Ok(Value::I64(i64::from(v))),
            v => Err(kind_fault("i32", 0, &v)),
        },
        ConvertOp::ExtendToI64U => match operand {
            Value::I32(v) => Ok(Value::I64(i64::from(v as u32))),
            v => Err(kind_fault("i32", 0, &v)),
        },

        ConvertOp::ConvertToF32S => int_operand(operand).map(|v| Value::F32(v as f32)),
        ConvertOp::ConvertToF32U => uint_operand(operand).map(|v| Value::F32(v as f32)),
        ConvertOp::ConvertToF64S => int_operand(operand).map(|v| Value::F64(v as f64)),
        ConvertOp::ConvertToF64U => uint_operand(operand).map(|v| Value::F64(v as f64)),

        ConvertOp::PromoteToF64 => match operand {
            Value::F32(v) => Ok(Value::F64(f64::from(v))),
            v => Err(kind_fault("f32", 0, &v)),
        },
        ConvertOp::DemoteToF32 => match operand {
            Value::F64(v) => Ok(Value::F32(v as f32)),
            v => Err(kind_fault("f64", 0, &v)),
        },
    }
}

fn float_operand(v: Value) -> Result<f64, Fault> {
    match v {
        Value::F32(v) => Ok(f64::from(v)),
        Value::F64(v) => Ok(v),
        v => Err(kind_fault("f32 or f64", 0, &v)),
    }
}

fn int_operand(v: Value) -> Result<i64, Fault> {
    match v {
        Value::I32(v) => Ok(i64::from(v)),
        Value::I64(v) => Ok(v),
        v => Err(kind_fault("i32 or i64", 0, &v)),
    }
}

fn uint_operand(v: Value) -> Result<u64, Fault> {
    match v {
        Value::I32(v) => Ok(u64::from(v as u32)),
        Value::I64(v) => Ok(v as u64),
        v => Err(kind_fault("i32 or i64", 0, &v)),
    }
}

const TWO_POW_31: f64 = 2147483648.0;
const TWO_POW_32: f64 = 4294967296.0;
const TWO_POW_63: f64 = 9223372036854775808.0;
const TWO_POW_64: f64 = 18446744073709551616.0;

fn trunc_i32_u(x: f64) -> i32 {
    let t = x.trunc();
    if !t.is_finite() || t < 0.0 || t >= TWO_POW_32 {
        return 0;
    }
    t as u32 as i32
}

fn trunc_i64_u(x: f64) -> i64 {
    let t = x.trunc();
    if !t.is_finite() || t < 0.0 || t >= TWO_POW_64 {
        return 0;
    }
    t as u64 as i64
}

fn trunc_i32_s(x: f64) -> i32 {
    let t = x.trunc();
    if !t.is_finite() || t < -TWO_POW_31 || t >= TWO_POW_31 {
        return 0;
    }
    t as i32
}

fn trunc_i64_s(x: f64) -> i64 {
    let t = x.trunc();
    if !t.is_finite() || t < -TWO_POW_63 || t >= TWO_POW_63 {
        return 0;
    }
    t as i64
}
