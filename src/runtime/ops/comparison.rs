//! Relational operators
//!
//! Every relational family exists in a signed and an unsigned integer form:
//! signed treats the high bit as a sign, unsigned treats the whole pattern
//! as magnitude. Floats use the ordered comparisons (through the signed
//! operator names); the unsigned forms are integer-only. The result is
//! always the smallest integer kind holding 0 or 1, i.e. i32.

use super::{kind_fault, want_same_kind, Fault, Value};
use crate::ast::CompareOp;

/// Apply a relational operator. Both operands must share one kind.
pub fn compare(op: CompareOp, lhs: Value, rhs: Value) -> Result<Value, Fault> {
    want_same_kind(&lhs, &rhs)?;
    let outcome = match (lhs, rhs) {
        (Value::I32(a), Value::I32(b)) => int_compare(op, i64::from(a), i64::from(b), a as u32 as u64, b as u32 as u64),
        (Value::I64(a), Value::I64(b)) => int_compare(op, a, b, a as u64, b as u64),
        (Value::F32(a), Value::F32(b)) => float_compare(op, f64::from(a), f64::from(b), &lhs),
        (Value::F64(a), Value::F64(b)) => float_compare(op, a, b, &lhs),
        _ => unreachable!(),
    }?;
    Ok(Value::I32(outcome as i32))
}

fn int_compare(op: CompareOp, s1: i64, s2: i64, u1: u64, u2: u64) -> Result<bool, Fault> {
    Ok(match op {
        CompareOp::Eq => s1 == s2,
        CompareOp::Ne => s1 != s2,
        CompareOp::LtS => s1 < s2,
        CompareOp::LtU => u1 < u2,
        CompareOp::LeS => s1 <= s2,
        CompareOp::LeU => u1 <= u2,
        CompareOp::GtS => s1 > s2,
        CompareOp::GtU => u1 > u2,
        CompareOp::GeS => s1 >= s2,
        CompareOp::GeU => u1 >= u2,
    })
}

fn float_compare(op: CompareOp, a: f64, b: f64, lhs: &Value) -> Result<bool, Fault> {
    Ok(match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::LtS => a < b,
        CompareOp::LeS => a <= b,
        CompareOp::GtS => a > b,
        CompareOp::GeS => a >= b,
        // Unsigned orderings have no float meaning
        _ => return Err(kind_fault("i32 or i64", 0, lhs)),
    })
}
