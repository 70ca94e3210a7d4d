//! Unary and binary arithmetic
//!
//! Integer arithmetic is two's-complement modular: add/sub/mul wrap, and
//! signed division wraps too, so `MIN / -1` yields `MIN` again instead of
//! faulting. Signed division truncates toward zero and the remainder's sign
//! follows the dividend; the unsigned variants reinterpret both bit patterns
//! and are independent of the signed ones. Division or remainder by zero is
//! the only arithmetic fault.

use super::{kind_fault, want_same_kind, Fault, Value};
use crate::ast::{BinaryOp, UnaryOp};

/// Apply a unary operator.
pub fn unary(op: UnaryOp, operand: Value) -> Result<Value, Fault> {
    match (op, operand) {
        (UnaryOp::Clz, Value::I32(v)) => Ok(Value::I32(v.leading_zeros() as i32)),
        (UnaryOp::Clz, Value::I64(v)) => Ok(Value::I64(v.leading_zeros() as i64)),
        (UnaryOp::Ctz, Value::I32(v)) => Ok(Value::I32(v.trailing_zeros() as i32)),
        (UnaryOp::Ctz, Value::I64(v)) => Ok(Value::I64(v.trailing_zeros() as i64)),
        (UnaryOp::Popcnt, Value::I32(v)) => Ok(Value::I32(v.count_ones() as i32)),
        (UnaryOp::Popcnt, Value::I64(v)) => Ok(Value::I64(v.count_ones() as i64)),
        (UnaryOp::Clz, v) | (UnaryOp::Ctz, v) | (UnaryOp::Popcnt, v) => {
            Err(kind_fault("i32 or i64", 0, &v))
        }

        (UnaryOp::Neg, Value::F32(v)) => Ok(Value::F32(-v)),
        (UnaryOp::Neg, Value::F64(v)) => Ok(Value::F64(-v)),
        (UnaryOp::Abs, Value::F32(v)) => Ok(Value::F32(v.abs())),
        (UnaryOp::Abs, Value::F64(v)) => Ok(Value::F64(v.abs())),
        (UnaryOp::Sqrt, Value::F32(v)) => Ok(Value::F32(v.sqrt())),
        (UnaryOp::Sqrt, Value::F64(v)) => Ok(Value::F64(v.sqrt())),
        (UnaryOp::Ceil, Value::F32(v)) => Ok(Value::F32(v.ceil())),
        (UnaryOp::Ceil, Value::F64(v)) => Ok(Value::F64(v.ceil())),
        (UnaryOp::Floor, Value::F32(v)) => Ok(Value::F32(v.floor())),
        (UnaryOp::Floor, Value::F64(v)) => Ok(Value::F64(v.floor())),
        (_, v) => Err(kind_fault("f32 or f64", 0, &v)),
    }
}

/// Apply a binary operator. Both operands must share one kind.
pub fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, Fault> {
    want_same_kind(&lhs, &rhs)?;
    match (lhs, rhs) {
        (Value::I32(a), Value::I32(b)) => i32_binary(op, a, b),
        (Value::I64(a), Value::I64(b)) => i64_binary(op, a, b),
        (Value::F32(a), Value::F32(b)) => f32_binary(op, a, b).map(Value::F32),
        (Value::F64(a), Value::F64(b)) => f64_binary(op, a, b).map(Value::F64),
        // want_same_kind leaves only matched pairs
        _ => unreachable!(),
    }
}

fn i32_binary(op: BinaryOp, a: i32, b: i32) -> Result<Value, Fault> {
    let v = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::DivS => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::DivU => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            ((a as u32) / (b as u32)) as i32
        }
        BinaryOp::RemS => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            a.wrapping_rem(b)
        }
        BinaryOp::RemU => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            ((a as u32) % (b as u32)) as i32
        }
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::ShrS => a.wrapping_shr(b as u32),
        BinaryOp::ShrU => ((a as u32).wrapping_shr(b as u32)) as i32,
        _ => return Err(kind_fault("f32 or f64", 0, &Value::I32(a))),
    };
    Ok(Value::I32(v))
}

fn i64_binary(op: BinaryOp, a: i64, b: i64) -> Result<Value, Fault> {
    let v = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::DivS => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::DivU => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            ((a as u64) / (b as u64)) as i64
        }
        BinaryOp::RemS => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            a.wrapping_rem(b)
        }
        BinaryOp::RemU => {
            if b == 0 {
                return Err(Fault::DivideByZero);
            }
            ((a as u64) % (b as u64)) as i64
        }
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::ShrS => a.wrapping_shr(b as u32),
        BinaryOp::ShrU => ((a as u64).wrapping_shr(b as u32)) as i64,
        _ => return Err(kind_fault("f32 or f64", 0, &Value::I64(a))),
    };
    Ok(Value::I64(v))
}

fn f32_binary(op: BinaryOp, a: f32, b: f32) -> Result<f32, Fault> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Min => Ok(a.min(b)),
        BinaryOp::Max => Ok(a.max(b)),
        BinaryOp::CopySign => Ok(a.copysign(b)),
        _ => Err(kind_fault("i32 or i64", 0, &Value::F32(a))),
    }
}

fn f64_binary(op: BinaryOp, a: f64, b: f64) -> Result<f64, Fault> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Min => Ok(a.min(b)),
        BinaryOp::Max => Ok(a.max(b)),
        BinaryOp::CopySign => Ok(a.copysign(b)),
        _ => Err(kind_fault("i32 or i64", 0, &Value::F64(a))),
    }
}
