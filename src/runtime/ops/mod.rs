//! Arithmetic subsystem
//!
//! Pure functions over [`Value`]s, organized by operator family. The
//! evaluator delegates every `Unary`/`Binary`/`Compare`/`Convert` node here.
//! Mixing kinds within one operation is always a type fault naming the
//! offending operand position and the expected kind.

pub mod comparison;
pub mod conversion;
pub mod numeric;

pub(crate) use crate::runtime::{Fault, Value};

use crate::ast::ValueType;

/// Require an i32 operand, faulting with the operand's position otherwise.
pub(crate) fn want_i32(value: Value, operand: usize) -> Result<i32, Fault> {
    value.as_i32().ok_or_else(|| Fault::TypeMismatch {
        operand,
        expected: ValueType::I32.to_string(),
        actual: value.typ(),
    })
}

/// Require both operands to be of the same kind; the right operand is the
/// offending one on disagreement (the left fixes the operation's kind).
pub(crate) fn want_same_kind(lhs: &Value, rhs: &Value) -> Result<(), Fault> {
    if lhs.typ() != rhs.typ() {
        return Err(Fault::TypeMismatch {
            operand: 1,
            expected: lhs.typ().to_string(),
            actual: rhs.typ(),
        });
    }
    Ok(())
}

/// Type fault for an operator applied outside its kind family.
pub(crate) fn kind_fault(expected: &str, operand: usize, actual: &Value) -> Fault {
    Fault::TypeMismatch {
        operand,
        expected: expected.to_string(),
        actual: actual.typ(),
    }
}
