//! Recursive expression evaluator
//!
//! Each expression node evaluates to an [`Outcome`]: normal completion with
//! an optional value, or a pending control transfer (`Break` / `Return`)
//! that the enclosing construct either absorbs or passes outward. Faults
//! travel in the `Err` channel and abort the whole in-flight evaluation.
//!
//! Evaluation is plain recursion with no suspension points. Call depth is
//! bounded by an explicit counter so deeply recursive programs fault with
//! [`Fault::CallStackOverflow`] instead of exhausting the host stack.

use super::instance::Instance;
use super::memory::Memory;
use super::ops;
use super::{Fault, IndexSpace, Outcome, Value};
use crate::ast::{Expr, Function, Module};

/// Default bound on nested interpreted calls.
///
/// Each interpreted call costs several host stack frames, so the bound must
/// fire well before a 2 MiB thread stack is exhausted, debug builds
/// included. Hosts running on generous stacks can raise it per instance
/// with [`Instance::set_call_depth_limit`].
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Per-call state: the local cells, parameters first, then declared locals.
///
/// Label handlers and the return handler of the configuration are realized
/// by the [`Outcome`] propagation discipline rather than stored here; a
/// frame never outlives its call.
pub(crate) struct Frame {
    locals: Vec<Value>,
}

impl Frame {
    fn new(func: &Function, args: Vec<Value>) -> Self {
        let mut locals = args;
        locals.extend(func.locals.iter().map(|&t| Value::zero(t)));
        Frame { locals }
    }

    fn get(&self, idx: u32) -> Result<Value, Fault> {
        self.locals
            .get(idx as usize)
            .copied()
            .ok_or(Fault::UndefinedIndex(IndexSpace::Local, idx))
    }

    /// Overwrite a local cell. Cells keep their declared kind for the whole
    /// call, so the incoming value must match the cell's current kind.
    fn set(&mut self, idx: u32, value: Value) -> Result<(), Fault> {
        let cell = self
            .locals
            .get_mut(idx as usize)
            .ok_or(Fault::UndefinedIndex(IndexSpace::Local, idx))?;
        if cell.typ() != value.typ() {
            return Err(Fault::TypeMismatch {
                operand: 0,
                expected: cell.typ().to_string(),
                actual: value.typ(),
            });
        }
        *cell = value;
        Ok(())
    }
}

/// Evaluate a sub-expression to a concrete value.
///
/// A pending control transfer propagates outward through the enclosing
/// `Ok`; an absent value is a fault, since the surrounding operation needs
/// one.
macro_rules! value_of {
    ($self:expr, $frame:expr, $e:expr) => {
        match $self.eval($frame, $e)? {
            Outcome::Value(Some(v)) => v,
            Outcome::Value(None) => return Err(Fault::NoValueProduced),
            transfer => return Ok(transfer),
        }
    };
}

/// Drives one invocation: walks expression trees against an instance.
pub(crate) struct Evaluator<'m, 'i> {
    instance: &'i mut Instance<'m>,
    depth: usize,
}

impl<'m, 'i> Evaluator<'m, 'i> {
    pub fn new(instance: &'i mut Instance<'m>) -> Self {
        Evaluator { instance, depth: 0 }
    }

    /// Call a module function by index: check arity and argument kinds,
    /// build a fresh frame, evaluate the body, absorb its return handler.
    pub fn invoke_function(&mut self, func_idx: u32, args: Vec<Value>) -> Result<Option<Value>, Fault> {
        if self.depth >= self.instance.max_call_depth() {
            return Err(Fault::CallStackOverflow);
        }
        let module: &'m Module = self.instance.module();
        let func = module
            .functions
            .get(func_idx as usize)
            .ok_or(Fault::UndefinedIndex(IndexSpace::Function, func_idx))?;

        if args.len() != func.params.len() {
            return Err(Fault::ArityMismatch {
                expected: func.params.len(),
                actual: args.len(),
            });
        }
        for (i, (arg, &param)) in args.iter().zip(&func.params).enumerate() {
            if arg.typ() != param {
                return Err(Fault::TypeMismatch {
                    operand: i,
                    expected: param.to_string(),
                    actual: arg.typ(),
                });
            }
        }

        let mut frame = Frame::new(func, args);
        self.depth += 1;
        let outcome = self.eval(&mut frame, &func.body);
        // Re-balanced on the fault path too, so the counter stays honest
        // however the body left.
        self.depth -= 1;
        let value = match outcome? {
            Outcome::Value(v) | Outcome::Return(v) => v,
            // A break can never cross a call boundary; one that reaches the
            // function root names a label that does not exist.
            Outcome::Break { depth, .. } => {
                return Err(Fault::UndefinedIndex(IndexSpace::Label, depth))
            }
        };
        if let Some(expected) = func.result {
            match &value {
                Some(v) if v.typ() == expected => {}
                Some(v) => {
                    return Err(Fault::TypeMismatch {
                        operand: 0,
                        expected: expected.to_string(),
                        actual: v.typ(),
                    })
                }
                None => return Err(Fault::NoValueProduced),
            }
        }
        Ok(value)
    }

    fn eval(&mut self, frame: &mut Frame, expr: &'m Expr) -> Result<Outcome, Fault> {
        match expr {
            Expr::Nop => Ok(Outcome::Value(None)),

            Expr::Block(exprs) => {
                let Some((last, init)) = exprs.split_last() else {
                    return Ok(Outcome::Value(None));
                };
                for e in init {
                    match self.eval(frame, e)? {
                        Outcome::Value(_) => {}
                        transfer => return Ok(transfer),
                    }
                }
                self.eval(frame, last)
            }

            Expr::If { cond, then, otherwise } => {
                let c = ops::want_i32(value_of!(self, frame, cond), 0)?;
                if c != 0 {
                    self.eval(frame, then)
                } else {
                    self.eval(frame, otherwise)
                }
            }

            // A loop never completes on its own. The body runs for effect
            // and the construct re-enters; only a transfer leaves it.
            Expr::Loop(body) => loop {
                match self.eval(frame, body)? {
                    Outcome::Value(_) => continue,
                    transfer => return Ok(transfer),
                }
            },

            Expr::Label(body) => match self.eval(frame, body)? {
                Outcome::Break { depth: 0, value } => Ok(Outcome::Value(value)),
                Outcome::Break { depth, value } => Ok(Outcome::Break { depth: depth - 1, value }),
                other => Ok(other),
            },

            Expr::Break { depth, value } => {
                let carried = match value {
                    Some(e) => Some(value_of!(self, frame, e)),
                    None => None,
                };
                Ok(Outcome::Break {
                    depth: *depth,
                    value: carried,
                })
            }

            Expr::Switch { selector, arms, default } => {
                let sel = value_of!(self, frame, selector);
                let matched = arms.iter().position(|arm| arm.literal.same_bits(&sel));
                let Some(mut idx) = matched else {
                    return self.eval(frame, default);
                };
                // A fall-through arm runs for effect and execution continues
                // into the following arm; falling past the last arm lands on
                // the default.
                loop {
                    let arm = &arms[idx];
                    if !arm.fallthru {
                        return self.eval(frame, &arm.body);
                    }
                    match self.eval(frame, &arm.body)? {
                        Outcome::Value(_) => {}
                        transfer => return Ok(transfer),
                    }
                    idx += 1;
                    if idx == arms.len() {
                        return self.eval(frame, default);
                    }
                }
            }

            Expr::Call { func, args } => {
                let argv = self.eval_args(frame, args)?;
                match argv {
                    Ok(argv) => self.invoke_function(*func, argv).map(Outcome::Value),
                    Err(transfer) => Ok(transfer),
                }
            }

            Expr::CallImport { import, args } => {
                let argv = self.eval_args(frame, args)?;
                match argv {
                    Ok(argv) => {
                        let host = self
                            .instance
                            .import(*import)
                            .ok_or(Fault::UndefinedIndex(IndexSpace::Import, *import))?;
                        host(argv).map(Outcome::Value)
                    }
                    Err(transfer) => Ok(transfer),
                }
            }

            Expr::CallIndirect { table, index, args } => {
                let i = ops::want_i32(value_of!(self, frame, index), 0)?;
                let func_idx = self.instance.table_entry(*table, i as u32)?;
                let argv = self.eval_args(frame, args)?;
                match argv {
                    Ok(argv) => self.invoke_function(func_idx, argv).map(Outcome::Value),
                    Err(transfer) => Ok(transfer),
                }
            }

            Expr::Return(value) => {
                let carried = match value {
                    Some(e) => Some(value_of!(self, frame, e)),
                    None => None,
                };
                Ok(Outcome::Return(carried))
            }

            Expr::GetLocal(idx) => frame.get(*idx).map(|v| Outcome::Value(Some(v))),

            Expr::SetLocal(idx, e) => {
                let v = value_of!(self, frame, e);
                frame.set(*idx, v)?;
                Ok(Outcome::Value(Some(v)))
            }

            Expr::GetGlobal(idx) => self.instance.global(*idx).map(|v| Outcome::Value(Some(v))),

            Expr::SetGlobal(idx, e) => {
                let v = value_of!(self, frame, e);
                self.instance.set_global(*idx, v)?;
                Ok(Outcome::Value(Some(v)))
            }

            Expr::Load { kind, width, sign, addr } => {
                let a = Memory::address(&value_of!(self, frame, addr))?;
                let v = self.instance.memory().load(a, *width, *kind, *sign)?;
                Ok(Outcome::Value(Some(v)))
            }

            Expr::Store { kind, width, addr, value } => {
                let a = Memory::address(&value_of!(self, frame, addr))?;
                let v = value_of!(self, frame, value);
                self.instance.memory_mut().store(a, *width, *kind, v)?;
                Ok(Outcome::Value(Some(v)))
            }

            Expr::Const(v) => Ok(Outcome::Value(Some(*v))),

            Expr::Unary(op, e) => {
                let v = value_of!(self, frame, e);
                ops::numeric::unary(*op, v).map(|v| Outcome::Value(Some(v)))
            }

            Expr::Binary(op, lhs, rhs) => {
                let a = value_of!(self, frame, lhs);
                let b = value_of!(self, frame, rhs);
                ops::numeric::binary(*op, a, b).map(|v| Outcome::Value(Some(v)))
            }

            Expr::Compare(op, lhs, rhs) => {
                let a = value_of!(self, frame, lhs);
                let b = value_of!(self, frame, rhs);
                ops::comparison::compare(*op, a, b).map(|v| Outcome::Value(Some(v)))
            }

            Expr::Convert(op, e) => {
                let v = value_of!(self, frame, e);
                ops::conversion::convert(*op, v).map(|v| Outcome::Value(Some(v)))
            }
        }
    }

    /// Evaluate call arguments left-to-right. A control transfer raised by
    /// an argument abandons the call and propagates as the inner `Err`.
    fn eval_args(&mut self, frame: &mut Frame, args: &'m [Expr]) -> Result<Result<Vec<Value>, Outcome>, Fault> {
        let mut argv = Vec::with_capacity(args.len());
        for e in args {
            match self.eval(frame, e)? {
                Outcome::Value(Some(v)) => argv.push(v),
                Outcome::Value(None) => return Err(Fault::NoValueProduced),
                transfer => return Ok(Err(transfer)),
            }
        }
        Ok(Ok(argv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AccessWidth, BinaryOp, CompareOp, Sign, SwitchArm, UnaryOp, ValueType};
    use crate::runtime::test_utils::test::EvalTest;
    use crate::runtime::{eval, Instance};

    fn i32c(v: i32) -> Expr {
        Expr::Const(Value::I32(v))
    }

    fn boxed(e: Expr) -> Box<Expr> {
        Box::new(e)
    }

    #[test]
    fn test_nop_produces_no_value() {
        assert_eq!(eval(&Expr::Nop).unwrap(), None);
    }

    #[test]
    fn test_const_and_block() {
        assert_eq!(eval(&i32c(7)).unwrap(), Some(Value::I32(7)));
        // All but the last run for effect only
        assert_eq!(
            eval(&Expr::Block(vec![i32c(1), i32c(2), i32c(3)])).unwrap(),
            Some(Value::I32(3))
        );
        assert_eq!(eval(&Expr::Block(vec![])).unwrap(), None);
    }

    #[test]
    fn test_if_selects_on_i32() {
        let cond = |c: i32| Expr::If {
            cond: boxed(i32c(c)),
            then: boxed(i32c(10)),
            otherwise: boxed(i32c(20)),
        };
        assert_eq!(eval(&cond(1)).unwrap(), Some(Value::I32(10)));
        assert_eq!(eval(&cond(-5)).unwrap(), Some(Value::I32(10)));
        assert_eq!(eval(&cond(0)).unwrap(), Some(Value::I32(20)));
    }

    #[test]
    fn test_if_condition_must_be_i32() {
        let e = Expr::If {
            cond: boxed(Expr::Const(Value::F64(1.0))),
            then: boxed(Expr::Nop),
            otherwise: boxed(Expr::Nop),
        };
        assert!(matches!(eval(&e), Err(Fault::TypeMismatch { .. })));
    }

    #[test]
    fn test_label_completes_with_body_value() {
        assert_eq!(eval(&Expr::Label(boxed(i32c(9)))).unwrap(), Some(Value::I32(9)));
    }

    #[test]
    fn test_break_skips_rest_of_block() {
        // (local 0) := 1; break; (local 0) := 2 -- the second store must
        // never run, and the break's value becomes the label's result
        EvalTest::new(Expr::Block(vec![
            Expr::Label(boxed(Expr::Block(vec![
                Expr::SetLocal(0, boxed(i32c(1))),
                Expr::Break {
                    depth: 0,
                    value: Some(boxed(i32c(42))),
                },
                Expr::SetLocal(0, boxed(i32c(2))),
            ]))),
            Expr::GetLocal(0),
        ]))
        .with_locals(vec![ValueType::I32])
        .expect(Some(Value::I32(1)));
    }

    #[test]
    fn test_break_value_is_label_result() {
        let e = Expr::Label(boxed(Expr::Break {
            depth: 0,
            value: Some(boxed(i32c(5))),
        }));
        assert_eq!(eval(&e).unwrap(), Some(Value::I32(5)));
    }

    #[test]
    fn test_break_by_depth_crosses_inner_labels() {
        // depth 1 skips the inner label entirely
        let e = Expr::Label(boxed(Expr::Block(vec![
            Expr::Label(boxed(Expr::Break {
                depth: 1,
                value: Some(boxed(i32c(3))),
            })),
            i32c(99),
        ])));
        assert_eq!(eval(&e).unwrap(), Some(Value::I32(3)));
    }

    #[test]
    fn test_break_without_label_faults() {
        let e = Expr::Break { depth: 0, value: None };
        assert_eq!(eval(&e), Err(Fault::UndefinedIndex(IndexSpace::Label, 0)));
        // Depth past the outermost label also faults
        let e = Expr::Label(boxed(Expr::Break { depth: 3, value: None }));
        assert_eq!(eval(&e), Err(Fault::UndefinedIndex(IndexSpace::Label, 2)));
    }

    #[test]
    fn test_loop_terminates_only_through_break() {
        // local0 counts up to 5, then breaks out with the count
        let body = Expr::Loop(boxed(Expr::If {
            cond: boxed(Expr::Compare(
                CompareOp::GeS,
                boxed(Expr::GetLocal(0)),
                boxed(i32c(5)),
            )),
            then: boxed(Expr::Break {
                depth: 0,
                value: Some(boxed(Expr::GetLocal(0))),
            }),
            otherwise: boxed(Expr::SetLocal(
                0,
                boxed(Expr::Binary(BinaryOp::Add, boxed(Expr::GetLocal(0)), boxed(i32c(1)))),
            )),
        }));
        EvalTest::new(Expr::Label(boxed(body)))
            .with_locals(vec![ValueType::I32])
            .expect(Some(Value::I32(5)));
    }

    #[test]
    fn test_return_abandons_nested_constructs() {
        // Return fires from inside a label inside a loop
        let body = Expr::Label(boxed(Expr::Loop(boxed(Expr::Return(Some(boxed(i32c(11))))))));
        EvalTest::new(body).with_result(ValueType::I32).expect(Some(Value::I32(11)));
    }

    #[test]
    fn test_return_without_value() {
        EvalTest::new(Expr::Block(vec![Expr::Return(None), i32c(1)])).expect(None);
    }

    fn arm(lit: i32, body: Expr, fallthru: bool) -> SwitchArm {
        SwitchArm {
            literal: Value::I32(lit),
            body,
            fallthru,
        }
    }

    #[test]
    fn test_switch_first_match_wins() {
        let sw = |sel: i32| Expr::Switch {
            selector: boxed(i32c(sel)),
            arms: vec![
                arm(1, i32c(10), false),
                arm(2, i32c(20), false),
                arm(2, i32c(21), false),
            ],
            default: boxed(i32c(-1)),
        };
        assert_eq!(eval(&sw(1)).unwrap(), Some(Value::I32(10)));
        assert_eq!(eval(&sw(2)).unwrap(), Some(Value::I32(20)));
        assert_eq!(eval(&sw(7)).unwrap(), Some(Value::I32(-1)));
    }

    #[test]
    fn test_switch_fallthrough_runs_for_effect_only() {
        // Arm 1 falls through: its body runs for effect, arm 2's body
        // supplies the result
        let body = Expr::Switch {
            selector: boxed(i32c(1)),
            arms: vec![
                arm(1, Expr::SetLocal(0, boxed(i32c(7))), true),
                arm(2, Expr::GetLocal(0), false),
            ],
            default: boxed(i32c(-1)),
        };
        EvalTest::new(body)
            .with_locals(vec![ValueType::I32])
            .expect(Some(Value::I32(7)));
    }

    #[test]
    fn test_switch_fallthrough_past_last_arm_hits_default() {
        let body = Expr::Switch {
            selector: boxed(i32c(2)),
            arms: vec![arm(1, i32c(10), false), arm(2, Expr::Nop, true)],
            default: boxed(i32c(-1)),
        };
        assert_eq!(eval(&body).unwrap(), Some(Value::I32(-1)));
    }

    #[test]
    fn test_switch_fallthrough_chain() {
        let body = Expr::Switch {
            selector: boxed(i32c(0)),
            arms: vec![
                arm(0, Expr::SetLocal(0, boxed(i32c(1))), true),
                arm(
                    9,
                    Expr::SetLocal(
                        0,
                        boxed(Expr::Binary(BinaryOp::Add, boxed(Expr::GetLocal(0)), boxed(i32c(10)))),
                    ),
                    true,
                ),
                arm(8, Expr::GetLocal(0), false),
            ],
            default: boxed(i32c(-1)),
        };
        // Both fall-through arms run even though only the first matched
        EvalTest::new(body)
            .with_locals(vec![ValueType::I32])
            .expect(Some(Value::I32(11)));
    }

    #[test]
    fn test_switch_matches_bitwise_within_kind() {
        // An i64 selector never matches i32 literals
        let body = Expr::Switch {
            selector: boxed(Expr::Const(Value::I64(1))),
            arms: vec![arm(1, i32c(10), false)],
            default: boxed(i32c(-1)),
        };
        assert_eq!(eval(&body).unwrap(), Some(Value::I32(-1)));
    }

    #[test]
    fn test_params_bind_before_declared_locals() {
        // Parameters occupy the first local slots; declared locals follow,
        // zero-initialized
        EvalTest::new(Expr::Binary(
            BinaryOp::Add,
            boxed(Expr::GetLocal(0)),
            boxed(Expr::GetLocal(1)),
        ))
        .with_params(vec![ValueType::I32])
        .with_locals(vec![ValueType::I32])
        .arg(Value::I32(40))
        .expect(Some(Value::I32(40)));
    }

    #[test]
    fn test_locals_start_at_zero() {
        EvalTest::new(Expr::GetLocal(0))
            .with_locals(vec![ValueType::I64])
            .expect(Some(Value::I64(0)));
    }

    #[test]
    fn test_set_local_yields_stored_value() {
        EvalTest::new(Expr::SetLocal(0, boxed(i32c(3))))
            .with_locals(vec![ValueType::I32])
            .expect(Some(Value::I32(3)));
    }

    #[test]
    fn test_local_kind_is_sticky() {
        EvalTest::new(Expr::SetLocal(0, boxed(Expr::Const(Value::F32(1.0)))))
            .with_locals(vec![ValueType::I32])
            .expect_fault("type mismatch");
    }

    #[test]
    fn test_local_index_bounds() {
        EvalTest::new(Expr::GetLocal(4)).expect_fault("undefined local index 4");
    }

    #[test]
    fn test_globals_persist_across_expressions() {
        EvalTest::new(Expr::Block(vec![
            Expr::SetGlobal(0, boxed(Expr::Const(Value::I64(42)))),
            Expr::GetGlobal(0),
        ]))
        .with_global(ValueType::I64)
        .expect(Some(Value::I64(42)));
    }

    #[test]
    fn test_global_index_bounds() {
        EvalTest::new(Expr::GetGlobal(0)).expect_fault("undefined global index 0");
    }

    #[test]
    fn test_memory_store_then_load() {
        EvalTest::new(Expr::Block(vec![
            Expr::Store {
                kind: ValueType::I32,
                width: AccessWidth::W32,
                addr: boxed(i32c(4)),
                value: boxed(i32c(-7)),
            },
            Expr::Load {
                kind: ValueType::I32,
                width: AccessWidth::W32,
                sign: Sign::Unsigned,
                addr: boxed(i32c(4)),
            },
        ]))
        .with_memory(64)
        .expect(Some(Value::I32(-7)));
    }

    #[test]
    fn test_memory_out_of_bounds_faults() {
        EvalTest::new(Expr::Load {
            kind: ValueType::I32,
            width: AccessWidth::W32,
            sign: Sign::Unsigned,
            addr: boxed(i32c(-1)), // coerces to 0xFFFFFFFF
        })
        .with_memory(64)
        .expect_fault("out of bounds memory access");
    }

    #[test]
    fn test_arithmetic_dispatch() {
        assert_eq!(
            eval(&Expr::Binary(BinaryOp::Add, boxed(i32c(2)), boxed(i32c(3)))).unwrap(),
            Some(Value::I32(5))
        );
        assert_eq!(
            eval(&Expr::Unary(UnaryOp::Popcnt, boxed(i32c(7)))).unwrap(),
            Some(Value::I32(3))
        );
        assert_eq!(
            eval(&Expr::Compare(CompareOp::LtU, boxed(i32c(-1)), boxed(i32c(0)))).unwrap(),
            Some(Value::I32(0))
        );
    }

    #[test]
    fn test_operand_needing_value_faults_on_none() {
        let e = Expr::Binary(BinaryOp::Add, boxed(Expr::Nop), boxed(i32c(1)));
        assert_eq!(eval(&e), Err(Fault::NoValueProduced));
    }

    #[test]
    fn test_break_propagates_through_operand_position() {
        // The break abandons the whole addition; 1 + _ never happens
        let e = Expr::Label(boxed(Expr::Binary(
            BinaryOp::Add,
            boxed(i32c(1)),
            boxed(Expr::Break {
                depth: 0,
                value: Some(boxed(i32c(9))),
            }),
        )));
        assert_eq!(eval(&e).unwrap(), Some(Value::I32(9)));
    }

    #[test]
    fn test_call_and_recursion() {
        // f(n) = n <= 0 ? 0 : n + f(n - 1), invoked as main(5)
        let gauss = crate::ast::Function {
            params: vec![ValueType::I32],
            result: Some(ValueType::I32),
            locals: vec![],
            body: Expr::If {
                cond: boxed(Expr::Compare(CompareOp::LeS, boxed(Expr::GetLocal(0)), boxed(i32c(0)))),
                then: boxed(i32c(0)),
                otherwise: boxed(Expr::Binary(
                    BinaryOp::Add,
                    boxed(Expr::GetLocal(0)),
                    boxed(Expr::Call {
                        func: 1,
                        args: vec![Expr::Binary(
                            BinaryOp::Sub,
                            boxed(Expr::GetLocal(0)),
                            boxed(i32c(1)),
                        )],
                    }),
                )),
            },
        };
        EvalTest::new(Expr::Call {
            func: 1,
            args: vec![i32c(5)],
        })
        .with_function(gauss)
        .expect(Some(Value::I32(15)));
    }

    #[test]
    fn test_breaks_do_not_cross_call_boundaries() {
        // The callee's bare break does not reach the caller's label; it
        // faults at the callee's root instead.
        let breaker = crate::ast::Function {
            params: vec![],
            result: None,
            locals: vec![],
            body: Expr::Break { depth: 0, value: None },
        };
        EvalTest::new(Expr::Label(boxed(Expr::Call { func: 1, args: vec![] })))
            .with_function(breaker)
            .expect_fault("undefined label index 0");
    }

    #[test]
    fn test_unbounded_recursion_hits_depth_guard() {
        // The default bound must fault cleanly, not blow the host stack
        let spin = crate::ast::Function {
            params: vec![],
            result: None,
            locals: vec![],
            body: Expr::Call { func: 1, args: vec![] },
        };
        EvalTest::new(Expr::Call { func: 1, args: vec![] })
            .with_function(spin)
            .expect_fault("call stack overflow");
    }

    #[test]
    fn test_recursion_under_the_depth_limit_completes() {
        EvalTest::new(Expr::Call {
            func: 1,
            args: vec![i32c((DEFAULT_MAX_CALL_DEPTH - 2) as i32)],
        })
        .with_function(crate::ast::Function {
            params: vec![ValueType::I32],
            result: Some(ValueType::I32),
            locals: vec![],
            body: Expr::If {
                cond: boxed(Expr::Compare(CompareOp::LeS, boxed(Expr::GetLocal(0)), boxed(i32c(0)))),
                then: boxed(i32c(0)),
                otherwise: boxed(Expr::Call {
                    func: 1,
                    args: vec![Expr::Binary(
                        BinaryOp::Sub,
                        boxed(Expr::GetLocal(0)),
                        boxed(i32c(1)),
                    )],
                }),
            },
        })
        .expect(Some(Value::I32(0)));
    }

    #[test]
    fn test_declared_result_kind_enforced() {
        EvalTest::new(Expr::Const(Value::F64(1.0)))
            .with_result(ValueType::I32)
            .expect_fault("type mismatch");
    }

    #[test]
    fn test_declared_result_requires_value() {
        EvalTest::new(Expr::Nop)
            .with_result(ValueType::I32)
            .expect_fault("produced no value");
    }

    #[test]
    fn test_instance_stays_usable_after_deep_fault() {
        // A fault deep in a recursive chain must leave no residual call
        // accounting behind on the instance
        let module = Module {
            functions: vec![
                crate::ast::Function {
                    params: vec![],
                    result: None,
                    locals: vec![],
                    body: Expr::Call { func: 0, args: vec![] },
                },
                crate::ast::Function {
                    params: vec![],
                    result: Some(ValueType::I32),
                    locals: vec![],
                    body: i32c(1),
                },
            ],
            exports: vec![
                crate::ast::Export {
                    name: "spin".to_string(),
                    func: 0,
                },
                crate::ast::Export {
                    name: "one".to_string(),
                    func: 1,
                },
            ],
            ..Module::default()
        };
        let mut instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(instance.invoke("spin", vec![]), Err(Fault::CallStackOverflow));
        assert_eq!(instance.invoke("one", vec![]).unwrap(), Some(Value::I32(1)));
        assert_eq!(instance.invoke("spin", vec![]), Err(Fault::CallStackOverflow));
    }

    #[test]
    fn test_call_indirect_selects_by_table_entry() {
        let ret = |v: i32| crate::ast::Function {
            params: vec![],
            result: Some(ValueType::I32),
            locals: vec![],
            body: i32c(v),
        };
        EvalTest::new(Expr::CallIndirect {
            table: 0,
            index: boxed(i32c(1)),
            args: vec![],
        })
        .with_function(ret(100)) // function index 1
        .with_function(ret(200)) // function index 2
        .with_table(vec![1, 2])
        .expect(Some(Value::I32(200)));
    }

    #[test]
    fn test_call_indirect_bounds_checked() {
        EvalTest::new(Expr::CallIndirect {
            table: 0,
            index: boxed(i32c(5)),
            args: vec![],
        })
        .with_table(vec![0])
        .expect_fault("undefined table entry index 5");
    }

    #[test]
    fn test_call_import_invokes_host_callback() {
        let module = Module {
            functions: vec![crate::ast::Function {
                params: vec![],
                result: Some(ValueType::I32),
                locals: vec![],
                body: Expr::CallImport {
                    import: 0,
                    args: vec![i32c(20), i32c(3)],
                },
            }],
            imports: 1,
            exports: vec![crate::ast::Export {
                name: "main".to_string(),
                func: 0,
            }],
            ..Module::default()
        };
        let host: crate::runtime::HostFunc = Box::new(|args| {
            let a = args[0].as_i32().ok_or_else(|| Fault::Host("want i32".into()))?;
            let b = args[1].as_i32().ok_or_else(|| Fault::Host("want i32".into()))?;
            Ok(Some(Value::I32(a * b)))
        });
        let mut instance = Instance::init(&module, vec![host]).unwrap();
        assert_eq!(instance.invoke("main", vec![]).unwrap(), Some(Value::I32(60)));
    }

    #[test]
    fn test_faulted_invocation_keeps_completed_mutations() {
        // The global write lands before the fault; nothing rolls back
        let module = Module {
            functions: vec![crate::ast::Function {
                params: vec![],
                result: None,
                locals: vec![],
                body: Expr::Block(vec![
                    Expr::SetGlobal(0, boxed(i32c(5))),
                    Expr::Binary(BinaryOp::DivS, boxed(i32c(1)), boxed(i32c(0))),
                ]),
            }],
            globals: vec![ValueType::I32],
            exports: vec![crate::ast::Export {
                name: "main".to_string(),
                func: 0,
            }],
            ..Module::default()
        };
        let mut instance = Instance::init(&module, vec![]).unwrap();
        assert_eq!(instance.invoke("main", vec![]), Err(Fault::DivideByZero));
        assert_eq!(instance.global(0).unwrap(), Value::I32(5));
    }
}
