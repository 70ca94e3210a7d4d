//! A reference interpreter for a structured, stack-free virtual instruction
//! set: functions, typed locals and globals, one linear memory, and
//! structured control flow (labels, breaks, switches with fall-through).
//!
//! The crate exists to give an executable, testable definition of the
//! instruction set's semantics, not to run production workloads. Its core is
//! the module instantiator and the recursive expression evaluator, together
//! with the bit-exact numeric contracts the evaluator delegates to:
//! two's-complement wrapping division and remainder, signed and unsigned
//! comparison, and float-to-integer truncation where out-of-range inputs
//! collapse to zero.
//!
//! # Modules
//!
//! - [`ast`] -- The validated program tree: value kinds, expressions,
//!   functions, modules. Produced by an external parser/validator.
//! - [`runtime`] -- Instances, the evaluator, linear memory, and the
//!   arithmetic subsystem.
//! - [`script`] -- The JSON conformance-script format that pins observable
//!   behavior bitwise.
//!
//! # Example
//!
//! Build a module with one exported function, instantiate it, and call it:
//!
//! ```
//! use astvm::ast::{BinaryOp, Export, Expr, Function, Module, ValueType};
//! use astvm::runtime::{Instance, Value};
//!
//! let module = Module {
//!     functions: vec![Function {
//!         params: vec![ValueType::I32, ValueType::I32],
//!         result: Some(ValueType::I32),
//!         locals: vec![],
//!         body: Expr::Binary(
//!             BinaryOp::Add,
//!             Box::new(Expr::GetLocal(0)),
//!             Box::new(Expr::GetLocal(1)),
//!         ),
//!     }],
//!     exports: vec![Export { name: "add".to_string(), func: 0 }],
//!     ..Module::default()
//! };
//!
//! let mut instance = Instance::init(&module, vec![]).unwrap();
//! let result = instance.invoke("add", vec![Value::I32(2), Value::I32(3)]).unwrap();
//! assert_eq!(result, Some(Value::I32(5)));
//! ```
//!
//! Or evaluate one bare expression in an ephemeral instance:
//!
//! ```
//! use astvm::ast::Expr;
//! use astvm::runtime::{eval, Value};
//!
//! assert_eq!(eval(&Expr::Const(Value::I64(9))).unwrap(), Some(Value::I64(9)));
//! ```

pub mod ast;
pub mod runtime;
pub mod script;
