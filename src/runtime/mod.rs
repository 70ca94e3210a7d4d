//! Execution engine for the instruction set
//!
//! This module provides the live side of the interpreter: the value
//! representation, the bounds-checked linear memory, module instances, and
//! the recursive expression evaluator.

pub mod eval;
pub mod instance;
pub mod memory;
pub mod ops;
pub mod test_utils;
pub mod value;

pub use instance::{eval, HostFunc, Instance};
pub use memory::Memory;
pub use value::Value;

use crate::ast::ValueType;
use std::fmt;

/// Which index space an out-of-range reference was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSpace {
    Function,
    Import,
    Global,
    Table,
    TableEntry,
    Local,
    Label,
}

impl fmt::Display for IndexSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSpace::Function => write!(f, "function"),
            IndexSpace::Import => write!(f, "import"),
            IndexSpace::Global => write!(f, "global"),
            IndexSpace::Table => write!(f, "table"),
            IndexSpace::TableEntry => write!(f, "table entry"),
            IndexSpace::Local => write!(f, "local"),
            IndexSpace::Label => write!(f, "label"),
        }
    }
}

/// A fatal evaluation fault.
///
/// Every fault aborts the whole in-flight evaluation and propagates straight
/// to the `invoke`/`eval` boundary; nothing is caught internally and nothing
/// is rolled back. Mutations to globals and memory that completed before the
/// fault stay applied.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Fault {
    #[error("undefined {0} index {1}")]
    UndefinedIndex(IndexSpace, u32),
    #[error("unknown export: {0}")]
    UndefinedExport(String),
    #[error("type mismatch at operand {operand}: expected {expected}, got {actual}")]
    TypeMismatch {
        operand: usize,
        expected: String,
        actual: ValueType,
    },
    #[error("arity mismatch: expected {expected} arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },
    #[error("expression produced no value")]
    NoValueProduced,
    #[error("out of bounds memory access: address {addr} + {len} bytes exceeds {size}")]
    MemoryBounds { addr: u64, len: usize, size: usize },
    #[error("invalid memory address: {0}")]
    MemoryAddress(String),
    #[error("integer division by zero")]
    DivideByZero,
    #[error("call stack overflow")]
    CallStackOverflow,
    #[error("host import error: {0}")]
    Host(String),
}

/// A configuration fault raised by [`Instance::init`].
///
/// These signal caller bugs (a mis-assembled module or import list), not
/// runtime behavior, and are therefore kept apart from [`Fault`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InstantiationError {
    #[error("import count mismatch: module declares {declared}, host supplied {supplied}")]
    ImportCountMismatch { declared: usize, supplied: usize },
    #[error("table {table} entry {entry} refers to unknown function index {func}")]
    UndefinedTableEntry { table: u32, entry: u32, func: u32 },
    #[error("memory segment out of bounds: offset {offset} + {len} bytes exceeds {size}")]
    SegmentOutOfBounds { offset: u32, len: usize, size: usize },
}

/// Result of one recursive evaluation step.
///
/// Non-local control transfer is an explicit outcome checked by every
/// caller, never an unwinding mechanism: a `Break` travels outward until the
/// label at the right nesting depth absorbs it, a `Return` travels to the
/// function root. Faults stay in the `Err` channel of the surrounding
/// `Result` so expected transfers and genuine errors never mix.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Normal completion with an optional value.
    Value(Option<Value>),
    /// Transfer to the enclosing label at `depth` (0 = nearest).
    Break { depth: u32, value: Option<Value> },
    /// Transfer to the function-level exit handler.
    Return(Option<Value>),
}
