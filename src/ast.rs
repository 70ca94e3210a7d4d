//! Validated program tree
//!
//! The types in this module are the interpreter's input representation: a
//! module of functions with typed parameters, locals, and structured-control
//! bodies. Parsing and static validation happen upstream; by the time a
//! [`Module`] reaches [`crate::runtime::Instance::init`] it is assumed
//! well-formed, and the runtime re-checks only what it must to stay memory
//! safe (index bounds, value kinds).

use crate::runtime::Value;
use std::fmt;

/// The four numeric value kinds of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::I32 => write!(f, "i32"),
            ValueType::I64 => write!(f, "i64"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
        }
    }
}

/// Unary arithmetic operators, polymorphic over the operand kind.
///
/// Integer-only and float-only operators fault with a type mismatch when
/// applied to the wrong family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Count leading zero bits (integers)
    Clz,
    /// Count trailing zero bits (integers)
    Ctz,
    /// Count set bits (integers)
    Popcnt,
    /// Negation (floats)
    Neg,
    /// Absolute value (floats)
    Abs,
    /// Square root (floats)
    Sqrt,
    /// Round up (floats)
    Ceil,
    /// Round down (floats)
    Floor,
}

/// Binary arithmetic operators.
///
/// Signed/unsigned variants exist only for integers; `Div` only for floats
/// (integer division is always explicitly signed or unsigned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Signed integer division, truncating toward zero
    DivS,
    /// Unsigned integer division
    DivU,
    /// Signed remainder; sign follows the dividend
    RemS,
    /// Unsigned remainder
    RemU,
    /// Float division
    Div,
    And,
    Or,
    Xor,
    Shl,
    /// Arithmetic (sign-propagating) right shift
    ShrS,
    /// Logical right shift
    ShrU,
    /// Float minimum
    Min,
    /// Float maximum
    Max,
    /// Float copysign
    CopySign,
}

/// Relational operators; result is always `I32(0)` or `I32(1)`.
///
/// The signed forms double as the ordered comparisons for floats; the
/// unsigned forms are integer-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    LtS,
    LtU,
    LeS,
    LeU,
    GtS,
    GtU,
    GeS,
    GeU,
}

/// Conversions between value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOp {
    /// Float to signed i32, truncating toward zero; out-of-range collapses to 0
    TruncToI32S,
    /// Float to unsigned i32 bit pattern; out-of-range collapses to 0
    TruncToI32U,
    /// Float to signed i64, truncating toward zero; out-of-range collapses to 0
    TruncToI64S,
    /// Float to unsigned i64 bit pattern; out-of-range collapses to 0
    TruncToI64U,
    /// i64 to i32, discarding the high bits
    WrapToI32,
    /// i32 to i64, sign-extending
    ExtendToI64S,
    /// i32 to i64, zero-extending
    ExtendToI64U,
    /// Integer to f32, treating the operand as signed
    ConvertToF32S,
    /// Integer to f32, treating the operand as unsigned
    ConvertToF32U,
    /// Integer to f64, treating the operand as signed
    ConvertToF64S,
    /// Integer to f64, treating the operand as unsigned
    ConvertToF64U,
    /// f32 to f64
    PromoteToF64,
    /// f64 to f32
    DemoteToF32,
}

/// Byte width of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessWidth {
    W8,
    W16,
    W32,
    W64,
}

impl AccessWidth {
    pub fn bytes(self) -> usize {
        match self {
            AccessWidth::W8 => 1,
            AccessWidth::W16 => 2,
            AccessWidth::W32 => 4,
            AccessWidth::W64 => 8,
        }
    }
}

/// How a narrow integer load extends to its value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Signed,
    Unsigned,
}

/// One arm of a [`Expr::Switch`].
#[derive(Debug, Clone)]
pub struct SwitchArm {
    /// Literal the selector is matched against (bitwise, same kind).
    pub literal: Value,
    pub body: Expr,
    /// A fall-through arm runs its body for effect only and execution
    /// continues into the following arm (or the default, after the last arm).
    pub fallthru: bool,
}

/// A structured-control expression.
///
/// Every expression evaluates to at most one value; constructs that exist
/// for effect only (`Nop`, an empty block) produce none. Control transfer is
/// limited to `Break` (to an enclosing `Label`, by nesting depth) and
/// `Return`; there are no arbitrary jumps.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Produces no value.
    Nop,
    /// Evaluate every sub-expression in order; the last one's value is the
    /// block's value, the others run for effect only.
    Block(Vec<Expr>),
    /// `cond` must be i32; nonzero selects `then`, zero selects `otherwise`.
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Evaluate the body for effect, then re-enter. A loop has no exit of
    /// its own; only a `Break` to an enclosing `Label` (or a `Return`)
    /// leaves it.
    Loop(Box<Expr>),
    /// Installs a break target around its body. Completes with the body's
    /// value, or with the value carried by a `Break` that targets it.
    Label(Box<Expr>),
    /// Transfer to the enclosing `Label` at `depth` (0 = nearest), carrying
    /// an optional value.
    Break { depth: u32, value: Option<Box<Expr>> },
    /// Match the selector against arm literals in declaration order.
    Switch {
        selector: Box<Expr>,
        arms: Vec<SwitchArm>,
        default: Box<Expr>,
    },
    /// Call a module function by index; arguments evaluate left-to-right.
    Call { func: u32, args: Vec<Expr> },
    /// Call a resolved host import by slot index.
    CallImport { import: u32, args: Vec<Expr> },
    /// Call through an indirect-call table; `index` must evaluate to i32.
    CallIndirect {
        table: u32,
        index: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Return from the enclosing function with an optional value.
    Return(Option<Box<Expr>>),
    GetLocal(u32),
    SetLocal(u32, Box<Expr>),
    GetGlobal(u32),
    SetGlobal(u32, Box<Expr>),
    /// Load `kind` from linear memory; a `width` narrower than the kind
    /// extends per `sign`. The address operand is coerced to an unsigned
    /// byte offset whatever its kind.
    Load {
        kind: ValueType,
        width: AccessWidth,
        sign: Sign,
        addr: Box<Expr>,
    },
    /// Store `kind` to linear memory, wrapping to `width` bytes.
    Store {
        kind: ValueType,
        width: AccessWidth,
        addr: Box<Expr>,
        value: Box<Expr>,
    },
    Const(Value),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    Convert(ConvertOp, Box<Expr>),
}

/// A function: parameter kinds, optional single result, declared locals, one
/// body expression. Immutable once built.
#[derive(Debug, Clone)]
pub struct Function {
    pub params: Vec<ValueType>,
    /// Declared result kind. `Some(t)` is enforced at the call boundary:
    /// the body must yield a value of kind `t` or the call faults. `None`
    /// leaves the yield unconstrained and the body's optional value passes
    /// through as-is.
    pub result: Option<ValueType>,
    pub locals: Vec<ValueType>,
    pub body: Expr,
}

/// A named, externally invocable function.
#[derive(Debug, Clone)]
pub struct Export {
    pub name: String,
    pub func: u32,
}

/// One memory initialization segment: literal bytes copied verbatim to
/// `offset` at instantiation.
#[derive(Debug, Clone)]
pub struct Segment {
    pub offset: u32,
    pub data: Vec<u8>,
}

/// Linear memory declaration: initial byte size plus init segments, applied
/// in declaration order (later segments overwrite overlapping earlier ones).
#[derive(Debug, Clone, Default)]
pub struct MemoryDescriptor {
    pub initial: u32,
    pub segments: Vec<Segment>,
}

/// A validated module, ready for instantiation.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    /// Number of host import slots the module declares. `init` requires
    /// exactly this many resolved callbacks.
    pub imports: usize,
    /// Global cell declarations; every cell starts at its kind's zero value.
    pub globals: Vec<ValueType>,
    /// Indirect-call tables, each an ordered list of function indices.
    pub tables: Vec<Vec<u32>>,
    pub memory: Option<MemoryDescriptor>,
    pub exports: Vec<Export>,
}

impl Module {
    /// Empty module: no functions, imports, globals, tables, memory, exports.
    pub fn new() -> Self {
        Module::default()
    }

    /// Wrap a single bare expression as a nullary, local-less function in an
    /// otherwise empty module. Used by [`crate::runtime::eval()`].
    pub fn bare(body: Expr) -> Self {
        Module {
            functions: vec![Function {
                params: Vec::new(),
                result: None,
                locals: Vec::new(),
                body,
            }],
            ..Module::default()
        }
    }
}
