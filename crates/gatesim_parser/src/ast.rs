//! AST node types for gatesim's bounded SystemVerilog subset.
//!
//! Every node that can fail to parse carries a `Span` so diagnostics and,
//! later, evaluator errors can point back at source. Parse failures are
//! represented as `Error(Span)` variants rather than aborting the whole
//! parse — a malformed statement or expression becomes a leaf the parser
//! can resynchronize past, while everything around it still parses.
//!
//! Blocking (`=`) and non-blocking (`<=`) assignment are kept as distinct
//! `Statement` variants, never collapsed into one "assignment" node: the
//! sequential evaluator's two-phase commit depends on telling them apart
//! at every point downstream, not re-deriving it from context.

use gatesim_source::Span;
use serde::{Deserialize, Serialize};

/// A complete SystemVerilog source file: zero or more module declarations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// The modules declared in this file, in source order.
    pub modules: Vec<ModuleDecl>,
    /// The span covering the entire file.
    pub span: Span,
}

/// Port direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// `input`
    Input,
    /// `output`
    Output,
    /// `inout`
    Inout,
}

/// The net/variable keyword a declaration used, kept distinct because
/// `reg`/`logic` may hold procedural state while `wire` may not be driven
/// by an `always_ff` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetKind {
    /// `wire`
    Wire,
    /// `logic`
    Logic,
    /// `reg`
    Reg,
}

/// A width specifier, e.g. the `[7:0]` in `logic [7:0] data`.
///
/// `msb` and `lsb` are as written; gatesim only supports the conventional
/// `[W-1:0]` descending form and rejects anything else when the port/net
/// is elaborated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WidthSpec {
    /// The left-hand (most significant) index.
    pub msb: i64,
    /// The right-hand (least significant) index.
    pub lsb: i64,
}

impl WidthSpec {
    /// Returns the bit width this spec implies.
    pub fn width(&self) -> i64 {
        self.msb - self.lsb + 1
    }
}

/// A module port declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDecl {
    /// `input`, `output`, or `inout`.
    pub direction: Direction,
    /// `wire`/`logic`/`reg`, if the port declares one explicitly.
    pub net_kind: Option<NetKind>,
    /// The `[msb:lsb]` width, if present. Absent means 1-bit.
    pub width: Option<WidthSpec>,
    /// The port name.
    pub name: String,
    /// Source location of this declaration.
    pub span: Span,
}

/// An internal net or memory array declaration (`wire`, `logic`, `reg`,
/// including `reg [7:0] mem [0:255]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetDecl {
    /// The net keyword used.
    pub net_kind: NetKind,
    /// The `[msb:lsb]` bit width, if present. Absent means 1-bit.
    pub width: Option<WidthSpec>,
    /// The declared name.
    pub name: String,
    /// Memory array dimensions (`[depth_msb:depth_lsb]`), if this is a
    /// memory (`reg [7:0] mem [0:255]`) rather than a plain net.
    pub memory_dims: Option<WidthSpec>,
    /// Source location.
    pub span: Span,
}

/// A single port connection in an instantiation, either named
/// (`.port(expr)`) or positional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConnection {
    /// The port name, for named connections (`.clk(sys_clk)`).
    pub port_name: Option<String>,
    /// The expression connected to the port.
    pub expr: Expr,
    /// Source location of this connection.
    pub span: Span,
}

/// A child module instantiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// The name of the module being instantiated.
    pub module_name: String,
    /// The instance name.
    pub instance_name: String,
    /// Port connections, named or positional (never mixed within one
    /// instantiation — the parser accepts either style but does not
    /// interleave them).
    pub connections: Vec<PortConnection>,
    /// Source location.
    pub span: Span,
}

/// A continuous assignment (`assign lhs = rhs;`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuousAssign {
    /// The target of the assignment.
    pub lhs: Expr,
    /// The driving expression.
    pub rhs: Expr,
    /// Source location.
    pub span: Span,
}

/// The sensitivity of a procedural block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProcessKind {
    /// `always_comb`: re-evaluates whenever any read signal changes.
    AlwaysComb,
    /// `always_ff @(posedge <clock>)`: evaluates on the rising edge of
    /// `clock`. gatesim does not support `negedge` or multi-edge
    /// sensitivity lists; the parser still accepts the token to produce
    /// a precise diagnostic rather than a generic syntax error.
    AlwaysFf {
        /// The clock signal name.
        clock: String,
    },
}

/// A procedural block (`always_comb { ... }` or `always_ff @(posedge clk) { ... }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    /// Which kind of procedural block this is.
    pub kind: ProcessKind,
    /// The statement(s) making up the block body.
    pub body: Statement,
    /// Source location.
    pub span: Span,
}

/// A top-level item inside a module body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModuleItem {
    /// An internal net/memory declaration.
    Net(NetDecl),
    /// A continuous assignment.
    Assign(ContinuousAssign),
    /// A child instantiation.
    Instance(Instance),
    /// A procedural block.
    Process(Process),
    /// An item that failed to parse; parsing resumes after the next `;`.
    Error(Span),
}

/// A module declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// The module's name.
    pub name: String,
    /// Declared ports, ANSI or non-ANSI style (both produce this same
    /// flat port list; non-ANSI bodies additionally emit matching `Net`
    /// items for ports re-declared inside the body).
    pub ports: Vec<PortDecl>,
    /// The items making up the module body.
    pub items: Vec<ModuleItem>,
    /// Source location of the whole declaration.
    pub span: Span,
}

/// A statement inside a procedural block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    /// `begin ... end`, a sequence of statements executed in order. Also
    /// used for a procedural block body of exactly one statement, wrapped
    /// for uniformity.
    Block(Vec<Statement>, Span),
    /// A blocking assignment (`lhs = rhs;`). Kept as its own variant,
    /// distinct from [`Statement::NonBlockingAssign`], so later passes
    /// never have to re-derive which kind of assignment this is.
    BlockingAssign {
        /// Assignment target.
        lhs: Expr,
        /// Assigned expression.
        rhs: Expr,
        /// Source location.
        span: Span,
    },
    /// A non-blocking assignment (`lhs <= rhs;`), legal only inside
    /// `always_ff`.
    NonBlockingAssign {
        /// Assignment target.
        lhs: Expr,
        /// Assigned expression.
        rhs: Expr,
        /// Source location.
        span: Span,
    },
    /// `if (cond) then_branch else else_branch`.
    If {
        /// The branch condition.
        cond: Expr,
        /// Taken when `cond` is true (non-zero).
        then_branch: Box<Statement>,
        /// Taken when `cond` is false, if present.
        else_branch: Option<Box<Statement>>,
        /// Source location.
        span: Span,
    },
    /// `case (selector) ... endcase`.
    Case {
        /// The case selector expression.
        selector: Expr,
        /// Each `case_item_expr: statement` arm.
        arms: Vec<CaseArm>,
        /// The `default:` arm's statement, if present.
        default: Option<Box<Statement>>,
        /// Source location.
        span: Span,
    },
    /// A statement that failed to parse; parsing resumes after the next
    /// `;` or balanced `end`.
    Error(Span),
}

/// One `case` arm: a set of matching expressions and its statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseArm {
    /// The comma-separated match expressions for this arm.
    pub matches: Vec<Expr>,
    /// The statement executed when one of `matches` equals the selector.
    pub body: Statement,
    /// Source location.
    pub span: Span,
}

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `^~` / `~^`
    Xnor,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    /// `==`
    Eq,
    /// `!=`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<<`
    Shl,
    /// `>>` (logical; arithmetic shift is selected by the evaluator based
    /// on `signed` typing, per gatesim's width-inference pass)
    Shr,
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `+` (no-op, kept for symmetry with `Neg`)
    Plus,
    /// `-`
    Neg,
    /// `~`
    BitNot,
    /// `!`
    LogicalNot,
    /// `&` reduction
    ReduceAnd,
    /// `|` reduction
    ReduceOr,
    /// `^` reduction
    ReduceXor,
}

/// An expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A bare identifier reference.
    Ident(String, Span),
    /// A literal value. `width` is `None` for an unsized decimal literal
    /// (width is inferred by context, defaulting to 32 at the top level,
    /// per the evaluator's width-propagation rules).
    Literal {
        /// The declared width, or `None` for an unsized literal.
        width: Option<u32>,
        /// The literal's numeric value.
        value: u64,
        /// Source location.
        span: Span,
    },
    /// `ident[index]`, either a single-bit select or a memory element
    /// reference — disambiguated during evaluation by whether `ident`
    /// names a memory.
    Index {
        /// The base identifier.
        base: String,
        /// The index expression.
        index: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// `ident[hi:lo]` part-select.
    PartSelect {
        /// The base identifier.
        base: String,
        /// The high bound.
        hi: Box<Expr>,
        /// The low bound.
        lo: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// `{ a, b, c }` concatenation, MSB-first as written.
    Concat(Vec<Expr>, Span),
    /// `{ N { expr } }` replication: `expr` (or the concatenation inside
    /// the inner braces) repeated `N` times.
    Replicate {
        /// The repeat count expression.
        count: Box<Expr>,
        /// The value repeated.
        value: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// A unary operator application.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        expr: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// A binary operator application.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left operand.
        lhs: Box<Expr>,
        /// The right operand.
        rhs: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// `cond ? then_expr : else_expr`, right-associative.
    Ternary {
        /// The condition.
        cond: Box<Expr>,
        /// Value when `cond` is true.
        then_expr: Box<Expr>,
        /// Value when `cond` is false.
        else_expr: Box<Expr>,
        /// Source location.
        span: Span,
    },
    /// An expression that failed to parse.
    Error(Span),
}

impl Expr {
    /// Returns the span of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(_, s) => *s,
            Expr::Literal { span, .. } => *span,
            Expr::Index { span, .. } => *span,
            Expr::PartSelect { span, .. } => *span,
            Expr::Concat(_, s) => *s,
            Expr::Replicate { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Ternary { span, .. } => *span,
            Expr::Error(s) => *s,
        }
    }
}
