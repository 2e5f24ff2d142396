// crates/genui-script/src/ast.rs
// ============================================================================
// Module: Script Syntax Tree
// Description: Immutable syntax tree produced by the parser.
// Purpose: Share compiled programs across evaluations without reparsing.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! The tree is plain owned data so compiled programs are `Send + Sync` and can
//! live in the sandbox cache. Function bodies sit behind [`Arc`] so closures
//! created at runtime reference them without copying.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

// ============================================================================
// SECTION: Statements
// ============================================================================

/// Variable declaration flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclKind {
    /// `const` binding (immutable).
    Const,
    /// `let` binding.
    Let,
    /// `var` binding.
    Var,
}

/// One `name = init` pair inside a declaration.
#[derive(Debug, Clone)]
pub(crate) struct Declarator {
    /// Binding target.
    pub(crate) target: Pattern,
    /// Optional initializer.
    pub(crate) init: Option<Expr>,
}

/// Statement node.
#[derive(Debug, Clone)]
pub(crate) enum Stmt {
    /// Variable declaration.
    Declare {
        /// Declaration flavor.
        kind: DeclKind,
        /// Declared bindings.
        declarators: Vec<Declarator>,
    },
    /// Function declaration (hoisted).
    Function {
        /// Function name.
        name: String,
        /// Function definition.
        def: Arc<FunctionDef>,
    },
    /// Expression evaluated for side effects.
    Expr(Expr),
    /// `return` with optional value.
    Return(Option<Expr>, usize),
    /// `if` statement.
    If {
        /// Condition.
        test: Expr,
        /// Branch taken when truthy.
        consequent: Box<Stmt>,
        /// Optional `else` branch.
        alternate: Option<Box<Stmt>>,
    },
    /// Braced block with its own scope.
    Block(Vec<Stmt>),
    /// `for (... of ...)` or `for (... in ...)` loop.
    ForEach {
        /// Declaration flavor for the loop binding, if declared inline.
        kind: Option<DeclKind>,
        /// Loop binding.
        target: Pattern,
        /// True for `in` (keys), false for `of` (values).
        keys: bool,
        /// Iterated expression.
        iterable: Expr,
        /// Loop body.
        body: Box<Stmt>,
    },
    /// C-style `for` loop.
    For {
        /// Initializer statement.
        init: Option<Box<Stmt>>,
        /// Loop condition.
        test: Option<Expr>,
        /// Update expression.
        update: Option<Expr>,
        /// Loop body.
        body: Box<Stmt>,
    },
    /// `while` or `do ... while` loop.
    While {
        /// Loop condition.
        test: Expr,
        /// Loop body.
        body: Box<Stmt>,
        /// True for `do ... while`.
        post_test: bool,
    },
    /// `break`
    Break(usize),
    /// `continue`
    Continue(usize),
    /// `throw`
    Throw(Expr),
    /// `try` / `catch` / `finally`
    Try {
        /// Protected block.
        block: Vec<Stmt>,
        /// Optional catch binding.
        param: Option<Pattern>,
        /// Catch block.
        handler: Option<Vec<Stmt>>,
        /// Finally block.
        finalizer: Option<Vec<Stmt>>,
    },
    /// Lone semicolon.
    Empty,
}

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Binding target used by declarations, parameters, and loops.
#[derive(Debug, Clone)]
pub(crate) enum Pattern {
    /// Plain identifier.
    Ident(String),
    /// Object destructuring.
    Object {
        /// Destructured properties.
        props: Vec<PatternProp>,
        /// Rest binding collecting the remaining keys.
        rest: Option<Box<Pattern>>,
    },
    /// Array destructuring.
    Array {
        /// Element patterns; `None` marks a hole.
        elements: Vec<Option<PatternElement>>,
        /// Rest binding collecting the remaining elements.
        rest: Option<Box<Pattern>>,
    },
}

/// One property inside an object pattern.
#[derive(Debug, Clone)]
pub(crate) struct PatternProp {
    /// Source property key.
    pub(crate) key: PropKey,
    /// Target pattern.
    pub(crate) value: Pattern,
    /// Default used when the property is undefined.
    pub(crate) default: Option<Expr>,
}

/// One element inside an array pattern or parameter list.
#[derive(Debug, Clone)]
pub(crate) struct PatternElement {
    /// Target pattern.
    pub(crate) target: Pattern,
    /// Default used when the element is undefined.
    pub(crate) default: Option<Expr>,
}

// ============================================================================
// SECTION: Functions
// ============================================================================

/// Function body flavor.
#[derive(Debug, Clone)]
pub(crate) enum FunctionBody {
    /// Arrow function with an expression body.
    Expr(Box<Expr>),
    /// Statement block.
    Block(Vec<Stmt>),
}

/// Parsed function literal.
#[derive(Debug, Clone)]
pub(crate) struct FunctionDef {
    /// Optional function name (used in stack traces).
    pub(crate) name: Option<String>,
    /// Positional parameters.
    pub(crate) params: Vec<PatternElement>,
    /// Rest parameter.
    pub(crate) rest: Option<Pattern>,
    /// Body.
    pub(crate) body: FunctionBody,
    /// True for arrow functions (no own `arguments`).
    pub(crate) arrow: bool,
    /// Source offset of the function.
    pub(crate) position: usize,
}

// ============================================================================
// SECTION: Expressions
// ============================================================================

/// Object literal or pattern key.
#[derive(Debug, Clone)]
pub(crate) enum PropKey {
    /// Static key.
    Static(String),
    /// Computed `[expr]` key.
    Computed(Box<Expr>),
}

/// Array literal element or call argument.
#[derive(Debug, Clone)]
pub(crate) enum Element {
    /// Regular expression.
    Expr(Expr),
    /// Spread `...expr`.
    Spread(Expr),
    /// Elided array slot.
    Hole,
}

/// Object literal member.
#[derive(Debug, Clone)]
pub(crate) enum Property {
    /// `key: value` (shorthand and methods included).
    KeyValue(PropKey, Expr),
    /// Spread `...expr`.
    Spread(Expr),
}

/// Template literal piece.
#[derive(Debug, Clone)]
pub(crate) enum TemplatePart {
    /// Literal text.
    Text(String),
    /// Interpolated expression.
    Expr(Expr),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `typeof`
    Typeof,
    /// `void`
    Void,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `**`
    Pow,
    /// `==`
    LooseEq,
    /// `!=`
    LooseNotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `in`
    In,
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `??`
    Nullish,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignOp {
    /// `=`
    Assign,
    /// Compound arithmetic assignment.
    Compound(BinaryOp),
    /// Logical assignment (`&&=`, `||=`, `??=`).
    Logical(LogicalOp),
}

/// Expression node with its source offset.
#[derive(Debug, Clone)]
pub(crate) struct Expr {
    /// Expression variant.
    pub(crate) kind: ExprKind,
    /// Byte offset into the source.
    pub(crate) position: usize,
}

/// Expression variants.
#[derive(Debug, Clone)]
pub(crate) enum ExprKind {
    /// Numeric literal.
    Number(f64),
    /// String literal.
    Str(String),
    /// Template literal.
    Template(Vec<TemplatePart>),
    /// Boolean literal.
    Bool(bool),
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// `this`
    This,
    /// Identifier reference.
    Ident(String),
    /// Array literal.
    Array(Vec<Element>),
    /// Object literal.
    Object(Vec<Property>),
    /// Function or arrow literal.
    Function(Arc<FunctionDef>),
    /// Unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// `++` / `--`
    Update {
        /// +1 or -1.
        increment: bool,
        /// True for prefix form.
        prefix: bool,
        /// Assignment target.
        target: Box<Expr>,
    },
    /// Binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Short-circuit operation.
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    /// `test ? consequent : alternate`
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Assignment.
    Assign {
        /// Operator.
        op: AssignOp,
        /// Target (identifier, member, or index).
        target: Box<Expr>,
        /// Assigned value.
        value: Box<Expr>,
    },
    /// `object.property`
    Member {
        /// Receiver.
        object: Box<Expr>,
        /// Property name.
        property: String,
        /// True for `?.`.
        optional: bool,
    },
    /// `object[index]`
    Index {
        /// Receiver.
        object: Box<Expr>,
        /// Computed key.
        index: Box<Expr>,
        /// True for `?.[`.
        optional: bool,
    },
    /// Function call.
    Call {
        /// Callee.
        callee: Box<Expr>,
        /// Arguments.
        args: Vec<Element>,
        /// True for `?.(`.
        optional: bool,
    },
    /// `new Callee(args)`
    New {
        /// Constructor expression.
        callee: Box<Expr>,
        /// Arguments.
        args: Vec<Element>,
    },
    /// Boundary of an optional chain; short-circuits to `undefined`.
    OptionalChain(Box<Expr>),
    /// Comma-separated sequence.
    Sequence(Vec<Expr>),
}

impl Expr {
    /// Creates an expression node.
    pub(crate) const fn new(kind: ExprKind, position: usize) -> Self {
        Self {
            kind,
            position,
        }
    }
}

// ============================================================================
// SECTION: Program
// ============================================================================

/// Compiled script: a function body ready to run.
///
/// # Invariants
/// - Produced only by the parser; immutable afterwards.
#[derive(Debug, Clone)]
pub struct Program {
    /// Top-level statements.
    pub(crate) body: Vec<Stmt>,
    /// Length of the source in bytes.
    pub(crate) source_len: usize,
}

impl Program {
    /// Returns the source length in bytes.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// Returns the number of top-level statements.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.body.len()
    }
}
