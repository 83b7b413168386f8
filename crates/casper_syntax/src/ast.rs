//! Abstract Syntax Tree definitions for script sources
//!
//! The tree is deliberately structural: it keeps enough shape for pattern matching
//! (calls, member chains, literals, declarations) and literal extraction, and does not
//! attempt to model runtime semantics.

use std::fmt;

/// Source location span (byte offsets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Identifier
pub type Ident = String;

/// A parsed script: top-level statements plus any errors the parser recovered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Spanned<Statement>>,
    /// Errors inside nested blocks that were skipped over.
    pub recovered: Vec<crate::diagnostics::SyntaxError>,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Var(VarDecl),
    Function(Function),
    Class(Class),
    Expr(Spanned<Expr>),
    Block(Vec<Spanned<Statement>>),
    If(IfStmt),
    For(ForStmt),
    ForIn(ForInStmt),
    While(WhileStmt),
    DoWhile(WhileStmt),
    /// `with (object) body`; `condition` holds the object expression
    With(WhileStmt),
    Return(Option<Spanned<Expr>>),
    Throw(Spanned<Expr>),
    Try(TryStmt),
    Switch(SwitchStmt),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Labeled(Ident, Box<Spanned<Statement>>),
    Import(ImportDecl),
    Export(ExportDecl),
    Debugger,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Var => write!(f, "var"),
            VarKind::Let => write!(f, "let"),
            VarKind::Const => write!(f, "const"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub target: Spanned<Pattern>,
    pub init: Option<Spanned<Expr>>,
}

/// Binding pattern (`x`, `{ a, b: c }`, `[x, ...rest]`, `x = 1`)
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(Ident),
    Object(Vec<PatternProp>),
    Array(Vec<Option<Spanned<Pattern>>>),
    Default(Box<Spanned<Pattern>>, Box<Spanned<Expr>>),
    Rest(Box<Spanned<Pattern>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternProp {
    KeyValue(PropKey, Spanned<Pattern>),
    Rest(Spanned<Pattern>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: Option<Ident>,
    pub params: Vec<Spanned<Pattern>>,
    pub body: Vec<Spanned<Statement>>,
    pub is_async: bool,
    pub is_generator: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFunction {
    pub params: Vec<Spanned<Pattern>>,
    pub body: ArrowBody,
    pub is_async: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Spanned<Expr>>),
    Block(Vec<Spanned<Statement>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: Option<Ident>,
    pub extends: Option<Box<Spanned<Expr>>>,
    pub members: Vec<Spanned<ClassMember>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Method {
        key: PropKey,
        kind: MethodKind,
        is_static: bool,
        function: Function,
    },
    Field {
        key: PropKey,
        is_static: bool,
        value: Option<Spanned<Expr>>,
    },
    StaticBlock(Vec<Spanned<Statement>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Spanned<Expr>,
    pub then_branch: Box<Spanned<Statement>>,
    pub else_branch: Option<Box<Spanned<Statement>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<ForInit>,
    pub test: Option<Spanned<Expr>>,
    pub update: Option<Spanned<Expr>>,
    pub body: Box<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForInStmt {
    pub left: ForInit,
    /// `true` for `for (.. of ..)`, `false` for `for (.. in ..)`
    pub is_of: bool,
    pub right: Spanned<Expr>,
    pub body: Box<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Spanned<Expr>,
    pub body: Box<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub block: Vec<Spanned<Statement>>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Vec<Spanned<Statement>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Spanned<Pattern>>,
    pub body: Vec<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub discriminant: Spanned<Expr>,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Spanned<Expr>>,
    pub body: Vec<Spanned<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    Default(Ident),
    Namespace(Ident),
    Named { imported: Ident, local: Ident },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// `export var|function|class ...`
    Declaration(Box<Spanned<Statement>>),
    /// `export default <expr>`
    Default(Spanned<Expr>),
    /// `export { a, b as c } [from '...']`
    Named {
        names: Vec<(Ident, Ident)>,
        source: Option<String>,
    },
    /// `export * [as ns] from '...'`
    All { alias: Option<Ident>, source: String },
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Literal(Literal),
    Template(Template),
    TaggedTemplate(Box<Spanned<Expr>>, Template),
    Array(Vec<Option<Spanned<Expr>>>),
    Object(Vec<Property>),
    Function(Function),
    Arrow(ArrowFunction),
    Class(Class),
    Unary(UnaryOp, Box<Spanned<Expr>>),
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Spanned<Expr>>,
    },
    Binary(Box<Spanned<Expr>>, BinaryOp, Box<Spanned<Expr>>),
    Assign(Box<Spanned<Expr>>, AssignOp, Box<Spanned<Expr>>),
    Conditional {
        test: Box<Spanned<Expr>>,
        consequent: Box<Spanned<Expr>>,
        alternate: Box<Spanned<Expr>>,
    },
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        optional: bool,
    },
    New {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },
    Member {
        object: Box<Spanned<Expr>>,
        property: MemberProp,
        optional: bool,
    },
    Sequence(Vec<Spanned<Expr>>),
    Spread(Box<Spanned<Expr>>),
    Await(Box<Spanned<Expr>>),
    Yield {
        argument: Option<Box<Spanned<Expr>>>,
        delegate: bool,
    },
    Paren(Box<Spanned<Expr>>),
    This,
    Super,
    /// `new.target` / `import.meta`
    MetaProperty(Ident, Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    BigInt(String),
    Bool(bool),
    Null,
    Regex { pattern: String, flags: String },
}

impl Literal {
    /// The string value, if this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Cooked literal chunks; always one longer than `exprs`.
    pub quasis: Vec<String>,
    pub exprs: Vec<Spanned<Expr>>,
}

impl Template {
    /// The template's text when it has no `${}` substitutions.
    pub fn as_plain(&self) -> Option<&str> {
        match (self.quasis.as_slice(), self.exprs.is_empty()) {
            ([only], true) => Some(only),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    /// `obj.name` (also `obj.#private`)
    Ident(Ident),
    /// `obj[expr]`
    Computed(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    KeyValue(PropKey, Spanned<Expr>),
    /// `{ a }`
    Shorthand(Ident),
    Method {
        key: PropKey,
        kind: MethodKind,
        function: Function,
    },
    Spread(Spanned<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(Ident),
    String(String),
    Number(f64),
    Computed(Box<Spanned<Expr>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Nullish,
    In,
    InstanceOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Nullish,
}
