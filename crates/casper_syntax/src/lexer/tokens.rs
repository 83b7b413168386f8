//! Token types for the script lexer.
//!
//! Reserved words and punctuators carry stable IDs ([`KeywordId`], [`Punct`]) so the parser never
//! compares spellings. Contextual words (`let`, `async`, `of`, `get`, ...) stay identifiers and are
//! recognised by the parser where they matter.

use crate::ast::Span;

// ============================================================================
// VOCABULARY
// ============================================================================

/// Stable identifier for every reserved word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordId {
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Export,
    Extends,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    InstanceOf,
    New,
    Return,
    Super,
    Switch,
    This,
    Throw,
    Try,
    TypeOf,
    Var,
    Void,
    While,
    With,
    True,
    False,
    Null,
}

const KEYWORDS: &[(&str, KeywordId)] = &[
    ("break", KeywordId::Break),
    ("case", KeywordId::Case),
    ("catch", KeywordId::Catch),
    ("class", KeywordId::Class),
    ("const", KeywordId::Const),
    ("continue", KeywordId::Continue),
    ("debugger", KeywordId::Debugger),
    ("default", KeywordId::Default),
    ("delete", KeywordId::Delete),
    ("do", KeywordId::Do),
    ("else", KeywordId::Else),
    ("export", KeywordId::Export),
    ("extends", KeywordId::Extends),
    ("finally", KeywordId::Finally),
    ("for", KeywordId::For),
    ("function", KeywordId::Function),
    ("if", KeywordId::If),
    ("import", KeywordId::Import),
    ("in", KeywordId::In),
    ("instanceof", KeywordId::InstanceOf),
    ("new", KeywordId::New),
    ("return", KeywordId::Return),
    ("super", KeywordId::Super),
    ("switch", KeywordId::Switch),
    ("this", KeywordId::This),
    ("throw", KeywordId::Throw),
    ("try", KeywordId::Try),
    ("typeof", KeywordId::TypeOf),
    ("var", KeywordId::Var),
    ("void", KeywordId::Void),
    ("while", KeywordId::While),
    ("with", KeywordId::With),
    ("true", KeywordId::True),
    ("false", KeywordId::False),
    ("null", KeywordId::Null),
];

/// Resolve an identifier spelling to a keyword id, if reserved.
pub fn keyword_id(name: &str) -> Option<KeywordId> {
    KEYWORDS.iter().find(|(s, _)| *s == name).map(|(_, id)| *id)
}

/// Canonical spelling of a keyword.
pub fn keyword_str(id: KeywordId) -> &'static str {
    KEYWORDS
        .iter()
        .find(|(_, k)| *k == id)
        .map(|(s, _)| *s)
        .unwrap_or("<keyword>")
}

/// Stable identifier for punctuators and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    // Delimiters
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    // Separators / markers
    Semi,
    Comma,
    Colon,
    Question,
    QuestionDot,
    Dot,
    Ellipsis,
    Arrow,
    At,
    // Operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Shl,
    Shr,
    UShr,
    Amp,
    Pipe,
    Caret,
    Bang,
    Tilde,
    AmpAmp,
    PipePipe,
    QuestionQuestion,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    ShlEq,
    ShrEq,
    UShrEq,
    AmpEq,
    PipeEq,
    CaretEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,
}

/// Punctuator spellings, longest first so the lexer can take the maximal munch.
pub const PUNCTUATORS: &[(&str, Punct)] = &[
    (">>>=", Punct::UShrEq),
    ("...", Punct::Ellipsis),
    ("===", Punct::EqEqEq),
    ("!==", Punct::NotEqEq),
    ("**=", Punct::StarStarEq),
    ("<<=", Punct::ShlEq),
    (">>=", Punct::ShrEq),
    (">>>", Punct::UShr),
    ("&&=", Punct::AmpAmpEq),
    ("||=", Punct::PipePipeEq),
    ("??=", Punct::QuestionQuestionEq),
    ("=>", Punct::Arrow),
    ("==", Punct::EqEq),
    ("!=", Punct::NotEq),
    ("<=", Punct::LtEq),
    (">=", Punct::GtEq),
    ("&&", Punct::AmpAmp),
    ("||", Punct::PipePipe),
    ("??", Punct::QuestionQuestion),
    ("?.", Punct::QuestionDot),
    ("++", Punct::PlusPlus),
    ("--", Punct::MinusMinus),
    ("+=", Punct::PlusEq),
    ("-=", Punct::MinusEq),
    ("*=", Punct::StarEq),
    ("/=", Punct::SlashEq),
    ("%=", Punct::PercentEq),
    ("&=", Punct::AmpEq),
    ("|=", Punct::PipeEq),
    ("^=", Punct::CaretEq),
    ("**", Punct::StarStar),
    ("<<", Punct::Shl),
    (">>", Punct::Shr),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    (";", Punct::Semi),
    (",", Punct::Comma),
    (":", Punct::Colon),
    ("?", Punct::Question),
    (".", Punct::Dot),
    ("@", Punct::At),
    ("+", Punct::Plus),
    ("-", Punct::Minus),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("%", Punct::Percent),
    ("&", Punct::Amp),
    ("|", Punct::Pipe),
    ("^", Punct::Caret),
    ("!", Punct::Bang),
    ("~", Punct::Tilde),
    ("<", Punct::Lt),
    (">", Punct::Gt),
    ("=", Punct::Eq),
];

/// Canonical spelling of a punctuator.
pub fn punct_str(id: Punct) -> &'static str {
    PUNCTUATORS
        .iter()
        .find(|(_, p)| *p == id)
        .map(|(s, _)| *s)
        .unwrap_or("<punct>")
}

// ============================================================================
// TOKEN TYPES
// ============================================================================

/// Kind of token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(KeywordId),
    Punct(Punct),

    Ident(String),
    /// `#name` inside class bodies
    PrivateName(String),
    Number(f64),
    BigInt(String),
    String(String),
    Template(Vec<TemplatePart>),
    Regex { pattern: String, flags: String },

    Eof,
}

/// Part of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    /// Raw source of a `${...}` substitution and its byte offset in the file.
    Expr { source: String, offset: usize },
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    /// Construct a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "'{}'", keyword_str(*k)),
            TokenKind::Punct(p) => write!(f, "'{}'", punct_str(*p)),
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::PrivateName(name) => write!(f, "'#{}'", name),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::BigInt(n) => write!(f, "bigint {}n", n),
            TokenKind::String(_) => write!(f, "string literal"),
            TokenKind::Template(_) => write!(f, "template literal"),
            TokenKind::Regex { .. } => write!(f, "regular expression"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
