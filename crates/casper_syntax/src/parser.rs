//! Tolerant parser for script sources
//!
//! Converts a token stream into a [`Program`]. The parser accepts the statement and expression
//! grammar of modern scripts (including module syntax) but only builds as much structure as
//! pattern matching and literal extraction need.
//!
//! ## Error tolerance
//!
//! - Errors inside nested blocks (function bodies, class bodies, control-flow blocks) are recovered:
//!   the offending statement is skipped and recorded in [`Program::recovered`].
//! - Errors at the top level, and errors that leave a block unterminated, abort parsing with a
//!   single [`ParseError`].
//!
//! ## Examples
//!
//! ```rust
//! use casper_syntax::{lexer, parser};
//!
//! let tokens = lexer::lex("casper.test.begin('adds', function (test) { test.done(); });").unwrap();
//! let program = parser::parse(&tokens).unwrap();
//! assert_eq!(program.body.len(), 1);
//! ```

use crate::ast::*;
use crate::diagnostics::{ParseError, SyntaxError};
use crate::lexer::{KeywordId, Punct, TemplatePart, Token, TokenKind};

// NOTE: This module is split across multiple files using `include!` to keep all parser
// methods in the same Rust module (preserving privacy + call patterns) while avoiding
// a single large source file.

include!("parser/core.rs");
include!("parser/helpers.rs");
include!("parser/stmts.rs");
include!("parser/decl.rs");
include!("parser/expr.rs");
include!("parser/api.rs");
include!("parser/tests.rs");
