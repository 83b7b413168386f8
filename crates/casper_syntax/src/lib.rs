//! Syntax frontend for CasperJS test scripts: lexer, parser, AST, diagnostics.
//!
//! This crate is dependency-light and only concerned with turning script text into a structural
//! tree. It knows nothing about test runners, engines or processes.
//!
//! ## Notes
//! - The parser is tolerant inside nested blocks and strict at the top level; see [`parser`].
//! - Spans are byte offsets into the original file, including spans inside template substitutions.
//!
//! ## Examples
//! ```rust
//! use casper_syntax::parser;
//!
//! let program = parser::parse_source("casper.test.begin('smoke', function (test) {});").unwrap();
//! assert_eq!(program.body.len(), 1);
//! assert!(program.recovered.is_empty());
//! ```

pub mod ast;
pub mod diagnostics;
pub mod lexer;
pub mod parser;

pub use diagnostics::{ParseError, ParseReport};
pub use parser::parse_source;
