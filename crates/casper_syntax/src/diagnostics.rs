//! Diagnostics for the syntax frontend
//!
//! - [`SyntaxError`] is the internal currency of the lexer and parser.
//! - [`ParseError`] is what callers see when a file cannot be parsed at all.
//! - [`ParseReport`] renders a [`ParseError`] through miette with the offending source line.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::ast::Span;

/// A syntax error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    /// Resolve the span against `source` to produce a located [`ParseError`].
    pub fn locate(&self, source: &str) -> ParseError {
        let index = LineIndex::new(source);
        let (line, column) = index.line_col(self.span.start);
        ParseError {
            line,
            column,
            description: self.message.clone(),
            span: self.span,
        }
    }
}

/// Unrecoverable parse failure for one source file.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {description}")]
pub struct ParseError {
    /// 1-based line of the offending token
    pub line: usize,
    /// 0-based column (in characters)
    pub column: usize,
    pub description: String,
    pub span: Span,
}

impl ParseError {
    /// Build a miette report that shows `description` underneath the source line.
    pub fn to_report(&self, file_name: &str, source: &str) -> ParseReport {
        let len = self.span.end.saturating_sub(self.span.start).max(1);
        let start = self.span.start.min(source.len());
        ParseReport {
            description: self.description.clone(),
            src: NamedSource::new(file_name, source.to_string()),
            at: (start, len.min(source.len().saturating_sub(start).max(1))).into(),
        }
    }
}

/// Rich rendering of a [`ParseError`].
#[derive(Debug, Error, Diagnostic)]
#[error("syntax error: {description}")]
#[diagnostic(code(casper::syntax))]
pub struct ParseReport {
    pub description: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub at: SourceSpan,
}

/// Maps byte offsets to line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { source, line_starts }
    }

    /// 1-based line and 0-based character column for a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.line_starts[line_idx];
        let column = self
            .source
            .get(line_start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - line_start);
        (line_idx + 1, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        let index = LineIndex::new("abc\ndef");
        assert_eq!(index.line_col(0), (1, 0));
        assert_eq!(index.line_col(2), (1, 2));
    }

    #[test]
    fn test_line_col_after_newline() {
        let index = LineIndex::new("abc\ndef\n\nx");
        assert_eq!(index.line_col(4), (2, 0));
        assert_eq!(index.line_col(9), (4, 0));
    }

    #[test]
    fn test_line_col_counts_chars_not_bytes() {
        let source = "é = 1";
        let index = LineIndex::new(source);
        assert_eq!(index.line_col(source.find('=').unwrap()), (1, 2));
    }

    #[test]
    fn test_locate_syntax_error() {
        let err = SyntaxError::new("Unexpected token", Span::new(6, 7));
        let located = err.locate("a;\nb;\n)");
        assert_eq!(located.line, 3);
        assert_eq!(located.column, 0);
        assert_eq!(located.to_string(), "line 3: Unexpected token");
    }
}
