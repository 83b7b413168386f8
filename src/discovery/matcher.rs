//! Call-pattern matching over the script AST
//!
//! A test declaration is a top-level expression statement shaped like
//! `root.sub.method('<name>', ...)`. The shape is data ([`CallPattern`]), so other harness
//! conventions only need a different dotted path or argument index.

use std::fmt;

use casper_syntax::ast::{Expr, Literal, MemberProp, Program, Span, Statement};
use casper_syntax::diagnostics::LineIndex;
use thiserror::Error;

/// Dotted callee path plus the index of the name argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPattern {
    path: Vec<String>,
    argument_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid call pattern '{pattern}': {reason}")]
pub struct PatternError {
    pub pattern: String,
    pub reason: String,
}

impl CallPattern {
    /// Parse `"casper.test.begin"`-style paths. Every segment must be a non-empty identifier.
    pub fn parse(dotted: &str, argument_index: usize) -> Result<Self, PatternError> {
        let error = |reason: &str| PatternError {
            pattern: dotted.to_string(),
            reason: reason.to_string(),
        };
        let path: Vec<String> = dotted.split('.').map(|s| s.trim().to_string()).collect();
        if path.iter().any(String::is_empty) {
            return Err(error("empty path segment"));
        }
        if let Some(bad) = path.iter().find(|s| !is_identifier(s)) {
            return Err(error(&format!("'{}' is not an identifier", bad)));
        }
        Ok(Self { path, argument_index })
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn argument_index(&self) -> usize {
        self.argument_index
    }
}

impl Default for CallPattern {
    fn default() -> Self {
        Self {
            path: vec!["casper".into(), "test".into(), "begin".into()],
            argument_index: 0,
        }
    }
}

impl fmt::Display for CallPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("."))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c == '$' || c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '$' || c == '_' || c.is_alphanumeric())
}

/// A matched declaration: the literal name and where its statement starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    /// 1-based
    pub line: usize,
    /// 0-based, in characters
    pub column: usize,
    pub span: Span,
}

/// Every top-level statement of `program` that matches `pattern`, in source order.
pub fn find_declarations(program: &Program, source: &str, pattern: &CallPattern) -> Vec<Declaration> {
    let index = LineIndex::new(source);
    program
        .body
        .iter()
        .filter_map(|stmt| {
            let name = match_statement(&stmt.node, pattern)?;
            let (line, column) = index.line_col(stmt.span.start);
            Some(Declaration {
                name,
                line,
                column,
                span: stmt.span,
            })
        })
        .collect()
}

fn match_statement(stmt: &Statement, pattern: &CallPattern) -> Option<String> {
    match stmt {
        Statement::Expr(expr) => match_call(&expr.node, pattern),
        _ => None,
    }
}

fn match_call(expr: &Expr, pattern: &CallPattern) -> Option<String> {
    let Expr::Call { callee, args, .. } = unparen(expr) else {
        return None;
    };
    if !matches_path(&callee.node, pattern.path()) {
        return None;
    }
    let name = literal_text(&args.get(pattern.argument_index())?.node)?;
    if name.trim().is_empty() {
        return None;
    }
    Some(name.to_string())
}

/// `a.b.c` (or `a['b'].c`) against `["a", "b", "c"]`, innermost segment last.
fn matches_path(expr: &Expr, path: &[String]) -> bool {
    let Some((last, rest)) = path.split_last() else {
        return false;
    };
    match unparen(expr) {
        Expr::Ident(name) => rest.is_empty() && name == last,
        Expr::Member { object, property, .. } if !rest.is_empty() => {
            let segment = match property {
                MemberProp::Ident(name) => Some(name.as_str()),
                MemberProp::Computed(key) => literal_text(&key.node),
            };
            segment == Some(last.as_str()) && matches_path(&object.node, rest)
        }
        _ => false,
    }
}

fn literal_text(expr: &Expr) -> Option<&str> {
    match unparen(expr) {
        Expr::Literal(Literal::String(value)) => Some(value.as_str()),
        Expr::Template(template) => template.as_plain(),
        _ => None,
    }
}

fn unparen(mut expr: &Expr) -> &Expr {
    while let Expr::Paren(inner) = expr {
        expr = &inner.node;
    }
    expr
}
