//! String scanning for the lexer
//!
//! Handles quoted strings, template literals (with `${}` substitutions) and regular expressions.

use super::tokens::{TemplatePart, TokenKind};
use super::{Lexer, is_line_terminator};
use crate::diagnostics::SyntaxError;

/// Result of processing an escape sequence
enum EscapeResult {
    Char(char),
    /// `\` followed by a line terminator: contributes nothing
    LineContinuation,
    Eof,
}

impl<'a> Lexer<'a> {
    /// Process an escape sequence. Called after consuming the backslash.
    fn scan_escape(&mut self) -> EscapeResult {
        let Some(c) = self.advance() else {
            return EscapeResult::Eof;
        };
        let cooked = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !self.peek().is_some_and(|d| d.is_ascii_digit()) => '\0',
            'x' => return self.scan_hex_escape(2).map_or(EscapeResult::Char('x'), EscapeResult::Char),
            'u' => {
                if self.match_char('{') {
                    let start = self.current_pos;
                    while self.peek().is_some_and(|d| d.is_ascii_hexdigit()) {
                        self.advance();
                    }
                    let digits = &self.source[start..self.current_pos];
                    let value = u32::from_str_radix(digits, 16).ok().and_then(char::from_u32);
                    if !self.match_char('}') {
                        return EscapeResult::Char('u');
                    }
                    return EscapeResult::Char(value.unwrap_or('\u{fffd}'));
                }
                return self.scan_hex_escape(4).map_or(EscapeResult::Char('u'), EscapeResult::Char);
            }
            '\r' => {
                self.match_char('\n');
                return EscapeResult::LineContinuation;
            }
            c if is_line_terminator(c) => return EscapeResult::LineContinuation,
            other => other,
        };
        EscapeResult::Char(cooked)
    }

    fn scan_hex_escape(&mut self, digits: usize) -> Option<char> {
        let rest = self.rest();
        let hex = rest.get(..digits)?;
        if !hex.chars().all(|d| d.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        self.current_pos += digits;
        // Lone surrogates cannot be represented; substitute the replacement character
        Some(char::from_u32(value).unwrap_or('\u{fffd}'))
    }

    /// Scan a `'...'` or `"..."` literal. The opening quote is already consumed.
    pub(super) fn scan_string(&mut self, start: usize, quote: char) -> Result<(), SyntaxError> {
        let mut value = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some('\\') => match self.scan_escape() {
                    EscapeResult::Char(c) => value.push(c),
                    EscapeResult::LineContinuation => {}
                    EscapeResult::Eof => return Err(self.error("Unterminated string literal", start)),
                },
                Some(c) if c == '\n' || c == '\r' => {
                    return Err(self.error("Unterminated string literal", start));
                }
                Some(c) => value.push(c),
                None => return Err(self.error("Unterminated string literal", start)),
            }
        }
        self.push_token(TokenKind::String(value), start);
        Ok(())
    }

    /// Scan a template literal. The opening backtick is already consumed.
    ///
    /// Substitutions are captured as raw source (with their file offset); the parser lexes and
    /// parses them separately.
    pub(super) fn scan_template(&mut self, start: usize) -> Result<(), SyntaxError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            match self.advance() {
                Some('`') => break,
                Some('\\') => match self.scan_escape() {
                    EscapeResult::Char(c) => literal.push(c),
                    EscapeResult::LineContinuation => {}
                    EscapeResult::Eof => return Err(self.error("Unterminated template literal", start)),
                },
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    let expr_start = self.current_pos;
                    self.skip_balanced_substitution(start)?;
                    // current_pos is just past the closing '}'
                    let source = self.source[expr_start..self.current_pos - 1].to_string();
                    parts.push(TemplatePart::Expr {
                        source,
                        offset: self.base_offset + expr_start,
                    });
                }
                Some(c) => literal.push(c),
                None => return Err(self.error("Unterminated template literal", start)),
            }
        }
        parts.push(TemplatePart::Literal(literal));
        self.push_token(TokenKind::Template(parts), start);
        Ok(())
    }

    /// Skip the body of a `${...}` substitution, including the closing brace.
    fn skip_balanced_substitution(&mut self, template_start: usize) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        loop {
            let Some(c) = self.advance() else {
                return Err(self.error("Unterminated template literal", template_start));
            };
            match c {
                '{' => depth += 1,
                '}' if depth == 0 => return Ok(()),
                '}' => depth -= 1,
                '"' | '\'' => self.skip_raw_string(c, template_start)?,
                '`' => self.skip_raw_template(template_start)?,
                '/' if self.peek() == Some('/') => self.skip_line(),
                '/' if self.peek() == Some('*') => {
                    self.advance();
                    while !self.rest().starts_with("*/") {
                        if self.advance().is_none() {
                            return Err(self.error("Unterminated block comment", template_start));
                        }
                    }
                    self.current_pos += 2;
                }
                _ => {}
            }
        }
    }

    fn skip_raw_string(&mut self, quote: char, template_start: usize) -> Result<(), SyntaxError> {
        loop {
            match self.advance() {
                Some('\\') => {
                    self.advance();
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
                None => return Err(self.error("Unterminated string literal", template_start)),
            }
        }
    }

    fn skip_raw_template(&mut self, template_start: usize) -> Result<(), SyntaxError> {
        loop {
            match self.advance() {
                Some('\\') => {
                    self.advance();
                }
                Some('`') => return Ok(()),
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    self.skip_balanced_substitution(template_start)?;
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated template literal", template_start)),
            }
        }
    }

    /// Scan a regular expression literal. The opening slash is already consumed.
    pub(super) fn scan_regex(&mut self, start: usize) -> Result<(), SyntaxError> {
        let body_start = self.current_pos;
        let mut in_class = false;
        loop {
            match self.advance() {
                Some('\\') => {
                    if self.advance().is_none_or(is_line_terminator) {
                        return Err(self.error("Unterminated regular expression", start));
                    }
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error("Unterminated regular expression", start));
                }
                Some(_) => {}
                None => return Err(self.error("Unterminated regular expression", start)),
            }
        }
        let pattern = self.source[body_start..self.current_pos - 1].to_string();
        let flags = self.scan_identifier_text();
        self.push_token(TokenKind::Regex { pattern, flags }, start);
        Ok(())
    }
}
