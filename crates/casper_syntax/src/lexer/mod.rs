//! Lexer for script sources
//!
//! Handles tokenization including:
//! - Reserved words and identifiers (contextual words stay identifiers)
//! - Numeric, string, template and regular-expression literals
//! - Punctuators (maximal munch over [`tokens::PUNCTUATORS`])
//! - Line/block comments and a leading hashbang line
//!
//! ## Module Structure
//!
//! - `tokens` - Token types and vocabulary (KeywordId, Punct, TokenKind, Token)
//! - `strings` - String, template and regex scanning
//! - `numbers` - Numeric literal scanning

mod numbers;
mod strings;
pub mod tokens;

pub use tokens::{KeywordId, Punct, TemplatePart, Token, TokenKind, keyword_id};

use crate::ast::Span;
use crate::diagnostics::SyntaxError;

// ============================================================================
// LEXER STATE
// ----------------------------------------------------------------------------
// A `/` is ambiguous: it starts a regex where an expression may begin and is
// division elsewhere. The lexer decides from the previous significant token,
// which is enough for the sources we need to pattern match.
// ============================================================================

/// Lexer for script source code.
pub struct Lexer<'a> {
    source: &'a str,
    /// Byte offset of the next unread character
    current_pos: usize,
    /// Offset added to every span (non-zero when lexing an embedded `${}` substitution)
    base_offset: usize,
    newline_pending: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self::with_offset(source, 0)
    }

    /// Create a lexer whose spans are shifted by `base_offset`.
    pub fn with_offset(source: &'a str, base_offset: usize) -> Self {
        Self {
            source,
            current_pos: 0,
            base_offset,
            newline_pending: false,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the entire source code.
    ///
    /// The token stream always ends with an `Eof` token. Lexical errors (unterminated literals,
    /// unknown characters) cannot be recovered from and abort tokenization.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        if self.base_offset == 0 && self.source.starts_with("#!") {
            self.skip_line();
        }

        loop {
            self.skip_trivia()?;
            if self.is_at_end() {
                break;
            }
            self.scan_token()?;
        }

        let end = self.current_pos;
        self.push_token(TokenKind::Eof, end);
        Ok(self.tokens)
    }

    // ========================================================================
    // Core character handling
    // ========================================================================

    fn is_at_end(&self) -> bool {
        self.current_pos >= self.source.len()
    }

    fn rest(&self) -> &'a str {
        &self.source[self.current_pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.rest().chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current_pos += c.len_utf8();
        Some(c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.base_offset + start, self.base_offset + self.current_pos)
    }

    fn error(&self, message: impl Into<String>, start: usize) -> SyntaxError {
        SyntaxError::new(message, self.span_from(start))
    }

    fn push_token(&mut self, kind: TokenKind, start: usize) {
        let mut token = Token::new(kind, self.span_from(start));
        token.newline_before = std::mem::take(&mut self.newline_pending);
        self.tokens.push(token);
    }

    // ========================================================================
    // Whitespace and comments
    // ========================================================================

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                break;
            }
            self.advance();
        }
    }

    fn skip_trivia(&mut self) -> Result<(), SyntaxError> {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                self.newline_pending = true;
                self.advance();
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.advance();
            } else if c == '/' && self.peek_next() == Some('/') {
                self.skip_line();
            } else if c == '/' && self.peek_next() == Some('*') {
                let start = self.current_pos;
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        Some(c) if is_line_terminator(c) => self.newline_pending = true,
                        Some(_) => {}
                        None => return Err(self.error("Unterminated block comment", start)),
                    }
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Main scanning dispatch
    // ========================================================================

    fn scan_token(&mut self) -> Result<(), SyntaxError> {
        let start = self.current_pos;
        let Some(c) = self.peek() else {
            return Ok(());
        };

        match c {
            '"' | '\'' => {
                self.advance();
                self.scan_string(start, c)
            }
            '`' => {
                self.advance();
                self.scan_template(start)
            }
            '0'..='9' => self.scan_number(start),
            '.' if self.peek_next().is_some_and(|d| d.is_ascii_digit()) => self.scan_number(start),
            '/' if self.regex_allowed() => {
                self.advance();
                self.scan_regex(start)
            }
            '#' => {
                self.advance();
                if !self.peek().is_some_and(is_ident_start) {
                    return Err(self.error("Unexpected character '#'", start));
                }
                let name = self.scan_identifier_text();
                self.push_token(TokenKind::PrivateName(name), start);
                Ok(())
            }
            _ if is_ident_start(c) => {
                let name = self.scan_identifier_text();
                let kind = match keyword_id(&name) {
                    Some(id) => TokenKind::Keyword(id),
                    None => TokenKind::Ident(name),
                };
                self.push_token(kind, start);
                Ok(())
            }
            _ => self.scan_punct(start),
        }
    }

    fn scan_punct(&mut self, start: usize) -> Result<(), SyntaxError> {
        let rest = self.rest();
        let found = tokens::PUNCTUATORS
            .iter()
            .find(|(spelling, _)| rest.starts_with(spelling))
            .copied();

        let Some((spelling, mut id)) = found else {
            self.advance();
            let c = self.source[start..self.current_pos].to_string();
            return Err(self.error(format!("Unexpected character '{}'", c), start));
        };

        // `a?.5:b` is a conditional, not optional chaining
        let mut len = spelling.len();
        if id == Punct::QuestionDot && rest[2..].starts_with(|d: char| d.is_ascii_digit()) {
            id = Punct::Question;
            len = 1;
        }

        self.current_pos += len;
        self.push_token(TokenKind::Punct(id), start);
        Ok(())
    }

    fn scan_identifier_text(&mut self) -> String {
        let start = self.current_pos;
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        self.source[start..self.current_pos].to_string()
    }

    /// Whether a `/` at the current position starts a regular expression literal.
    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            None => true,
            Some(TokenKind::Punct(p)) => !matches!(
                p,
                Punct::RParen | Punct::RBracket | Punct::PlusPlus | Punct::MinusMinus
            ),
            Some(TokenKind::Keyword(k)) => !matches!(
                k,
                KeywordId::This | KeywordId::Super | KeywordId::True | KeywordId::False | KeywordId::Null
            ),
            Some(_) => false,
        }
    }
}

pub(crate) fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '$' || c == '_' || c == '\u{200c}' || c == '\u{200d}' || c.is_alphanumeric()
}

/// Tokenize script source.
pub fn lex(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source).tokenize()
}

/// Tokenize a fragment that starts at `base_offset` within a larger file.
pub fn lex_fragment(source: &str, base_offset: usize) -> Result<Vec<Token>, SyntaxError> {
    Lexer::with_offset(source, base_offset).tokenize()
}

// ============================================================================
// TESTS
// ============================================================================
