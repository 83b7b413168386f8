/// Parser core types and entrypoint.
///
/// This chunk defines the [`Parser`] type, its top-level `parse()` entrypoint and the block-level
/// error recovery shared by every construct that owns a `{ ... }` body.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser` to keep all parser methods in a
///   single module while avoiding a single “god file”.
type PResult<T> = Result<T, SyntaxError>;

/// Deepest statement/expression/pattern nesting accepted before parsing fails.
pub const MAX_NESTING: usize = 160;

/// Parser state.
///
/// ## Notes
/// - The parser is single-pass. Top-level errors abort; block-level errors are recovered by
///   synchronizing at the next statement boundary inside the enclosing block.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    recovered: Vec<SyntaxError>,
    /// `in` is not a binary operator while parsing a `for (...)` initializer.
    no_in: bool,
    in_async: bool,
    in_generator: bool,
    /// Current nesting level, bounded by [`MAX_NESTING`].
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for a token stream.
    ///
    /// ## Parameters
    /// - `tokens`: Token stream produced by `casper_syntax::lexer` (must end with `Eof`).
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            recovered: Vec::new(),
            no_in: false,
            in_async: false,
            in_generator: false,
            depth: 0,
        }
    }

    /// Parse the entire token stream into a [`Program`].
    ///
    /// ## Errors
    /// Returns the first unrecoverable [`SyntaxError`]. Recovered errors are kept in
    /// [`Program::recovered`].
    pub fn parse(mut self) -> Result<Program, SyntaxError> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.statement()?);
        }
        Ok(Program {
            body,
            recovered: self.recovered,
        })
    }

    /// Parse `{ statements }` with statement-level recovery.
    ///
    /// Returns the statements and the span covering the braces.
    fn block(&mut self) -> PResult<(Vec<Spanned<Statement>>, Span)> {
        self.nested(|p| p.block_body())
    }

    fn block_body(&mut self) -> PResult<(Vec<Spanned<Statement>>, Span)> {
        let open = self.expect_punct(Punct::LBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.is_at_end() {
                return Err(SyntaxError::new("Expected '}' before end of file", open.span));
            }
            let before = self.pos;
            match self.statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    if self.is_at_end() {
                        return Err(e);
                    }
                    tracing::trace!(message = %e.message, "recovering inside block");
                    self.recovered.push(e);
                    self.synchronize();
                    if self.pos == before && !self.check_punct(Punct::RBrace) {
                        self.advance();
                    }
                }
            }
        }
        let close = self.advance();
        Ok((statements, open.span.merge(close.span)))
    }

    /// Skip tokens up to the next statement boundary inside the current block.
    ///
    /// Stops after a `;` at depth zero, or before a `}` that closes the current block.
    fn synchronize(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match &self.peek().kind {
                TokenKind::Punct(Punct::LBrace | Punct::LParen | Punct::LBracket) => depth += 1,
                TokenKind::Punct(Punct::RBrace) if depth == 0 => return,
                TokenKind::Punct(Punct::RBrace | Punct::RParen | Punct::RBracket) => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Punct(Punct::Semi) if depth == 0 => {
                    self.advance();
                    return;
                }
                _ if depth == 0 && self.peek().newline_before && self.starts_declaration() => return,
                _ => {}
            }
            self.advance();
        }
    }

    fn starts_declaration(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Keyword(
                KeywordId::Var
                    | KeywordId::Const
                    | KeywordId::Function
                    | KeywordId::Class
                    | KeywordId::If
                    | KeywordId::For
                    | KeywordId::While
                    | KeywordId::Return
                    | KeywordId::Try
            )
        )
    }
}
