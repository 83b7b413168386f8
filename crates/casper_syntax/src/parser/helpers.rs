/// Token cursor helpers.
///
/// Small predicates and consumers used by every other parser chunk. Tokens are borrowed for the
/// parser's lifetime `'a`, so these helpers hand out `&'a Token` without tying up `self`.
impl<'a> Parser<'a> {
    fn peek(&self) -> &'a Token {
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn peek_at(&self, offset: usize) -> &'a Token {
        let idx = (self.pos + offset).min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn previous(&self) -> &'a Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check_punct(&self, punct: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(punct)
    }

    fn check_keyword(&self, keyword: KeywordId) -> bool {
        self.peek().kind == TokenKind::Keyword(keyword)
    }

    /// Whether the current token is the contextual word `word` (lexed as an identifier).
    fn check_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Ident(name) if name == word)
    }

    fn match_punct(&mut self, punct: Punct) -> bool {
        if self.check_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_keyword(&mut self, keyword: KeywordId) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: Punct, what: &str) -> PResult<&'a Token> {
        if self.check_punct(punct) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_keyword(&mut self, keyword: KeywordId, what: &str) -> PResult<&'a Token> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_word(&mut self, word: &str) -> PResult<&'a Token> {
        if self.check_word(word) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", word)))
        }
    }

    /// A binding identifier (contextual words such as `async` or `of` are allowed).
    fn identifier(&mut self) -> PResult<Ident> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name.clone())
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// A property name after `.`: any identifier, including reserved words.
    fn identifier_name(&mut self) -> PResult<Ident> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name.clone())
            }
            TokenKind::Keyword(k) => {
                self.advance();
                Ok(crate::lexer::tokens::keyword_str(*k).to_string())
            }
            TokenKind::PrivateName(name) => {
                self.advance();
                Ok(format!("#{}", name))
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    fn string_literal(&mut self) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::String(value) => {
                self.advance();
                Ok(value.clone())
            }
            _ => Err(self.unexpected("string literal")),
        }
    }

    /// Consume a statement terminator, applying automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> PResult<()> {
        if self.match_punct(Punct::Semi) {
            return Ok(());
        }
        let next = self.peek();
        if next.newline_before || self.is_at_end() || next.kind == TokenKind::Punct(Punct::RBrace) {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        SyntaxError::new(format!("Expected {}, found {}", expected, token.kind), token.span)
    }

    /// Span from `start` to the end of the last consumed token.
    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.previous().span.end.max(start))
    }

    /// Run `f` one nesting level deeper, failing once [`MAX_NESTING`] is reached.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError::new("Nesting too deep", self.peek().span));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Run `f` with `in` re-enabled as a binary operator (inside brackets, arguments, ...).
    fn with_in_allowed<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    /// Run `f` inside a function body with the given async/generator context.
    fn with_function_context<T>(
        &mut self,
        is_async: bool,
        is_generator: bool,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = (self.in_async, self.in_generator, self.no_in);
        self.in_async = is_async;
        self.in_generator = is_generator;
        self.no_in = false;
        let result = f(self);
        (self.in_async, self.in_generator, self.no_in) = saved;
        result
    }
}
