/// Statement parsing.
///
/// Dispatches on the leading token. Contextual words (`let`, `async`) are disambiguated with one
/// token of lookahead; everything that is not a recognised statement form is an expression
/// statement terminated by `;` or automatic semicolon insertion.
impl<'a> Parser<'a> {
    fn statement(&mut self) -> PResult<Spanned<Statement>> {
        self.nested(|p| p.statement_body())
    }

    fn statement_body(&mut self) -> PResult<Spanned<Statement>> {
        let token = self.peek();
        let start = token.span.start;
        let stmt = match &token.kind {
            TokenKind::Punct(Punct::LBrace) => {
                let (body, span) = self.block()?;
                return Ok(Spanned::new(Statement::Block(body), span));
            }
            TokenKind::Punct(Punct::Semi) => {
                self.advance();
                Statement::Empty
            }
            TokenKind::Keyword(KeywordId::Var) => {
                self.advance();
                self.var_statement(VarKind::Var)?
            }
            TokenKind::Keyword(KeywordId::Const) => {
                self.advance();
                self.var_statement(VarKind::Const)?
            }
            TokenKind::Ident(name) if name == "let" && self.let_starts_declaration() => {
                self.advance();
                self.var_statement(VarKind::Let)?
            }
            TokenKind::Keyword(KeywordId::Function) => Statement::Function(self.function(false, true)?),
            TokenKind::Ident(name) if name == "async" && self.async_function_ahead() => {
                self.advance();
                Statement::Function(self.function(true, true)?)
            }
            TokenKind::Keyword(KeywordId::Class) => Statement::Class(self.class(true)?),
            TokenKind::Keyword(KeywordId::If) => self.if_statement()?,
            TokenKind::Keyword(KeywordId::For) => self.for_statement()?,
            TokenKind::Keyword(KeywordId::While) => {
                self.advance();
                let condition = self.paren_expression()?;
                let body = Box::new(self.statement()?);
                Statement::While(WhileStmt { condition, body })
            }
            TokenKind::Keyword(KeywordId::Do) => {
                self.advance();
                let body = Box::new(self.statement()?);
                self.expect_keyword(KeywordId::While, "'while'")?;
                let condition = self.paren_expression()?;
                self.match_punct(Punct::Semi);
                Statement::DoWhile(WhileStmt { condition, body })
            }
            TokenKind::Keyword(KeywordId::With) => {
                self.advance();
                let condition = self.paren_expression()?;
                let body = Box::new(self.statement()?);
                Statement::With(WhileStmt { condition, body })
            }
            TokenKind::Keyword(KeywordId::Return) => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume_semicolon()?;
                Statement::Return(value)
            }
            TokenKind::Keyword(KeywordId::Throw) => {
                self.advance();
                if self.peek().newline_before {
                    return Err(SyntaxError::new("Illegal newline after throw", self.peek().span));
                }
                let value = self.expression()?;
                self.consume_semicolon()?;
                Statement::Throw(value)
            }
            TokenKind::Keyword(KeywordId::Try) => self.try_statement()?,
            TokenKind::Keyword(KeywordId::Switch) => self.switch_statement()?,
            TokenKind::Keyword(KeywordId::Break) => {
                self.advance();
                Statement::Break(self.jump_label()?)
            }
            TokenKind::Keyword(KeywordId::Continue) => {
                self.advance();
                Statement::Continue(self.jump_label()?)
            }
            TokenKind::Keyword(KeywordId::Debugger) => {
                self.advance();
                self.consume_semicolon()?;
                Statement::Debugger
            }
            TokenKind::Keyword(KeywordId::Import)
                if !matches!(self.peek_at(1).kind, TokenKind::Punct(Punct::LParen | Punct::Dot)) =>
            {
                Statement::Import(self.import_declaration()?)
            }
            TokenKind::Keyword(KeywordId::Export) => Statement::Export(self.export_declaration()?),
            TokenKind::Ident(label) if self.peek_at(1).kind == TokenKind::Punct(Punct::Colon) => {
                self.advance();
                self.advance();
                let body = self.statement()?;
                Statement::Labeled(label.clone(), Box::new(body))
            }
            _ => {
                let expr = self.expression()?;
                self.consume_semicolon()?;
                Statement::Expr(expr)
            }
        };
        Ok(Spanned::new(stmt, self.span_from(start)))
    }

    fn var_statement(&mut self, kind: VarKind) -> PResult<Statement> {
        let decl = self.var_declarations(kind)?;
        self.consume_semicolon()?;
        Ok(Statement::Var(decl))
    }

    /// `let` is only a declaration keyword when a binding follows it.
    fn let_starts_declaration(&self) -> bool {
        matches!(
            self.peek_at(1).kind,
            TokenKind::Ident(_) | TokenKind::Punct(Punct::LBracket | Punct::LBrace)
        )
    }

    fn async_function_ahead(&self) -> bool {
        let next = self.peek_at(1);
        next.kind == TokenKind::Keyword(KeywordId::Function) && !next.newline_before
    }

    /// Whether the current position ends a statement (for restricted productions like `return`).
    fn at_statement_end(&self) -> bool {
        let token = self.peek();
        token.newline_before
            || matches!(
                token.kind,
                TokenKind::Punct(Punct::Semi | Punct::RBrace) | TokenKind::Eof
            )
    }

    fn jump_label(&mut self) -> PResult<Option<Ident>> {
        let label = match &self.peek().kind {
            TokenKind::Ident(name) if !self.peek().newline_before => {
                self.advance();
                Some(name.clone())
            }
            _ => None,
        };
        self.consume_semicolon()?;
        Ok(label)
    }

    fn paren_expression(&mut self) -> PResult<Spanned<Expr>> {
        self.expect_punct(Punct::LParen, "'('")?;
        let expr = self.with_in_allowed(|p| p.expression())?;
        self.expect_punct(Punct::RParen, "')'")?;
        Ok(expr)
    }

    fn if_statement(&mut self) -> PResult<Statement> {
        self.expect_keyword(KeywordId::If, "'if'")?;
        let condition = self.paren_expression()?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_keyword(KeywordId::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStmt {
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn for_statement(&mut self) -> PResult<Statement> {
        self.expect_keyword(KeywordId::For, "'for'")?;
        // for await (... of ...)
        self.match_word("await");
        self.expect_punct(Punct::LParen, "'('")?;

        let init = if self.check_punct(Punct::Semi) {
            None
        } else {
            let saved = std::mem::replace(&mut self.no_in, true);
            let init = self.for_init();
            self.no_in = saved;
            Some(init?)
        };

        match init {
            Some(left) if self.check_word("of") || self.check_keyword(KeywordId::In) => {
                let is_of = self.check_word("of");
                self.advance();
                let right = if is_of {
                    self.with_in_allowed(|p| p.assignment())?
                } else {
                    self.with_in_allowed(|p| p.expression())?
                };
                self.expect_punct(Punct::RParen, "')'")?;
                let body = Box::new(self.statement()?);
                Ok(Statement::ForIn(ForInStmt {
                    left,
                    is_of,
                    right,
                    body,
                }))
            }
            init => {
                self.expect_punct(Punct::Semi, "';'")?;
                let test = if self.check_punct(Punct::Semi) {
                    None
                } else {
                    Some(self.with_in_allowed(|p| p.expression())?)
                };
                self.expect_punct(Punct::Semi, "';'")?;
                let update = if self.check_punct(Punct::RParen) {
                    None
                } else {
                    Some(self.with_in_allowed(|p| p.expression())?)
                };
                self.expect_punct(Punct::RParen, "')'")?;
                let body = Box::new(self.statement()?);
                Ok(Statement::For(ForStmt {
                    init,
                    test,
                    update,
                    body,
                }))
            }
        }
    }

    fn for_init(&mut self) -> PResult<ForInit> {
        if self.match_keyword(KeywordId::Var) {
            return Ok(ForInit::Var(self.var_declarations(VarKind::Var)?));
        }
        if self.match_keyword(KeywordId::Const) {
            return Ok(ForInit::Var(self.var_declarations(VarKind::Const)?));
        }
        if self.check_word("let") && self.let_starts_declaration() {
            self.advance();
            return Ok(ForInit::Var(self.var_declarations(VarKind::Let)?));
        }
        Ok(ForInit::Expr(self.expression()?))
    }

    fn try_statement(&mut self) -> PResult<Statement> {
        let keyword = self.expect_keyword(KeywordId::Try, "'try'")?;
        let (block, _) = self.block()?;

        let handler = if self.match_keyword(KeywordId::Catch) {
            let param = if self.match_punct(Punct::LParen) {
                let param = self.binding_target()?;
                self.expect_punct(Punct::RParen, "')'")?;
                Some(param)
            } else {
                None
            };
            let (body, _) = self.block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.match_keyword(KeywordId::Finally) {
            Some(self.block()?.0)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(SyntaxError::new("Missing catch or finally after try", keyword.span));
        }
        Ok(Statement::Try(TryStmt {
            block,
            handler,
            finalizer,
        }))
    }

    fn switch_statement(&mut self) -> PResult<Statement> {
        self.expect_keyword(KeywordId::Switch, "'switch'")?;
        let discriminant = self.paren_expression()?;
        self.expect_punct(Punct::LBrace, "'{'")?;

        let mut cases = Vec::new();
        while !self.match_punct(Punct::RBrace) {
            let test = if self.match_keyword(KeywordId::Case) {
                Some(self.with_in_allowed(|p| p.expression())?)
            } else {
                self.expect_keyword(KeywordId::Default, "'case' or 'default'")?;
                None
            };
            self.expect_punct(Punct::Colon, "':'")?;

            let mut body = Vec::new();
            while !self.check_keyword(KeywordId::Case)
                && !self.check_keyword(KeywordId::Default)
                && !self.check_punct(Punct::RBrace)
            {
                if self.is_at_end() {
                    return Err(self.unexpected("'}'"));
                }
                body.push(self.statement()?);
            }
            cases.push(SwitchCase { test, body });
        }

        Ok(Statement::Switch(SwitchStmt { discriminant, cases }))
    }
}
