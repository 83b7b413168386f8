/// Expression parsing.
///
/// Precedence from loosest to tightest: sequence, assignment/arrow/yield, conditional, binary
/// (precedence climbing over [`Parser::binary_op`]), unary/await, postfix update, call/member,
/// primary.
impl<'a> Parser<'a> {
    fn expression(&mut self) -> PResult<Spanned<Expr>> {
        let first = self.assignment()?;
        if !self.check_punct(Punct::Comma) {
            return Ok(first);
        }
        let start = first.span.start;
        let mut exprs = vec![first];
        while self.match_punct(Punct::Comma) {
            exprs.push(self.assignment()?);
        }
        Ok(Spanned::new(Expr::Sequence(exprs), self.span_from(start)))
    }

    fn assignment(&mut self) -> PResult<Spanned<Expr>> {
        self.nested(|p| p.assignment_body())
    }

    fn assignment_body(&mut self) -> PResult<Spanned<Expr>> {
        if self.is_arrow_ahead() {
            return self.arrow_function();
        }
        if self.in_generator && self.check_word("yield") {
            return self.yield_expression();
        }

        let start = self.peek().span.start;
        let target = self.conditional()?;
        let op = match &self.peek().kind {
            TokenKind::Punct(p) => assign_op(*p),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(target);
        };
        self.advance();
        let value = self.assignment()?;
        Ok(Spanned::new(
            Expr::Assign(Box::new(target), op, Box::new(value)),
            self.span_from(start),
        ))
    }

    /// Scan ahead for `ident =>`, `(...) =>` and their `async` forms.
    fn is_arrow_ahead(&self) -> bool {
        let mut offset = 0;
        if self.check_word("async")
            && !self.peek_at(1).newline_before
            && matches!(self.peek_at(1).kind, TokenKind::Ident(_) | TokenKind::Punct(Punct::LParen))
        {
            offset = 1;
        }
        let is_arrow = |token: &Token| token.kind == TokenKind::Punct(Punct::Arrow) && !token.newline_before;

        match &self.peek_at(offset).kind {
            TokenKind::Ident(_) => is_arrow(self.peek_at(offset + 1)),
            TokenKind::Punct(Punct::LParen) => {
                let mut depth = 0usize;
                let mut i = offset;
                loop {
                    match &self.peek_at(i).kind {
                        TokenKind::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => depth += 1,
                        TokenKind::Punct(Punct::RParen | Punct::RBracket | Punct::RBrace) => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                return is_arrow(self.peek_at(i + 1));
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    i += 1;
                }
            }
            _ => false,
        }
    }

    fn arrow_function(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        let is_async = self.check_word("async")
            && matches!(self.peek_at(1).kind, TokenKind::Ident(_) | TokenKind::Punct(Punct::LParen));
        if is_async {
            self.advance();
        }

        let params = if matches!(self.peek().kind, TokenKind::Ident(_)) {
            let param_start = self.peek().span.start;
            let name = self.identifier()?;
            vec![Spanned::new(Pattern::Ident(name), self.span_from(param_start))]
        } else {
            self.with_function_context(is_async, false, |p| p.formal_params())?
        };
        self.expect_punct(Punct::Arrow, "'=>'")?;

        let body = if self.check_punct(Punct::LBrace) {
            ArrowBody::Block(self.with_function_context(is_async, false, |p| p.block().map(|(body, _)| body))?)
        } else {
            ArrowBody::Expr(Box::new(self.with_function_context(is_async, false, |p| p.assignment())?))
        };

        Ok(Spanned::new(
            Expr::Arrow(ArrowFunction { params, body, is_async }),
            self.span_from(start),
        ))
    }

    fn yield_expression(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        self.advance();
        let delegate = !self.peek().newline_before && self.match_punct(Punct::Star);
        let has_argument = !self.peek().newline_before
            && !matches!(
                self.peek().kind,
                TokenKind::Punct(
                    Punct::RParen | Punct::RBracket | Punct::RBrace | Punct::Comma | Punct::Semi | Punct::Colon
                ) | TokenKind::Eof
            );
        let argument = if delegate || has_argument {
            Some(Box::new(self.assignment()?))
        } else {
            None
        };
        Ok(Spanned::new(Expr::Yield { argument, delegate }, self.span_from(start)))
    }

    fn conditional(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        let test = self.binary(1)?;
        if !self.match_punct(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.with_in_allowed(|p| p.assignment())?;
        self.expect_punct(Punct::Colon, "':'")?;
        let alternate = self.assignment()?;
        Ok(Spanned::new(
            Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            self.span_from(start),
        ))
    }

    /// Binary operator at the cursor with its binding power.
    fn binary_op(&self) -> Option<(BinaryOp, u8)> {
        let op = match &self.peek().kind {
            TokenKind::Punct(p) => match p {
                Punct::QuestionQuestion => (BinaryOp::Nullish, 1),
                Punct::PipePipe => (BinaryOp::Or, 2),
                Punct::AmpAmp => (BinaryOp::And, 3),
                Punct::Pipe => (BinaryOp::BitOr, 4),
                Punct::Caret => (BinaryOp::BitXor, 5),
                Punct::Amp => (BinaryOp::BitAnd, 6),
                Punct::EqEq => (BinaryOp::Eq, 7),
                Punct::NotEq => (BinaryOp::NotEq, 7),
                Punct::EqEqEq => (BinaryOp::StrictEq, 7),
                Punct::NotEqEq => (BinaryOp::StrictNotEq, 7),
                Punct::Lt => (BinaryOp::Lt, 8),
                Punct::Gt => (BinaryOp::Gt, 8),
                Punct::LtEq => (BinaryOp::LtEq, 8),
                Punct::GtEq => (BinaryOp::GtEq, 8),
                Punct::Shl => (BinaryOp::Shl, 9),
                Punct::Shr => (BinaryOp::Shr, 9),
                Punct::UShr => (BinaryOp::UShr, 9),
                Punct::Plus => (BinaryOp::Add, 10),
                Punct::Minus => (BinaryOp::Sub, 10),
                Punct::Star => (BinaryOp::Mul, 11),
                Punct::Slash => (BinaryOp::Div, 11),
                Punct::Percent => (BinaryOp::Mod, 11),
                Punct::StarStar => (BinaryOp::Pow, 12),
                _ => return None,
            },
            TokenKind::Keyword(KeywordId::In) if !self.no_in => (BinaryOp::In, 8),
            TokenKind::Keyword(KeywordId::InstanceOf) => (BinaryOp::InstanceOf, 8),
            _ => return None,
        };
        Some(op)
    }

    fn binary(&mut self, min_prec: u8) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        let mut left = self.unary()?;
        while let Some((op, prec)) = self.binary_op() {
            if prec < min_prec {
                break;
            }
            self.advance();
            // `**` is right-associative
            let next_min = if op == BinaryOp::Pow { prec } else { prec + 1 };
            let right = self.nested(|p| p.binary(next_min))?;
            left = Spanned::new(
                Expr::Binary(Box::new(left), op, Box::new(right)),
                self.span_from(start),
            );
        }
        Ok(left)
    }

    fn unary(&mut self) -> PResult<Spanned<Expr>> {
        self.nested(|p| p.unary_body())
    }

    fn unary_body(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        let op = match &self.peek().kind {
            TokenKind::Punct(Punct::Bang) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Neg),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Keyword(KeywordId::TypeOf) => Some(UnaryOp::TypeOf),
            TokenKind::Keyword(KeywordId::Void) => Some(UnaryOp::Void),
            TokenKind::Keyword(KeywordId::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            return Ok(Spanned::new(Expr::Unary(op, Box::new(operand)), self.span_from(start)));
        }

        if let TokenKind::Punct(p @ (Punct::PlusPlus | Punct::MinusMinus)) = &self.peek().kind {
            let op = if *p == Punct::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let target = self.unary()?;
            return Ok(Spanned::new(
                Expr::Update {
                    op,
                    prefix: true,
                    target: Box::new(target),
                },
                self.span_from(start),
            ));
        }

        if self.check_word("await") && self.await_is_operator() {
            self.advance();
            let argument = self.unary()?;
            return Ok(Spanned::new(Expr::Await(Box::new(argument)), self.span_from(start)));
        }

        let expr = self.call_member()?;
        let next = self.peek();
        if !next.newline_before {
            let op = match next.kind {
                TokenKind::Punct(Punct::PlusPlus) => Some(UpdateOp::Increment),
                TokenKind::Punct(Punct::MinusMinus) => Some(UpdateOp::Decrement),
                _ => None,
            };
            if let Some(op) = op {
                self.advance();
                return Ok(Spanned::new(
                    Expr::Update {
                        op,
                        prefix: false,
                        target: Box::new(expr),
                    },
                    self.span_from(start),
                ));
            }
        }
        Ok(expr)
    }

    /// `await` is an operator inside async functions, and at the top level when an operand
    /// follows on the same line.
    fn await_is_operator(&self) -> bool {
        if self.in_async {
            return true;
        }
        let next = self.peek_at(1);
        !next.newline_before
            && matches!(
                next.kind,
                TokenKind::Ident(_)
                    | TokenKind::Keyword(KeywordId::New | KeywordId::This | KeywordId::Function)
                    | TokenKind::Punct(Punct::LParen | Punct::LBracket)
            )
    }

    /// Call and member chains, including optional chaining and tagged templates.
    fn call_member(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        let mut expr = if self.check_keyword(KeywordId::New) {
            self.new_expression()?
        } else {
            self.primary()?
        };

        loop {
            let token = self.peek();
            let node = match &token.kind {
                TokenKind::Punct(Punct::Dot) => {
                    self.advance();
                    let name = self.identifier_name()?;
                    member(expr, MemberProp::Ident(name), false)
                }
                TokenKind::Punct(Punct::QuestionDot) => {
                    self.advance();
                    if self.check_punct(Punct::LParen) {
                        let args = self.arguments()?;
                        Expr::Call {
                            callee: Box::new(expr),
                            args,
                            optional: true,
                        }
                    } else if self.check_punct(Punct::LBracket) {
                        let property = self.computed_property()?;
                        member(expr, property, true)
                    } else {
                        let name = self.identifier_name()?;
                        member(expr, MemberProp::Ident(name), true)
                    }
                }
                TokenKind::Punct(Punct::LBracket) => {
                    let property = self.computed_property()?;
                    member(expr, property, false)
                }
                TokenKind::Punct(Punct::LParen) => {
                    let args = self.arguments()?;
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                    }
                }
                TokenKind::Template(parts) => {
                    self.advance();
                    let template = self.template(parts)?;
                    Expr::TaggedTemplate(Box::new(expr), template)
                }
                _ => break,
            };
            expr = Spanned::new(node, self.span_from(start));
        }
        Ok(expr)
    }

    fn computed_property(&mut self) -> PResult<MemberProp> {
        self.expect_punct(Punct::LBracket, "'['")?;
        let property = self.with_in_allowed(|p| p.expression())?;
        self.expect_punct(Punct::RBracket, "']'")?;
        Ok(MemberProp::Computed(Box::new(property)))
    }

    fn new_expression(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        self.expect_keyword(KeywordId::New, "'new'")?;
        if self.match_punct(Punct::Dot) {
            let property = self.identifier()?;
            return Ok(Spanned::new(
                Expr::MetaProperty("new".to_string(), property),
                self.span_from(start),
            ));
        }

        let callee = if self.check_keyword(KeywordId::New) {
            self.nested(|p| p.new_expression())?
        } else {
            self.member_only()?
        };
        let args = if self.check_punct(Punct::LParen) {
            self.arguments()?
        } else {
            Vec::new()
        };
        Ok(Spanned::new(
            Expr::New {
                callee: Box::new(callee),
                args,
            },
            self.span_from(start),
        ))
    }

    /// Member chain without calls (the callee of `new`).
    fn member_only(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        let mut expr = self.primary()?;
        loop {
            let node = if self.match_punct(Punct::Dot) {
                let name = self.identifier_name()?;
                member(expr, MemberProp::Ident(name), false)
            } else if self.check_punct(Punct::LBracket) {
                let property = self.computed_property()?;
                member(expr, property, false)
            } else {
                break;
            };
            expr = Spanned::new(node, self.span_from(start));
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> PResult<Vec<Spanned<Expr>>> {
        self.expect_punct(Punct::LParen, "'('")?;
        self.with_in_allowed(|p| {
            let mut args = Vec::new();
            while !p.check_punct(Punct::RParen) {
                args.push(p.spread_or_assignment()?);
                if !p.match_punct(Punct::Comma) {
                    break;
                }
            }
            p.expect_punct(Punct::RParen, "')'")?;
            Ok(args)
        })
    }

    fn spread_or_assignment(&mut self) -> PResult<Spanned<Expr>> {
        let start = self.peek().span.start;
        if self.match_punct(Punct::Ellipsis) {
            let inner = self.assignment()?;
            return Ok(Spanned::new(Expr::Spread(Box::new(inner)), self.span_from(start)));
        }
        self.assignment()
    }

    fn primary(&mut self) -> PResult<Spanned<Expr>> {
        let token = self.peek();
        let start = token.span.start;
        let expr = match &token.kind {
            TokenKind::Ident(name) if name == "async" && self.async_function_ahead() => {
                self.advance();
                Expr::Function(self.function(true, false)?)
            }
            TokenKind::Ident(name) => {
                self.advance();
                Expr::Ident(name.clone())
            }
            TokenKind::Number(value) => {
                self.advance();
                Expr::Literal(Literal::Number(*value))
            }
            TokenKind::BigInt(digits) => {
                self.advance();
                Expr::Literal(Literal::BigInt(digits.clone()))
            }
            TokenKind::String(value) => {
                self.advance();
                Expr::Literal(Literal::String(value.clone()))
            }
            TokenKind::Regex { pattern, flags } => {
                self.advance();
                Expr::Literal(Literal::Regex {
                    pattern: pattern.clone(),
                    flags: flags.clone(),
                })
            }
            TokenKind::Template(parts) => {
                self.advance();
                Expr::Template(self.template(parts)?)
            }
            TokenKind::Keyword(KeywordId::True) => {
                self.advance();
                Expr::Literal(Literal::Bool(true))
            }
            TokenKind::Keyword(KeywordId::False) => {
                self.advance();
                Expr::Literal(Literal::Bool(false))
            }
            TokenKind::Keyword(KeywordId::Null) => {
                self.advance();
                Expr::Literal(Literal::Null)
            }
            TokenKind::Keyword(KeywordId::This) => {
                self.advance();
                Expr::This
            }
            TokenKind::Keyword(KeywordId::Super) => {
                self.advance();
                Expr::Super
            }
            TokenKind::Keyword(KeywordId::Function) => Expr::Function(self.function(false, false)?),
            TokenKind::Keyword(KeywordId::Class) => Expr::Class(self.class(false)?),
            TokenKind::Keyword(KeywordId::Import) => {
                self.advance();
                if self.match_punct(Punct::Dot) {
                    Expr::MetaProperty("import".to_string(), self.identifier()?)
                } else {
                    // dynamic `import(specifier)`
                    let args = self.arguments()?;
                    Expr::Call {
                        callee: Box::new(Spanned::new(Expr::Ident("import".to_string()), token.span)),
                        args,
                        optional: false,
                    }
                }
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.with_in_allowed(|p| p.expression())?;
                self.expect_punct(Punct::RParen, "')'")?;
                Expr::Paren(Box::new(inner))
            }
            TokenKind::Punct(Punct::LBracket) => Expr::Array(self.array_literal()?),
            TokenKind::Punct(Punct::LBrace) => Expr::Object(self.object_literal()?),
            _ => return Err(self.unexpected("expression")),
        };
        Ok(Spanned::new(expr, self.span_from(start)))
    }

    fn array_literal(&mut self) -> PResult<Vec<Option<Spanned<Expr>>>> {
        self.expect_punct(Punct::LBracket, "'['")?;
        self.with_in_allowed(|p| {
            let mut elements = Vec::new();
            while !p.check_punct(Punct::RBracket) {
                if p.match_punct(Punct::Comma) {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(p.spread_or_assignment()?));
                if !p.match_punct(Punct::Comma) {
                    break;
                }
            }
            p.expect_punct(Punct::RBracket, "']'")?;
            Ok(elements)
        })
    }

    fn object_literal(&mut self) -> PResult<Vec<Property>> {
        self.expect_punct(Punct::LBrace, "'{'")?;
        self.with_in_allowed(|p| {
            let mut props = Vec::new();
            while !p.check_punct(Punct::RBrace) {
                props.push(p.property()?);
                if !p.match_punct(Punct::Comma) {
                    break;
                }
            }
            p.expect_punct(Punct::RBrace, "'}'")?;
            Ok(props)
        })
    }

    fn property(&mut self) -> PResult<Property> {
        if self.match_punct(Punct::Ellipsis) {
            return Ok(Property::Spread(self.assignment()?));
        }

        let (is_async, is_generator, kind) = self.method_modifiers();
        let key_token = self.peek();
        let key = self.property_key()?;

        if self.check_punct(Punct::LParen) {
            let (params, body) = self.function_tail(is_async, is_generator)?;
            return Ok(Property::Method {
                key,
                kind,
                function: Function {
                    name: None,
                    params,
                    body,
                    is_async,
                    is_generator,
                },
            });
        }
        if self.match_punct(Punct::Colon) {
            return Ok(Property::KeyValue(key, self.assignment()?));
        }

        match key {
            PropKey::Ident(name) if matches!(key_token.kind, TokenKind::Ident(_)) => {
                // `{ a = 1 }` only appears as an assignment target; the default is not kept
                if self.match_punct(Punct::Eq) {
                    self.assignment()?;
                }
                Ok(Property::Shorthand(name))
            }
            _ => Err(self.unexpected("':'")),
        }
    }

    /// Build a [`Template`], parsing each `${}` substitution from its captured source.
    fn template(&mut self, parts: &[TemplatePart]) -> PResult<Template> {
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(text) => current.push_str(text),
                TemplatePart::Expr { source, offset } => {
                    quasis.push(std::mem::take(&mut current));
                    exprs.push(self.substitution(source, *offset)?);
                }
            }
        }
        quasis.push(current);
        Ok(Template { quasis, exprs })
    }

    fn substitution(&mut self, source: &str, offset: usize) -> PResult<Spanned<Expr>> {
        let tokens = crate::lexer::lex_fragment(source, offset)?;
        let mut sub = Parser::new(&tokens);
        sub.in_async = self.in_async;
        sub.in_generator = self.in_generator;
        sub.depth = self.depth;
        let expr = sub.expression()?;
        if !sub.is_at_end() {
            return Err(sub.unexpected("'}'"));
        }
        self.recovered.extend(sub.recovered);
        Ok(expr)
    }
}

fn member(object: Spanned<Expr>, property: MemberProp, optional: bool) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property,
        optional,
    }
}

fn assign_op(punct: Punct) -> Option<AssignOp> {
    let op = match punct {
        Punct::Eq => AssignOp::Assign,
        Punct::PlusEq => AssignOp::Add,
        Punct::MinusEq => AssignOp::Sub,
        Punct::StarEq => AssignOp::Mul,
        Punct::SlashEq => AssignOp::Div,
        Punct::PercentEq => AssignOp::Mod,
        Punct::StarStarEq => AssignOp::Pow,
        Punct::ShlEq => AssignOp::Shl,
        Punct::ShrEq => AssignOp::Shr,
        Punct::UShrEq => AssignOp::UShr,
        Punct::AmpEq => AssignOp::BitAnd,
        Punct::PipeEq => AssignOp::BitOr,
        Punct::CaretEq => AssignOp::BitXor,
        Punct::AmpAmpEq => AssignOp::And,
        Punct::PipePipeEq => AssignOp::Or,
        Punct::QuestionQuestionEq => AssignOp::Nullish,
        _ => return None,
    };
    Some(op)
}
