/// Declarations: variables, binding patterns, functions, classes and module items.
impl<'a> Parser<'a> {
    /// Declarator list after `var`/`let`/`const` (the keyword is already consumed).
    fn var_declarations(&mut self, kind: VarKind) -> PResult<VarDecl> {
        let mut declarators = Vec::new();
        loop {
            let target = self.binding_target()?;
            let init = if self.match_punct(Punct::Eq) {
                Some(self.assignment()?)
            } else {
                None
            };
            declarators.push(Declarator { target, init });
            if !self.match_punct(Punct::Comma) {
                break;
            }
        }
        Ok(VarDecl { kind, declarators })
    }

    // ========================================================================
    // Binding patterns
    // ========================================================================

    fn binding_target(&mut self) -> PResult<Spanned<Pattern>> {
        self.nested(|p| p.binding_target_body())
    }

    fn binding_target_body(&mut self) -> PResult<Spanned<Pattern>> {
        let start = self.peek().span.start;
        let pattern = match &self.peek().kind {
            TokenKind::Ident(_) => Pattern::Ident(self.identifier()?),
            TokenKind::Punct(Punct::LBrace) => self.object_pattern()?,
            TokenKind::Punct(Punct::LBracket) => self.array_pattern()?,
            _ => return Err(self.unexpected("binding name or pattern")),
        };
        Ok(Spanned::new(pattern, self.span_from(start)))
    }

    /// A binding target with an optional `= default`.
    fn binding_element(&mut self) -> PResult<Spanned<Pattern>> {
        let start = self.peek().span.start;
        let target = self.binding_target()?;
        if !self.match_punct(Punct::Eq) {
            return Ok(target);
        }
        let default = self.with_in_allowed(|p| p.assignment())?;
        Ok(Spanned::new(
            Pattern::Default(Box::new(target), Box::new(default)),
            self.span_from(start),
        ))
    }

    fn rest_element(&mut self) -> PResult<Spanned<Pattern>> {
        let start = self.peek().span.start;
        self.expect_punct(Punct::Ellipsis, "'...'")?;
        let inner = self.binding_target()?;
        Ok(Spanned::new(Pattern::Rest(Box::new(inner)), self.span_from(start)))
    }

    fn object_pattern(&mut self) -> PResult<Pattern> {
        self.expect_punct(Punct::LBrace, "'{'")?;
        let mut props = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.match_punct(Punct::Ellipsis) {
                props.push(PatternProp::Rest(self.binding_target()?));
            } else {
                let start = self.peek().span.start;
                let key = self.property_key()?;
                if self.match_punct(Punct::Colon) {
                    let value = self.binding_element()?;
                    props.push(PatternProp::KeyValue(key, value));
                } else {
                    let PropKey::Ident(name) = key else {
                        return Err(self.unexpected("':'"));
                    };
                    let mut target = Spanned::new(Pattern::Ident(name.clone()), self.span_from(start));
                    if self.match_punct(Punct::Eq) {
                        let default = self.with_in_allowed(|p| p.assignment())?;
                        target = Spanned::new(
                            Pattern::Default(Box::new(target), Box::new(default)),
                            self.span_from(start),
                        );
                    }
                    props.push(PatternProp::KeyValue(PropKey::Ident(name), target));
                }
            }
            if !self.match_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RBrace, "'}'")?;
        Ok(Pattern::Object(props))
    }

    fn array_pattern(&mut self) -> PResult<Pattern> {
        self.expect_punct(Punct::LBracket, "'['")?;
        let mut elements = Vec::new();
        while !self.check_punct(Punct::RBracket) {
            if self.match_punct(Punct::Comma) {
                elements.push(None);
                continue;
            }
            if self.check_punct(Punct::Ellipsis) {
                elements.push(Some(self.rest_element()?));
            } else {
                elements.push(Some(self.binding_element()?));
            }
            if !self.match_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RBracket, "']'")?;
        Ok(Pattern::Array(elements))
    }

    /// `(a, { b }, c = 1, ...rest)`
    fn formal_params(&mut self) -> PResult<Vec<Spanned<Pattern>>> {
        self.expect_punct(Punct::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.check_punct(Punct::RParen) {
            if self.check_punct(Punct::Ellipsis) {
                params.push(self.rest_element()?);
            } else {
                params.push(self.binding_element()?);
            }
            if !self.match_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_punct(Punct::RParen, "')'")?;
        Ok(params)
    }

    /// Object-literal, pattern and class-member keys.
    fn property_key(&mut self) -> PResult<PropKey> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Ident(_) | TokenKind::Keyword(_) | TokenKind::PrivateName(_) => {
                Ok(PropKey::Ident(self.identifier_name()?))
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(PropKey::String(value.clone()))
            }
            TokenKind::Number(value) => {
                self.advance();
                Ok(PropKey::Number(*value))
            }
            TokenKind::BigInt(digits) => {
                self.advance();
                Ok(PropKey::String(digits.clone()))
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.advance();
                let key = self.with_in_allowed(|p| p.assignment())?;
                self.expect_punct(Punct::RBracket, "']'")?;
                Ok(PropKey::Computed(Box::new(key)))
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    // ========================================================================
    // Functions and classes
    // ========================================================================

    /// `function [*] [name] (params) { body }`; any `async` prefix is already consumed.
    fn function(&mut self, is_async: bool, require_name: bool) -> PResult<Function> {
        self.expect_keyword(KeywordId::Function, "'function'")?;
        let is_generator = self.match_punct(Punct::Star);
        let name = match &self.peek().kind {
            TokenKind::Ident(_) => Some(self.identifier()?),
            _ if require_name => return Err(self.unexpected("function name")),
            _ => None,
        };
        let (params, body) = self.function_tail(is_async, is_generator)?;
        Ok(Function {
            name,
            params,
            body,
            is_async,
            is_generator,
        })
    }

    fn function_tail(
        &mut self,
        is_async: bool,
        is_generator: bool,
    ) -> PResult<(Vec<Spanned<Pattern>>, Vec<Spanned<Statement>>)> {
        self.with_function_context(is_async, is_generator, |p| {
            let params = p.formal_params()?;
            let (body, _) = p.block()?;
            Ok((params, body))
        })
    }

    /// Whether the token after the current one ends a member key, meaning the current
    /// contextual word (`get`, `static`, `async`, ...) is itself the key.
    fn next_is_member_end(&self) -> bool {
        matches!(
            self.peek_at(1).kind,
            TokenKind::Punct(
                Punct::LParen | Punct::Eq | Punct::Semi | Punct::RBrace | Punct::Comma | Punct::Colon
            )
        )
    }

    /// `async`, `*`, `get` and `set` prefixes of methods.
    fn method_modifiers(&mut self) -> (bool, bool, MethodKind) {
        let mut is_async = false;
        if self.check_word("async") && !self.next_is_member_end() && !self.peek_at(1).newline_before {
            self.advance();
            is_async = true;
        }
        let is_generator = self.match_punct(Punct::Star);
        let mut kind = MethodKind::Method;
        if !is_async && !is_generator && !self.next_is_member_end() {
            if self.match_word("get") {
                kind = MethodKind::Getter;
            } else if self.match_word("set") {
                kind = MethodKind::Setter;
            }
        }
        (is_async, is_generator, kind)
    }

    fn class(&mut self, require_name: bool) -> PResult<Class> {
        self.expect_keyword(KeywordId::Class, "'class'")?;
        let name = match &self.peek().kind {
            TokenKind::Ident(_) => Some(self.identifier()?),
            _ if require_name => return Err(self.unexpected("class name")),
            _ => None,
        };
        let extends = if self.match_keyword(KeywordId::Extends) {
            Some(Box::new(self.call_member()?))
        } else {
            None
        };

        let open = self.expect_punct(Punct::LBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.match_punct(Punct::RBrace) {
            if self.is_at_end() {
                return Err(SyntaxError::new("Expected '}' to close class body", open.span));
            }
            if self.match_punct(Punct::Semi) {
                continue;
            }
            members.push(self.class_member()?);
        }
        Ok(Class { name, extends, members })
    }

    fn class_member(&mut self) -> PResult<Spanned<ClassMember>> {
        let start = self.peek().span.start;
        let mut is_static = false;
        if self.check_word("static") && !self.next_is_member_end() {
            self.advance();
            is_static = true;
            if self.check_punct(Punct::LBrace) {
                let (body, _) = self.with_function_context(false, false, |p| p.block())?;
                return Ok(Spanned::new(ClassMember::StaticBlock(body), self.span_from(start)));
            }
        }

        let (is_async, is_generator, kind) = self.method_modifiers();
        let key = self.property_key()?;

        let member = if self.check_punct(Punct::LParen) {
            let (params, body) = self.function_tail(is_async, is_generator)?;
            ClassMember::Method {
                key,
                kind,
                is_static,
                function: Function {
                    name: None,
                    params,
                    body,
                    is_async,
                    is_generator,
                },
            }
        } else {
            let value = if self.match_punct(Punct::Eq) {
                Some(self.with_function_context(false, false, |p| p.assignment())?)
            } else {
                None
            };
            self.consume_semicolon()?;
            ClassMember::Field { key, is_static, value }
        };
        Ok(Spanned::new(member, self.span_from(start)))
    }

    // ========================================================================
    // Module items
    // ========================================================================

    fn module_export_name(&mut self) -> PResult<Ident> {
        match &self.peek().kind {
            TokenKind::String(name) => {
                self.advance();
                Ok(name.clone())
            }
            _ => self.identifier_name(),
        }
    }

    fn import_declaration(&mut self) -> PResult<ImportDecl> {
        self.expect_keyword(KeywordId::Import, "'import'")?;
        let mut specifiers = Vec::new();

        if let TokenKind::String(source) = &self.peek().kind {
            self.advance();
            self.consume_semicolon()?;
            return Ok(ImportDecl {
                specifiers,
                source: source.clone(),
            });
        }

        let mut more = true;
        if matches!(self.peek().kind, TokenKind::Ident(_)) {
            specifiers.push(ImportSpecifier::Default(self.identifier()?));
            more = self.match_punct(Punct::Comma);
        }
        if more {
            if self.match_punct(Punct::Star) {
                self.expect_word("as")?;
                specifiers.push(ImportSpecifier::Namespace(self.identifier()?));
            } else if self.match_punct(Punct::LBrace) {
                while !self.match_punct(Punct::RBrace) {
                    let imported = self.module_export_name()?;
                    let local = if self.match_word("as") {
                        self.identifier()?
                    } else {
                        imported.clone()
                    };
                    specifiers.push(ImportSpecifier::Named { imported, local });
                    if !self.check_punct(Punct::RBrace) {
                        self.expect_punct(Punct::Comma, "','")?;
                    }
                }
            } else {
                return Err(self.unexpected("import specifier"));
            }
        }

        self.expect_word("from")?;
        let source = self.string_literal()?;
        self.consume_semicolon()?;
        Ok(ImportDecl { specifiers, source })
    }

    fn export_declaration(&mut self) -> PResult<ExportDecl> {
        self.expect_keyword(KeywordId::Export, "'export'")?;

        if self.match_keyword(KeywordId::Default) {
            let start = self.peek().span.start;
            if self.check_keyword(KeywordId::Function) || (self.check_word("async") && self.async_function_ahead()) {
                let is_async = self.match_word("async");
                let function = self.function(is_async, false)?;
                return Ok(ExportDecl::Default(Spanned::new(
                    Expr::Function(function),
                    self.span_from(start),
                )));
            }
            if self.check_keyword(KeywordId::Class) {
                let class = self.class(false)?;
                return Ok(ExportDecl::Default(Spanned::new(Expr::Class(class), self.span_from(start))));
            }
            let value = self.with_in_allowed(|p| p.assignment())?;
            self.consume_semicolon()?;
            return Ok(ExportDecl::Default(value));
        }

        if self.match_punct(Punct::Star) {
            let alias = if self.match_word("as") {
                Some(self.module_export_name()?)
            } else {
                None
            };
            self.expect_word("from")?;
            let source = self.string_literal()?;
            self.consume_semicolon()?;
            return Ok(ExportDecl::All { alias, source });
        }

        if self.match_punct(Punct::LBrace) {
            let mut names = Vec::new();
            while !self.match_punct(Punct::RBrace) {
                let local = self.module_export_name()?;
                let exported = if self.match_word("as") {
                    self.module_export_name()?
                } else {
                    local.clone()
                };
                names.push((local, exported));
                if !self.check_punct(Punct::RBrace) {
                    self.expect_punct(Punct::Comma, "','")?;
                }
            }
            let source = if self.match_word("from") {
                Some(self.string_literal()?)
            } else {
                None
            };
            self.consume_semicolon()?;
            return Ok(ExportDecl::Named { names, source });
        }

        let declares = match &self.peek().kind {
            TokenKind::Keyword(KeywordId::Var | KeywordId::Const | KeywordId::Function | KeywordId::Class) => true,
            TokenKind::Ident(name) if name == "let" => self.let_starts_declaration(),
            TokenKind::Ident(name) if name == "async" => self.async_function_ahead(),
            _ => false,
        };
        if !declares {
            return Err(self.unexpected("declaration after 'export'"));
        }
        Ok(ExportDecl::Declaration(Box::new(self.statement()?)))
    }
}
