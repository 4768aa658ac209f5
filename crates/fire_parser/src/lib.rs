use fire_ast::*;
use fire_lexer::{Lexer, Span, SpannedToken, Token};

pub struct Parser<'src> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    source: &'src str,
    next_id: NodeId,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {}..{}", span.start, span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

pub type ParseResult<T> = Result<T, ParseError>;

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        let tokens = Lexer::tokenize(source)
            .map_err(|e| ParseError { message: e.message, span: e.span })?;
        Ok(Self { tokens, pos: 0, source, next_id: 0 })
    }

    pub fn parse(source: &str) -> ParseResult<Program> {
        let mut parser = Parser::new(source)?;
        parser.parse_program()
    }

    // === Token Access ===

    fn current(&self) -> &SpannedToken {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_nth(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].token
    }

    fn peek_span(&self) -> Span {
        self.current().span
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)].span
    }

    fn advance(&mut self) -> &SpannedToken {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> ParseResult<SpannedToken> {
        if self.check(&expected) {
            Ok(self.advance().clone())
        } else {
            Err(self.error(format!("expected '{}', found '{}'", expected, self.peek())))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<Ident> {
        match self.peek().clone() {
            Token::Ident(name) => {
                let span = self.peek_span();
                self.advance();
                Ok(Ident::new(name, span))
            }
            _ => Err(self.error(format!("expected identifier, found '{}'", self.peek()))),
        }
    }

    fn error(&self, message: String) -> ParseError {
        ParseError { message, span: self.peek_span() }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // === Parsing ===

    fn parse_program(&mut self) -> ParseResult<Program> {
        let id = self.fresh_id();
        let mut stmts = Vec::new();

        while !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        let span = Span::new(0, self.source.len());
        Ok(Program { body: Block { id, stmts, span, frame_size: 0 } })
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.peek_span();
        let id = self.fresh_id();
        self.expect(Token::LBrace)?;

        let mut stmts = Vec::new();

        while !self.check(&Token::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        let end = self.expect(Token::RBrace)?;
        let span = Span::new(start.start, end.span.end);

        Ok(Block { id, stmts, span, frame_size: 0 })
    }

    fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        let start = self.peek_span();
        let kind = match self.peek() {
            Token::Let => {
                self.advance();
                StmtKind::Let(self.parse_var_def()?)
            }
            // `x: int = 1` declares without `let`
            Token::Ident(_) if matches!(self.peek_nth(1), Token::Colon) => {
                StmtKind::Let(self.parse_var_def()?)
            }
            Token::Fn => StmtKind::Fn(self.parse_fn_def(false)?),
            Token::Class => StmtKind::Class(self.parse_class_def()?),
            Token::Enum => StmtKind::Enum(self.parse_enum_def()?),
            Token::Namespace => StmtKind::Namespace(self.parse_namespace()?),
            Token::If => StmtKind::If(self.parse_if_stmt()?),
            Token::While => StmtKind::While(self.parse_while_stmt()?),
            Token::Try => StmtKind::Try(self.parse_try_stmt()?),
            Token::LBrace => StmtKind::Block(self.parse_block()?),
            Token::Return => {
                self.advance();
                if self.check(&Token::Semi) || self.check(&Token::RBrace) || self.is_at_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr()?))
                }
            }
            Token::Throw => {
                self.advance();
                StmtKind::Throw(self.parse_expr()?)
            }
            Token::Break => {
                self.advance();
                StmtKind::Break
            }
            Token::Continue => {
                self.advance();
                StmtKind::Continue
            }
            _ => StmtKind::Expr(self.parse_expr()?),
        };
        let span = Span::new(start.start, self.prev_span().end);

        // Consume optional semicolon
        self.eat(&Token::Semi);

        Ok(Stmt { kind, span })
    }

    /// `name [: type] [= init]`, after an optional `let`
    fn parse_var_def(&mut self) -> ParseResult<LetStmt> {
        let name = self.expect_ident()?;

        let ty = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let init = if self.eat(&Token::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        Ok(LetStmt { name, ty, init, slot: None, declared: None })
    }

    fn parse_fn_def(&mut self, is_method: bool) -> ParseResult<FnDef> {
        let start = self.peek_span();
        let id = self.fresh_id();
        self.expect(Token::Fn)?;

        let name = self.expect_ident()?;
        self.expect(Token::LParen)?;

        let has_self = self.check(&Token::SelfLower);
        if has_self {
            if !is_method {
                return Err(self.error("'self' is only allowed in member functions".to_string()));
            }
            self.advance();
            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        } else if is_method {
            return Err(self.error(format!(
                "member function '{}' must take 'self' as its first parameter",
                name.name
            )));
        }

        let params = self.parse_param_list()?;
        self.expect(Token::RParen)?;

        let return_type = if self.eat(&Token::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        let span = Span::new(start.start, body.span.end);

        Ok(FnDef { id, name, has_self, params, return_type, body, span, func: None })
    }

    fn parse_param_list(&mut self) -> ParseResult<Vec<Param>> {
        let mut params: Vec<Param> = Vec::new();

        while !self.check(&Token::RParen) && !self.is_at_end() {
            if let Some(last) = params.last() {
                if last.variadic {
                    return Err(ParseError {
                        message: format!("variadic parameter '{}' must be the last parameter", last.name.name),
                        span: last.span,
                    });
                }
            }
            params.push(self.parse_param()?);

            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }

        Ok(params)
    }

    fn parse_param(&mut self) -> ParseResult<Param> {
        let name = self.expect_ident()?;

        let ty = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let variadic = self.eat(&Token::Ellipsis);

        let span = Span::new(name.span.start, self.prev_span().end);
        Ok(Param { name, ty, variadic, span })
    }

    fn parse_class_def(&mut self) -> ParseResult<ClassDef> {
        let start = self.peek_span();
        self.expect(Token::Class)?;
        let name = self.expect_ident()?;
        self.expect(Token::LBrace)?;

        let mut fields = Vec::new();
        let mut methods = Vec::new();

        while !self.check(&Token::RBrace) && !self.is_at_end() {
            if self.check(&Token::Fn) {
                methods.push(self.parse_fn_def(true)?);
                continue;
            }

            self.eat(&Token::Let);
            let field_name = self.expect_ident()?;
            let ty = if self.eat(&Token::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let default = if self.eat(&Token::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            let span = Span::new(field_name.span.start, self.prev_span().end);
            fields.push(FieldDef { name: field_name, ty, default, span });

            if !self.eat(&Token::Semi) {
                self.eat(&Token::Comma);
            }
        }

        let end = self.expect(Token::RBrace)?;
        let span = Span::new(start.start, end.span.end);

        Ok(ClassDef { name, fields, methods, span, class: None })
    }

    fn parse_enum_def(&mut self) -> ParseResult<EnumDef> {
        let start = self.peek_span();
        self.expect(Token::Enum)?;
        let name = self.expect_ident()?;
        self.expect(Token::LBrace)?;

        let mut variants = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_at_end() {
            variants.push(self.expect_ident()?);

            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }

        let end = self.expect(Token::RBrace)?;
        let span = Span::new(start.start, end.span.end);

        Ok(EnumDef { name, variants, span, enum_id: None })
    }

    fn parse_namespace(&mut self) -> ParseResult<NamespaceDef> {
        self.expect(Token::Namespace)?;
        let name = self.expect_ident()?;
        let body = self.parse_block()?;
        Ok(NamespaceDef { name, body, frame_key: None })
    }

    fn parse_if_stmt(&mut self) -> ParseResult<IfStmt> {
        self.expect(Token::If)?;

        let cond = self.parse_expr()?;
        let then_block = self.parse_block()?;

        let else_branch = if self.eat(&Token::Else) {
            if self.check(&Token::If) {
                Some(ElseBranch::If(Box::new(self.parse_if_stmt()?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(IfStmt { cond, then_block, else_branch })
    }

    fn parse_while_stmt(&mut self) -> ParseResult<WhileStmt> {
        let id = self.fresh_id();
        self.expect(Token::While)?;

        let cond = self.parse_expr()?;
        let body = self.parse_block()?;

        Ok(WhileStmt { id, cond, body })
    }

    fn parse_try_stmt(&mut self) -> ParseResult<TryStmt> {
        self.expect(Token::Try)?;
        let body = self.parse_block()?;

        let mut catches = Vec::new();
        while self.check(&Token::Catch) {
            let start = self.advance().span;
            let name = self.expect_ident()?;
            let ty = if self.eat(&Token::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let body = self.parse_block()?;
            let span = Span::new(start.start, body.span.end);
            catches.push(CatchClause { name, ty, body, span, resolved: None });
        }

        if catches.is_empty() {
            return Err(self.error(format!("expected 'catch' after try block, found '{}'", self.peek())));
        }

        Ok(TryStmt { body, catches })
    }

    // === Types ===

    fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let name = if self.check(&Token::NoneLit) {
            let span = self.advance().span;
            Ident::new("none".to_string(), span)
        } else {
            self.expect_ident()?
        };

        let args = if self.check(&Token::Lt) {
            self.parse_type_args()?
        } else {
            Vec::new()
        };

        let span = Span::new(name.span.start, self.prev_span().end);
        Ok(TypeExpr { name, args, span })
    }

    /// Parse type arguments: <int, string>
    fn parse_type_args(&mut self) -> ParseResult<Vec<TypeExpr>> {
        self.expect(Token::Lt)?;

        let mut args = Vec::new();
        while !self.check_type_args_end() && !self.is_at_end() {
            args.push(self.parse_type()?);

            if !self.check_type_args_end() {
                self.expect(Token::Comma)?;
            }
        }

        self.expect_type_args_end()?;
        Ok(args)
    }

    fn check_type_args_end(&self) -> bool {
        self.check(&Token::Gt) || self.check(&Token::Shr)
    }

    /// Consume one `>`, splitting a `>>` closing two argument lists.
    fn expect_type_args_end(&mut self) -> ParseResult<()> {
        if self.check(&Token::Shr) {
            let span = self.peek_span();
            let idx = self.pos;
            self.tokens[idx] = SpannedToken { token: Token::Gt, span: Span::new(span.start + 1, span.end) };
            return Ok(());
        }
        self.expect(Token::Gt).map(|_| ())
    }

    // === Expression Parsing (Pratt Parser) ===

    fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_binary_inner(0)?;

        let op = match self.peek() {
            Token::Eq => None,
            Token::PlusEq => Some(BinOp::Add),
            Token::MinusEq => Some(BinOp::Sub),
            Token::StarEq => Some(BinOp::Mul),
            Token::SlashEq => Some(BinOp::Div),
            _ => return Ok(expr),
        };

        self.advance();
        let rhs = self.parse_assignment()?;
        let span = Span::new(expr.span.start, rhs.span.end);
        Ok(Expr::new(ExprKind::Assign(Box::new(expr), op, Box::new(rhs)), span))
    }

    fn parse_binary_inner(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut left = self.parse_unary_inner()?;

        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }

            self.advance(); // consume operator
            let right = self.parse_binary_inner(prec + 1)?;

            let span = Span::new(left.span.start, right.span.end);
            left = Expr::new(ExprKind::Binary(Box::new(left), op, Box::new(right)), span);
        }

        Ok(left)
    }

    fn peek_binop(&self) -> Option<BinOp> {
        match self.peek() {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            Token::Percent => Some(BinOp::Mod),
            Token::Shl => Some(BinOp::Shl),
            Token::Shr => Some(BinOp::Shr),
            Token::Amp => Some(BinOp::BitAnd),
            Token::Pipe => Some(BinOp::BitOr),
            Token::Caret => Some(BinOp::BitXor),
            Token::EqEq => Some(BinOp::Eq),
            Token::NotEq => Some(BinOp::NotEq),
            Token::Lt => Some(BinOp::Lt),
            Token::Gt => Some(BinOp::Gt),
            Token::LtEq => Some(BinOp::LtEq),
            Token::GtEq => Some(BinOp::GtEq),
            Token::AndAnd => Some(BinOp::And),
            Token::OrOr => Some(BinOp::Or),
            _ => None,
        }
    }

    fn parse_unary_inner(&mut self) -> ParseResult<Expr> {
        let start = self.peek_span();

        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Not => UnaryOp::Not,
            Token::Tilde => UnaryOp::BitNot,
            _ => return self.parse_postfix_inner(),
        };

        self.advance();
        let expr = self.parse_unary_inner()?;
        let span = Span::new(start.start, expr.span.end);
        Ok(Expr::new(ExprKind::Unary(op, Box::new(expr)), span))
    }

    fn parse_postfix_inner(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary_inner()?;

        loop {
            if self.eat(&Token::LParen) {
                // Function call
                let args = self.parse_arg_list()?;
                let end = self.expect(Token::RParen)?;
                let span = Span::new(expr.span.start, end.span.end);
                expr = Expr::new(
                    ExprKind::Call(CallExpr { callee: Box::new(expr), args, target: None }),
                    span,
                );
            } else if self.eat(&Token::Dot) {
                // Member access
                let member = self.expect_ident()?;
                let span = Span::new(expr.span.start, member.span.end);
                expr = Expr::new(ExprKind::Member(Box::new(expr), member), span);
            } else if self.eat(&Token::LBracket) {
                // Index
                let index = self.parse_expr()?;
                let end = self.expect(Token::RBracket)?;
                let span = Span::new(expr.span.start, end.span.end);
                expr = Expr::new(ExprKind::Index(Box::new(expr), Box::new(index)), span);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> ParseResult<Vec<CallArg>> {
        let mut args = Vec::new();

        while !self.check(&Token::RParen) && !self.is_at_end() {
            let start = self.peek_span();
            let label = match self.peek() {
                Token::Ident(name) if matches!(self.peek_nth(1), Token::Colon) => Some(name.clone()),
                _ => None,
            };
            let name = label.map(|name| {
                self.advance();
                self.advance();
                Ident::new(name, start)
            });
            let value = self.parse_expr()?;
            let span = Span::new(start.start, value.span.end);
            args.push(CallArg { name, value, span });

            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }

        Ok(args)
    }

    fn parse_primary_inner(&mut self) -> ParseResult<Expr> {
        let start = self.peek_span();

        let kind = match self.peek().clone() {
            Token::IntLiteral(n) => ExprKind::IntLiteral(n),
            Token::SizeLiteral(n) => ExprKind::SizeLiteral(n),
            Token::FloatLiteral(n) => ExprKind::FloatLiteral(n),
            Token::True => ExprKind::BoolLiteral(true),
            Token::False => ExprKind::BoolLiteral(false),
            Token::CharLiteral(c) => ExprKind::CharLiteral(c),
            Token::StringLiteral(s) => ExprKind::StringLiteral(s),
            Token::NoneLit => ExprKind::NoneLiteral,
            Token::SelfLower => ExprKind::Ident(Ident::new("self".to_string(), start)),
            Token::Ident(name) => {
                self.advance();
                let ident = Ident::new(name, start);

                if !self.check(&Token::ColonColon) {
                    return Ok(Expr::new(ExprKind::Ident(ident), start));
                }

                let mut path = vec![ident];
                while self.eat(&Token::ColonColon) {
                    path.push(self.expect_ident()?);
                }
                let span = Span::new(start.start, self.prev_span().end);
                return Ok(Expr::new(ExprKind::ScopeResol(path), span));
            }
            Token::LBracket => {
                self.advance();
                let mut elems = Vec::new();
                while !self.check(&Token::RBracket) && !self.is_at_end() {
                    elems.push(self.parse_expr()?);
                    if !self.check(&Token::RBracket) {
                        self.expect(Token::Comma)?;
                    }
                }
                let end = self.expect(Token::RBracket)?;
                return Ok(Expr::new(ExprKind::Array(elems), Span::new(start.start, end.span.end)));
            }
            Token::LParen => {
                self.advance();
                let mut expr = self.parse_expr()?;
                let end = self.expect(Token::RParen)?;
                expr.span = Span::new(start.start, end.span.end);
                return Ok(expr);
            }
            _ => return Err(self.error(format!("expected expression, found '{}'", self.peek()))),
        };

        self.advance();
        Ok(Expr::new(kind, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn first_expr(source: &str) -> Expr {
        let program = Parser::parse(source).unwrap();
        match program.body.stmts.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_fn() {
        let source = "fn f(n: int) -> int { return n * 2; }";
        let program = Parser::parse(source).unwrap();
        assert_eq!(program.body.stmts.len(), 1);
        let StmtKind::Fn(f) = &program.body.stmts[0].kind else {
            panic!("expected function");
        };
        assert_eq!(f.name.name, "f");
        assert_eq!(f.params.len(), 1);
        assert_eq!(f.return_type.as_ref().map(|t| t.pretty_print()), Some("int".to_string()));
    }

    #[test]
    fn test_var_def_without_let() {
        let program = Parser::parse("x: int = 2; y: int = x + 3;").unwrap();
        assert_eq!(program.body.stmts.len(), 2);
        assert!(matches!(&program.body.stmts[1].kind, StmtKind::Let(l) if l.name.name == "y" && l.init.is_some()));
    }

    #[test]
    fn test_precedence() {
        let expr = first_expr("1 + 2 * 3 == 7 && true");
        let printed = expr.pretty_print_indented(0);
        assert_eq!(
            printed,
            "Binary(&&)\n  Binary(==)\n    Binary(+)\n      Int(1)\n      Binary(*)\n        Int(2)\n        Int(3)\n    Int(7)\n  Bool(true)\n"
        );
    }

    #[test]
    fn test_named_args() {
        let expr = first_expr("f(1, b: 2)");
        let ExprKind::Call(call) = expr.kind else {
            panic!("expected call");
        };
        assert!(call.args[0].name.is_none());
        assert_eq!(call.args[1].name.as_ref().map(|n| n.name.as_str()), Some("b"));
    }

    #[test]
    fn test_scope_resolution() {
        let expr = first_expr("Color::Red");
        assert!(matches!(expr.kind, ExprKind::ScopeResol(ref path) if path.len() == 2));
    }

    #[test]
    fn test_nested_generic_types() {
        let program = Parser::parse("let v: vector<vector<int>> = [];").unwrap();
        let StmtKind::Let(l) = &program.body.stmts[0].kind else {
            panic!("expected let");
        };
        assert_eq!(l.ty.as_ref().map(|t| t.pretty_print()), Some("vector<vector<int>>".to_string()));
    }

    #[test]
    fn test_parse_class() {
        let source = "class Point { x: int; y: int = 0; fn sum(self) -> int { return self.x + self.y; } }";
        let program = Parser::parse(source).unwrap();
        let StmtKind::Class(c) = &program.body.stmts[0].kind else {
            panic!("expected class");
        };
        assert_eq!(c.fields.len(), 2);
        assert!(c.fields[1].default.is_some());
        assert_eq!(c.methods.len(), 1);
        assert!(c.methods[0].has_self);
    }

    #[test]
    fn test_method_requires_self() {
        let err = Parser::parse("class A { fn f() {} }").unwrap_err();
        assert!(err.message.contains("'self'"));
    }

    #[test]
    fn test_variadic_must_be_last() {
        let err = Parser::parse("fn f(xs: int..., y: int) {}").unwrap_err();
        assert!(err.message.contains("variadic"));
    }

    #[test]
    fn test_try_catch() {
        let program = Parser::parse("try { throw 1; } catch e: int { } catch other { }").unwrap();
        let StmtKind::Try(t) = &program.body.stmts[0].kind else {
            panic!("expected try");
        };
        assert_eq!(t.catches.len(), 2);
        assert!(t.catches[0].ty.is_some());
        assert!(t.catches[1].ty.is_none());
    }

    #[test]
    fn test_compound_assignment() {
        let expr = first_expr("x += 1");
        assert!(matches!(expr.kind, ExprKind::Assign(_, Some(BinOp::Add), _)));
    }

    #[test]
    fn test_block_ids_are_unique() {
        let program = Parser::parse("{ } if true { } else { } while false { }").unwrap();
        let mut ids = vec![program.body.id];
        for stmt in &program.body.stmts {
            match &stmt.kind {
                StmtKind::Block(b) => ids.push(b.id),
                StmtKind::If(i) => {
                    ids.push(i.then_block.id);
                    if let Some(ElseBranch::Block(b)) = &i.else_branch {
                        ids.push(b.id);
                    }
                }
                StmtKind::While(w) => {
                    ids.push(w.id);
                    ids.push(w.body.id);
                }
                _ => {}
            }
        }
        let mut sorted = ids.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }
}
