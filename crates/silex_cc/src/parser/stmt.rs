//! Statement and function-body productions.
//!
//! `in_loop`/`in_switch` travel down the productions to gate `break`,
//! `continue`, `case` and `default`. A single-statement body (no braces)
//! still gets its own child scope.

use crate::ast::stmt::{Body, BodyItem, IfBranch, Stmt};
use crate::parser::Parser;
use crate::standard::Standard;
use crate::token::TokenKind;

impl<'u, 'i> Parser<'u, 'i> {
    pub(crate) fn parse_stmt(&mut self, in_loop: bool, in_switch: bool) -> Option<BodyItem> {
        use TokenKind as T;

        self.next_token();

        let stmt = match self.previous_token().kind.clone() {
            T::Break => {
                self.expect(T::Semicolon, true);
                if !(in_loop || in_switch) {
                    self.error_at(
                        self.previous_token().location.clone(),
                        "break is not expected outside of a loop or a switch",
                    );
                    return None;
                }
                Stmt::Break
            }
            T::Case => {
                if !in_switch {
                    self.error_at(
                        self.previous_token().location.clone(),
                        "case is not expected outside of a switch",
                    );
                    return None;
                }
                return self.parse_case();
            }
            T::Continue => {
                self.expect(T::Semicolon, true);
                if !in_loop {
                    self.error_at(
                        self.previous_token().location.clone(),
                        "continue is not expected outside of a loop",
                    );
                    return None;
                }
                Stmt::Continue
            }
            T::Default => {
                self.expect(T::Colon, true);
                self.in_label = true;
                if !in_switch {
                    self.error_at(
                        self.previous_token().location.clone(),
                        "default is not expected outside of a switch",
                    );
                    return None;
                }
                Stmt::Default
            }
            T::Do => return self.parse_do_while_stmt(in_switch),
            T::For => return self.parse_for_stmt(in_switch),
            T::Goto => {
                let label = self.expect_identifier_or_error_name();
                self.expect(T::Semicolon, true);
                Stmt::Goto(label)
            }
            T::If => return self.parse_if_stmt(in_loop, in_switch),
            T::Return => match self.current_token().kind {
                T::Semicolon => {
                    self.next_token();
                    Stmt::Return(None)
                }
                _ => {
                    let expr = self.with_allow_initialization(|p| p.parse_expr());

                    match expr {
                        Some(expr) => {
                            self.expect(T::Semicolon, true);
                            Stmt::Return(Some(expr))
                        }
                        None => {
                            self.error("expected expression");
                            return None;
                        }
                    }
                }
            },
            T::Switch => return self.parse_switch_stmt(in_loop),
            T::While => return self.parse_while_stmt(in_switch),
            T::LBrace => {
                let body = self.parse_function_block(in_loop, in_switch);
                Stmt::Block { body }
            }
            _ => {
                self.error_at(
                    self.previous_token().location.clone(),
                    "unexpected token, expected a statement",
                );
                return None;
            }
        };

        Some(BodyItem::Stmt(stmt))
    }

    fn parse_case(&mut self) -> Option<BodyItem> {
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Colon, true);
        self.in_label = true;
        Some(BodyItem::Stmt(Stmt::Case { expr }))
    }

    /// A braced block, or a single item wrapped into a fresh child scope.
    fn parse_body_or_single(&mut self, in_loop: bool, in_switch: bool) -> Body {
        if self.current_token().kind == TokenKind::LBrace {
            self.next_token();
            return self.parse_function_block(in_loop, in_switch);
        }

        let items = self.parse_function_body_item(in_loop, in_switch);
        let scope = self.unit.add_scope(self.current_scope, true);
        let mut body = Body::new(scope);
        body.items = items;
        body
    }

    fn parse_do_while_stmt(&mut self, in_switch: bool) -> Option<BodyItem> {
        let body = self.parse_body_or_single(true, in_switch);

        self.expect_many(&[TokenKind::While, TokenKind::LParen]);

        let cond = self.parse_expr()?;

        self.expect_many(&[TokenKind::RParen, TokenKind::Semicolon]);

        Some(BodyItem::Stmt(Stmt::DoWhile { body, cond }))
    }

    fn parse_for_stmt(&mut self, in_switch: bool) -> Option<BodyItem> {
        self.expect(TokenKind::LParen, true);

        let mut init_clauses = None;

        match self.current_token().kind {
            TokenKind::Semicolon => self.next_token(),
            _ => {
                let mut clauses = Vec::new();

                self.without_eat_semicolon(|p| {
                    while p.current_token().kind != TokenKind::Eof {
                        let items = p.parse_function_body_item(false, false);

                        for item in &items {
                            match item {
                                BodyItem::Stmt(_) => p.error("expected valid for init-clause"),
                                BodyItem::Decl(id) => {
                                    let is_variable = matches!(
                                        p.unit.decl(*id),
                                        crate::ast::decl::Decl::Variable { .. }
                                    );
                                    if is_variable && p.unit.standard < Standard::C99 {
                                        p.error(
                                            "it is impossible to have a variable declaration in \
                                             an `init clause` before C99",
                                        );
                                    }
                                }
                                BodyItem::Expr(_) => {}
                            }
                        }

                        clauses.extend(items);

                        match p.current_token().kind {
                            TokenKind::Comma => p.next_token(),
                            _ => break,
                        }
                    }
                });

                self.expect(TokenKind::Semicolon, true);
                init_clauses = Some(clauses);
            }
        }

        let cond = match self.current_token().kind {
            TokenKind::Semicolon => {
                self.next_token();
                None
            }
            _ => {
                let expr = self.parse_expr();
                self.expect(TokenKind::Semicolon, true);
                expr
            }
        };

        let steps = match self.current_token().kind {
            TokenKind::RParen => {
                self.next_token();
                None
            }
            _ => {
                let mut exprs = Vec::new();

                loop {
                    if let Some(expr) = self.parse_expr() {
                        exprs.push(expr);
                    }

                    if self.current_token().kind != TokenKind::RParen {
                        self.expect(TokenKind::Comma, true);
                    }

                    if matches!(
                        self.current_token().kind,
                        TokenKind::RParen | TokenKind::Eof
                    ) {
                        break;
                    }
                }

                self.expect(TokenKind::RParen, true);
                Some(exprs)
            }
        };

        let body = self.parse_body_or_single(true, in_switch);

        Some(BodyItem::Stmt(Stmt::For {
            body,
            init_clauses,
            cond,
            steps,
        }))
    }

    fn parse_if_branch(&mut self, in_loop: bool, in_switch: bool) -> Option<IfBranch> {
        self.expect(TokenKind::LParen, true);

        let cond = match self.parse_expr() {
            Some(cond) => cond,
            None => {
                self.error("expected if condition");
                return None;
            }
        };

        self.expect(TokenKind::RParen, true);

        let body = self.parse_body_or_single(in_loop, in_switch);

        Some(IfBranch { cond, body })
    }

    /// `else if` arrives either fused (one token) or as two tokens in a
    /// resolved stream.
    fn has_else_if(&self) -> bool {
        match self.current_token().kind {
            TokenKind::ElseIf => true,
            TokenKind::Else => self.peek_token(1).kind == TokenKind::If,
            _ => false,
        }
    }

    fn parse_if_stmt(&mut self, in_loop: bool, in_switch: bool) -> Option<BodyItem> {
        let if_ = self.parse_if_branch(in_loop, in_switch)?;
        let mut else_ifs: Option<Vec<IfBranch>> = None;
        let mut else_ = None;

        while self.has_else_if() {
            match self.current_token().kind {
                TokenKind::ElseIf => self.jump(1),
                _ => self.jump(2),
            }

            if let Some(branch) = self.parse_if_branch(in_loop, in_switch) {
                else_ifs.get_or_insert_with(Vec::new).push(branch);
            }
        }

        if self.current_token().kind == TokenKind::Else {
            self.next_token();

            if self.expect(TokenKind::LBrace, false) {
                else_ = Some(self.parse_function_block(in_loop, in_switch));
            } else {
                let items = self.parse_function_body_item(in_loop, false);
                let scope = self.unit.add_scope(self.current_scope, true);
                let mut body = Body::new(scope);
                body.items = items;
                else_ = Some(body);
            }
        }

        Some(BodyItem::Stmt(Stmt::If {
            if_,
            else_ifs,
            else_,
        }))
    }

    fn parse_while_stmt(&mut self, in_switch: bool) -> Option<BodyItem> {
        self.expect(TokenKind::LParen, true);

        let cond = self.parse_expr()?;

        self.expect(TokenKind::RParen, true);

        let body = self.parse_body_or_single(true, in_switch);

        Some(BodyItem::Stmt(Stmt::While { cond, body }))
    }

    fn parse_switch_stmt(&mut self, in_loop: bool) -> Option<BodyItem> {
        self.expect(TokenKind::LParen, true);

        let expr = self.parse_expr()?;

        self.expect(TokenKind::RParen, true);

        let body = match self.current_token().kind {
            TokenKind::LBrace => {
                self.next_token();
                self.parse_function_block(in_loop, true)
            }
            _ => {
                let items = self.parse_function_body_item(in_loop, true);
                let scope = self.unit.add_scope(self.current_scope, true);
                let mut body = Body::new(scope);
                body.items = items;
                body
            }
        };

        Some(BodyItem::Stmt(Stmt::Switch { expr, body }))
    }

    /// One item of a function body; comma-chained declarations make this a
    /// list.
    pub(crate) fn parse_function_body_item(
        &mut self,
        in_loop: bool,
        in_switch: bool,
    ) -> Vec<BodyItem> {
        use TokenKind as T;

        match self.current_token().kind {
            T::Identifier(_) if self.peek_token(1).kind == T::Colon => {
                let ids = self.parse_decl();
                self.in_label = true;
                return ids.into_iter().map(BodyItem::Decl).collect();
            }
            T::Break | T::Case | T::Continue | T::Default | T::Do | T::For | T::Goto | T::If
            | T::Return | T::Switch | T::While | T::LBrace => {
                self.in_label = false;
                return self.parse_stmt(in_loop, in_switch).into_iter().collect();
            }
            T::Semicolon => {
                self.next_token();
                return Vec::new();
            }
            _ => {}
        }

        if self.is_data_type() || self.is_storage_class() {
            let ids = self.parse_decl();
            self.in_label = false;

            if !ids.is_empty() {
                return ids.into_iter().map(BodyItem::Decl).collect();
            }
            if self.data_type_as_expression.is_none() {
                return Vec::new();
            }
            // Fall through: the parsed type was actually the head of an
            // expression.
        }

        self.in_label = false;

        let expr = self.parse_expr();

        if self.eat_semicolon {
            self.expect(T::Semicolon, true);
        }

        expr.map(BodyItem::Expr).into_iter().collect()
    }

    /// Body loop shared by function definitions and nested blocks. When
    /// `parent_function_scope` is given (a function definition), the body
    /// reuses the scope its parameters were registered into.
    pub(crate) fn parse_function_body(
        &mut self,
        in_loop: bool,
        in_switch: bool,
        parent_function_scope: Option<crate::scope::ScopeId>,
    ) -> Body {
        let scope = match parent_function_scope {
            Some(scope) => scope,
            None => self.unit.add_scope(self.current_scope, true),
        };

        let body = self.with_scope(scope, |p| {
            let mut body = Body::new(scope);

            while !matches!(
                p.current_token().kind,
                TokenKind::RBrace | TokenKind::Eof
            ) {
                let items = p.parse_function_body_item(in_loop, in_switch);
                body.items.extend(items);
            }

            body
        });

        self.in_label = false;
        self.expect(TokenKind::RBrace, true);

        body
    }

    pub(crate) fn parse_function_block(&mut self, in_loop: bool, in_switch: bool) -> Body {
        self.parse_function_body(in_loop, in_switch, None)
    }
}
