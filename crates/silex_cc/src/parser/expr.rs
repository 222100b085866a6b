//! Expression productions.
//!
//! Binary expressions run through a classic operator-precedence stack: a
//! new operator re-reduces while the top of the stack binds at least as
//! tightly. `?:` is right-associative and handled at the outer level;
//! `.`/`->` are post-expressions so chains like `a.b->c[0]++` fold left.

use crate::ast::data_type::DataTypeKind;
use crate::ast::expr::{BinaryKind, Expr, InitializerItem, Literal, UnaryKind};
use crate::parser::{DeclaratorName, Parser};
use crate::standard::Standard;
use crate::token::{HasFeature, TokenKind};

impl<'u, 'i> Parser<'u, 'i> {
    pub(crate) fn parse_expr(&mut self) -> Option<Expr> {
        if self.current_token().kind == TokenKind::LBrace {
            if !self.allow_initialization {
                self.error(
                    "cannot declare array, struct call or union call outside of variable \
                     initialization",
                );
            }
            return Some(self.parse_initializer());
        }

        let mut expr = self.parse_primary_expr()?;

        loop {
            if Self::is_binary_op_token(&self.current_token().kind) {
                expr = self.parse_binary_expr(expr)?;
                continue;
            }

            if self.current_token().kind == TokenKind::Interrogation {
                self.next_token(); // skip `?`

                let if_ = match self.parse_expr() {
                    Some(e) => e,
                    None => return Some(expr),
                };

                self.expect(TokenKind::Colon, true);

                let else_ = match self.parse_expr() {
                    Some(e) => e,
                    None => return Some(expr),
                };

                return Some(Expr::Ternary {
                    cond: Box::new(expr),
                    if_: Box::new(if_),
                    else_: Box::new(else_),
                });
            }

            return Some(self.parse_post_expr(expr));
        }
    }

    /// The binary operators the precedence stack accepts. `.`/`->` are
    /// post-expressions, not stack operators.
    fn is_binary_op_token(kind: &TokenKind) -> bool {
        !matches!(kind, TokenKind::Dot | TokenKind::Arrow)
            && BinaryKind::from_token(kind).is_some()
    }

    fn parse_binary_expr(&mut self, expr: Expr) -> Option<Expr> {
        let mut last_precedence = expr.precedence();
        let mut operands: Vec<Expr> = vec![expr];
        let mut ops: Vec<BinaryKind> = Vec::new();

        while Self::is_binary_op_token(&self.current_token().kind) {
            let op = match BinaryKind::from_token(&self.current_token().kind) {
                Some(op) => op,
                None => break,
            };
            let precedence = op.precedence();

            self.next_token();

            let right = self.parse_primary_expr()?;

            while precedence <= last_precedence && !ops.is_empty() {
                let top_right = operands.pop()?;
                let top_op = ops.pop()?;

                last_precedence = top_op.precedence();

                if last_precedence < precedence {
                    ops.push(top_op);
                    operands.push(top_right);
                    break;
                }

                let top_left = operands.pop()?;
                operands.push(Expr::Binary {
                    kind: top_op,
                    left: Box::new(top_left),
                    right: Box::new(top_right),
                });
            }

            ops.push(op);
            operands.push(right);
            last_precedence = precedence;
        }

        while let Some(op) = ops.pop() {
            let right = operands.pop()?;
            let left = operands.pop()?;
            operands.push(Expr::Binary {
                kind: op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        operands.pop()
    }

    pub(crate) fn parse_primary_expr(&mut self) -> Option<Expr> {
        use TokenKind as T;

        if let Some(data_type) = self.data_type_as_expression.take() {
            return Some(self.parse_post_expr(Expr::DataType(data_type)));
        }

        if self.is_data_type() {
            let mut name = DeclaratorName::default();
            let data_type = self.parse_data_type(&mut name, false, false, false);
            return Some(Expr::DataType(data_type));
        }

        self.next_token();

        let res = match self.previous_token().kind.clone() {
            T::Alignof | T::UnderscoreAlignof => {
                let expr = self.parse_expr()?;
                Expr::Alignof(Box::new(expr))
            }
            T::LParen => self.parse_cast_or_grouping()?,
            T::Sizeof => {
                let has_open_paren = self.current_token().kind == T::LParen;
                if has_open_paren {
                    self.next_token();
                }

                let expr = self.parse_expr()?;

                if has_open_paren {
                    self.expect(T::RParen, true);
                }

                Expr::Sizeof(Box::new(expr))
            }
            T::Identifier(name) => {
                let generic_params = self.parse_generic_params();

                match self.current_token().kind {
                    T::LParen => self.parse_function_call(name, generic_params)?,
                    _ => Expr::Identifier {
                        name,
                        generic_params,
                    },
                }
            }
            T::True => Expr::Literal(Literal::Bool(true)),
            T::False => Expr::Literal(Literal::Bool(false)),
            T::LiteralInt(_)
            | T::LiteralOctal(_)
            | T::LiteralHex(_)
            | T::LiteralBin(_)
            | T::LiteralFloat(_)
            | T::LiteralChar(_)
            | T::LiteralString(_) => self.parse_literal_expr()?,
            T::Bang => self.parse_unary(UnaryKind::Not)?,
            T::Ampersand => self.parse_unary(UnaryKind::Ref)?,
            T::Minus => self.parse_unary(UnaryKind::Negative)?,
            T::Plus => self.parse_unary(UnaryKind::Positive)?,
            T::Wave => self.parse_unary(UnaryKind::BitNot)?,
            T::Star => self.parse_unary(UnaryKind::Dereference)?,
            T::PlusPlus => self.parse_unary(UnaryKind::PreIncrement)?,
            T::MinusMinus => self.parse_unary(UnaryKind::PreDecrement)?,
            T::Nullptr => return Some(Expr::Nullptr),
            T::BuiltinHasFeature(feature) => {
                Expr::Literal(Literal::Bool(self.evaluate_has_feature(feature)))
            }
            T::PredefinedDate(s) | T::PredefinedTime(s) | T::PredefinedFile(s) => {
                Expr::Literal(Literal::String(s))
            }
            T::PredefinedLine => Expr::Literal(Literal::UnsignedInt(
                self.previous_token().location.start_line as u64,
            )),
            _ => {
                self.error_at(
                    self.previous_token().location.clone(),
                    "unexpected token in expression",
                );
                return None;
            }
        };

        Some(self.parse_post_expr(res))
    }

    fn parse_unary(&mut self, kind: UnaryKind) -> Option<Expr> {
        let expr = self.parse_primary_expr()?;
        Some(Expr::Unary {
            kind,
            expr: Box::new(expr),
        })
    }

    /// After `(`: a cast when a data type follows, a grouping otherwise.
    fn parse_cast_or_grouping(&mut self) -> Option<Expr> {
        if self.is_data_type() {
            let mut name = DeclaratorName::default();
            let data_type = self.parse_data_type(&mut name, false, false, false);

            if name.value.is_some() {
                self.error("name is not expected here");
            }

            self.expect(TokenKind::RParen, true);

            let expr = self.with_allow_initialization(|p| p.parse_expr())?;

            self.check_for_initialization_expr(&data_type, &expr);

            return Some(Expr::Cast {
                data_type,
                expr: Box::new(expr),
            });
        }

        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen, true);
        Some(Expr::Grouping(Box::new(expr)))
    }

    fn parse_function_call(
        &mut self,
        name: silex_base::Symbol,
        generic_params: Option<crate::ast::data_type::GenericParams>,
    ) -> Option<Expr> {
        self.next_token(); // skip `(`

        let mut params = Vec::new();

        while !matches!(
            self.current_token().kind,
            TokenKind::RParen | TokenKind::Eof
        ) {
            if let Some(param) = self.parse_expr() {
                params.push(param);
            }

            if self.current_token().kind != TokenKind::RParen {
                self.expect(TokenKind::Comma, true);
            }
        }

        self.expect(TokenKind::RParen, true);

        if crate::unit::is_builtin_function(self.interner.resolve(name)) {
            return Some(Expr::FunctionCallBuiltin { name, params });
        }

        Some(Expr::FunctionCall {
            name,
            params,
            generic_params,
        })
    }

    fn parse_literal_expr(&mut self) -> Option<Expr> {
        use TokenKind as T;

        match self.previous_token().kind.clone() {
            T::LiteralInt(s) | T::LiteralOctal(s) | T::LiteralHex(s) | T::LiteralBin(s) => {
                let base = match self.previous_token().kind {
                    T::LiteralOctal(_) => 8,
                    T::LiteralHex(_) => 16,
                    T::LiteralBin(_) => 2,
                    _ => 10,
                };

                let text = self.interner.resolve(s);
                match i64::from_str_radix(text, base) {
                    Ok(value) => Some(Expr::Literal(Literal::SignedInt(value))),
                    Err(_) => {
                        self.error_at(self.previous_token().location.clone(), "bad integer");
                        None
                    }
                }
            }
            T::LiteralFloat(s) => {
                let text = self.interner.resolve(s).to_string();

                if text.bytes().filter(|b| *b == b'.').count() > 1 {
                    self.error_at(
                        self.previous_token().location.clone(),
                        "in a float literal it is forbidden to add more than one `.`",
                    );
                    return None;
                }

                match text.parse::<f64>() {
                    Ok(value) => Some(Expr::Literal(Literal::Float(value))),
                    Err(_) => {
                        self.error_at(
                            self.previous_token().location.clone(),
                            "invalid float literal",
                        );
                        None
                    }
                }
            }
            T::LiteralChar(c) => Some(Expr::Literal(Literal::Char(c))),
            T::LiteralString(s) => Some(Expr::Literal(Literal::String(s))),
            _ => None,
        }
    }

    /// `{ .path = value, … }`; only legal where initialization is allowed.
    fn parse_initializer(&mut self) -> Expr {
        self.next_token(); // skip `{`

        let mut items = Vec::new();

        while !matches!(
            self.current_token().kind,
            TokenKind::RBrace | TokenKind::Eof
        ) {
            let mut path = None;

            if self.current_token().kind == TokenKind::Dot {
                let mut segments = Vec::new();

                while self.current_token().kind == TokenKind::Dot {
                    self.next_token();
                    if let Some(sym) = self.expect_identifier() {
                        segments.push(sym);
                    }
                }

                self.expect(TokenKind::Eq, true);
                path = Some(segments);
            }

            let value = self.parse_expr();

            if self.current_token().kind != TokenKind::RBrace {
                self.expect(TokenKind::Comma, true);
            }

            if let Some(value) = value {
                items.push(InitializerItem { path, value });
            }
        }

        self.expect(TokenKind::RBrace, true);

        Expr::Initializer { items }
    }

    pub(crate) fn parse_post_expr(&mut self, expr: Expr) -> Expr {
        let mut expr = expr;

        loop {
            match self.current_token().kind {
                TokenKind::PlusPlus => {
                    self.next_token();
                    expr = Expr::Unary {
                        kind: UnaryKind::PostIncrement,
                        expr: Box::new(expr),
                    };
                }
                TokenKind::MinusMinus => {
                    self.next_token();
                    expr = Expr::Unary {
                        kind: UnaryKind::PostDecrement,
                        expr: Box::new(expr),
                    };
                }
                TokenKind::LHook => {
                    self.next_token();

                    let index = match self.parse_expr() {
                        Some(index) => index,
                        None => return expr,
                    };

                    self.expect(TokenKind::RHook, true);

                    expr = Expr::ArrayAccess {
                        array: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::Dot => {
                    self.next_token();
                    let right = match self.parse_primary_expr() {
                        Some(right) => right,
                        None => return expr,
                    };
                    expr = Expr::Binary {
                        kind: BinaryKind::Dot,
                        left: Box::new(expr),
                        right: Box::new(right),
                    };
                }
                TokenKind::Arrow => {
                    self.next_token();
                    let right = match self.parse_primary_expr() {
                        Some(right) => right,
                        None => return expr,
                    };
                    expr = Expr::Binary {
                        kind: BinaryKind::Arrow,
                        left: Box::new(expr),
                        right: Box::new(right),
                    };
                }
                _ => return expr,
            }
        }
    }

    fn evaluate_has_feature(&self, feature: HasFeature) -> bool {
        match feature {
            HasFeature::CAlignas
            | HasFeature::CAlignof
            | HasFeature::CAtomic
            | HasFeature::CGenericSelections
            | HasFeature::CGenericSelectionWithControllingType
            | HasFeature::CStaticAssert
            | HasFeature::CThreadLocal => self.unit.standard >= Standard::C11,
            HasFeature::AddressSanitizer | HasFeature::Modules => false,
        }
    }

    /// Array-typed targets must be initialized by an initializer list or a
    /// string literal.
    pub(crate) fn check_for_initialization_expr(
        &self,
        data_type: &crate::ast::data_type::DataType,
        expr: &Expr,
    ) {
        let needs_initializer = matches!(data_type.kind, DataTypeKind::Array { .. });
        let is_initializer = matches!(
            expr,
            Expr::Initializer { .. } | Expr::Literal(Literal::String(_))
        );

        if needs_initializer && !is_initializer {
            self.error("need initialization expression for array data type");
        }
    }
}
