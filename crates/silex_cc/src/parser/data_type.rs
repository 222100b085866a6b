//! Data-type and declarator productions.
//!
//! `parse_pre_data_type` handles the base type (keywords, `@T` generics,
//! struct/union/enum heads, typedef references); `parse_declarator` applies
//! the `*`/`[]`/`()` chain. Parenthesized sub-declarators use the two-pass
//! scheme: skip to the matching `)`, parse the post-declarator there, then
//! rewind and parse the inside — this gives `int *(*fn)(int, int)` the
//! outer-first nesting C requires.

use crate::ast::data_type::{
    ArrayKind, DataType, DataTypeKind, FunctionParam, GenericParams, Qualifiers, TypeContexts,
};
use crate::ast::expr::{Expr, Literal};
use crate::parser::{DeclaratorName, Parser};
use crate::token::TokenKind;
use std::rc::Rc;

/// Keyword combination bitset for runs of single type keywords reaching the
/// parser unfused (macro expansion can produce them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Combination(u16);

impl Combination {
    const CHAR: Combination = Combination(1);
    const DOUBLE: Combination = Combination(1 << 1);
    const FLOAT: Combination = Combination(1 << 2);
    const INT: Combination = Combination(1 << 3);
    const LONG: Combination = Combination(1 << 4);
    const LONG_LONG: Combination = Combination(1 << 5);
    const SHORT: Combination = Combination(1 << 6);
    const SIGNED: Combination = Combination(1 << 7);
    const UNSIGNED: Combination = Combination(1 << 8);
    const COMPLEX: Combination = Combination(1 << 9);
    const IMAGINARY: Combination = Combination(1 << 10);

    fn or(self, other: Combination) -> Combination {
        Combination(self.0 | other.0)
    }

    fn from_token(kind: &TokenKind) -> Option<Combination> {
        Some(match kind {
            TokenKind::Char => Combination::CHAR,
            TokenKind::Double => Combination::DOUBLE,
            TokenKind::Float => Combination::FLOAT,
            TokenKind::Int => Combination::INT,
            TokenKind::Long => Combination::LONG,
            TokenKind::Short => Combination::SHORT,
            TokenKind::Signed => Combination::SIGNED,
            TokenKind::Unsigned => Combination::UNSIGNED,
            TokenKind::UnderscoreComplex => Combination::COMPLEX,
            TokenKind::UnderscoreImaginary => Combination::IMAGINARY,
            _ => return None,
        })
    }

    fn to_data_type(self) -> Option<DataTypeKind> {
        use DataTypeKind::*;
        const C: fn(u16) -> Combination = Combination;

        let Combination(bits) = self;
        let eq = |parts: &[Combination]| parts.iter().any(|p| p.0 == bits);

        Some(if eq(&[Combination::CHAR]) {
            Char
        } else if eq(&[Combination::DOUBLE]) {
            Double
        } else if eq(&[Combination::DOUBLE.or(Combination::COMPLEX)]) {
            DoubleComplex
        } else if eq(&[Combination::DOUBLE.or(Combination::IMAGINARY)]) {
            DoubleImaginary
        } else if eq(&[Combination::FLOAT]) {
            Float
        } else if eq(&[Combination::FLOAT.or(Combination::COMPLEX)]) {
            FloatComplex
        } else if eq(&[Combination::FLOAT.or(Combination::IMAGINARY)]) {
            FloatImaginary
        } else if eq(&[
            Combination::INT,
            Combination::SIGNED,
            Combination::SIGNED.or(Combination::INT),
        ]) {
            Int
        } else if eq(&[
            Combination::LONG,
            Combination::LONG.or(Combination::INT),
            Combination::SIGNED.or(Combination::LONG),
            Combination::SIGNED.or(Combination::LONG).or(Combination::INT),
        ]) {
            LongInt
        } else if eq(&[Combination::LONG.or(Combination::DOUBLE)]) {
            LongDouble
        } else if eq(&[C(Combination::LONG.0 | Combination::DOUBLE.0 | Combination::COMPLEX.0)]) {
            LongDoubleComplex
        } else if eq(&[C(Combination::LONG.0 | Combination::DOUBLE.0 | Combination::IMAGINARY.0)])
        {
            LongDoubleImaginary
        } else if eq(&[
            Combination::LONG_LONG,
            Combination::LONG_LONG.or(Combination::INT),
            Combination::SIGNED.or(Combination::LONG_LONG),
            Combination::SIGNED
                .or(Combination::LONG_LONG)
                .or(Combination::INT),
        ]) {
            LongLongInt
        } else if eq(&[
            Combination::SHORT,
            Combination::SHORT.or(Combination::INT),
            Combination::SIGNED.or(Combination::SHORT),
            Combination::SIGNED.or(Combination::SHORT).or(Combination::INT),
        ]) {
            ShortInt
        } else if eq(&[Combination::SIGNED.or(Combination::CHAR)]) {
            SignedChar
        } else if eq(&[
            Combination::UNSIGNED,
            Combination::UNSIGNED.or(Combination::INT),
        ]) {
            UnsignedInt
        } else if eq(&[Combination::UNSIGNED.or(Combination::CHAR)]) {
            UnsignedChar
        } else if eq(&[
            Combination::UNSIGNED.or(Combination::LONG),
            Combination::UNSIGNED.or(Combination::LONG).or(Combination::INT),
        ]) {
            UnsignedLongInt
        } else if eq(&[
            Combination::UNSIGNED.or(Combination::LONG_LONG),
            Combination::UNSIGNED
                .or(Combination::LONG_LONG)
                .or(Combination::INT),
        ]) {
            UnsignedLongLongInt
        } else if eq(&[
            Combination::UNSIGNED.or(Combination::SHORT),
            Combination::UNSIGNED.or(Combination::SHORT).or(Combination::INT),
        ]) {
            UnsignedShortInt
        } else {
            return None;
        })
    }
}

impl<'u, 'i> Parser<'u, 'i> {
    /// Maps a fused keyword token directly onto its scalar kind.
    fn fused_keyword_data_type(kind: &TokenKind) -> Option<DataTypeKind> {
        use DataTypeKind as D;
        use TokenKind as T;
        Some(match kind {
            T::Char => D::Char,
            T::Double => D::Double,
            T::DoubleComplex => D::DoubleComplex,
            T::DoubleImaginary => D::DoubleImaginary,
            T::Float => D::Float,
            T::FloatComplex => D::FloatComplex,
            T::FloatImaginary => D::FloatImaginary,
            T::Int | T::SignedInt => D::Int,
            T::LongDouble => D::LongDouble,
            T::LongDoubleComplex => D::LongDoubleComplex,
            T::LongDoubleImaginary => D::LongDoubleImaginary,
            T::LongInt | T::SignedLong | T::SignedLongInt => D::LongInt,
            T::LongLong | T::LongLongInt | T::SignedLongLong | T::SignedLongLongInt => {
                D::LongLongInt
            }
            T::ShortInt | T::SignedShort | T::SignedShortInt => D::ShortInt,
            T::SignedChar => D::SignedChar,
            T::UnsignedChar => D::UnsignedChar,
            T::UnsignedInt => D::UnsignedInt,
            T::UnsignedLong | T::UnsignedLongInt => D::UnsignedLongInt,
            T::UnsignedLongLong | T::UnsignedLongLongInt => D::UnsignedLongLongInt,
            T::UnsignedShort | T::UnsignedShortInt => D::UnsignedShortInt,
            _ => return None,
        })
    }

    /// Keyword-combination production for unfused runs (`unsigned` `int`).
    /// The starting keyword sits in `previous`.
    fn parse_data_type_combination(&mut self) -> Option<DataTypeKind> {
        let mut flags = Combination::default();

        loop {
            let Some(part) = Combination::from_token(&self.previous_token().kind) else {
                break;
            };

            let next = if part == Combination::LONG && flags.0 & Combination::LONG.0 != 0 {
                // Second `long` upgrades to `long long`.
                Combination(flags.0 & !Combination::LONG.0).or(Combination::LONG_LONG)
            } else {
                let merged = flags.or(part);
                if merged == flags {
                    self.error("duplicate type keyword");
                    flags
                } else {
                    merged
                }
            };
            flags = next;

            if Combination::from_token(&self.current_token().kind).is_some() {
                self.next_token();
            } else {
                break;
            }
        }

        flags.to_data_type()
    }

    /// `!name` context annotations, possibly several.
    pub(crate) fn parse_data_type_contexts(&mut self) -> TypeContexts {
        let mut ctx = TypeContexts::NONE;

        while self.current_token().kind == TokenKind::Bang {
            self.next_token();

            match self.current_token().kind {
                TokenKind::Identifier(sym) => {
                    match TypeContexts::from_name(self.interner.resolve(sym)) {
                        Some(c) => ctx.insert(c),
                        None => self.error(
                            "expected only !heap, !non_null, !stack, !trace, !index, !realloc, \
                             !drop, !static or !free as data type context",
                        ),
                    }
                    self.next_token();
                }
                _ => self.error("expected identifier after data type context, e.g. !<id>"),
            }
        }

        ctx
    }

    /// Validates exclusion pairs and attaches the context set.
    pub(crate) fn check_data_type_context(&self, ctx: TypeContexts) -> TypeContexts {
        if let Some((a, b)) = ctx.incompatible_pair() {
            self.error(format!(
                "incompatible data type context: `!{}` cannot be combined with `!{}`",
                a, b
            ));
        }
        ctx
    }

    /// `.[T1, T2, …]` generic parameter list, or `None` when the cursor is
    /// not on one.
    pub(crate) fn parse_generic_params(&mut self) -> Option<GenericParams> {
        if self.current_token().kind != TokenKind::Dot
            || self.peek_token(1).kind != TokenKind::LHook
        {
            return None;
        }
        self.jump(2);

        let mut params = Vec::new();
        while !matches!(
            self.current_token().kind,
            TokenKind::RHook | TokenKind::Eof
        ) {
            let mut name = DeclaratorName::default();
            let data_type = self.parse_data_type(&mut name, false, false, false);
            params.push(data_type);

            if self.current_token().kind != TokenKind::RHook {
                self.expect(TokenKind::Comma, true);
            }
        }

        if params.is_empty() {
            self.error("expected at least one generic param");
        }

        match self.current_token().kind {
            TokenKind::RHook => self.next_token(),
            _ => self.error("unexpected EOF"),
        }

        Some(GenericParams::new(params))
    }

    /// Base type before the declarator, with surrounding storage classes
    /// and qualifiers on either side.
    pub(crate) fn parse_pre_data_type(&mut self) -> Rc<DataType> {
        use TokenKind as T;

        // <storage|qualifier>* <pre_dt>, e.g. `static int`, `const int`.
        self.parse_storage_classes_and_qualifiers();
        self.next_token();

        let kind = match self.previous_token().kind.clone() {
            T::Identifier(sym) => {
                let text = self.interner.resolve(sym).to_string();
                if crate::unit::is_builtin_type(&text) {
                    DataTypeKind::Builtin(sym)
                } else if self.unit.search_typedef(self.current_scope, sym).is_some() {
                    let generic_params = self.parse_generic_params();
                    DataTypeKind::Typedef {
                        name: sym,
                        generic_params,
                    }
                } else if text == "nullptr_t" {
                    DataTypeKind::NullptrT
                } else {
                    self.error("expected data type");
                    DataTypeKind::Int
                }
            }
            T::At => {
                let generic = self.expect_identifier_or_error_name();
                DataTypeKind::Generic(generic)
            }
            T::Bool | T::UnderscoreBool => DataTypeKind::Bool,
            T::Enum => self.parse_enum_pre_data_type(),
            T::Struct => self.parse_struct_or_union_pre_data_type(true),
            T::Union => self.parse_struct_or_union_pre_data_type(false),
            T::Typeof | T::TypeofUnqual => self.parse_typeof(),
            T::Void => DataTypeKind::Void,
            T::UnderscoreDecimal128 => DataTypeKind::Decimal128,
            T::UnderscoreDecimal32 => DataTypeKind::Decimal32,
            T::UnderscoreDecimal64 => DataTypeKind::Decimal64,
            ref kind => {
                // Unfused singles go through the combination bitset (order
                // insensitive: `int unsigned` is `unsigned int`); fused
                // kinds map directly.
                if Combination::from_token(kind).is_some() {
                    match self.parse_data_type_combination() {
                        Some(data_type) => data_type,
                        None => {
                            self.error("expected data type");
                            DataTypeKind::Int
                        }
                    }
                } else {
                    match Self::fused_keyword_data_type(kind) {
                        Some(data_type) => data_type,
                        None => {
                            self.error("expected data type");
                            DataTypeKind::Int
                        }
                    }
                }
            }
        };

        // <pre_dt> <storage|qualifier>*, e.g. `int static`, `int const`.
        self.parse_storage_classes_and_qualifiers();

        let qualifier = self.data_type_qualifier_flag;
        self.data_type_qualifier_flag = Qualifiers::NONE;

        Rc::new(DataType::new(kind).with_qualifier(qualifier))
    }

    /// `typeof(expr)` / `typeof_unqual(expr)`. The external inference
    /// routine is a collaborator; in-core the operand's manifest type is
    /// used when it has one.
    fn parse_typeof(&mut self) -> DataTypeKind {
        self.expect(TokenKind::LParen, true);
        let expr = self.parse_expr();
        self.expect(TokenKind::RParen, true);

        match expr {
            Some(Expr::DataType(dt)) | Some(Expr::Cast { data_type: dt, .. }) => dt.kind.clone(),
            Some(Expr::Literal(Literal::SignedInt(_))) => DataTypeKind::Int,
            Some(Expr::Literal(Literal::UnsignedInt(_))) => DataTypeKind::UnsignedInt,
            Some(Expr::Literal(Literal::Float(_))) => DataTypeKind::Double,
            Some(Expr::Literal(Literal::Char(_))) => DataTypeKind::Char,
            Some(Expr::Literal(Literal::Bool(_))) => DataTypeKind::Bool,
            Some(Expr::Literal(Literal::String(_))) => DataTypeKind::Ptr {
                name: None,
                pointee: DataType::rc(DataTypeKind::Char),
            },
            _ => {
                self.error("expected data type");
                DataTypeKind::Int
            }
        }
    }

    /// Full data type: pre-data-type then declarator.
    pub(crate) fn parse_data_type(
        &mut self,
        name: &mut DeclaratorName,
        name_is_required: bool,
        in_function_prototype: bool,
        generic_params_is_expected: bool,
    ) -> Rc<DataType> {
        self.data_type_qualifier_flag = Qualifiers::NONE;
        let pre = self.parse_pre_data_type();
        self.parse_post_data_type(
            pre,
            name,
            name_is_required,
            in_function_prototype,
            generic_params_is_expected,
        )
    }

    pub(crate) fn parse_post_data_type(
        &mut self,
        pre: Rc<DataType>,
        name: &mut DeclaratorName,
        name_is_required: bool,
        in_function_prototype: bool,
        generic_params_is_expected: bool,
    ) -> Rc<DataType> {
        let data_type = self.parse_declarator(name, pre, in_function_prototype);

        if name_is_required && name.value.is_none() {
            self.error("expected to have name");
        }
        if !generic_params_is_expected && name.generic_params.is_some() {
            self.error("not expected to have generic params");
        }

        data_type
    }

    // ── Declarators ────────────────────────────────────────────────────

    /// `* qualifiers contexts` prefix chain.
    fn parse_ptr_declarator(&mut self, pre: Rc<DataType>) -> Rc<DataType> {
        let mut res = pre;

        while self.current_token().kind == TokenKind::Star {
            self.next_token();

            let mut qualifier = Qualifiers::NONE;
            let context;

            // `!` contexts are tolerated on either side of the qualifiers.
            if self.current_token().kind == TokenKind::Bang {
                context = self.parse_data_type_contexts();
                self.parse_data_type_qualifiers(&mut qualifier);
            } else {
                self.parse_data_type_qualifiers(&mut qualifier);
                context = self.parse_data_type_contexts();
            }

            let mut node = DataType::new(DataTypeKind::Ptr {
                name: None,
                pointee: res,
            });
            node.qualifier = qualifier;
            node.ctx = self.check_data_type_context(context);
            res = Rc::new(node);
        }

        res
    }

    pub(crate) fn parse_declarator(
        &mut self,
        name: &mut DeclaratorName,
        pre: Rc<DataType>,
        in_function_prototype: bool,
    ) -> Rc<DataType> {
        let mut res = self.parse_ptr_declarator(pre);
        let mut has_new_name = false;

        match self.current_token().kind.clone() {
            TokenKind::LParen => {
                let peeked_is_type = {
                    let peeked = self.peek_token(1).clone();
                    self.token_is_data_type(&peeked) || peeked.kind == TokenKind::RParen
                };

                if peeked_is_type {
                    return self.parse_function_declarator(name, res, has_new_name);
                }

                // Two-pass sub-declarator: parse the post-declarator after
                // the matching `)`, then rewind into the parens.
                self.next_token(); // skip `(`
                let into_paren = self.position();
                self.skip_paren();

                res = self.parse_post_declarator(name, res, in_function_prototype, has_new_name);

                let after_declarator = self.position();
                self.restore_position(into_paren);

                res = self.parse_declarator(name, res, in_function_prototype);
                self.expect(TokenKind::RParen, true);
                self.restore_position(after_declarator);

                return res;
            }
            TokenKind::Identifier(sym) => {
                if name.value.is_some() {
                    self.error("name is already defined");
                }

                self.next_token();
                let generic_params = self.parse_generic_params();
                name.value = Some(sym);
                name.generic_params = generic_params;

                if self.current_token().kind == TokenKind::LParen {
                    has_new_name = true;
                } else {
                    has_new_name = !Self::attach_name(&mut res, sym);

                    if name.generic_params.is_some() && !self.has_typedef_storage_class() {
                        self.error("generic params is not expected in this context");
                    }
                }
            }
            _ => {}
        }

        self.parse_post_declarator(name, res, in_function_prototype, has_new_name)
    }

    /// Attaches a declarator name to the outer type node when that node
    /// carries one (pointer/array/function); `false` otherwise.
    fn attach_name(res: &mut Rc<DataType>, name: silex_base::Symbol) -> bool {
        match Rc::get_mut(res) {
            Some(dt) => DataType::set_name(&mut dt.kind, name),
            None => false,
        }
    }

    fn parse_post_declarator(
        &mut self,
        name: &mut DeclaratorName,
        pre: Rc<DataType>,
        in_function_prototype: bool,
        has_new_name: bool,
    ) -> Rc<DataType> {
        match self.current_token().kind {
            TokenKind::LHook => {
                self.parse_array_declarator(name, pre, in_function_prototype, has_new_name)
            }
            TokenKind::LParen => self.parse_function_declarator(name, pre, has_new_name),
            _ => pre,
        }
    }

    /// `[static? qualifiers? expr?]`, possibly chained. `T a[A][B]` nests
    /// right: array-of-A of array-of-B of T.
    fn parse_array_declarator(
        &mut self,
        name: &mut DeclaratorName,
        pre: Rc<DataType>,
        in_function_prototype: bool,
        has_new_name: bool,
    ) -> Rc<DataType> {
        self.next_token(); // skip `[`

        let mut is_static = false;
        let mut qualifier = Qualifiers::NONE;

        // `static` and qualifiers are accepted in either order, but only in
        // function-prototype positions.
        if in_function_prototype {
            if self.current_token().kind == TokenKind::Static {
                is_static = true;
                self.next_token();
            }
            self.parse_data_type_qualifiers(&mut qualifier);
            if !is_static && self.current_token().kind == TokenKind::Static {
                is_static = true;
                self.next_token();
            }
            if qualifier.is_empty() {
                self.parse_data_type_qualifiers(&mut qualifier);
            }
        }

        let size_expr = match self.current_token().kind {
            TokenKind::RHook => None,
            _ => self.parse_expr(),
        };

        self.expect(TokenKind::RHook, true);

        let mut size = None;
        if let Some(expr) = &size_expr {
            match self.resolver.eval_to_int(expr) {
                Some(value) if value >= 0 => size = Some(value as usize),
                Some(_) => self.error("expected to have positive integer value"),
                None => {}
            }
        }

        if name.generic_params.is_some() {
            self.error("generic params is not expected in this context");
        }

        let array_name = if has_new_name { name.value } else { None };

        let elem = if self.current_token().kind == TokenKind::LHook {
            self.parse_array_declarator(name, pre, in_function_prototype, false)
        } else {
            pre
        };

        let kind = match size {
            Some(size) => ArrayKind::Sized(size),
            None => ArrayKind::Unsized,
        };

        Rc::new(DataType::new(DataTypeKind::Array {
            kind,
            elem,
            name: array_name,
            size_expr: size_expr.map(Rc::new),
            is_static,
            qualifier,
        }))
    }

    /// `( params )`, opening a child scope so named parameters are visible
    /// in the body.
    fn parse_function_declarator(
        &mut self,
        name: &mut DeclaratorName,
        ret: Rc<DataType>,
        has_new_name: bool,
    ) -> Rc<DataType> {
        let parent_scope = self.unit.add_scope(self.current_scope, true);
        let params = self.parse_function_params(Some(parent_scope));

        Rc::new(DataType::new(DataTypeKind::Function {
            name: if has_new_name { name.value } else { None },
            params,
            ret,
            generic_params: if has_new_name {
                name.generic_params.clone()
            } else {
                None
            },
            parent_scope: Some(parent_scope),
        }))
    }

    pub(crate) fn parse_function_params(
        &mut self,
        parent_function_scope: Option<crate::scope::ScopeId>,
    ) -> Option<Vec<FunctionParam>> {
        self.next_token(); // skip `(`

        if self.current_token().kind == TokenKind::RParen {
            self.next_token();
            return None;
        }

        let mut params = Vec::new();

        while !matches!(
            self.current_token().kind,
            TokenKind::RParen | TokenKind::Eof
        ) {
            match self.current_token().kind {
                TokenKind::DotDotDot => {
                    params.push(FunctionParam::Variadic);
                    self.next_token();
                }
                _ => {
                    let mut name = DeclaratorName::default();
                    let data_type = self.parse_data_type(&mut name, false, true, false);

                    if let (Some(scope), Some(param_name)) = (parent_function_scope, name.value) {
                        let location = self.current_location();
                        let decl = crate::ast::decl::Decl::Variable {
                            storage: crate::ast::data_type::StorageClasses::NONE,
                            data_type: data_type.clone(),
                            name: param_name,
                            init: None,
                            is_local: true,
                        };
                        self.unit
                            .add_decl_to_scope(decl, scope, self.interner, &location);
                    }

                    params.push(FunctionParam::Normal {
                        name: name.value,
                        data_type,
                    });
                }
            }

            if self.current_token().kind != TokenKind::RParen {
                self.expect(TokenKind::Comma, true);
            }
        }

        match self.current_token().kind {
            TokenKind::Eof => self.error("hit EOF"),
            _ => self.next_token(), // skip `)`
        }

        Some(params)
    }
}
