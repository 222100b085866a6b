//! Declaration productions: variables, functions, struct/union/enum,
//! typedef, labels, fields and attributes.

use crate::ast::data_type::{DataType, DataTypeKind, GenericParams, Qualifiers, StorageClasses};
use crate::ast::decl::{Attribute, Decl, DeclId, EnumVariant};
use crate::ast::field::{FieldId, FieldKind, Fields};
use crate::parser::{DeclaratorName, Parser};
use crate::token::TokenKind;
use silex_base::Symbol;
use std::rc::Rc;

impl<'u, 'i> Parser<'u, 'i> {
    /// Top-level (and body-level) declaration. Comma chains produce several
    /// ids.
    pub(crate) fn parse_decl(&mut self) -> Vec<DeclId> {
        if let Some(id) = self.parse_label_decl() {
            return vec![id];
        }

        let attributes = self.parse_attributes();

        self.storage_class_flag = StorageClasses::NONE;
        self.data_type_qualifier_flag = Qualifiers::NONE;

        self.parse_storage_class_specifiers();

        let pre = self.parse_pre_data_type();
        let mut out = Vec::new();
        let mut attributes = Some(attributes);

        loop {
            let mut name = DeclaratorName::default();
            let data_type =
                self.parse_post_data_type(pre.clone(), &mut name, false, false, true);
            let mut can_have_list = false;

            let is_function = matches!(data_type.kind, DataTypeKind::Function { .. });
            let is_bare_tag = name.value.is_none()
                && matches!(
                    data_type.kind,
                    DataTypeKind::Enum { .. }
                        | DataTypeKind::Struct { .. }
                        | DataTypeKind::Union { .. }
                );

            if is_function {
                let attrs = attributes.take().unwrap_or_default();
                if let Some(id) = self.parse_function_decl(data_type, attrs, &mut can_have_list) {
                    out.push(id);
                }
            } else if is_bare_tag {
                // The type declaration itself was registered while parsing
                // the pre-data-type.
                self.expect(TokenKind::Semicolon, true);
                return out;
            } else {
                // Inside a function body a bare type head may really be the
                // start of an expression; hand it back.
                if self.in_function_body
                    && name.value.is_none()
                    && !matches!(
                        self.current_token().kind,
                        TokenKind::Eq | TokenKind::Semicolon | TokenKind::Comma
                    )
                {
                    self.data_type_as_expression = Some(data_type);
                    return out;
                }

                if name.generic_params.is_some() && !self.has_typedef_storage_class() {
                    self.error("not expected to have generic params in variable context");
                }

                if let Some(id) = self.parse_variable_decl(data_type, &name, &mut can_have_list) {
                    out.push(id);
                }
            }

            if can_have_list {
                self.next_token(); // skip `,`
            } else {
                break;
            }
        }

        out
    }

    /// `name:` label declaration, only inside function bodies.
    fn parse_label_decl(&mut self) -> Option<DeclId> {
        if !self.in_function_body {
            return None;
        }

        let TokenKind::Identifier(name) = self.current_token().kind else {
            return None;
        };
        if self.peek_token(1).kind != TokenKind::Colon {
            return None;
        }

        let location = self.current_location();
        self.jump(2);
        self.in_label = true;

        Some(self.unit.add_decl_to_scope(
            Decl::Label { name },
            self.current_scope,
            self.interner,
            &location,
        ))
    }

    // ── Attributes ─────────────────────────────────────────────────────

    /// Attribute spellings accepted in the `[[ … ]]` bracket form,
    /// including the GNU double-underscore variants.
    fn attribute_from_name(name: &str) -> Option<fn(Option<Symbol>) -> Attribute> {
        Some(match name {
            "_Noreturn" | "noreturn" | "__noreturn__" | "___Noreturn__" => {
                |_| Attribute::Noreturn
            }
            "deprecated" | "__deprecated__" => Attribute::Deprecated,
            "fallthrough" | "__fallthrough__" => |_| Attribute::Fallthrough,
            "maybe_unused" | "__maybe_unused__" => |_| Attribute::MaybeUnused,
            "nodiscard" | "__nodiscard__" => Attribute::Nodiscard,
            "unsequenced" | "__unsequenced__" => |_| Attribute::Unsequenced,
            "reproducible" | "__reproducible__" => |_| Attribute::Reproducible,
            _ => return None,
        })
    }

    pub(crate) fn parse_attributes(&mut self) -> Vec<Attribute> {
        use TokenKind as T;

        let mut attributes = Vec::new();

        loop {
            match self.current_token().kind.clone() {
                // Scanner-fused attribute tokens.
                T::AttributeDeprecated(reason) => {
                    attributes.push(Attribute::Deprecated(reason));
                    self.next_token();
                }
                T::AttributeNodiscard(reason) => {
                    attributes.push(Attribute::Nodiscard(reason));
                    self.next_token();
                }
                T::AttributeFallthrough => {
                    attributes.push(Attribute::Fallthrough);
                    self.next_token();
                }
                T::AttributeMaybeUnused => {
                    attributes.push(Attribute::MaybeUnused);
                    self.next_token();
                }
                T::AttributeNoreturn | T::AttributeUnderscoreNoreturn => {
                    attributes.push(Attribute::Noreturn);
                    self.next_token();
                }
                T::AttributeUnsequenced => {
                    attributes.push(Attribute::Unsequenced);
                    self.next_token();
                }
                T::AttributeReproducible => {
                    attributes.push(Attribute::Reproducible);
                    self.next_token();
                }
                // `[[ name(reason?) ]]` bracket form.
                T::LHook if self.peek_token(1).kind == T::LHook => {
                    self.jump(2);
                    if let Some(attribute) = self.parse_bracket_attribute() {
                        attributes.push(attribute);
                    }
                    self.expect(T::RHook, true);
                    self.expect(T::RHook, true);
                }
                _ => return attributes,
            }
        }
    }

    fn parse_bracket_attribute(&mut self) -> Option<Attribute> {
        let TokenKind::Identifier(sym) = self.current_token().kind else {
            self.error("expected attribute identifier");
            return None;
        };

        let Some(build) = Self::attribute_from_name(self.interner.resolve(sym)) else {
            self.error("unknown standard attribute");
            self.next_token();
            return None;
        };

        self.next_token();

        let takes_reason = matches!(
            build(None),
            Attribute::Deprecated(_) | Attribute::Nodiscard(_)
        );
        let mut reason = None;

        if takes_reason && self.current_token().kind == TokenKind::LParen {
            self.next_token();

            match self.current_token().kind {
                TokenKind::LiteralString(s) => {
                    reason = Some(s);
                    self.next_token();
                }
                _ => self.error("expected string value"),
            }

            self.expect(TokenKind::RParen, true);
        }

        Some(build(reason))
    }

    // ── Enum ───────────────────────────────────────────────────────────

    /// `enum` head inside a pre-data-type; registers the declaration when a
    /// body (or underlying type, or a lone `;`) follows.
    pub(crate) fn parse_enum_pre_data_type(&mut self) -> DataTypeKind {
        let name = match self.current_token().kind {
            TokenKind::Identifier(sym) => {
                self.next_token();
                Some(sym)
            }
            _ => None,
        };

        let mut res = DataTypeKind::Enum {
            name,
            variants: None,
            underlying: None,
        };

        if matches!(
            self.current_token().kind,
            TokenKind::Colon | TokenKind::LBrace | TokenKind::Semicolon
        ) {
            let decl = self.parse_enum_decl(name);

            if let Decl::Enum {
                variants,
                underlying,
                ..
            } = &decl
            {
                res = DataTypeKind::Enum {
                    name,
                    variants: variants.clone(),
                    underlying: underlying.clone(),
                };
            }

            let location = self.current_location();
            self.unit
                .add_decl_to_scope(decl, self.current_scope, self.interner, &location);
        }

        res
    }

    fn parse_enum_decl(&mut self, name: Option<Symbol>) -> Decl {
        let underlying = match self.current_token().kind {
            TokenKind::Colon => {
                self.next_token();
                Some(self.parse_pre_data_type())
            }
            _ => None,
        };

        match self.current_token().kind {
            TokenKind::LBrace => self.next_token(),
            TokenKind::Semicolon => {
                return Decl::Enum {
                    storage: StorageClasses::NONE,
                    name,
                    variants: None,
                    underlying,
                };
            }
            _ => self.error("expected `{` or `;`"),
        }

        let variants = self.parse_enum_variants(name, underlying.clone());

        Decl::Enum {
            storage: StorageClasses::NONE,
            name,
            variants: Some(variants),
            underlying,
        }
    }

    fn parse_enum_variants(
        &mut self,
        enum_name: Option<Symbol>,
        underlying: Option<Rc<DataType>>,
    ) -> Vec<EnumVariant> {
        let mut variants = Vec::new();
        let mut precedent_value: i64 = -1;

        while !matches!(
            self.current_token().kind,
            TokenKind::RBrace | TokenKind::Eof
        ) {
            let name = self.expect_identifier_or_error_name();

            let value = match self.current_token().kind {
                TokenKind::Eq => {
                    self.next_token();

                    match self.parse_expr() {
                        Some(expr) => match self.resolver.eval_to_int(&expr) {
                            Some(value) => value,
                            None => {
                                self.error(
                                    "expected literal expression (passing a constant or enum \
                                     variant is not yet supported)",
                                );
                                precedent_value + 1
                            }
                        },
                        None => precedent_value + 1,
                    }
                }
                _ => precedent_value + 1,
            };
            precedent_value = value;

            variants.push(EnumVariant { name, value });

            let location = self.current_location();
            self.unit.add_decl_to_scope(
                Decl::EnumVariant {
                    parent: enum_name,
                    underlying: underlying.clone(),
                    name,
                    value,
                },
                self.current_scope,
                self.interner,
                &location,
            );

            if self.current_token().kind != TokenKind::RBrace {
                self.expect(TokenKind::Comma, true);
            }
        }

        self.expect(TokenKind::RBrace, true);

        if variants.is_empty() {
            self.error("expected one or many variants");
        }

        variants
    }

    // ── Struct / union ─────────────────────────────────────────────────

    /// `struct`/`union` head inside a pre-data-type. A braced field list
    /// registers a declaration in the current scope; the resulting type
    /// keeps the fields so typedefs alias the full shape.
    pub(crate) fn parse_struct_or_union_pre_data_type(&mut self, is_struct: bool) -> DataTypeKind {
        let name = match self.current_token().kind {
            TokenKind::Identifier(sym) => {
                self.next_token();
                Some(sym)
            }
            _ => None,
        };

        let generic_params = self.parse_generic_params();

        let fields = self.parse_struct_or_union_fields();

        if fields.is_some() || name.is_some() {
            let decl = if is_struct {
                Decl::Struct {
                    storage: StorageClasses::NONE,
                    name,
                    generic_params: generic_params.clone(),
                    fields: fields.clone(),
                }
            } else {
                Decl::Union {
                    storage: StorageClasses::NONE,
                    name,
                    generic_params: generic_params.clone(),
                    fields: fields.clone(),
                }
            };

            if name.is_some() {
                let location = self.current_location();
                self.unit
                    .add_decl_to_scope(decl, self.current_scope, self.interner, &location);
            }
        }

        if is_struct {
            DataTypeKind::Struct {
                name,
                generic_params,
                fields,
            }
        } else {
            DataTypeKind::Union {
                name,
                generic_params,
                fields,
            }
        }
    }

    fn parse_struct_or_union_fields(&mut self) -> Option<Rc<Fields>> {
        match self.current_token().kind {
            TokenKind::LBrace => self.next_token(),
            _ => return None,
        }

        Some(Rc::new(self.parse_fields()))
    }

    /// `field-declaration ;` list up to `}`.
    pub(crate) fn parse_fields(&mut self) -> Fields {
        let mut fields = Fields::new();

        while !matches!(
            self.current_token().kind,
            TokenKind::RBrace | TokenKind::Eof
        ) {
            self.data_type_qualifier_flag = Qualifiers::NONE;

            let pre = self.parse_pre_data_type();

            loop {
                let mut name = DeclaratorName::default();
                let data_type =
                    self.parse_post_data_type(pre.clone(), &mut name, false, false, false);

                if name.value.is_none()
                    && !matches!(
                        data_type.kind,
                        DataTypeKind::Struct { .. } | DataTypeKind::Union { .. }
                    )
                {
                    self.error("expected identifier");
                }

                let bit = self.parse_field_bit();

                self.add_field(&mut fields, None, name.value, data_type, bit);

                match self.current_token().kind {
                    TokenKind::Comma => {
                        self.next_token();
                        continue;
                    }
                    TokenKind::Semicolon => {
                        self.next_token();
                        break;
                    }
                    _ => {
                        self.error("expected `,` or `;`");
                        break;
                    }
                }
            }
        }

        self.expect(TokenKind::RBrace, true);

        fields
    }

    /// `: width` bit-field suffix; 0 when absent.
    fn parse_field_bit(&mut self) -> u8 {
        if self.current_token().kind != TokenKind::Colon {
            return 0;
        }
        self.next_token();

        let Some(expr) = self.parse_expr() else {
            return 0;
        };

        match self.resolver.eval_to_int(&expr) {
            Some(value) if (0..=255).contains(&value) => value as u8,
            Some(value) if value < 0 => {
                self.error("bit field cannot be negative");
                0
            }
            _ => {
                self.error("expected constant integer bit width");
                0
            }
        }
    }

    /// Adds one parsed field, embedding nested struct/union graphs.
    fn add_field(
        &mut self,
        fields: &mut Fields,
        parent: Option<FieldId>,
        name: Option<Symbol>,
        data_type: Rc<DataType>,
        bit: u8,
    ) {
        let (is_struct, nested) = match &data_type.kind {
            DataTypeKind::Struct {
                fields: nested,
                name: type_name,
                ..
            } => {
                // `struct Foo x;` is a plain member; only unnamed shapes
                // with bodies embed.
                if type_name.is_some() || nested.is_none() {
                    (true, None)
                } else {
                    (true, nested.clone())
                }
            }
            DataTypeKind::Union {
                fields: nested,
                name: type_name,
                ..
            } => {
                if type_name.is_some() || nested.is_none() {
                    (false, None)
                } else {
                    (false, nested.clone())
                }
            }
            _ => {
                if let Err(duplicate) = fields.add(
                    name,
                    parent,
                    FieldKind::Member { data_type, bit },
                ) {
                    self.error(format!(
                        "duplicate field `{}`",
                        self.interner.resolve(duplicate)
                    ));
                }
                return;
            }
        };

        let Some(nested) = nested else {
            // Named struct/union reference used as a member type.
            if let Err(duplicate) =
                fields.add(name, parent, FieldKind::Member { data_type, bit })
            {
                self.error(format!(
                    "duplicate field `{}`",
                    self.interner.resolve(duplicate)
                ));
            }
            return;
        };

        let kind = match (is_struct, name.is_some()) {
            (true, false) => FieldKind::AnonymousStruct,
            (true, true) => FieldKind::NamedStruct,
            (false, false) => FieldKind::AnonymousUnion,
            (false, true) => FieldKind::NamedUnion,
        };

        let group = match fields.add(name, parent, kind) {
            Ok(id) => id,
            Err(duplicate) => {
                self.error(format!(
                    "duplicate field `{}`",
                    self.interner.resolve(duplicate)
                ));
                return;
            }
        };

        if let Err(duplicate) = fields.embed(&nested, Some(group)) {
            self.error(format!(
                "duplicate field `{}`",
                self.interner.resolve(duplicate)
            ));
        }
    }

    // ── Typedef ────────────────────────────────────────────────────────

    /// Rewrites a variable/function declaration into a typedef.
    fn make_typedef(&mut self, aliased: Decl, generic_params: Option<GenericParams>) -> Decl {
        if !self.storage_class_flag.without_typedef().is_empty() {
            self.error("cannot combine other storage class specifier(s) with `typedef`");
        }

        match aliased {
            Decl::Variable {
                data_type, name, ..
            } => Decl::Typedef {
                name,
                generic_params,
                aliased: data_type,
            },
            Decl::Function {
                name, ret, params, ..
            } => Decl::Typedef {
                name,
                generic_params,
                aliased: Rc::new(DataType::new(DataTypeKind::Function {
                    name: Some(name),
                    params,
                    ret,
                    generic_params: None,
                    parent_scope: None,
                })),
            },
            other => {
                self.error("this kind of declaration cannot be aliased by typedef");
                other
            }
        }
    }

    // ── Function ───────────────────────────────────────────────────────

    pub(crate) fn parse_function_decl(
        &mut self,
        data_type: Rc<DataType>,
        attributes: Vec<Attribute>,
        can_have_list: &mut bool,
    ) -> Option<DeclId> {
        let DataTypeKind::Function {
            name,
            params,
            ret,
            generic_params,
            parent_scope,
        } = &data_type.kind
        else {
            return None;
        };

        let name = match name {
            Some(name) => *name,
            None => {
                self.error("expected function name");
                self.generate_name_error()
            }
        };

        let mut decl = Decl::Function {
            storage: self.storage_class_flag,
            name,
            ret: ret.clone(),
            generic_params: generic_params.clone(),
            params: params.clone(),
            body: None,
            attributes,
        };

        if self.has_typedef_storage_class() && self.current_token().kind != TokenKind::LBrace {
            decl = self.make_typedef(decl, generic_params.clone());
        }

        match self.current_token().kind {
            TokenKind::Comma => {
                *can_have_list = true;
            }
            TokenKind::Semicolon => {
                self.next_token();
            }
            TokenKind::LBrace => {
                if self.has_typedef_storage_class() {
                    self.error("not expected to have a body when typedef is passed");
                } else if crate::unit::is_builtin_function(self.interner.resolve(name)) {
                    self.error("cannot redefine a builtin function");
                }

                self.next_token();

                let parent_scope = *parent_scope;
                let body =
                    self.with_function_body(|p| p.parse_function_body(false, false, parent_scope));

                if let Decl::Function {
                    body: body_slot, ..
                } = &mut decl
                {
                    *body_slot = Some(body);
                }
            }
            _ => self.error("expected `{`, `,` or `;`"),
        }

        let location = self.current_location();
        Some(
            self.unit
                .add_decl_to_scope(decl, self.current_scope, self.interner, &location),
        )
    }

    // ── Variable ───────────────────────────────────────────────────────

    pub(crate) fn parse_variable_decl(
        &mut self,
        data_type: Rc<DataType>,
        name: &DeclaratorName,
        can_have_list: &mut bool,
    ) -> Option<DeclId> {
        let var_name = match name.value {
            Some(name) => name,
            None => {
                self.error("expected identifier");
                self.generate_name_error()
            }
        };

        if self.in_label {
            self.error("variable declaration is not expected in a label");
        }

        let mut init = None;

        match self.current_token().kind {
            TokenKind::Comma => {
                *can_have_list = true;
            }
            TokenKind::Eq => {
                if self.has_typedef_storage_class() {
                    self.error("expression is not expected with typedef storage class");
                }

                self.next_token();

                let expr = self.with_allow_initialization(|p| p.parse_expr());

                if let Some(expr) = &expr {
                    self.check_for_initialization_expr(&data_type, expr);
                }
                init = expr;

                match self.current_token().kind {
                    TokenKind::Comma => *can_have_list = true,
                    TokenKind::Semicolon => {
                        if self.eat_semicolon {
                            self.next_token();
                        }
                    }
                    _ => self.error("expected `,` or `;`"),
                }
            }
            TokenKind::Semicolon => {
                if self.eat_semicolon {
                    self.next_token();
                }
            }
            _ => self.error("expected `,`, `=` or `;`"),
        }

        let mut decl = Decl::Variable {
            storage: self.storage_class_flag,
            data_type,
            name: var_name,
            init,
            is_local: self.in_function_body,
        };

        if self.has_typedef_storage_class() {
            decl = self.make_typedef(decl, name.generic_params.clone());
        }

        let location = self.current_location();
        Some(
            self.unit
                .add_decl_to_scope(decl, self.current_scope, self.interner, &location),
        )
    }
}
