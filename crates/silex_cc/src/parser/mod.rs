//! Recursive-descent parser for the CI front-end.
//!
//! The parser consumes a *resolved* token stream — preprocessor expansion
//! and conditional selection already performed by the external resolution
//! layer — and populates the [`TranslationUnit`] with declarations and a
//! scope tree.
//!
//! ## State
//!
//! The rolling flags of the grammar (`storage_class_flag`, `in_label`,
//! `in_function_body`, `eat_semicolon`, `allow_initialization`) live on the
//! parser itself and are save/restored through the `with_*` scope helpers,
//! so no set without its matching reset can escape a production.
//!
//! ## Recovery
//!
//! A missing identifier synthesizes a unique `__error__{n}` name so later
//! analysis still has something to hang state on; most malformed token
//! shapes report a diagnostic and continue after the offending token. The
//! only fatal condition is running out of tokens mid-production, which
//! aborts that production but not the translation unit.

mod data_type;
mod decl;
mod expr;
mod stmt;
mod substitute;

pub use substitute::{substitute_data_type, substitute_generic_params};

use crate::ast::data_type::{DataType, GenericParams, Qualifiers, StorageClasses};
use crate::resolver::{ConstResolver, EvalToInt};
use crate::scope::ScopeId;
use crate::standard::check_standard;
use crate::token::{Token, TokenKind};
use crate::unit::TranslationUnit;
use silex_base::{Diagnostic, Interner, Location, Symbol};
use std::rc::Rc;

/// Name (and optional generic-parameter list) collected by a declarator.
#[derive(Debug, Default, Clone)]
pub struct DeclaratorName {
    pub value: Option<Symbol>,
    pub generic_params: Option<GenericParams>,
}

pub struct Parser<'u, 'i> {
    pub(crate) unit: &'u mut TranslationUnit,
    pub(crate) interner: &'i mut Interner,
    pub(crate) resolver: Box<dyn EvalToInt>,
    tokens: Vec<Token>,
    current: usize,
    previous: usize,
    pub(crate) storage_class_flag: StorageClasses,
    pub(crate) data_type_qualifier_flag: Qualifiers,
    pub(crate) in_label: bool,
    pub(crate) in_function_body: bool,
    pub(crate) eat_semicolon: bool,
    pub(crate) allow_initialization: bool,
    pub(crate) current_scope: ScopeId,
    pub(crate) data_type_as_expression: Option<Rc<DataType>>,
    names_error: Vec<Symbol>,
}

impl<'u, 'i> Parser<'u, 'i> {
    pub fn new(unit: &'u mut TranslationUnit, interner: &'i mut Interner) -> Self {
        let current_scope = unit.base_scope();
        Parser {
            unit,
            interner,
            resolver: Box::new(ConstResolver::new()),
            tokens: Vec::new(),
            current: 0,
            previous: 0,
            storage_class_flag: StorageClasses::NONE,
            data_type_qualifier_flag: Qualifiers::NONE,
            in_label: false,
            in_function_body: false,
            eat_semicolon: true,
            allow_initialization: false,
            current_scope,
            data_type_as_expression: None,
            names_error: Vec::new(),
        }
    }

    /// Replaces the constant-expression evaluator (the external resolver
    /// plugs in here).
    pub fn with_resolver(mut self, resolver: Box<dyn EvalToInt>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Parses a resolved token stream and gates on the error counter: a
    /// nonzero count terminates the process with exit code 1.
    pub fn run(&mut self, resolved_tokens: Vec<Token>) {
        self.parse(resolved_tokens);

        if self.unit.sink.count_error() > 0 {
            std::process::exit(1);
        }
    }

    /// Exit-free parse loop.
    pub fn parse(&mut self, resolved_tokens: Vec<Token>) {
        self.init(resolved_tokens);

        while !matches!(self.current_token().kind, TokenKind::Eof) {
            let before = self.current;
            self.parse_decl();

            // A declaration that consumed nothing would loop forever; skip
            // the offending token and keep going.
            if self.current == before && !matches!(self.current_token().kind, TokenKind::Eof) {
                self.next_token();
                if self.current == before {
                    break;
                }
            }
        }
    }

    pub fn init(&mut self, resolved_tokens: Vec<Token>) {
        let mut tokens = resolved_tokens;
        // Doc comments and group sentinels carry no grammar.
        tokens.retain(|t| !matches!(t.kind, TokenKind::CommentDoc(_) | TokenKind::Eot));
        if tokens.is_empty() {
            let location = Location::new(self.unit.name.clone());
            tokens.push(Token::new(TokenKind::Eof, location));
        }

        self.tokens = tokens;
        self.current = 0;
        self.previous = 0;
        self.current_scope = self.unit.base_scope();
        self.check_token_standard(0);
    }

    // ── Cursor ─────────────────────────────────────────────────────────

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current]
    }

    pub(crate) fn previous_token(&self) -> &Token {
        &self.tokens[self.previous]
    }

    pub(crate) fn current_location(&self) -> Location {
        self.current_token().location.clone()
    }

    fn check_token_standard(&self, index: usize) {
        let token = &self.tokens[index];
        check_standard(
            &self.unit.sink,
            self.unit.standard,
            &token.kind,
            &token.location,
        );
    }

    pub(crate) fn next_token(&mut self) {
        if self.current + 1 < self.tokens.len() {
            self.previous = self.current;
            self.current += 1;
            self.check_token_standard(self.current);
        }
    }

    pub(crate) fn jump(&mut self, n: usize) {
        for _ in 0..n {
            self.next_token();
        }
    }

    /// Token at `current + n` (clamped to the trailing `Eof`).
    pub(crate) fn peek_token(&self, n: usize) -> &Token {
        let index = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    /// Cursor position for the two-pass declarator scheme.
    pub(crate) fn position(&self) -> usize {
        self.current
    }

    pub(crate) fn restore_position(&mut self, position: usize) {
        self.current = position.min(self.tokens.len() - 1);
        self.previous = position.saturating_sub(1);
    }

    /// Skips to just past the `)` matching an already-consumed `(`.
    pub(crate) fn skip_paren(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.current_token().kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    if depth == 0 {
                        self.next_token();
                        return;
                    }
                    depth -= 1;
                }
                TokenKind::Eof => {
                    self.error("unexpected EOF, expected `)`");
                    return;
                }
                _ => {}
            }
            self.next_token();
        }
    }

    // ── Expectation helpers ────────────────────────────────────────────

    /// Consumes the current token when it matches `kind`; payload-less
    /// kinds only.
    pub(crate) fn expect(&mut self, kind: TokenKind, emit_error: bool) -> bool {
        if self.current_token().kind == kind {
            self.next_token();
            return true;
        }
        if emit_error {
            self.error(format!(
                "expected `{}`, found `{}`",
                kind.name(),
                self.current_token().kind.name()
            ));
        }
        false
    }

    pub(crate) fn expect_many(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if !self.expect(kind.clone(), true) {
                return false;
            }
        }
        true
    }

    /// Consumes an identifier, or reports and synthesizes an error name.
    pub(crate) fn expect_identifier(&mut self) -> Option<Symbol> {
        if let TokenKind::Identifier(sym) = self.current_token().kind {
            self.next_token();
            return Some(sym);
        }
        self.error("expected identifier");
        None
    }

    pub(crate) fn expect_identifier_or_error_name(&mut self) -> Symbol {
        self.expect_identifier()
            .unwrap_or_else(|| self.generate_name_error())
    }

    // ── Diagnostics and recovery ───────────────────────────────────────

    pub(crate) fn error(&self, message: impl Into<String>) {
        self.unit
            .sink
            .emit(Diagnostic::error(message, self.current_location()));
    }

    pub(crate) fn error_at(&self, location: Location, message: impl Into<String>) {
        self.unit.sink.emit(Diagnostic::error(message, location));
    }

    /// Synthesizes a unique `__error__{n}` placeholder name.
    pub(crate) fn generate_name_error(&mut self) -> Symbol {
        let name = format!("__error__{}", self.names_error.len());
        let sym = self.interner.intern(&name);
        self.names_error.push(sym);
        sym
    }

    // ── Scoped flag helpers ────────────────────────────────────────────

    pub(crate) fn with_function_body<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.in_function_body;
        self.in_function_body = true;
        let res = f(self);
        self.in_function_body = saved;
        res
    }

    pub(crate) fn with_allow_initialization<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.allow_initialization;
        self.allow_initialization = true;
        let res = f(self);
        self.allow_initialization = saved;
        res
    }

    pub(crate) fn without_eat_semicolon<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.eat_semicolon;
        self.eat_semicolon = false;
        let res = f(self);
        self.eat_semicolon = saved;
        res
    }

    pub(crate) fn with_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = self.current_scope;
        self.current_scope = scope;
        let res = f(self);
        self.current_scope = saved;
        res
    }

    // ── Token classification ───────────────────────────────────────────

    pub(crate) fn token_is_data_type(&self, token: &Token) -> bool {
        use TokenKind::*;
        match &token.kind {
            Identifier(sym) => {
                let text = self.interner.resolve(*sym);
                crate::unit::is_builtin_type(text)
                    || self.unit.search_typedef(self.current_scope, *sym).is_some()
                    || text == "nullptr_t"
            }
            At | Bool | Char | Double | DoubleComplex | DoubleImaginary | Enum | Float
            | FloatComplex | FloatImaginary | Int | Long | LongDouble | LongDoubleComplex
            | LongDoubleImaginary | LongInt | LongLong | LongLongInt | Short | ShortInt
            | Signed | SignedChar | SignedInt | SignedLong | SignedLongInt | SignedLongLong
            | SignedLongLongInt | SignedShort | SignedShortInt | Struct | Typeof
            | TypeofUnqual | Union | Unsigned | UnsignedChar | UnsignedInt | UnsignedLong
            | UnsignedLongInt | UnsignedLongLong | UnsignedLongLongInt | UnsignedShort
            | UnsignedShortInt | Void | UnderscoreBool | UnderscoreComplex
            | UnderscoreDecimal128 | UnderscoreDecimal32 | UnderscoreDecimal64
            | UnderscoreImaginary => true,
            _ => self.token_is_data_type_qualifier(token),
        }
    }

    pub(crate) fn is_data_type(&self) -> bool {
        self.token_is_data_type(self.current_token())
    }

    pub(crate) fn token_is_storage_class(&self, token: &Token) -> bool {
        use TokenKind::*;
        matches!(
            token.kind,
            Auto | Constexpr
                | Extern
                | Inline
                | Register
                | Static
                | ThreadLocal
                | UnderscoreThreadLocal
                | Typedef
        )
    }

    pub(crate) fn is_storage_class(&self) -> bool {
        self.token_is_storage_class(self.current_token())
    }

    pub(crate) fn token_is_data_type_qualifier(&self, token: &Token) -> bool {
        use TokenKind::*;
        matches!(
            token.kind,
            Const
                | Volatile
                | Restrict
                | UnderscoreAtomic
                | UnderscoreNoreturn
                | DunderRestrict
                | DunderRestrictRestrict
        )
    }

    pub(crate) fn is_data_type_qualifier(&self) -> bool {
        self.token_is_data_type_qualifier(self.current_token())
    }

    // ── Storage classes and qualifiers ─────────────────────────────────

    /// One qualifier keyword into `flag`; `false` when the current token is
    /// not a qualifier.
    fn parse_data_type_qualifier(&mut self, flag: &mut Qualifiers) -> bool {
        use TokenKind::*;
        let q = match self.current_token().kind {
            Const => Qualifiers::CONST,
            Volatile => Qualifiers::VOLATILE,
            Restrict | DunderRestrict | DunderRestrictRestrict => Qualifiers::RESTRICT,
            UnderscoreAtomic => Qualifiers::ATOMIC,
            UnderscoreNoreturn => Qualifiers::NORETURN,
            _ => return false,
        };
        flag.insert(q);
        true
    }

    pub(crate) fn parse_data_type_qualifiers(&mut self, flag: &mut Qualifiers) {
        let mut old = *flag;
        while self.parse_data_type_qualifier(flag) {
            self.next_token();
            if old == *flag {
                self.error("duplicate data type qualifier");
            }
            old = *flag;
        }
    }

    fn parse_storage_class_specifier(&mut self, flag: &mut StorageClasses) -> bool {
        use TokenKind::*;
        let s = match self.current_token().kind {
            Auto => StorageClasses::AUTO,
            Constexpr => StorageClasses::CONSTEXPR,
            Extern => StorageClasses::EXTERN,
            Inline => StorageClasses::INLINE,
            Register => StorageClasses::REGISTER,
            Static => StorageClasses::STATIC,
            ThreadLocal | UnderscoreThreadLocal => StorageClasses::THREAD_LOCAL,
            Typedef => StorageClasses::TYPEDEF,
            _ => return false,
        };
        flag.insert(s);
        true
    }

    pub(crate) fn parse_storage_class_specifiers(&mut self) {
        let mut flag = self.storage_class_flag;
        let mut old = flag;
        while self.parse_storage_class_specifier(&mut flag) {
            self.next_token();
            if old == flag {
                self.error("duplicate storage class specifier");
            }
            old = flag;
        }
        self.storage_class_flag = flag;
    }

    /// Interleaved run of storage classes and qualifiers, in any order
    /// (C permits `static const int` and `const static int` alike).
    pub(crate) fn parse_storage_classes_and_qualifiers(&mut self) {
        loop {
            if self.is_data_type_qualifier() {
                let mut flag = self.data_type_qualifier_flag;
                self.parse_data_type_qualifiers(&mut flag);
                self.data_type_qualifier_flag = flag;
            } else if self.is_storage_class() {
                self.parse_storage_class_specifiers();
            } else {
                return;
            }
        }
    }

    pub(crate) fn has_typedef_storage_class(&self) -> bool {
        self.storage_class_flag.has_typedef()
    }
}
