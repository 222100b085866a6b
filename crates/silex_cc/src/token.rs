//! Token types for the CI scanner and parser.
//!
//! A [`Token`] is a [`TokenKind`] plus the [`Location`] it spans. The kind
//! space covers:
//!
//! | Category | Examples |
//! |----------|----------|
//! | **Punctuation** | `&&`, `->`, `<<=`, `...` |
//! | **Keywords** | `while`, `typedef`, fused `unsigned long long int` |
//! | **Literals** | `0x2a`, `3.14e-2`, `'a'`, `"abc"` |
//! | **Attributes** | `[[nodiscard("reason")]]` |
//! | **Preprocessor** | `#define`, `#if`/`#elif`/`#endif` groups, `#include` |
//! | **Specials** | `Eof`, `Eot` |
//!
//! Multi-word type keywords are *fused* by the scanner: `long long int` is
//! the single kind [`TokenKind::LongLongInt`]. Preprocessor directives are
//! structured: an `#if` token owns its condition and body token groups, so
//! the external preprocessor never re-lexes.
//!
//! Integer literals keep their source text (interned, separators stripped)
//! and their base is the kind (`LiteralInt`/`LiteralOctal`/`LiteralHex`/
//! `LiteralBin`); conversion to a value happens in the expression resolver.

use serde_json::{json, Value};
use silex_base::{Interner, Location, Symbol};

/// Argument of the `__has_feature(..)` builtin macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasFeature {
    CAlignas,
    CAlignof,
    CAtomic,
    CGenericSelections,
    CGenericSelectionWithControllingType,
    CStaticAssert,
    CThreadLocal,
    AddressSanitizer,
    Modules,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Punctuation and operators.
    Ampersand,
    AmpersandAmpersand,
    AmpersandEq,
    Arrow,
    At,
    Bang,
    BangEq,
    Bar,
    BarBar,
    BarEq,
    Colon,
    Comma,
    Dot,
    DotDotDot,
    Eq,
    EqEq,
    Hashtag,
    Hat,
    HatEq,
    Interrogation,
    LBrace,
    LHook,
    LParen,
    Lt,
    LtEq,
    Shl,
    ShlEq,
    Gt,
    GtEq,
    Shr,
    ShrEq,
    Minus,
    MinusEq,
    MinusMinus,
    Percentage,
    PercentageEq,
    Plus,
    PlusEq,
    PlusPlus,
    RBrace,
    RHook,
    RParen,
    Semicolon,
    Slash,
    SlashEq,
    Star,
    StarEq,
    Wave,
    WaveEq,

    // Comments. Line and block comments are skipped before reaching the
    // stream; doc comments keep their text.
    CommentLine,
    CommentBlock,
    CommentDoc(String),

    // Keywords, including the fused multi-word kinds.
    Alignas,
    Alignof,
    Asm,
    Auto,
    Bool,
    Break,
    Case,
    Char,
    Const,
    Constexpr,
    Continue,
    Default,
    Do,
    Double,
    DoubleComplex,
    DoubleImaginary,
    Else,
    ElseIf,
    Enum,
    Extern,
    False,
    Float,
    FloatComplex,
    FloatImaginary,
    For,
    Goto,
    If,
    Inline,
    Int,
    Long,
    LongDouble,
    LongDoubleComplex,
    LongDoubleImaginary,
    LongInt,
    LongLong,
    LongLongInt,
    Nullptr,
    Register,
    Restrict,
    Return,
    Short,
    ShortInt,
    Signed,
    SignedChar,
    SignedInt,
    SignedLong,
    SignedLongInt,
    SignedLongLong,
    SignedLongLongInt,
    SignedShort,
    SignedShortInt,
    Sizeof,
    Static,
    StaticAssert,
    Struct,
    Switch,
    ThreadLocal,
    True,
    Typedef,
    Typeof,
    TypeofUnqual,
    Union,
    Unsigned,
    UnsignedChar,
    UnsignedInt,
    UnsignedLong,
    UnsignedLongInt,
    UnsignedLongLong,
    UnsignedLongLongInt,
    UnsignedShort,
    UnsignedShortInt,
    Void,
    Volatile,
    While,
    UnderscoreAlignas,
    UnderscoreAlignof,
    UnderscoreAtomic,
    UnderscoreBitInt,
    UnderscoreBool,
    UnderscoreComplex,
    UnderscoreDecimal128,
    UnderscoreDecimal32,
    UnderscoreDecimal64,
    UnderscoreGeneric,
    UnderscoreImaginary,
    UnderscoreNoreturn,
    UnderscoreStaticAssert,
    UnderscoreThreadLocal,
    DunderRestrict,
    DunderRestrictRestrict,

    Identifier(Symbol),

    // Literals. The text is the source spelling with `_` separators removed.
    LiteralInt(Symbol),
    LiteralOctal(Symbol),
    LiteralHex(Symbol),
    LiteralBin(Symbol),
    LiteralFloat(Symbol),
    LiteralChar(char),
    LiteralString(Symbol),

    // Standard attributes. `deprecated` and `nodiscard` take an optional
    // reason string.
    AttributeDeprecated(Option<Symbol>),
    AttributeFallthrough,
    AttributeMaybeUnused,
    AttributeNodiscard(Option<Symbol>),
    AttributeNoreturn,
    AttributeUnderscoreNoreturn,
    AttributeUnsequenced,
    AttributeReproducible,

    // Preprocessor directives with their captured groups.
    PreprocessorDefine {
        name: Symbol,
        params: Option<Vec<Symbol>>,
        body: Vec<Token>,
    },
    PreprocessorElif {
        cond: Vec<Token>,
        body: Vec<Token>,
    },
    PreprocessorElifdef {
        name: Symbol,
        body: Vec<Token>,
    },
    PreprocessorElifndef {
        name: Symbol,
        body: Vec<Token>,
    },
    PreprocessorElse {
        body: Vec<Token>,
    },
    PreprocessorEmbed {
        path: Symbol,
    },
    PreprocessorEndif,
    PreprocessorError(Symbol),
    PreprocessorIf {
        cond: Vec<Token>,
        body: Vec<Token>,
    },
    PreprocessorIfdef {
        name: Symbol,
        body: Vec<Token>,
    },
    PreprocessorIfndef {
        name: Symbol,
        body: Vec<Token>,
    },
    PreprocessorInclude {
        path: Symbol,
    },
    PreprocessorLine {
        line: usize,
        file: Option<Symbol>,
    },
    PreprocessorPragma(Symbol),
    PreprocessorUndef(Symbol),
    PreprocessorWarning(Symbol),
    /// Macro-body placeholder for the parameter at the given index.
    MacroParam(usize),
    /// `defined(name)` inside a preprocessor condition.
    MacroDefined(Symbol),

    // Tokens the external preprocessor resolution layer injects.
    BuiltinHasFeature(HasFeature),
    PredefinedDate(Symbol),
    PredefinedFile(Symbol),
    PredefinedLine,
    PredefinedTime(Symbol),

    Eof,
    /// End-of-token-stream sentinel between preprocessor groups.
    Eot,
}

impl TokenKind {
    /// Short stable name used by the scanner dump.
    pub fn name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Ampersand => "ampersand",
            AmpersandAmpersand => "ampersand_ampersand",
            AmpersandEq => "ampersand_eq",
            Arrow => "arrow",
            At => "at",
            Bang => "bang",
            BangEq => "bang_eq",
            Bar => "bar",
            BarBar => "bar_bar",
            BarEq => "bar_eq",
            Colon => "colon",
            Comma => "comma",
            Dot => "dot",
            DotDotDot => "dot_dot_dot",
            Eq => "eq",
            EqEq => "eq_eq",
            Hashtag => "hashtag",
            Hat => "hat",
            HatEq => "hat_eq",
            Interrogation => "interrogation",
            LBrace => "lbrace",
            LHook => "lhook",
            LParen => "lparen",
            Lt => "lt",
            LtEq => "lt_eq",
            Shl => "shl",
            ShlEq => "shl_eq",
            Gt => "gt",
            GtEq => "gt_eq",
            Shr => "shr",
            ShrEq => "shr_eq",
            Minus => "minus",
            MinusEq => "minus_eq",
            MinusMinus => "minus_minus",
            Percentage => "percentage",
            PercentageEq => "percentage_eq",
            Plus => "plus",
            PlusEq => "plus_eq",
            PlusPlus => "plus_plus",
            RBrace => "rbrace",
            RHook => "rhook",
            RParen => "rparen",
            Semicolon => "semicolon",
            Slash => "slash",
            SlashEq => "slash_eq",
            Star => "star",
            StarEq => "star_eq",
            Wave => "wave",
            WaveEq => "wave_eq",
            CommentLine => "comment_line",
            CommentBlock => "comment_block",
            CommentDoc(_) => "comment_doc",
            Alignas => "keyword_alignas",
            Alignof => "keyword_alignof",
            Asm => "keyword_asm",
            Auto => "keyword_auto",
            Bool => "keyword_bool",
            Break => "keyword_break",
            Case => "keyword_case",
            Char => "keyword_char",
            Const => "keyword_const",
            Constexpr => "keyword_constexpr",
            Continue => "keyword_continue",
            Default => "keyword_default",
            Do => "keyword_do",
            Double => "keyword_double",
            DoubleComplex => "keyword_double__complex",
            DoubleImaginary => "keyword_double__imaginary",
            Else => "keyword_else",
            ElseIf => "keyword_else_if",
            Enum => "keyword_enum",
            Extern => "keyword_extern",
            False => "keyword_false",
            Float => "keyword_float",
            FloatComplex => "keyword_float__complex",
            FloatImaginary => "keyword_float__imaginary",
            For => "keyword_for",
            Goto => "keyword_goto",
            If => "keyword_if",
            Inline => "keyword_inline",
            Int => "keyword_int",
            Long => "keyword_long",
            LongDouble => "keyword_long_double",
            LongDoubleComplex => "keyword_long_double__complex",
            LongDoubleImaginary => "keyword_long_double__imaginary",
            LongInt => "keyword_long_int",
            LongLong => "keyword_long_long",
            LongLongInt => "keyword_long_long_int",
            Nullptr => "keyword_nullptr",
            Register => "keyword_register",
            Restrict => "keyword_restrict",
            Return => "keyword_return",
            Short => "keyword_short",
            ShortInt => "keyword_short_int",
            Signed => "keyword_signed",
            SignedChar => "keyword_signed_char",
            SignedInt => "keyword_signed_int",
            SignedLong => "keyword_signed_long",
            SignedLongInt => "keyword_signed_long_int",
            SignedLongLong => "keyword_signed_long_long",
            SignedLongLongInt => "keyword_signed_long_long_int",
            SignedShort => "keyword_signed_short",
            SignedShortInt => "keyword_signed_short_int",
            Sizeof => "keyword_sizeof",
            Static => "keyword_static",
            StaticAssert => "keyword_static_assert",
            Struct => "keyword_struct",
            Switch => "keyword_switch",
            ThreadLocal => "keyword_thread_local",
            True => "keyword_true",
            Typedef => "keyword_typedef",
            Typeof => "keyword_typeof",
            TypeofUnqual => "keyword_typeof_unqual",
            Union => "keyword_union",
            Unsigned => "keyword_unsigned",
            UnsignedChar => "keyword_unsigned_char",
            UnsignedInt => "keyword_unsigned_int",
            UnsignedLong => "keyword_unsigned_long",
            UnsignedLongInt => "keyword_unsigned_long_int",
            UnsignedLongLong => "keyword_unsigned_long_long",
            UnsignedLongLongInt => "keyword_unsigned_long_long_int",
            UnsignedShort => "keyword_unsigned_short",
            UnsignedShortInt => "keyword_unsigned_short_int",
            Void => "keyword_void",
            Volatile => "keyword_volatile",
            While => "keyword_while",
            UnderscoreAlignas => "keyword__alignas",
            UnderscoreAlignof => "keyword__alignof",
            UnderscoreAtomic => "keyword__atomic",
            UnderscoreBitInt => "keyword__bitint",
            UnderscoreBool => "keyword__bool",
            UnderscoreComplex => "keyword__complex",
            UnderscoreDecimal128 => "keyword__decimal128",
            UnderscoreDecimal32 => "keyword__decimal32",
            UnderscoreDecimal64 => "keyword__decimal64",
            UnderscoreGeneric => "keyword__generic",
            UnderscoreImaginary => "keyword__imaginary",
            UnderscoreNoreturn => "keyword__noreturn",
            UnderscoreStaticAssert => "keyword__static_assert",
            UnderscoreThreadLocal => "keyword__thread_local",
            DunderRestrict => "keyword___restrict",
            DunderRestrictRestrict => "keyword___restrict__",
            Identifier(_) => "identifier",
            LiteralInt(_) => "literal_int",
            LiteralOctal(_) => "literal_octal",
            LiteralHex(_) => "literal_hex",
            LiteralBin(_) => "literal_bin",
            LiteralFloat(_) => "literal_float",
            LiteralChar(_) => "literal_char",
            LiteralString(_) => "literal_string",
            AttributeDeprecated(_) => "attribute_deprecated",
            AttributeFallthrough => "attribute_fallthrough",
            AttributeMaybeUnused => "attribute_maybe_unused",
            AttributeNodiscard(_) => "attribute_nodiscard",
            AttributeNoreturn => "attribute_noreturn",
            AttributeUnderscoreNoreturn => "attribute__noreturn",
            AttributeUnsequenced => "attribute_unsequenced",
            AttributeReproducible => "attribute_reproducible",
            PreprocessorDefine { .. } => "preprocessor_define",
            PreprocessorElif { .. } => "preprocessor_elif",
            PreprocessorElifdef { .. } => "preprocessor_elifdef",
            PreprocessorElifndef { .. } => "preprocessor_elifndef",
            PreprocessorElse { .. } => "preprocessor_else",
            PreprocessorEmbed { .. } => "preprocessor_embed",
            PreprocessorEndif => "preprocessor_endif",
            PreprocessorError(_) => "preprocessor_error",
            PreprocessorIf { .. } => "preprocessor_if",
            PreprocessorIfdef { .. } => "preprocessor_ifdef",
            PreprocessorIfndef { .. } => "preprocessor_ifndef",
            PreprocessorInclude { .. } => "preprocessor_include",
            PreprocessorLine { .. } => "preprocessor_line",
            PreprocessorPragma(_) => "preprocessor_pragma",
            PreprocessorUndef(_) => "preprocessor_undef",
            PreprocessorWarning(_) => "preprocessor_warning",
            MacroParam(_) => "macro_param",
            MacroDefined(_) => "macro_defined",
            BuiltinHasFeature(_) => "builtin_macro___has_feature",
            PredefinedDate(_) => "predefined_macro___date__",
            PredefinedFile(_) => "predefined_macro___file__",
            PredefinedLine => "predefined_macro___line__",
            PredefinedTime(_) => "predefined_macro___time__",
            Eof => "eof",
            Eot => "eot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, location: Location) -> Self {
        Token { kind, location }
    }

    /// JSON view of the token for `--dump-tokens` style output.
    pub fn to_json(&self, interner: &Interner) -> Value {
        use TokenKind::*;

        let mut value = json!({
            "kind": self.kind.name(),
            "line": self.location.start_line,
            "col": self.location.start_col,
        });

        let extra = match &self.kind {
            Identifier(s) | LiteralInt(s) | LiteralOctal(s) | LiteralHex(s) | LiteralBin(s)
            | LiteralFloat(s) | LiteralString(s) => {
                Some(json!({ "text": interner.resolve(*s) }))
            }
            LiteralChar(c) => Some(json!({ "char": c.to_string() })),
            CommentDoc(doc) => Some(json!({ "doc": doc })),
            AttributeDeprecated(reason) | AttributeNodiscard(reason) => {
                (*reason).map(|r| json!({ "reason": interner.resolve(r) }))
            }
            PreprocessorDefine { name, params, body } => Some(json!({
                "name": interner.resolve(*name),
                "params": params.as_ref().map(|ps| {
                    ps.iter().map(|p| interner.resolve(*p)).collect::<Vec<_>>()
                }),
                "body": body.iter().map(|t| t.to_json(interner)).collect::<Vec<_>>(),
            })),
            PreprocessorIf { cond, body } | PreprocessorElif { cond, body } => Some(json!({
                "cond": cond.iter().map(|t| t.to_json(interner)).collect::<Vec<_>>(),
                "body": body.iter().map(|t| t.to_json(interner)).collect::<Vec<_>>(),
            })),
            PreprocessorIfdef { name, body }
            | PreprocessorIfndef { name, body }
            | PreprocessorElifdef { name, body }
            | PreprocessorElifndef { name, body } => Some(json!({
                "name": interner.resolve(*name),
                "body": body.iter().map(|t| t.to_json(interner)).collect::<Vec<_>>(),
            })),
            PreprocessorElse { body } => Some(json!({
                "body": body.iter().map(|t| t.to_json(interner)).collect::<Vec<_>>(),
            })),
            PreprocessorInclude { path } | PreprocessorEmbed { path } => {
                Some(json!({ "path": interner.resolve(*path) }))
            }
            PreprocessorError(msg) | PreprocessorWarning(msg) | PreprocessorPragma(msg) => {
                Some(json!({ "message": interner.resolve(*msg) }))
            }
            PreprocessorUndef(name) | MacroDefined(name) => {
                Some(json!({ "name": interner.resolve(*name) }))
            }
            PreprocessorLine { line, file } => Some(json!({
                "lineno": line,
                "file": (*file).map(|f| interner.resolve(f)),
            })),
            MacroParam(index) => Some(json!({ "index": index })),
            _ => None,
        };

        if let (Some(obj), Some(Value::Object(extra))) = (value.as_object_mut(), extra) {
            for (k, v) in extra {
                obj.insert(k, v);
            }
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn dump_resolves_identifier_text() {
        let mut interner = Interner::new();
        let sym = interner.intern("main");
        let token = Token::new(
            TokenKind::Identifier(sym),
            Location::new(Rc::from("t.c")),
        );
        let v = token.to_json(&interner);
        assert_eq!(v["kind"], "identifier");
        assert_eq!(v["text"], "main");
    }

    #[test]
    fn dump_nests_preprocessor_bodies() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let a = interner.intern("A");
        let loc = Location::new(Rc::from("t.c"));
        let token = Token::new(
            TokenKind::PreprocessorIf {
                cond: vec![Token::new(TokenKind::Identifier(a), loc.clone())],
                body: vec![Token::new(TokenKind::Identifier(x), loc.clone())],
            },
            loc,
        );
        let v = token.to_json(&interner);
        assert_eq!(v["cond"][0]["text"], "A");
        assert_eq!(v["body"][0]["text"], "x");
    }
}
