//! Byte-level scanner for the CI front-end.
//!
//! The scanner walks the raw bytes of one source file and produces the full
//! token stream, terminated by [`TokenKind::Eof`]. It is preprocessor-aware:
//! a directive is consumed whole and becomes one structured token (an `#if`
//! owns its condition and body token groups), so the downstream resolution
//! layer never touches source text again.
//!
//! ## Contexts
//!
//! Scanning is re-entrant. A directive body is scanned with a
//! [`ContextKind`] describing where the scanner currently is:
//!
//! - `Macro` — inside a `#define` body; identifiers matching a macro
//!   parameter become [`TokenKind::MacroParam`], and `#` stays a plain
//!   hashtag token (stringification).
//! - `PreprocessorCond` — inside an `#if`/`#elif` condition; `defined(X)`
//!   becomes [`TokenKind::MacroDefined`].
//! - `PreprocessorIf` / `PreprocessorElse` — inside a conditional group
//!   body; `#elif`, `#else` and `#endif` are only legal here, and `#else`
//!   may not follow `#else`.
//!
//! ## Keyword fusion
//!
//! Runs of C type keywords are fused into a single token through a small
//! DFA (`unsigned long long int` is one token). A fusion step that the
//! configured standard rejects rolls the whole prefix back to individual
//! keyword tokens and reports `required Cxx or later`; fully fused results
//! are normalized (`long` alone becomes `long int`, `signed` alone `int`).

use crate::standard::{check_standard, token_feature, Standard};
use crate::token::{Token, TokenKind};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use silex_base::{Diagnostic, DiagnosticSink, Interner, Location, Symbol};
use std::rc::Rc;

/// One input file: name plus content bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: Rc<str>,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<Rc<str>>, content: impl Into<String>) -> Self {
        SourceFile {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextKind {
    None,
    Macro,
    PreprocessorCond,
    PreprocessorIf,
    PreprocessorElse,
}

/// Scanning context threaded through every token production.
struct Context<'p> {
    kind: ContextKind,
    macro_params: Option<&'p [Symbol]>,
}

impl<'p> Context<'p> {
    fn new(kind: ContextKind) -> Self {
        Context {
            kind,
            macro_params: None,
        }
    }

    fn in_macro(&self) -> bool {
        self.kind == ContextKind::Macro
    }

    fn in_conditional_body(&self) -> bool {
        matches!(
            self.kind,
            ContextKind::PreprocessorIf | ContextKind::PreprocessorElse
        )
    }
}

/// Which section of a conditional group a directive opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    If,
    Ifdef,
    Ifndef,
    Elif,
    Elifdef,
    Elifndef,
    Else,
}

struct SectionHeader {
    kind: SectionKind,
    cond: Option<Vec<Token>>,
    name: Option<Symbol>,
    location: Location,
}

/// Result of one `get_token` step.
enum Scanned {
    One(Token),
    /// Several sibling tokens (rolled-back fusion, `#`+identifier, a whole
    /// conditional group).
    Many(Vec<Token>),
    /// `#elif`/`#elifdef`/`#elifndef`/`#else` met inside a group body.
    Section(SectionHeader),
    /// `#endif` met inside a group body.
    Endif(Location),
    /// Comment or recovered error; nothing to push.
    Skip,
}

enum Merge {
    Merged(TokenKind),
    Stop,
    Invalid(&'static str),
}

thread_local! {
static SINGLE_KEYWORDS: FxHashMap<&'static str, TokenKind> = {
    use TokenKind::*;
    let mut m = FxHashMap::default();
    for (name, kind) in [
        ("_Alignas", UnderscoreAlignas),
        ("_Alignof", UnderscoreAlignof),
        ("_Atomic", UnderscoreAtomic),
        ("_BitInt", UnderscoreBitInt),
        ("_Bool", UnderscoreBool),
        ("_Complex", UnderscoreComplex),
        ("_Decimal128", UnderscoreDecimal128),
        ("_Decimal32", UnderscoreDecimal32),
        ("_Decimal64", UnderscoreDecimal64),
        ("_Generic", UnderscoreGeneric),
        ("_Imaginary", UnderscoreImaginary),
        ("_Noreturn", UnderscoreNoreturn),
        ("_Static_assert", UnderscoreStaticAssert),
        ("_Thread_local", UnderscoreThreadLocal),
        ("__restrict", DunderRestrict),
        ("__restrict__", DunderRestrictRestrict),
        ("alignas", Alignas),
        ("alignof", Alignof),
        ("asm", Asm),
        ("auto", Auto),
        ("bool", Bool),
        ("break", Break),
        ("case", Case),
        ("char", Char),
        ("const", Const),
        ("constexpr", Constexpr),
        ("continue", Continue),
        ("default", Default),
        ("do", Do),
        ("double", Double),
        ("else", Else),
        ("enum", Enum),
        ("extern", Extern),
        ("false", False),
        ("float", Float),
        ("for", For),
        ("goto", Goto),
        ("if", If),
        ("inline", Inline),
        ("int", Int),
        ("long", Long),
        ("nullptr", Nullptr),
        ("register", Register),
        ("restrict", Restrict),
        ("return", Return),
        ("short", Short),
        ("signed", Signed),
        ("sizeof", Sizeof),
        ("static", Static),
        ("static_assert", StaticAssert),
        ("struct", Struct),
        ("switch", Switch),
        ("thread_local", ThreadLocal),
        ("true", True),
        ("typedef", Typedef),
        ("typeof", Typeof),
        ("typeof_unqual", TypeofUnqual),
        ("union", Union),
        ("unsigned", Unsigned),
        ("void", Void),
        ("volatile", Volatile),
        ("while", While),
    ] {
        m.insert(name, kind);
    }
    m
};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Define,
    Elif,
    Elifdef,
    Elifndef,
    Else,
    Embed,
    Endif,
    Error,
    If,
    Ifdef,
    Ifndef,
    Include,
    Line,
    Pragma,
    Undef,
    Warning,
}

static DIRECTIVES: Lazy<FxHashMap<&'static str, Directive>> = Lazy::new(|| {
    use Directive::*;
    let mut m = FxHashMap::default();
    for (name, d) in [
        ("define", Define),
        ("elif", Elif),
        ("elifdef", Elifdef),
        ("elifndef", Elifndef),
        ("else", Else),
        ("embed", Embed),
        ("endif", Endif),
        ("error", Error),
        ("if", If),
        ("ifdef", Ifdef),
        ("ifndef", Ifndef),
        ("include", Include),
        ("line", Line),
        ("pragma", Pragma),
        ("undef", Undef),
        ("warning", Warning),
    ] {
        m.insert(name, d);
    }
    m
});

thread_local! {
// Standard attribute names the scanner fuses into attribute tokens.
static ATTRIBUTES: FxHashMap<&'static str, TokenKind> = {
    use TokenKind::*;
    let mut m = FxHashMap::default();
    for (name, kind) in [
        ("_Noreturn", AttributeUnderscoreNoreturn),
        ("deprecated", AttributeDeprecated(None)),
        ("fallthrough", AttributeFallthrough),
        ("maybe_unused", AttributeMaybeUnused),
        ("nodiscard", AttributeNodiscard(None)),
        ("noreturn", AttributeNoreturn),
        ("reproducible", AttributeReproducible),
        ("unsequenced", AttributeUnsequenced),
    ] {
        m.insert(name, kind);
    }
    m
};
}

type Mark = (usize, usize, usize);

pub struct Scanner<'i> {
    file: SourceFile,
    standard: Standard,
    sink: Rc<DiagnosticSink>,
    interner: &'i mut Interner,
    pos: usize,
    line: usize,
    col: usize,
    pub tokens: Vec<Token>,
}

impl<'i> Scanner<'i> {
    pub fn new(
        file: SourceFile,
        standard: Standard,
        sink: Rc<DiagnosticSink>,
        interner: &'i mut Interner,
    ) -> Self {
        Scanner {
            file,
            standard,
            sink,
            interner,
            pos: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
        }
    }

    /// Scans the whole file and gates on the error counter: a nonzero count
    /// terminates the process, matching the front-end driver contract.
    pub fn run(&mut self, dump_tokens: bool) {
        self.scan_tokens();

        if dump_tokens {
            println!("====Scanner({})====", self.file.name);
            for token in &self.tokens {
                println!("{}", token.to_json(self.interner));
            }
        }

        if self.sink.count_error() > 0 {
            std::process::exit(1);
        }
    }

    /// Exit-free scan loop: fills `self.tokens`, ending with `Eof`.
    pub fn scan_tokens(&mut self) {
        let ctx = Context::new(ContextKind::None);

        while !self.at_end() {
            self.skip_space();
            if self.at_end() {
                break;
            }

            match self.get_token(&ctx) {
                Scanned::One(token) => self.tokens.push(token),
                Scanned::Many(tokens) => self.tokens.extend(tokens),
                Scanned::Section(header) => {
                    self.error_at(
                        header.location,
                        "#elif/#elifdef/#elifndef/#else preprocessor is not expected here",
                    );
                }
                Scanned::Endif(location) => {
                    self.error_at(location, "#endif preprocessor is not expected here");
                }
                Scanned::Skip => {}
            }
        }

        let mark = self.mark();
        let eof = self.token_from(TokenKind::Eof, mark);
        self.tokens.push(eof);
    }

    // ── Cursor primitives ──────────────────────────────────────────────

    fn bytes(&self) -> &[u8] {
        self.file.content.as_bytes()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.file.content.len()
    }

    fn cur(&self) -> u8 {
        *self.bytes().get(self.pos).unwrap_or(&0)
    }

    fn peek(&self, n: usize) -> u8 {
        *self.bytes().get(self.pos + n).unwrap_or(&0)
    }

    fn bump(&mut self) {
        if let Some(&b) = self.bytes().get(self.pos) {
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn jump(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn mark(&self) -> Mark {
        (self.line, self.col, self.pos)
    }

    fn location_from(&self, start: Mark) -> Location {
        let mut location = Location::new(self.file.name.clone());
        location.start(start.0, start.1, start.2);
        location.end(self.line, self.col, self.pos);
        location
    }

    /// Finalizes a token spanning from `start` to the cursor, running the
    /// standard check on the way out.
    fn token_from(&self, kind: TokenKind, start: Mark) -> Token {
        let location = self.location_from(start);
        check_standard(&self.sink, self.standard, &kind, &location);
        Token::new(kind, location)
    }

    fn error_at(&self, location: Location, message: impl Into<String>) {
        self.sink.emit(Diagnostic::error(message, location));
    }

    fn error_here(&self, start: Mark, message: impl Into<String>) {
        self.error_at(self.location_from(start), message);
    }

    fn is_space(b: u8) -> bool {
        matches!(b, b' ' | b'\t' | b'\n' | b'\r')
    }

    fn is_ident_start(b: u8) -> bool {
        b.is_ascii_alphabetic() || b == b'_' || b == b'$'
    }

    fn is_ident(b: u8) -> bool {
        Self::is_ident_start(b) || b.is_ascii_digit()
    }

    fn skip_space(&mut self) {
        while !self.at_end() && Self::is_space(self.cur()) {
            self.bump();
        }
    }

    fn skip_space_except_new_line(&mut self) {
        while !self.at_end() && Self::is_space(self.cur()) && self.cur() != b'\n' {
            self.bump();
        }
    }

    /// Skips horizontal space and backslash-newline continuations; stops at
    /// a plain newline or end of input.
    fn skip_space_and_backslash(&mut self) {
        loop {
            self.skip_space_except_new_line();

            if self.cur() == b'\\' {
                let mark = self.mark();
                self.bump();
                if self.cur() == b'\n' {
                    self.bump();
                } else {
                    self.error_here(mark, "expected new line after `\\`");
                    return;
                }
            } else {
                return;
            }
        }
    }

    fn scan_word(&mut self) -> (Symbol, Mark) {
        let start = self.mark();
        let begin = self.pos;
        while !self.at_end() && Self::is_ident(self.cur()) {
            self.bump();
        }
        let text = self.file.content[begin..self.pos].to_string();
        (self.interner.intern(&text), start)
    }

    /// Reads the identifier starting at `pos + offset` without consuming.
    fn peek_word(&self, offset: usize) -> &str {
        let begin = self.pos + offset;
        let bytes = self.bytes();
        let mut end = begin;
        while end < bytes.len() && Self::is_ident(bytes[end]) {
            end += 1;
        }
        &self.file.content[begin..end]
    }

    // ── Main dispatch ──────────────────────────────────────────────────

    fn get_token(&mut self, ctx: &Context) -> Scanned {
        use TokenKind::*;

        let start = self.mark();
        let c = self.cur();
        let c1 = self.peek(1);
        let c2 = self.peek(2);

        macro_rules! op {
            ($len:expr, $kind:expr) => {{
                self.jump($len);
                Scanned::One(self.token_from($kind, start))
            }};
        }

        match c {
            b'&' if c1 == b'&' => op!(2, AmpersandAmpersand),
            b'&' if c1 == b'=' => op!(2, AmpersandEq),
            b'&' => op!(1, Ampersand),
            b'@' => op!(1, At),
            b'!' if c1 == b'=' => op!(2, BangEq),
            b'!' => op!(1, Bang),
            b'|' if c1 == b'|' => op!(2, BarBar),
            b'|' if c1 == b'=' => op!(2, BarEq),
            b'|' => op!(1, Bar),
            b':' => op!(1, Colon),
            b',' => op!(1, Comma),
            b'/' if c1 == b'/' => {
                // Line comments are standard-gated (C99) but produce no token.
                self.jump(2);
                while !self.at_end() && self.cur() != b'\n' {
                    self.bump();
                }
                let location = self.location_from(start);
                check_standard(&self.sink, self.standard, &CommentLine, &location);
                if ctx.in_macro() {
                    self.error_at(location, "comment line is not expected in a macro body");
                }
                Scanned::Skip
            }
            b'/' if c1 == b'*' && c2 == b'*' => {
                self.jump(3);
                match self.scan_comment_doc(start) {
                    Some(doc) => Scanned::One(self.token_from(CommentDoc(doc), start)),
                    None => Scanned::Skip,
                }
            }
            b'/' if c1 == b'*' => {
                self.jump(2);
                self.skip_comment_block(start);
                Scanned::Skip
            }
            b'/' if c1 == b'=' => op!(2, SlashEq),
            b'/' => op!(1, Slash),
            b'+' if c1 == b'+' => op!(2, PlusPlus),
            b'+' if c1 == b'=' => op!(2, PlusEq),
            b'+' => op!(1, Plus),
            b'-' if c1 == b'>' => op!(2, Arrow),
            b'-' if c1 == b'-' => op!(2, MinusMinus),
            b'-' if c1 == b'=' => op!(2, MinusEq),
            b'-' => op!(1, Minus),
            b'.' if c1 == b'.' && c2 == b'.' => op!(3, DotDotDot),
            b'.' => op!(1, Dot),
            b'=' if c1 == b'=' => op!(2, EqEq),
            b'=' => op!(1, Eq),
            b'#' => self.scan_hash(ctx, start),
            b'^' if c1 == b'=' => op!(2, HatEq),
            b'^' => op!(1, Hat),
            b'?' => op!(1, Interrogation),
            b'{' => op!(1, LBrace),
            b'[' if c1 == b'[' && ATTRIBUTES.with(|m| m.contains_key(self.peek_word(2))) => {
                self.scan_attribute(start)
            }
            b'[' => op!(1, LHook),
            b'(' => op!(1, LParen),
            b'}' => op!(1, RBrace),
            b']' => op!(1, RHook),
            b')' => op!(1, RParen),
            b'<' if c1 == b'<' && c2 == b'=' => op!(3, ShlEq),
            b'<' if c1 == b'<' => op!(2, Shl),
            b'<' if c1 == b'=' => op!(2, LtEq),
            b'<' => op!(1, Lt),
            b'>' if c1 == b'>' && c2 == b'=' => op!(3, ShrEq),
            b'>' if c1 == b'>' => op!(2, Shr),
            b'>' if c1 == b'=' => op!(2, GtEq),
            b'>' => op!(1, Gt),
            b';' => op!(1, Semicolon),
            b'*' if c1 == b'=' => op!(2, StarEq),
            b'*' => op!(1, Star),
            b'%' if c1 == b'=' => op!(2, PercentageEq),
            b'%' => op!(1, Percentage),
            b'~' if c1 == b'=' => op!(2, WaveEq),
            b'~' => op!(1, Wave),
            b'\'' => self.scan_character(start),
            b'"' => self.scan_string_token(start),
            b'0' => self.scan_zero(start),
            b'1'..=b'9' => self.scan_num(start),
            _ if Self::is_ident_start(c) => self.scan_keyword_or_identifier(ctx),
            _ => {
                self.bump();
                self.error_here(start, "unexpected token");
                Scanned::Skip
            }
        }
    }

    // ── Comments ───────────────────────────────────────────────────────

    fn skip_comment_block(&mut self, open: Mark) {
        loop {
            if self.at_end() {
                self.sink.emit(
                    Diagnostic::error("unclosed comment block", self.location_from(open))
                        .with_help("close the comment block with `*/`"),
                );
                return;
            }
            if self.cur() == b'*' && self.peek(1) == b'/' {
                self.jump(2);
                return;
            }
            self.bump();
        }
    }

    fn scan_comment_doc(&mut self, open: Mark) -> Option<String> {
        let begin = self.pos;
        loop {
            if self.at_end() {
                self.sink.emit(
                    Diagnostic::error("unclosed documentation comment", self.location_from(open))
                        .with_help("close the documentation comment with `**/`"),
                );
                return None;
            }
            if self.cur() == b'*' && self.peek(1) == b'*' && self.peek(2) == b'/' {
                let doc = self.file.content[begin..self.pos].to_string();
                self.jump(3);
                return Some(doc);
            }
            self.bump();
        }
    }

    // ── Literals ───────────────────────────────────────────────────────

    /// Resolves one (possibly escaped) character; the cursor sits on the
    /// character itself.
    fn scan_escaped_char(&mut self) -> Option<char> {
        if self.cur() != b'\\' {
            let c = self.cur() as char;
            self.bump();
            return Some(c);
        }

        let mark = self.mark();
        self.bump(); // `\`
        let resolved = match self.cur() {
            b'n' => Some('\n'),
            b't' => Some('\t'),
            b'r' => Some('\r'),
            b'b' => Some('\u{8}'),
            b'\\' => Some('\\'),
            b'\'' => Some('\''),
            b'"' => Some('"'),
            b'0' => Some('\0'),
            _ => None,
        };

        match resolved {
            Some(c) => {
                self.bump();
                Some(c)
            }
            None => {
                if self.at_end() {
                    self.error_here(mark, "unclosed char literal");
                } else {
                    self.error_here(mark, "invalid escape");
                    self.bump();
                }
                None
            }
        }
    }

    fn scan_character(&mut self, start: Mark) -> Scanned {
        self.bump(); // opening `'`

        if self.cur() == b'\'' {
            self.bump();
            self.sink.emit(
                Diagnostic::error("unclosed char literal", self.location_from(start))
                    .with_help("a char literal must contain exactly one character"),
            );
            return Scanned::Skip;
        }

        if self.at_end() {
            self.sink.emit(
                Diagnostic::error("unclosed char literal", self.location_from(start))
                    .with_help("close this char literal with `'`"),
            );
            return Scanned::Skip;
        }

        let c = match self.scan_escaped_char() {
            Some(c) => c,
            None => return Scanned::Skip,
        };

        if self.cur() != b'\'' {
            self.sink.emit(
                Diagnostic::error("unclosed char literal", self.location_from(start))
                    .with_help("close this char literal with `'`"),
            );
            return Scanned::Skip;
        }
        self.bump(); // closing `'`

        Scanned::One(self.token_from(TokenKind::LiteralChar(c), start))
    }

    fn scan_string(&mut self, start: Mark) -> Option<String> {
        self.bump(); // opening `"`
        let mut res = String::new();

        while self.cur() != b'"' {
            if self.at_end() {
                self.sink.emit(
                    Diagnostic::error("unclosed string literal", self.location_from(start))
                        .with_help("add `\"` to the end of string literal"),
                );
                return None;
            }

            // Backslash-newline continues the literal on the next line.
            if self.cur() == b'\\' && self.peek(1) == b'\n' {
                self.jump(2);
                continue;
            }

            match self.scan_escaped_char() {
                Some(c) => res.push(c),
                None => return None,
            }
        }

        self.bump(); // closing `"`
        Some(res)
    }

    fn scan_string_token(&mut self, start: Mark) -> Scanned {
        match self.scan_string(start) {
            Some(s) => {
                let sym = self.interner.intern(&s);
                Scanned::One(self.token_from(TokenKind::LiteralString(sym), start))
            }
            None => Scanned::Skip,
        }
    }

    fn scan_digits(&mut self, out: &mut String, is_valid: impl Fn(u8) -> bool) {
        while !self.at_end() && (is_valid(self.cur()) || self.cur() == b'_') {
            if self.cur() != b'_' {
                out.push(self.cur() as char);
            }
            self.bump();
        }
    }

    fn scan_zero(&mut self, start: Mark) -> Scanned {
        let c1 = self.peek(1);

        if c1 == b'x' || c1 == b'X' {
            self.jump(2);
            let mut text = String::new();
            self.scan_digits(&mut text, |b| b.is_ascii_hexdigit());
            let sym = self.interner.intern(&text);
            return Scanned::One(self.token_from(TokenKind::LiteralHex(sym), start));
        }

        if c1 == b'0' {
            // `00` prefix: binary when every digit is 0/1, octal otherwise.
            self.jump(2);
            let mut text = String::new();
            self.scan_digits(&mut text, |b| matches!(b, b'0' | b'1'));
            if matches!(self.cur(), b'2'..=b'7') {
                self.scan_digits(&mut text, |b| matches!(b, b'0'..=b'7'));
                let sym = self.interner.intern(&text);
                return Scanned::One(self.token_from(TokenKind::LiteralOctal(sym), start));
            }
            let sym = self.interner.intern(&text);
            return Scanned::One(self.token_from(TokenKind::LiteralBin(sym), start));
        }

        if c1 == b'.' || !c1.is_ascii_digit() {
            return self.scan_num(start);
        }

        // A run of leading zeros collapses: `0012` scans as decimal `12`.
        while self.cur() == b'0' {
            self.bump();
        }

        if self.cur() != b'.' && !self.cur().is_ascii_digit() {
            let sym = self.interner.intern("0");
            return Scanned::One(self.token_from(TokenKind::LiteralInt(sym), start));
        }

        self.scan_num(start)
    }

    fn scan_num(&mut self, start: Mark) -> Scanned {
        let mut text = String::new();
        let mut is_float = false;
        let mut is_scientific = false;

        loop {
            let c = self.cur();
            match c {
                b'0'..=b'9' => {
                    text.push(c as char);
                    self.bump();
                }
                b'_' => self.bump(),
                b'.' if self.peek(1) != b'.' => {
                    if is_float {
                        let mark = self.mark();
                        self.bump();
                        self.sink.emit(
                            Diagnostic::error(
                                "invalid float literal",
                                self.location_from(mark),
                            )
                            .with_help(
                                "in a float literal it is forbidden to add more than one `.`",
                            ),
                        );
                        return Scanned::Skip;
                    }
                    is_float = true;
                    text.push('.');
                    self.bump();
                }
                b'e' | b'E' => {
                    if is_scientific {
                        let mark = self.mark();
                        self.bump();
                        self.sink.emit(
                            Diagnostic::error(
                                "invalid float literal",
                                self.location_from(mark),
                            )
                            .with_help(
                                "in a float literal it is forbidden to add more than one `e` or `E`",
                            ),
                        );
                        return Scanned::Skip;
                    }
                    is_scientific = true;
                    text.push(c as char);
                    self.bump();
                    if self.cur() == b'-' || self.cur() == b'+' {
                        text.push(self.cur() as char);
                        self.bump();
                    }
                }
                _ => break,
            }
        }

        let sym = self.interner.intern(&text);
        let kind = if is_float || is_scientific {
            TokenKind::LiteralFloat(sym)
        } else {
            TokenKind::LiteralInt(sym)
        };
        Scanned::One(self.token_from(kind, start))
    }

    // ── Keywords and identifiers ───────────────────────────────────────

    fn single_keyword(&self, sym: Symbol) -> Option<TokenKind> {
        SINGLE_KEYWORDS.with(|m| m.get(self.interner.resolve(sym)).cloned())
    }

    fn can_continue_fusion(kind: &TokenKind) -> bool {
        use TokenKind::*;
        matches!(
            kind,
            Double
                | Else
                | Float
                | Signed
                | Unsigned
                | Long
                | SignedShort
                | UnsignedShort
                | SignedLong
                | UnsignedLong
                | LongLong
                | LongDouble
                | SignedLongLong
                | UnsignedLongLong
        )
    }

    fn merge_keyword(merged: &TokenKind, next: &TokenKind) -> Merge {
        use TokenKind::*;
        match (merged, next) {
            (Double, UnderscoreComplex) => Merge::Merged(DoubleComplex),
            (Double, UnderscoreImaginary) => Merge::Merged(DoubleImaginary),
            (Double, _) => Merge::Invalid("expected `_Complex` or `_Imaginary` after `double`"),
            (Else, If) => Merge::Merged(ElseIf),
            (Else, _) => Merge::Stop,
            (Float, UnderscoreComplex) => Merge::Merged(FloatComplex),
            (Float, UnderscoreImaginary) => Merge::Merged(FloatImaginary),
            (Float, _) => Merge::Invalid("expected `_Complex` or `_Imaginary` after `float`"),
            (Long, Double) => Merge::Merged(LongDouble),
            (Long, Int) => Merge::Merged(LongInt),
            (Long, Long) => Merge::Merged(LongLong),
            (Long, _) => Merge::Invalid("expected `int`, `long` or `double` after `long`"),
            (Signed, Char) => Merge::Merged(SignedChar),
            (Signed, Short) => Merge::Merged(SignedShort),
            (Signed, Int) => Merge::Merged(SignedInt),
            (Signed, Long) => Merge::Merged(SignedLong),
            (Signed, _) => Merge::Invalid("expected `char`, `short`, `int` or `long` after `signed`"),
            (Unsigned, Char) => Merge::Merged(UnsignedChar),
            (Unsigned, Short) => Merge::Merged(UnsignedShort),
            (Unsigned, Int) => Merge::Merged(UnsignedInt),
            (Unsigned, Long) => Merge::Merged(UnsignedLong),
            (Unsigned, _) => {
                Merge::Invalid("expected `char`, `short`, `int` or `long` after `unsigned`")
            }
            (LongDouble, UnderscoreComplex) => Merge::Merged(LongDoubleComplex),
            (LongDouble, UnderscoreImaginary) => Merge::Merged(LongDoubleImaginary),
            (LongDouble, _) => {
                Merge::Invalid("expected `_Complex` or `_Imaginary` after `long double`")
            }
            (SignedShort, Int) => Merge::Merged(SignedShortInt),
            (SignedShort, _) => Merge::Invalid("expected `int` after `signed short`"),
            (UnsignedShort, Int) => Merge::Merged(UnsignedShortInt),
            (UnsignedShort, _) => Merge::Invalid("expected `int` after `unsigned short`"),
            (SignedLong, Int) => Merge::Merged(SignedLongInt),
            (SignedLong, Long) => Merge::Merged(SignedLongLong),
            (SignedLong, _) => Merge::Invalid("expected `int` or `long` after `signed long`"),
            (UnsignedLong, Int) => Merge::Merged(UnsignedLongInt),
            (UnsignedLong, Long) => Merge::Merged(UnsignedLongLong),
            (UnsignedLong, _) => Merge::Invalid("expected `int` or `long` after `unsigned long`"),
            (LongLong, Int) => Merge::Merged(LongLongInt),
            (LongLong, _) => Merge::Invalid("expected `int` after `long long`"),
            (SignedLongLong, Int) => Merge::Merged(SignedLongLongInt),
            (SignedLongLong, _) => Merge::Invalid("expected `int` after `signed long long`"),
            (UnsignedLongLong, Int) => Merge::Merged(UnsignedLongLongInt),
            (UnsignedLongLong, _) => Merge::Invalid("expected `int` after `unsigned long long`"),
            _ => Merge::Stop,
        }
    }

    /// Normalizes a fused result: `signed` alone is `int`, `long` alone is
    /// `long int`, and so on.
    fn standardize_keyword(kind: TokenKind) -> TokenKind {
        use TokenKind::*;
        match kind {
            Short | SignedShort | SignedShortInt => ShortInt,
            UnsignedShort => UnsignedShortInt,
            Signed | SignedInt => Int,
            Long | SignedLong | SignedLongInt => LongInt,
            UnsignedLong => UnsignedLongInt,
            LongLong | SignedLongLong | SignedLongLongInt => LongLongInt,
            Unsigned => UnsignedInt,
            UnsignedLongLong => UnsignedLongLongInt,
            other => other,
        }
    }

    fn identifier_scanned(&mut self, ctx: &Context, sym: Symbol, start: Mark) -> Scanned {
        if let Some(params) = ctx.macro_params {
            if let Some(index) = params.iter().position(|p| *p == sym) {
                return Scanned::One(self.token_from(TokenKind::MacroParam(index), start));
            }
        }

        if ctx.kind == ContextKind::PreprocessorCond && self.interner.resolve(sym) == "defined" {
            return self.scan_defined(start);
        }

        Scanned::One(self.token_from(TokenKind::Identifier(sym), start))
    }

    /// `defined X` / `defined(X)` inside a preprocessor condition.
    fn scan_defined(&mut self, start: Mark) -> Scanned {
        self.skip_space_and_backslash();

        let has_paren = self.cur() == b'(';
        if has_paren {
            self.bump();
            self.skip_space_and_backslash();
        }

        let name = if Self::is_ident_start(self.cur()) {
            let (sym, _) = self.scan_word();
            sym
        } else {
            self.error_here(start, "expected identifier after `defined`");
            Symbol::EMPTY
        };

        if has_paren {
            self.skip_space_and_backslash();
            if self.cur() == b')' {
                self.bump();
            } else {
                self.error_here(start, "expected `)`");
            }
        }

        Scanned::One(self.token_from(TokenKind::MacroDefined(name), start))
    }

    /// Finalizes a keyword token over an explicit location (the fused
    /// prefix may end before the cursor).
    fn keyword_token(&self, kind: TokenKind, location: Location) -> Token {
        check_standard(&self.sink, self.standard, &kind, &location);
        Token::new(kind, location)
    }

    fn parts_location(parts: &[(TokenKind, Location)]) -> Location {
        let first = &parts[0].1;
        let last = &parts[parts.len() - 1].1;
        first.merge(last)
    }

    fn scan_keyword_or_identifier(&mut self, ctx: &Context) -> Scanned {
        let (sym, start) = self.scan_word();

        let mut merged = match self.single_keyword(sym) {
            Some(kind) => kind,
            None => return self.identifier_scanned(ctx, sym, start),
        };
        let mut parts: Vec<(TokenKind, Location)> =
            vec![(merged.clone(), self.location_from(start))];

        while Self::can_continue_fusion(&merged) {
            if self.cur() == b' ' && Self::is_ident_start(self.peek(1)) {
                self.bump();
            }
            if !Self::is_ident_start(self.cur()) {
                break;
            }

            let (next_sym, next_start) = self.scan_word();
            let next_kind = match self.single_keyword(next_sym) {
                Some(kind) => kind,
                None => {
                    // Keyword run ends at an identifier: flush the fused
                    // prefix, then the identifier on its own.
                    let first = self.keyword_token(
                        Self::standardize_keyword(merged),
                        Self::parts_location(&parts),
                    );
                    let mut tokens = vec![first];
                    match self.identifier_scanned(ctx, next_sym, next_start) {
                        Scanned::One(t) => tokens.push(t),
                        Scanned::Many(ts) => tokens.extend(ts),
                        _ => {}
                    }
                    return Scanned::Many(tokens);
                }
            };

            match Self::merge_keyword(&merged, &next_kind) {
                Merge::Merged(new_kind) => {
                    let feature = token_feature(&new_kind);
                    let too_new =
                        matches!(feature.since, Some(since) if self.standard < since);

                    if too_new {
                        // Rolled back: the prefix is emitted unfused and the
                        // diagnostic points at the part that needed the newer
                        // standard.
                        self.error_here(
                            next_start,
                            format!(
                                "this feature requires {} or later",
                                feature.since.map(|s| s.name()).unwrap_or("")
                            ),
                        );
                        parts.push((next_kind, self.location_from(next_start)));
                        let tokens = parts
                            .into_iter()
                            .map(|(kind, location)| Token::new(kind, location))
                            .collect();
                        return Scanned::Many(tokens);
                    }

                    parts.push((next_kind, self.location_from(next_start)));
                    merged = new_kind;
                }
                Merge::Stop => {
                    let first = self.keyword_token(
                        Self::standardize_keyword(merged),
                        Self::parts_location(&parts),
                    );
                    let second = self.token_from(next_kind, next_start);
                    return Scanned::Many(vec![first, second]);
                }
                Merge::Invalid(message) => {
                    self.error_here(next_start, message);
                    let first = self.keyword_token(
                        Self::standardize_keyword(merged),
                        Self::parts_location(&parts),
                    );
                    let second = self.token_from(next_kind, next_start);
                    return Scanned::Many(vec![first, second]);
                }
            }
        }

        Scanned::One(self.keyword_token(
            Self::standardize_keyword(merged),
            Self::parts_location(&parts),
        ))
    }

    // ── Attributes ─────────────────────────────────────────────────────

    fn scan_attribute(&mut self, start: Mark) -> Scanned {
        use TokenKind::*;

        self.jump(2); // `[[`
        let (sym, _) = self.scan_word();
        let base = match ATTRIBUTES.with(|m| m.get(self.interner.resolve(sym)).cloned()) {
            Some(kind) => kind,
            None => {
                self.error_here(start, "unknown standard attribute");
                return Scanned::Skip;
            }
        };

        let kind = match base {
            AttributeDeprecated(_) | AttributeNodiscard(_) => {
                let mut reason = None;
                if self.cur() == b'(' && self.peek(1) == b'"' {
                    self.bump(); // `(`
                    let mark = self.mark();
                    if let Some(s) = self.scan_string(mark) {
                        reason = Some(self.interner.intern(&s));
                    }
                    if self.cur() == b')' {
                        self.bump();
                    } else {
                        self.error_here(start, "expected `)`");
                    }
                }
                match base {
                    AttributeDeprecated(_) => AttributeDeprecated(reason),
                    _ => AttributeNodiscard(reason),
                }
            }
            other => other,
        };

        if self.cur() == b']' && self.peek(1) == b']' {
            self.jump(2);
        } else {
            self.error_here(start, "expected `]]` to close attribute");
        }

        Scanned::One(self.token_from(kind, start))
    }

    // ── Preprocessor ───────────────────────────────────────────────────

    fn scan_hash(&mut self, ctx: &Context, start: Mark) -> Scanned {
        // Inside macro bodies `#` is kept verbatim (stringification).
        if ctx.in_macro() {
            self.bump();
            return Scanned::One(self.token_from(TokenKind::Hashtag, start));
        }

        self.bump(); // `#`
        self.skip_space_except_new_line();

        if !Self::is_ident_start(self.cur()) {
            self.error_here(start, "'#' is not expected outside of a macro");
            return Scanned::Skip;
        }

        let directive = DIRECTIVES.get(self.peek_word(0)).copied();
        let (sym, word_start) = self.scan_word();

        let Some(directive) = directive else {
            // `#name` where name is not a directive: hashtag then identifier.
            let hashtag = self.token_from(TokenKind::Hashtag, start);
            let ident = self.token_from(TokenKind::Identifier(sym), word_start);
            return Scanned::Many(vec![hashtag, ident]);
        };

        match directive {
            Directive::Define => self.scan_define(start),
            Directive::Include => self.scan_include(start),
            Directive::Embed => self.scan_embed(start),
            Directive::Error => {
                let msg = self.scan_rest_of_line();
                Scanned::One(self.token_from(TokenKind::PreprocessorError(msg), start))
            }
            Directive::Warning => {
                let msg = self.scan_rest_of_line();
                Scanned::One(self.token_from(TokenKind::PreprocessorWarning(msg), start))
            }
            Directive::Pragma => {
                let msg = self.scan_rest_of_line();
                Scanned::One(self.token_from(TokenKind::PreprocessorPragma(msg), start))
            }
            Directive::Line => self.scan_line_directive(start),
            Directive::Undef => {
                self.skip_space_and_backslash();
                let name = if Self::is_ident_start(self.cur()) {
                    self.scan_word().0
                } else {
                    self.error_here(start, "expected identifier");
                    Symbol::EMPTY
                };
                Scanned::One(self.token_from(TokenKind::PreprocessorUndef(name), start))
            }
            Directive::If | Directive::Ifdef | Directive::Ifndef => {
                let kind = match directive {
                    Directive::If => SectionKind::If,
                    Directive::Ifdef => SectionKind::Ifdef,
                    _ => SectionKind::Ifndef,
                };
                Scanned::Many(self.scan_conditional_group(kind, start))
            }
            Directive::Elif | Directive::Elifdef | Directive::Elifndef | Directive::Else => {
                let name = match directive {
                    Directive::Elif => "#elif",
                    Directive::Elifdef => "#elifdef",
                    Directive::Elifndef => "#elifndef",
                    _ => "#else",
                };

                if !ctx.in_conditional_body() {
                    self.error_here(
                        start,
                        format!("{} preprocessor is not expected here", name),
                    );
                    return Scanned::Skip;
                }
                if ctx.kind == ContextKind::PreprocessorElse {
                    self.error_here(start, format!("cannot add {} after #else", name));
                    return Scanned::Skip;
                }

                let header = match directive {
                    Directive::Elif => SectionHeader {
                        kind: SectionKind::Elif,
                        cond: Some(self.scan_directive_cond(start)),
                        name: None,
                        location: self.location_from(start),
                    },
                    Directive::Else => SectionHeader {
                        kind: SectionKind::Else,
                        cond: None,
                        name: None,
                        location: self.location_from(start),
                    },
                    _ => SectionHeader {
                        kind: if directive == Directive::Elifdef {
                            SectionKind::Elifdef
                        } else {
                            SectionKind::Elifndef
                        },
                        cond: None,
                        name: Some(self.scan_directive_name(start)),
                        location: self.location_from(start),
                    },
                };
                Scanned::Section(header)
            }
            Directive::Endif => Scanned::Endif(self.location_from(start)),
        }
    }

    /// Condition tokens of an `#if`/`#elif`: the rest of the logical line,
    /// scanned under the preprocessor-cond context.
    fn scan_directive_cond(&mut self, start: Mark) -> Vec<Token> {
        let cond = self.scan_preprocessor_content(ContextKind::PreprocessorCond, None);
        if cond.is_empty() {
            self.error_here(start, "expected expression in preprocessor condition");
        }
        cond
    }

    fn scan_directive_name(&mut self, start: Mark) -> Symbol {
        self.skip_space_and_backslash();
        if Self::is_ident_start(self.cur()) {
            self.scan_word().0
        } else {
            self.error_here(start, "expected identifier");
            Symbol::EMPTY
        }
    }

    /// Scans the remainder of the logical line into a token group.
    fn scan_preprocessor_content(
        &mut self,
        kind: ContextKind,
        macro_params: Option<&[Symbol]>,
    ) -> Vec<Token> {
        let ctx = Context {
            kind,
            macro_params,
        };
        let mut out = Vec::new();

        loop {
            self.skip_space_and_backslash();
            if self.at_end() || self.cur() == b'\n' {
                break;
            }

            match self.get_token(&ctx) {
                Scanned::One(t) => out.push(t),
                Scanned::Many(ts) => out.extend(ts),
                Scanned::Section(header) => {
                    self.error_at(
                        header.location,
                        "conditional preprocessor is not expected here",
                    );
                }
                Scanned::Endif(location) => {
                    self.error_at(location, "#endif preprocessor is not expected here");
                }
                Scanned::Skip => {}
            }
        }

        out
    }

    fn scan_define(&mut self, start: Mark) -> Scanned {
        self.skip_space_and_backslash();

        let name = if Self::is_ident_start(self.cur()) {
            self.scan_word().0
        } else {
            self.error_here(start, "expected macro name");
            Symbol::EMPTY
        };

        // Parameters only when `(` hugs the name.
        let params = if self.cur() == b'(' {
            Some(self.scan_define_params(start))
        } else {
            None
        };

        let body = self.scan_preprocessor_content(ContextKind::Macro, params.as_deref());

        Scanned::One(self.token_from(
            TokenKind::PreprocessorDefine { name, params, body },
            start,
        ))
    }

    fn scan_define_params(&mut self, start: Mark) -> Vec<Symbol> {
        self.bump(); // `(`
        let mut params = Vec::new();

        loop {
            self.skip_space_and_backslash();
            match self.cur() {
                b')' => {
                    self.bump();
                    break;
                }
                b',' => self.bump(),
                c if Self::is_ident_start(c) => params.push(self.scan_word().0),
                0 => {
                    self.error_here(start, "expected `)`");
                    break;
                }
                _ => {
                    self.error_here(start, "expected identifier, `,` or `)`");
                    self.bump();
                }
            }
        }

        params
    }

    /// Scans an entire `#if`/`#ifdef`/`#ifndef` group into its sibling
    /// section tokens; the matching `#endif` is consumed.
    fn scan_conditional_group(&mut self, opener: SectionKind, start: Mark) -> Vec<Token> {
        let mut header = match opener {
            SectionKind::If => SectionHeader {
                kind: SectionKind::If,
                cond: Some(self.scan_directive_cond(start)),
                name: None,
                location: self.location_from(start),
            },
            _ => SectionHeader {
                kind: opener,
                cond: None,
                name: Some(self.scan_directive_name(start)),
                location: self.location_from(start),
            },
        };

        let mut sections = Vec::new();
        let mut body = Vec::new();

        loop {
            self.skip_space();
            if self.at_end() {
                self.error_here(start, "expected #endif");
                sections.push(self.finish_section(header, body));
                break;
            }

            let ctx = Context::new(if header.kind == SectionKind::Else {
                ContextKind::PreprocessorElse
            } else {
                ContextKind::PreprocessorIf
            });

            match self.get_token(&ctx) {
                Scanned::One(t) => body.push(t),
                Scanned::Many(ts) => body.extend(ts),
                Scanned::Section(next_header) => {
                    sections.push(self.finish_section(header, std::mem::take(&mut body)));
                    header = next_header;
                }
                Scanned::Endif(_) => {
                    sections.push(self.finish_section(header, body));
                    break;
                }
                Scanned::Skip => {}
            }
        }

        sections
    }

    fn finish_section(&self, header: SectionHeader, body: Vec<Token>) -> Token {
        let kind = match header.kind {
            SectionKind::If => TokenKind::PreprocessorIf {
                cond: header.cond.unwrap_or_default(),
                body,
            },
            SectionKind::Ifdef => TokenKind::PreprocessorIfdef {
                name: header.name.unwrap_or(Symbol::EMPTY),
                body,
            },
            SectionKind::Ifndef => TokenKind::PreprocessorIfndef {
                name: header.name.unwrap_or(Symbol::EMPTY),
                body,
            },
            SectionKind::Elif => TokenKind::PreprocessorElif {
                cond: header.cond.unwrap_or_default(),
                body,
            },
            SectionKind::Elifdef => TokenKind::PreprocessorElifdef {
                name: header.name.unwrap_or(Symbol::EMPTY),
                body,
            },
            SectionKind::Elifndef => TokenKind::PreprocessorElifndef {
                name: header.name.unwrap_or(Symbol::EMPTY),
                body,
            },
            SectionKind::Else => TokenKind::PreprocessorElse { body },
        };

        check_standard(&self.sink, self.standard, &kind, &header.location);
        Token::new(kind, header.location)
    }

    fn scan_include(&mut self, start: Mark) -> Scanned {
        self.skip_space_and_backslash();

        let path = match self.cur() {
            b'<' => {
                self.bump();
                let begin = self.pos;
                while !self.at_end() && self.cur() != b'>' && self.cur() != b'\n' {
                    self.bump();
                }
                let text = self.file.content[begin..self.pos].to_string();
                if self.cur() == b'>' {
                    self.bump();
                } else {
                    self.error_here(start, "expected `>`");
                }
                self.interner.intern(&text)
            }
            b'"' => {
                let mark = self.mark();
                match self.scan_string(mark) {
                    Some(s) => self.interner.intern(&s),
                    None => Symbol::EMPTY,
                }
            }
            _ => {
                self.error_here(start, "expected `<` or `\"`");
                Symbol::EMPTY
            }
        };

        Scanned::One(self.token_from(TokenKind::PreprocessorInclude { path }, start))
    }

    fn scan_embed(&mut self, start: Mark) -> Scanned {
        self.skip_space_and_backslash();

        let path = if self.cur() == b'"' {
            let mark = self.mark();
            match self.scan_string(mark) {
                Some(s) => self.interner.intern(&s),
                None => Symbol::EMPTY,
            }
        } else {
            self.error_here(start, "expected string literal");
            Symbol::EMPTY
        };

        // TODO: scan the limit/prefix/suffix/if_empty parameter list.
        Scanned::One(self.token_from(TokenKind::PreprocessorEmbed { path }, start))
    }

    fn scan_line_directive(&mut self, start: Mark) -> Scanned {
        self.skip_space_and_backslash();

        let line = if self.cur().is_ascii_digit() {
            let mut text = String::new();
            self.scan_digits(&mut text, |b| b.is_ascii_digit());
            text.parse::<usize>().unwrap_or(self.line)
        } else {
            self.error_here(start, "expected digit");
            self.line
        };

        self.skip_space_and_backslash();

        let file = if self.cur() == b'"' {
            let mark = self.mark();
            self.scan_string(mark).map(|s| self.interner.intern(&s))
        } else {
            None
        };

        Scanned::One(self.token_from(TokenKind::PreprocessorLine { line, file }, start))
    }

    /// The remainder of the logical line, raw, honoring backslash
    /// continuations. Used by `#error`, `#warning` and `#pragma`.
    fn scan_rest_of_line(&mut self) -> Symbol {
        self.skip_space_and_backslash();
        let mut text = String::new();

        while !self.at_end() && self.cur() != b'\n' {
            if self.cur() == b'\\' && self.peek(1) == b'\n' {
                self.jump(2);
                continue;
            }
            text.push(self.cur() as char);
            self.bump();
        }

        self.interner.intern(text.trim_end())
    }
}
