//! C-compatible front-end (CI) for the silex toolchain.
//!
//! The pipeline is strictly forward:
//!
//! ```text
//! bytes ──Scanner──▶ tokens ──(external preprocessor)──▶ resolved tokens
//!       ──Parser──▶ declarations + scope tree
//! ```
//!
//! - [`scanner::Scanner`] turns source bytes into a token stream that
//!   already understands preprocessor directives, multi-word keyword fusion
//!   (`unsigned long long int` is one token) and `[[attribute]]` syntax,
//!   gated against a configured C [`standard::Standard`].
//! - [`parser::Parser`] turns a resolved token stream into the typed
//!   declaration tree of [`ast`], registering symbols into the
//!   [`unit::TranslationUnit`]'s scope tree.
//!
//! Preprocessor expansion, file inclusion, diagnostics rendering and code
//! generation are collaborators of this crate, not part of it.

pub mod ast;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod scope;
pub mod standard;
pub mod token;
pub mod unit;

pub use scanner::{Scanner, SourceFile};
pub use standard::{Feature, Standard};
pub use token::{Token, TokenKind};
