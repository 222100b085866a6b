//! Shared atoms for the silex toolchain.
//!
//! Every front-end crate builds on the same three primitives:
//!
//! - [`Location`]: a full source span (file, line/column/byte for both ends)
//!   carried by every token and every parsed node.
//! - [`Interner`] / [`Symbol`]: shared-immutable identifier strings. Interning
//!   happens once in the scanner; everything downstream compares `u32`s.
//! - [`DiagnosticSink`]: the error/warning counters and the renderer all
//!   pipeline stages report into.
//!
//! This crate must stay dependency-light: it is pulled in by every other
//! crate in the workspace.

pub mod diagnostic;
pub mod intern;
pub mod location;

pub use diagnostic::{Diagnostic, DiagnosticSink, Severity, Style};
pub use intern::{Interner, Symbol};
pub use location::Location;
