//! C standards and feature gating.
//!
//! Every token kind carries a [`Feature`] descriptor: the standard that
//! introduced it and, for the handful of spellings C23 retired
//! (`_Alignas`, `_Bool`, …), the standard that removed it. After the
//! scanner finalizes a token it compares the descriptor against the
//! configured [`Standard`] and reports `required Cxx or later` /
//! `no longer available in Cxx` accordingly. The parser repeats the check
//! on every token it consumes, since resolved streams may splice tokens
//! from other files.

use crate::token::TokenKind;
use serde::Serialize;
use silex_base::{Diagnostic, DiagnosticSink, Location};

/// A C standard, linearly ordered from K&R to C23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Standard {
    KR,
    C89,
    C95,
    C99,
    C11,
    C17,
    C23,
}

impl Standard {
    pub fn name(self) -> &'static str {
        match self {
            Standard::KR => "K&R",
            Standard::C89 => "C89",
            Standard::C95 => "C95",
            Standard::C99 => "C99",
            Standard::C11 => "C11",
            Standard::C17 => "C17",
            Standard::C23 => "C23",
        }
    }
}

/// Availability window of a token kind: `since` inclusive, `until`
/// exclusive. `None` means unconstrained on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feature {
    pub since: Option<Standard>,
    pub until: Option<Standard>,
}

impl Feature {
    pub const ALWAYS: Feature = Feature {
        since: None,
        until: None,
    };

    pub const fn since(standard: Standard) -> Feature {
        Feature {
            since: Some(standard),
            until: None,
        }
    }

    pub const fn between(since: Standard, until: Standard) -> Feature {
        Feature {
            since: Some(since),
            until: Some(until),
        }
    }
}

/// Returns the availability window for `kind`.
pub fn token_feature(kind: &TokenKind) -> Feature {
    use Standard::*;
    use TokenKind::*;

    match kind {
        // C23 attributes; `[[_Noreturn]]` was transitional and is gone again.
        AttributeDeprecated(_) | AttributeFallthrough | AttributeMaybeUnused
        | AttributeNodiscard(_) | AttributeNoreturn | AttributeUnsequenced
        | AttributeReproducible => Feature::since(C23),
        AttributeUnderscoreNoreturn => Feature::between(C23, C23),

        // C23 keywords.
        Alignas | Alignof | Bool | Constexpr | False | Nullptr | StaticAssert | ThreadLocal
        | True | Typeof | TypeofUnqual | UnderscoreBitInt | UnderscoreDecimal128
        | UnderscoreDecimal32 | UnderscoreDecimal64 => Feature::since(C23),

        // C11 keywords; the underscore spellings of what C23 renamed are
        // only valid between C11 and C23.
        UnderscoreAtomic | UnderscoreGeneric | UnderscoreNoreturn => Feature::since(C11),
        UnderscoreAlignas | UnderscoreAlignof | UnderscoreStaticAssert
        | UnderscoreThreadLocal => Feature::between(C11, C23),

        // C99 keywords and spellings.
        Inline | Restrict | UnderscoreComplex | UnderscoreImaginary => Feature::since(C99),
        UnderscoreBool => Feature::between(C99, C23),
        DoubleComplex | DoubleImaginary | FloatComplex | FloatImaginary | LongDoubleComplex
        | LongDoubleImaginary | LongLong | LongLongInt | SignedLongLong | SignedLongLongInt
        | UnsignedLongLong | UnsignedLongLongInt => Feature::since(C99),
        CommentLine => Feature::since(C99),

        // C23 preprocessor additions.
        PreprocessorElifdef { .. } | PreprocessorElifndef { .. } | PreprocessorEmbed { .. }
        | PreprocessorWarning(_) => Feature::since(C23),

        _ => Feature::ALWAYS,
    }
}

/// Checks `kind` against `standard`, reporting into `sink`.
pub fn check_standard(
    sink: &DiagnosticSink,
    standard: Standard,
    kind: &TokenKind,
    location: &Location,
) {
    let feature = token_feature(kind);

    if let Some(since) = feature.since {
        if standard < since {
            sink.emit(Diagnostic::error(
                format!("this feature requires {} or later", since.name()),
                location.clone(),
            ));
            return;
        }
    }

    if let Some(until) = feature.until {
        if standard >= until {
            sink.emit(Diagnostic::note(
                format!("this feature is no longer available in {}", standard.name()),
                location.clone(),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standards_are_ordered() {
        assert!(Standard::KR < Standard::C89);
        assert!(Standard::C89 < Standard::C99);
        assert!(Standard::C17 < Standard::C23);
    }

    #[test]
    fn long_long_requires_c99() {
        let f = token_feature(&TokenKind::LongLongInt);
        assert_eq!(f.since, Some(Standard::C99));
        assert_eq!(f.until, None);
    }

    #[test]
    fn underscore_bool_is_removed_in_c23() {
        let f = token_feature(&TokenKind::UnderscoreBool);
        assert_eq!(f.since, Some(Standard::C99));
        assert_eq!(f.until, Some(Standard::C23));
    }

    #[test]
    fn check_reports_too_new_feature() {
        use silex_base::Location;
        use std::rc::Rc;

        let sink = DiagnosticSink::new();
        let loc = Location::new(Rc::from("t.c"));
        check_standard(&sink, Standard::C89, &TokenKind::LongLong, &loc);
        assert_eq!(sink.count_error(), 1);
        assert!(sink.any_message_contains("C99 or later"));
    }
}
