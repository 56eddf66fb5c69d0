//! Error types for every phase: parsing, registration, instantiation and
//! resolution.
//!
//! ```text
//! ResolutionError     - returned at the resolution-call boundary
//! ├── CompileError      - the external compiler rejected an instantiation
//! ├── RegistrationError - declarations could not be added to the store
//! └── ParseError        - a spelling or source text did not parse
//! ```
//!
//! All errors are `Clone`: a failed instantiation is delivered both to the
//! caller that triggered it and to every caller waiting on the same key.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Parse Errors
// ============================================================================

/// Errors from lexing or parsing type spellings and source text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated {what} at {span}")]
    Unterminated { what: &'static str, span: Span },

    #[error("at {span}: expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String },

    #[error("at {span}: invalid type '{spelling}'")]
    InvalidType { spelling: String, span: Span },

    #[error("invalid number '{text}' at {span}")]
    InvalidNumber { text: String, span: Span },
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while adding declarations to the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("duplicate declaration: '{name}'")]
    Duplicate { name: String },

    #[error("invalid template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },

    #[error("specialization of unknown template '{name}'")]
    UnknownPrimary { name: String },
}

// ============================================================================
// Compile Errors
// ============================================================================

/// The external compiler rejected an instantiation (static assertion,
/// substitution failure, missing definition).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("instantiation of '{entity}' rejected: {message}")]
pub struct CompileError {
    pub entity: String,
    pub message: String,
}

impl CompileError {
    pub fn new(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Resolution Errors
// ============================================================================

/// Typed failure of a resolution call. None of these are fatal; the caller
/// may retry with different arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("cannot resolve template argument '{token}'")]
    UnresolvableArgument { token: String },

    #[error("integer value {value} does not fit any integral type")]
    AmbiguousNumericWidth { value: i128 },

    #[error("'{template}': parameter '{parameter}' can be neither deduced nor defaulted")]
    UnderspecifiedTemplate { template: String, parameter: String },

    #[error("ambiguous partial specialization of '{template}': {}", candidates.join(" vs "))]
    AmbiguousSpecialization {
        template: String,
        candidates: Vec<String>,
    },

    #[error("'{template}' expects {expected} template argument(s), got {got}")]
    ArgumentCountMismatch {
        template: String,
        expected: usize,
        got: usize,
    },

    #[error("no matching overload for '{name}({args})'")]
    NoMatchingOverload { name: String, args: String },

    #[error("ambiguous call to '{name}': {}", candidates.join(", "))]
    AmbiguousOverload { name: String, candidates: Vec<String> },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("unknown name '{name}' in scope '{scope}'")]
    UnknownName { name: String, scope: String },

    #[error("'{name}' is not a template")]
    NotATemplate { name: String },

    #[error("'{template}': parameter '{parameter}' expects a {expected} argument")]
    ArgumentKindMismatch {
        template: String,
        parameter: String,
        expected: &'static str,
    },

    #[error("deduction failed for '{template}': {reason}")]
    DeductionFailed { template: String, reason: String },

    #[error("value {value} out of range for '{kind}'")]
    ValueOutOfRange { value: i128, kind: String },

    #[error("recursive instantiation of '{key}'")]
    RecursiveInstantiation { key: String },

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ResolutionError {
    /// Failures that only eliminate one candidate during overload resolution.
    pub fn is_candidate_failure(&self) -> bool {
        matches!(
            self,
            ResolutionError::UnderspecifiedTemplate { .. }
                | ResolutionError::ArgumentCountMismatch { .. }
                | ResolutionError::ArgumentKindMismatch { .. }
                | ResolutionError::DeductionFailed { .. }
                | ResolutionError::ValueOutOfRange { .. }
                | ResolutionError::Compile(_)
                | ResolutionError::UnresolvableArgument { .. }
                | ResolutionError::NoMatchingOverload { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = ResolutionError::AmbiguousOverload {
            name: "callme".into(),
            candidates: vec!["callme(int)".into(), "callme(long)".into()],
        };
        assert_eq!(err.to_string(), "ambiguous call to 'callme': callme(int), callme(long)");

        let err = ParseError::UnexpectedToken {
            expected: "'>'".into(),
            found: ";".into(),
            span: Span::new(3, 7, 1),
        };
        assert_eq!(err.to_string(), "at 3:7: expected '>', found ';'");
    }

    #[test]
    fn compile_errors_convert_and_eliminate_candidates() {
        let err: ResolutionError = CompileError::new("Atom::Atom<double>", "static assertion failed").into();
        assert!(err.is_candidate_failure());
        assert!(!ResolutionError::AmbiguousNumericWidth { value: 1 }.is_candidate_failure());
    }
}
