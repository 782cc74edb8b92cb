//! Error types used to report the outcome of a failed parse
//!
//! Most callers only care whether a grammar matched, and can use
//! [`Grammar::parse`](crate::grammar::Grammar::parse), which folds every case
//! below into `None`. The fallible entry points return [`ParseError`] so that
//! a parse aborted by a resource limit can be told apart from input that
//! simply does not match.

use std::error::Error;
use std::fmt::{Display, Formatter, Result};

/// Enumeration type over all reasons a call into the engine can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The grammar does not match the input. This is the routine case.
    NoMatch,
    /// The grammar matched a prefix of the input, but the caller required
    /// the whole buffer to be consumed.
    Incomplete { consumed: usize, len: usize },
    /// The input buffer is longer than the configured limit, and was not
    /// examined at all.
    InputTooLarge { len: usize, limit: usize },
    /// Evaluation nested deeper than the configured limit.
    DepthExceeded { limit: usize },
}

impl ParseError {
    /// Returns `true` for the cases caused by a resource limit rather than by
    /// the contents of the input.
    #[must_use]
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            ParseError::InputTooLarge { .. } | ParseError::DepthExceeded { .. }
        )
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match *self {
            ParseError::NoMatch => write!(f, "input does not match grammar"),
            ParseError::Incomplete { consumed, len } => write!(
                f,
                "grammar matched {} of {} bytes, {} left unconsumed",
                consumed,
                len,
                len - consumed
            ),
            ParseError::InputTooLarge { len, limit } => write!(
                f,
                "input of {} bytes exceeds limit of {} bytes",
                len, limit
            ),
            ParseError::DepthExceeded { limit } => {
                write!(f, "evaluation exceeded nesting limit of {}", limit)
            }
        }
    }
}

impl Error for ParseError {}

/// Type alias for Result with an error type of [`ParseError`]
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod test {
    use super::*;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn parse_error_threadsafe() {
        dummy::<ParseError>()
    }

    #[test]
    fn incomplete_message() {
        let err = ParseError::Incomplete {
            consumed: 3,
            len: 5,
        };
        assert_eq!(err.to_string(), "grammar matched 3 of 5 bytes, 2 left unconsumed");
        assert!(!err.is_limit());
        assert!(ParseError::DepthExceeded { limit: 4 }.is_limit());
    }
}
