//! Construction-time error types
//!
//! This module contains the error type returned by the fallible
//! constructors of [`GrammarBuilder`](crate::grammar::GrammarBuilder)
//! and by the grammar families built on top of it. Such errors are never
//! caused by the input being parsed; they indicate a defect in the code
//! that assembles a grammar, and are reported before any input is seen.
//!
//! Failure to match input is not represented here, see
//! [`ParseError`](crate::parse::error::ParseError) for that.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use crate::grammar::Rule;

/// The class of literal that failed validation when it was handed to a
/// grammar constructor.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum LiteralKind {
    /// Header names, restricted to `[A-Za-z0-9-_.]`
    HeaderName,
    /// Request methods, restricted to upper-case ASCII letters
    Method,
    /// Three-digit status codes in the range `100..=599`
    StatusCode,
    /// POST targets, restricted to `[A-Za-z0-9/.]`
    PostUrl,
    /// JSON member names, which must be legal JSON string contents
    JsonName,
}

impl Display for LiteralKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralKind::HeaderName => f.write_str("header name"),
            LiteralKind::Method => f.write_str("request method"),
            LiteralKind::StatusCode => f.write_str("status code"),
            LiteralKind::PostUrl => f.write_str("POST url"),
            LiteralKind::JsonName => f.write_str("JSON member name"),
        }
    }
}

/// Enumerated error type for grammar construction failures.
#[derive(Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A literal argument contained a byte that is illegal for its kind.
    ///
    /// `offset` is the position of the first offending byte, or the length
    /// of the literal when the literal is illegal as a whole (e.g. an empty
    /// header name).
    InvalidLiteral {
        kind: LiteralKind,
        literal: Vec<u8>,
        offset: usize,
    },
    /// A literal matcher was requested for the empty byte-string
    EmptyLiteral,
    /// A character range whose lower bound exceeds its upper bound
    InvalidRange { lo: u8, hi: u8 },
    /// An ordered choice with no alternatives
    EmptyChoice,
    /// A rule handle whose index is out of range for the builder it was
    /// passed to
    UnknownRule(Rule),
    /// A forward reference that was never bound before the grammar was frozen
    UnboundReference(Rule),
    /// A second `bind` on the same forward reference
    AlreadyBound(Rule),
    /// A `bind` on a rule that is not a forward reference
    NotAReference(Rule),
}

impl GrammarError {
    pub(crate) fn invalid(kind: LiteralKind, literal: &[u8], offset: usize) -> Self {
        Self::InvalidLiteral {
            kind,
            literal: literal.to_vec(),
            offset,
        }
    }
}

impl Debug for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLiteral {
                kind,
                literal,
                offset,
            } => write!(
                f,
                "InvalidLiteral({kind}, {:?}, offset {offset})",
                String::from_utf8_lossy(literal)
            ),
            Self::EmptyLiteral => f.write_str("EmptyLiteral"),
            Self::InvalidRange { lo, hi } => write!(f, "InvalidRange({lo:#04x}, {hi:#04x})"),
            Self::EmptyChoice => f.write_str("EmptyChoice"),
            Self::UnknownRule(r) => write!(f, "UnknownRule({r})"),
            Self::UnboundReference(r) => write!(f, "UnboundReference({r})"),
            Self::AlreadyBound(r) => write!(f, "AlreadyBound({r})"),
            Self::NotAReference(r) => write!(f, "NotAReference({r})"),
        }
    }
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::InvalidLiteral {
                kind,
                literal,
                offset,
            } => {
                if *offset < literal.len() {
                    write!(
                        f,
                        "illegal byte {:#04x} at offset {} of {} `{}`",
                        literal[*offset],
                        offset,
                        kind,
                        String::from_utf8_lossy(literal)
                    )
                } else {
                    write!(
                        f,
                        "{} `{}` is not well-formed",
                        kind,
                        String::from_utf8_lossy(literal)
                    )
                }
            }
            GrammarError::EmptyLiteral => f.write_str("literal matchers require at least one byte"),
            GrammarError::InvalidRange { lo, hi } => {
                write!(f, "character range {lo:#04x}..={hi:#04x} is empty")
            }
            GrammarError::EmptyChoice => f.write_str("ordered choice requires at least one branch"),
            GrammarError::UnknownRule(rule) => {
                write!(f, "rule {rule} is out of range for this grammar builder")
            }
            GrammarError::UnboundReference(rule) => {
                write!(f, "forward reference {rule} was never bound")
            }
            GrammarError::AlreadyBound(rule) => {
                write!(f, "forward reference {rule} is already bound")
            }
            GrammarError::NotAReference(rule) => {
                write!(f, "rule {rule} is not a forward reference and cannot be bound")
            }
        }
    }
}

impl Error for GrammarError {}

/// Type alias for Result with an error type of [`GrammarError`]
pub type GrammarResult<T> = std::result::Result<T, GrammarError>;
