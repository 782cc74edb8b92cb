//! Packrat grammar engine with HTTP/1.1 and JSON grammars over byte buffers
//!
//! # Overview
//!
//! `mallet` recognizes and structurally decodes two textual wire formats,
//! HTTP/1.1 request/response messages and JSON values, from an in-memory byte
//! buffer. It performs no I/O and no semantic validation of header contents
//! beyond syntax: it is the grammar-and-matching layer underneath a protocol
//! handler, which owns the sockets and decides what to do with a parsed
//! method, url, header list or body.
//!
//! The crate is built around a small combinator engine:
//!
//! * Grammars are assembled once with a [`GrammarBuilder`], from literal,
//!   character-set and character-range matchers combined by sequencing,
//!   ordered choice, repetition, optional, suppression, semantic actions and
//!   forward references. Construction validates every literal argument and
//!   fails with a [`GrammarError`] on misuse.
//! * The frozen [`Grammar`] is immutable and `Send + Sync`, and is evaluated
//!   against a buffer by recursive descent with full backtracking. Outcomes
//!   are memoized per rule and offset for the duration of a parse, so shared
//!   sub-grammars are never re-evaluated at the same offset.
//! * A successful parse returns a [`Parsed`] value owning an [`Arena`] of
//!   tokens. Malformed input is routine and is reported as `None`, or as
//!   [`ParseError::NoMatch`] from the fallible entry points.
//!
//! On top of the engine, [`HttpRules`] and [`JsonRules`] install the HTTP and
//! JSON grammars into a builder and expose constructors for stricter,
//! application-specific rules (named headers, POST requests to a fixed url,
//! JSON objects with fixed members). A [`Registry`] bundles the standard
//! rules into one grammar that is built once and shared by reference.
//!
//! # Example
//!
//! ```
//! use mallet::prelude::*;
//!
//! let registry = Registry::standard()?;
//! let parsed = registry.parse_response(b"HTTP/1.1 404 Not Found\r\nAge: 3\r\n\r\n")?;
//! let root = parsed.root().expect("responses produce a tree");
//! assert_eq!(root.child(0).and_then(|c| c.bytes()), Some(&b"404"[..]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! * `serde_impls` derives `serde::Serialize` for tokens and JSON values.
//! * `smallvec_children` stores the children of list tokens inline.
//! * `check_complete_parse` makes the [`Registry`] convenience parsers
//!   require the whole buffer to be consumed.

pub mod charset;
pub mod error;
pub mod grammar;
pub mod http;
pub mod json;
pub mod parse;
pub mod prelude;
pub mod registry;
pub mod tree;

pub use crate::charset::CharSet;
pub use crate::error::{GrammarError, GrammarResult, LiteralKind};
pub use crate::grammar::{Combinator, Grammar, GrammarBuilder, Rule};
pub use crate::http::HttpRules;
pub use crate::json::value::{JsonNumber, JsonValue, ValueError};
pub use crate::json::JsonRules;
pub use crate::parse::{
    error::{ParseError, ParseResult},
    ParseConfig, Parsed, DEFAULT_MAX_DEPTH, DEFAULT_MAX_INPUT_LEN,
};
pub use crate::registry::Registry;
pub use crate::tree::{first, flatten, Action, Arena, Node, Tag, Token, TokenRef};
