//! Glob-importable re-exports of the types needed to build grammars and
//! inspect their results

pub use crate::error::{GrammarError, GrammarResult};
pub use crate::grammar::{Grammar, GrammarBuilder, Rule};
pub use crate::http::HttpRules;
pub use crate::json::value::JsonValue;
pub use crate::json::JsonRules;
pub use crate::parse::error::{ParseError, ParseResult};
pub use crate::parse::{ParseConfig, Parsed};
pub use crate::registry::Registry;
pub use crate::tree::{Node, Tag, Token};
