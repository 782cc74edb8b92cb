//! Grammar values
//!
//! A grammar is a table of [`Combinator`] nodes addressed by [`Rule`]
//! handles. Nodes refer to their children by handle, so sharing a
//! sub-grammar between several parents costs nothing, and mutually
//! recursive definitions are expressed with a forward reference that is
//! bound once its target exists.
//!
//! Grammars are assembled with a [`GrammarBuilder`] and frozen into an
//! immutable [`Grammar`], which can then be used for any number of parses,
//! including concurrently from several threads.

pub mod builder;

pub use builder::GrammarBuilder;

use std::fmt::{Display, Formatter};

use crate::charset::CharSet;
use crate::tree::{Action, Tag};

/// Handle to a node of a grammar.
///
/// Handles are only meaningful for the builder that created them and for the
/// [`Grammar`] that builder is frozen into.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Rule(u32);

impl Rule {
    #[inline(always)]
    #[must_use]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_usize(ix: usize) -> Self {
        Self(ix as u32)
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// A single node of a grammar.
#[derive(Clone)]
pub enum Combinator {
    /// Exact byte-string
    Literal(Vec<u8>),
    /// One byte drawn from a set
    Set(CharSet),
    /// Every remaining byte of the input, possibly none
    Rest,
    /// All children in order
    Sequence(Vec<Rule>),
    /// First child that matches
    Choice(Vec<Rule>),
    /// Greedy repetition with a lower bound of `0` or `1`
    Repeat { inner: Rule, min: usize },
    Optional(Rule),
    /// Matches like the inner rule but contributes no token
    Suppress(Rule),
    Action(Rule, Action),
    Tag(Rule, Tag),
    /// Inner rule, provided it ends exactly at the end of the input
    End(Rule),
    /// Forward reference, bound after construction
    Indirect(Option<Rule>),
    /// Items separated by `sep`, whose own tokens are dropped
    SepBy { item: Rule, sep: Rule, min: usize },
    /// Every item exactly once in any order, optionally with a separator
    /// between consecutive items
    Permutation { items: Vec<Rule>, sep: Option<Rule> },
}

impl Combinator {
    /// Whether the node matches without evaluating other rules
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Combinator::Literal(_) | Combinator::Set(_) | Combinator::Rest
        )
    }

    /// Short name of the node kind, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Combinator::Literal(_) => "literal",
            Combinator::Set(_) => "set",
            Combinator::Rest => "rest",
            Combinator::Sequence(_) => "sequence",
            Combinator::Choice(_) => "choice",
            Combinator::Repeat { min: 0, .. } => "many",
            Combinator::Repeat { .. } => "many1",
            Combinator::Optional(_) => "optional",
            Combinator::Suppress(_) => "suppress",
            Combinator::Action(..) => "action",
            Combinator::Tag(..) => "tag",
            Combinator::End(_) => "end",
            Combinator::Indirect(_) => "indirect",
            Combinator::SepBy { .. } => "sep_by",
            Combinator::Permutation { .. } => "permutation",
        }
    }
}

impl std::fmt::Debug for Combinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Combinator::Literal(bytes) => {
                write!(f, "literal({:?})", String::from_utf8_lossy(bytes))
            }
            Combinator::Set(set) => write!(f, "set({:?})", set),
            Combinator::Rest => f.write_str("rest"),
            Combinator::Sequence(rules)
            | Combinator::Choice(rules)
            | Combinator::Permutation {
                items: rules,
                sep: None,
            } => write!(f, "{}{:?}", self.kind(), rules),
            Combinator::Permutation {
                items,
                sep: Some(sep),
            } => write!(f, "permutation({:?}, sep {})", items, sep),
            Combinator::Repeat { inner: rule, .. }
            | Combinator::Optional(rule)
            | Combinator::Suppress(rule)
            | Combinator::Action(rule, _)
            | Combinator::End(rule)
            | Combinator::Indirect(Some(rule)) => write!(f, "{}({})", self.kind(), rule),
            Combinator::Tag(rule, tag) => write!(f, "tag({}, {})", rule, tag),
            Combinator::Indirect(None) => f.write_str("indirect(<unbound>)"),
            Combinator::SepBy { item, sep, min } => {
                write!(f, "sep_by(item {}, sep {}, min {})", item, sep, min)
            }
        }
    }
}

/// Frozen, read-only grammar.
///
/// Produced by [`GrammarBuilder::build`]; evaluation entry points live in
/// the [`parse`](crate::parse) module.
#[derive(Debug)]
pub struct Grammar {
    nodes: Vec<Combinator>,
}

impl Grammar {
    pub(crate) fn from_nodes(nodes: Vec<Combinator>) -> Self {
        Self { nodes }
    }

    #[must_use]
    pub fn node(&self, rule: Rule) -> Option<&Combinator> {
        self.nodes.get(rule.to_usize())
    }

    #[must_use]
    pub fn contains(&self, rule: Rule) -> bool {
        rule.to_usize() < self.nodes.len()
    }

    /// Number of nodes in the grammar
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
