//! Parse trees and the arena that owns them
//!
//! Every token produced while evaluating a grammar against one input buffer
//! is allocated in a single [`Arena`] and addressed through a [`TokenRef`].
//! The arena is owned by the [`Parsed`](crate::parse::Parsed) value returned
//! to the caller, so all tokens of one parse are released together when that
//! value is dropped.
//!
//! # Token model
//!
//! * [`Token::Bytes`]: a byte-string, produced by literal matchers and by
//!   [`flatten`]
//! * [`Token::Uint`]: an unsigned scalar, produced by single-byte matchers
//! * [`Token::Seq`]: an ordered list, produced by sequencing and repetition
//! * [`Token::Tagged`]: an application-defined node wrapping another token
//! * [`Token::None`]: the result of an optional matcher that did not match
//!
//! Tokens are never mutated once allocated, so a memoized result may be
//! referenced from more than one place in the final tree.

use std::fmt::{Display, Formatter};

cfg_if::cfg_if! {
    if #[cfg(feature = "smallvec_children")] {
        /// Storage for the children of a [`Token::Seq`]
        pub type Children = smallvec::SmallVec<[TokenRef; 4]>;
    } else {
        /// Storage for the children of a [`Token::Seq`]
        pub type Children = Vec<TokenRef>;
    }
}

/// Handle to a token allocated in an [`Arena`]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
#[repr(transparent)]
pub struct TokenRef(u32);

impl TokenRef {
    #[inline(always)]
    #[must_use]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }
}

/// Application-defined label for a [`Token::Tagged`] node
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub struct Tag(pub u16);

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub enum Token {
    None,
    Bytes(Vec<u8>),
    Uint(u64),
    Seq(Children),
    Tagged(Tag, TokenRef),
}

/// Transformation applied by an action rule to the token of its inner rule.
///
/// Actions are plain function pointers so that a frozen grammar stays
/// `Send + Sync`; they may allocate new tokens but never modify existing ones.
pub type Action = fn(&mut Arena, TokenRef) -> TokenRef;

/// Allocation scope for the tokens of a single parse.
#[derive(Debug, Default)]
pub struct Arena {
    tokens: Vec<Token>,
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            tokens: Vec::with_capacity(cap),
        }
    }

    pub fn alloc(&mut self, token: Token) -> TokenRef {
        let ix = self.tokens.len();
        self.tokens.push(token);
        TokenRef(ix as u32)
    }

    /// Returns the token behind `r`.
    ///
    /// # Panics
    ///
    /// Panics if `r` was allocated by a different arena and is out of range.
    #[must_use]
    pub fn get(&self, r: TokenRef) -> &Token {
        &self.tokens[r.to_usize()]
    }

    #[must_use]
    pub fn node(&self, r: TokenRef) -> Node<'_> {
        Node { arena: self, at: r }
    }

    /// Number of tokens allocated so far, including those of abandoned
    /// alternatives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Appends every byte and scalar reachable from `r` to `buf`, in order.
    ///
    /// `None` tokens contribute nothing; scalars are truncated to their low
    /// byte.
    pub fn collect_bytes(&self, r: TokenRef, buf: &mut Vec<u8>) {
        match self.get(r) {
            Token::None => {}
            Token::Bytes(bytes) => buf.extend_from_slice(bytes),
            Token::Uint(u) => buf.push(*u as u8),
            Token::Seq(children) => {
                for &child in children.iter() {
                    self.collect_bytes(child, buf);
                }
            }
            Token::Tagged(_, inner) => self.collect_bytes(*inner, buf),
        }
    }
}

/// Collapses the subtree at `r` into a single [`Token::Bytes`].
pub fn flatten(arena: &mut Arena, r: TokenRef) -> TokenRef {
    if let Token::Bytes(_) = arena.get(r) {
        return r;
    }
    let mut buf = Vec::new();
    arena.collect_bytes(r, &mut buf);
    arena.alloc(Token::Bytes(buf))
}

/// Unwraps a list holding exactly one element; any other token is returned
/// unchanged.
pub fn first(arena: &mut Arena, r: TokenRef) -> TokenRef {
    match arena.get(r) {
        Token::Seq(children) if children.len() == 1 => children[0],
        _ => r,
    }
}

/// Borrowed view of a token together with the arena it lives in.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    arena: &'a Arena,
    at: TokenRef,
}

impl<'a> Node<'a> {
    #[must_use]
    pub fn token(&self) -> &'a Token {
        self.arena.get(self.at)
    }

    #[must_use]
    pub fn token_ref(&self) -> TokenRef {
        self.at
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self.token(), Token::None)
    }

    #[must_use]
    pub fn bytes(&self) -> Option<&'a [u8]> {
        match self.token() {
            Token::Bytes(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn uint(&self) -> Option<u64> {
        match self.token() {
            Token::Uint(u) => Some(*u),
            _ => None,
        }
    }

    #[must_use]
    pub fn tag(&self) -> Option<Tag> {
        match self.token() {
            Token::Tagged(tag, _) => Some(*tag),
            _ => None,
        }
    }

    /// Returns the wrapped node of a tagged token
    #[must_use]
    pub fn inner(&self) -> Option<Node<'a>> {
        match self.token() {
            Token::Tagged(_, inner) => Some(self.arena.node(*inner)),
            _ => None,
        }
    }

    /// Number of children of a list token; `0` for every other token.
    #[must_use]
    pub fn len(&self) -> usize {
        match self.token() {
            Token::Seq(children) => children.len(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn child(&self, ix: usize) -> Option<Node<'a>> {
        match self.token() {
            Token::Seq(children) => children.get(ix).map(|&c| self.arena.node(c)),
            _ => None,
        }
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let arena = self.arena;
        let children: &'a [TokenRef] = match arena.get(self.at) {
            Token::Seq(children) => children.as_slice(),
            _ => &[],
        };
        children.iter().map(move |&c| arena.node(c))
    }

    /// All bytes and scalars under this node, concatenated
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.arena.collect_bytes(self.at, &mut buf);
        buf
    }
}

impl std::fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// Unambiguous rendering: bytes as `<41.42>`, scalars as `u0x20`, lists as
/// `(a b)`, absent optionals as `NULL`, tagged nodes as `#n:inner`.
impl Display for Node<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.token() {
            Token::None => f.write_str("NULL"),
            Token::Bytes(bytes) => {
                f.write_str("<")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{:02x}", b)?;
                }
                f.write_str(">")
            }
            Token::Uint(u) => write!(f, "u{:#x}", u),
            Token::Seq(_) => {
                f.write_str("(")?;
                for (i, child) in self.children().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    Display::fmt(&child, f)?;
                }
                f.write_str(")")
            }
            Token::Tagged(tag, inner) => write!(f, "{}:{}", tag, self.arena.node(*inner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(arena: &mut Arena, items: &[TokenRef]) -> TokenRef {
        arena.alloc(Token::Seq(items.iter().copied().collect()))
    }

    #[test]
    fn unambiguous_rendering() {
        let mut arena = Arena::new();
        let a = arena.alloc(Token::Bytes(b"AB".to_vec()));
        let sp = arena.alloc(Token::Uint(0x20));
        let none = arena.alloc(Token::None);
        let list = seq(&mut arena, &[a, sp, none]);
        let tagged = arena.alloc(Token::Tagged(Tag(2), list));
        assert_eq!(arena.node(list).to_string(), "(<41.42> u0x20 NULL)");
        assert_eq!(arena.node(tagged).to_string(), "#2:(<41.42> u0x20 NULL)");
        let empty = seq(&mut arena, &[]);
        assert_eq!(arena.node(empty).to_string(), "()");
    }

    #[test]
    fn flatten_nested() {
        let mut arena = Arena::new();
        let x = arena.alloc(Token::Uint(b'x' as u64));
        let yz = arena.alloc(Token::Bytes(b"yz".to_vec()));
        let none = arena.alloc(Token::None);
        let inner = seq(&mut arena, &[yz, none]);
        let outer = seq(&mut arena, &[x, inner]);
        let flat = flatten(&mut arena, outer);
        assert_eq!(arena.node(flat).bytes(), Some(&b"xyz"[..]));
        assert_eq!(flatten(&mut arena, flat), flat);
    }

    #[test]
    fn first_unwraps_singletons_only() {
        let mut arena = Arena::new();
        let x = arena.alloc(Token::Uint(1));
        let one = seq(&mut arena, &[x]);
        let two = seq(&mut arena, &[x, x]);
        assert_eq!(first(&mut arena, one), x);
        assert_eq!(first(&mut arena, two), two);
    }
}
