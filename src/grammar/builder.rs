//! Incremental construction of grammars
//!
//! Every constructor on [`GrammarBuilder`] appends a node and returns its
//! [`Rule`] handle. Constructors that take other rules check that those
//! handles are in range for the builder, and constructors that take literal
//! arguments validate them immediately, so that a malformed grammar is
//! rejected before it is ever used to parse anything.

use crate::charset::CharSet;
use crate::error::{GrammarError, GrammarResult};
use crate::grammar::{Combinator, Grammar, Rule};
use crate::tree::{first, Action, Tag};

/// Mutable grammar under construction.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    nodes: Vec<Combinator>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    fn push(&mut self, node: Combinator) -> Rule {
        let rule = Rule::from_usize(self.nodes.len());
        self.nodes.push(node);
        rule
    }

    fn check(&self, rule: Rule) -> GrammarResult<Rule> {
        if rule.to_usize() < self.nodes.len() {
            Ok(rule)
        } else {
            Err(GrammarError::UnknownRule(rule))
        }
    }

    fn check_all(&self, rules: &[Rule]) -> GrammarResult<Vec<Rule>> {
        rules.iter().map(|&r| self.check(r)).collect()
    }

    /// Number of nodes created so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Matches exactly `bytes`, producing a byte-string token.
    pub fn literal(&mut self, bytes: &[u8]) -> GrammarResult<Rule> {
        if bytes.is_empty() {
            return Err(GrammarError::EmptyLiteral);
        }
        Ok(self.push(Combinator::Literal(bytes.to_vec())))
    }

    /// Matches the single byte `c`, producing a scalar token.
    pub fn ch(&mut self, c: u8) -> Rule {
        self.push(Combinator::Set(CharSet::from_bytes(&[c])))
    }

    /// Matches one byte in `lo..=hi`.
    pub fn range(&mut self, lo: u8, hi: u8) -> GrammarResult<Rule> {
        if lo > hi {
            return Err(GrammarError::InvalidRange { lo, hi });
        }
        Ok(self.push(Combinator::Set(CharSet::from_range(lo, hi))))
    }

    /// Matches one byte contained in `bytes`.
    pub fn one_of(&mut self, bytes: &[u8]) -> Rule {
        self.set(CharSet::from_bytes(bytes))
    }

    /// Matches one byte not contained in `bytes`.
    pub fn none_of(&mut self, bytes: &[u8]) -> Rule {
        self.set(CharSet::from_bytes(bytes).complement())
    }

    pub fn set(&mut self, set: CharSet) -> Rule {
        self.push(Combinator::Set(set))
    }

    /// Matches the remainder of the input as one byte-string; never fails.
    pub fn rest(&mut self) -> Rule {
        self.push(Combinator::Rest)
    }

    /// Matches every rule in order, rolling back entirely if any fails.
    pub fn sequence(&mut self, rules: &[Rule]) -> GrammarResult<Rule> {
        let rules = self.check_all(rules)?;
        Ok(self.push(Combinator::Sequence(rules)))
    }

    /// Ordered alternation: the first rule that matches wins.
    pub fn choice(&mut self, rules: &[Rule]) -> GrammarResult<Rule> {
        if rules.is_empty() {
            return Err(GrammarError::EmptyChoice);
        }
        let rules = self.check_all(rules)?;
        Ok(self.push(Combinator::Choice(rules)))
    }

    /// Zero or more repetitions; never fails.
    pub fn many(&mut self, rule: Rule) -> GrammarResult<Rule> {
        let inner = self.check(rule)?;
        Ok(self.push(Combinator::Repeat { inner, min: 0 }))
    }

    /// One or more repetitions.
    pub fn many1(&mut self, rule: Rule) -> GrammarResult<Rule> {
        let inner = self.check(rule)?;
        Ok(self.push(Combinator::Repeat { inner, min: 1 }))
    }

    pub fn optional(&mut self, rule: Rule) -> GrammarResult<Rule> {
        let inner = self.check(rule)?;
        Ok(self.push(Combinator::Optional(inner)))
    }

    /// Matches `rule` but leaves it out of the enclosing list.
    pub fn suppress(&mut self, rule: Rule) -> GrammarResult<Rule> {
        let inner = self.check(rule)?;
        Ok(self.push(Combinator::Suppress(inner)))
    }

    /// Replaces the token of `rule` with `action(token)`.
    pub fn action(&mut self, rule: Rule, action: Action) -> GrammarResult<Rule> {
        let inner = self.check(rule)?;
        Ok(self.push(Combinator::Action(inner, action)))
    }

    /// Wraps the token of `rule` in a tagged node.
    pub fn tag(&mut self, rule: Rule, tag: Tag) -> GrammarResult<Rule> {
        let inner = self.check(rule)?;
        Ok(self.push(Combinator::Tag(inner, tag)))
    }

    /// Matches `rule` only when it consumes the remainder of the input.
    pub fn end(&mut self, rule: Rule) -> GrammarResult<Rule> {
        let inner = self.check(rule)?;
        Ok(self.push(Combinator::End(inner)))
    }

    /// Matches `left rule right`, keeping only the token of `rule`.
    pub fn middle(&mut self, left: Rule, rule: Rule, right: Rule) -> GrammarResult<Rule> {
        let left = self.suppress(left)?;
        let right = self.suppress(right)?;
        let seq = self.sequence(&[left, rule, right])?;
        self.action(seq, first)
    }

    /// Matches `rule left`, keeping only the token of `rule`.
    pub fn left(&mut self, rule: Rule, right: Rule) -> GrammarResult<Rule> {
        let right = self.suppress(right)?;
        let seq = self.sequence(&[rule, right])?;
        self.action(seq, first)
    }

    /// Matches `left rule`, keeping only the token of `rule`.
    pub fn right(&mut self, left: Rule, rule: Rule) -> GrammarResult<Rule> {
        let left = self.suppress(left)?;
        let seq = self.sequence(&[left, rule])?;
        self.action(seq, first)
    }

    /// Zero or more `item`s separated by `sep`, as a flat list of items.
    pub fn sep_by(&mut self, item: Rule, sep: Rule) -> GrammarResult<Rule> {
        let item = self.check(item)?;
        let sep = self.check(sep)?;
        Ok(self.push(Combinator::SepBy { item, sep, min: 0 }))
    }

    /// One or more `item`s separated by `sep`.
    pub fn sep_by1(&mut self, item: Rule, sep: Rule) -> GrammarResult<Rule> {
        let item = self.check(item)?;
        let sep = self.check(sep)?;
        Ok(self.push(Combinator::SepBy { item, sep, min: 1 }))
    }

    /// Matches every rule exactly once, in any order.
    ///
    /// The resulting list holds the tokens in the order the rules were
    /// given, regardless of the order in which they matched.
    pub fn permutation(&mut self, rules: &[Rule]) -> GrammarResult<Rule> {
        let items = self.check_all(rules)?;
        Ok(self.push(Combinator::Permutation { items, sep: None }))
    }

    /// Like [`permutation`](Self::permutation), with `sep` required between
    /// consecutive items and nowhere else.
    pub fn permutation_sep(&mut self, rules: &[Rule], sep: Rule) -> GrammarResult<Rule> {
        let items = self.check_all(rules)?;
        let sep = self.check(sep)?;
        Ok(self.push(Combinator::Permutation {
            items,
            sep: Some(sep),
        }))
    }

    /// Creates an unbound forward reference.
    pub fn indirect(&mut self) -> Rule {
        self.push(Combinator::Indirect(None))
    }

    /// Binds the forward reference `reference` to `target`.
    pub fn bind(&mut self, reference: Rule, target: Rule) -> GrammarResult<()> {
        let target = self.check(target)?;
        let reference = self.check(reference)?;
        match &mut self.nodes[reference.to_usize()] {
            Combinator::Indirect(slot @ None) => {
                *slot = Some(target);
                Ok(())
            }
            Combinator::Indirect(Some(_)) => Err(GrammarError::AlreadyBound(reference)),
            _ => Err(GrammarError::NotAReference(reference)),
        }
    }

    /// Freezes the builder, failing if any forward reference is unbound.
    pub fn build(self) -> GrammarResult<Grammar> {
        if let Some(ix) = self
            .nodes
            .iter()
            .position(|node| matches!(node, Combinator::Indirect(None)))
        {
            return Err(GrammarError::UnboundReference(Rule::from_usize(ix)));
        }
        log::debug!("grammar frozen with {} nodes", self.nodes.len());
        Ok(Grammar::from_nodes(self.nodes))
    }
}
