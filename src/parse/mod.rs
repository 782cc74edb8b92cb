//! Packrat evaluation of grammars over byte buffers
//!
//! This module provides the single evaluation entry point of the crate:
//! a frozen [`Grammar`] is matched against an input buffer starting at
//! offset `0`, producing either a [`Parsed`] value or a failure.
//!
//! # Model
//!
//! * The input is an immutable byte slice; the engine never reads past its
//!   end and never modifies it.
//! * Evaluation is recursive descent with full backtracking. A failing
//!   sequence discards every token its children produced, and leaves the
//!   offset where it was before the sequence started.
//! * Every `(rule, offset)` outcome of a composite rule is memoized for the
//!   duration of a single parse, so a sub-grammar reached through several
//!   alternatives at the same offset is evaluated once. Terminal rules are
//!   simply rematched.
//! * All tokens are allocated in one [`Arena`], owned by the returned
//!   [`Parsed`] value. Dropping that value releases the whole tree.
//!
//! # Limits
//!
//! A [`ParseConfig`] bounds the input length and the nesting depth of
//! evaluation. Exceeding either aborts the parse with a dedicated
//! [`ParseError`] rather than with [`ParseError::NoMatch`]. Evaluation
//! recurses on the native stack, and the default depth limit fits a 2 MiB
//! thread stack in unoptimized builds.

pub mod error;
mod memo;

use log::{debug, trace, warn};

use crate::grammar::{Combinator, Grammar, Rule};
use crate::tree::{Arena, Children, Node, Token, TokenRef};
use error::{ParseError, ParseResult};
use memo::MemoTable;

/// Default maximum input length: 16 MiB
pub const DEFAULT_MAX_INPUT_LEN: usize = 16 * 1024 * 1024;

/// Default maximum number of nested rule evaluations
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Resource limits applied to a single parse.
///
/// A limit of `0` disables the corresponding check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Maximum accepted input length in bytes
    pub max_input_len: usize,
    /// Maximum number of nested rule evaluations
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ParseConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_input_len(mut self, len: usize) -> Self {
        self.max_input_len = len;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Outcome of evaluating one rule at one offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) end: usize,
    pub(crate) token: Option<TokenRef>,
}

/// Successful parse: the tree, its arena, and the number of bytes consumed.
#[derive(Debug)]
pub struct Parsed {
    arena: Arena,
    root: Option<TokenRef>,
    consumed: usize,
}

impl Parsed {
    /// Number of input bytes consumed by the match
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Root of the parse tree, or `None` if the matched rule was suppressed.
    #[must_use]
    pub fn root(&self) -> Option<Node<'_>> {
        self.root.map(|r| self.arena.node(r))
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }
}

struct Matcher<'a> {
    grammar: &'a Grammar,
    input: &'a [u8],
    arena: Arena,
    memo: MemoTable,
    depth: usize,
    max_depth: usize,
    aborted: bool,
}

impl<'a> Matcher<'a> {
    fn new(grammar: &'a Grammar, input: &'a [u8], max_depth: usize) -> Self {
        let estimate = (input.len() / 4).clamp(64, 1 << 16);
        Self {
            grammar,
            input,
            arena: Arena::with_capacity(estimate),
            memo: MemoTable::with_capacity(estimate),
            depth: 0,
            max_depth,
            aborted: false,
        }
    }

    #[inline]
    fn leaf(&mut self, end: usize, token: Token) -> Step {
        Step {
            end,
            token: Some(self.arena.alloc(token)),
        }
    }

    fn token_or_none(&mut self, token: Option<TokenRef>) -> TokenRef {
        match token {
            Some(r) => r,
            None => self.arena.alloc(Token::None),
        }
    }

    fn eval(&mut self, rule: Rule, pos: usize) -> Option<Step> {
        if self.aborted {
            return None;
        }
        let grammar = self.grammar;
        let node = match grammar.node(rule) {
            Some(node) => node,
            None => {
                warn!("{} is out of range for the grammar being evaluated", rule);
                return None;
            }
        };
        // Terminals are rematched, never memoized or depth-counted.
        if node.is_terminal() {
            return self.terminal(node, pos);
        }
        if let Some(outcome) = self.memo.get(rule, pos) {
            return outcome;
        }
        if self.max_depth > 0 && self.depth >= self.max_depth {
            self.aborted = true;
            return None;
        }
        // Seeded with failure: re-entering a rule at the same offset without
        // consuming input fails.
        self.memo.insert(rule, pos, None);
        self.depth += 1;
        let outcome = self.eval_uncached(node, pos);
        self.depth -= 1;
        if !self.aborted {
            self.memo.insert(rule, pos, outcome);
        }
        outcome
    }

    fn terminal(&mut self, node: &Combinator, pos: usize) -> Option<Step> {
        let input = self.input;
        match node {
            Combinator::Literal(lit) if input[pos..].starts_with(lit) => {
                Some(self.leaf(pos + lit.len(), Token::Bytes(lit.clone())))
            }
            Combinator::Set(set) => match input.get(pos) {
                Some(&b) if set.contains(b) => Some(self.leaf(pos + 1, Token::Uint(b as u64))),
                _ => None,
            },
            Combinator::Rest => Some(self.leaf(input.len(), Token::Bytes(input[pos..].to_vec()))),
            _ => None,
        }
    }

    // One frame per nesting level: keep the composite cases out of line.
    fn eval_uncached(&mut self, node: &'a Combinator, pos: usize) -> Option<Step> {
        match node {
            Combinator::Literal(_) | Combinator::Set(_) | Combinator::Rest => {
                self.terminal(node, pos)
            }
            Combinator::Sequence(rules) => self.sequence(rules, pos),
            Combinator::Choice(rules) => {
                for &r in rules {
                    if let Some(step) = self.eval(r, pos) {
                        return Some(step);
                    }
                }
                None
            }
            Combinator::Repeat { inner, min } => self.repeat(*inner, *min, pos),
            Combinator::Optional(inner) => match self.eval(*inner, pos) {
                Some(step) => Some(step),
                None => Some(self.leaf(pos, Token::None)),
            },
            Combinator::Suppress(inner) => self.eval(*inner, pos).map(|step| Step {
                end: step.end,
                token: None,
            }),
            Combinator::Action(inner, action) => {
                let step = self.eval(*inner, pos)?;
                let token = self.token_or_none(step.token);
                let token = action(&mut self.arena, token);
                Some(Step {
                    end: step.end,
                    token: Some(token),
                })
            }
            Combinator::Tag(inner, tag) => {
                let step = self.eval(*inner, pos)?;
                let token = self.token_or_none(step.token);
                Some(self.leaf(step.end, Token::Tagged(*tag, token)))
            }
            Combinator::End(inner) => {
                let len = self.input.len();
                self.eval(*inner, pos).filter(|step| step.end == len)
            }
            Combinator::Indirect(Some(target)) => self.eval(*target, pos),
            Combinator::Indirect(None) => None,
            Combinator::SepBy { item, sep, min } => self.sep_by(*item, *sep, *min, pos),
            Combinator::Permutation { items, sep } => self.permutation(items, *sep, pos),
        }
    }

    #[inline(never)]
    fn sequence(&mut self, rules: &[Rule], pos: usize) -> Option<Step> {
        let mut cur = pos;
        let mut children = Children::with_capacity(rules.len());
        for &r in rules {
            let step = self.eval(r, cur)?;
            children.extend(step.token);
            cur = step.end;
        }
        Some(self.leaf(cur, Token::Seq(children)))
    }

    #[inline(never)]
    fn repeat(&mut self, inner: Rule, min: usize, pos: usize) -> Option<Step> {
        let mut cur = pos;
        let mut count = 0;
        let mut children = Children::new();
        while let Some(step) = self.eval(inner, cur) {
            children.extend(step.token);
            count += 1;
            // a zero-width match counts once
            if step.end == cur {
                break;
            }
            cur = step.end;
        }
        if count < min {
            None
        } else {
            Some(self.leaf(cur, Token::Seq(children)))
        }
    }

    #[inline(never)]
    fn sep_by(&mut self, item: Rule, sep: Rule, min: usize, pos: usize) -> Option<Step> {
        let mut children = Children::new();
        let mut cur = match self.eval(item, pos) {
            Some(step) => {
                children.extend(step.token);
                step.end
            }
            None if min == 0 => return Some(self.leaf(pos, Token::Seq(children))),
            None => return None,
        };
        while let Some(sep_step) = self.eval(sep, cur) {
            let step = match self.eval(item, sep_step.end) {
                Some(step) if step.end != cur => step,
                _ => break,
            };
            children.extend(step.token);
            cur = step.end;
        }
        Some(self.leaf(cur, Token::Seq(children)))
    }

    #[inline(never)]
    fn permutation(&mut self, items: &[Rule], sep: Option<Rule>, pos: usize) -> Option<Step> {
        let mut used = vec![false; items.len()];
        let mut slots = vec![None; items.len()];
        let end = self.permute(items, sep, &mut used, &mut slots, pos, 0)?;
        let children: Children = slots.into_iter().flatten().collect();
        Some(self.leaf(end, Token::Seq(children)))
    }

    /// Places the remaining unused items starting at `pos`, backtracking over
    /// every order until one consumes all of them.
    fn permute(
        &mut self,
        items: &[Rule],
        sep: Option<Rule>,
        used: &mut [bool],
        slots: &mut [Option<TokenRef>],
        pos: usize,
        placed: usize,
    ) -> Option<usize> {
        if placed == items.len() {
            return Some(pos);
        }
        let start = match sep {
            Some(sep) if placed > 0 => self.eval(sep, pos)?.end,
            _ => pos,
        };
        for (ix, &item) in items.iter().enumerate() {
            if used[ix] {
                continue;
            }
            if let Some(step) = self.eval(item, start) {
                used[ix] = true;
                slots[ix] = step.token;
                if let Some(end) = self.permute(items, sep, used, slots, step.end, placed + 1) {
                    return Some(end);
                }
                used[ix] = false;
                slots[ix] = None;
            }
        }
        None
    }
}

impl Grammar {
    /// Matches `rule` against a prefix of `input` with the default limits.
    ///
    /// Returns `None` when the input does not match or a limit is exceeded.
    #[must_use]
    pub fn parse(&self, rule: Rule, input: &[u8]) -> Option<Parsed> {
        self.try_parse(rule, input).ok()
    }

    pub fn try_parse(&self, rule: Rule, input: &[u8]) -> ParseResult<Parsed> {
        self.try_parse_with(rule, input, &ParseConfig::default())
    }

    /// Matches `rule` against a prefix of `input`, with explicit limits.
    pub fn try_parse_with(
        &self,
        rule: Rule,
        input: &[u8],
        config: &ParseConfig,
    ) -> ParseResult<Parsed> {
        if config.max_input_len > 0 && input.len() > config.max_input_len {
            warn!(
                "refusing {}-byte input (limit {})",
                input.len(),
                config.max_input_len
            );
            return Err(ParseError::InputTooLarge {
                len: input.len(),
                limit: config.max_input_len,
            });
        }

        debug!("parsing {} bytes with {}", input.len(), rule);
        let mut matcher = Matcher::new(self, input, config.max_depth);
        let outcome = matcher.eval(rule, 0);
        trace!(
            "memo: {} entries, {} hits, {} tokens allocated",
            matcher.memo.len(),
            matcher.memo.hits(),
            matcher.arena.len()
        );

        if matcher.aborted {
            warn!("parse aborted at nesting limit {}", config.max_depth);
            return Err(ParseError::DepthExceeded {
                limit: config.max_depth,
            });
        }
        match outcome {
            Some(step) => {
                debug!("{} matched {} of {} bytes", rule, step.end, input.len());
                Ok(Parsed {
                    arena: matcher.arena,
                    root: step.token,
                    consumed: step.end,
                })
            }
            None => {
                debug!("{} did not match", rule);
                Err(ParseError::NoMatch)
            }
        }
    }

    /// Like [`try_parse`](Self::try_parse), but fails with
    /// [`ParseError::Incomplete`] unless the whole buffer is consumed.
    pub fn parse_complete(&self, rule: Rule, input: &[u8]) -> ParseResult<Parsed> {
        self.parse_complete_with(rule, input, &ParseConfig::default())
    }

    pub fn parse_complete_with(
        &self,
        rule: Rule,
        input: &[u8],
        config: &ParseConfig,
    ) -> ParseResult<Parsed> {
        let parsed = self.try_parse_with(rule, input, config)?;
        if parsed.consumed == input.len() {
            Ok(parsed)
        } else {
            Err(ParseError::Incomplete {
                consumed: parsed.consumed,
                len: input.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use crate::tree::{flatten, Tag};

    fn render(grammar: &Grammar, rule: Rule, input: &[u8]) -> Option<String> {
        grammar
            .parse(rule, input)
            .map(|p| p.root().map_or_else(|| "-".to_string(), |n| n.to_string()))
    }

    #[test]
    fn sequence_rolls_back() {
        let mut b = GrammarBuilder::new();
        let a = b.ch(b'a');
        let bb = b.ch(b'b');
        let ab = b.sequence(&[a, bb]).unwrap();
        let ac = {
            let c = b.ch(b'c');
            b.sequence(&[a, c]).unwrap()
        };
        let either = b.choice(&[ab, ac]).unwrap();
        let g = b.build().unwrap();

        assert!(g.parse(ab, b"ac").is_none());
        let parsed = g.parse(either, b"ac").unwrap();
        assert_eq!(parsed.consumed(), 2);
        assert_eq!(parsed.root().unwrap().to_string(), "(u0x61 u0x63)");
    }

    #[test]
    fn choice_is_ordered_not_longest() {
        let mut b = GrammarBuilder::new();
        let short = b.literal(b"ab").unwrap();
        let long = b.literal(b"abc").unwrap();
        let first_short = b.choice(&[short, long]).unwrap();
        let first_long = b.choice(&[long, short]).unwrap();
        let g = b.build().unwrap();
        assert_eq!(g.parse(first_short, b"abc").unwrap().consumed(), 2);
        assert_eq!(g.parse(first_long, b"abc").unwrap().consumed(), 3);
    }

    #[test]
    fn repetition_bounds() {
        let mut b = GrammarBuilder::new();
        let digit = b.range(b'0', b'9').unwrap();
        let many = b.many(digit).unwrap();
        let many1 = b.many1(digit).unwrap();
        let g = b.build().unwrap();

        assert_eq!(render(&g, many, b"").as_deref(), Some("()"));
        assert!(g.parse(many1, b"x").is_none());
        assert_eq!(render(&g, many1, b"12x").as_deref(), Some("(u0x31 u0x32)"));
    }

    #[test]
    fn zero_width_repetition_terminates() {
        let mut b = GrammarBuilder::new();
        let a = b.ch(b'a');
        let opt = b.optional(a).unwrap();
        let many = b.many(opt).unwrap();
        let nested = b.many(many).unwrap();
        let g = b.build().unwrap();

        let parsed = g.parse(many, b"aab").unwrap();
        assert_eq!(parsed.consumed(), 2);
        assert_eq!(parsed.root().unwrap().to_string(), "(u0x61 u0x61 NULL)");
        assert_eq!(g.parse(nested, b"bbb").unwrap().consumed(), 0);
    }

    #[test]
    fn optional_suppress_action_tag() {
        let mut b = GrammarBuilder::new();
        let minus = b.ch(b'-');
        let opt_minus = b.optional(minus).unwrap();
        let digit = b.range(b'0', b'9').unwrap();
        let digits = b.many1(digit).unwrap();
        let semi = b.ch(b';');
        let hidden = b.suppress(semi).unwrap();
        let seq = b.sequence(&[opt_minus, digits, hidden]).unwrap();
        let flat = b.action(seq, flatten).unwrap();
        let tagged = b.tag(flat, Tag(9)).unwrap();
        let g = b.build().unwrap();

        assert_eq!(
            render(&g, seq, b"12;").as_deref(),
            Some("(NULL (u0x31 u0x32))")
        );
        assert_eq!(render(&g, tagged, b"-7;").as_deref(), Some("#9:<2d.37>"));
        let suppressed = g.parse(hidden, b";").unwrap();
        assert!(suppressed.root().is_none());
        assert_eq!(suppressed.consumed(), 1);
    }

    #[test]
    fn end_requires_full_consumption() {
        let mut b = GrammarBuilder::new();
        let lit = b.literal(b"200").unwrap();
        let end = b.end(lit).unwrap();
        let g = b.build().unwrap();

        assert!(g.parse(end, b"200").is_some());
        assert!(g.parse(end, b"2000").is_none());
        assert!(g.parse(lit, b"2000").is_some());
        assert_eq!(
            g.parse_complete(lit, b"2000").err(),
            Some(ParseError::Incomplete {
                consumed: 3,
                len: 4
            })
        );
        assert!(g.parse_complete(lit, b"200").is_ok());
    }

    #[test]
    fn recursive_reference() {
        // nested = "(" nested* ")"
        let mut b = GrammarBuilder::new();
        let nested = b.indirect();
        let open = b.ch(b'(');
        let close = b.ch(b')');
        let inner = b.many(nested).unwrap();
        let body = b.middle(open, inner, close).unwrap();
        b.bind(nested, body).unwrap();
        let whole = b.end(nested).unwrap();
        let g = b.build().unwrap();

        assert!(g.parse(whole, b"(()(()))").is_some());
        assert!(g.parse(whole, b"(()").is_none());
        assert_eq!(render(&g, whole, b"(())").as_deref(), Some("(())"));
    }

    #[test]
    fn left_recursion_fails_instead_of_looping() {
        let mut b = GrammarBuilder::new();
        let expr = b.indirect();
        let plus = b.ch(b'+');
        let one = b.ch(b'1');
        let sum = b.sequence(&[expr, plus, one]).unwrap();
        let alt = b.choice(&[sum, one]).unwrap();
        b.bind(expr, alt).unwrap();
        let g = b.build().unwrap();

        assert_eq!(g.parse(expr, b"1+1").unwrap().consumed(), 1);
    }

    #[test]
    fn shared_alternatives_stay_linear() {
        // s = a "x" / a "y" / a ; a = "(" s ")" / "z"
        let mut b = GrammarBuilder::new();
        let s = b.indirect();
        let open = b.ch(b'(');
        let close = b.ch(b')');
        let z = b.ch(b'z');
        let paren = b.sequence(&[open, s, close]).unwrap();
        let a = b.choice(&[paren, z]).unwrap();
        let x = b.ch(b'x');
        let y = b.ch(b'y');
        let ax = b.sequence(&[a, x]).unwrap();
        let ay = b.sequence(&[a, y]).unwrap();
        let alt = b.choice(&[ax, ay, a]).unwrap();
        b.bind(s, alt).unwrap();
        let whole = b.end(s).unwrap();
        let g = b.build().unwrap();

        let depth = 200;
        let mut input = vec![b'('; depth];
        input.push(b'z');
        input.extend(std::iter::repeat(b')').take(depth));
        let parsed = g.try_parse(whole, &input).unwrap();
        assert_eq!(parsed.consumed(), input.len());
        // linear in the input: a handful of tokens per byte
        assert!(parsed.arena().len() < input.len() * 16);
    }

    #[test]
    fn sep_by_drops_separators() {
        let mut b = GrammarBuilder::new();
        let digit = b.range(b'0', b'9').unwrap();
        let comma = b.ch(b',');
        let list = b.sep_by(digit, comma).unwrap();
        let list1 = b.sep_by1(digit, comma).unwrap();
        let g = b.build().unwrap();

        assert_eq!(render(&g, list, b"").as_deref(), Some("()"));
        assert!(g.parse(list1, b"").is_none());
        assert_eq!(render(&g, list, b"1,2,3").as_deref(), Some("(u0x31 u0x32 u0x33)"));
        // trailing separator is left unconsumed
        assert_eq!(g.parse(list, b"1,2,").unwrap().consumed(), 3);
    }

    #[test]
    fn permutation_any_order() {
        let mut b = GrammarBuilder::new();
        let a = b.ch(b'a');
        let bb = b.ch(b'b');
        let c = b.ch(b'c');
        let comma = b.ch(b',');
        let perm = b.permutation(&[a, bb, c]).unwrap();
        let perm_sep = b.permutation_sep(&[a, bb, c], comma).unwrap();
        let whole_sep = b.end(perm_sep).unwrap();
        let g = b.build().unwrap();

        assert_eq!(
            render(&g, perm, b"cab").as_deref(),
            Some("(u0x61 u0x62 u0x63)")
        );
        assert!(g.parse(perm, b"cca").is_none());
        assert!(g.parse(whole_sep, b"b,c,a").is_some());
        assert!(g.parse(whole_sep, b"b,c,a,").is_none());
        assert!(g.parse(whole_sep, b"bc,a").is_none());
    }

    #[test]
    fn limits_abort_the_parse() {
        let mut b = GrammarBuilder::new();
        let nested = b.indirect();
        let open = b.ch(b'[');
        let close = b.ch(b']');
        let inner = b.optional(nested).unwrap();
        let body = b.sequence(&[open, inner, close]).unwrap();
        b.bind(nested, body).unwrap();
        let g = b.build().unwrap();

        let input: Vec<u8> = std::iter::repeat(b'[')
            .take(100)
            .chain(std::iter::repeat(b']').take(100))
            .collect();
        let tight = ParseConfig::new().with_max_depth(50);
        assert_eq!(
            g.try_parse_with(nested, &input, &tight).err(),
            Some(ParseError::DepthExceeded { limit: 50 })
        );
        assert!(g.try_parse(nested, &input).is_ok());

        let small = ParseConfig::new().with_max_input_len(10);
        assert_eq!(
            g.try_parse_with(nested, &input, &small).err(),
            Some(ParseError::InputTooLarge {
                len: 200,
                limit: 10
            })
        );
    }

    #[test]
    fn rest_is_one_token() {
        let mut b = GrammarBuilder::new();
        let colon = b.ch(b':');
        let rest = b.rest();
        let line = b.sequence(&[colon, rest]).unwrap();
        let g = b.build().unwrap();

        let mut input = vec![b':'];
        input.resize(1 << 16, b'x');
        let parsed = g.try_parse(line, &input).unwrap();
        assert_eq!(parsed.consumed(), input.len());
        assert_eq!(parsed.root().unwrap().child(1).unwrap().bytes(), Some(&input[1..]));
        assert_eq!(parsed.arena().len(), 3);

        let empty = g.try_parse(line, b":").unwrap();
        assert_eq!(empty.root().unwrap().to_string(), "(u0x3a <>)");
    }

    #[test]
    fn terminals_do_not_count_towards_depth() {
        let mut b = GrammarBuilder::new();
        let x = b.ch(b'x');
        let xs = b.many(x).unwrap();
        let g = b.build().unwrap();

        let one = ParseConfig::new().with_max_depth(1);
        let parsed = g.try_parse_with(xs, b"xxxx", &one).unwrap();
        assert_eq!(parsed.consumed(), 4);
        assert_eq!(g.try_parse_with(x, b"x", &one).unwrap().consumed(), 1);
    }

    #[test]
    fn grammar_shared_across_threads() {
        let mut b = GrammarBuilder::new();
        let digit = b.range(b'0', b'9').unwrap();
        let digits = b.many1(digit).unwrap();
        let flat = b.action(digits, flatten).unwrap();
        let g = std::sync::Arc::new(b.build().unwrap());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let g = std::sync::Arc::clone(&g);
                std::thread::spawn(move || {
                    let input = i.to_string().repeat(8);
                    let parsed = g.parse(flat, input.as_bytes()).unwrap();
                    parsed.root().unwrap().bytes().unwrap().to_vec()
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), i.to_string().repeat(8).into_bytes());
        }
    }
}
