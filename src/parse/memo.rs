//! Packrat memo table
//!
//! Outcomes are keyed by the pair of rule and input offset, and live only
//! as long as the parse that produced them.

use std::collections::HashMap;

use crate::grammar::Rule;

use super::Step;

#[derive(Debug, Default)]
pub(crate) struct MemoTable {
    entries: HashMap<(Rule, usize), Option<Step>>,
    hits: usize,
}

impl MemoTable {
    pub(crate) fn with_capacity(cap: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(cap),
            hits: 0,
        }
    }

    /// Looks up a previous outcome. The outer `Option` is the cache hit, the
    /// inner one is the outcome itself.
    #[inline]
    pub(crate) fn get(&mut self, rule: Rule, pos: usize) -> Option<Option<Step>> {
        let hit = self.entries.get(&(rule, pos)).copied();
        if hit.is_some() {
            self.hits += 1;
        }
        hit
    }

    #[inline]
    pub(crate) fn insert(&mut self, rule: Rule, pos: usize, outcome: Option<Step>) {
        self.entries.insert((rule, pos), outcome);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits
    }
}
