//! # Grammar Analysis
//!
//! Fixed-point computations over a [`Grammar`] used by validation and by the
//! LR(1) closure:
//!
//! - nullable non-terminals
//! - FIRST sets, and FIRST of a symbol sequence followed by a lookahead
//! - reachability from the start symbol
//! - productivity (derives at least one terminal string)

use crate::grammar::{Grammar, NonterminalId, Symbol, TerminalId};
use std::fmt;

/// Dense set of terminals, one bit per [`TerminalId`].
#[derive(Clone, Default)]
pub struct TerminalSet {
    words: Vec<u64>,
}

impl TerminalSet {
    fn significant(&self) -> &[u64] {
        let len = self.words.iter().rposition(|w| *w != 0).map_or(0, |i| i + 1);
        &self.words[..len]
    }
}

impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for TerminalSet {}

impl std::hash::Hash for TerminalSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl PartialOrd for TerminalSet {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TerminalSet {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.significant().cmp(other.significant())
    }
}

impl TerminalSet {
    #[must_use]
    pub fn with_capacity(terminals: usize) -> Self {
        Self {
            words: vec![0; terminals.div_ceil(64)],
        }
    }

    /// Insert a terminal, returning `true` if it was not already present.
    pub fn insert(&mut self, terminal: TerminalId) -> bool {
        let (word, bit) = (terminal.index() / 64, terminal.index() % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let fresh = self.words[word] & mask == 0;
        self.words[word] |= mask;
        fresh
    }

    #[must_use]
    pub fn contains(&self, terminal: TerminalId) -> bool {
        let (word, bit) = (terminal.index() / 64, terminal.index() % 64);
        self.words.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Union `other` into `self`, returning `true` if `self` grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (mine, theirs) in self.words.iter_mut().zip(&other.words) {
            let merged = *mine | *theirs;
            changed |= merged != *mine;
            *mine = merged;
        }
        changed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = TerminalId> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            (0..64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| TerminalId::from_index(i * 64 + bit))
        })
    }
}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(TerminalId::index)).finish()
    }
}

impl FromIterator<TerminalId> for TerminalSet {
    fn from_iter<I: IntoIterator<Item = TerminalId>>(iter: I) -> Self {
        let mut set = Self::default();
        for terminal in iter {
            set.insert(terminal);
        }
        set
    }
}

/// Precomputed nullable/FIRST/reachable/productive facts for one grammar.
#[derive(Debug, Clone)]
pub struct GrammarAnalysis {
    nullable: Vec<bool>,
    first: Vec<TerminalSet>,
    reachable: Vec<bool>,
    productive: Vec<bool>,
    terminal_count: usize,
}

impl GrammarAnalysis {
    #[must_use]
    pub fn new(grammar: &Grammar) -> Self {
        let terminal_count = grammar.terminals().len();
        let nullable = compute_nullable(grammar);
        let first = compute_first(grammar, &nullable, terminal_count);
        let reachable = compute_reachable(grammar);
        let productive = compute_productive(grammar);
        Self {
            nullable,
            first,
            reachable,
            productive,
            terminal_count,
        }
    }

    #[must_use]
    pub fn is_nullable(&self, nonterminal: NonterminalId) -> bool {
        self.nullable[nonterminal.index()]
    }

    #[must_use]
    pub fn symbol_nullable(&self, symbol: Symbol) -> bool {
        match symbol {
            Symbol::Terminal(_) => false,
            Symbol::Nonterminal(n) => self.is_nullable(n),
        }
    }

    #[must_use]
    pub fn first(&self, nonterminal: NonterminalId) -> &TerminalSet {
        &self.first[nonterminal.index()]
    }

    #[must_use]
    pub fn is_reachable(&self, nonterminal: NonterminalId) -> bool {
        self.reachable[nonterminal.index()]
    }

    #[must_use]
    pub fn is_productive(&self, nonterminal: NonterminalId) -> bool {
        self.productive[nonterminal.index()]
    }

    /// FIRST(`symbols`), ignoring whether the whole sequence is nullable.
    #[must_use]
    pub fn first_of_symbols(&self, symbols: &[Symbol]) -> TerminalSet {
        let mut out = TerminalSet::with_capacity(self.terminal_count);
        for symbol in symbols {
            match *symbol {
                Symbol::Terminal(t) => {
                    out.insert(t);
                    break;
                }
                Symbol::Nonterminal(n) => {
                    out.union_with(&self.first[n.index()]);
                    if !self.nullable[n.index()] {
                        break;
                    }
                }
            }
        }
        out
    }

    /// FIRST(`symbols` `lookahead`).
    #[must_use]
    pub fn first_of_sequence(&self, symbols: &[Symbol], lookahead: TerminalId) -> TerminalSet {
        let mut out = self.first_of_symbols(symbols);
        if self.sequence_nullable(symbols) {
            out.insert(lookahead);
        }
        out
    }

    #[must_use]
    pub const fn terminal_count(&self) -> usize {
        self.terminal_count
    }

    /// Whether every symbol in `symbols` can derive ε.
    #[must_use]
    pub fn sequence_nullable(&self, symbols: &[Symbol]) -> bool {
        symbols.iter().all(|s| self.symbol_nullable(*s))
    }
}

fn compute_nullable(grammar: &Grammar) -> Vec<bool> {
    let mut nullable = vec![false; grammar.nonterminals().len()];
    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions() {
            if nullable[production.lhs.index()] {
                continue;
            }
            let all = production.rhs.iter().all(|sym| match sym {
                Symbol::Terminal(_) => false,
                Symbol::Nonterminal(n) => nullable[n.index()],
            });
            if all {
                nullable[production.lhs.index()] = true;
                changed = true;
            }
        }
    }
    nullable
}

fn compute_first(grammar: &Grammar, nullable: &[bool], terminals: usize) -> Vec<TerminalSet> {
    let mut first = vec![TerminalSet::with_capacity(terminals); grammar.nonterminals().len()];
    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions() {
            let lhs = production.lhs.index();
            for symbol in &production.rhs {
                match *symbol {
                    Symbol::Terminal(t) => {
                        changed |= first[lhs].insert(t);
                        break;
                    }
                    Symbol::Nonterminal(n) => {
                        if n.index() != lhs {
                            let other = first[n.index()].clone();
                            changed |= first[lhs].union_with(&other);
                        }
                        if !nullable[n.index()] {
                            break;
                        }
                    }
                }
            }
        }
    }
    first
}

fn compute_reachable(grammar: &Grammar) -> Vec<bool> {
    let mut reachable = vec![false; grammar.nonterminals().len()];
    let mut stack = vec![grammar.start()];
    reachable[grammar.start().index()] = true;
    while let Some(nt) = stack.pop() {
        for production in grammar.productions_for(nt) {
            for n in production.rhs.iter().filter_map(|s| s.as_nonterminal()) {
                if !reachable[n.index()] {
                    reachable[n.index()] = true;
                    stack.push(n);
                }
            }
        }
    }
    reachable
}

fn compute_productive(grammar: &Grammar) -> Vec<bool> {
    let mut productive = vec![false; grammar.nonterminals().len()];
    let mut changed = true;
    while changed {
        changed = false;
        for production in grammar.productions() {
            if productive[production.lhs.index()] {
                continue;
            }
            let all = production.rhs.iter().all(|sym| match sym {
                Symbol::Terminal(_) => true,
                Symbol::Nonterminal(n) => productive[n.index()],
            });
            if all {
                productive[production.lhs.index()] = true;
                changed = true;
            }
        }
    }
    productive
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, Matcher};

    fn t(grammar: &Grammar, name: &str) -> TerminalId {
        grammar.terminal_by_name(name).unwrap()
    }

    #[test]
    fn test_terminal_set_ops() {
        let mut a = TerminalSet::with_capacity(4);
        assert!(a.is_empty());
        assert!(a.insert(TerminalId(1)));
        assert!(!a.insert(TerminalId(1)));
        assert!(a.insert(TerminalId(70)));
        assert!(a.contains(TerminalId(70)));
        assert!(!a.contains(TerminalId(2)));

        let b: TerminalSet = [TerminalId(2), TerminalId(1)].into_iter().collect();
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));

        let mut wide = TerminalSet::with_capacity(256);
        wide.insert(TerminalId(2));
        assert_eq!(wide, [TerminalId(2)].into_iter().collect());
        assert_eq!(a.len(), 3);
        assert_eq!(
            a.iter().map(TerminalId::index).collect::<Vec<_>>(),
            vec![1, 2, 70]
        );
    }

    #[test]
    fn test_nullable_and_first() {
        let grammar = GrammarBuilder::new()
            .literal("a")
            .literal("b")
            .rule("S", ["A", "B", "b"])
            .rule("A", ["a"])
            .rule("A", [])
            .rule("B", ["A"])
            .start("S")
            .build()
            .unwrap();
        let analysis = GrammarAnalysis::new(&grammar);

        let s = grammar.nonterminal_by_name("S").unwrap();
        let a = grammar.nonterminal_by_name("A").unwrap();
        let b = grammar.nonterminal_by_name("B").unwrap();
        assert!(analysis.is_nullable(a));
        assert!(analysis.is_nullable(b));
        assert!(!analysis.is_nullable(s));

        let first_s = analysis.first(s);
        assert!(first_s.contains(t(&grammar, "a")));
        assert!(first_s.contains(t(&grammar, "b")));
        assert_eq!(first_s.len(), 2);
    }

    #[test]
    fn test_first_of_sequence_falls_through_to_lookahead() {
        let grammar = GrammarBuilder::new()
            .literal("a")
            .literal("c")
            .rule("S", ["A", "A"])
            .rule("A", ["a"])
            .rule("A", [])
            .start("S")
            .build()
            .unwrap();
        let analysis = GrammarAnalysis::new(&grammar);
        let a = Symbol::Nonterminal(grammar.nonterminal_by_name("A").unwrap());

        let set = analysis.first_of_sequence(&[a, a], t(&grammar, "c"));
        assert!(set.contains(t(&grammar, "a")));
        assert!(set.contains(t(&grammar, "c")));

        let blocked = analysis.first_of_sequence(
            &[Symbol::Terminal(t(&grammar, "a"))],
            t(&grammar, "c"),
        );
        assert!(!blocked.contains(t(&grammar, "c")));
    }

    #[test]
    fn test_reachable_and_productive() {
        let grammar = GrammarBuilder::new()
            .terminal("x", Matcher::pattern("x"))
            .rule("S", ["x"])
            .rule("Orphan", ["x"])
            .rule("Loop", ["Loop", "x"])
            .start("S")
            .build()
            .unwrap();
        let analysis = GrammarAnalysis::new(&grammar);

        assert!(analysis.is_reachable(grammar.nonterminal_by_name("S").unwrap()));
        assert!(!analysis.is_reachable(grammar.nonterminal_by_name("Orphan").unwrap()));
        assert!(!analysis.is_productive(grammar.nonterminal_by_name("Loop").unwrap()));
        assert!(analysis.is_productive(grammar.nonterminal_by_name("Orphan").unwrap()));
    }
}
