use crate::grammar::{Grammar, GrammarAnalysis, Symbol, TerminalSet};
use std::collections::BTreeMap;

/// Production index plus dot position.
///
/// Production `grammar.productions().len()` is the augmented `S' -> S`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ItemCore {
    pub production: usize,
    pub dot: usize,
}

/// LR(1) item set: every core carries the set of its lookaheads.
///
/// Two states are the same canonical LR(1) state iff their kernels map the
/// same cores to the same lookahead sets.
pub(crate) type ItemSet = BTreeMap<ItemCore, TerminalSet>;

/// Right-hand sides with the augmented production appended.
pub(crate) struct Productions<'g> {
    grammar: &'g Grammar,
    augmented: [Symbol; 1],
}

impl<'g> Productions<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            augmented: [Symbol::Nonterminal(grammar.start())],
        }
    }

    pub fn augmented(&self) -> usize {
        self.grammar.productions().len()
    }

    pub fn rhs(&self, production: usize) -> &[Symbol] {
        if production == self.augmented() {
            &self.augmented[..]
        } else {
            self.grammar.productions()[production].rhs()
        }
    }

    pub fn next_symbol(&self, core: ItemCore) -> Option<Symbol> {
        self.rhs(core.production).get(core.dot).copied()
    }

    pub fn is_complete(&self, core: ItemCore) -> bool {
        core.dot >= self.rhs(core.production).len()
    }
}

/// Close `items` in place: for `A -> α . B β, L` add `B -> . γ, FIRST(β L)`.
pub(crate) fn closure(
    items: &mut ItemSet,
    productions: &Productions<'_>,
    analysis: &GrammarAnalysis,
) {
    let mut worklist: Vec<ItemCore> = items.keys().copied().collect();
    while let Some(core) = worklist.pop() {
        let Some(Symbol::Nonterminal(target)) = productions.next_symbol(core) else {
            continue;
        };
        let beta = &productions.rhs(core.production)[core.dot + 1..];
        let mut lookahead = analysis.first_of_symbols(beta);
        if analysis.sequence_nullable(beta) {
            lookahead.union_with(&items[&core]);
        }

        for &production in productions.grammar.nonterminal(target).productions() {
            let added = ItemCore {
                production: production.index(),
                dot: 0,
            };
            let fresh = !items.contains_key(&added);
            let entry = items
                .entry(added)
                .or_insert_with(|| TerminalSet::with_capacity(analysis.terminal_count()));
            if entry.union_with(&lookahead) || fresh {
                worklist.push(added);
            }
        }
    }
}

/// Kernels of the successor states, keyed by the symbol after the dot.
pub(crate) fn transitions(
    items: &ItemSet,
    productions: &Productions<'_>,
) -> BTreeMap<Symbol, ItemSet> {
    let mut out: BTreeMap<Symbol, ItemSet> = BTreeMap::new();
    for (core, lookahead) in items {
        if let Some(symbol) = productions.next_symbol(*core) {
            let advanced = ItemCore {
                production: core.production,
                dot: core.dot + 1,
            };
            out.entry(symbol)
                .or_default()
                .entry(advanced)
                .or_default()
                .union_with(lookahead);
        }
    }
    out
}
