use crate::backend::lr::item::{ItemCore, ItemSet, Productions, closure, transitions};
use crate::error::GrammarError;
use crate::grammar::{
    Grammar, GrammarAnalysis, NonterminalId, ProductionId, Symbol, TerminalId, TerminalSet,
    validate::validate_with,
};
use hashbrown::HashMap;
use log::debug;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Index of an LR(1) state. State `0` is the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct StateId(pub(crate) u32);

impl StateId {
    pub const INITIAL: Self = Self(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// LR parsing action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Action {
    /// Shift the lookahead and go to the state
    Shift(StateId),
    /// Reduce by the production
    Reduce(ProductionId),
    /// Reduce `S' -> S` on end of input
    Accept,
}

impl Action {
    const fn order_key(self) -> (u8, u32) {
        match self {
            Self::Shift(s) => (0, s.0),
            Self::Reduce(p) => (1, p.0),
            Self::Accept => (2, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

/// A table cell holding more than one action.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Conflict {
    pub state: StateId,
    pub lookahead: TerminalId,
    pub actions: Vec<Action>,
    pub kind: ConflictKind,
}

/// Canonical LR(1) automaton with conflicts kept.
///
/// Every table cell is a list of actions, ordered shift first, then reduces
/// by production id, then accept. A cell with more than one action is a
/// conflict; the GLR stack machine forks on it.
///
/// Immutable and `Send + Sync`; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Automaton {
    grammar: Arc<Grammar>,
    terminal_count: usize,
    nonterminal_count: usize,
    state_count: usize,
    /// `state * terminal_count + terminal`
    actions: Vec<SmallVec<[Action; 1]>>,
    /// `state * nonterminal_count + nonterminal`
    gotos: Vec<Option<StateId>>,
    conflicts: Vec<Conflict>,
}

impl Automaton {
    /// Validate `grammar` and build its automaton.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] if the grammar has unreachable, unproductive
    /// or cyclic non-terminals.
    pub fn build(grammar: Arc<Grammar>) -> Result<Self, GrammarError> {
        let analysis = GrammarAnalysis::new(&grammar);
        validate_with(&grammar, &analysis)?;
        Ok(TableBuilder::new(&grammar, &analysis).build(Arc::clone(&grammar)))
    }

    #[must_use]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    #[must_use]
    pub const fn state_count(&self) -> usize {
        self.state_count
    }

    /// Every state, in construction order.
    pub fn states(&self) -> impl Iterator<Item = StateId> {
        (0..self.state_count).map(StateId::from_index)
    }

    /// Actions for `state` on `terminal`. Empty means error.
    #[must_use]
    pub fn actions(&self, state: StateId, terminal: TerminalId) -> &[Action] {
        if terminal.index() >= self.terminal_count {
            return &[];
        }
        &self.actions[state.index() * self.terminal_count + terminal.index()]
    }

    #[must_use]
    pub fn goto(&self, state: StateId, nonterminal: NonterminalId) -> Option<StateId> {
        self.gotos[state.index() * self.nonterminal_count + nonterminal.index()]
    }

    /// Terminals with at least one action in `state`.
    pub fn expected_terminals(&self, state: StateId) -> impl Iterator<Item = TerminalId> + '_ {
        let row = state.index() * self.terminal_count;
        self.actions[row..row + self.terminal_count]
            .iter()
            .enumerate()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(t, _)| TerminalId::from_index(t))
    }

    #[must_use]
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    #[must_use]
    pub fn is_conflicted(&self, state: StateId, lookahead: TerminalId) -> bool {
        self.actions(state, lookahead).len() > 1
    }

    #[must_use]
    pub const fn terminal_count(&self) -> usize {
        self.terminal_count
    }
}

struct TableBuilder<'g> {
    grammar: &'g Grammar,
    analysis: &'g GrammarAnalysis,
    productions: Productions<'g>,
    states: Vec<ItemSet>,
    index: HashMap<ItemSet, StateId, ahash::RandomState>,
    edges: Vec<Vec<(Symbol, StateId)>>,
}

impl<'g> TableBuilder<'g> {
    fn new(grammar: &'g Grammar, analysis: &'g GrammarAnalysis) -> Self {
        Self {
            grammar,
            analysis,
            productions: Productions::new(grammar),
            states: Vec::new(),
            index: HashMap::with_hasher(ahash::RandomState::new()),
            edges: Vec::new(),
        }
    }

    fn intern(&mut self, kernel: ItemSet, queue: &mut VecDeque<StateId>) -> StateId {
        if let Some(&id) = self.index.get(&kernel) {
            return id;
        }
        let id = StateId::from_index(self.states.len());
        let mut items = kernel.clone();
        closure(&mut items, &self.productions, self.analysis);
        self.index.insert(kernel, id);
        self.states.push(items);
        self.edges.push(Vec::new());
        queue.push_back(id);
        id
    }

    fn build(mut self, grammar: Arc<Grammar>) -> Automaton {
        let mut queue = VecDeque::new();
        let mut initial = ItemSet::new();
        initial.insert(
            ItemCore {
                production: self.productions.augmented(),
                dot: 0,
            },
            [TerminalId::EOF].into_iter().collect::<TerminalSet>(),
        );
        self.intern(initial, &mut queue);

        while let Some(state) = queue.pop_front() {
            let successors = transitions(&self.states[state.index()], &self.productions);
            for (symbol, kernel) in successors {
                let target = self.intern(kernel, &mut queue);
                self.edges[state.index()].push((symbol, target));
            }
        }

        let terminal_count = self.grammar.terminals().len();
        let nonterminal_count = self.grammar.nonterminals().len();
        let state_count = self.states.len();
        let mut actions: Vec<SmallVec<[Action; 1]>> =
            vec![SmallVec::new(); state_count * terminal_count];
        let mut gotos = vec![None; state_count * nonterminal_count];

        for (state, items) in self.states.iter().enumerate() {
            let row = state * terminal_count;
            for &(symbol, target) in &self.edges[state] {
                match symbol {
                    Symbol::Terminal(t) => actions[row + t.index()].push(Action::Shift(target)),
                    Symbol::Nonterminal(n) => {
                        gotos[state * nonterminal_count + n.index()] = Some(target);
                    }
                }
            }
            for (core, lookahead) in items {
                if !self.productions.is_complete(*core) {
                    continue;
                }
                let action = if core.production == self.productions.augmented() {
                    Action::Accept
                } else {
                    Action::Reduce(ProductionId::from_index(core.production))
                };
                for t in lookahead.iter() {
                    let cell = &mut actions[row + t.index()];
                    if !cell.contains(&action) {
                        cell.push(action);
                    }
                }
            }
        }

        let mut conflicts = Vec::new();
        for (cell_index, cell) in actions.iter_mut().enumerate() {
            cell.sort_by_key(|a| a.order_key());
            if cell.len() > 1 {
                let kind = if cell.iter().any(|a| matches!(a, Action::Shift(_))) {
                    ConflictKind::ShiftReduce
                } else {
                    ConflictKind::ReduceReduce
                };
                conflicts.push(Conflict {
                    state: StateId::from_index(cell_index / terminal_count),
                    lookahead: TerminalId::from_index(cell_index % terminal_count),
                    actions: cell.to_vec(),
                    kind,
                });
            }
        }

        debug!(
            "built LR(1) automaton: {} states, {} conflicted cells",
            state_count,
            conflicts.len()
        );

        Automaton {
            grammar,
            terminal_count,
            nonterminal_count,
            state_count,
            actions,
            gotos,
            conflicts,
        }
    }
}
