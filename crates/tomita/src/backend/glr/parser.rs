//! The GLR stack machine
//!
//! Tomita's algorithm with Farshi's correction, driven one input position at
//! a time over a graph-structured stack.

use crate::backend::glr::disambiguation::prune_actions;
use crate::backend::glr::forest::{Derivation, Forest, ForestBuilder, NodeId};
use crate::backend::glr::stack::{EdgeRef, Gss};
use crate::backend::glr::state::{ParseMetrics, Phase};
use crate::backend::glr::GlrConfig;
use crate::backend::lr::{Action, Automaton, StateId};
use crate::error::ParseError;
use crate::grammar::{ProductionId, TerminalId};
use crate::lexer::Token;
use crate::syntax::{Span, TextRange, TextSize};
use hashbrown::HashMap;
use log::{debug, trace};
use smallvec::SmallVec;
use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;

/// A pending reduction: from `node`, by `production`, optionally restricted
/// to paths through a newly added edge.
#[derive(Debug, Clone, Copy)]
struct Reduction {
    node: usize,
    production: ProductionId,
    through: Option<EdgeRef>,
}

/// Incremental GLR parse over a token iterator.
///
/// Drive it with [`step`](Self::step), which consumes exactly one token (or
/// end of input), or with [`run`](Self::run). The cancellation flag in
/// [`GlrConfig`] is checked at the start of every step.
///
/// # Example
///
/// ```rust
/// use tomita::backend::glr::{GlrConfig, Phase, StackMachine};
/// use tomita::backend::lr::build_automaton;
/// use tomita::grammar::GrammarBuilder;
/// use tomita::testing::WordLexer;
///
/// let grammar = GrammarBuilder::new()
///     .literal("a")
///     .rule("S", ["S", "a"])
///     .rule("S", ["a"])
///     .start("S")
///     .build()?;
/// let automaton = build_automaton(&grammar)?;
/// let tokens = WordLexer::new(&grammar).tokenize("a a").unwrap();
///
/// let mut machine = StackMachine::new(&automaton, tokens, GlrConfig::default());
/// assert_eq!(machine.step(), Phase::Scanning);
/// assert_eq!(machine.step(), Phase::Scanning);
/// assert_eq!(machine.step(), Phase::Accepting);
/// let forest = machine.into_result().unwrap();
/// assert_eq!(forest.tokens().len(), 2);
/// # Ok::<(), tomita::GrammarError>(())
/// ```
pub struct StackMachine<'a, I> {
    automaton: &'a Automaton,
    config: GlrConfig,
    input: I,
    tokens: Vec<Token>,
    gss: Gss,
    forest: ForestBuilder,
    /// GSS nodes of the current level
    frontier: Vec<usize>,
    by_state: HashMap<StateId, usize, ahash::RandomState>,
    level: usize,
    phase: Phase,
    outcome: Option<Result<NodeId, ParseError>>,
    metrics: ParseMetrics,
    started: Instant,
}

impl<'a, I> StackMachine<'a, I>
where
    I: Iterator<Item = Token>,
{
    pub fn new(
        automaton: &'a Automaton,
        input: impl IntoIterator<IntoIter = I>,
        config: GlrConfig,
    ) -> Self {
        let mut gss = Gss::new();
        let initial = gss.push(StateId::INITIAL, 0);
        let mut by_state = HashMap::with_hasher(ahash::RandomState::new());
        by_state.insert(StateId::INITIAL, initial);
        Self {
            automaton,
            config,
            input: input.into_iter(),
            tokens: Vec::new(),
            gss,
            forest: ForestBuilder::new(),
            frontier: vec![initial],
            by_state,
            level: 0,
            phase: Phase::Scanning,
            outcome: None,
            metrics: ParseMetrics {
                gss_nodes: 1,
                ..ParseMetrics::default()
            },
            started: Instant::now(),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of tokens consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.level
    }

    #[must_use]
    pub const fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }

    /// Process one input position. Returns the phase after the step.
    pub fn step(&mut self) -> Phase {
        if self.phase.is_terminal() {
            return self.phase;
        }
        if self
            .config
            .cancellation
            .as_ref()
            .is_some_and(|flag| flag.is_cancelled())
        {
            debug!("parse cancelled at token {}", self.level);
            return self.reject(ParseError::Cancelled {
                position: self.level,
            });
        }

        self.phase = Phase::Scanning;
        let token = self.input.next();
        let lookahead = match &token {
            Some(token) => {
                let terminal = token.terminal;
                if terminal.is_eof() || terminal.index() >= self.automaton.terminal_count() {
                    return self.reject(ParseError::InvalidToken {
                        position: self.level,
                        span: token.range,
                        terminal: terminal.0,
                    });
                }
                terminal
            }
            None => TerminalId::EOF,
        };

        self.phase = Phase::Reducing;
        self.reduce_all(lookahead);

        match token {
            None => self.accept_or_reject(),
            Some(token) => {
                self.phase = Phase::Shifting;
                self.shift(token)
            }
        }
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] that rejected the input.
    pub fn run(mut self) -> Result<Forest, ParseError> {
        while !self.phase.is_terminal() {
            self.step();
        }
        self.into_result()
    }

    /// Finish the parse, running any remaining steps.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] that rejected the input.
    pub fn into_result(mut self) -> Result<Forest, ParseError> {
        while !self.phase.is_terminal() {
            self.step();
        }
        self.metrics.parse_time = self.started.elapsed();
        self.metrics.tokens_consumed = self.tokens.len();
        debug!("glr parse finished ({}): {}", self.phase, self.metrics);
        match self.outcome {
            Some(Ok(root)) => Ok(self.forest.finish(
                root,
                std::sync::Arc::clone(self.automaton.grammar()),
                self.tokens,
                self.metrics,
            )),
            Some(Err(error)) => Err(error),
            None => Err(ParseError::Cancelled {
                position: self.level,
            }),
        }
    }

    fn reject(&mut self, error: ParseError) -> Phase {
        trace!("rejected: {error}");
        self.outcome = Some(Err(error));
        self.phase = Phase::Rejected;
        self.phase
    }

    fn cell(&self, state: StateId, lookahead: TerminalId) -> SmallVec<[Action; 2]> {
        prune_actions(
            self.automaton.grammar(),
            lookahead,
            self.automaton.actions(state, lookahead),
            self.config.conflict_policy,
        )
    }

    fn queue_reductions(
        &mut self,
        node: usize,
        lookahead: TerminalId,
        through: Option<EdgeRef>,
        worklist: &mut VecDeque<Reduction>,
    ) {
        let state = self.gss.node(node).state;
        let cell = self.cell(state, lookahead);
        if cell.len() > 1 && through.is_none() {
            self.metrics.forks += 1;
        }
        let grammar = self.automaton.grammar();
        for action in cell {
            if let Action::Reduce(production) = action
                && (through.is_none() || !grammar.production(production).is_empty())
            {
                worklist.push_back(Reduction {
                    node,
                    production,
                    through,
                });
            }
        }
    }

    fn reduce_all(&mut self, lookahead: TerminalId) {
        let automaton = self.automaton;
        let grammar = automaton.grammar().as_ref();
        let mut worklist = VecDeque::new();
        for node in self.frontier.clone() {
            self.queue_reductions(node, lookahead, None, &mut worklist);
        }

        while let Some(reduction) = worklist.pop_front() {
            let production = grammar.production(reduction.production);
            let paths = self
                .gss
                .paths(reduction.node, production.len(), reduction.through);

            for path in paths {
                let bottom = self.gss.node(path.bottom);
                let (bottom_state, bottom_level) = (bottom.state, bottom.level);
                let Some(target) = self.automaton.goto(bottom_state, production.lhs()) else {
                    continue;
                };
                let span = Span::new(bottom_level, self.level);
                let (label, derivation) = self.forest.derive(production, path.labels, span);
                if derivation == Derivation::Packed {
                    self.metrics.forest_merges += 1;
                }

                if let Some(&existing) = self.by_state.get(&target) {
                    self.phase = Phase::Merging;
                    if let Some(edge) = self.gss.add_edge(existing, path.bottom, label) {
                        self.metrics.gss_edges += 1;
                        self.metrics.stack_merges += 1;
                        for node in self.frontier.clone() {
                            self.queue_reductions(node, lookahead, Some(edge), &mut worklist);
                        }
                    }
                    self.phase = Phase::Reducing;
                } else {
                    let node = self.gss.push(target, self.level);
                    self.gss.add_edge(node, path.bottom, label);
                    self.metrics.gss_nodes += 1;
                    self.metrics.gss_edges += 1;
                    self.frontier.push(node);
                    self.by_state.insert(target, node);
                    self.queue_reductions(node, lookahead, None, &mut worklist);
                }
            }
        }
        trace!(
            "level {}: {} stack tops after reductions",
            self.level,
            self.frontier.len()
        );
    }

    fn expected(&self, lookahead_states: &[usize]) -> Vec<String> {
        let grammar = self.automaton.grammar();
        let mut expected = BTreeSet::new();
        for &node in lookahead_states {
            let state = self.gss.node(node).state;
            for terminal in self.automaton.expected_terminals(state) {
                if !self.cell(state, terminal).is_empty() {
                    expected.insert(terminal);
                }
            }
        }
        expected
            .into_iter()
            .map(|t| grammar.terminal(t).name().to_string())
            .collect()
    }

    fn end_offset(&self) -> TextSize {
        self.tokens
            .last()
            .map_or(TextSize::zero(), |token| token.range.end())
    }

    fn accept_or_reject(&mut self) -> Phase {
        for &node in &self.frontier {
            let state = self.gss.node(node).state;
            if self.cell(state, TerminalId::EOF).contains(&Action::Accept) {
                // The accepting node has one edge, to the initial node, labeled with the
                // start symbol.
                if let Some(edge) = self.gss.node(node).edges.first() {
                    self.outcome = Some(Ok(edge.label));
                    self.phase = Phase::Accepting;
                    return self.phase;
                }
            }
        }
        let expected = self.expected(&self.frontier);
        self.reject(ParseError::UnexpectedEof {
            position: self.level,
            span: TextRange::empty(self.end_offset()),
            expected,
        })
    }

    fn shift(&mut self, token: Token) -> Phase {
        let lookahead = token.terminal;
        let position = self.level;
        let mut next_frontier: Vec<usize> = Vec::new();
        let mut next_by_state: HashMap<StateId, usize, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());
        let mut leaf = None;

        for &node in &self.frontier {
            let state = self.gss.node(node).state;
            for action in self.cell(state, lookahead) {
                let Action::Shift(target) = action else {
                    continue;
                };
                let label = *leaf.get_or_insert_with(|| self.forest.leaf(&token, position));
                let top = match next_by_state.get(&target) {
                    Some(&top) => {
                        self.metrics.stack_merges += 1;
                        top
                    }
                    None => {
                        let top = self.gss.push(target, position + 1);
                        self.metrics.gss_nodes += 1;
                        next_frontier.push(top);
                        next_by_state.insert(target, top);
                        top
                    }
                };
                if self.gss.add_edge(top, node, label).is_some() {
                    self.metrics.gss_edges += 1;
                }
            }
        }

        if next_frontier.is_empty() {
            let expected = self.expected(&self.frontier);
            let found = if token.text.is_empty() {
                self.automaton.grammar().terminal(lookahead).name().to_string()
            } else {
                token.text.to_string()
            };
            return self.reject(ParseError::UnexpectedToken {
                position,
                span: token.range,
                found,
                expected,
            });
        }

        self.tokens.push(token);
        self.level += 1;
        if self.gss.should_sweep(self.config.sweep_threshold) {
            let before = self.gss.len();
            self.gss.sweep(&mut next_frontier);
            self.metrics.sweeps += 1;
            trace!("gss sweep: {before} -> {} nodes", self.gss.len());
            next_by_state = next_frontier
                .iter()
                .map(|&node| (self.gss.node(node).state, node))
                .collect();
        }
        self.frontier = next_frontier;
        self.by_state = next_by_state;
        self.phase = Phase::Scanning;
        self.phase
    }
}
