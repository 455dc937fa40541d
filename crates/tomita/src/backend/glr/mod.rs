//! # GLR Stack Machine
//!
//! Runs Tomita's algorithm over the multi-action table built by
//! [`crate::backend::lr`], producing a shared packed parse forest.
//!
//! ## Overview
//!
//! All live LR stacks are kept in one graph-structured stack (GSS). For each
//! input position the machine:
//!
//! 1. reads the lookahead token (or end of input)
//! 2. applies every reduction the frontier allows, merging stacks that reach
//!    the same state and re-reducing through newly added edges
//! 3. shifts the lookahead onto every stack that can take it
//!
//! Stacks with no action for the lookahead die silently; the input is rejected
//! only when no stack survives. Each reduction records a derivation in the
//! forest, where identical `(symbol, start, end)` results are shared and
//! distinct derivations of the same result are packed under an ambiguity node.
//!
//! ## Conflict pruning
//!
//! With [`ConflictPolicy::Prune`] (the default) precedence, associativity and
//! priority declarations are applied to each table cell before it is executed,
//! so ambiguities the grammar author resolved never enter the forest. Use
//! [`ConflictPolicy::KeepAll`] to keep every derivation and select afterwards
//! with [`prioritized_tree`](crate::syntax::prioritized_tree).
//!
//! ## Example
//!
//! ```rust
//! use tomita::backend::glr::{parse_with, ConflictPolicy, GlrConfig};
//! use tomita::backend::lr::build_automaton;
//! use tomita::grammar::GrammarBuilder;
//! use tomita::testing::WordLexer;
//!
//! let grammar = GrammarBuilder::new()
//!     .literal("a")
//!     .literal("+")
//!     .rule("E", ["E", "+", "E"])
//!     .rule("E", ["a"])
//!     .start("E")
//!     .build()?;
//! let automaton = build_automaton(&grammar)?;
//! let tokens = WordLexer::new(&grammar).tokenize("a + a + a").unwrap();
//!
//! let config = GlrConfig::default().with_conflict_policy(ConflictPolicy::KeepAll);
//! let forest = parse_with(&automaton, tokens, &config).unwrap();
//! assert!(forest.is_ambiguous());
//! # Ok::<(), tomita::GrammarError>(())
//! ```

mod disambiguation;
mod forest;
mod parser;
mod stack;
mod state;

pub use disambiguation::{ConflictPolicy, prune_actions};
pub use forest::{Ambiguity, Forest, ForestNode, Leaf, NodeId, Nonterm};
pub use parser::StackMachine;
pub use state::{ParseMetrics, Phase};

use crate::backend::lr::Automaton;
use crate::error::ParseError;
use crate::lexer::Token;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Default for [`GlrConfig::sweep_threshold`].
pub const DEFAULT_SWEEP_THRESHOLD: usize = 64;

/// Cooperative cancellation for a running parse.
///
/// Clones share the same flag. The stack machine checks it once per input
/// position.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for the GLR stack machine
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct GlrConfig {
    /// How table conflicts are treated
    pub conflict_policy: ConflictPolicy,
    /// Dead GSS nodes are swept once the arena holds at least twice this many
    /// nodes and twice as many as survived the previous sweep
    pub sweep_threshold: usize,
    #[cfg_attr(feature = "serialize", serde(skip))]
    pub cancellation: Option<CancellationFlag>,
}

impl Default for GlrConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
            cancellation: None,
        }
    }
}

impl GlrConfig {
    #[must_use]
    pub const fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    #[must_use]
    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold.max(1);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }
}

/// Parse `tokens` with the default configuration.
///
/// # Errors
///
/// Returns a [`ParseError`] if no stack survives the input.
pub fn parse<I>(automaton: &Automaton, tokens: I) -> Result<Forest, ParseError>
where
    I: IntoIterator<Item = Token>,
{
    parse_with(automaton, tokens, &GlrConfig::default())
}

/// Parse `tokens` with an explicit configuration.
///
/// # Errors
///
/// Returns a [`ParseError`] if no stack survives the input or the parse is
/// cancelled.
pub fn parse_with<I>(
    automaton: &Automaton,
    tokens: I,
    config: &GlrConfig,
) -> Result<Forest, ParseError>
where
    I: IntoIterator<Item = Token>,
{
    StackMachine::new(automaton, tokens, config.clone()).run()
}
