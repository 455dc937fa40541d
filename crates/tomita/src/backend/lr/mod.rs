//! # Canonical LR(1) Table Builder
//!
//! Builds the LR(1) item-set automaton of a grammar without resolving
//! conflicts: every shift/reduce and reduce/reduce conflict stays in the table
//! as a multi-action cell for the GLR stack machine to fork on.
//!
//! ## Construction
//!
//! 1. Validate the grammar (reachability, productivity, unit cycles)
//! 2. Augment it with `S' -> S`
//! 3. Close item sets over `FIRST(β a)`
//! 4. Number states in discovery order, visiting successors in symbol order,
//!    so the same grammar always yields the same table

mod item;
mod table;

pub use table::{Action, Automaton, Conflict, ConflictKind, StateId};

use crate::error::GrammarError;
use crate::grammar::Grammar;
use std::sync::Arc;

/// Validate `grammar` and build its LR(1) automaton.
///
/// # Errors
///
/// Returns a [`GrammarError`] if the grammar has unreachable, unproductive or
/// cyclic non-terminals.
///
/// # Example
///
/// ```rust
/// use tomita::backend::lr::build_automaton;
/// use tomita::grammar::GrammarBuilder;
///
/// let grammar = GrammarBuilder::new()
///     .literal("a")
///     .literal("+")
///     .rule("E", ["E", "+", "E"])
///     .rule("E", ["a"])
///     .start("E")
///     .build()?;
///
/// let automaton = build_automaton(&grammar)?;
/// assert_eq!(automaton.conflicts().len(), 1);
/// # Ok::<(), tomita::GrammarError>(())
/// ```
pub fn build_automaton(grammar: &Grammar) -> Result<Automaton, GrammarError> {
    Automaton::build(Arc::new(grammar.clone()))
}
