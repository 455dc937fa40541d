//! Conflict pruning with yacc-style precedence, associativity and priorities
//!
//! Applied to a table cell right before the stack machine executes it. Rules,
//! per (state, lookahead):
//!
//! - shift/reduce where both the production and the lookahead terminal have a
//!   precedence: the higher level wins; on a tie the production's
//!   associativity decides (left reduces, right shifts, nonassoc drops both)
//! - shift/reduce where the production has no precedence but an explicit
//!   associativity, and the lookahead occurs in its right-hand side: that
//!   associativity decides as on a tie
//! - reduce/reduce where every remaining reduce has an explicit priority:
//!   only the best (lowest) rank survives
//!
//! Any conflict the rules do not cover is kept and becomes a fork.

use crate::backend::lr::Action;
use crate::grammar::{Associativity, Grammar, TerminalId};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// How conflicts in the LR(1) table are treated at parse time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ConflictPolicy {
    /// Apply precedence, associativity and priority declarations eagerly.
    #[default]
    Prune,
    /// Fork on every conflict; resolve ambiguity after parsing.
    KeepAll,
}

/// The actions of a table cell that survive `policy`.
#[must_use]
pub fn prune_actions(
    grammar: &Grammar,
    lookahead: TerminalId,
    actions: &[Action],
    policy: ConflictPolicy,
) -> SmallVec<[Action; 2]> {
    if actions.len() < 2 || policy == ConflictPolicy::KeepAll {
        return SmallVec::from_slice(actions);
    }

    let lookahead_prec = grammar.terminal(lookahead).precedence();
    let mut keep_shift = true;
    let mut reduces: SmallVec<[Action; 2]> = SmallVec::new();
    let mut other: SmallVec<[Action; 2]> = SmallVec::new();
    let has_shift = actions.iter().any(|a| matches!(a, Action::Shift(_)));

    for &action in actions {
        let Action::Reduce(production) = action else {
            other.push(action);
            continue;
        };
        let production = grammar.production(production);
        let resolution = match (has_shift, production.precedence(), lookahead_prec) {
            (true, Some(reduce), Some(shift)) => match reduce.binds_tighter_than(&shift) {
                Ordering::Greater => Some(Associativity::Left),
                Ordering::Less => Some(Associativity::Right),
                Ordering::Equal => Some(reduce.associativity),
            },
            // A bare associativity tag settles ties on the production's own operators.
            (true, None, _) if production.mentions(lookahead) => production.associativity(),
            _ => None,
        };
        match resolution {
            Some(Associativity::Left) => {
                keep_shift = false;
                reduces.push(action);
            }
            Some(Associativity::Right) => {}
            Some(Associativity::NonAssoc) => keep_shift = false,
            None => reduces.push(action),
        }
    }

    if reduces.len() > 1 {
        let ranks: Option<SmallVec<[u32; 2]>> = reduces
            .iter()
            .map(|a| match a {
                Action::Reduce(p) => grammar.production(*p).priority(),
                _ => None,
            })
            .collect();
        if let Some(ranks) = ranks
            && let Some(&best) = ranks.iter().min()
        {
            let mut index = 0;
            reduces.retain(|_| {
                let keep = ranks[index] == best;
                index += 1;
                keep
            });
        }
    }

    let mut out = SmallVec::new();
    for action in other {
        if !matches!(action, Action::Shift(_)) || keep_shift {
            out.push(action);
        }
    }
    // Keep table order: shift, reduces, accept.
    let accept = out.iter().position(|a| matches!(a, Action::Accept));
    let accept = accept.map(|i| out.remove(i));
    out.extend(reduces);
    out.extend(accept);
    out
}
