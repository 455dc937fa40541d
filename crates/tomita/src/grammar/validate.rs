use crate::error::GrammarError;
use crate::grammar::{Grammar, GrammarAnalysis, NonterminalId, Symbol};

/// Validate a grammar before table construction.
///
/// Checks, in order: every non-terminal is reachable from the start symbol,
/// every non-terminal derives at least one terminal string, and no
/// non-terminal derives itself through unit steps (`A =>+ A`).
///
/// # Errors
///
/// Returns [`GrammarError::Unreachable`], [`GrammarError::Unproductive`] or
/// [`GrammarError::Cyclic`] naming the offending non-terminals.
pub fn validate_grammar(grammar: &Grammar) -> Result<(), GrammarError> {
    let analysis = GrammarAnalysis::new(grammar);
    validate_with(grammar, &analysis)
}

pub(crate) fn validate_with(
    grammar: &Grammar,
    analysis: &GrammarAnalysis,
) -> Result<(), GrammarError> {
    let ids = || (0..grammar.nonterminals().len()).map(NonterminalId::from_index);

    let unreachable = names(grammar, ids().filter(|n| !analysis.is_reachable(*n)));
    if !unreachable.is_empty() {
        return Err(GrammarError::Unreachable { names: unreachable });
    }

    let unproductive = names(grammar, ids().filter(|n| !analysis.is_productive(*n)));
    if !unproductive.is_empty() {
        return Err(GrammarError::Unproductive { names: unproductive });
    }

    let cyclic = names(grammar, find_cycles(grammar, analysis).into_iter());
    if !cyclic.is_empty() {
        return Err(GrammarError::Cyclic { names: cyclic });
    }

    Ok(())
}

fn names(grammar: &Grammar, ids: impl Iterator<Item = NonterminalId>) -> Vec<String> {
    ids.map(|n| grammar.nonterminal(n).name().to_string())
        .collect()
}

/// Non-terminals lying on a cycle of the unit-derivation graph.
///
/// `A -> α B β` contributes the edge `A => B` when `α` and `β` are nullable.
fn find_cycles(grammar: &Grammar, analysis: &GrammarAnalysis) -> Vec<NonterminalId> {
    let count = grammar.nonterminals().len();
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); count];
    for production in grammar.productions() {
        let rhs = production.rhs();
        for (i, symbol) in rhs.iter().enumerate() {
            let Symbol::Nonterminal(target) = *symbol else {
                continue;
            };
            if analysis.sequence_nullable(&rhs[..i]) && analysis.sequence_nullable(&rhs[i + 1..]) {
                let from = &mut edges[production.lhs().index()];
                if !from.contains(&target.index()) {
                    from.push(target.index());
                }
            }
        }
    }

    // A node is cyclic iff it can reach itself.
    let mut cyclic = Vec::new();
    for start in 0..count {
        let mut seen = vec![false; count];
        let mut stack: Vec<usize> = edges[start].clone();
        while let Some(node) = stack.pop() {
            if node == start {
                cyclic.push(NonterminalId::from_index(start));
                break;
            }
            if !seen[node] {
                seen[node] = true;
                stack.extend_from_slice(&edges[node]);
            }
        }
    }
    cyclic
}
