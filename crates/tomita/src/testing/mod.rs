//! # Testing Utilities
//!
//! Helpers for tests, examples and benchmarks of grammars and parses.
//!
//! - [`WordLexer`]: turns whitespace-separated words into tokens
//! - [`SentenceGenerator`]: random sentences of a grammar, for property tests
//!   and fuzzing
//! - [`check_derivation`]: validates a concrete tree against the grammar
//!   without going through the parser

pub mod generators;
pub mod lexer;

pub use generators::{GeneratorConfig, SentenceGenerator};
pub use lexer::{UnknownWord, WordLexer};

use crate::grammar::{Grammar, Symbol};
use crate::syntax::Tree;

/// Check that `tree` is a derivation of `grammar` rooted at its start symbol.
///
/// Every node must apply a production of the grammar whose left-hand side is
/// the node's symbol, its children must match the right-hand side in order,
/// and child spans must tile the parent's span.
///
/// # Errors
///
/// Returns a description of the first violation found.
pub fn check_derivation(grammar: &Grammar, tree: &Tree) -> Result<(), String> {
    let Tree::Node { lhs, span, .. } = tree else {
        return Err("the root is a leaf".to_string());
    };
    if *lhs != grammar.start() {
        return Err(format!(
            "the root is `{}`, not the start symbol",
            grammar.nonterminal(*lhs).name()
        ));
    }
    if span.start != 0 {
        return Err(format!("the root starts at token {}", span.start));
    }

    let mut pending = vec![tree];
    while let Some(tree) = pending.pop() {
        let Tree::Node {
            production,
            lhs,
            children,
            span,
        } = tree
        else {
            continue;
        };
        let rule = grammar.production(*production);
        let shown = grammar.display_production(*production);
        if rule.lhs() != *lhs {
            return Err(format!("`{shown}` applied to `{}`", grammar.nonterminal(*lhs).name()));
        }
        if rule.len() != children.len() {
            return Err(format!("`{shown}` has {} children", children.len()));
        }
        let mut cursor = span.start;
        for (symbol, child) in rule.rhs().iter().zip(children) {
            let matches = match (symbol, child) {
                (Symbol::Terminal(t), Tree::Leaf { terminal, .. }) => t == terminal,
                (Symbol::Nonterminal(n), Tree::Node { lhs, .. }) => n == lhs,
                _ => false,
            };
            if !matches {
                return Err(format!(
                    "child `{}` of `{shown}` does not match `{}`",
                    child.display(grammar),
                    grammar.symbol_name(*symbol)
                ));
            }
            if child.span().start != cursor {
                return Err(format!("gap before {} in `{shown}`", child.span()));
            }
            if let Tree::Leaf { span, .. } = child
                && span.len() != 1
            {
                return Err(format!("leaf spans {span}"));
            }
            cursor = child.span().end;
            pending.push(child);
        }
        if cursor != span.end {
            return Err(format!("`{shown}` over {span} ends its children at {cursor}"));
        }
    }
    Ok(())
}
