//! # Semantic Actions
//!
//! [`Actions`] maps productions to functions computing a value from the values
//! of the production's children, plus one function for tokens.
//! [`evaluate`] runs them bottom-up over a forest with the memoized traversal
//! of [`traverse`](super::traverse): a subtree shared by several parents is
//! evaluated once.
//!
//! Evaluation never mutates the forest. The first missing or failing action
//! stops it with an [`ActionError`].
//!
//! ## Example
//!
//! ```rust
//! use tomita::backend::glr::parse;
//! use tomita::backend::lr::build_automaton;
//! use tomita::grammar::{GrammarBuilder, Matcher};
//! use tomita::syntax::{evaluate, Actions};
//! use tomita::testing::WordLexer;
//!
//! let grammar = GrammarBuilder::new()
//!     .terminal("n", Matcher::pattern("[0-9]+"))
//!     .literal("+")
//!     .left(["+"])
//!     .rule("E", ["E", "+", "E"])
//!     .rule("E", ["n"])
//!     .start("E")
//!     .build()?;
//! let automaton = build_automaton(&grammar)?;
//! let forest = parse(&automaton, WordLexer::new(&grammar).tokenize("1 + 2 + 3").unwrap()).unwrap();
//!
//! let actions = Actions::new()
//!     .on_token(|leaf| Ok(leaf.text.parse::<i64>().unwrap_or(0)))
//!     .on_rule(&grammar, "E", &["E", "+", "E"], |v, _| Ok(v[0] + v[2]))
//!     .unwrap()
//!     .on_rule(&grammar, "E", &["n"], |v, _| Ok(v[0]))
//!     .unwrap();
//! assert_eq!(evaluate(&forest, &actions).unwrap(), 6);
//! # Ok::<(), tomita::GrammarError>(())
//! ```

use crate::backend::glr::{Ambiguity, Forest, Leaf, Nonterm};
use crate::error::ActionError;
use crate::grammar::{Grammar, ProductionId};
use crate::syntax::visitor::{Visit, try_traverse};
use hashbrown::HashMap;
use std::fmt;

/// Error type returned by user actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type RuleAction<V> = Box<dyn Fn(&[V], &Nonterm) -> Result<V, BoxError> + Send + Sync>;
type TokenAction<V> = Box<dyn Fn(&Leaf) -> Result<V, BoxError> + Send + Sync>;

/// Registry of semantic actions producing values of type `V`.
pub struct Actions<V> {
    rules: HashMap<ProductionId, RuleAction<V>, ahash::RandomState>,
    token: Option<TokenAction<V>>,
}

impl<V> Default for Actions<V> {
    fn default() -> Self {
        Self {
            rules: HashMap::with_hasher(ahash::RandomState::new()),
            token: None,
        }
    }
}

impl<V> fmt::Debug for Actions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("rules", &self.rules.len())
            .field("token", &self.token.is_some())
            .finish()
    }
}

impl<V> Actions<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the action for `production`, replacing any earlier one.
    ///
    /// The action receives the children's values in order and the
    /// derivation being evaluated.
    #[must_use]
    pub fn on<F>(mut self, production: ProductionId, action: F) -> Self
    where
        F: Fn(&[V], &Nonterm) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        self.rules.insert(production, Box::new(action));
        self
    }

    /// Register the action for the production `lhs -> rhs`, named by symbol.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownRule`] if the grammar has no such
    /// production.
    pub fn on_rule<F>(
        self,
        grammar: &Grammar,
        lhs: &str,
        rhs: &[&str],
        action: F,
    ) -> Result<Self, ActionError>
    where
        F: Fn(&[V], &Nonterm) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        let Some(production) = grammar.find_production(lhs, rhs) else {
            let rhs = if rhs.is_empty() { "ε".to_string() } else { rhs.join(" ") };
            return Err(ActionError::UnknownRule {
                rule: format!("{lhs} -> {rhs}"),
            });
        };
        Ok(self.on(production, action))
    }

    /// Register the action for every token.
    #[must_use]
    pub fn on_token<F>(mut self, action: F) -> Self
    where
        F: Fn(&Leaf) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        self.token = Some(Box::new(action));
        self
    }

    #[must_use]
    pub fn has_action(&self, production: ProductionId) -> bool {
        self.rules.contains_key(&production)
    }

    fn apply(&self, forest: &Forest, visit: Visit<'_, V>) -> Result<V, ActionError> {
        match visit {
            Visit::Leaf { leaf, .. } => {
                let Some(action) = &self.token else {
                    return Err(ActionError::MissingTokenAction {
                        text: leaf.text.to_string(),
                        position: leaf.span.start,
                    });
                };
                action(leaf).map_err(|source| ActionError::Failed {
                    production: forest.grammar().terminal(leaf.terminal).name().to_string(),
                    span: leaf.span,
                    source,
                })
            }
            Visit::Node { node, children, .. } => {
                let name = || forest.grammar().display_production(node.production).to_string();
                let Some(action) = self.rules.get(&node.production) else {
                    return Err(ActionError::MissingAction {
                        production: name(),
                        span: node.span,
                    });
                };
                action(children, node).map_err(|source| ActionError::Failed {
                    production: name(),
                    span: node.span,
                    source,
                })
            }
        }
    }
}

/// Evaluate the forest from its root, taking the first alternative at every
/// ambiguity node.
///
/// # Errors
///
/// Returns an [`ActionError`] if a reached production or token has no action
/// or an action fails.
pub fn evaluate<V: Clone>(forest: &Forest, actions: &Actions<V>) -> Result<V, ActionError> {
    if forest.is_empty() {
        return Err(ActionError::EmptyForest);
    }
    try_traverse(
        forest,
        forest.root(),
        |visit| actions.apply(forest, visit),
        None::<fn(&Ambiguity, &[V]) -> Result<V, ActionError>>,
    )
}

/// Evaluate every alternative of every ambiguity node and let `resolve` pick
/// the value of the ambiguity from the alternatives' values.
///
/// # Errors
///
/// Returns an [`ActionError`] if a reached production or token has no action
/// or an action fails, including actions under alternatives `resolve` later
/// discards.
pub fn evaluate_with<V, G>(
    forest: &Forest,
    actions: &Actions<V>,
    mut resolve: G,
) -> Result<V, ActionError>
where
    V: Clone,
    G: FnMut(&Ambiguity, &[V]) -> V,
{
    if forest.is_empty() {
        return Err(ActionError::EmptyForest);
    }
    try_traverse(
        forest,
        forest.root(),
        |visit| actions.apply(forest, visit),
        Some(|ambiguity: &Ambiguity, values: &[V]| Ok(resolve(ambiguity, values))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::glr::{ConflictPolicy, GlrConfig, parse_with};
    use crate::backend::lr::build_automaton;
    use crate::grammar::{GrammarBuilder, Matcher};
    use crate::testing::WordLexer;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn grammar() -> Grammar {
        GrammarBuilder::new()
            .terminal("n", Matcher::pattern("[0-9]+"))
            .literal("-")
            .rule("E", ["E", "-", "E"])
            .rule("E", ["n"])
            .start("E")
            .build()
            .unwrap()
    }

    fn forest(grammar: &Grammar, input: &str) -> Forest {
        let automaton = build_automaton(grammar).unwrap();
        let tokens = WordLexer::new(grammar).tokenize(input).unwrap();
        let config = GlrConfig::default().with_conflict_policy(ConflictPolicy::KeepAll);
        parse_with(&automaton, tokens, &config).unwrap()
    }

    fn arithmetic(grammar: &Grammar) -> Actions<i64> {
        Actions::new()
            .on_token(|leaf| Ok(leaf.text.parse::<i64>().unwrap_or(0)))
            .on_rule(grammar, "E", &["E", "-", "E"], |v, _| Ok(v[0] - v[2]))
            .unwrap()
            .on_rule(grammar, "E", &["n"], |v, _| Ok(v[0]))
            .unwrap()
    }

    #[test]
    fn test_evaluate_first_alternative() {
        let g = grammar();
        let forest = forest(&g, "8 - 4");
        assert_eq!(evaluate(&forest, &arithmetic(&g)).unwrap(), 4);
    }

    #[test]
    fn test_evaluate_with_resolver() {
        let g = grammar();
        let forest = forest(&g, "8 - 4 - 2");
        let smallest = evaluate_with(&forest, &arithmetic(&g), |_, values| {
            values.iter().copied().min().unwrap_or(0)
        });
        assert_eq!(smallest.unwrap(), 2);
        let largest = evaluate_with(&forest, &arithmetic(&g), |_, values| {
            values.iter().copied().max().unwrap_or(0)
        });
        assert_eq!(largest.unwrap(), 6);
    }

    #[test]
    fn test_missing_action() {
        let g = grammar();
        let forest = forest(&g, "8 - 4");
        let actions: Actions<i64> = Actions::new()
            .on_token(|_| Ok(0))
            .on_rule(&g, "E", &["n"], |v, _| Ok(v[0]))
            .unwrap();
        let error = evaluate(&forest, &actions).unwrap_err();
        assert!(matches!(
            error,
            ActionError::MissingAction { ref production, .. } if production == "E -> E - E"
        ));
    }

    #[test]
    fn test_missing_token_action() {
        let g = grammar();
        let forest = forest(&g, "8");
        let actions: Actions<i64> = Actions::new();
        let error = evaluate(&forest, &actions).unwrap_err();
        assert!(matches!(
            error,
            ActionError::MissingTokenAction { ref text, position: 0 } if text == "8"
        ));
    }

    #[test]
    fn test_failing_action_reports_production() {
        let g = grammar();
        let forest = forest(&g, "8 - 4");
        let actions = arithmetic(&g).on_rule(&g, "E", &["E", "-", "E"], |_, node| {
            Err(format!("cannot subtract over {}", node.span).into())
        });
        let error = evaluate(&forest, &actions.unwrap()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "action for `E -> E - E` failed: cannot subtract over 0..3"
        );
    }

    #[test]
    fn test_unknown_rule() {
        let g = grammar();
        let error = Actions::<i64>::new()
            .on_rule(&g, "E", &["n", "n"], |v, _| Ok(v[0]))
            .unwrap_err();
        assert!(matches!(error, ActionError::UnknownRule { ref rule } if rule == "E -> n n"));
    }

    #[test]
    fn test_shared_subtree_evaluated_once() {
        let g = grammar();
        let forest = forest(&g, "8 - 4 - 2 - 1");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let actions = arithmetic(&g).on_rule(&g, "E", &["n"], move |v, _| {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(v[0])
        });
        evaluate_with(&forest, &actions.unwrap(), |_, values| values[0]).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }
}
