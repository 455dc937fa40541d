//! # Tree Extraction
//!
//! Concrete trees out of a packed forest without enumerating it eagerly.
//!
//! ## Overview
//!
//! Every forest node derives a known number of trees: one for a leaf, the
//! product of its children's counts for a derivation, and the sum of its
//! alternatives' counts for an ambiguity node. The counts are computed once
//! per node in a single pass over the forest (children precede parents in
//! forest order), so shared subtrees are counted once.
//!
//! With the counts the trees under the root can be numbered `0..count` and
//! any one of them rebuilt directly from its index:
//!
//! - at an ambiguity node the index selects an alternative by subtracting the
//!   counts of the alternatives before it
//! - at a derivation the index is split as a mixed-radix number over the
//!   children, the first child being the most significant digit
//!
//! Tree `0` is the tree of [`first_tree`], and [`all_trees`] walks the indices
//! in order, holding one tree at a time.
//!
//! Counts saturate at `u128::MAX`; [`nth_tree`] only reaches trees whose index
//! fits.

use crate::backend::glr::{Forest, ForestNode, NodeId};
use crate::syntax::Tree;
use std::sync::Arc;

/// Number of trees derived by each forest node, indexed by [`NodeId`].
fn tree_counts(forest: &Forest) -> Vec<u128> {
    let mut counts: Vec<u128> = Vec::with_capacity(forest.len());
    for (_, node) in forest.iter() {
        let count = match node {
            ForestNode::Leaf(_) => 1,
            ForestNode::Nonterm(node) => node
                .children
                .iter()
                .fold(1u128, |acc, child| acc.saturating_mul(counts[child.index()])),
            ForestNode::Ambiguity(node) => node
                .alternatives
                .iter()
                .fold(0u128, |acc, alt| acc.saturating_add(counts[alt.index()])),
        };
        counts.push(count);
    }
    counts
}

/// Number of distinct trees in the forest, saturating at `u128::MAX`.
///
/// Runs in time linear in the forest size, however many trees it packs.
#[must_use]
pub fn count_trees(forest: &Forest) -> u128 {
    if forest.is_empty() {
        return 0;
    }
    tree_counts(forest)[forest.root().index()]
}

/// The tree taking the first alternative at every ambiguity node.
///
/// For an unambiguous forest this is its only tree.
#[must_use]
pub fn first_tree(forest: &Forest) -> Tree {
    Extractor::new(forest, Choice::First).build(0)
}

/// The tree taking, at every ambiguity node, the alternative whose production
/// has the best (lowest) explicit priority rank.
///
/// Alternatives with a rank beat alternatives without one; ties go to the
/// first alternative.
#[must_use]
pub fn prioritized_tree(forest: &Forest) -> Tree {
    Extractor::new(forest, Choice::Prioritized).build(0)
}

/// The `index`-th tree, or `None` if the forest has fewer trees.
///
/// `nth_tree(forest, 0)` equals [`first_tree`].
#[must_use]
pub fn nth_tree(forest: &Forest, index: u128) -> Option<Tree> {
    let counts = tree_counts(forest);
    unrank(forest, &counts, index)
}

fn unrank(forest: &Forest, counts: &[u128], index: u128) -> Option<Tree> {
    if forest.is_empty() || index >= counts[forest.root().index()] {
        return None;
    }
    Some(Extractor::new(forest, Choice::Ranked(counts)).build(index))
}

/// All trees of the forest, lazily, in index order.
///
/// The iterator is `Clone`; a clone resumes from the same position, and
/// calling `all_trees` again starts over.
///
/// # Example
///
/// ```rust
/// use tomita::backend::glr::{parse_with, ConflictPolicy, GlrConfig};
/// use tomita::backend::lr::build_automaton;
/// use tomita::grammar::GrammarBuilder;
/// use tomita::syntax::{all_trees, count_trees};
/// use tomita::testing::WordLexer;
///
/// let grammar = GrammarBuilder::new()
///     .literal("a")
///     .literal("+")
///     .rule("E", ["E", "+", "E"])
///     .rule("E", ["a"])
///     .start("E")
///     .build()?;
/// let automaton = build_automaton(&grammar)?;
/// let tokens = WordLexer::new(&grammar).tokenize("a + a + a").unwrap();
/// let config = GlrConfig::default().with_conflict_policy(ConflictPolicy::KeepAll);
/// let forest = parse_with(&automaton, tokens, &config).unwrap();
///
/// let rendered: Vec<String> = all_trees(&forest)
///     .map(|tree| tree.display(&grammar).to_string())
///     .collect();
/// assert_eq!(count_trees(&forest), 2);
/// assert_eq!(rendered.len(), 2);
/// assert_ne!(rendered[0], rendered[1]);
/// # Ok::<(), tomita::GrammarError>(())
/// ```
#[must_use]
pub fn all_trees(forest: &Forest) -> Trees<'_> {
    let counts: Arc<[u128]> = tree_counts(forest).into();
    let total = if forest.is_empty() {
        0
    } else {
        counts[forest.root().index()]
    };
    Trees {
        forest,
        counts,
        next: 0,
        total,
    }
}

/// Iterator returned by [`all_trees`].
#[derive(Debug, Clone)]
pub struct Trees<'f> {
    forest: &'f Forest,
    counts: Arc<[u128]>,
    next: u128,
    total: u128,
}

impl Trees<'_> {
    /// Total number of trees, consumed or not.
    #[must_use]
    pub const fn total(&self) -> u128 {
        self.total
    }
}

impl Iterator for Trees<'_> {
    type Item = Tree;

    fn next(&mut self) -> Option<Tree> {
        if self.next >= self.total {
            return None;
        }
        let tree = unrank(self.forest, &self.counts, self.next)?;
        self.next += 1;
        Some(tree)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }

    fn nth(&mut self, n: usize) -> Option<Tree> {
        self.next = self.next.saturating_add(n as u128).min(self.total);
        self.next()
    }
}

/// How an ambiguity node is resolved.
#[derive(Clone, Copy)]
enum Choice<'c> {
    First,
    Prioritized,
    /// By rank, using per-node tree counts
    Ranked(&'c [u128]),
}

struct Frame {
    node: NodeId,
    /// Rank of each child's subtree; empty unless ranked
    ranks: Vec<u128>,
    children: Vec<Tree>,
}

struct Extractor<'f, 'c> {
    forest: &'f Forest,
    choice: Choice<'c>,
}

impl<'f, 'c> Extractor<'f, 'c> {
    const fn new(forest: &'f Forest, choice: Choice<'c>) -> Self {
        Self { forest, choice }
    }

    /// Resolve ambiguity nodes down to a derivation or leaf, and split `rank`
    /// over its children, the last child least significant.
    fn enter(&self, mut id: NodeId, mut rank: u128) -> Frame {
        while let ForestNode::Ambiguity(node) = self.forest.node(id) {
            id = self.choose(&node.alternatives, &mut rank);
        }
        let children = self.forest.children(id);
        let mut ranks = Vec::new();
        if let Choice::Ranked(counts) = self.choice {
            ranks = vec![0; children.len()];
            for (slot, child) in ranks.iter_mut().zip(children).rev() {
                let count = counts[child.index()];
                *slot = rank % count;
                rank /= count;
            }
        }
        Frame {
            node: id,
            ranks,
            children: Vec::with_capacity(children.len()),
        }
    }

    fn choose(&self, alternatives: &[NodeId], rank: &mut u128) -> NodeId {
        match self.choice {
            Choice::First => alternatives[0],
            Choice::Prioritized => {
                let grammar = self.forest.grammar();
                let priority = |id: NodeId| match self.forest.node(id) {
                    ForestNode::Nonterm(node) => grammar.production(node.production).priority(),
                    ForestNode::Leaf(_) | ForestNode::Ambiguity(_) => None,
                };
                let mut best = alternatives[0];
                let mut best_priority = priority(best);
                for &alternative in &alternatives[1..] {
                    let candidate = priority(alternative);
                    let better = match (candidate, best_priority) {
                        (Some(c), Some(b)) => c < b,
                        (Some(_), None) => true,
                        (None, _) => false,
                    };
                    if better {
                        best = alternative;
                        best_priority = candidate;
                    }
                }
                best
            }
            Choice::Ranked(counts) => {
                for &alternative in alternatives {
                    let count = counts[alternative.index()];
                    if *rank < count {
                        return alternative;
                    }
                    *rank -= count;
                }
                alternatives[alternatives.len() - 1]
            }
        }
    }

    fn build(&self, rank: u128) -> Tree {
        let mut stack = vec![self.enter(self.forest.root(), rank)];
        while let Some(frame) = stack.last_mut() {
            let next = frame.children.len();
            match self.forest.children(frame.node).get(next) {
                Some(&child) => {
                    let rank = frame.ranks.get(next).copied().unwrap_or(0);
                    let entered = self.enter(child, rank);
                    stack.push(entered);
                }
                None => {
                    let tree = self.finish(frame.node, std::mem::take(&mut frame.children));
                    stack.pop();
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(tree),
                        None => return tree,
                    }
                }
            }
        }
        unreachable!("the root frame returns its tree before the stack empties")
    }

    fn finish(&self, id: NodeId, children: Vec<Tree>) -> Tree {
        match self.forest.node(id) {
            ForestNode::Leaf(leaf) => Tree::Leaf {
                terminal: leaf.terminal,
                text: leaf.text.clone(),
                span: leaf.span,
            },
            ForestNode::Nonterm(node) => Tree::Node {
                production: node.production,
                lhs: node.lhs,
                children,
                span: node.span,
            },
            ForestNode::Ambiguity(_) => unreachable!("ambiguity nodes are resolved on entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::glr::{ConflictPolicy, GlrConfig, parse_with};
    use crate::backend::lr::build_automaton;
    use crate::grammar::{Grammar, GrammarBuilder};
    use crate::testing::WordLexer;
    use hashbrown::HashSet;

    fn sum() -> Grammar {
        GrammarBuilder::new()
            .literal("a")
            .literal("+")
            .rule("E", ["E", "+", "E"])
            .rule("E", ["a"])
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

    fn operands(n: usize) -> String {
        vec!["a"; n].join(" + ")
    }

    #[test]
    fn test_counts_follow_catalan_numbers() {
        let grammar = sum();
        let catalan = [1u128, 1, 2, 5, 14, 42, 132, 429];
        for (operators, expected) in catalan.iter().enumerate() {
            let forest = forest(&grammar, &operands(operators + 1));
            assert_eq!(count_trees(&forest), *expected, "{operators} operators");
        }
    }

    #[test]
    fn test_unambiguous_forest_has_one_tree() {
        let grammar = sum();
        let forest = forest(&grammar, "a");
        assert_eq!(count_trees(&forest), 1);
        assert_eq!(all_trees(&forest).count(), 1);
        assert_eq!(first_tree(&forest).display(&grammar).to_string(), "(E a)");
    }

    #[test]
    fn test_all_trees_are_distinct_and_match_count() {
        let grammar = sum();
        let forest = forest(&grammar, &operands(5));
        let trees: Vec<Tree> = all_trees(&forest).collect();
        assert_eq!(trees.len() as u128, count_trees(&forest));
        let unique: HashSet<&Tree> = trees.iter().collect();
        assert_eq!(unique.len(), trees.len());
        for tree in &trees {
            assert_eq!(tree.yield_text(), operands(5).split(' ').collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_all_trees_is_restartable() {
        let grammar = sum();
        let forest = forest(&grammar, &operands(4));
        let mut trees = all_trees(&forest);
        let first = trees.next().unwrap();
        let resumed = trees.clone();
        assert_eq!(trees.count(), resumed.count());
        assert_eq!(all_trees(&forest).next().unwrap(), first);
        assert_eq!(first, first_tree(&forest));
    }

    #[test]
    fn test_nth_tree() {
        let grammar = sum();
        let forest = forest(&grammar, &operands(3));
        let left = nth_tree(&forest, 0).unwrap();
        let right = nth_tree(&forest, 1).unwrap();
        assert_ne!(left, right);
        assert!(nth_tree(&forest, 2).is_none());
        assert_eq!(all_trees(&forest).nth(1), Some(right));
    }

    #[test]
    fn test_prioritized_tree_prefers_ranked_alternative() {
        let grammar = GrammarBuilder::new()
            .literal("x")
            .rule("S", ["A"])
            .rule_with("S", ["B"], |opts| {
                opts.priority(0);
            })
            .rule("A", ["x"])
            .rule("B", ["x"])
            .start("S")
            .build()
            .unwrap();
        let forest = forest(&grammar, "x");
        assert_eq!(count_trees(&forest), 2);
        assert_eq!(first_tree(&forest).display(&grammar).to_string(), "(S (A x))");
        assert_eq!(
            prioritized_tree(&forest).display(&grammar).to_string(),
            "(S (B x))"
        );
    }
}
