//! Shared packed parse forest
//!
//! Every distinct (symbol, start, end) triple is represented by exactly one
//! forest node, so subtrees common to several parses are stored once. A
//! non-terminal with a single derivation over its span is a [`Nonterm`]; once
//! a second, different derivation is found the node becomes an
//! [`Ambiguity`] whose alternatives are the packed derivations. The handle of
//! the node never changes, so parents built earlier see every alternative.
//!
//! Spans are in token positions. The forest has no cycles.

use crate::backend::glr::state::ParseMetrics;
use crate::grammar::{Grammar, NonterminalId, Production, ProductionId, Symbol, TerminalId};
use crate::lexer::Token;
use crate::syntax::{Span, TextRange, TextSize};
use compact_str::CompactString;
use hashbrown::HashMap;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Handle of a node in a [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A consumed token.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Leaf {
    pub terminal: TerminalId,
    pub text: CompactString,
    pub span: Span,
    pub range: TextRange,
}

/// One derivation: a production applied to child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Nonterm {
    pub production: ProductionId,
    pub lhs: NonterminalId,
    pub children: SmallVec<[NodeId; 4]>,
    pub span: Span,
}

/// Several distinct derivations of the same symbol over the same span.
///
/// Every alternative is a [`Nonterm`] node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Ambiguity {
    pub symbol: NonterminalId,
    pub alternatives: SmallVec<[NodeId; 2]>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ForestNode {
    Leaf(Leaf),
    Nonterm(Nonterm),
    Ambiguity(Ambiguity),
}

impl ForestNode {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Leaf(leaf) => leaf.span,
            Self::Nonterm(node) => node.span,
            Self::Ambiguity(node) => node.span,
        }
    }

    #[must_use]
    pub const fn symbol(&self) -> Symbol {
        match self {
            Self::Leaf(leaf) => Symbol::Terminal(leaf.terminal),
            Self::Nonterm(node) => Symbol::Nonterminal(node.lhs),
            Self::Ambiguity(node) => Symbol::Nonterminal(node.symbol),
        }
    }

    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguity(_))
    }
}

/// The result of a successful parse.
///
/// Nodes are stored in post-order from the root: children always have
/// smaller ids than their parents and the root is the last node. Two parses of
/// the same input with the same automaton produce equal forests.
#[derive(Debug, Clone)]
pub struct Forest {
    grammar: Arc<Grammar>,
    nodes: Vec<ForestNode>,
    root: NodeId,
    tokens: Vec<Token>,
    metrics: ParseMetrics,
}

impl PartialEq for Forest {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.nodes == other.nodes && self.tokens == other.tokens
    }
}

impl Eq for Forest {}

impl Forest {
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &ForestNode {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ForestNode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::from_index(i), node))
    }

    /// Number of ambiguity nodes.
    #[must_use]
    pub fn ambiguity_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_ambiguous()).count()
    }

    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.nodes.iter().any(ForestNode::is_ambiguous)
    }

    /// Children of a derivation; empty for leaves and ambiguity nodes.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            ForestNode::Nonterm(node) => &node.children,
            ForestNode::Leaf(_) | ForestNode::Ambiguity(_) => &[],
        }
    }

    /// Alternatives of an ambiguity node; empty for other nodes.
    #[must_use]
    pub fn alternatives(&self, id: NodeId) -> &[NodeId] {
        match self.node(id) {
            ForestNode::Ambiguity(node) => &node.alternatives,
            ForestNode::Leaf(_) | ForestNode::Nonterm(_) => &[],
        }
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span()
    }

    #[must_use]
    pub fn symbol(&self, id: NodeId) -> Symbol {
        self.node(id).symbol()
    }

    /// Byte range covered by a node, derived from its tokens.
    ///
    /// An ε-node gets an empty range where its position starts.
    #[must_use]
    pub fn text_range(&self, id: NodeId) -> TextRange {
        let span = self.span(id);
        if span.is_empty() {
            let offset = match self.tokens.get(span.start) {
                Some(token) => token.range.start(),
                None => self
                    .tokens
                    .last()
                    .map_or(TextSize::zero(), |token| token.range.end()),
            };
            return TextRange::empty(offset);
        }
        let first = self.tokens[span.start].range;
        let last = self.tokens[span.end - 1].range;
        first.cover(last)
    }

    /// The consumed tokens, without end of input.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub const fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Indented listing of the forest from the root, one node per line.
    ///
    /// Shared nodes are listed under every parent. Indentation stops growing
    /// after 64 levels.
    #[must_use]
    pub fn dump(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let indent = "  ".repeat(depth.min(DUMP_MAX_INDENT));
            let below = match self.node(id) {
                ForestNode::Leaf(leaf) => {
                    let _ = writeln!(out, "{indent}{id} {:?} {}", leaf.text.as_str(), leaf.span);
                    &[][..]
                }
                ForestNode::Nonterm(node) => {
                    let _ = writeln!(
                        out,
                        "{indent}{id} {} {}",
                        self.grammar.display_production(node.production),
                        node.span
                    );
                    &node.children[..]
                }
                ForestNode::Ambiguity(node) => {
                    let _ = writeln!(
                        out,
                        "{indent}{id} ambiguous {} {} ({} alternatives)",
                        self.grammar.nonterminal(node.symbol).name(),
                        node.span,
                        node.alternatives.len()
                    );
                    &node.alternatives[..]
                }
            };
            stack.extend(below.iter().rev().map(|&next| (next, depth + 1)));
        }
        out
    }
}

/// Nesting depth beyond which [`Forest::dump`] no longer indents.
const DUMP_MAX_INDENT: usize = 64;

/// Outcome of adding a derivation to the forest under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Derivation {
    /// First derivation of its (symbol, start, end)
    Created,
    /// A new alternative packed into an existing node
    Packed,
    /// Already present
    Duplicate,
}

type RegistryKey = (Symbol, usize, usize);

/// Forest under construction by the stack machine.
#[derive(Debug, Default)]
pub(crate) struct ForestBuilder {
    nodes: Vec<ForestNode>,
    registry: HashMap<RegistryKey, NodeId, ahash::RandomState>,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            registry: HashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, node: ForestNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// The leaf for the token at `position`, created on first use.
    pub fn leaf(&mut self, token: &Token, position: usize) -> NodeId {
        let key = (Symbol::Terminal(token.terminal), position, position + 1);
        if let Some(&id) = self.registry.get(&key) {
            return id;
        }
        let id = self.alloc(ForestNode::Leaf(Leaf {
            terminal: token.terminal,
            text: token.text.clone(),
            span: Span::new(position, position + 1),
            range: token.range,
        }));
        self.registry.insert(key, id);
        id
    }

    /// Record `production` over `span` with the given children.
    pub fn derive(
        &mut self,
        production: &Production,
        children: SmallVec<[NodeId; 4]>,
        span: Span,
    ) -> (NodeId, Derivation) {
        let key = (Symbol::Nonterminal(production.lhs()), span.start, span.end);
        let derivation = Nonterm {
            production: production.id(),
            lhs: production.lhs(),
            children,
            span,
        };

        let Some(&id) = self.registry.get(&key) else {
            let id = self.alloc(ForestNode::Nonterm(derivation));
            self.registry.insert(key, id);
            return (id, Derivation::Created);
        };

        if self.contains_derivation(id, &derivation) {
            return (id, Derivation::Duplicate);
        }
        let alternative = self.alloc(ForestNode::Nonterm(derivation));
        if matches!(self.nodes[id.index()], ForestNode::Nonterm(_)) {
            // Move the first derivation out so `id` can become the ambiguity.
            let first = self.nodes[id.index()].clone();
            let first = self.alloc(first);
            self.nodes[id.index()] = ForestNode::Ambiguity(Ambiguity {
                symbol: production.lhs(),
                alternatives: SmallVec::from_slice(&[first, alternative]),
                span,
            });
        } else if let ForestNode::Ambiguity(node) = &mut self.nodes[id.index()] {
            node.alternatives.push(alternative);
        }
        (id, Derivation::Packed)
    }

    fn contains_derivation(&self, id: NodeId, derivation: &Nonterm) -> bool {
        let same = |node: &ForestNode| match node {
            ForestNode::Nonterm(existing) => {
                existing.production == derivation.production
                    && existing.children == derivation.children
            }
            ForestNode::Leaf(_) | ForestNode::Ambiguity(_) => false,
        };
        match &self.nodes[id.index()] {
            ForestNode::Ambiguity(node) => node
                .alternatives
                .iter()
                .any(|alt| same(&self.nodes[alt.index()])),
            ForestNode::Leaf(_) => true,
            node @ ForestNode::Nonterm(_) => same(node),
        }
    }

    /// Keep only nodes reachable from `root`, renumbered in post-order.
    pub fn finish(
        self,
        root: NodeId,
        grammar: Arc<Grammar>,
        tokens: Vec<Token>,
        metrics: ParseMetrics,
    ) -> Forest {
        let mut remap: Vec<Option<NodeId>> = vec![None; self.nodes.len()];
        let mut order: Vec<usize> = Vec::new();
        // (node, next child to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root.index(), 0)];
        while let Some((index, next)) = stack.pop() {
            if remap[index].is_some() {
                continue;
            }
            let successors: &[NodeId] = match &self.nodes[index] {
                ForestNode::Leaf(_) => &[],
                ForestNode::Nonterm(node) => &node.children,
                ForestNode::Ambiguity(node) => &node.alternatives,
            };
            if let Some(child) = successors.get(next) {
                stack.push((index, next + 1));
                if remap[child.index()].is_none() {
                    stack.push((child.index(), 0));
                }
            } else {
                remap[index] = Some(NodeId::from_index(order.len()));
                order.push(index);
            }
        }

        let relabel = |id: &NodeId| remap[id.index()].unwrap_or(*id);
        let mut old = self.nodes;
        let nodes = order
            .iter()
            .map(|&index| {
                let mut node = std::mem::replace(
                    &mut old[index],
                    ForestNode::Leaf(Leaf {
                        terminal: TerminalId::EOF,
                        text: CompactString::default(),
                        span: Span::default(),
                        range: TextRange::default(),
                    }),
                );
                match &mut node {
                    ForestNode::Leaf(_) => {}
                    ForestNode::Nonterm(n) => {
                        for child in &mut n.children {
                            *child = relabel(child);
                        }
                    }
                    ForestNode::Ambiguity(n) => {
                        for alternative in &mut n.alternatives {
                            *alternative = relabel(alternative);
                        }
                    }
                }
                node
            })
            .collect::<Vec<_>>();

        Forest {
            grammar,
            root: NodeId::from_index(nodes.len() - 1),
            nodes,
            tokens,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use crate::syntax::TextSize;

    fn grammar() -> Grammar {
        GrammarBuilder::new()
            .literal("a")
            .rule("S", ["A", "A"])
            .rule("A", ["a"])
            .rule("A", [])
            .start("S")
            .build()
            .unwrap()
    }

    fn token(grammar: &Grammar, position: u32) -> Token {
        Token::new(
            grammar.terminal_by_name("a").unwrap(),
            "a",
            TextRange::at(TextSize::from(position), TextSize::from(1)),
        )
    }

    #[test]
    fn test_leaf_is_shared_per_position() {
        let g = grammar();
        let mut builder = ForestBuilder::new();
        let a = builder.leaf(&token(&g, 0), 0);
        assert_eq!(builder.leaf(&token(&g, 0), 0), a);
        assert_ne!(builder.leaf(&token(&g, 2), 1), a);
    }

    #[test]
    fn test_packing_keeps_handle_stable() {
        let g = grammar();
        let pair = g.production(g.find_production("S", &["A", "A"]).unwrap()).clone();
        let one = g.production(g.find_production("A", &["a"]).unwrap()).clone();
        let none = g.production(g.find_production("A", &[]).unwrap()).clone();

        let tok = token(&g, 0);
        let mut builder = ForestBuilder::new();
        let leaf = builder.leaf(&tok, 0);
        let (a_full, _) = builder.derive(&one, SmallVec::from_slice(&[leaf]), Span::new(0, 1));
        let (a_left, _) = builder.derive(&none, SmallVec::new(), Span::new(0, 0));
        let (a_right, _) = builder.derive(&none, SmallVec::new(), Span::new(1, 1));

        let (root, first) =
            builder.derive(&pair, SmallVec::from_slice(&[a_full, a_right]), Span::new(0, 1));
        assert_eq!(first, Derivation::Created);
        let (again, second) =
            builder.derive(&pair, SmallVec::from_slice(&[a_left, a_full]), Span::new(0, 1));
        assert_eq!(again, root);
        assert_eq!(second, Derivation::Packed);
        let (_, duplicate) =
            builder.derive(&pair, SmallVec::from_slice(&[a_left, a_full]), Span::new(0, 1));
        assert_eq!(duplicate, Derivation::Duplicate);

        let forest = builder.finish(root, Arc::new(g), vec![tok], ParseMetrics::default());
        assert_eq!(forest.root().index(), forest.len() - 1);
        assert!(forest.is_ambiguous());
        assert_eq!(forest.ambiguity_count(), 1);
        assert_eq!(forest.alternatives(forest.root()).len(), 2);
        for (id, _) in forest.iter() {
            for child in forest.children(id).iter().chain(forest.alternatives(id)) {
                assert!(child < &id, "children precede parents");
            }
        }
    }

    #[test]
    fn test_text_range_of_epsilon_node() {
        let g = grammar();
        let one = g.production(g.find_production("A", &["a"]).unwrap()).clone();
        let none = g.production(g.find_production("A", &[]).unwrap()).clone();
        let pair = g.production(g.find_production("S", &["A", "A"]).unwrap()).clone();

        let tok = Token::new(
            g.terminal_by_name("a").unwrap(),
            "a",
            TextRange::at(TextSize::from(3), TextSize::from(1)),
        );
        let mut builder = ForestBuilder::new();
        let leaf = builder.leaf(&tok, 0);
        let (full, _) = builder.derive(&one, SmallVec::from_slice(&[leaf]), Span::new(0, 1));
        let (empty, _) = builder.derive(&none, SmallVec::new(), Span::new(1, 1));
        let (root, _) =
            builder.derive(&pair, SmallVec::from_slice(&[full, empty]), Span::new(0, 1));
        let forest = builder.finish(root, Arc::new(g), vec![tok], ParseMetrics::default());

        let root = forest.root();
        let [full, empty] = forest.children(root) else {
            panic!("S has two children");
        };
        assert_eq!(
            forest.text_range(*full),
            TextRange::new(TextSize::from(3), TextSize::from(4))
        );
        assert_eq!(forest.text_range(*empty), TextRange::empty(TextSize::from(4)));
        assert_eq!(forest.text_range(root), forest.text_range(*full));
    }
}
