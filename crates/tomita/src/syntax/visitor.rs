use crate::backend::glr::{Ambiguity, Forest, ForestNode, Leaf, NodeId, Nonterm};

/// One node handed to a traversal callback, after all of its children.
#[derive(Debug)]
pub enum Visit<'a, R> {
    Leaf {
        id: NodeId,
        leaf: &'a Leaf,
    },
    Node {
        id: NodeId,
        node: &'a Nonterm,
        /// Results of the children, in order
        children: &'a [R],
    },
}

impl<R> Visit<'_, R> {
    #[must_use]
    pub const fn id(&self) -> NodeId {
        match self {
            Self::Leaf { id, .. } | Self::Node { id, .. } => *id,
        }
    }
}

/// Post-order walk from `root`, calling `visit` once per reachable node.
///
/// An ambiguity node takes the result of its first alternative; the other
/// alternatives are not visited. A node shared by several parents is visited
/// once and its result cloned into each parent.
///
/// # Example
///
/// ```rust
/// use tomita::backend::glr::parse;
/// use tomita::backend::lr::build_automaton;
/// use tomita::grammar::GrammarBuilder;
/// use tomita::syntax::{traverse, Visit};
/// use tomita::testing::WordLexer;
///
/// let grammar = GrammarBuilder::new()
///     .literal("a")
///     .rule("S", ["S", "a"])
///     .rule("S", ["a"])
///     .start("S")
///     .build()?;
/// let automaton = build_automaton(&grammar)?;
/// let forest = parse(&automaton, WordLexer::new(&grammar).tokenize("a a a").unwrap()).unwrap();
///
/// let leaves = traverse(&forest, forest.root(), |visit| match visit {
///     Visit::Leaf { .. } => 1,
///     Visit::Node { children, .. } => children.iter().sum(),
/// });
/// assert_eq!(leaves, 3);
/// # Ok::<(), tomita::GrammarError>(())
/// ```
pub fn traverse<R, F>(forest: &Forest, root: NodeId, mut visit: F) -> R
where
    R: Clone,
    F: FnMut(Visit<'_, R>) -> R,
{
    let result: Result<R, std::convert::Infallible> =
        walk(forest, root, |v| Ok(visit(v)), None::<NoResolver<R>>);
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Like [`traverse`], but every alternative of an ambiguity node is visited
/// and `resolve` picks the node's result from theirs.
pub fn traverse_with<R, F, G>(forest: &Forest, root: NodeId, mut visit: F, mut resolve: G) -> R
where
    R: Clone,
    F: FnMut(Visit<'_, R>) -> R,
    G: FnMut(&Ambiguity, &[R]) -> R,
{
    let result: Result<R, std::convert::Infallible> = walk(
        forest,
        root,
        |v| Ok(visit(v)),
        Some(|a: &Ambiguity, rs: &[R]| Ok(resolve(a, rs))),
    );
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Fallible traversal; the first error stops the walk and is returned.
///
/// # Errors
///
/// Returns the first error produced by `visit` or `resolve`.
pub fn try_traverse<R, E, F, G>(
    forest: &Forest,
    root: NodeId,
    visit: F,
    resolve: Option<G>,
) -> Result<R, E>
where
    R: Clone,
    F: FnMut(Visit<'_, R>) -> Result<R, E>,
    G: FnMut(&Ambiguity, &[R]) -> Result<R, E>,
{
    walk(forest, root, visit, resolve)
}

type NoResolver<R> = fn(&Ambiguity, &[R]) -> Result<R, std::convert::Infallible>;

/// The nodes whose results a node's result is built from.
fn successors(node: &ForestNode, all_alternatives: bool) -> &[NodeId] {
    match node {
        ForestNode::Leaf(_) => &[],
        ForestNode::Nonterm(node) => &node.children,
        ForestNode::Ambiguity(node) if all_alternatives => &node.alternatives,
        ForestNode::Ambiguity(node) => &node.alternatives[..1],
    }
}

fn walk<R, E, F, G>(
    forest: &Forest,
    root: NodeId,
    mut visit: F,
    mut resolve: Option<G>,
) -> Result<R, E>
where
    R: Clone,
    F: FnMut(Visit<'_, R>) -> Result<R, E>,
    G: FnMut(&Ambiguity, &[R]) -> Result<R, E>,
{
    let all_alternatives = resolve.is_some();

    // Mark what the walk reaches; children precede parents in forest order,
    // so visiting marked nodes by ascending id is a post-order.
    let mut reached = vec![false; root.index() + 1];
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        if std::mem::replace(&mut reached[id.index()], true) {
            continue;
        }
        pending.extend(successors(forest.node(id), all_alternatives));
    }

    let mut results: Vec<Option<R>> = vec![None; root.index() + 1];
    let mut gathered: Vec<R> = Vec::new();
    for (index, _) in reached.iter().enumerate().filter(|(_, r)| **r) {
        let id = NodeId(index as u32);
        let node = forest.node(id);
        gathered.clear();
        for successor in successors(node, all_alternatives) {
            match &results[successor.index()] {
                Some(value) => gathered.push(value.clone()),
                None => unreachable!("successor {successor} is visited before {id}"),
            }
        }
        let value = match node {
            ForestNode::Leaf(leaf) => visit(Visit::Leaf { id, leaf })?,
            ForestNode::Nonterm(nonterm) => visit(Visit::Node {
                id,
                node: nonterm,
                children: &gathered,
            })?,
            ForestNode::Ambiguity(ambiguity) => match resolve.as_mut() {
                Some(resolve) => resolve(ambiguity, &gathered)?,
                None => gathered.swap_remove(0),
            },
        };
        results[index] = Some(value);
    }

    match results.swap_remove(root.index()) {
        Some(value) => Ok(value),
        None => unreachable!("the root is always reached"),
    }
}
