//! Graph-structured stack
//!
//! All parser stacks share one arena of nodes. A node is an LR state at an
//! input level; an edge points to the node below it and is labeled with the
//! forest node for the symbol between them. Stacks that reach the same state
//! at the same level are merged into one node, so the number of live nodes
//! per level is bounded by the number of states.
//!
//! Edges may join two nodes of the same level when the label derives ε.

use crate::backend::glr::forest::NodeId;
use crate::backend::lr::StateId;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GssEdge {
    pub target: usize,
    pub label: NodeId,
}

#[derive(Debug, Clone)]
pub(crate) struct GssNode {
    pub state: StateId,
    pub level: usize,
    pub edges: SmallVec<[GssEdge; 2]>,
}

/// A reduction path: the node at its bottom and the labels read left to right.
#[derive(Debug, Clone)]
pub(crate) struct GssPath {
    pub bottom: usize,
    pub labels: SmallVec<[NodeId; 4]>,
}

/// An edge, named by its source node and its index in that node's edge list.
pub(crate) type EdgeRef = (usize, usize);

#[derive(Debug, Default)]
pub(crate) struct Gss {
    nodes: Vec<GssNode>,
    live_at_last_sweep: usize,
}

impl Gss {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, state: StateId, level: usize) -> usize {
        self.nodes.push(GssNode {
            state,
            level,
            edges: SmallVec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn node(&self, index: usize) -> &GssNode {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Add `from -> target`, returning the new edge, or `None` if an edge to
    /// `target` already exists.
    pub fn add_edge(&mut self, from: usize, target: usize, label: NodeId) -> Option<EdgeRef> {
        let edges = &mut self.nodes[from].edges;
        if edges.iter().any(|e| e.target == target) {
            return None;
        }
        edges.push(GssEdge { target, label });
        Some((from, edges.len() - 1))
    }

    /// All paths of exactly `len` edges starting at `from`.
    ///
    /// With `through`, only paths that traverse that edge are returned. A
    /// zero-length path never traverses an edge.
    pub fn paths(&self, from: usize, len: usize, through: Option<EdgeRef>) -> Vec<GssPath> {
        let mut out = Vec::new();
        if len == 0 {
            if through.is_none() {
                out.push(GssPath {
                    bottom: from,
                    labels: SmallVec::new(),
                });
            }
            return out;
        }
        let mut labels = SmallVec::<[NodeId; 4]>::with_capacity(len);
        self.walk(from, len, through, through.is_none(), &mut labels, &mut out);
        out
    }

    fn walk(
        &self,
        node: usize,
        remaining: usize,
        through: Option<EdgeRef>,
        seen_through: bool,
        labels: &mut SmallVec<[NodeId; 4]>,
        out: &mut Vec<GssPath>,
    ) {
        if remaining == 0 {
            if seen_through {
                let mut ordered = labels.clone();
                ordered.reverse();
                out.push(GssPath {
                    bottom: node,
                    labels: ordered,
                });
            }
            return;
        }
        for (index, edge) in self.nodes[node].edges.iter().enumerate() {
            let hit = seen_through || through == Some((node, index));
            labels.push(edge.label);
            self.walk(edge.target, remaining - 1, through, hit, labels, out);
            labels.pop();
        }
    }

    /// Whether the arena has grown enough since the last sweep to warrant one.
    pub fn should_sweep(&self, threshold: usize) -> bool {
        self.nodes.len() >= 2 * self.live_at_last_sweep.max(threshold)
    }

    /// Drop nodes unreachable from `frontier`, compacting the arena and
    /// rewriting `frontier` to the new indices.
    pub fn sweep(&mut self, frontier: &mut [usize]) {
        let mut live = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = frontier.to_vec();
        while let Some(index) = stack.pop() {
            if live[index] {
                continue;
            }
            live[index] = true;
            stack.extend(self.nodes[index].edges.iter().map(|e| e.target));
        }

        let mut remap = vec![usize::MAX; self.nodes.len()];
        let mut kept = Vec::with_capacity(live.iter().filter(|l| **l).count());
        for (old, node) in std::mem::take(&mut self.nodes).into_iter().enumerate() {
            if live[old] {
                remap[old] = kept.len();
                kept.push(node);
            }
        }
        for node in &mut kept {
            for edge in &mut node.edges {
                edge.target = remap[edge.target];
            }
        }
        for index in frontier.iter_mut() {
            *index = remap[*index];
        }
        self.live_at_last_sweep = kept.len();
        self.nodes = kept;
    }
}
