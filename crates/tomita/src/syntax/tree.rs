use crate::grammar::{Grammar, NonterminalId, ProductionId, TerminalId};
use crate::syntax::Span;
use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A concrete parse tree: one choice made at every ambiguity of a forest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Tree {
    Leaf {
        terminal: TerminalId,
        text: CompactString,
        span: Span,
    },
    Node {
        production: ProductionId,
        lhs: NonterminalId,
        children: Vec<Tree>,
        span: Span,
    },
}

impl Tree {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Leaf { span, .. } | Self::Node { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Tree] {
        match self {
            Self::Leaf { .. } => &[],
            Self::Node { children, .. } => children,
        }
    }

    #[must_use]
    pub const fn production(&self) -> Option<ProductionId> {
        match self {
            Self::Leaf { .. } => None,
            Self::Node { production, .. } => Some(*production),
        }
    }

    /// Number of tree nodes, leaves included.
    #[must_use]
    pub fn size(&self) -> usize {
        let mut size = 0;
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            size += 1;
            stack.extend(tree.children());
        }
        size
    }

    /// Leaf texts in order.
    #[must_use]
    pub fn yield_text(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            match tree {
                Self::Leaf { text, .. } => out.push(text.as_str()),
                Self::Node { children, .. } => stack.extend(children.iter().rev()),
            }
        }
        out
    }

    /// S-expression rendering with grammar names, e.g. `(E (E a) + (E a))`.
    ///
    /// Leaves print their text, or the terminal name when the text is empty.
    #[must_use]
    pub const fn display<'t>(&'t self, grammar: &'t Grammar) -> TreeDisplay<'t> {
        TreeDisplay {
            tree: self,
            grammar,
        }
    }
}

pub struct TreeDisplay<'t> {
    tree: &'t Tree,
    grammar: &'t Grammar,
}

enum Step<'t> {
    /// Print a subtree, after a space unless it is the first item
    Enter(&'t Tree, bool),
    Close,
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = vec![Step::Enter(self.tree, false)];
        while let Some(step) = stack.pop() {
            let (tree, spaced) = match step {
                Step::Close => {
                    f.write_str(")")?;
                    continue;
                }
                Step::Enter(tree, spaced) => (tree, spaced),
            };
            if spaced {
                f.write_str(" ")?;
            }
            match tree {
                Tree::Leaf { terminal, text, .. } => {
                    if text.is_empty() {
                        f.write_str(self.grammar.terminal(*terminal).name())?;
                    } else {
                        f.write_str(text)?;
                    }
                }
                Tree::Node { lhs, children, .. } => {
                    write!(f, "({}", self.grammar.nonterminal(*lhs).name())?;
                    stack.push(Step::Close);
                    stack.extend(children.iter().rev().map(|child| Step::Enter(child, true)));
                }
            }
        }
        Ok(())
    }
}

impl Drop for Tree {
    fn drop(&mut self) {
        let Self::Node { children, .. } = self else {
            return;
        };
        if children.iter().all(|child| child.children().is_empty()) {
            return;
        }
        // Unlink grandchildren first so no drop recurses more than one level.
        let mut pending = std::mem::take(children);
        while let Some(mut tree) = pending.pop() {
            if let Self::Node { children, .. } = &mut tree {
                pending.append(children);
            }
        }
    }
}
