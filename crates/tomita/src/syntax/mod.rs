//! # Syntax Module
//!
//! Everything downstream of a parse forest.
//!
//! ## Overview
//!
//! - [`text`]: token spans and byte ranges
//! - [`tree`]: concrete [`Tree`]s, one choice per ambiguity
//! - [`extract`]: counting and enumerating the trees of a forest
//! - [`visitor`]: memoized post-order traversal of a forest
//! - [`evaluate`]: semantic actions run over that traversal
//!
//! Nothing here mutates a [`Forest`](crate::backend::glr::Forest).

pub mod evaluate;
pub mod extract;
pub mod text;
pub mod tree;
pub mod visitor;

pub use evaluate::{Actions, BoxError, evaluate, evaluate_with};
pub use extract::{Trees, all_trees, count_trees, first_tree, nth_tree, prioritized_tree};
pub use text::*;
pub use tree::{Tree, TreeDisplay};
pub use visitor::{Visit, traverse, traverse_with, try_traverse};
