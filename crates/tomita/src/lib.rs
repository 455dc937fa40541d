//! # Tomita
//!
//! Generalized LR parsing for arbitrary context-free grammars.
//!
//! ## Overview
//!
//! Tomita accepts any context-free grammar without cycles, including
//! ambiguous ones, and returns every parse of the input packed into a single
//! shared forest of polynomial size:
//!
//! - **Grammar model**: terminals, non-terminals and productions with
//!   precedence, associativity and priority hints ([`grammar`])
//! - **Table builder**: canonical LR(1) tables that keep every conflict
//!   ([`backend::lr`])
//! - **Stack machine**: Tomita's algorithm over a graph-structured stack
//!   ([`backend::glr`])
//! - **Parse forest**: shared subtrees and packed ambiguities
//!   ([`Forest`])
//! - **Extraction and evaluation**: trees one at a time, tree counts, and
//!   memoized semantic actions ([`syntax`])
//!
//! The engine is lexer-agnostic: it consumes [`Token`]s whose terminal ids
//! come from the grammar.
//!
//! ## Quick Start
//!
//! ```rust
//! use tomita::grammar::{GrammarBuilder, Matcher};
//! use tomita::syntax::{all_trees, count_trees, evaluate, Actions};
//! use tomita::testing::WordLexer;
//! use tomita::{ConflictPolicy, GlrConfig, Parser};
//!
//! // 1. Describe the language. `E -> E - E` is ambiguous on purpose.
//! let grammar = GrammarBuilder::new()
//!     .terminal("num", Matcher::pattern("[0-9]+"))
//!     .literal("-")
//!     .rule("E", ["E", "-", "E"])
//!     .rule("E", ["num"])
//!     .start("E")
//!     .build()?;
//!
//! // 2. Compile it once; keep every derivation.
//! let parser = Parser::new(&grammar)?
//!     .with_config(GlrConfig::default().with_conflict_policy(ConflictPolicy::KeepAll));
//!
//! // 3. Parse a token stream from any lexer.
//! let tokens = WordLexer::new(&grammar).tokenize("8 - 4 - 2").unwrap();
//! let forest = parser.parse(tokens).unwrap();
//! assert_eq!(count_trees(&forest), 2);
//! assert_eq!(all_trees(&forest).count(), 2);
//!
//! // 4. Evaluate with semantic actions.
//! let actions = Actions::new()
//!     .on_token(|leaf| Ok(leaf.text.parse::<i64>().unwrap_or(0)))
//!     .on_rule(&grammar, "E", &["E", "-", "E"], |v, _| Ok(v[0] - v[2]))
//!     .unwrap()
//!     .on_rule(&grammar, "E", &["num"], |v, _| Ok(v[0]))
//!     .unwrap();
//! let value = evaluate(&forest, &actions).unwrap();
//! assert!(value == 2 || value == 6);
//! # Ok::<(), tomita::GrammarError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel`: batch parsing on rayon's thread pool
//! - `serialize`: serde support for configuration, forests and trees
//! - `diagnostics`: miette diagnostics for the error types

pub mod backend;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod testing;

// Re-export commonly used types
pub use backend::glr::{
    CancellationFlag, ConflictPolicy, Forest, ForestNode, GlrConfig, NodeId, ParseMetrics, Phase,
    StackMachine, parse, parse_with,
};
pub use backend::lr::{Action, Automaton, StateId, build_automaton};
pub use error::{ActionError, GrammarError, ParseError, ParseResult};
pub use grammar::{Grammar, GrammarBuilder, Matcher, ProductionId, Symbol, TerminalId};
pub use lexer::Token;
pub use parser::Parser;
pub use syntax::{
    Actions, Span, TextRange, TextSize, Tree, Visit, all_trees, count_trees, evaluate,
    first_tree, traverse,
};
