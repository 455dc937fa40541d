//! # Parser Facade
//!
//! [`Parser`] bundles a shared automaton with a [`GlrConfig`] so one grammar
//! can be compiled once and used for many inputs, from many threads.

pub mod parallel;

pub use parallel::{BatchResult, ParseBatch, ProgressCallback};

use crate::backend::glr::{Forest, GlrConfig, StackMachine};
use crate::backend::lr::{Automaton, build_automaton};
use crate::error::{GrammarError, ParseError};
use crate::grammar::Grammar;
use crate::lexer::Token;
use std::sync::Arc;

/// A compiled grammar ready to parse token streams.
///
/// Cloning is cheap; clones share the automaton.
///
/// # Example
///
/// ```rust
/// use tomita::grammar::GrammarBuilder;
/// use tomita::parser::Parser;
/// use tomita::testing::WordLexer;
///
/// let grammar = GrammarBuilder::new()
///     .literal("a")
///     .literal("b")
///     .rule("S", ["a", "S", "b"])
///     .rule("S", [])
///     .start("S")
///     .build()?;
/// let parser = Parser::new(&grammar)?;
/// let lexer = WordLexer::new(&grammar);
///
/// assert!(parser.parse(lexer.tokenize("a a b b").unwrap()).is_ok());
/// assert!(parser.parse(lexer.tokenize("a b b").unwrap()).is_err());
/// # Ok::<(), tomita::GrammarError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    automaton: Arc<Automaton>,
    config: GlrConfig,
}

impl Parser {
    /// Validate `grammar` and build its automaton.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] if the grammar is rejected.
    pub fn new(grammar: &Grammar) -> Result<Self, GrammarError> {
        Ok(Self::from_automaton(Arc::new(build_automaton(grammar)?)))
    }

    #[must_use]
    pub fn from_automaton(automaton: Arc<Automaton>) -> Self {
        Self {
            automaton,
            config: GlrConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: GlrConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &GlrConfig {
        &self.config
    }

    #[must_use]
    pub const fn automaton(&self) -> &Arc<Automaton> {
        &self.automaton
    }

    #[must_use]
    pub fn grammar(&self) -> &Arc<Grammar> {
        self.automaton.grammar()
    }

    /// Parse a complete token stream.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the input is rejected or the parse is
    /// cancelled.
    pub fn parse<I>(&self, tokens: I) -> Result<Forest, ParseError>
    where
        I: IntoIterator<Item = Token>,
    {
        self.machine(tokens).run()
    }

    /// A stack machine over `tokens`, to be driven step by step.
    pub fn machine<I>(&self, tokens: I) -> StackMachine<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Token>,
    {
        StackMachine::new(&self.automaton, tokens, self.config.clone())
    }
}
