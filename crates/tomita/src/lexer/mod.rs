//! # Token Stream
//!
//! The parser is lexer-agnostic: it consumes any `IntoIterator<Item = Token>`
//! whose tokens name terminals of the grammar the automaton was built from.
//! End of input is implicit and must not appear in the stream.
//!
//! [`crate::testing::WordLexer`] is a small whitespace-splitting lexer for
//! tests and examples.

pub mod token;

pub use token::Token;
