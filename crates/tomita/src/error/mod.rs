//! # Error Types
//!
//! ## Overview
//!
//! - [`GrammarError`]: the grammar is malformed and no automaton can be built.
//! - [`ParseError`]: the input was rejected. Carries the furthest position
//!   reached and the terminals that would have been accepted there.
//! - [`ActionError`]: a semantic action is missing or failed during
//!   evaluation. The forest is left untouched.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! for rich error reporting with source code snippets. [`diagnostics`] offers
//! plain-text rendering without it.

pub mod diagnostics;

use crate::syntax::{Span, TextRange};
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Convenience alias for results carrying a [`ParseError`].
pub type ParseResult<T> = Result<T, ParseError>;

/// A grammar could not be turned into an automaton.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("no start symbol was declared")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::missing_start)))]
    MissingStart,

    #[error("start symbol `{name}` is a terminal")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::invalid_start)))]
    InvalidStart { name: String },

    #[error("symbol `{name}` is neither a declared terminal nor the head of a rule")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::undefined_symbol),
            help("declare it with `terminal`/`literal` or add a rule for it")
        )
    )]
    UndefinedSymbol { name: String },

    #[error("terminal `{name}` is declared more than once")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_terminal)))]
    DuplicateTerminal { name: String },

    #[error("terminal `{name}` is used as the left-hand side of a rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::terminal_as_rule)))]
    TerminalAsRule { name: String },

    #[error("non-terminals unreachable from the start symbol: {}", .names.join(", "))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unreachable)))]
    Unreachable { names: Vec<String> },

    #[error("non-terminals that derive no terminal string: {}", .names.join(", "))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::unproductive)))]
    Unproductive { names: Vec<String> },

    #[error("non-terminals that derive themselves: {}", .names.join(", "))]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::cyclic),
            help("a cyclic grammar has infinitely many parses of some inputs")
        )
    )]
    Cyclic { names: Vec<String> },
}

/// The input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    #[error("unexpected `{found}` at token {position}, expected {}", format_expected_list(.expected))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::unexpected_token)))]
    UnexpectedToken {
        position: usize,
        #[cfg_attr(feature = "diagnostics", label("unexpected token"))]
        span: TextRange,
        found: String,
        expected: Vec<String>,
    },

    #[error("unexpected end of input after {position} tokens, expected {}", format_expected_list(.expected))]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::unexpected_eof)))]
    UnexpectedEof {
        position: usize,
        #[cfg_attr(feature = "diagnostics", label("input ends here"))]
        span: TextRange,
        expected: Vec<String>,
    },

    #[error("token {position} names terminal #{terminal}, which the grammar does not define")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::invalid_token)))]
    InvalidToken {
        position: usize,
        #[cfg_attr(feature = "diagnostics", label("invalid token"))]
        span: TextRange,
        terminal: u32,
    },

    #[error("parse cancelled at token {position}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::cancelled)))]
    Cancelled { position: usize },
}

impl ParseError {
    /// Index of the token where parsing stopped.
    #[must_use]
    pub const fn position(&self) -> usize {
        match self {
            Self::UnexpectedToken { position, .. }
            | Self::UnexpectedEof { position, .. }
            | Self::InvalidToken { position, .. }
            | Self::Cancelled { position } => *position,
        }
    }

    /// Terminals that would have been accepted at [`position`](Self::position).
    #[must_use]
    pub fn expected_symbols(&self) -> &[String] {
        match self {
            Self::UnexpectedToken { expected, .. } | Self::UnexpectedEof { expected, .. } => {
                expected
            }
            Self::InvalidToken { .. } | Self::Cancelled { .. } => &[],
        }
    }

    /// Byte range of the offending token, if known.
    #[must_use]
    pub const fn span(&self) -> Option<TextRange> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEof { span, .. }
            | Self::InvalidToken { span, .. } => Some(*span),
            Self::Cancelled { .. } => None,
        }
    }

    /// Format the expected symbols as `a, b, or c`.
    #[must_use]
    pub fn format_expected(&self) -> String {
        format_expected_list(self.expected_symbols())
    }
}

/// Format a list of expected tokens as a human-readable string.
#[must_use]
pub fn format_expected_list(expected: &[String]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [one] => format!("`{one}`"),
        [a, b] => format!("`{a}` or `{b}`"),
        [init @ .., last] => {
            let mut result = init
                .iter()
                .map(|s| format!("`{s}`"))
                .collect::<Vec<_>>()
                .join(", ");
            result.push_str(", or `");
            result.push_str(last);
            result.push('`');
            result
        }
    }
}

/// A semantic action could not produce a value.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ActionError {
    #[error("no action registered for `{production}` (tokens {span})")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(actions::missing_action)))]
    MissingAction { production: String, span: Span },

    #[error("no token action registered (token `{text}` at {position})")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(actions::missing_token_action)))]
    MissingTokenAction { text: String, position: usize },

    #[error("action for `{production}` failed: {source}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(actions::failed)))]
    Failed {
        production: String,
        span: Span,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("no production `{rule}` in the grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(actions::unknown_rule)))]
    UnknownRule { rule: String },

    #[error("the forest has no root")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(actions::empty_forest)))]
    EmptyForest,
}
