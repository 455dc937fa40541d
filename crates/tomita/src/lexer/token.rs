use crate::grammar::TerminalId;
use crate::syntax::{TextRange, TextSize};
use compact_str::CompactString;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// A token handed to the parser by an external lexer.
///
/// The parser only looks at [`terminal`](Self::terminal); the text and byte
/// range are carried into the forest leaves for actions and diagnostics.
///
/// # Example
///
/// ```rust
/// use tomita::grammar::{GrammarBuilder, Matcher};
/// use tomita::lexer::Token;
/// use tomita::syntax::{TextRange, TextSize};
///
/// let grammar = GrammarBuilder::new()
///     .terminal("num", Matcher::pattern("[0-9]+"))
///     .rule("E", ["num"])
///     .start("E")
///     .build()
///     .unwrap();
///
/// let num = grammar.terminal_by_name("num").unwrap();
/// let token = Token::new(num, "42", TextRange::at(TextSize::from(0), TextSize::from(2)));
/// assert_eq!(token.text(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Token {
    pub terminal: TerminalId,
    pub text: CompactString,
    pub range: TextRange,
}

impl Token {
    #[must_use]
    pub fn new(terminal: TerminalId, text: impl Into<CompactString>, range: TextRange) -> Self {
        Self {
            terminal,
            text: text.into(),
            range,
        }
    }

    /// Token without source text; its range is empty at `position` bytes.
    #[must_use]
    pub fn synthetic(terminal: TerminalId, position: usize) -> Self {
        Self::new(terminal, "", TextRange::empty(TextSize::of(position)))
    }

    #[must_use]
    pub const fn terminal(&self) -> TerminalId {
        self.terminal
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn range(&self) -> TextRange {
        self.range
    }
}
