use crate::grammar::{Grammar, Matcher, TerminalId};
use crate::lexer::Token;
use crate::syntax::{TextRange, TextSize};
use compact_str::CompactString;
use hashbrown::HashMap;
use thiserror::Error;

/// A word no terminal of the grammar accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no terminal matches `{word}` at byte {offset}")]
pub struct UnknownWord {
    pub word: String,
    pub offset: usize,
}

/// Whitespace-separated lexer over a grammar's terminal matchers.
///
/// A word becomes the terminal whose literal it equals. Otherwise it goes to
/// the first pattern terminal that accepts it. Patterns of the form `[...]+`
/// or `[...]*` are checked against their character class (ranges like `a-z`
/// are supported); any other pattern accepts every word.
#[derive(Debug, Clone)]
pub struct WordLexer {
    literals: HashMap<CompactString, TerminalId, ahash::RandomState>,
    patterns: Vec<(TerminalId, Option<CharClass>)>,
}

impl WordLexer {
    #[must_use]
    pub fn new(grammar: &Grammar) -> Self {
        let mut literals = HashMap::with_hasher(ahash::RandomState::new());
        let mut patterns = Vec::new();
        for (index, terminal) in grammar.terminals().iter().enumerate() {
            let id = TerminalId::from_index(index);
            match terminal.matcher() {
                Matcher::Literal(text) => {
                    literals.entry(text.clone()).or_insert(id);
                }
                Matcher::Pattern(pattern) => patterns.push((id, CharClass::parse(pattern))),
                Matcher::EndOfInput => {}
            }
        }
        Self { literals, patterns }
    }

    /// Split `input` on whitespace and classify every word.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownWord`] for the first word no terminal accepts.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token>, UnknownWord> {
        let mut tokens = Vec::new();
        let mut offset = 0;
        for piece in input.split_inclusive(char::is_whitespace) {
            let word = piece.trim_end();
            if !word.is_empty() {
                let terminal = self.classify(word).ok_or_else(|| UnknownWord {
                    word: word.to_string(),
                    offset,
                })?;
                let range = TextRange::at(TextSize::of(offset), TextSize::of(word.len()));
                tokens.push(Token::new(terminal, word, range));
            }
            offset += piece.len();
        }
        Ok(tokens)
    }

    fn classify(&self, word: &str) -> Option<TerminalId> {
        if let Some(&terminal) = self.literals.get(word) {
            return Some(terminal);
        }
        self.patterns
            .iter()
            .find(|(_, class)| class.as_ref().is_none_or(|class| class.accepts(word)))
            .map(|(terminal, _)| *terminal)
    }
}

/// A bracketed character class with a repetition suffix.
#[derive(Debug, Clone)]
struct CharClass {
    ranges: Vec<(char, char)>,
    allow_empty: bool,
}

impl CharClass {
    fn parse(pattern: &str) -> Option<Self> {
        let (body, allow_empty) = if let Some(body) = pattern.strip_suffix('+') {
            (body, false)
        } else {
            (pattern.strip_suffix('*')?, true)
        };
        let body = body.strip_prefix('[')?.strip_suffix(']')?;
        let chars: Vec<char> = body.chars().collect();
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if i + 2 < chars.len() && chars[i + 1] == '-' {
                ranges.push((chars[i], chars[i + 2]));
                i += 3;
            } else {
                ranges.push((chars[i], chars[i]));
                i += 1;
            }
        }
        Some(Self {
            ranges,
            allow_empty,
        })
    }

    fn accepts(&self, word: &str) -> bool {
        (self.allow_empty || !word.is_empty())
            && word
                .chars()
                .all(|c| self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    fn grammar() -> Grammar {
        GrammarBuilder::new()
            .terminal("num", Matcher::pattern("[0-9]+"))
            .terminal("id", Matcher::pattern("[a-z_]+"))
            .literal("+")
            .literal("if")
            .rule("E", ["E", "+", "E"])
            .rule("E", ["num"])
            .rule("E", ["id"])
            .rule("E", ["if"])
            .start("E")
            .build()
            .unwrap()
    }

    #[test]
    fn test_literals_win_over_patterns() {
        let g = grammar();
        let tokens = WordLexer::new(&g).tokenize("if + x_1").unwrap_err();
        assert_eq!(tokens.word, "x_1");
        assert_eq!(tokens.offset, 5);

        let tokens = WordLexer::new(&g).tokenize("if  +\n42").unwrap();
        let names: Vec<&str> = tokens
            .iter()
            .map(|t| g.terminal(t.terminal).name())
            .collect();
        assert_eq!(names, ["if", "+", "num"]);
        assert_eq!(
            tokens[2].range,
            TextRange::new(TextSize::from(6), TextSize::from(8))
        );
    }

    #[test]
    fn test_empty_input() {
        let g = grammar();
        assert!(WordLexer::new(&g).tokenize("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_char_class() {
        let class = CharClass::parse("[a-c_]+").unwrap();
        assert!(class.accepts("ab_c"));
        assert!(!class.accepts("abd"));
        assert!(!class.accepts(""));
        assert!(CharClass::parse("[0-9]*").unwrap().accepts(""));
        assert!(CharClass::parse("\\d+").is_none());
    }
}
