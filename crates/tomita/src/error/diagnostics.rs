//! # Diagnostic Utilities
//!
//! Plain-text rendering of [`ParseError`]s against the source they came from:
//! `line:column` prefixes, a caret under the offending token, and
//! "did you mean" suggestions drawn from the expected-symbol set.

use crate::error::ParseError;
use crate::syntax::{LineIndex, TextRange};
use std::fmt::Write;

/// Best match for `actual` among `expected`, if any is similar enough.
///
/// # Example
///
/// ```rust
/// use tomita::error::diagnostics::did_you_mean;
///
/// let expected = vec!["identifier".to_string(), "number".to_string()];
/// assert_eq!(did_you_mean("identifer", &expected).as_deref(), Some("identifier"));
/// assert_eq!(did_you_mean("+", &expected), None);
/// ```
#[must_use]
pub fn did_you_mean(actual: &str, expected: &[String]) -> Option<String> {
    let actual = actual.to_lowercase();
    let mut best: Option<(&String, f64)> = None;
    for candidate in expected {
        let similarity = string_similarity(&actual, &candidate.to_lowercase());
        if similarity < 0.6 {
            continue;
        }
        match best {
            Some((_, score)) if score >= similarity => {}
            _ => best = Some((candidate, similarity)),
        }
    }
    best.map(|(suggestion, _)| suggestion.clone())
}

/// Render `error` as `name:line:col: message`, followed by the source line and
/// a caret marker when the error has a span.
#[must_use]
pub fn render(error: &ParseError, source: &str, filename: Option<&str>) -> String {
    let mut out = String::new();
    let Some(span) = error.span() else {
        let _ = write!(out, "{error}");
        return out;
    };

    let index = LineIndex::new(source);
    let at = index.line_col(span.start());
    if let Some(filename) = filename {
        let _ = write!(out, "{filename}:");
    }
    let _ = write!(out, "{}:{}: {error}", at.line + 1, at.column + 1);

    if let Some(line) = source.lines().nth(at.line as usize) {
        let width = usize::from(span.len()).max(1);
        let _ = write!(
            out,
            "\n  {line}\n  {}{}",
            " ".repeat(at.column as usize),
            "^".repeat(width)
        );
    }

    if let ParseError::UnexpectedToken {
        found, expected, ..
    } = error
        && let Some(suggestion) = did_you_mean(found, expected)
    {
        let _ = write!(out, "\n  help: did you mean `{suggestion}`?");
    }
    out
}

/// Source text covered by `range`, or `None` if it is out of bounds.
#[must_use]
pub fn source_slice(source: &str, range: TextRange) -> Option<&str> {
    source.get(usize::from(range.start())..usize::from(range.end()))
}

fn string_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let distance = levenshtein_distance(a, b);
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - (distance as f64 / max_len as f64)
}

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
