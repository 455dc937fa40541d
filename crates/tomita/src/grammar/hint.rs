//! Conflict-resolution metadata attached to terminals and productions.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// How operators of equal precedence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Associativity {
    /// `a + b + c` groups as `(a + b) + c`: reduce wins a shift/reduce tie.
    Left,
    /// `a ^ b ^ c` groups as `a ^ (b ^ c)`: shift wins a shift/reduce tie.
    Right,
    /// Chaining is a syntax error: both actions are dropped on a tie.
    NonAssoc,
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
            Self::NonAssoc => f.write_str("nonassoc"),
        }
    }
}

/// Precedence level plus associativity, yacc style.
///
/// Higher levels bind tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Precedence {
    pub level: u32,
    pub associativity: Associativity,
}

impl Precedence {
    #[must_use]
    pub const fn new(level: u32, associativity: Associativity) -> Self {
        Self {
            level,
            associativity,
        }
    }

    /// Compare two levels, ignoring associativity.
    #[must_use]
    pub fn binds_tighter_than(&self, other: &Self) -> Ordering {
        self.level.cmp(&other.level)
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.associativity, self.level)
    }
}

/// Per-production options collected by [`GrammarBuilder::rule_with`].
///
/// [`GrammarBuilder::rule_with`]: crate::grammar::GrammarBuilder::rule_with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductionOptions {
    pub(crate) priority: Option<u32>,
    pub(crate) precedence_of: Option<String>,
    pub(crate) associativity: Option<Associativity>,
}

impl ProductionOptions {
    /// Explicit disambiguation rank. Lower ranks are preferred.
    pub fn priority(&mut self, rank: u32) -> &mut Self {
        self.priority = Some(rank);
        self
    }

    /// Borrow the precedence of a terminal instead of the rightmost one (`%prec`).
    pub fn precedence_of(&mut self, terminal: impl Into<String>) -> &mut Self {
        self.precedence_of = Some(terminal.into());
        self
    }

    /// Override the associativity used when this production meets a shift.
    ///
    /// Without a precedence level the tag only decides conflicts on terminals
    /// of the production's own right-hand side.
    pub fn associativity(&mut self, associativity: Associativity) -> &mut Self {
        self.associativity = Some(associativity);
        self
    }
}
