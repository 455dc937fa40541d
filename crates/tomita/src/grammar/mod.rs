//! # Grammar Module
//!
//! The in-memory grammar model consumed by the table builder.
//!
//! ## Overview
//!
//! A [`Grammar`] is an immutable description of:
//!
//! - **Terminals**: named, each carrying a [`Matcher`] for the external lexer
//!   and an optional [`Precedence`]
//! - **Non-terminals**: named, each owning zero or more productions
//! - **Productions**: a left-hand side, an ordered right-hand side, and
//!   conflict-resolution metadata (priority, precedence, associativity)
//!
//! Symbols are dense integer ids, so tables and forests index them directly.
//! Terminal `0` is always the end-of-input marker [`TerminalId::EOF`].
//!
//! ## Usage
//!
//! ```rust
//! use tomita::grammar::{GrammarBuilder, Matcher};
//!
//! let grammar = GrammarBuilder::new()
//!     .terminal("id", Matcher::pattern("[a-z]+"))
//!     .literal("+")
//!     .left(["+"])
//!     .rule("E", ["E", "+", "E"])
//!     .rule("E", ["id"])
//!     .start("E")
//!     .build()?;
//!
//! assert_eq!(grammar.productions().len(), 2);
//! # Ok::<(), tomita::GrammarError>(())
//! ```

pub mod analysis;
pub mod builder;
pub mod hint;
pub mod validate;

pub use analysis::{GrammarAnalysis, TerminalSet};
pub use builder::GrammarBuilder;
pub use hint::{Associativity, Precedence, ProductionOptions};
pub use validate::validate_grammar;

pub use crate::error::GrammarError;

use compact_str::CompactString;
use hashbrown::HashMap;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
        pub struct $name(pub(crate) u32);

        impl $name {
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[must_use]
            pub(crate) fn from_index(index: usize) -> Self {
                Self(u32::try_from(index).unwrap_or(u32::MAX))
            }
        }
    };
}

id_type!(
    /// Index of a terminal in [`Grammar::terminals`].
    TerminalId
);
id_type!(
    /// Index of a non-terminal in [`Grammar::nonterminals`].
    NonterminalId
);
id_type!(
    /// Index of a production in [`Grammar::productions`].
    ProductionId
);

impl TerminalId {
    /// The reserved end-of-input terminal.
    pub const EOF: Self = Self(0);

    #[must_use]
    pub const fn is_eof(self) -> bool {
        self.0 == 0
    }
}

/// A grammar symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Symbol {
    Terminal(TerminalId),
    Nonterminal(NonterminalId),
}

impl Symbol {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    #[must_use]
    pub const fn as_terminal(self) -> Option<TerminalId> {
        match self {
            Self::Terminal(t) => Some(t),
            Self::Nonterminal(_) => None,
        }
    }

    #[must_use]
    pub const fn as_nonterminal(self) -> Option<NonterminalId> {
        match self {
            Self::Nonterminal(n) => Some(n),
            Self::Terminal(_) => None,
        }
    }
}

/// How the external lexer recognizes a terminal. The engine never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Matcher {
    Literal(CompactString),
    Pattern(CompactString),
    EndOfInput,
}

impl Matcher {
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self::Literal(text.into())
    }

    #[must_use]
    pub fn pattern(pattern: &str) -> Self {
        Self::Pattern(pattern.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalDef {
    pub(crate) name: CompactString,
    pub(crate) matcher: Matcher,
    pub(crate) precedence: Option<Precedence>,
}

impl TerminalDef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    #[must_use]
    pub const fn precedence(&self) -> Option<Precedence> {
        self.precedence
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonterminalDef {
    pub(crate) name: CompactString,
    pub(crate) productions: Vec<ProductionId>,
}

impl NonterminalDef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn productions(&self) -> &[ProductionId] {
        &self.productions
    }
}

/// A production `lhs -> rhs` with its conflict-resolution metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub(crate) id: ProductionId,
    pub(crate) lhs: NonterminalId,
    pub(crate) rhs: SmallVec<[Symbol; 4]>,
    pub(crate) priority: Option<u32>,
    /// Effective precedence: explicit `%prec`/associativity or the rightmost terminal's.
    pub(crate) precedence: Option<Precedence>,
    /// Associativity tagged on the production itself
    pub(crate) associativity: Option<Associativity>,
}

impl Production {
    #[must_use]
    pub const fn id(&self) -> ProductionId {
        self.id
    }

    #[must_use]
    pub const fn lhs(&self) -> NonterminalId {
        self.lhs
    }

    #[must_use]
    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    /// Explicit disambiguation rank; lower is preferred.
    #[must_use]
    pub const fn priority(&self) -> Option<u32> {
        self.priority
    }

    #[must_use]
    pub const fn precedence(&self) -> Option<Precedence> {
        self.precedence
    }

    /// Associativity set with [`ProductionOptions::associativity`], if any.
    ///
    /// Without a precedence level it still decides shift/reduce ties on the
    /// production's own terminals.
    #[must_use]
    pub const fn associativity(&self) -> Option<Associativity> {
        self.associativity
    }

    /// Whether `terminal` occurs in the right-hand side.
    #[must_use]
    pub fn mentions(&self, terminal: TerminalId) -> bool {
        self.rhs.contains(&Symbol::Terminal(terminal))
    }
}

/// Immutable context-free grammar.
///
/// Built with [`GrammarBuilder`]; cheap to share behind an `Arc` and safe to
/// read from many threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    pub(crate) terminals: Vec<TerminalDef>,
    pub(crate) nonterminals: Vec<NonterminalDef>,
    pub(crate) productions: Vec<Production>,
    pub(crate) start: NonterminalId,
    pub(crate) names: HashMap<CompactString, Symbol, ahash::RandomState>,
}

impl Grammar {
    #[must_use]
    pub const fn start(&self) -> NonterminalId {
        self.start
    }

    /// All terminals, including [`TerminalId::EOF`] at index 0.
    #[must_use]
    pub fn terminals(&self) -> &[TerminalDef] {
        &self.terminals
    }

    #[must_use]
    pub fn nonterminals(&self) -> &[NonterminalDef] {
        &self.nonterminals
    }

    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    #[must_use]
    pub fn terminal(&self, id: TerminalId) -> &TerminalDef {
        &self.terminals[id.index()]
    }

    #[must_use]
    pub fn nonterminal(&self, id: NonterminalId) -> &NonterminalDef {
        &self.nonterminals[id.index()]
    }

    #[must_use]
    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id.index()]
    }

    pub fn productions_for(&self, lhs: NonterminalId) -> impl Iterator<Item = &Production> + '_ {
        self.nonterminals[lhs.index()]
            .productions
            .iter()
            .map(move |id| &self.productions[id.index()])
    }

    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<Symbol> {
        self.names.get(name).copied()
    }

    #[must_use]
    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalId> {
        self.symbol(name).and_then(Symbol::as_terminal)
    }

    #[must_use]
    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalId> {
        self.symbol(name).and_then(Symbol::as_nonterminal)
    }

    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(t) => self.terminal(t).name(),
            Symbol::Nonterminal(n) => self.nonterminal(n).name(),
        }
    }

    /// Look up a production by its left-hand side and right-hand side names.
    #[must_use]
    pub fn find_production(&self, lhs: &str, rhs: &[&str]) -> Option<ProductionId> {
        let lhs = self.nonterminal_by_name(lhs)?;
        self.productions_for(lhs)
            .find(|p| {
                p.rhs.len() == rhs.len()
                    && p.rhs
                        .iter()
                        .zip(rhs)
                        .all(|(sym, name)| self.symbol_name(*sym) == *name)
            })
            .map(Production::id)
    }

    /// Render a production as `E -> E + E`.
    #[must_use]
    pub fn display_production(&self, id: ProductionId) -> ProductionDisplay<'_> {
        ProductionDisplay { grammar: self, id }
    }
}

pub struct ProductionDisplay<'g> {
    grammar: &'g Grammar,
    id: ProductionId,
}

impl fmt::Display for ProductionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let production = self.grammar.production(self.id);
        write!(f, "{} ->", self.grammar.nonterminal(production.lhs).name())?;
        if production.rhs.is_empty() {
            return f.write_str(" ε");
        }
        for symbol in &production.rhs {
            write!(f, " {}", self.grammar.symbol_name(*symbol))?;
        }
        Ok(())
    }
}
