use crate::error::GrammarError;
use crate::grammar::{
    Associativity, Grammar, Matcher, NonterminalDef, NonterminalId, Precedence, Production,
    ProductionId, ProductionOptions, Symbol, TerminalDef, TerminalId,
};
use compact_str::CompactString;
use hashbrown::HashMap;
use lasso::{Rodeo, Spur};
use smallvec::SmallVec;

/// Name of the reserved end-of-input terminal.
pub const EOF_NAME: &str = "$end";

struct PendingRule {
    lhs: Spur,
    rhs: Vec<Spur>,
    options: ProductionOptions,
}

/// Fluent builder for [`Grammar`].
///
/// Symbols are referred to by name. A name is a terminal if it was declared
/// with [`terminal`](Self::terminal) or [`literal`](Self::literal); otherwise
/// it must be the left-hand side of at least one rule.
///
/// Precedence is declared yacc style: every call to [`left`](Self::left),
/// [`right`](Self::right) or [`nonassoc`](Self::nonassoc) opens a new level
/// that binds tighter than all previous ones.
///
/// # Example
///
/// ```rust
/// use tomita::grammar::{Associativity, GrammarBuilder, Matcher};
///
/// let grammar = GrammarBuilder::new()
///     .terminal("num", Matcher::pattern("[0-9]+"))
///     .literal("-")
///     .literal("*")
///     .left(["-"])
///     .left(["*"])
///     .rule("E", ["E", "-", "E"])
///     .rule("E", ["E", "*", "E"])
///     .rule_with("E", ["-", "E"], |opts| {
///         opts.precedence_of("*").associativity(Associativity::Right);
///     })
///     .rule("E", ["num"])
///     .start("E")
///     .build()
///     .expect("valid grammar");
///
/// assert_eq!(grammar.nonterminals().len(), 1);
/// ```
pub struct GrammarBuilder {
    interner: Rodeo,
    terminals: Vec<(Spur, Matcher)>,
    precedence: Vec<(Associativity, Vec<Spur>)>,
    rules: Vec<PendingRule>,
    start: Option<Spur>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interner: Rodeo::new(),
            terminals: Vec::new(),
            precedence: Vec::new(),
            rules: Vec::new(),
            start: None,
        }
    }

    /// Declare a terminal with an explicit matcher.
    #[must_use]
    pub fn terminal(mut self, name: &str, matcher: Matcher) -> Self {
        let key = self.interner.get_or_intern(name);
        self.terminals.push((key, matcher));
        self
    }

    /// Declare a terminal named by, and matching, its literal text.
    #[must_use]
    pub fn literal(self, text: &str) -> Self {
        self.terminal(text, Matcher::literal(text))
    }

    /// Open a new precedence level with the given associativity.
    #[must_use]
    pub fn precedence<'a>(
        mut self,
        associativity: Associativity,
        terminals: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let keys = terminals
            .into_iter()
            .map(|name| self.interner.get_or_intern(name))
            .collect();
        self.precedence.push((associativity, keys));
        self
    }

    #[must_use]
    pub fn left<'a>(self, terminals: impl IntoIterator<Item = &'a str>) -> Self {
        self.precedence(Associativity::Left, terminals)
    }

    #[must_use]
    pub fn right<'a>(self, terminals: impl IntoIterator<Item = &'a str>) -> Self {
        self.precedence(Associativity::Right, terminals)
    }

    #[must_use]
    pub fn nonassoc<'a>(self, terminals: impl IntoIterator<Item = &'a str>) -> Self {
        self.precedence(Associativity::NonAssoc, terminals)
    }

    /// Add `lhs -> rhs`. An empty `rhs` is an ε-production.
    #[must_use]
    pub fn rule<'a>(self, lhs: &str, rhs: impl IntoIterator<Item = &'a str>) -> Self {
        self.rule_with(lhs, rhs, |_| {})
    }

    /// Add `lhs -> rhs` and configure its priority, precedence or associativity.
    #[must_use]
    pub fn rule_with<'a>(
        mut self,
        lhs: &str,
        rhs: impl IntoIterator<Item = &'a str>,
        f: impl FnOnce(&mut ProductionOptions),
    ) -> Self {
        let lhs = self.interner.get_or_intern(lhs);
        let rhs = rhs
            .into_iter()
            .map(|name| self.interner.get_or_intern(name))
            .collect();
        let mut options = ProductionOptions::default();
        f(&mut options);
        self.rules.push(PendingRule { lhs, rhs, options });
        self
    }

    #[must_use]
    pub fn start(mut self, name: &str) -> Self {
        self.start = Some(self.interner.get_or_intern(name));
        self
    }

    /// Resolve names and produce the grammar.
    ///
    /// Structural checks only; reachability, productivity and cycles are
    /// checked by [`build_automaton`](crate::build_automaton).
    ///
    /// # Errors
    ///
    /// Returns an error if the start symbol is missing or not a non-terminal,
    /// a terminal is declared twice or used as a rule head, or a name is
    /// referenced but never defined.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let Self {
            interner,
            terminals: terminal_decls,
            precedence,
            rules,
            start,
        } = self;
        let name_of = |key: Spur| -> CompactString { interner.resolve(&key).into() };

        let mut names: HashMap<CompactString, Symbol, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());
        let mut by_key: HashMap<Spur, Symbol, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());

        let mut terminals = vec![TerminalDef {
            name: EOF_NAME.into(),
            matcher: Matcher::EndOfInput,
            precedence: None,
        }];
        names.insert(EOF_NAME.into(), Symbol::Terminal(TerminalId::EOF));

        for (key, matcher) in terminal_decls {
            let name = name_of(key);
            if by_key.contains_key(&key) || name == EOF_NAME {
                return Err(GrammarError::DuplicateTerminal {
                    name: name.to_string(),
                });
            }
            let symbol = Symbol::Terminal(TerminalId::from_index(terminals.len()));
            terminals.push(TerminalDef {
                name: name.clone(),
                matcher,
                precedence: None,
            });
            by_key.insert(key, symbol);
            names.insert(name, symbol);
        }

        for (level, (associativity, keys)) in precedence.into_iter().enumerate() {
            let level = u32::try_from(level + 1).unwrap_or(u32::MAX);
            for key in keys {
                let Some(Symbol::Terminal(t)) = by_key.get(&key).copied() else {
                    return Err(GrammarError::UndefinedSymbol {
                        name: name_of(key).to_string(),
                    });
                };
                terminals[t.index()].precedence = Some(Precedence::new(level, associativity));
            }
        }

        let mut nonterminals: Vec<NonterminalDef> = Vec::new();
        for rule in &rules {
            match by_key.get(&rule.lhs) {
                Some(Symbol::Terminal(_)) => {
                    return Err(GrammarError::TerminalAsRule {
                        name: name_of(rule.lhs).to_string(),
                    });
                }
                Some(Symbol::Nonterminal(_)) => {}
                None => {
                    let name = name_of(rule.lhs);
                    let symbol =
                        Symbol::Nonterminal(NonterminalId::from_index(nonterminals.len()));
                    nonterminals.push(NonterminalDef {
                        name: name.clone(),
                        productions: Vec::new(),
                    });
                    by_key.insert(rule.lhs, symbol);
                    names.insert(name, symbol);
                }
            }
        }

        let start_key = start.ok_or(GrammarError::MissingStart)?;
        let start = match by_key.get(&start_key) {
            Some(Symbol::Nonterminal(n)) => *n,
            Some(Symbol::Terminal(_)) => {
                return Err(GrammarError::InvalidStart {
                    name: name_of(start_key).to_string(),
                });
            }
            None => {
                return Err(GrammarError::UndefinedSymbol {
                    name: name_of(start_key).to_string(),
                });
            }
        };

        let mut productions = Vec::with_capacity(rules.len());
        for rule in rules {
            let lhs = by_key
                .get(&rule.lhs)
                .and_then(|s| s.as_nonterminal())
                .ok_or_else(|| GrammarError::UndefinedSymbol {
                    name: name_of(rule.lhs).to_string(),
                })?;
            let rhs = rule
                .rhs
                .iter()
                .map(|key| {
                    by_key
                        .get(key)
                        .copied()
                        .ok_or_else(|| GrammarError::UndefinedSymbol {
                            name: name_of(*key).to_string(),
                        })
                })
                .collect::<Result<SmallVec<[Symbol; 4]>, _>>()?;

            let precedence = effective_precedence(&terminals, &rhs, &rule.options, &names)?;
            let id = ProductionId::from_index(productions.len());
            nonterminals[lhs.index()].productions.push(id);
            productions.push(Production {
                id,
                lhs,
                rhs,
                priority: rule.options.priority,
                precedence,
                associativity: rule.options.associativity,
            });
        }

        Ok(Grammar {
            terminals,
            nonterminals,
            productions,
            start,
            names,
        })
    }
}

fn effective_precedence(
    terminals: &[TerminalDef],
    rhs: &[Symbol],
    options: &ProductionOptions,
    names: &HashMap<CompactString, Symbol, ahash::RandomState>,
) -> Result<Option<Precedence>, GrammarError> {
    let borrowed = match options.precedence_of.as_deref() {
        Some(name) => match names.get(name) {
            Some(Symbol::Terminal(t)) => terminals[t.index()].precedence,
            _ => {
                return Err(GrammarError::UndefinedSymbol {
                    name: name.to_string(),
                });
            }
        },
        None => rhs
            .iter()
            .rev()
            .filter_map(|sym| sym.as_terminal())
            .find_map(|t| terminals[t.index()].precedence),
    };

    Ok(match (borrowed, options.associativity) {
        (Some(prec), Some(associativity)) => Some(Precedence::new(prec.level, associativity)),
        (Some(prec), None) => Some(prec),
        (None, _) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr_builder() -> GrammarBuilder {
        GrammarBuilder::new()
            .terminal("id", Matcher::pattern("[a-z]+"))
            .literal("+")
            .literal("*")
    }

    #[test]
    fn test_missing_start() {
        let result = expr_builder().rule("E", ["id"]).build();
        assert_eq!(result, Err(GrammarError::MissingStart));
    }

    #[test]
    fn test_undefined_symbol() {
        let result = expr_builder().rule("E", ["E", "-", "E"]).start("E").build();
        assert_eq!(
            result,
            Err(GrammarError::UndefinedSymbol { name: "-".into() })
        );
    }

    #[test]
    fn test_terminal_as_rule() {
        let result = expr_builder().rule("id", ["+"]).start("id").build();
        assert_eq!(
            result,
            Err(GrammarError::TerminalAsRule { name: "id".into() })
        );
    }

    #[test]
    fn test_duplicate_terminal() {
        let result = expr_builder().literal("+").rule("E", ["id"]).start("E").build();
        assert_eq!(
            result,
            Err(GrammarError::DuplicateTerminal { name: "+".into() })
        );
    }

    #[test]
    fn test_eof_is_terminal_zero() {
        let grammar = expr_builder().rule("E", ["id"]).start("E").build().unwrap();
        assert_eq!(grammar.terminal(TerminalId::EOF).name(), EOF_NAME);
        assert_eq!(grammar.terminal_by_name("id"), Some(TerminalId(1)));
    }

    #[test]
    fn test_precedence_levels_increase() {
        let grammar = expr_builder()
            .left(["+"])
            .left(["*"])
            .rule("E", ["E", "+", "E"])
            .rule("E", ["E", "*", "E"])
            .rule("E", ["id"])
            .start("E")
            .build()
            .unwrap();

        let plus = grammar.terminal(grammar.terminal_by_name("+").unwrap());
        let times = grammar.terminal(grammar.terminal_by_name("*").unwrap());
        assert_eq!(plus.precedence().map(|p| p.level), Some(1));
        assert_eq!(times.precedence().map(|p| p.level), Some(2));

        let add = grammar.find_production("E", &["E", "+", "E"]).unwrap();
        assert_eq!(
            grammar.production(add).precedence(),
            Some(Precedence::new(1, Associativity::Left))
        );
        let atom = grammar.find_production("E", &["id"]).unwrap();
        assert_eq!(grammar.production(atom).precedence(), None);
    }

    #[test]
    fn test_precedence_of_override() {
        let grammar = expr_builder()
            .literal("-")
            .left(["+", "-"])
            .left(["*"])
            .rule_with("E", ["-", "E"], |opts| {
                opts.precedence_of("*").priority(3);
            })
            .rule("E", ["id"])
            .start("E")
            .build()
            .unwrap();

        let neg = grammar.find_production("E", &["-", "E"]).unwrap();
        let production = grammar.production(neg);
        assert_eq!(production.precedence().map(|p| p.level), Some(2));
        assert_eq!(production.priority(), Some(3));
    }

    #[test]
    fn test_epsilon_rule_and_display() {
        let grammar = GrammarBuilder::new()
            .literal("a")
            .rule("S", ["A", "A"])
            .rule("A", ["a"])
            .rule("A", [])
            .start("S")
            .build()
            .unwrap();

        let empty = grammar.find_production("A", &[]).unwrap();
        assert!(grammar.production(empty).is_empty());
        assert_eq!(grammar.display_production(empty).to_string(), "A -> ε");
        let pair = grammar.find_production("S", &["A", "A"]).unwrap();
        assert_eq!(grammar.display_production(pair).to_string(), "S -> A A");
    }
}
