//! # Sentence Generators
//!
//! Random token sequences derived from a grammar, for property-based tests,
//! benchmarks and fuzzing.
//!
//! ## Usage
//!
//! ```rust
//! use tomita::backend::glr::parse;
//! use tomita::backend::lr::build_automaton;
//! use tomita::grammar::GrammarBuilder;
//! use tomita::testing::{GeneratorConfig, SentenceGenerator};
//!
//! let grammar = GrammarBuilder::new()
//!     .literal("a")
//!     .literal("+")
//!     .rule("E", ["E", "+", "E"])
//!     .rule("E", ["a"])
//!     .start("E")
//!     .build()?;
//! let automaton = build_automaton(&grammar)?;
//! let generator = SentenceGenerator::new(&grammar, GeneratorConfig::default());
//! for seed in 0..10 {
//!     assert!(parse(&automaton, generator.sentence(seed)).is_ok());
//! }
//! # Ok::<(), tomita::GrammarError>(())
//! ```

use crate::grammar::{Grammar, Matcher, NonterminalId, Symbol, TerminalId};
use crate::lexer::Token;
use crate::syntax::{TextRange, TextSize};
use compact_str::CompactString;

/// Configuration for sentence generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Depth after which only the shortest derivations are chosen
    pub max_depth: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { max_depth: 8 }
    }
}

/// Generator of random sentences of a grammar's start symbol.
#[derive(Debug, Clone)]
pub struct SentenceGenerator {
    config: GeneratorConfig,
    /// Right-hand sides per non-terminal
    productions: Vec<Vec<Vec<Symbol>>>,
    /// Height of the shortest derivation tree per non-terminal
    heights: Vec<usize>,
    /// Text emitted for each terminal
    texts: Vec<CompactString>,
    start: NonterminalId,
    terminal_count: usize,
}

impl SentenceGenerator {
    #[must_use]
    pub fn new(grammar: &Grammar, config: GeneratorConfig) -> Self {
        let productions: Vec<Vec<Vec<Symbol>>> = grammar
            .nonterminals()
            .iter()
            .map(|nt| {
                nt.productions()
                    .iter()
                    .map(|&p| grammar.production(p).rhs().to_vec())
                    .collect()
            })
            .collect();

        let mut heights = vec![usize::MAX; productions.len()];
        let mut changed = true;
        while changed {
            changed = false;
            for (nt, alternatives) in productions.iter().enumerate() {
                for rhs in alternatives {
                    let height = production_height(rhs, &heights);
                    if height < heights[nt] {
                        heights[nt] = height;
                        changed = true;
                    }
                }
            }
        }

        let texts = grammar
            .terminals()
            .iter()
            .map(|terminal| match terminal.matcher() {
                Matcher::Literal(text) => text.clone(),
                Matcher::Pattern(_) | Matcher::EndOfInput => terminal.name().into(),
            })
            .collect();

        Self {
            config,
            productions,
            heights,
            texts,
            start: grammar.start(),
            terminal_count: grammar.terminals().len(),
        }
    }

    /// A sentence of the start symbol, determined by `seed`.
    #[must_use]
    pub fn sentence(&self, seed: u64) -> Vec<Token> {
        let mut rng = SimpleRng::with_seed(seed);
        let mut terminals = Vec::new();
        let mut pending = vec![(Symbol::Nonterminal(self.start), 0usize)];
        while let Some((symbol, depth)) = pending.pop() {
            match symbol {
                Symbol::Terminal(terminal) => terminals.push(terminal),
                Symbol::Nonterminal(nt) => {
                    let alternatives = &self.productions[nt.index()];
                    let rhs = if depth >= self.config.max_depth {
                        self.shortest(alternatives)
                    } else {
                        let pick = (rng.next_u64() % alternatives.len() as u64) as usize;
                        alternatives[pick].as_slice()
                    };
                    pending.extend(rhs.iter().rev().map(|&s| (s, depth + 1)));
                }
            }
        }
        self.tokens(&terminals)
    }

    /// `sentence(seed)` with `count` random edits applied: deletions,
    /// duplications, swaps and substitutions by an arbitrary terminal. The
    /// result is usually not in the language.
    #[must_use]
    pub fn mutated(&self, seed: u64, count: usize) -> Vec<Token> {
        let mut terminals: Vec<TerminalId> =
            self.sentence(seed).iter().map(|t| t.terminal).collect();
        let mut rng = SimpleRng::with_seed(seed.wrapping_add(0x9e37_79b9_7f4a_7c15));
        for _ in 0..count {
            if terminals.is_empty() {
                break;
            }
            let at = (rng.next_u64() % terminals.len() as u64) as usize;
            match rng.next_u64() % 4 {
                0 => {
                    terminals.remove(at);
                }
                1 => terminals.insert(at, terminals[at]),
                2 => {
                    let other = (rng.next_u64() % terminals.len() as u64) as usize;
                    terminals.swap(at, other);
                }
                _ => {
                    // Any terminal but end of input.
                    let span = self.terminal_count.saturating_sub(1).max(1) as u64;
                    terminals[at] = TerminalId::from_index(1 + (rng.next_u64() % span) as usize);
                }
            }
        }
        self.tokens(&terminals)
    }

    fn shortest<'p>(&self, alternatives: &'p [Vec<Symbol>]) -> &'p [Symbol] {
        alternatives
            .iter()
            .min_by_key(|rhs| production_height(rhs, &self.heights))
            .map_or(&[][..], Vec::as_slice)
    }

    /// Tokens separated by single spaces.
    fn tokens(&self, terminals: &[TerminalId]) -> Vec<Token> {
        let mut offset = 0;
        terminals
            .iter()
            .map(|&terminal| {
                let text = self.texts[terminal.index()].clone();
                let range = TextRange::at(TextSize::of(offset), TextSize::of(text.len()));
                offset += text.len() + 1;
                Token::new(terminal, text, range)
            })
            .collect()
    }
}

fn production_height(rhs: &[Symbol], heights: &[usize]) -> usize {
    rhs.iter()
        .filter_map(|symbol| symbol.as_nonterminal())
        .map(|nt| heights[nt.index()])
        .max()
        .map_or(1, |h| h.saturating_add(1))
}

/// Simple RNG for deterministic generation
struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    fn with_seed(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        Self {
            state: seed ^ 0x853c_49e6_748f_ea9b,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}
