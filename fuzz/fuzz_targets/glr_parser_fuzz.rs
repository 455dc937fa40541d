#![no_main]
use libfuzzer_sys::fuzz_target;
use tomita::grammar::{Grammar, GrammarBuilder, Matcher, TerminalId};
use tomita::syntax::{TextRange, TextSize, all_trees, count_trees, first_tree};
use tomita::testing::check_derivation;
use tomita::{ConflictPolicy, GlrConfig, Parser, Token};

fn fuzz_grammar() -> Grammar {
    GrammarBuilder::new()
        .terminal("num", Matcher::pattern("[0-9]+"))
        .literal("+")
        .literal("*")
        .literal("(")
        .literal(")")
        .right(["*"])
        .rule("E", ["E", "+", "E"])
        .rule("E", ["E", "*", "E"])
        .rule("E", ["(", "E", ")"])
        .rule("E", ["P", "num"])
        .rule("P", [])
        .rule("P", ["+"])
        .start("E")
        .build()
        .unwrap()
}

fn terminals(grammar: &Grammar) -> Vec<TerminalId> {
    ["num", "+", "*", "(", ")"]
        .iter()
        .filter_map(|name| grammar.terminal_by_name(name))
        .collect()
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let grammar = fuzz_grammar();
    let alphabet = terminals(&grammar);
    // The first byte picks the conflict policy; the rest are tokens.
    let policy = if data[0] & 1 == 0 {
        ConflictPolicy::Prune
    } else {
        ConflictPolicy::KeepAll
    };
    let parser = Parser::new(&grammar)
        .unwrap()
        .with_config(
            GlrConfig::default()
                .with_conflict_policy(policy)
                .with_sweep_threshold(usize::from(data[0] >> 1).max(1)),
        );

    let tokens: Vec<Token> = data[1..]
        .iter()
        .take(64)
        .enumerate()
        .map(|(i, byte)| {
            let terminal = alphabet[usize::from(*byte) % alphabet.len()];
            let text = grammar.terminal(terminal).name().to_string();
            Token::new(terminal, text, TextRange::at(TextSize::of(i), TextSize::of(1)))
        })
        .collect();

    match parser.parse(tokens.clone()) {
        Ok(forest) => {
            assert!(count_trees(&forest) >= 1);
            for tree in all_trees(&forest).take(16) {
                assert_eq!(check_derivation(&grammar, &tree), Ok(()));
                assert_eq!(tree.yield_text().len(), tokens.len());
            }
            assert_eq!(first_tree(&forest).span().end, tokens.len());
        }
        Err(error) => assert!(error.position() <= tokens.len()),
    }
});
