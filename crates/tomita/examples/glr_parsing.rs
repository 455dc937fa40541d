//! GLR parsing of an ambiguous grammar
//!
//! Parses with every conflict kept, then inspects the shared packed forest:
//! tree counts, enumeration, a prioritized pick and the parse statistics.
//!
//! Run with `cargo run --example glr_parsing`.

use std::error::Error;

use tomita::grammar::GrammarBuilder;
use tomita::syntax::{all_trees, count_trees, prioritized_tree};
use tomita::testing::WordLexer;
use tomita::{ConflictPolicy, GlrConfig, Parser};

fn main() -> Result<(), Box<dyn Error>> {
    // Noun phrases with attachable prepositional phrases, the classic
    // "I saw the man with the telescope" ambiguity.
    let grammar = GrammarBuilder::new()
        .literal("i")
        .literal("saw")
        .literal("the")
        .literal("man")
        .literal("hill")
        .literal("telescope")
        .literal("on")
        .literal("with")
        .rule("S", ["NP", "VP"])
        .rule("NP", ["i"])
        .rule("NP", ["Det", "N"])
        .rule_with("NP", ["NP", "PP"], |opts| {
            opts.priority(1);
        })
        .rule("VP", ["V", "NP"])
        .rule_with("VP", ["VP", "PP"], |opts| {
            opts.priority(0);
        })
        .rule("PP", ["P", "NP"])
        .rule("Det", ["the"])
        .rule("N", ["man"])
        .rule("N", ["hill"])
        .rule("N", ["telescope"])
        .rule("V", ["saw"])
        .rule("P", ["on"])
        .rule("P", ["with"])
        .start("S")
        .build()?;

    let parser = Parser::new(&grammar)?
        .with_config(GlrConfig::default().with_conflict_policy(ConflictPolicy::KeepAll));
    let lexer = WordLexer::new(&grammar);

    let tokens = lexer.tokenize("i saw the man on the hill with the telescope")?;
    let forest = parser.parse(tokens)?;

    println!("{} readings", count_trees(&forest));
    println!("{}", forest.metrics());
    println!(
        "{} forest nodes, {} of them ambiguous",
        forest.len(),
        forest.ambiguity_count()
    );
    for (index, tree) in all_trees(&forest).enumerate() {
        println!("{index}: {}", tree.display(&grammar));
    }
    println!(
        "preferred: {}",
        prioritized_tree(&forest).display(&grammar)
    );
    println!("\n{}", forest.dump());
    Ok(())
}
