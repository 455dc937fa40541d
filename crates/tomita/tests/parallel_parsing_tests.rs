//! Tests for batch parsing

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tomita::grammar::{Grammar, GrammarBuilder, Matcher};
use tomita::parser::{ParseBatch, Parser};
use tomita::syntax::count_trees;
use tomita::testing::{GeneratorConfig, SentenceGenerator};
use tomita::{ConflictPolicy, GlrConfig};

fn grammar() -> Grammar {
    GrammarBuilder::new()
        .terminal("id", Matcher::pattern("[a-z]+"))
        .literal("+")
        .literal("(")
        .literal(")")
        .rule("E", ["E", "+", "E"])
        .rule("E", ["(", "E", ")"])
        .rule("E", ["id"])
        .start("E")
        .build()
        .unwrap()
}

fn batch(grammar: &Grammar, size: u64) -> ParseBatch {
    let generator = SentenceGenerator::new(grammar, GeneratorConfig { max_depth: 5 });
    let mut batch = ParseBatch::new();
    for seed in 0..size {
        let tokens = if seed % 3 == 0 {
            generator.mutated(seed, 2)
        } else {
            generator.sentence(seed)
        };
        batch.add(format!("input-{seed}"), tokens);
    }
    batch
}

#[test]
fn test_batch_matches_sequential_parses() {
    let grammar = grammar();
    let parser = Parser::new(&grammar)
        .unwrap()
        .with_config(GlrConfig::default().with_conflict_policy(ConflictPolicy::KeepAll));
    let batch = batch(&grammar, 48);

    let results = parser.parse_batch(&batch);
    assert_eq!(results.len(), batch.len());
    for (result, (id, tokens)) in results.iter().zip(&batch.inputs) {
        assert_eq!(&result.id, id);
        let sequential = parser.parse(tokens.iter().cloned());
        assert_eq!(result.result, sequential);
        if let Ok(forest) = &result.result {
            assert!(count_trees(forest) >= 1);
        }
    }
    // Unedited sentences are always accepted.
    for (index, result) in results.iter().enumerate() {
        if index % 3 != 0 {
            assert!(result.is_ok(), "{} rejected", result.id);
        }
    }
}

#[test]
fn test_batch_progress_reaches_total() {
    let grammar = grammar();
    let parser = Parser::new(&grammar).unwrap();
    let batch = batch(&grammar, 20);

    let calls = Arc::new(AtomicUsize::new(0));
    let highest = Arc::new(AtomicUsize::new(0));
    let (calls_in, highest_in) = (Arc::clone(&calls), Arc::clone(&highest));
    let results = parser.parse_batch_with_progress(
        &batch,
        Box::new(move |done, total| {
            assert_eq!(total, 20);
            calls_in.fetch_add(1, Ordering::SeqCst);
            highest_in.fetch_max(done, Ordering::SeqCst);
        }),
    );

    assert_eq!(results.len(), 20);
    assert_eq!(calls.load(Ordering::SeqCst), 20);
    assert_eq!(highest.load(Ordering::SeqCst), 20);
}

#[test]
fn test_empty_batch() {
    let grammar = grammar();
    let parser = Parser::new(&grammar).unwrap();
    assert!(parser.parse_batch(&ParseBatch::new()).is_empty());
}

#[test]
fn test_parser_shared_across_threads() {
    let grammar = grammar();
    let parser = Parser::new(&grammar).unwrap();
    let batch = batch(&grammar, 8);

    let expected: Vec<bool> = parser.parse_batch(&batch).iter().map(|r| r.is_ok()).collect();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let accepted: Vec<bool> = batch
                    .inputs
                    .iter()
                    .map(|(_, tokens)| parser.parse(tokens.iter().cloned()).is_ok())
                    .collect();
                assert_eq!(accepted, expected);
            });
        }
    });
}
