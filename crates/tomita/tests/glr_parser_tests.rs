//! End-to-end tests for the GLR stack machine and its parse forests

use std::collections::HashSet;

use tomita::grammar::{Associativity, Grammar, GrammarBuilder, Matcher};
use tomita::syntax::{
    Actions, Visit, all_trees, count_trees, evaluate, evaluate_with, first_tree, nth_tree,
    traverse,
};
use tomita::testing::{WordLexer, check_derivation};
use tomita::{
    CancellationFlag, ConflictPolicy, ForestNode, GlrConfig, GrammarError, ParseError, Parser,
    Phase,
};

fn keep_all() -> GlrConfig {
    GlrConfig::default().with_conflict_policy(ConflictPolicy::KeepAll)
}

fn sums(declare_left: bool) -> Grammar {
    let mut builder = GrammarBuilder::new()
        .terminal("num", Matcher::pattern("[0-9]+"))
        .literal("+");
    if declare_left {
        builder = builder.left(["+"]);
    }
    builder
        .rule("E", ["E", "+", "E"])
        .rule("E", ["num"])
        .start("E")
        .build()
        .unwrap()
}

fn operands(n: usize) -> String {
    (1..=n).map(|i| i.to_string()).collect::<Vec<_>>().join(" + ")
}

fn dangling_else(declare: bool) -> Grammar {
    let mut builder = GrammarBuilder::new()
        .literal("if")
        .literal("then")
        .literal("else")
        .literal("c")
        .literal("x");
    if declare {
        builder = builder.nonassoc(["then"]).nonassoc(["else"]);
    }
    builder
        .rule("S", ["if", "c", "then", "S"])
        .rule("S", ["if", "c", "then", "S", "else", "S"])
        .rule("S", ["x"])
        .start("S")
        .build()
        .unwrap()
}

#[test]
fn test_two_way_split() {
    let grammar = GrammarBuilder::new()
        .literal("a")
        .rule("S", ["A", "A"])
        .rule("A", ["a"])
        .rule("A", ["a", "a"])
        .start("S")
        .build()
        .unwrap();
    let parser = Parser::new(&grammar).unwrap();
    let tokens = WordLexer::new(&grammar).tokenize("a a a").unwrap();
    let forest = parser.parse(tokens).unwrap();

    assert_eq!(count_trees(&forest), 2);
    assert!(matches!(
        forest.node(forest.root()),
        ForestNode::Ambiguity(_)
    ));
    let shapes: HashSet<String> = all_trees(&forest)
        .map(|tree| tree.display(&grammar).to_string())
        .collect();
    let expected: HashSet<String> = [
        "(S (A a) (A a a))".to_string(),
        "(S (A a a) (A a))".to_string(),
    ]
    .into_iter()
    .collect();
    assert_eq!(shapes, expected);
}

#[test]
fn test_associativity_declaration_removes_ambiguity() {
    let input = "1 + 2 + 3";

    let grammar = sums(false);
    let forest = Parser::new(&grammar)
        .unwrap()
        .parse(WordLexer::new(&grammar).tokenize(input).unwrap())
        .unwrap();
    assert_eq!(count_trees(&forest), 2);

    let grammar = sums(true);
    let forest = Parser::new(&grammar)
        .unwrap()
        .parse(WordLexer::new(&grammar).tokenize(input).unwrap())
        .unwrap();
    assert_eq!(count_trees(&forest), 1);
    assert!(!forest.is_ambiguous());
    assert_eq!(
        first_tree(&forest).display(&grammar).to_string(),
        "(E (E (E 1) + (E 2)) + (E 3))"
    );

    // Declarations are ignored when every conflict is kept.
    let forest = Parser::new(&grammar)
        .unwrap()
        .with_config(keep_all())
        .parse(WordLexer::new(&grammar).tokenize(input).unwrap())
        .unwrap();
    assert_eq!(count_trees(&forest), 2);
}

fn tagged_sum(associativity: Associativity) -> Grammar {
    GrammarBuilder::new()
        .literal("a")
        .literal("+")
        .rule_with("E", ["E", "+", "E"], |opts| {
            opts.associativity(associativity);
        })
        .rule("E", ["a"])
        .start("E")
        .build()
        .unwrap()
}

#[test]
fn test_production_associativity_without_precedence() {
    let shapes = [
        (Associativity::Left, "(E (E (E a) + (E a)) + (E a))"),
        (Associativity::Right, "(E (E a) + (E (E a) + (E a)))"),
    ];
    for (associativity, shape) in shapes {
        let grammar = tagged_sum(associativity);
        let tokens = WordLexer::new(&grammar).tokenize("a + a + a").unwrap();
        let forest = Parser::new(&grammar).unwrap().parse(tokens).unwrap();
        assert_eq!(count_trees(&forest), 1, "{associativity}");
        assert_eq!(first_tree(&forest).display(&grammar).to_string(), shape);
    }

    let grammar = tagged_sum(Associativity::NonAssoc);
    let parser = Parser::new(&grammar).unwrap();
    let lexer = WordLexer::new(&grammar);
    assert_eq!(count_trees(&parser.parse(lexer.tokenize("a + a").unwrap()).unwrap()), 1);
    let error = parser.parse(lexer.tokenize("a + a + a").unwrap()).unwrap_err();
    assert_eq!(error.position(), 3);

    // The tag is a pruning rule; keeping every conflict still forks.
    let grammar = tagged_sum(Associativity::Left);
    let tokens = WordLexer::new(&grammar).tokenize("a + a + a").unwrap();
    let forest = Parser::new(&grammar)
        .unwrap()
        .with_config(keep_all())
        .parse(tokens)
        .unwrap();
    assert_eq!(count_trees(&forest), 2);
}

#[test]
fn test_deep_left_recursive_parse() {
    let grammar = GrammarBuilder::new()
        .literal("a")
        .rule("S", ["S", "a"])
        .rule("S", ["a"])
        .start("S")
        .build()
        .unwrap();
    let n = 100_000;
    let tokens = WordLexer::new(&grammar).tokenize(&"a ".repeat(n)).unwrap();
    let forest = Parser::new(&grammar).unwrap().parse(tokens).unwrap();
    assert_eq!(forest.len(), 2 * n);
    assert_eq!(forest.dump().lines().count(), 2 * n);

    let tree = first_tree(&forest);
    assert_eq!(tree.yield_text().len(), n);
    assert_eq!(tree.size(), 2 * n);
    assert_eq!(tree.display(&grammar).to_string().len(), 6 * n - 1);
    assert_eq!(check_derivation(&grammar, &tree), Ok(()));
    drop(tree);
}

#[test]
fn test_catalan_count_with_polynomial_forest() {
    let grammar = sums(false);
    let parser = Parser::new(&grammar).unwrap();
    let lexer = WordLexer::new(&grammar);
    let catalan = [1u128, 1, 2, 5, 14, 42, 132, 429, 1430, 4862, 16796, 58786];

    for n in 1..=12 {
        let forest = parser.parse(lexer.tokenize(&operands(n)).unwrap()).unwrap();
        assert_eq!(count_trees(&forest), catalan[n - 1], "{n} operands");
    }

    // 58786 trees over 23 tokens share a few hundred nodes.
    let forest = parser.parse(lexer.tokenize(&operands(12)).unwrap()).unwrap();
    assert!(forest.len() < 1_000, "forest has {} nodes", forest.len());
    assert_eq!(forest.tokens().len(), 23);
}

#[test]
fn test_every_tree_is_a_derivation() {
    let grammar = sums(false);
    let parser = Parser::new(&grammar).unwrap();
    let tokens = WordLexer::new(&grammar).tokenize(&operands(6)).unwrap();
    let forest = parser.parse(tokens).unwrap();

    let mut seen = HashSet::new();
    for tree in all_trees(&forest) {
        check_derivation(&grammar, &tree).unwrap();
        assert_eq!(tree.yield_text(), ["1", "+", "2", "+", "3", "+", "4", "+", "5", "+", "6"]);
        assert!(seen.insert(tree));
    }
    assert_eq!(seen.len(), 42);
}

#[test]
fn test_nth_tree_agrees_with_enumeration() {
    let grammar = sums(false);
    let parser = Parser::new(&grammar).unwrap();
    let forest = parser
        .parse(WordLexer::new(&grammar).tokenize(&operands(5)).unwrap())
        .unwrap();

    for (index, tree) in all_trees(&forest).enumerate() {
        assert_eq!(nth_tree(&forest, index as u128), Some(tree));
    }
    assert_eq!(nth_tree(&forest, 14), None);
}

#[test]
fn test_substituted_token_is_reported() {
    let grammar = sums(true);
    let parser = Parser::new(&grammar).unwrap();
    let tokens = WordLexer::new(&grammar).tokenize("1 + 2 3 + 4").unwrap();

    let error = parser.parse(tokens).unwrap_err();
    match &error {
        ParseError::UnexpectedToken {
            position, found, ..
        } => {
            assert_eq!(*position, 3);
            assert_eq!(found, "3");
        }
        other => panic!("expected an unexpected token error, got {other:?}"),
    }
    assert!(error.expected_symbols().iter().any(|s| s == "+"));
    let span = error.span().unwrap();
    assert_eq!(usize::from(span.start()), 6);
}

#[test]
fn test_truncated_input_is_reported() {
    let grammar = sums(true);
    let parser = Parser::new(&grammar).unwrap();
    let tokens = WordLexer::new(&grammar).tokenize("1 + 2 +").unwrap();

    let error = parser.parse(tokens).unwrap_err();
    assert!(matches!(error, ParseError::UnexpectedEof { position: 4, .. }));
    assert_eq!(error.expected_symbols(), ["num"]);
}

#[test]
fn test_parse_is_idempotent() {
    let grammar = dangling_else(false);
    let parser = Parser::new(&grammar).unwrap().with_config(keep_all());
    let tokens = WordLexer::new(&grammar)
        .tokenize("if c then if c then x else x")
        .unwrap();

    let first = parser.parse(tokens.clone()).unwrap();
    let second = parser.parse(tokens).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.dump(), second.dump());
}

#[test]
fn test_dangling_else() {
    let input = "if c then if c then x else x";

    let grammar = dangling_else(false);
    let forest = Parser::new(&grammar)
        .unwrap()
        .parse(WordLexer::new(&grammar).tokenize(input).unwrap())
        .unwrap();
    assert_eq!(count_trees(&forest), 2);

    let grammar = dangling_else(true);
    let forest = Parser::new(&grammar)
        .unwrap()
        .parse(WordLexer::new(&grammar).tokenize(input).unwrap())
        .unwrap();
    assert_eq!(count_trees(&forest), 1);
    assert_eq!(
        first_tree(&forest).display(&grammar).to_string(),
        "(S if c then (S if c then (S x) else (S x)))"
    );
}

#[test]
fn test_hidden_left_recursion() {
    let grammar = GrammarBuilder::new()
        .literal("c")
        .literal("d")
        .rule("A", ["B", "A", "c"])
        .rule("A", ["d"])
        .rule("B", [])
        .start("A")
        .build()
        .unwrap();
    let parser = Parser::new(&grammar).unwrap();
    let lexer = WordLexer::new(&grammar);

    let forest = parser.parse(lexer.tokenize("d c c c").unwrap()).unwrap();
    assert_eq!(count_trees(&forest), 1);
    check_derivation(&grammar, &first_tree(&forest)).unwrap();
    assert!(parser.parse(lexer.tokenize("c d").unwrap()).is_err());
}

#[test]
fn test_nullable_symbols_split_a_token() {
    let grammar = GrammarBuilder::new()
        .literal("a")
        .literal("c")
        .rule("S", ["A", "B", "c"])
        .rule("A", ["a"])
        .rule("A", [])
        .rule("B", ["a"])
        .rule("B", [])
        .start("S")
        .build()
        .unwrap();
    let parser = Parser::new(&grammar).unwrap();
    let lexer = WordLexer::new(&grammar);

    let forest = parser.parse(lexer.tokenize("a c").unwrap()).unwrap();
    assert_eq!(count_trees(&forest), 2);
    for tree in all_trees(&forest) {
        check_derivation(&grammar, &tree).unwrap();
        assert_eq!(tree.yield_text(), ["a", "c"]);
    }

    let forest = parser.parse(lexer.tokenize("c").unwrap()).unwrap();
    assert_eq!(first_tree(&forest).display(&grammar).to_string(), "(S (A) (B) c)");
    assert_eq!(count_trees(&forest), 1);
}

#[test]
fn test_cyclic_grammars_are_rejected() {
    let direct = GrammarBuilder::new()
        .literal("a")
        .rule("S", ["S"])
        .rule("S", ["a"])
        .start("S")
        .build()
        .unwrap();
    assert!(matches!(
        Parser::new(&direct),
        Err(GrammarError::Cyclic { .. })
    ));

    let through_epsilon = GrammarBuilder::new()
        .literal("a")
        .rule("S", ["S", "B"])
        .rule("S", ["a"])
        .rule("B", [])
        .start("S")
        .build()
        .unwrap();
    let error = Parser::new(&through_epsilon).unwrap_err();
    match error {
        GrammarError::Cyclic { names } => assert!(names.iter().any(|n| n == "S")),
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_cancellation() {
    let grammar = sums(false);
    let flag = CancellationFlag::new();
    let parser = Parser::new(&grammar)
        .unwrap()
        .with_config(keep_all().with_cancellation(flag.clone()));
    let tokens = WordLexer::new(&grammar).tokenize(&operands(10)).unwrap();

    let mut machine = parser.machine(tokens.clone());
    for _ in 0..5 {
        machine.step();
    }
    flag.cancel();
    assert_eq!(machine.step(), Phase::Rejected);
    assert!(matches!(
        machine.into_result(),
        Err(ParseError::Cancelled { position: 5 })
    ));

    // A cancelled flag stops every later parse before the first token.
    assert!(matches!(
        parser.parse(tokens),
        Err(ParseError::Cancelled { position: 0 })
    ));
}

#[test]
fn test_evaluation_over_ambiguous_forest() {
    let grammar = GrammarBuilder::new()
        .terminal("num", Matcher::pattern("[0-9]+"))
        .literal("-")
        .rule("E", ["E", "-", "E"])
        .rule("E", ["num"])
        .start("E")
        .build()
        .unwrap();
    let parser = Parser::new(&grammar).unwrap();
    let forest = parser
        .parse(WordLexer::new(&grammar).tokenize("10 - 4 - 3").unwrap())
        .unwrap();

    let actions = Actions::new()
        .on_token(|leaf| Ok(leaf.text.parse::<i64>().unwrap_or(0)))
        .on_rule(&grammar, "E", &["E", "-", "E"], |v, _| Ok(v[0] - v[2]))
        .unwrap()
        .on_rule(&grammar, "E", &["num"], |v, _| Ok(v[0]))
        .unwrap();

    // (10 - 4) - 3 = 3 and 10 - (4 - 3) = 9
    let single = evaluate(&forest, &actions).unwrap();
    assert!(single == 3 || single == 9);
    let largest = evaluate_with(&forest, &actions, |_, values: &[i64]| {
        values.iter().copied().max().unwrap_or_default()
    })
    .unwrap();
    assert_eq!(largest, 9);
    let smallest = evaluate_with(&forest, &actions, |_, values: &[i64]| {
        values.iter().copied().min().unwrap_or_default()
    })
    .unwrap();
    assert_eq!(smallest, 3);
}

#[test]
fn test_visitor_counts_leaves_once_per_node() {
    let grammar = sums(false);
    let parser = Parser::new(&grammar).unwrap();
    let forest = parser
        .parse(WordLexer::new(&grammar).tokenize(&operands(4)).unwrap())
        .unwrap();

    let mut visits = 0usize;
    let width = traverse(&forest, forest.root(), |visit| {
        visits += 1;
        match visit {
            Visit::Leaf { .. } => 1usize,
            Visit::Node { children, .. } => children.iter().sum(),
        }
    });
    assert_eq!(width, 7);
    // Each reachable node is visited once even though five trees share them.
    assert!(visits <= forest.len());
}
