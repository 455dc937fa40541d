//! Simple calculator
//!
//! Integer arithmetic with yacc-style precedence declarations, evaluated with
//! semantic actions. Precedence removes every conflict, so each input has a
//! single parse.
//!
//! Run with `cargo run --example simple_calculator`.

use std::error::Error;

use tomita::grammar::{GrammarBuilder, Matcher};
use tomita::syntax::{Actions, BoxError, evaluate};
use tomita::testing::WordLexer;
use tomita::Parser;

fn main() -> Result<(), Box<dyn Error>> {
    let grammar = GrammarBuilder::new()
        .terminal("num", Matcher::pattern("[0-9]+"))
        .literal("+")
        .literal("-")
        .literal("*")
        .literal("/")
        .literal("(")
        .literal(")")
        .left(["+", "-"])
        .left(["*", "/"])
        .rule("E", ["E", "+", "E"])
        .rule("E", ["E", "-", "E"])
        .rule("E", ["E", "*", "E"])
        .rule("E", ["E", "/", "E"])
        .rule_with("E", ["-", "E"], |opts| {
            opts.precedence_of("*");
        })
        .rule("E", ["(", "E", ")"])
        .rule("E", ["num"])
        .start("E")
        .build()?;

    let actions = Actions::new()
        .on_token(|leaf| Ok(leaf.text.parse::<i64>().unwrap_or(0)))
        .on_rule(&grammar, "E", &["E", "+", "E"], |v, _| Ok(v[0] + v[2]))?
        .on_rule(&grammar, "E", &["E", "-", "E"], |v, _| Ok(v[0] - v[2]))?
        .on_rule(&grammar, "E", &["E", "*", "E"], |v, _| Ok(v[0] * v[2]))?
        .on_rule(&grammar, "E", &["E", "/", "E"], |v, _| {
            v[0].checked_div(v[2])
                .ok_or_else(|| BoxError::from("division by zero"))
        })?
        .on_rule(&grammar, "E", &["-", "E"], |v, _| Ok(-v[1]))?
        .on_rule(&grammar, "E", &["(", "E", ")"], |v, _| Ok(v[1]))?
        .on_rule(&grammar, "E", &["num"], |v, _| Ok(v[0]))?;

    let parser = Parser::new(&grammar)?;
    let lexer = WordLexer::new(&grammar);

    let inputs = [
        "1 + 2 * 3",
        "( 1 + 2 ) * 3",
        "10 - 4 - 3",
        "- 2 * 3 + 10 / 2",
        "1 + * 2",
        "7 / ( 3 - 3 )",
    ];
    for input in inputs {
        let tokens = lexer.tokenize(input)?;
        match parser.parse(tokens) {
            Ok(forest) => match evaluate(&forest, &actions) {
                Ok(value) => println!("{input:<20} = {value}"),
                Err(error) => println!("{input:<20} ! {error}"),
            },
            Err(error) => println!("{input:<20} ! {error}"),
        }
    }
    Ok(())
}
