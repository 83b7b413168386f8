//! Property and snapshot tests for the syntax frontend

use casper_syntax::ast::{Expr, Statement};
use casper_syntax::{lexer, parse_source, parser};
use proptest::prelude::*;

fn statement_kind(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::Var(_) => "Var",
        Statement::Function(_) => "Function",
        Statement::Class(_) => "Class",
        Statement::Expr(expr) => match expr.node {
            Expr::Call { .. } => "Expr(Call)",
            Expr::Assign(..) => "Expr(Assign)",
            _ => "Expr",
        },
        Statement::If(_) => "If",
        Statement::For(_) | Statement::ForIn(_) => "For",
        Statement::Try(_) => "Try",
        _ => "Other",
    }
}

#[test]
fn top_level_shape_of_a_typical_suite() {
    let source = r#"
var helpers = require('./helpers');
function login(casper) { casper.fill('form', {}, true); }
class Page {}
casper.options.viewportSize = { width: 1024, height: 768 };
casper.test.begin('logs in', 2, function suite(test) {
    casper.start('http://localhost/').then(function () { login(this); }).run(function () { test.done(); });
});
for (var i = 0; i < 2; i++) {}
if (casper.cli.has('debug')) { casper.options.verbose = true; }
try { x(); } catch (e) {}
"#;
    let program = parse_source(source).unwrap();
    let kinds: Vec<&str> = program.body.iter().map(|s| statement_kind(&s.node)).collect();
    insta::assert_snapshot!(kinds.join("\n"), @r"
    Var
    Function
    Class
    Expr(Assign)
    Expr(Call)
    For
    If
    Try
    ");
}

proptest! {
    #[test]
    fn lexer_and_parser_never_panic(source in "\\PC{0,200}") {
        if let Ok(tokens) = lexer::lex(&source) {
            let _ = parser::parse(&tokens);
        }
    }

    #[test]
    fn parse_errors_point_inside_the_source(source in "[a-z(){};=.'\" \n]{0,80}") {
        if let Err(error) = parse_source(&source) {
            let lines = source.split('\n').count();
            prop_assert!(error.line >= 1 && error.line <= lines);
        }
    }

    #[test]
    fn string_literals_round_trip_their_value(text in "[a-zA-Z0-9 _.,!-]{0,40}") {
        let source = format!("f('{}');", text);
        let program = parse_source(&source).unwrap();
        let Statement::Expr(expr) = &program.body[0].node else {
            panic!("expected an expression statement");
        };
        let Expr::Call { args, .. } = &expr.node else {
            panic!("expected a call");
        };
        prop_assert_eq!(args[0].node.clone(), Expr::Literal(casper_syntax::ast::Literal::String(text)));
    }
}
