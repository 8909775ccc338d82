use pretty_assertions::assert_eq;

use rox::ast::{Expr, ExprId, LiteralValue, Stmt};
use rox::error::LoxError;
use rox::parser::Parser;
use rox::scanner::Scanner;

fn parser_for(source: &str) -> Parser {
    let (tokens, errors) = Scanner::new(source.as_bytes()).scan_all();
    assert!(errors.is_empty(), "scan errors: {:?}", errors);
    Parser::new(tokens)
}

fn parse(source: &str) -> Vec<Stmt> {
    parser_for(source).parse().expect("source should parse")
}

fn parse_errors(source: &str) -> Vec<LoxError> {
    parser_for(source).parse().expect_err("source should be rejected")
}

#[test]
fn for_loop_is_lowered_to_while() {
    let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;");
    assert_eq!(statements.len(), 1);

    let Stmt::Block(outer) = &statements[0] else {
        panic!("expected a block, got {:?}", statements[0]);
    };
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected a while loop, got {:?}", outer[1]);
    };
    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected the body block, got {:?}", body);
    };
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn empty_for_clauses_loop_forever() {
    let statements = parse("for (;;) print 1;");
    assert!(matches!(
        &statements[0],
        Stmt::While {
            condition: Expr::Literal(LiteralValue::True),
            ..
        }
    ));
}

#[test]
fn binding_nodes_get_distinct_ids() {
    let mut parser = parser_for("a = a; print a;");
    let statements = parser.parse().unwrap();

    let mut ids = Vec::new();
    for stmt in &statements {
        match stmt {
            Stmt::Expression(Expr::Assign { id, value, .. }) => {
                if let Expr::Variable { id: inner, .. } = value.as_ref() {
                    ids.push(*inner);
                }
                ids.push(*id);
            }
            Stmt::Print(Expr::Variable { id, .. }) => ids.push(*id),
            other => panic!("unexpected statement {:?}", other),
        }
    }

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| *id < parser.next_id()));
}

#[test]
fn ids_continue_from_starting_point() {
    let (tokens, _) = Scanner::new(b"print x;").scan_all();
    let mut parser = Parser::starting_at(tokens, ExprId(10));
    let statements = parser.parse().unwrap();

    assert!(matches!(
        &statements[0],
        Stmt::Print(Expr::Variable { id: ExprId(10), .. })
    ));
    assert_eq!(parser.next_id(), ExprId(11));
}

#[test]
fn class_with_superclass_and_methods() {
    let statements = parse("class B < A { init(x) {} go() { super.go(); } }");

    let Stmt::Class {
        name,
        superclass,
        methods,
    } = &statements[0]
    else {
        panic!("expected a class, got {:?}", statements[0]);
    };

    assert_eq!(name.lexeme, "B");
    assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));

    let names: Vec<_> = methods.iter().map(|m| m.name.lexeme.as_str()).collect();
    assert_eq!(names, vec!["init", "go"]);
    assert_eq!(methods[0].params.len(), 1);
}

#[test]
fn invalid_assignment_target_is_reported() {
    let errors = parse_errors("1 + 2 = 3;");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target"));
}

#[test]
fn errors_are_collected_after_recovery() {
    let errors = parse_errors("var 1;\nprint ;\nvar ok = 1;\nfun (");
    assert_eq!(errors.len(), 3);

    let lines: Vec<_> = errors.iter().map(|e| e.line()).collect();
    assert_eq!(lines, vec![Some(1), Some(2), Some(4)]);
}

#[test]
fn argument_limit() {
    let args = vec!["1"; 256].join(", ");
    let errors = parse_errors(&format!("f({args});"));
    assert!(errors[0].to_string().contains("more than 255 arguments"));

    let args = vec!["1"; 255].join(", ");
    assert!(parser_for(&format!("f({args});")).parse().is_ok());
}
