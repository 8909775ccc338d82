use pretty_assertions::assert_eq;

use rox::ast::Stmt;
use rox::error::LoxError;
use rox::parser::Parser;
use rox::resolver::{Locals, Resolver};
use rox::scanner::Scanner;

fn parse(source: &str) -> Vec<Stmt> {
    let (tokens, errors) = Scanner::new(source.as_bytes()).scan_all();
    assert!(errors.is_empty(), "scan errors: {:?}", errors);

    Parser::new(tokens).parse().expect("source should parse")
}

fn resolve(source: &str) -> Result<Locals, Vec<LoxError>> {
    let statements = parse(source);
    Resolver::new().resolve(&statements)
}

fn distances(source: &str) -> Vec<usize> {
    let locals = resolve(source).expect("source should resolve");
    let mut distances: Vec<usize> = locals.values().copied().collect();
    distances.sort_unstable();
    distances
}

fn messages(source: &str) -> Vec<String> {
    resolve(source)
        .expect_err("source should be rejected")
        .iter()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn globals_are_left_out_of_the_table() {
    let locals = resolve("var a = 1; print a; a = 2; fun f() {} f();").unwrap();
    assert!(locals.is_empty());
}

#[test]
fn shadowing_local_resolves_to_innermost_scope() {
    assert_eq!(distances("{ var a = 1; { var a = 2; print a; } }"), vec![0]);
}

#[test]
fn read_under_many_redeclaring_blocks_is_at_distance_zero() {
    let source = "
        {
            var a = 1;
            { var a = 2; { var a = 3; { var a = 4; { var a = 5; print a; } } } }
        }
    ";
    assert_eq!(distances(source), vec![0]);
}

#[test]
fn closure_reference_counts_enclosing_scopes() {
    // function scope, then the block holding `a`
    assert_eq!(distances("{ var a = 1; fun f() { print a; } }"), vec![1]);
}

#[test]
fn block_inside_function_adds_a_scope() {
    assert_eq!(distances("fun f(x) { { print x; } }"), vec![1]);
}

#[test]
fn this_and_super_distances_follow_class_scopes() {
    let source = "
        class A { m() {} }
        class B < A {
            m() { print this; super.m(); }
        }
    ";
    // `this` one out from the method scope, `super` two out
    assert_eq!(distances(source), vec![1, 2]);
}

#[test]
fn duplicate_in_same_local_scope_is_an_error() {
    let errors = messages("{ var a = 1; var a = 2; }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Already a variable with this name in this scope"));
    assert!(errors[0].starts_with("[line 1] Error:"));
}

#[test]
fn duplicate_across_nested_scopes_is_allowed() {
    assert!(resolve("{ var a = 1; { var a = 2; } }").is_ok());
    assert!(resolve("var a = 1; var a = 2;").is_ok());
}

#[test]
fn duplicate_parameter_is_an_error() {
    let errors = messages("fun f(a, a) {}");
    assert!(errors[0].contains("Already a variable with this name in this scope"));
}

#[test]
fn reading_local_in_own_initializer_is_an_error() {
    let errors = messages("{ var a = a; }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't read local variable in its own initializer"));
}

#[test]
fn initializer_read_binds_to_the_shadowed_local() {
    // the read skips the half-declared `a` and lands one scope out
    assert_eq!(distances("{ var a = 1; { var a = a + 1; print a; } }"), vec![0, 1]);
}

#[test]
fn initializer_read_may_reach_a_global() {
    let locals = resolve("var a = 1; { var a = a + 1; }").unwrap();
    assert!(locals.is_empty());

    assert!(resolve("var a = 1; var a = a;").is_ok());
}

#[test]
fn globals_from_earlier_entries_count_as_outer_bindings() {
    let statements = parse("{ var a = a; }");
    let known = ["a".to_string()].into_iter().collect();
    assert!(Resolver::with_globals(known).resolve(&statements).is_ok());
}

#[test]
fn return_at_top_level_is_an_error() {
    let errors = messages("return 1;");
    assert!(errors[0].contains("Can't return from top-level code"));
}

#[test]
fn return_value_from_initializer_is_an_error() {
    let errors = messages("class A { init() { return 1; } }");
    assert!(errors[0].contains("Can't return a value from an initializer"));

    let errors = messages("class A { A() { return 1; } }");
    assert!(errors[0].contains("Can't return a value from an initializer"));
}

#[test]
fn bare_return_from_initializer_is_allowed() {
    assert!(resolve("class A { init() { return; } }").is_ok());
    assert!(resolve("class A { m() { return 1; } }").is_ok());
}

#[test]
fn this_outside_class_is_an_error() {
    let errors = messages("print this;");
    assert!(errors[0].contains("Can't use 'this' outside of a class"));

    let errors = messages("fun f() { return this; }");
    assert!(errors[0].contains("Can't use 'this' outside of a class"));
}

#[test]
fn super_outside_class_is_an_error() {
    let errors = messages("fun f() { super.m(); }");
    assert!(errors[0].contains("Can't use 'super' outside of a class"));
}

#[test]
fn super_without_superclass_is_an_error() {
    let errors = messages("class A { m() { super.m(); } }");
    assert!(errors[0].contains("Can't use 'super' in a class with no superclass"));
}

#[test]
fn class_inheriting_from_itself_is_an_error() {
    let errors = messages("class A < A {}");
    assert!(errors[0].contains("A class can't inherit from itself"));
}

#[test]
fn all_errors_are_collected() {
    let source = "
        return 1;
        print this;
        { var a = 1; var a = 2; }
    ";
    let errors = resolve(source).unwrap_err();

    assert_eq!(errors.len(), 3);
    let lines: Vec<_> = errors.iter().map(|e| e.line()).collect();
    assert_eq!(lines, vec![Some(2), Some(3), Some(4)]);
}
