// FSK smoke tests for tokenizer, parser, and interpreter
// Covers: arithmetic, declarations, functions, control flow, print output

mod common;

use common::output;
use fsk::ast::{self, BinaryOp, Expr, Pattern, Stmt};
use fsk::tokenizer::{TokenKind, Tokenizer};
use fsk::{ParseError, Parser};

fn tokenize_and_parse(source: &str) -> Result<ast::Program, ParseError> {
    let mut tokenizer = Tokenizer::new(source);
    let tokens = tokenizer.tokenize().unwrap();
    let mut parser = Parser::new(tokens);
    parser.parse()
}

#[test]
fn test_tokenizer_positions_and_keywords() {
    let tokens = Tokenizer::new("let x = 1;\nprint x;").tokenize().unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Let);
    assert_eq!(tokens[3].kind, TokenKind::Number(1.0));
    let print = tokens
        .iter()
        .find(|token| token.kind == TokenKind::Print)
        .unwrap();
    assert_eq!(print.position.line, 2);
    assert_eq!(print.position.column, 1);
}

#[test]
fn test_tokenizer_reports_unterminated_string() {
    assert!(Tokenizer::new("print \"open").tokenize().is_err());
}

#[test]
fn test_arithmetic_precedence() {
    let program = tokenize_and_parse("1 + 2 * 3;").unwrap();
    match &program.statements[0] {
        Stmt::Expression {
            expr: Expr::Binary { op, right, .. },
            ..
        } => {
            assert_eq!(*op, BinaryOp::Add);
            assert!(matches!(
                right.as_ref(),
                Expr::Binary {
                    op: BinaryOp::Multiply,
                    ..
                }
            ));
        }
        other => panic!("expected binary expression, found {other:?}"),
    }
}

#[test]
fn test_variable_declaration() {
    let program = tokenize_and_parse("let x: int = 42; x = x + 1;").unwrap();
    match &program.statements[0] {
        Stmt::Let {
            pattern: Pattern::Variable(name),
            type_hint,
            ..
        } => {
            assert_eq!(name, "x");
            assert_eq!(type_hint.as_deref(), Some("int"));
        }
        other => panic!("expected let, found {other:?}"),
    }
    assert!(matches!(&program.statements[1], Stmt::Expression { expr: Expr::Assign { .. }, .. }));
}

#[test]
fn test_function_definition() {
    let program = tokenize_and_parse("fn add(a, b = 1) -> number { return a + b; }").unwrap();
    match &program.statements[0] {
        Stmt::Function { decl } => {
            assert_eq!(decl.name, "add");
            assert_eq!(decl.min_arity(), 1);
            assert_eq!(decl.max_arity(), 2);
            assert_eq!(decl.return_type.as_deref(), Some("number"));
        }
        other => panic!("expected function declaration, found {other:?}"),
    }
}

#[test]
fn test_parse_error_reports_position() {
    let error = tokenize_and_parse("let = 3;").unwrap_err();
    assert!(matches!(error, ParseError::UnexpectedToken { .. }));
    assert!(error.to_string().contains("line 1"));
}

#[test]
fn test_if_else_and_while() {
    let out = output(
        "let total = 0;
         let i = 0;
         while (i < 5) {
             if (i % 2 == 0) total = total + i; else total = total - 1;
             i = i + 1;
         }
         print total;",
    );
    assert_eq!(out, "4\n");
}

#[test]
fn test_print_formats_values() {
    let out = output(
        "print 3;
         print 2.5;
         print -0;
         print true;
         print nil;
         print [1, \"a\", [nil]];
         fn named() {}
         print named;",
    );
    assert_eq!(out, "3\n2.5\n0\ntrue\nnil\n[1, a, [nil]]\n<fn named>\n");
}

//=====================================================
// End of file
//=====================================================
