// Stable diagnostic codes for parse, module and runtime failures

mod common;

use common::run;
use fsk::interpreter::{RuntimeError, ScriptError};
use fsk::modules::ModuleError;
use fsk::parser::Parser;
use fsk::tokenizer::Tokenizer;

#[test]
fn parse_error_uses_e001() {
    let mut tokenizer = Tokenizer::new("fn demo(");
    let tokens = tokenizer.tokenize().expect("tokenize");
    let mut parser = Parser::new(tokens);
    let err = parser.parse().expect_err("should fail");
    let script_err: ScriptError = err.into();
    assert_eq!(script_err.code_str(), "E001");
}

#[test]
fn module_error_uses_e002() {
    let err = ModuleError::NotFound {
        spec: "missing".to_string(),
        tried: Vec::new(),
    };
    let script_err: ScriptError = err.into();
    assert_eq!(script_err.code_str(), "E002");
}

#[test]
fn runtime_failures_map_onto_codes() {
    let cases = [
        (RuntimeError::TypeError("expected number".into()), "E003"),
        (RuntimeError::ConstAssignment("k".into()), "E003"),
        (RuntimeError::UndefinedVariable("x".into()), "E004"),
        (RuntimeError::UndefinedProperty("y".into()), "E004"),
        (
            RuntimeError::Arity {
                expected: "2".into(),
                got: 1,
            },
            "E005",
        ),
        (RuntimeError::Index("Index out of bounds.".into()), "E006"),
        (RuntimeError::Uncaught("boom".into()), "E007"),
        (RuntimeError::StackOverflow(10), "E008"),
    ];
    for (error, code) in cases {
        let script_err: ScriptError = error.into();
        assert_eq!(script_err.code_str(), code, "{}", script_err.message);
    }
}

#[test]
fn exit_is_never_catchable() {
    assert!(!RuntimeError::Exit(0).is_catchable());
    let outcome = run("try { exit(4); } catch (e) { print \"caught\"; } print \"after\";");
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.result.unwrap_err().message, "exit(4)");
}

#[test]
fn reported_diagnostics_carry_code_and_position() {
    let outcome = run("let a = [1];\nprint a[5];");
    assert!(
        outcome
            .stderr
            .contains("[E006] Index out of bounds. (line 2, column 1)"),
        "stderr was {:?}",
        outcome.stderr
    );
}

#[test]
fn relational_operators_reject_strings_with_e003() {
    let outcome = run("print \"a\" < \"b\";\nprint \"after\";");
    assert_eq!(outcome.stdout, "");
    let error = outcome.result.unwrap_err();
    assert_eq!(error.code_str(), "E003");
    assert_eq!(error.message, "Operands must be numbers.");
    assert!(outcome.stderr.contains("[E003] Operands must be numbers. (line 1"));
}

#[test]
fn syntax_errors_are_reported_before_running() {
    let outcome = run("print 1;\nlet = ;");
    assert_eq!(outcome.stdout, "");
    assert_eq!(outcome.result.unwrap_err().code_str(), "E001");
    assert!(outcome.stderr.starts_with("[E001]"));
}

//=====================================================
// End of file
//=====================================================
