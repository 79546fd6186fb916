// FSK language semantics driven end to end through `Interpreter::run_source`
// Covers: closures, arity and defaults, try/throw, classes and super,
// destructuring, match, pipe and coalesce, const, recursion limits, imports

mod common;

use common::{fsk_path, output, run, run_file, run_with};
use fsk::{ErrorCode, RuntimeOptions};
use std::fs;

#[test]
fn closures_capture_each_iteration() {
    let out = output(
        "let fns = [];
         for (let i = 0; i < 3; i = i + 1) {
             let j = i;
             fns.push(fn() { return j; });
         }
         print fns[0]();
         print fns[1]();
         print fns[2]();",
    );
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn counters_share_their_closure_scope() {
    let out = output(
        "fn counter() {
             let count = 0;
             return fn() { count = count + 1; return count; };
         }
         let next = counter();
         next();
         next();
         print next();",
    );
    assert_eq!(out, "3\n");
}

#[test]
fn defaults_fill_missing_trailing_arguments_in_order() {
    let out = output(
        "fn f(a, b = a + 1, c = b * 2) { return [a, b, c]; }
         print f(1);
         print f(1, 5);
         print f(1, 2, 3);",
    );
    assert_eq!(out, "[1, 2, 4]\n[1, 5, 10]\n[1, 2, 3]\n");
}

#[test]
fn arity_outside_range_is_catchable() {
    let out = output(
        "fn f(a, b = 1, c = 2) { return a; }
         try { f(); } catch (e) { print e; }
         try { f(1, 2, 3, 4); } catch (e) { print e; }",
    );
    assert_eq!(
        out,
        "Expected 1-3 arguments but got 0.\nExpected 1-3 arguments but got 4.\n"
    );
}

#[test]
fn thrown_values_reach_catch_and_execution_continues() {
    let out = output(r#"try { throw "boom"; } catch (e) { print e; } print "after";"#);
    assert_eq!(out, "boom\nafter\n");
}

#[test]
fn thrown_payload_keeps_its_shape() {
    let out = output(
        "try { throw [1, 2]; } catch (e) { print e.length; }
         try { throw { code: 7 }; } catch (e) { print e.code; }",
    );
    assert_eq!(out, "2\n7\n");
}

#[test]
fn runtime_failures_are_caught_as_strings() {
    let out = output(
        "try { let x = nil; x.field; } catch (e) { print e; }
         try { undefinedThing; } catch (e) { print e; }",
    );
    assert!(out.contains("cannot read 'field' of nil"));
    assert!(out.ends_with("Undefined variable 'undefinedThing'.\n"));
}

#[test]
fn return_inside_try_leaves_the_function() {
    let out = output(
        "fn pick() {
             try { return 1; } catch (e) { return 2; }
             return 3;
         }
         print pick();",
    );
    assert_eq!(out, "1\n");
}

#[test]
fn subclass_inherits_init_and_super_binds_this() {
    let out = output(
        r#"class A {
               init(name) { this.name = name; }
               greet() { return "A:" + this.name; }
           }
           class B < A {
               greet() { return "B+" + super.greet(); }
           }
           let b = B("x");
           print b.greet();
           print b.name;
           print b;"#,
    );
    assert_eq!(out, "B+A:x\nx\nB instance\n");
}

#[test]
fn methods_stay_bound_when_detached() {
    let out = output(
        "class Box {
             init(v) { this.v = v; }
             get() { return this.v; }
         }
         let getter = Box(9).get;
         print getter();",
    );
    assert_eq!(out, "9\n");
}

#[test]
fn superclass_must_be_a_class() {
    let outcome = run("let NotAClass = 1; class C < NotAClass {}");
    let error = outcome.result.unwrap_err();
    assert_eq!(error.code, ErrorCode::TypeMismatch);
    assert_eq!(error.message, "Superclass must be a class.");
}

#[test]
fn array_destructuring_binds_rest_and_missing_as_nil() {
    let out = output(
        "let [a, ...rest] = [1, 2, 3];
         print a;
         print rest;
         let [x, y, z] = [1];
         print x;
         print y;
         print z;",
    );
    assert_eq!(out, "1\n[2, 3]\n1\nnil\nnil\n");
}

#[test]
fn object_destructuring_and_shorthand_fields() {
    let out = output(
        "let name = \"fsk\";
         let config = { name, depth: 3 };
         let { name: label, depth } = config;
         print label + depth;",
    );
    assert_eq!(out, "fsk3\n");
}

#[test]
fn match_takes_the_first_matching_arm_only() {
    let out = output(
        r#"let x = [2, 3];
           match (x) {
               1 -> print "one";
               [a, b] -> print a + b;
               [a, ...rest] -> print "rest";
           }"#,
    );
    assert_eq!(out, "5\n");
}

#[test]
fn match_without_a_matching_arm_does_nothing() {
    let out = output(
        r#"match ("z") { "a" -> print "a"; 1 -> print "1"; } print "done";"#,
    );
    assert_eq!(out, "done\n");
}

#[test]
fn pipe_and_coalesce() {
    let out = output(
        "fn double(n) { return n * 2; }
         print 4 |> double |> double;
         print false ?? 1;
         print nil ?? 1;",
    );
    assert_eq!(out, "16\nfalse\n1\n");
}

#[test]
fn pipe_requires_a_unary_function() {
    let outcome = run("fn pair(a, b) { return a; } 1 |> pair;");
    assert_eq!(
        outcome.result.unwrap_err().message,
        "Pipe operator expects a function with 1 argument."
    );
}

#[test]
fn const_reassignment_fails_and_is_catchable() {
    let out = output(
        "const k = 1;
         try { k = 2; } catch (e) { print e; }
         print k;",
    );
    assert_eq!(out, "Cannot assign to constant 'k'.\n1\n");
}

#[test]
fn deep_recursion_is_a_catchable_stack_overflow() {
    let options = RuntimeOptions {
        max_call_depth: 64,
        ..RuntimeOptions::default()
    };
    let outcome = run_with(
        "fn down(n) { return down(n + 1); }
         try { down(0); } catch (e) { print e; }
         fn fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }
         print fact(10);",
        options,
        None,
    );
    assert_eq!(
        outcome.expect_ok(),
        "Stack overflow: call depth exceeded 64.\n3628800\n"
    );
}

#[test]
fn arrays_alias_and_expose_methods() {
    let out = output(
        r#"let a = [3, 1, 2];
           let alias = a;
           alias.push(4);
           print a.length;
           print a.map(fn(x) { return x * 10; });
           print a.filter(fn(x, i) { return i > 1; });
           print a.slice(-2);
           print a.join("-");
           print a.includes(2);
           print a.indexOf(9);
           print [...a, 5].length;"#,
    );
    assert_eq!(out, "4\n[30, 10, 20, 40]\n[2, 4]\n[2, 4]\n3-1-2-4\ntrue\n-1\n5\n");
}

#[test]
fn string_methods_are_character_based() {
    let out = output(
        r#"print "a,b".split(",");
           print "  hi ".trim().toUpperCase();
           print "hello".substr(1, 3);
           print "héllo".length;
           print "aXbXc".replace("X", "-");
           print "fsk"[1];"#,
    );
    assert_eq!(out, "[a, b]\nHI\nell\n5\na-b-c\ns\n");
}

#[test]
fn arrow_functions_and_templates() {
    let out = output(
        "let add = (a, b) => a + b;
         let square = x => x * x;
         print `${add(1, 2)} and ${square(4)}`;",
    );
    assert_eq!(out, "3 and 16\n");
}

#[test]
fn json_bindings_round_trip() {
    let out = output(
        r#"let data = JSON.parse("{\"n\": 2, \"items\": [1, \"two\"]}");
           print data.n + 1;
           print data.items[1];
           print JSON.stringify({ ok: true, list: [1, 2.5] });
           print JSON.parse("not json");"#,
    );
    assert_eq!(out, "3\ntwo\n{\"list\":[1,2.5],\"ok\":true}\nnil\n");
}

#[test]
fn import_reexecutes_the_module_each_time() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("counter.fsk"), "hits = hits + 1;").unwrap();
    let main = dir.path().join("main.fsk");
    fs::write(
        &main,
        r#"let hits = 0;
           import "counter";
           import "counter.fsk";
           print hits;"#,
    )
    .unwrap();

    assert_eq!(run_file(&main).expect_ok(), "2\n");
}

#[test]
fn imported_definitions_land_in_globals() {
    let dir = tempfile::tempdir().unwrap();
    let lib = dir.path().join("lib.fsk");
    fs::write(&lib, "fn shout(s) { return s.toUpperCase(); }").unwrap();

    let source = format!("import \"{}\"; print shout(\"hey\");", fsk_path(&lib));
    assert_eq!(output(&source), "HEY\n");
}

#[test]
fn missing_import_is_a_module_failure() {
    let outcome = run("import \"definitely/not/here\";");
    let error = outcome.result.unwrap_err();
    assert_eq!(error.code, ErrorCode::ModuleResolution);
    assert!(outcome.stderr.contains("Could not open file: definitely/not/here"));
}

#[test]
fn self_containing_arrays_print_and_compare_without_overflow() {
    let out = output(
        "let a = [1];
         a.push(a);
         let b = [1];
         b.push(b);
         print a;
         print a == b;
         print a.includes(a);
         a.pop();
         b.pop();
         print \"alive\";",
    );
    assert_eq!(out, "[1, [...]]\ntrue\ntrue\nalive\n");
}

#[test]
fn a_failing_statement_stops_the_rest() {
    let outcome = run("print 1; print missing; print 2;");
    assert_eq!(outcome.stdout, "1\n");
    assert!(outcome.stderr.contains("[E004] Undefined variable 'missing'."));
}

//=====================================================
// End of file
//=====================================================
