// FSK event loop behaviour: timers, cancellation, cross-thread completions
// and fetch promises

mod common;

use common::output;
use fsk::interpreter::Signal;
use fsk::{Interpreter, Value};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

#[test]
fn zero_delay_timer_runs_only_after_the_script() {
    let out = output(
        r#"setTimeout(fn() { print "later"; }, 20);
           setTimeout(fn() { print "soon"; }, 0);
           print "sync";"#,
    );
    assert_eq!(out, "sync\nsoon\nlater\n");
}

#[test]
fn timers_with_equal_deadlines_fire_in_scheduling_order() {
    let out = output(
        r#"setTimeout(fn() { print 1; });
           setTimeout(fn() { print 2; });
           setTimeout(fn() { print 3; });"#,
    );
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn cleared_timeout_never_runs() {
    let out = output(
        r#"let id = setTimeout(fn() { print "never"; }, 0);
           clearTimeout(id);
           print "done";"#,
    );
    assert_eq!(out, "done\n");
}

#[test]
fn interval_cancelled_from_its_own_callback_stops() {
    let out = output(
        "let n = 0;
         let id = nil;
         id = setInterval(fn() {
             n = n + 1;
             print n;
             if (n == 3) clearInterval(id);
         }, 1);",
    );
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn failing_callback_is_reported_and_the_loop_continues() {
    let outcome = common::run(
        r#"setTimeout(fn() { missing(); }, 0);
           setTimeout(fn() { print "still running"; }, 5);"#,
    );
    assert_eq!(outcome.stdout, "still running\n");
    assert!(outcome.stderr.contains("Undefined variable 'missing'."));
    assert!(outcome.result.is_ok());
}

#[test]
fn posted_completion_runs_on_the_evaluator_thread() {
    let mut interpreter = Interpreter::new();
    let output = interpreter.capture_output();
    interpreter
        .run_source("fn onDone(body) { print \"got \" + body; }")
        .unwrap();

    let evaluator = thread::current().id();
    let handle = interpreter.loop_handle();
    handle.begin_work();
    let background = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.complete(Box::new(move |interpreter: &mut Interpreter| {
            assert_eq!(thread::current().id(), evaluator);
            let callback = interpreter.get_global("onDone").unwrap_or_default();
            interpreter
                .call_value(&callback, vec![Value::string("payload")])
                .map(|_| ())
                .map_err(Signal::into_error)
        }));
    });

    interpreter.run_event_loop().unwrap();
    background.join().unwrap();
    assert_eq!(output.borrow().as_str(), "got payload\n");
    assert_eq!(interpreter.loop_handle().outstanding(), 0);
}

#[test]
fn successful_fetch_resolves_with_the_body() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 1024];
        let _ = stream.read(&mut request);
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello")
            .unwrap();
    });

    let out = output(&format!(
        r#"let p = FSK.fetch("http://127.0.0.1:{}/greeting");
           p.then(fn(body) {{
               print "then " + body;
               print p.status;
               print p.value;
           }});
           p.catch(fn(error) {{ print "rejected " + error; }});
           print p.status;"#,
        port
    ));
    assert_eq!(out, "pending\nthen hello\nresolved\nhello\n");
    server.join().unwrap();
}

#[test]
fn failed_fetch_rejects_the_promise() {
    let out = output(
        r#"let p = FSK.fetch("http://127.0.0.1:1/");
           print p.status;
           p.then(fn(body) { print "resolved"; })
            .catch(fn(error) { print "rejected " + p.status; });"#,
    );
    assert_eq!(out, "pending\nrejected rejected\n");
}

#[test]
fn then_after_settlement_runs_immediately() {
    let out = output(
        r#"let p = FSK.fetch("http://127.0.0.1:1/");
           setTimeout(fn() {
               p.catch(fn(error) { print "late " + p.status; });
           }, 200);"#,
    );
    assert_eq!(out, "late rejected\n");
}

#[test]
fn await_passes_plain_values_through() {
    let out = output(
        "async fn value() { return 5; }
         print await value();
         print await 7;",
    );
    assert_eq!(out, "5\n7\n");
}

//=====================================================
// End of file
//=====================================================
