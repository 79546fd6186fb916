//==============================================
// File: tests/workers.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Worker and Task scripts on their own interpreter threads
// Objective: Validate message passing, wait semantics and missing scripts
//==============================================

mod common;

use common::{fsk_path, output, run, run_with};
use fsk::RuntimeOptions;
use std::fs;
use std::thread;
use std::time::Duration;

#[test]
fn task_run_yields_the_first_posted_message() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("task.fsk");
    fs::write(
        &script,
        r#"workerPostMessage("first");
           workerPostMessage("second");"#,
    )
    .unwrap();

    let out = output(&format!(
        "let task = Task.run(\"{}\"); print await task;",
        fsk_path(&script)
    ));
    assert_eq!(out, "first\n");
}

#[test]
fn task_that_posts_nothing_yields_nil() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("quiet.fsk");
    fs::write(&script, "let x = 1 + 1;").unwrap();

    let out = output(&format!(
        "print Task.run(\"{}\").wait();",
        fsk_path(&script)
    ));
    assert_eq!(out, "nil\n");
}

#[test]
fn failing_task_still_unblocks_wait() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("broken.fsk");
    fs::write(&script, "missing();").unwrap();

    let out = output(&format!(
        "print await Task.run(\"{}\");",
        fsk_path(&script)
    ));
    assert_eq!(out, "nil\n");
}

#[test]
fn worker_messages_cross_as_strings() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("echo.fsk");
    fs::write(
        &script,
        r#"let inbox = [];
           while (inbox.length == 0) {
               inbox = workerPoll();
               sleep(2);
           }
           workerPostMessage("echo:" + inbox[0]);"#,
    )
    .unwrap();

    let out = output(&format!(
        r#"let worker = Worker.init("{}");
           worker.postMessage(42);
           let replies = [];
           while (replies.length == 0) {{
               replies = worker.poll();
               sleep(2);
           }}
           print replies[0];
           print worker.terminate();
           print worker.postMessage("late");"#,
        fsk_path(&script)
    ));
    assert_eq!(out, "echo:42\ntrue\nfalse\n");
}

#[test]
fn wait_releases_a_task_blocked_on_a_full_queue() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("finished.txt");
    let script = dir.path().join("chatty.fsk");
    fs::write(
        &script,
        format!(
            r#"let i = 0;
               while (i < 5) {{
                   workerPostMessage("m" + i);
                   i = i + 1;
               }}
               writeFile("{}", "done");"#,
            fsk_path(&marker)
        ),
    )
    .unwrap();

    let options = RuntimeOptions {
        worker_queue_capacity: 2,
        ..RuntimeOptions::default()
    };
    let outcome = run_with(
        &format!("print Task.run(\"{}\").wait();", fsk_path(&script)),
        options,
        None,
    );
    assert_eq!(outcome.expect_ok(), "m0\n");

    for _ in 0..200 {
        if marker.exists() {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert!(marker.exists(), "worker never got past its blocked post");
}

#[test]
fn missing_worker_script_is_catchable() {
    let outcome = run(
        r#"try { Task.run("no/such/worker.fsk"); } catch (e) { print "missing"; }"#,
    );
    assert_eq!(outcome.expect_ok(), "missing\n");
}

//=====================================================
// End of file
//=====================================================
