//=====================================================
// File: tests/common/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared harness for integration tests
// Objective: Run FSK sources on a large-stack thread with captured output
//=====================================================

#![allow(dead_code)]

use fsk::{Interpreter, RuntimeOptions, ScriptError};
use std::path::{Path, PathBuf};
use std::thread;

const TEST_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Everything a script produced.
#[derive(Debug)]
pub struct Outcome {
    pub stdout: String,
    pub stderr: String,
    pub result: Result<(), ScriptError>,
}

impl Outcome {
    pub fn expect_ok(self) -> String {
        if let Err(error) = &self.result {
            panic!("script failed: {} (stderr: {})", error, self.stderr);
        }
        self.stdout
    }
}

pub fn run_with(source: &str, options: RuntimeOptions, script: Option<PathBuf>) -> Outcome {
    let source = source.to_string();
    thread::Builder::new()
        .stack_size(TEST_STACK_SIZE)
        .spawn(move || {
            let mut interpreter = Interpreter::with_options(options);
            if let Some(script) = &script {
                interpreter.set_script_path(script);
            }
            let stdout = interpreter.capture_output();
            let stderr = interpreter.capture_errors();
            let result = interpreter.run_source(&source);
            let stdout = stdout.borrow().clone();
            let stderr = stderr.borrow().clone();
            Outcome {
                stdout,
                stderr,
                result,
            }
        })
        .expect("spawn test interpreter")
        .join()
        .expect("test interpreter panicked")
}

pub fn run(source: &str) -> Outcome {
    run_with(source, RuntimeOptions::default(), None)
}

/// Stdout of a script that must succeed.
pub fn output(source: &str) -> String {
    run(source).expect_ok()
}

/// Run `path` as the main script so imports resolve next to it.
pub fn run_file(path: &Path) -> Outcome {
    let source = std::fs::read_to_string(path).expect("read script");
    run_with(&source, RuntimeOptions::default(), Some(path.to_path_buf()))
}

/// Path text safe to embed in an FSK string literal.
pub fn fsk_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

//=====================================================
// End of file
//=====================================================
