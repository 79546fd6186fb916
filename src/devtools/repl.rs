//=====================================================
// File: devtools/repl.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Interactive read-eval-print loop
// Objective: Keep one interpreter and its globals alive across input lines,
//            buffer incomplete input, and survive failing lines
//=====================================================

use crate::ast::Stmt;
use crate::interpreter::{Interpreter, RuntimeError, ScriptError};
use crate::parser::{ParseError, parse_source};
use std::io::BufRead;
use tracing::debug;

const PROMPT: &str = "fsk> ";
const CONTINUATION_PROMPT: &str = "...> ";

/// What the REPL did with one line of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// The buffered input is incomplete; more lines are needed.
    NeedMore,
    Evaluated,
    Quit,
}

pub struct Repl {
    interpreter: Interpreter,
    pending: String,
}

impl Repl {
    pub fn new(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            pending: String::new(),
        }
    }

    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    //Function: feed
    //Purpose: Accept one line; evaluate once the buffered input parses
    //Inputs: raw input line
    //Returns: the outcome, or Err only when the script called `exit()`
    pub fn feed(&mut self, line: &str) -> Result<LineOutcome, RuntimeError> {
        let trimmed = line.trim();
        if self.pending.is_empty() {
            if trimmed == ".quit" {
                return Ok(LineOutcome::Quit);
            }
            if trimmed.is_empty() {
                return Ok(LineOutcome::Evaluated);
            }
        }

        self.pending.push_str(line);
        self.pending.push('\n');

        let program = match parse_source(&self.pending) {
            Ok(program) => program,
            Err(ParseError::UnexpectedEndOfInput { .. }) => return Ok(LineOutcome::NeedMore),
            Err(error) => {
                self.pending.clear();
                self.interpreter.report(&ScriptError::from(error));
                return Ok(LineOutcome::Evaluated);
            }
        };
        self.pending.clear();

        let count = program.statements.len();
        for (index, statement) in program.statements.iter().enumerate() {
            let is_last = index + 1 == count;
            let outcome = match statement {
                // A trailing expression is echoed.
                Stmt::Expression { expr, .. } if is_last => {
                    self.interpreter.evaluate_in_globals(expr).map(|value| {
                        if !value.is_nil() {
                            self.interpreter.stdout().write_line(&value.to_string());
                        }
                    })
                }
                _ => self.interpreter.execute_in_globals(statement),
            };
            if let Err(error) = outcome {
                if !error.is_catchable() {
                    return Err(error);
                }
                debug!(%error, "repl line failed");
                self.interpreter.report(&ScriptError::from(error));
                break;
            }
        }

        self.interpreter.run_event_loop()?;
        Ok(LineOutcome::Evaluated)
    }

    /// Drive the session from `input` until end of input or `.quit`.
    pub fn run(&mut self, input: impl BufRead) -> Result<(), RuntimeError> {
        self.write_prompt();
        for line in input.lines() {
            let line = line.map_err(|error| RuntimeError::Io(error.to_string()))?;
            if self.feed(&line)? == LineOutcome::Quit {
                return Ok(());
            }
            self.write_prompt();
        }
        Ok(())
    }

    fn write_prompt(&self) {
        let prompt = if self.is_pending() {
            CONTINUATION_PROMPT
        } else {
            PROMPT
        };
        self.interpreter.stdout().write_str(prompt);
    }
}


//=====================================================
// End of file
//=====================================================
