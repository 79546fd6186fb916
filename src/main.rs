//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: FSK command line entry point
// Objective: Run script files or an interactive session on a large-stack
//            interpreter thread, mapping script outcomes onto exit codes
//=====================================================

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use fsk::devtools::Repl;
use fsk::interpreter::{Interpreter, RuntimeError, ScriptError};
use fsk::runtime::INTERPRETER_STACK_SIZE;
use fsk::{RuntimeOptions, logging, parse_source};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "fsk",
    version,
    about = "FSK scripting language runtime",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Script to run; shorthand for `fsk run <script>`.
    pub script: Option<PathBuf>,

    /// Arguments passed through to the script.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Runtime configuration file (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Do not pump timers and background completions after the script.
    #[arg(long = "no-event-loop", global = true)]
    pub no_event_loop: bool,

    /// Raise the log level to debug.
    #[arg(long, global = true)]
    pub trace: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a script file.
    Run(RunArgs),
    /// Start an interactive session.
    Repl,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Path to the script to execute.
    pub script: PathBuf,

    /// Arguments passed through to the script.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

enum Mode {
    Run(PathBuf, Vec<String>),
    Repl,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut options, origin) =
        RuntimeOptions::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.no_event_loop {
        options.run_event_loop = false;
    }
    logging::init(if cli.trace { "debug" } else { options.log_level.as_str() });
    debug!(config = ?origin, "configuration loaded");

    let mode = match cli.command {
        Some(Command::Run(run)) => Mode::Run(run.script, run.args),
        Some(Command::Repl) => Mode::Repl,
        None => match cli.script {
            Some(script) => Mode::Run(script, cli.args),
            None => Mode::Repl,
        },
    };

    let code = on_interpreter_thread(move || match mode {
        Mode::Run(script, args) => run_script(&script, args, options),
        Mode::Repl => run_repl(options),
    })?;

    if code != 0 {
        process::exit(code);
    }
    Ok(())
}

/// Scripts recurse on the native stack, so they get a dedicated thread.
fn on_interpreter_thread<F>(task: F) -> Result<i32>
where
    F: FnOnce() -> Result<i32> + Send + 'static,
{
    thread::Builder::new()
        .name("fsk-main".to_string())
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(task)
        .context("failed to start interpreter thread")?
        .join()
        .map_err(|_| anyhow!("interpreter thread panicked"))?
}

//Function: run_script
//Purpose: Parse, evaluate, then pump the event loop until idle
//Inputs: script path, script arguments, runtime options
//Returns: process exit code; failures were already reported on stderr
fn run_script(path: &Path, args: Vec<String>, options: RuntimeOptions) -> Result<i32> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let run_loop = options.run_event_loop;

    let mut interpreter = Interpreter::with_options(options);
    interpreter.set_script_path(path);
    interpreter.set_args(args);
    info!(script = %path.display(), "running script");

    let program = match parse_source(&source) {
        Ok(program) => program,
        Err(error) => {
            interpreter.report(&ScriptError::from(error));
            return Ok(1);
        }
    };

    match interpreter.interpret(&program) {
        Ok(()) => {}
        Err(RuntimeError::Exit(code)) => return Ok(code),
        Err(_) => return Ok(1),
    }

    if run_loop {
        if let Err(RuntimeError::Exit(code)) = interpreter.run_event_loop() {
            return Ok(code);
        }
    }
    Ok(0)
}

fn run_repl(options: RuntimeOptions) -> Result<i32> {
    let mut repl = Repl::new(Interpreter::with_options(options));
    match repl.run(io::stdin().lock()) {
        Ok(()) => Ok(0),
        Err(RuntimeError::Exit(code)) => Ok(code),
        Err(error) => Err(anyhow::Error::new(error).context("repl session failed")),
    }
}

//=====================================================
// End of file
//=====================================================
