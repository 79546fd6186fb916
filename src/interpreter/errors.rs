//=====================================================
// File: interpreter/errors.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime failure taxonomy and control signals
// Objective: Separate recoverable runtime failures from user-thrown values and
//            map every failure onto a stable diagnostic code for hosts
//=====================================================

use super::value::Value;
use crate::modules::ModuleError;
use crate::parser::ParseError;
use std::fmt;
use thiserror::Error;

/// Host-level failures raised by the evaluator and native bindings.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),
    #[error("{0}")]
    TypeError(String),
    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: String, got: usize },
    #[error("{0}")]
    Index(String),
    #[error("Cannot assign to constant '{0}'.")]
    ConstAssignment(String),
    #[error("Uncaught exception: {0}")]
    Uncaught(String),
    #[error("Cannot return from top-level code.")]
    TopLevelReturn,
    #[error("'{0}' used outside of a loop.")]
    StrayLoopControl(&'static str),
    #[error("Stack overflow: call depth exceeded {0}.")]
    StackOverflow(usize),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("{0}")]
    Module(String),
    #[error("exit({0})")]
    Exit(i32),
}

impl RuntimeError {
    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::TypeError(message.into())
    }

    pub fn index(message: impl Into<String>) -> Self {
        RuntimeError::Index(message.into())
    }

    /// `exit()` unwinds through every `try`.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, RuntimeError::Exit(_))
    }
}

impl From<ModuleError> for RuntimeError {
    fn from(value: ModuleError) -> Self {
        RuntimeError::Module(value.to_string())
    }
}

/// Outcome of evaluation that is not a plain value.
#[derive(Debug, Clone)]
pub enum Signal {
    Return(Value),
    Throw(Value),
    Break,
    Continue,
    Error(RuntimeError),
}

impl Signal {
    /// Collapse a signal that escaped every interceptor into a failure.
    pub fn into_error(self) -> RuntimeError {
        match self {
            Signal::Return(_) => RuntimeError::TopLevelReturn,
            Signal::Throw(value) => RuntimeError::Uncaught(value.to_string()),
            Signal::Break => RuntimeError::StrayLoopControl("break"),
            Signal::Continue => RuntimeError::StrayLoopControl("continue"),
            Signal::Error(error) => error,
        }
    }
}

impl From<RuntimeError> for Signal {
    fn from(value: RuntimeError) -> Self {
        Signal::Error(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    ModuleResolution,
    TypeMismatch,
    Lookup,
    Arity,
    Index,
    Thrown,
    RuntimePanic,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::ModuleResolution => "E002",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::Lookup => "E004",
            ErrorCode::Arity => "E005",
            ErrorCode::Index => "E006",
            ErrorCode::Thrown => "E007",
            ErrorCode::RuntimePanic => "E008",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure shape handed to embedders and the command line driver.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("[{code}] {message}")]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        ScriptError::new(ErrorCode::Syntax, value.to_string())
    }
}

impl From<ModuleError> for ScriptError {
    fn from(value: ModuleError) -> Self {
        let code = match value {
            ModuleError::Tokenize { .. } | ModuleError::Parse { .. } => ErrorCode::Syntax,
            ModuleError::NotFound { .. } | ModuleError::Io { .. } => ErrorCode::ModuleResolution,
        };
        ScriptError::new(code, value.to_string())
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(runtime_error_code(&value), value.to_string())
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::UndefinedVariable(_) | RuntimeError::UndefinedProperty(_) => ErrorCode::Lookup,
        RuntimeError::TypeError(_) | RuntimeError::ConstAssignment(_) => ErrorCode::TypeMismatch,
        RuntimeError::Arity { .. } => ErrorCode::Arity,
        RuntimeError::Index(_) => ErrorCode::Index,
        RuntimeError::Uncaught(_) => ErrorCode::Thrown,
        RuntimeError::Module(_) => ErrorCode::ModuleResolution,
        RuntimeError::TopLevelReturn
        | RuntimeError::StrayLoopControl(_)
        | RuntimeError::StackOverflow(_)
        | RuntimeError::Io(_)
        | RuntimeError::Network(_)
        | RuntimeError::Exit(_) => ErrorCode::RuntimePanic,
    }
}


//=====================================================
// End of file
//=====================================================
