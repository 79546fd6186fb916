//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: FSK runtime library root
// Objective: Expose the front end, the tree-walking interpreter and the
//            concurrency fabric to the binary and to embedders
//=====================================================

pub mod ast;
pub mod config;
pub mod devtools;
pub mod interpreter;
pub mod logging;
pub mod modules;
pub mod parser;
pub mod runtime;
pub mod tokenizer;

pub use config::RuntimeOptions;
pub use interpreter::{ErrorCode, Interpreter, RuntimeError, ScriptError, Value};
pub use parser::{ParseError, Parser, parse_source};
pub use tokenizer::Tokenizer;

//=====================================================
// End of file
//=====================================================
