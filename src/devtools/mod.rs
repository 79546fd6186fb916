//=====================================================
// File: devtools/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Interactive tooling
// Objective: Host the REPL used by `fsk repl`
//=====================================================

pub mod repl;

pub use repl::{LineOutcome, Repl};

//=====================================================
// End of file
//=====================================================
