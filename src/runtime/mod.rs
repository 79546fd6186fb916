//=====================================================
// File: runtime/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Concurrency fabric around the evaluator thread
// Objective: Group the event loop, bounded queues, worker threads, fetch
//            promises and the HTTP listener behind one module
//=====================================================

pub mod event_loop;
pub mod fetch;
pub mod queue;
pub mod server;
pub mod worker;

pub use event_loop::{EventLoop, LoopHandle, Ready, Task, Timer};
pub use queue::BlockingQueue;
pub use server::ServerTable;
pub use worker::{WorkerId, WorkerLink, WorkerTable, spawn_worker};

/// Stack reserved for every thread that runs an interpreter. Deep recursion
/// in scripts maps onto deep native recursion in the evaluator.
pub const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

//=====================================================
// End of file
//=====================================================
