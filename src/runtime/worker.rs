//=====================================================
// File: runtime/worker.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Worker scripts on their own threads
// Objective: Spawn an independent interpreter per worker, connected to its
//            spawner only through a pair of bounded string queues
//=====================================================

use super::INTERPRETER_STACK_SIZE;
use super::queue::BlockingQueue;
use crate::config::RuntimeOptions;
use crate::interpreter::{Interpreter, RuntimeError};
use crate::modules::ModuleLoader;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Handle into the runtime's worker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

/// Both directions of a worker connection. `inbound` flows spawner to
/// worker, `outbound` flows worker to spawner.
#[derive(Debug, Clone)]
pub struct WorkerLink {
    pub inbound: Arc<BlockingQueue<String>>,
    pub outbound: Arc<BlockingQueue<String>>,
}

impl WorkerLink {
    pub fn new(capacity: usize) -> Self {
        Self {
            inbound: Arc::new(BlockingQueue::new(capacity)),
            outbound: Arc::new(BlockingQueue::new(capacity)),
        }
    }

    /// Close both directions. A worker blocked on a full outbound queue
    /// gets its post refused and keeps running.
    pub fn close(&self) {
        self.inbound.close();
        self.outbound.close();
    }
}

/// Live workers owned by one interpreter.
#[derive(Debug, Default)]
pub struct WorkerTable {
    next_id: u64,
    workers: HashMap<WorkerId, WorkerLink>,
}

impl WorkerTable {
    pub fn insert(&mut self, link: WorkerLink) -> WorkerId {
        self.next_id += 1;
        let id = WorkerId(self.next_id);
        self.workers.insert(id, link);
        id
    }

    pub fn get(&self, id: WorkerId) -> Option<&WorkerLink> {
        self.workers.get(&id)
    }

    pub fn remove(&mut self, id: WorkerId) -> Option<WorkerLink> {
        self.workers.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Close every connection so blocked workers can finish.
    pub fn close_all(&mut self) {
        for (_, link) in self.workers.drain() {
            link.close();
        }
    }
}

//Function: spawn_worker
//Purpose: Start `path` on a new thread with its own interpreter
//Inputs: resolved script path, options cloned from the spawner
//Returns: the spawner's side of the connection
pub fn spawn_worker(path: PathBuf, options: RuntimeOptions) -> Result<WorkerLink, RuntimeError> {
    let link = WorkerLink::new(options.worker_queue_capacity);
    let worker_side = link.clone();
    thread::Builder::new()
        .name(format!("fsk-worker:{}", path.display()))
        .stack_size(INTERPRETER_STACK_SIZE)
        .spawn(move || run_worker(&path, options, worker_side))
        .map_err(|error| RuntimeError::Io(format!("failed to spawn worker: {}", error)))?;
    Ok(link)
}

fn run_worker(path: &Path, options: RuntimeOptions, link: WorkerLink) {
    info!(path = %path.display(), "worker started");
    let outbound = Arc::clone(&link.outbound);
    if let Err(error) = execute_worker_script(path, options, link) {
        warn!(path = %path.display(), %error, "worker script failed");
    }
    // Unblocks any `wait` on the spawner side.
    outbound.close();
    info!(path = %path.display(), "worker finished");
}

fn execute_worker_script(
    path: &Path,
    options: RuntimeOptions,
    link: WorkerLink,
) -> Result<(), RuntimeError> {
    let program = ModuleLoader::new(options.module_paths.clone()).load(path)?;
    let run_loop = options.worker_event_loop;
    let mut interpreter = Interpreter::with_options(options);
    interpreter.set_script_path(path);
    interpreter.attach_worker(link);
    interpreter.interpret(&program)?;
    if run_loop {
        interpreter.run_event_loop()?;
    }
    Ok(())
}


//=====================================================
// End of file
//=====================================================
