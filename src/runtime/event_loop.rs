//=====================================================
// File: runtime/event_loop.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Cooperative scheduler for the evaluator thread
// Objective: Timer min-heap with cancellation, FIFO task queue fed from other
//            threads, and an outstanding-work counter that keeps the loop
//            alive while background replies are in flight
//=====================================================

use crate::interpreter::{Interpreter, RuntimeError, Value};
use parking_lot::{Condvar, Mutex};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Work queued for the evaluator thread. Background threads build these from
/// plain data; only the evaluator thread runs them.
pub type Task = Box<dyn FnOnce(&mut Interpreter) -> Result<(), RuntimeError> + Send>;

//=====================================================
//            Section 1: Cross-thread handle
//=====================================================

#[derive(Default)]
struct LoopState {
    tasks: VecDeque<Task>,
    outstanding: usize,
}

#[derive(Default)]
struct Shared {
    state: Mutex<LoopState>,
    wake: Condvar,
}

/// Sendable handle used by background threads to reach the loop.
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<Shared>,
}

impl LoopHandle {
    pub fn post(&self, task: Task) {
        self.shared.state.lock().tasks.push_back(task);
        self.shared.wake.notify_one();
    }

    /// Register a unit of background work that will later `complete`.
    pub fn begin_work(&self) {
        self.shared.state.lock().outstanding += 1;
    }

    /// Queue the completion task and release the work unit in one step, so
    /// the loop never observes a zero counter with the reply still missing.
    pub fn complete(&self, task: Task) {
        {
            let mut state = self.shared.state.lock();
            state.tasks.push_back(task);
            state.outstanding = state.outstanding.saturating_sub(1);
        }
        self.shared.wake.notify_one();
    }

    /// Release a work unit that ends without a reply, such as a listener
    /// being closed.
    pub fn end_work(&self) {
        {
            let mut state = self.shared.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
        }
        self.shared.wake.notify_one();
    }

    pub fn outstanding(&self) -> usize {
        self.shared.state.lock().outstanding
    }
}

//=====================================================
//            Section 2: Timers
//=====================================================

/// A due timer handed to the driver.
pub struct Timer {
    pub id: u64,
    pub callback: Value,
    pub interval: Option<Duration>,
}

struct TimerEntry {
    deadline: Instant,
    seq: u64,
    timer: Timer,
}

// Earlier deadline first; equal deadlines fire in scheduling order.
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimerEntry {}

pub enum Ready {
    Timer(Timer),
    Task(Task),
    /// No timers, no tasks and no outstanding work: nothing more can happen.
    Idle,
}

//=====================================================
//            Section 3: Event loop
//=====================================================

pub struct EventLoop {
    shared: Arc<Shared>,
    timers: BinaryHeap<Reverse<TimerEntry>>,
    /// Handles scheduled and not cancelled, including one currently firing.
    live: HashSet<u64>,
    /// Cancelled handles whose entry is still in the heap or firing.
    cancelled: HashSet<u64>,
    next_timer_id: u64,
    next_seq: u64,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            timers: BinaryHeap::new(),
            live: HashSet::new(),
            cancelled: HashSet::new(),
            next_timer_id: 1,
            next_seq: 0,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn post(&self, task: Task) {
        self.handle().post(task);
    }

    //Function: schedule
    //Purpose: Arm a one-shot or repeating timer
    //Inputs: callback value, delay, repeat flag
    //Returns: integer handle accepted by `cancel`
    pub fn schedule(&mut self, callback: Value, delay: Duration, repeat: bool) -> u64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.live.insert(id);
        let timer = Timer {
            id,
            callback,
            interval: repeat.then_some(delay),
        };
        self.push_entry(Instant::now() + delay, timer);
        debug!(timer = id, delay_ms = delay.as_millis() as u64, repeat, "timer scheduled");
        id
    }

    fn push_entry(&mut self, deadline: Instant, timer: Timer) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.timers.push(Reverse(TimerEntry {
            deadline,
            seq,
            timer,
        }));
    }

    /// Mark a handle cancelled. Unknown or finished handles are ignored.
    pub fn cancel(&mut self, id: u64) -> bool {
        if self.live.remove(&id) {
            self.cancelled.insert(id);
            debug!(timer = id, "timer cancelled");
            true
        } else {
            false
        }
    }

    /// Called after a timer's callback returned.
    pub fn rearm(&mut self, timer: Timer) {
        if self.cancelled.remove(&timer.id) {
            return;
        }
        match timer.interval {
            Some(interval) => self.push_entry(Instant::now() + interval, timer),
            None => {
                self.live.remove(&timer.id);
            }
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.live.len()
    }

    //Function: next_ready
    //Purpose: Pick the next unit of work, blocking while only timers in the
    //         future or outstanding background work remain
    //Inputs: none
    //Returns: a due timer, a task, or Idle
    pub fn next_ready(&mut self) -> Ready {
        loop {
            let now = Instant::now();
            while self
                .timers
                .peek()
                .is_some_and(|Reverse(entry)| entry.deadline <= now)
            {
                let Some(Reverse(entry)) = self.timers.pop() else {
                    break;
                };
                if self.cancelled.remove(&entry.timer.id) {
                    trace!(timer = entry.timer.id, "skipping cancelled timer");
                    continue;
                }
                return Ready::Timer(entry.timer);
            }

            let mut state = self.shared.state.lock();
            if let Some(task) = state.tasks.pop_front() {
                return Ready::Task(task);
            }

            if self.live.is_empty() && state.outstanding == 0 {
                self.timers.clear();
                self.cancelled.clear();
                return Ready::Idle;
            }

            match self.timers.peek() {
                Some(Reverse(entry)) => {
                    let deadline = entry.deadline;
                    self.shared.wake.wait_until(&mut state, deadline);
                }
                None => {
                    trace!(outstanding = state.outstanding, "waiting for background work");
                    self.shared.wake.wait(&mut state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn tag(n: f64) -> Value {
        Value::Number(n)
    }

    fn fire_order(event_loop: &mut EventLoop) -> Vec<f64> {
        let mut fired = Vec::new();
        loop {
            match event_loop.next_ready() {
                Ready::Timer(timer) => {
                    fired.push(timer.callback.as_number().unwrap_or(-1.0));
                    event_loop.rearm(timer);
                }
                Ready::Task(_) => fired.push(0.0),
                Ready::Idle => return fired,
            }
        }
    }

    #[test]
    fn idle_when_nothing_scheduled() {
        let mut event_loop = EventLoop::new();
        assert!(matches!(event_loop.next_ready(), Ready::Idle));
    }

    #[test]
    fn timers_fire_in_deadline_then_schedule_order() {
        let mut event_loop = EventLoop::new();
        event_loop.schedule(tag(3.0), Duration::from_millis(20), false);
        event_loop.schedule(tag(1.0), Duration::ZERO, false);
        event_loop.schedule(tag(2.0), Duration::ZERO, false);
        assert_eq!(fire_order(&mut event_loop), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut event_loop = EventLoop::new();
        let id = event_loop.schedule(tag(1.0), Duration::from_millis(5), false);
        event_loop.schedule(tag(2.0), Duration::from_millis(5), false);
        assert!(event_loop.cancel(id));
        assert!(!event_loop.cancel(id));
        assert_eq!(fire_order(&mut event_loop), vec![2.0]);
    }

    #[test]
    fn interval_cancelled_while_firing_stops() {
        let mut event_loop = EventLoop::new();
        let id = event_loop.schedule(tag(7.0), Duration::ZERO, true);
        let Ready::Timer(timer) = event_loop.next_ready() else {
            panic!("expected the interval to be due");
        };
        assert_eq!(timer.id, id);
        event_loop.cancel(id);
        event_loop.rearm(timer);
        assert!(matches!(event_loop.next_ready(), Ready::Idle));
    }

    #[test]
    fn outstanding_work_keeps_loop_alive_until_completion() {
        let mut event_loop = EventLoop::new();
        let handle = event_loop.handle();
        handle.begin_work();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.complete(Box::new(|_| Ok(())));
        });
        assert!(matches!(event_loop.next_ready(), Ready::Task(_)));
        assert!(matches!(event_loop.next_ready(), Ready::Idle));
        worker.join().expect("worker thread");
    }

    #[test]
    fn ended_work_lets_the_loop_go_idle() {
        let mut event_loop = EventLoop::new();
        let handle = event_loop.handle();
        handle.begin_work();
        let listener = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.post(Box::new(|_| Ok(())));
            handle.end_work();
        });
        assert!(matches!(event_loop.next_ready(), Ready::Task(_)));
        assert!(matches!(event_loop.next_ready(), Ready::Idle));
        listener.join().expect("listener thread");
    }

    #[test]
    fn posted_tasks_run_fifo_before_idle() {
        let mut event_loop = EventLoop::new();
        event_loop.post(Box::new(|_| Ok(())));
        event_loop.post(Box::new(|_| Err(RuntimeError::Io("second".into()))));
        let Ready::Task(_) = event_loop.next_ready() else {
            panic!("expected first task");
        };
        assert!(matches!(event_loop.next_ready(), Ready::Task(_)));
        assert!(matches!(event_loop.next_ready(), Ready::Idle));
    }
}

//=====================================================
// End of file
//=====================================================
