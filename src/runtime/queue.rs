//=====================================================
// File: runtime/queue.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Bounded blocking queue shared between threads
// Objective: Carry worker messages across the thread boundary with
//            close semantics that wake every blocked reader and writer
//=====================================================

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Multi-producer multi-consumer FIFO with a fixed capacity.
#[derive(Debug)]
pub struct BlockingQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BlockingQueue<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Blocks while full. Hands the item back if the queue is closed.
    pub fn push(&self, item: T) -> Result<(), T> {
        let mut state = self.state.lock();
        while state.items.len() >= self.capacity && !state.closed {
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(item);
        }
        state.items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocks until an item arrives; `None` once closed and drained.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                self.not_full.notify_one();
                return Some(item);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Everything queued right now, without blocking.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.state.lock();
        let items: Vec<T> = state.items.drain(..).collect();
        if !items.is_empty() {
            self.not_full.notify_all();
        }
        items
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(BlockingQueue::new(4));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for n in 0..10 {
                    queue.push(n).expect("open queue");
                }
                queue.close();
            })
        };
        let mut received = Vec::new();
        while let Some(n) = queue.pop() {
            received.push(n);
        }
        producer.join().expect("producer thread");
        assert_eq!(received, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn closed_queue_rejects_push_and_drains() {
        let queue = BlockingQueue::new(2);
        queue.push("a").unwrap();
        queue.close();
        assert_eq!(queue.push("b"), Err("b"));
        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn try_pop_and_drain_never_block() {
        let queue = BlockingQueue::new(8);
        assert_eq!(queue.try_pop(), None::<u8>);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert_eq!(queue.drain(), vec![1, 2]);
        assert!(queue.is_empty());
    }
}

//=====================================================
// End of file
//=====================================================
