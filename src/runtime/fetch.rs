//=====================================================
// File: runtime/fetch.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Promise emulation for network fetches
// Objective: Return a pending promise immediately, perform the blocking
//            request on a background thread, and settle the promise on the
//            evaluator thread through the event loop
//=====================================================

use super::event_loop::LoopHandle;
use crate::interpreter::{Arity, Class, Instance, Interpreter, RuntimeError, Signal, Value};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::thread;
use tracing::{debug, warn};

pub const PENDING: &str = "pending";
pub const RESOLVED: &str = "resolved";
pub const REJECTED: &str = "rejected";

const ON_RESOLVE: &str = "onResolve";
const ON_REJECT: &str = "onReject";

/// Body text on success, error text on failure.
pub type FetchOutcome = Result<String, String>;

fn fetch_text(url: &str) -> FetchOutcome {
    let response = ureq::get(url).call().map_err(|error| error.to_string())?;
    response.into_string().map_err(|error| error.to_string())
}

/// Run `url` on a background thread and post the outcome as `ticket`.
pub fn spawn_fetch(handle: LoopHandle, ticket: u64, url: String) {
    handle.begin_work();
    debug!(ticket, %url, "fetch dispatched");
    let background = handle.clone();
    let spawned = thread::Builder::new()
        .name("fsk-fetch".to_string())
        .spawn(move || {
            let outcome = fetch_text(&url);
            debug!(ticket, ok = outcome.is_ok(), "fetch completed");
            background.complete(Box::new(move |interpreter| {
                interpreter.settle_promise(ticket, outcome)
            }));
        });
    if let Err(error) = spawned {
        warn!(ticket, %error, "fetch thread failed to start");
        let message = error.to_string();
        handle.complete(Box::new(move |interpreter| {
            interpreter.settle_promise(ticket, Err(message))
        }));
    }
}

impl Interpreter {
    /// A fresh pending promise registered under a new ticket.
    pub fn new_promise(&mut self) -> (u64, Value) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;

        let mut fields = BTreeMap::new();
        fields.insert("status".to_string(), Value::string(PENDING));
        fields.insert("value".to_string(), Value::Nil);
        fields.insert(ON_RESOLVE.to_string(), Value::array(Vec::new()));
        fields.insert(ON_REJECT.to_string(), Value::array(Vec::new()));
        let promise = Instance::with_fields(Rc::clone(&self.promise_class), fields);

        self.promises.insert(ticket, promise.clone());
        (ticket, promise)
    }

    /// `FSK.fetch(url)`: pending promise now, settled later by the loop.
    pub fn fetch(&mut self, url: String) -> Value {
        let (ticket, promise) = self.new_promise();
        spawn_fetch(self.loop_handle(), ticket, url);
        promise
    }

    //Function: settle_promise
    //Purpose: Flip a pending promise and run the callbacks registered so far
    //Inputs: ticket from `new_promise`, fetch outcome
    //Returns: the first callback failure, if any
    pub fn settle_promise(&mut self, ticket: u64, outcome: FetchOutcome) -> Result<(), RuntimeError> {
        let Some(promise) = self.promises.remove(&ticket) else {
            return Ok(());
        };
        let Value::Instance(instance) = &promise else {
            return Ok(());
        };

        let (status, value, queue) = match outcome {
            Ok(body) => (RESOLVED, Value::String(body), ON_RESOLVE),
            Err(message) => (REJECTED, Value::String(message), ON_REJECT),
        };

        let callbacks = {
            let mut instance = instance.borrow_mut();
            instance.set("status", Value::string(status));
            instance.set("value", value.clone());
            let callbacks = match instance.fields.get(queue) {
                Some(Value::Array(items)) => std::mem::take(&mut *items.borrow_mut()),
                _ => Vec::new(),
            };
            instance.set(ON_RESOLVE, Value::array(Vec::new()));
            instance.set(ON_REJECT, Value::array(Vec::new()));
            callbacks
        };

        debug!(ticket, status, callbacks = callbacks.len(), "promise settled");
        for callback in callbacks {
            self.call_value(&callback, vec![value.clone()])
                .map_err(Signal::into_error)?;
        }
        Ok(())
    }
}

fn promise_then(
    interpreter: &mut Interpreter,
    receiver: Option<&Value>,
    args: Vec<Value>,
) -> Result<Value, Signal> {
    subscribe(interpreter, receiver, args, RESOLVED, ON_RESOLVE)
}

fn promise_catch(
    interpreter: &mut Interpreter,
    receiver: Option<&Value>,
    args: Vec<Value>,
) -> Result<Value, Signal> {
    subscribe(interpreter, receiver, args, REJECTED, ON_REJECT)
}

// Already settled in the matching state: run now. Still pending: queue it.
fn subscribe(
    interpreter: &mut Interpreter,
    receiver: Option<&Value>,
    args: Vec<Value>,
    state: &str,
    queue: &str,
) -> Result<Value, Signal> {
    let promise = receiver.cloned().unwrap_or_default();
    let callback = args.into_iter().next().unwrap_or_default();
    let status = promise.field("status");

    if status.as_str() == Some(state) {
        let value = promise.field("value");
        interpreter.call_value(&callback, vec![value])?;
    } else if status.as_str() == Some(PENDING) {
        if let Value::Array(items) = promise.field(queue) {
            items.borrow_mut().push(callback);
        }
    }
    Ok(promise)
}

/// Class of every promise; `then` and `catch` resolve at lookup time.
pub fn promise_class() -> Rc<Class> {
    Class::host(
        "Promise",
        &[
            ("then", Arity::exact(1), promise_then),
            ("catch", Arity::exact(1), promise_catch),
        ],
    )
}


//=====================================================
// End of file
//=====================================================
