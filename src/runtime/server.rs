//=====================================================
// File: runtime/server.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Minimal HTTP listener driven by script handlers
// Objective: Accept connections on a background thread, hand each parsed
//            request to the evaluator thread as a posted task, and write the
//            handler's reply back on the held connection
//=====================================================

use super::event_loop::LoopHandle;
use crate::interpreter::{Arity, Class, Instance, Interpreter, NativeMethod, RuntimeError, Signal, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const HANDLER_FAILED: &str = "Internal Server Error";
const DROPPED: &str = "Internal Server Error (Fsk dropped request)";

/// One request as read off the wire by the accept thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

//Function: read_request
//Purpose: Parse a request line, headers and a Content-Length body
//Inputs: buffered connection
//Returns: method, path without query string, and body text
pub fn read_request<R: BufRead>(reader: &mut R) -> io::Result<HttpRequest> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(invalid("malformed request line"));
    };
    let path = match target.split_once('?') {
        Some((path, _)) => path.to_string(),
        None => target.to_string(),
    };

    let mut length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                length = value
                    .trim()
                    .parse()
                    .map_err(|_| invalid("bad Content-Length"))?;
            }
        }
    }
    if length > MAX_BODY_BYTES {
        return Err(invalid("request body too large"));
    }

    let mut body = vec![0; length];
    reader.read_exact(&mut body)?;
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

pub fn write_response<W: Write>(stream: &mut W, status: u16, body: &str) -> io::Result<()> {
    write!(
        stream,
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason(status),
        body.len(),
        body
    )?;
    stream.flush()
}

//=====================================================
//            Section 1: Accept thread
//=====================================================

/// Shared between a listener's accept thread and the evaluator.
#[derive(Debug, Default)]
struct ListenerControl {
    stopped: AtomicBool,
    released: AtomicBool,
}

impl ListenerControl {
    // The listener's work unit goes back exactly once, whichever side stops first.
    fn release(&self, handle: &LoopHandle) {
        if !self.released.swap(true, Ordering::SeqCst) {
            handle.end_work();
        }
    }
}

fn accept_loop(listener: TcpListener, server: u64, control: Arc<ListenerControl>, handle: LoopHandle) {
    for connection in listener.incoming() {
        if control.stopped.load(Ordering::SeqCst) {
            break;
        }
        let mut stream = match connection {
            Ok(stream) => stream,
            Err(error) => {
                warn!(server, %error, "accept failed");
                continue;
            }
        };
        if let Err(error) = stream.set_read_timeout(Some(READ_TIMEOUT)) {
            warn!(server, %error, "read timeout not set");
        }
        let request = match read_request(&mut BufReader::new(&stream)) {
            Ok(request) => request,
            Err(error) => {
                debug!(server, %error, "unreadable request");
                let _ = write_response(&mut stream, 400, reason(400));
                continue;
            }
        };
        debug!(server, method = %request.method, path = %request.path, "request received");
        handle.post(Box::new(move |interpreter| {
            interpreter.dispatch_request(server, request, stream)
        }));
    }
    control.release(&handle);
    info!(server, "accept loop stopped");
}

//=====================================================
//            Section 2: Evaluator-side table
//=====================================================

struct Listener {
    handler: Value,
    port: u16,
    control: Arc<ListenerControl>,
    handle: LoopHandle,
}

/// Open listeners and the requests still waiting for `send`.
#[derive(Default)]
pub struct ServerTable {
    next_server: u64,
    next_request: u64,
    listeners: HashMap<u64, Listener>,
    pending: HashMap<u64, TcpStream>,
}

impl ServerTable {
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Stop accepting on `server`. Requests already queued answer 404.
    pub fn stop(&mut self, server: u64) -> bool {
        let Some(listener) = self.listeners.remove(&server) else {
            return false;
        };
        listener.control.stopped.store(true, Ordering::SeqCst);
        listener.control.release(&listener.handle);
        // Unblocks the accept call so the thread sees the flag.
        let _ = TcpStream::connect((Ipv4Addr::LOCALHOST, listener.port));
        info!(server, port = listener.port, "server closed");
        true
    }

    /// Stop every listener and fail every unanswered request.
    pub fn close_all(&mut self) {
        let servers: Vec<u64> = self.listeners.keys().copied().collect();
        for server in servers {
            self.stop(server);
        }
        for (request, mut stream) in self.pending.drain() {
            debug!(request, "dropping unanswered request");
            let _ = write_response(&mut stream, 500, DROPPED);
        }
    }

    /// Answer a held request. False when it was already answered.
    pub fn respond(&mut self, request: u64, status: u16, body: &str) -> bool {
        let Some(mut stream) = self.pending.remove(&request) else {
            return false;
        };
        if let Err(error) = write_response(&mut stream, status, body) {
            warn!(request, %error, "response not delivered");
        }
        true
    }
}

//=====================================================
//            Section 3: Script surface
//=====================================================

const SERVER_HANDLE: &[NativeMethod] = &[("close", Arity::exact(0), server_close)];

const REQUEST: &[NativeMethod] = &[("send", Arity::range(1, 2), request_send)];

fn receiver_id(receiver: Option<&Value>) -> Option<u64> {
    receiver?.field("id").as_number().map(|id| id as u64)
}

fn server_close(interpreter: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> Result<Value, Signal> {
    let closed = receiver_id(receiver).is_some_and(|id| interpreter.servers.stop(id));
    Ok(Value::Bool(closed))
}

/// `req.send(body, status?)`: status defaults to 200.
fn request_send(interpreter: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let Some(id) = receiver_id(receiver) else {
        return Ok(Value::Bool(false));
    };
    let status = args
        .get(1)
        .and_then(Value::as_number)
        .filter(|status| (100.0..600.0).contains(status))
        .map_or(200, |status| status as u16);
    let body = args.into_iter().next().unwrap_or_default().to_string();
    Ok(Value::Bool(interpreter.servers.respond(id, status, &body)))
}

impl Interpreter {
    //Function: listen
    //Purpose: Bind `port` on every interface and serve requests with `handler`
    //Inputs: port (0 picks a free one), callable handler
    //Returns: a Server handle carrying the bound `port` and a `close` method
    pub fn listen(&mut self, port: u16, handler: Value) -> Result<Value, RuntimeError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .map_err(|error| RuntimeError::Io(format!("could not listen on port {}: {}", port, error)))?;
        let port = listener
            .local_addr()
            .map_err(|error| RuntimeError::Io(error.to_string()))?
            .port();

        self.servers.next_server += 1;
        let server = self.servers.next_server;
        let handle = self.loop_handle();
        let control = Arc::new(ListenerControl::default());
        handle.begin_work();

        let (thread_control, thread_handle) = (Arc::clone(&control), handle.clone());
        let spawned = thread::Builder::new()
            .name(format!("fsk-http:{}", port))
            .spawn(move || accept_loop(listener, server, thread_control, thread_handle));
        if let Err(error) = spawned {
            control.release(&handle);
            return Err(RuntimeError::Io(format!("failed to start server thread: {}", error)));
        }

        self.servers.listeners.insert(
            server,
            Listener {
                handler,
                port,
                control,
                handle,
            },
        );
        info!(server, port, "listening");

        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), Value::Number(server as f64));
        fields.insert("port".to_string(), Value::Number(f64::from(port)));
        Ok(Instance::with_fields(Class::host("Server", SERVER_HANDLE), fields))
    }

    //Function: dispatch_request
    //Purpose: Run the listener's handler for one request on the evaluator thread
    //Inputs: listener id, parsed request, the connection to answer on
    //Returns: the handler's failure, after answering 500 for it
    pub(crate) fn dispatch_request(
        &mut self,
        server: u64,
        request: HttpRequest,
        mut stream: TcpStream,
    ) -> Result<(), RuntimeError> {
        let Some(handler) = self.servers.listeners.get(&server).map(|l| l.handler.clone()) else {
            let _ = write_response(&mut stream, 404, reason(404));
            return Ok(());
        };

        self.servers.next_request += 1;
        let id = self.servers.next_request;
        self.servers.pending.insert(id, stream);

        let mut fields = BTreeMap::new();
        fields.insert("id".to_string(), Value::Number(id as f64));
        fields.insert("method".to_string(), Value::String(request.method));
        fields.insert("path".to_string(), Value::String(request.path));
        fields.insert("body".to_string(), Value::String(request.body));
        let value = Instance::with_fields(Class::host("Request", REQUEST), fields);

        // An unanswered request stays held so a timer or promise can reply later.
        if let Err(signal) = self.call_value(&handler, vec![value]) {
            self.servers.respond(id, 500, HANDLER_FAILED);
            return Err(signal.into_error());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_request_line_headers_and_body() {
        let raw = "POST /items?debug=1 HTTP/1.1\r\nHost: x\r\ncontent-length: 5\r\n\r\nhello";
        let request = read_request(&mut Cursor::new(raw)).unwrap();
        assert_eq!(
            request,
            HttpRequest {
                method: "POST".into(),
                path: "/items".into(),
                body: "hello".into(),
            }
        );
    }

    #[test]
    fn rejects_garbage_and_short_bodies() {
        assert!(read_request(&mut Cursor::new("\r\n")).is_err());
        let truncated = "PUT / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        assert!(read_request(&mut Cursor::new(truncated)).is_err());
    }

    #[test]
    fn responses_carry_length_and_status() {
        let mut out = Vec::new();
        write_response(&mut out, 404, "gone").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("\r\n\r\ngone"));
    }

    #[test]
    fn closing_releases_the_loop() {
        let mut interpreter = Interpreter::new();
        let server = interpreter.listen(0, Value::Nil).unwrap();
        assert_eq!(interpreter.loop_handle().outstanding(), 1);
        assert!(server.field("port").as_number().is_some_and(|port| port > 0.0));

        let id = server.field("id").as_number().unwrap() as u64;
        assert!(interpreter.servers.stop(id));
        assert!(!interpreter.servers.stop(id));
        assert_eq!(interpreter.loop_handle().outstanding(), 0);
        assert!(interpreter.servers.is_empty());
    }
}

//=====================================================
// End of file
//=====================================================
