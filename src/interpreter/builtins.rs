//=====================================================
// File: interpreter/builtins.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host bindings visible to every script
// Objective: Register global natives and the FSK, JSON, Date, FS, Worker and
//            Task objects before user code runs
//=====================================================

use super::Interpreter;
use super::callable::{Arity, Callable, Class, Instance, NativeFunction, NativeMethod};
use super::errors::{RuntimeError, Signal};
use super::methods::{char_index_of, number_argument, string_argument, substring};
use super::value::Value;
use crate::runtime::worker::{WorkerId, spawn_worker};
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, TimeZone, Utc};
use rand::Rng;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::rc::Rc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const JSON_MAX_DEPTH: usize = 128;

type NativeResult = Result<Value, Signal>;

//=====================================================
//            Section 1: Registration
//=====================================================

const GLOBALS: &[NativeMethod] = &[
    ("clock", Arity::exact(0), clock),
    ("input", Arity::range(0, 1), input),
    ("sqrt", Arity::exact(1), sqrt),
    ("abs", Arity::exact(1), abs),
    ("readFile", Arity::exact(1), read_file_or_nil),
    ("writeFile", Arity::exact(2), write_file),
    ("exit", Arity::range(0, 1), exit),
    ("sleep", Arity::exact(1), sleep),
    ("setTimeout", Arity::range(1, 2), set_timeout),
    ("setInterval", Arity::range(1, 2), set_interval),
    ("clearTimeout", Arity::exact(1), clear_timer),
    ("clearInterval", Arity::exact(1), clear_timer),
    ("workerPostMessage", Arity::exact(1), worker_post_message),
    ("workerPoll", Arity::exact(0), worker_poll),
];

const FSK: &[NativeMethod] = &[
    ("fetch", Arity::exact(1), fsk_fetch),
    ("listen", Arity::exact(2), fsk_listen),
    ("version", Arity::exact(0), fsk_version),
    ("sleep", Arity::exact(1), fsk_sleep),
    ("random", Arity::exact(2), fsk_random),
    ("indexOf", Arity::exact(2), fsk_index_of),
    ("split", Arity::exact(2), fsk_split),
    ("length", Arity::exact(1), fsk_length),
    ("substr", Arity::exact(3), fsk_substr),
    ("argCount", Arity::exact(0), fsk_arg_count),
    ("arg", Arity::exact(1), fsk_arg),
    ("exists", Arity::exact(1), fs_exists),
    ("readFile", Arity::exact(1), fs_read),
];

const JSON: &[NativeMethod] = &[
    ("parse", Arity::exact(1), json_parse),
    ("stringify", Arity::exact(1), json_stringify),
];

const DATE: &[NativeMethod] = &[
    ("now", Arity::exact(0), date_now),
    ("timestamp", Arity::exact(0), date_timestamp),
    ("format", Arity::range(1, 2), date_format),
];

const FS: &[NativeMethod] = &[
    ("exists", Arity::exact(1), fs_exists),
    ("read", Arity::exact(1), fs_read),
    ("write", Arity::exact(2), fs_write),
    ("append", Arity::exact(2), fs_append),
    ("delete", Arity::exact(1), fs_delete),
    ("mkdir", Arity::exact(1), fs_mkdir),
    ("list", Arity::exact(1), fs_list),
];

const WORKER: &[NativeMethod] = &[("init", Arity::exact(1), worker_init)];

const WORKER_HANDLE: &[NativeMethod] = &[
    ("postMessage", Arity::exact(1), handle_post_message),
    ("poll", Arity::exact(0), handle_poll),
    ("terminate", Arity::exact(0), handle_terminate),
];

const TASK: &[NativeMethod] = &[("run", Arity::exact(1), task_run)];

const TASK_HANDLE: &[NativeMethod] = &[("wait", Arity::exact(0), task_wait)];

//Function: register
//Purpose: Install every host binding into the global scope
//Inputs: freshly constructed interpreter
//Returns: none
pub fn register(interpreter: &mut Interpreter) {
    let globals = interpreter.globals().clone();
    for &(name, arity, func) in GLOBALS {
        globals.define(name, NativeFunction::value(name, arity, func));
    }
    globals.define(
        "Promise",
        Value::Callable(Callable::Class(Rc::clone(&interpreter.promise_class))),
    );

    for (name, members) in [
        ("FSK", FSK),
        ("JSON", JSON),
        ("Date", DATE),
        ("FS", FS),
        ("Worker", WORKER),
        ("Task", TASK),
    ] {
        globals.define(name, native_object(name, members));
    }
    debug!(names = globals.local_names().len(), "host bindings registered");
}

/// An instance of a bare class whose fields are the given natives.
fn native_object(name: &str, members: &[NativeMethod]) -> Value {
    let fields = members
        .iter()
        .map(|&(member, arity, func)| (member.to_string(), NativeFunction::value(member, arity, func)))
        .collect();
    Instance::with_fields(Class::bare(name), fields)
}

fn io_error(error: io::Error) -> RuntimeError {
    RuntimeError::Io(error.to_string())
}

//=====================================================
//            Section 2: Globals
//=====================================================

fn epoch_seconds() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

fn clock(_: &mut Interpreter, _: Option<&Value>, _: Vec<Value>) -> NativeResult {
    Ok(Value::Number(epoch_seconds()))
}

fn input(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    if let Some(prompt) = args.first() {
        interpreter.stdout().write_str(&prompt.to_string());
    }
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line).map_err(io_error)?;
    if read == 0 {
        return Ok(Value::Nil);
    }
    Ok(Value::from(line.trim_end_matches(['\n', '\r'])))
}

fn sqrt(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    Ok(Value::Number(number_argument(&args, 0, "sqrt")?.sqrt()))
}

fn abs(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    Ok(Value::Number(number_argument(&args, 0, "abs")?.abs()))
}

fn read_file_or_nil(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let path = string_argument(&args, 0, "readFile")?;
    Ok(match fs::read(&path) {
        Ok(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        Err(error) => {
            debug!(%path, %error, "readFile failed");
            Value::Nil
        }
    })
}

fn write_file(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let path = string_argument(&args, 0, "writeFile")?;
    let contents = string_argument(&args, 1, "writeFile")?;
    Ok(Value::Bool(fs::write(path, contents).is_ok()))
}

fn exit(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let code = args.first().and_then(Value::as_number).unwrap_or(0.0) as i32;
    info!(code, "script requested exit");
    Err(RuntimeError::Exit(code).into())
}

fn sleep_millis(ms: f64) {
    thread::sleep(Duration::from_millis(ms.max(0.0) as u64));
}

fn sleep(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    if let Some(ms) = args.first().and_then(Value::as_number) {
        sleep_millis(ms);
    }
    Ok(Value::Number(0.0))
}

fn schedule(interpreter: &mut Interpreter, args: Vec<Value>, repeat: bool, name: &str) -> NativeResult {
    let mut args = args.into_iter();
    let callback = match args.next() {
        Some(callback @ Value::Callable(_)) => callback,
        _ => {
            return Err(
                RuntimeError::type_error(format!("{} expects (callback, delay_ms).", name)).into(),
            );
        }
    };
    let delay = match args.next() {
        None => 0.0,
        Some(Value::Number(ms)) => ms,
        Some(_) => {
            return Err(
                RuntimeError::type_error(format!("{} expects (callback, delay_ms).", name)).into(),
            );
        }
    };
    let id = interpreter.schedule_timer(callback, delay, repeat);
    Ok(Value::Number(id as f64))
}

fn set_timeout(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    schedule(interpreter, args, false, "setTimeout")
}

fn set_interval(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    schedule(interpreter, args, true, "setInterval")
}

fn clear_timer(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let id = number_argument(&args, 0, "clearTimeout")?;
    if id >= 0.0 {
        interpreter.cancel_timer(id as u64);
    }
    Ok(Value::Nil)
}

fn worker_post_message(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(link) = &interpreter.worker_link else {
        return Ok(Value::Bool(false));
    };
    let message = args.into_iter().next().unwrap_or_default().to_string();
    Ok(Value::Bool(link.outbound.push(message).is_ok()))
}

fn worker_poll(interpreter: &mut Interpreter, _: Option<&Value>, _: Vec<Value>) -> NativeResult {
    let messages = match &interpreter.worker_link {
        Some(link) => link.inbound.drain(),
        None => Vec::new(),
    };
    Ok(Value::array(messages.into_iter().map(Value::String).collect()))
}

//=====================================================
//            Section 3: FSK
//=====================================================

fn fsk_fetch(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let url = string_argument(&args, 0, "fetch")?;
    Ok(interpreter.fetch(url))
}

fn fsk_listen(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let port = number_argument(&args, 0, "listen")?;
    if !(0.0..=f64::from(u16::MAX)).contains(&port) {
        return Err(RuntimeError::type_error(format!("listen expects a port between 0 and {}.", u16::MAX)).into());
    }
    let handler = args.get(1).cloned().unwrap_or_default();
    if !matches!(handler, Value::Callable(_)) {
        return Err(RuntimeError::type_error("listen expects a handler function.").into());
    }
    Ok(interpreter.listen(port as u16, handler)?)
}

fn fsk_version(_: &mut Interpreter, _: Option<&Value>, _: Vec<Value>) -> NativeResult {
    Ok(Value::string(env!("CARGO_PKG_VERSION")))
}

fn fsk_sleep(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    sleep_millis(number_argument(&args, 0, "sleep")?);
    Ok(Value::Bool(true))
}

/// Integer in `min..=max`.
fn fsk_random(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let min = number_argument(&args, 0, "random")? as i64;
    let max = number_argument(&args, 1, "random")? as i64;
    if max <= min {
        return Ok(Value::Number(min as f64));
    }
    Ok(Value::Number(rand::thread_rng().gen_range(min..=max) as f64))
}

fn fsk_index_of(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let haystack = string_argument(&args, 0, "indexOf")?;
    let needle = string_argument(&args, 1, "indexOf")?;
    Ok(Value::Number(char_index_of(&haystack, &needle)))
}

fn fsk_split(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let text = string_argument(&args, 0, "split")?;
    let delimiter = string_argument(&args, 1, "split")?;
    let parts = if delimiter.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(delimiter.as_str()).map(Value::from).collect()
    };
    Ok(Value::array(parts))
}

fn fsk_length(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let length = match args.first() {
        Some(Value::String(text)) => text.chars().count(),
        Some(Value::Array(items)) => items.borrow().len(),
        _ => 0,
    };
    Ok(Value::Number(length as f64))
}

fn fsk_substr(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let text = string_argument(&args, 0, "substr")?;
    let start = number_argument(&args, 1, "substr")?;
    let length = number_argument(&args, 2, "substr")?;
    Ok(Value::String(substring(&text, start, Some(length))))
}

fn fsk_arg_count(interpreter: &mut Interpreter, _: Option<&Value>, _: Vec<Value>) -> NativeResult {
    Ok(Value::Number(interpreter.args().len() as f64))
}

fn fsk_arg(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let arg = match args.first() {
        Some(Value::Number(index)) if *index >= 0.0 => interpreter.args().get(*index as usize).cloned(),
        _ => None,
    };
    Ok(Value::String(arg.unwrap_or_default()))
}

//=====================================================
//            Section 4: JSON
//=====================================================

fn json_to_value(interpreter: &Interpreter, json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Nil,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
        JsonValue::String(text) => Value::String(text),
        JsonValue::Array(items) => Value::array(
            items
                .into_iter()
                .map(|item| json_to_value(interpreter, item))
                .collect(),
        ),
        JsonValue::Object(map) => interpreter.new_object(
            map.into_iter()
                .map(|(key, value)| (key, json_to_value(interpreter, value)))
                .collect(),
        ),
    }
}

fn number_to_json(n: f64) -> JsonValue {
    // Integral values print without a fraction.
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

pub fn value_to_json(value: &Value, depth: usize) -> Result<JsonValue, RuntimeError> {
    if depth > JSON_MAX_DEPTH {
        return Err(RuntimeError::type_error(
            "JSON.stringify: value is nested too deeply or contains a cycle.",
        ));
    }
    Ok(match value {
        Value::Nil | Value::Callable(_) => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(text) => JsonValue::String(text.clone()),
        Value::Array(items) => JsonValue::Array(
            items
                .borrow()
                .iter()
                .map(|item| value_to_json(item, depth + 1))
                .collect::<Result<_, _>>()?,
        ),
        Value::Instance(instance) => {
            let instance = instance.borrow();
            let mut object = serde_json::Map::new();
            for (key, field) in &instance.fields {
                object.insert(key.clone(), value_to_json(field, depth + 1)?);
            }
            JsonValue::Object(object)
        }
    })
}

fn json_parse(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(Value::String(text)) = args.first() else {
        return Ok(Value::Nil);
    };
    match serde_json::from_str::<JsonValue>(text) {
        Ok(json) => Ok(json_to_value(interpreter, json)),
        Err(error) => {
            debug!(%error, "JSON.parse rejected input");
            Ok(Value::Nil)
        }
    }
}

fn json_stringify(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let value = args.into_iter().next().unwrap_or_default();
    let json = value_to_json(&value, 0)?;
    Ok(Value::String(json.to_string()))
}

//=====================================================
//            Section 5: Date
//=====================================================

fn date_now(_: &mut Interpreter, _: Option<&Value>, _: Vec<Value>) -> NativeResult {
    Ok(Value::Number(epoch_seconds()))
}

fn date_timestamp(_: &mut Interpreter, _: Option<&Value>, _: Vec<Value>) -> NativeResult {
    Ok(Value::Number(Utc::now().timestamp() as f64))
}

//Function: date_format
//Purpose: Render epoch seconds in local time with a strftime pattern
//Inputs: seconds, optional pattern (defaults to "%Y-%m-%d %H:%M:%S")
//Returns: the formatted string; empty for non-numeric or unrepresentable input
fn date_format(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(Value::Number(seconds)) = args.first() else {
        return Ok(Value::string(""));
    };
    let pattern = match args.get(1) {
        Some(Value::String(pattern)) => pattern.as_str(),
        None => DEFAULT_DATE_FORMAT,
        Some(_) => return Ok(Value::string("")),
    };

    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(
            RuntimeError::type_error(format!("Date.format: invalid format '{}'.", pattern)).into(),
        );
    }
    let Some(moment) = Local.timestamp_opt(*seconds as i64, 0).single() else {
        return Ok(Value::string(""));
    };
    Ok(Value::String(
        moment.format_with_items(items.into_iter()).to_string(),
    ))
}

//=====================================================
//            Section 6: FS
//=====================================================

fn fs_exists(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let exists = match args.first() {
        Some(Value::String(path)) => Path::new(path).exists(),
        _ => false,
    };
    Ok(Value::Bool(exists))
}

fn fs_read(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let contents = match args.first() {
        Some(Value::String(path)) => fs::read(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        _ => String::new(),
    };
    Ok(Value::String(contents))
}

fn fs_write(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let (Some(Value::String(path)), Some(Value::String(contents))) = (args.first(), args.get(1))
    else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(fs::write(path, contents).is_ok()))
}

fn fs_append(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let (Some(Value::String(path)), Some(Value::String(contents))) = (args.first(), args.get(1))
    else {
        return Ok(Value::Bool(false));
    };
    let appended = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(contents.as_bytes()));
    Ok(Value::Bool(appended.is_ok()))
}

fn fs_delete(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(Value::String(path)) = args.first() else {
        return Ok(Value::Bool(false));
    };
    let path = Path::new(path);
    let removed = if path.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
    Ok(Value::Bool(removed.is_ok()))
}

fn fs_mkdir(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(Value::String(path)) = args.first() else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(fs::create_dir_all(path).is_ok()))
}

/// Entry names, sorted. Missing directories list as empty.
fn fs_list(_: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(Value::String(path)) = args.first() else {
        return Ok(Value::array(Vec::new()));
    };
    let mut names: Vec<String> = match fs::read_dir(path) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    Ok(Value::array(names.into_iter().map(Value::String).collect()))
}

//=====================================================
//            Section 7: Worker and Task
//=====================================================

fn start_worker(interpreter: &mut Interpreter, spec: &str) -> Result<WorkerId, RuntimeError> {
    let path = interpreter.modules.resolve(spec, interpreter.script_dir())?;
    let link = spawn_worker(path, interpreter.options.clone())?;
    let id = interpreter.workers.insert(link);
    info!(%id, spec, "worker registered");
    Ok(id)
}

fn handle_object(class: &str, methods: &[NativeMethod], id: WorkerId) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), Value::Number(id.0 as f64));
    Instance::with_fields(Class::host(class, methods), fields)
}

fn receiver_worker(receiver: Option<&Value>) -> Option<WorkerId> {
    let id = receiver?.field("id").as_number()?;
    Some(WorkerId(id as u64))
}

fn worker_init(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(Value::String(spec)) = args.first() else {
        return Ok(Value::Nil);
    };
    let id = start_worker(interpreter, spec)?;
    Ok(handle_object("WorkerHandle", WORKER_HANDLE, id))
}

fn handle_post_message(
    interpreter: &mut Interpreter,
    receiver: Option<&Value>,
    args: Vec<Value>,
) -> NativeResult {
    let link = receiver_worker(receiver).and_then(|id| interpreter.workers.get(id).cloned());
    let Some(link) = link else {
        return Ok(Value::Bool(false));
    };
    let message = args.into_iter().next().unwrap_or_default().to_string();
    Ok(Value::Bool(link.inbound.push(message).is_ok()))
}

fn handle_poll(interpreter: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> NativeResult {
    let messages = receiver_worker(receiver)
        .and_then(|id| interpreter.workers.get(id))
        .map(|link| link.outbound.drain())
        .unwrap_or_default();
    Ok(Value::array(messages.into_iter().map(Value::String).collect()))
}

fn handle_terminate(interpreter: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> NativeResult {
    if let Some(link) = receiver_worker(receiver).and_then(|id| interpreter.workers.remove(id)) {
        link.close();
    }
    Ok(Value::Bool(true))
}

fn task_run(interpreter: &mut Interpreter, _: Option<&Value>, args: Vec<Value>) -> NativeResult {
    let Some(Value::String(spec)) = args.first() else {
        return Ok(Value::Nil);
    };
    let id = start_worker(interpreter, spec)?;
    Ok(handle_object("Task", TASK_HANDLE, id))
}

//Function: task_wait
//Purpose: Block for the task's first reply, then tear the worker down
//Inputs: task handle receiver
//Returns: the first posted message, or nil if the worker posted nothing
fn task_wait(interpreter: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> NativeResult {
    let Some(id) = receiver_worker(receiver) else {
        return Ok(Value::Nil);
    };
    let Some(link) = interpreter.workers.remove(id) else {
        return Ok(Value::Nil);
    };
    let reply = link.outbound.pop();
    link.close();
    debug!(%id, replied = reply.is_some(), "task finished");
    Ok(reply.map(Value::String).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(interpreter: &mut Interpreter, source: &str) -> Value {
        let program = crate::parser::parse_source(&format!("let __result = {};", source))
            .expect("parses");
        interpreter.interpret(&program).expect("runs");
        interpreter.get_global("__result").unwrap_or_default()
    }

    #[test]
    fn json_round_trips_through_objects() {
        let mut interpreter = Interpreter::new();
        let value = eval(
            &mut interpreter,
            r#"JSON.stringify(JSON.parse("{\"b\": [1, 2.5, true], \"a\": null}"))"#,
        );
        assert_eq!(value, Value::string(r#"{"a":null,"b":[1,2.5,true]}"#));
    }

    #[test]
    fn json_parse_returns_nil_on_invalid_input() {
        let mut interpreter = Interpreter::new();
        assert_eq!(eval(&mut interpreter, "JSON.parse(\"{oops\")"), Value::Nil);
        assert_eq!(eval(&mut interpreter, "JSON.parse(3)"), Value::Nil);
    }

    #[test]
    fn json_stringify_rejects_cycles() {
        let items = Value::array(Vec::new());
        if let Value::Array(inner) = &items {
            inner.borrow_mut().push(items.clone());
        }
        assert!(value_to_json(&items, 0).is_err());
        if let Value::Array(inner) = &items {
            inner.borrow_mut().clear();
        }
    }

    #[test]
    fn fsk_helpers_are_character_based() {
        let mut interpreter = Interpreter::new();
        assert_eq!(eval(&mut interpreter, "FSK.indexOf(\"héllo\", \"llo\")"), Value::Number(2.0));
        assert_eq!(eval(&mut interpreter, "FSK.substr(\"héllo\", 1, 3)"), Value::string("éll"));
        assert_eq!(eval(&mut interpreter, "FSK.length([1, 2, 3])"), Value::Number(3.0));
        assert_eq!(eval(&mut interpreter, "FSK.version()"), Value::string("1.1.0"));
    }

    #[test]
    fn script_arguments_are_exposed() {
        let mut interpreter = Interpreter::new();
        interpreter.set_args(vec!["one".into(), "two".into()]);
        assert_eq!(eval(&mut interpreter, "FSK.argCount()"), Value::Number(2.0));
        assert_eq!(eval(&mut interpreter, "FSK.arg(1)"), Value::string("two"));
        assert_eq!(eval(&mut interpreter, "FSK.arg(5)"), Value::string(""));
    }

    #[test]
    fn random_stays_in_range() {
        let mut interpreter = Interpreter::new();
        for _ in 0..20 {
            let Value::Number(n) = eval(&mut interpreter, "FSK.random(3, 5)") else {
                panic!("random returned a non-number");
            };
            assert!((3.0..=5.0).contains(&n));
        }
    }

    #[test]
    fn date_format_uses_pattern_and_rejects_bad_ones() {
        let mut interpreter = Interpreter::new();
        let year = eval(&mut interpreter, "Date.format(Date.timestamp(), \"%Y\")");
        assert_eq!(year.as_str().map(str::len), Some(4));

        let program = crate::parser::parse_source("Date.format(0, \"%\");").unwrap();
        interpreter.capture_errors();
        assert!(interpreter.interpret(&program).is_err());
    }

    #[test]
    fn fs_bindings_work_on_a_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        let file = file.to_string_lossy().replace('\\', "/");
        let root = dir.path().to_string_lossy().replace('\\', "/");

        let mut interpreter = Interpreter::new();
        assert_eq!(eval(&mut interpreter, &format!("FS.write(\"{}\", \"a\")", file)), Value::Bool(true));
        assert_eq!(eval(&mut interpreter, &format!("FS.append(\"{}\", \"b\")", file)), Value::Bool(true));
        assert_eq!(eval(&mut interpreter, &format!("FS.read(\"{}\")", file)), Value::string("ab"));
        assert_eq!(
            eval(&mut interpreter, &format!("FS.list(\"{}\")", root)),
            Value::array(vec![Value::string("notes.txt")])
        );
        assert_eq!(eval(&mut interpreter, &format!("FS.delete(\"{}\")", file)), Value::Bool(true));
        assert_eq!(eval(&mut interpreter, &format!("readFile(\"{}\")", file)), Value::Nil);
    }

    #[test]
    fn worker_post_message_outside_a_worker_is_false() {
        let mut interpreter = Interpreter::new();
        assert_eq!(eval(&mut interpreter, "workerPostMessage(1)"), Value::Bool(false));
        assert_eq!(eval(&mut interpreter, "workerPoll()"), Value::array(Vec::new()));
    }
}

//=====================================================
// End of file
//=====================================================
