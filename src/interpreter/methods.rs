//=====================================================
// File: interpreter/methods.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Built-in method surface of arrays and strings
// Objective: Resolve `length` and method names at property-get time into
//            natives bound to the receiving value
//=====================================================

use super::Interpreter;
use super::callable::{Arity, NativeFunction, NativeMethod};
use super::errors::{RuntimeError, Signal};
use super::value::{ArrayRef, Value};

const ARRAY_METHODS: &[NativeMethod] = &[
    ("push", Arity::exact(1), array_push),
    ("pop", Arity::exact(0), array_pop),
    ("pushFront", Arity::exact(1), array_push_front),
    ("popFront", Arity::exact(0), array_pop_front),
    ("join", Arity::range(0, 1), array_join),
    ("includes", Arity::exact(1), array_includes),
    ("indexOf", Arity::exact(1), array_index_of),
    ("slice", Arity::range(0, 2), array_slice),
    ("map", Arity::exact(1), array_map),
    ("filter", Arity::exact(1), array_filter),
    ("forEach", Arity::exact(1), array_for_each),
];

const STRING_METHODS: &[NativeMethod] = &[
    ("split", Arity::exact(1), string_split),
    ("trim", Arity::exact(0), string_trim),
    ("substr", Arity::range(1, 2), string_substr),
    ("startsWith", Arity::exact(1), string_starts_with),
    ("endsWith", Arity::exact(1), string_ends_with),
    ("toUpperCase", Arity::exact(0), string_to_upper),
    ("toLowerCase", Arity::exact(0), string_to_lower),
    ("replace", Arity::exact(2), string_replace),
    ("indexOf", Arity::exact(1), string_index_of),
    ("includes", Arity::exact(1), string_includes),
];

fn bind(table: &[NativeMethod], receiver: &Value, name: &str) -> Result<Value, RuntimeError> {
    table
        .iter()
        .find(|(method, _, _)| *method == name)
        .map(|&(method, arity, func)| NativeFunction::method(method, arity, func, receiver.clone()))
        .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string()))
}

pub fn array_member(receiver: &Value, items: &ArrayRef, name: &str) -> Result<Value, RuntimeError> {
    if name == "length" {
        return Ok(Value::Number(items.borrow().len() as f64));
    }
    bind(ARRAY_METHODS, receiver, name)
}

pub fn string_member(receiver: &Value, text: &str, name: &str) -> Result<Value, RuntimeError> {
    if name == "length" {
        return Ok(Value::Number(text.chars().count() as f64));
    }
    bind(STRING_METHODS, receiver, name)
}

//=====================================================
//            Section 1: Shared helpers
//=====================================================

fn receiver_array(receiver: Option<&Value>) -> Result<ArrayRef, RuntimeError> {
    match receiver {
        Some(Value::Array(items)) => Ok(items.clone()),
        _ => Err(RuntimeError::type_error("Array method called on a non-array value.")),
    }
}

fn receiver_str(receiver: Option<&Value>) -> Result<&str, RuntimeError> {
    match receiver {
        Some(Value::String(text)) => Ok(text),
        _ => Err(RuntimeError::type_error("String method called on a non-string value.")),
    }
}

pub(crate) fn string_argument(args: &[Value], index: usize, method: &str) -> Result<String, RuntimeError> {
    match args.get(index) {
        Some(Value::String(text)) => Ok(text.clone()),
        _ => Err(RuntimeError::type_error(format!("{} expects a string argument.", method))),
    }
}

pub(crate) fn number_argument(args: &[Value], index: usize, method: &str) -> Result<f64, RuntimeError> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        _ => Err(RuntimeError::type_error(format!("{} expects a number argument.", method))),
    }
}

/// Clamp a possibly negative offset into `0..=len`; negatives count from the end.
fn clamp_offset(offset: f64, len: usize) -> usize {
    if offset < 0.0 {
        len.saturating_sub((-offset) as usize)
    } else {
        (offset as usize).min(len)
    }
}

/// Call a per-element callback with `(item)` or `(item, index)` depending on
/// what it accepts.
fn call_with_item(
    interpreter: &mut Interpreter,
    callback: &Value,
    item: Value,
    index: usize,
) -> Result<Value, Signal> {
    let wants_index = matches!(callback, Value::Callable(callable) if callable.arity().accepts(2));
    let args = if wants_index {
        vec![item, Value::Number(index as f64)]
    } else {
        vec![item]
    };
    interpreter.call_value(callback, args)
}

//=====================================================
//            Section 2: Array methods
//=====================================================

fn array_push(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let value = args.into_iter().next().unwrap_or_default();
    items.borrow_mut().push(value.clone());
    Ok(value)
}

fn array_pop(_: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let popped = items.borrow_mut().pop();
    Ok(popped.unwrap_or_default())
}

fn array_push_front(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let value = args.into_iter().next().unwrap_or_default();
    items.borrow_mut().insert(0, value.clone());
    Ok(value)
}

fn array_pop_front(_: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let mut items = items.borrow_mut();
    if items.is_empty() {
        Ok(Value::Nil)
    } else {
        Ok(items.remove(0))
    }
}

fn array_join(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let separator = if args.is_empty() {
        ",".to_string()
    } else {
        string_argument(&args, 0, "join")?
    };
    let joined = items
        .borrow()
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::String(joined))
}

fn array_includes(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let needle = args.into_iter().next().unwrap_or_default();
    let found = items.borrow().iter().any(|item| *item == needle);
    Ok(Value::Bool(found))
}

fn array_index_of(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let needle = args.into_iter().next().unwrap_or_default();
    let position = items.borrow().iter().position(|item| *item == needle);
    Ok(Value::Number(position.map_or(-1.0, |index| index as f64)))
}

fn array_slice(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let items = receiver_array(receiver)?;
    let items = items.borrow();
    let len = items.len();
    let start = if args.is_empty() {
        0
    } else {
        clamp_offset(number_argument(&args, 0, "slice")?, len)
    };
    let end = if args.len() > 1 {
        clamp_offset(number_argument(&args, 1, "slice")?, len)
    } else {
        len
    };
    let slice = if start < end { items[start..end].to_vec() } else { Vec::new() };
    Ok(Value::array(slice))
}

fn array_map(interpreter: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let snapshot = receiver_array(receiver)?.borrow().clone();
    let callback = args.into_iter().next().unwrap_or_default();
    let mut mapped = Vec::with_capacity(snapshot.len());
    for (index, item) in snapshot.into_iter().enumerate() {
        mapped.push(call_with_item(interpreter, &callback, item, index)?);
    }
    Ok(Value::array(mapped))
}

fn array_filter(interpreter: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let snapshot = receiver_array(receiver)?.borrow().clone();
    let callback = args.into_iter().next().unwrap_or_default();
    let mut kept = Vec::new();
    for (index, item) in snapshot.into_iter().enumerate() {
        if call_with_item(interpreter, &callback, item.clone(), index)?.is_truthy() {
            kept.push(item);
        }
    }
    Ok(Value::array(kept))
}

fn array_for_each(interpreter: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let snapshot = receiver_array(receiver)?.borrow().clone();
    let callback = args.into_iter().next().unwrap_or_default();
    for (index, item) in snapshot.into_iter().enumerate() {
        call_with_item(interpreter, &callback, item, index)?;
    }
    Ok(Value::Nil)
}

//=====================================================
//            Section 3: String methods
//=====================================================

fn string_split(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let text = receiver_str(receiver)?;
    let delimiter = string_argument(&args, 0, "split")?;
    let parts: Vec<Value> = if delimiter.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(delimiter.as_str()).map(Value::from).collect()
    };
    Ok(Value::array(parts))
}

fn string_trim(_: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> Result<Value, Signal> {
    Ok(Value::from(receiver_str(receiver)?.trim()))
}

/// Character based; a start past the end yields an empty string.
pub fn substring(text: &str, start: f64, length: Option<f64>) -> String {
    if start < 0.0 {
        return String::new();
    }
    let chars = text.chars().skip(start as usize);
    match length {
        Some(length) if length <= 0.0 => String::new(),
        Some(length) => chars.take(length as usize).collect(),
        None => chars.collect(),
    }
}

fn string_substr(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let text = receiver_str(receiver)?;
    let start = number_argument(&args, 0, "substr")?;
    let length = if args.len() > 1 {
        Some(number_argument(&args, 1, "substr")?)
    } else {
        None
    };
    Ok(Value::String(substring(text, start, length)))
}

fn string_starts_with(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let text = receiver_str(receiver)?;
    let prefix = string_argument(&args, 0, "startsWith")?;
    Ok(Value::Bool(text.starts_with(prefix.as_str())))
}

fn string_ends_with(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let text = receiver_str(receiver)?;
    let suffix = string_argument(&args, 0, "endsWith")?;
    Ok(Value::Bool(text.ends_with(suffix.as_str())))
}

fn string_to_upper(_: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> Result<Value, Signal> {
    Ok(Value::String(receiver_str(receiver)?.to_uppercase()))
}

fn string_to_lower(_: &mut Interpreter, receiver: Option<&Value>, _: Vec<Value>) -> Result<Value, Signal> {
    Ok(Value::String(receiver_str(receiver)?.to_lowercase()))
}

// Every occurrence; an empty target leaves the text alone.
fn string_replace(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let text = receiver_str(receiver)?;
    let (Some(Value::String(target)), Some(Value::String(replacement))) = (args.first(), args.get(1)) else {
        return Ok(Value::from(text));
    };
    if target.is_empty() {
        return Ok(Value::from(text));
    }
    Ok(Value::String(text.replace(target.as_str(), replacement)))
}

/// Character index of `needle` in `text`, or -1.
pub fn char_index_of(text: &str, needle: &str) -> f64 {
    text.find(needle)
        .map_or(-1.0, |byte| text[..byte].chars().count() as f64)
}

fn string_index_of(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let text = receiver_str(receiver)?;
    let needle = string_argument(&args, 0, "indexOf")?;
    Ok(Value::Number(char_index_of(text, &needle)))
}

fn string_includes(_: &mut Interpreter, receiver: Option<&Value>, args: Vec<Value>) -> Result<Value, Signal> {
    let text = receiver_str(receiver)?;
    let needle = string_argument(&args, 0, "includes")?;
    Ok(Value::Bool(text.contains(needle.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_is_character_based_and_forgiving() {
        assert_eq!(substring("héllo", 1.0, Some(3.0)), "éll");
        assert_eq!(substring("abc", 10.0, Some(2.0)), "");
        assert_eq!(substring("abc", 1.0, None), "bc");
        assert_eq!(substring("abc", -1.0, None), "");
    }

    #[test]
    fn index_of_counts_characters() {
        assert_eq!(char_index_of("añb", "b"), 2.0);
        assert_eq!(char_index_of("abc", "z"), -1.0);
    }

    #[test]
    fn negative_offsets_count_from_end() {
        assert_eq!(clamp_offset(-1.0, 5), 4);
        assert_eq!(clamp_offset(-9.0, 5), 0);
        assert_eq!(clamp_offset(9.0, 5), 5);
    }

    #[test]
    fn unknown_member_is_lookup_failure() {
        let text = Value::string("abc");
        assert_eq!(
            string_member(&text, "abc", "nope").unwrap_err(),
            RuntimeError::UndefinedProperty("nope".into())
        );
        assert_eq!(string_member(&text, "abc", "length").unwrap(), Value::Number(3.0));
    }
}

//=====================================================
// End of file
//=====================================================
