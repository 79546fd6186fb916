//=====================================================
// File: interpreter/value.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime value representation
// Objective: Tagged union every FSK expression evaluates to, with
//            stringification, truthiness and structural equality
//=====================================================

use super::callable::{Callable, Instance};
use crate::ast::Literal;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable array storage. Aliases observe each other's writes.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type InstanceRef = Rc<RefCell<Instance>>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Callable(Callable),
    Instance(InstanceRef),
    Array(ArrayRef),
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    /// nil and false are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Callable(Callable::Class(_)) => "class",
            Value::Callable(_) => "function",
            Value::Instance(_) => "instance",
            Value::Array(_) => "array",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Field lookup on an instance; nil for anything else or a missing field.
    pub fn field(&self, name: &str) -> Value {
        self.as_instance()
            .and_then(|instance| instance.borrow().fields.get(name).cloned())
            .unwrap_or_default()
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Nil => Value::Nil,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Tag first, then payload. Arrays compare element-wise; instances and
/// callables compare by identity.
/// Arrays nested deeper than this print as `[...]` and compare unequal.
pub const MAX_NESTING: usize = 256;

type ArrayPtr = *const RefCell<Vec<Value>>;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other, &mut Vec::new())
    }
}

// `active` holds the array pairs currently being compared; meeting one
// again means the two cycles line up.
fn values_equal(left: &Value, right: &Value, active: &mut Vec<(ArrayPtr, ArrayPtr)>) -> bool {
    match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            if Rc::ptr_eq(a, b) {
                return true;
            }
            let pair = (Rc::as_ptr(a), Rc::as_ptr(b));
            if active.contains(&pair) {
                return true;
            }
            if active.len() >= MAX_NESTING {
                return false;
            }
            let (a, b) = (a.borrow(), b.borrow());
            if a.len() != b.len() {
                return false;
            }
            active.push(pair);
            let equal = a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y, active));
            active.pop();
            equal
        }
        (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
        (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
        _ => false,
    }
}

pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Covers -0 as well.
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Callable(callable) => write!(f, "{}", callable),
            Value::Instance(instance) => write!(f, "{} instance", instance.borrow().class.name),
            Value::Array(elements) => write_array(f, elements, &mut Vec::new()),
        }
    }
}

// An array already on the path being printed, or one nested too deep,
// prints as `[...]`.
fn write_array(f: &mut fmt::Formatter<'_>, elements: &ArrayRef, path: &mut Vec<ArrayPtr>) -> fmt::Result {
    let ptr = Rc::as_ptr(elements);
    if path.contains(&ptr) || path.len() >= MAX_NESTING {
        return f.write_str("[...]");
    }
    path.push(ptr);
    f.write_str("[")?;
    for (index, element) in elements.borrow().iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        match element {
            Value::Array(inner) => write_array(f, inner, path)?,
            other => write!(f, "{}", other)?,
        }
    }
    path.pop();
    f.write_str("]")
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}


//=====================================================
// End of file
//=====================================================
