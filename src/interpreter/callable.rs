//=====================================================
// File: interpreter/callable.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Callable object model
// Objective: User functions closing over an environment, native host
//            functions, classes with single inheritance, and instances
//=====================================================

use super::Interpreter;
use super::environment::Env;
use super::errors::{RuntimeError, Signal};
use super::value::{InstanceRef, Value};
use crate::ast::FunctionDecl;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

//=====================================================
//            Section 1: Arity
//=====================================================

/// Accepted argument counts. `max == None` means variadic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exact(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }

    pub fn describe(&self) -> String {
        match self.max {
            Some(max) if max == self.min => max.to_string(),
            Some(max) => format!("{}-{}", self.min, max),
            None => format!("at least {}", self.min),
        }
    }

    pub fn check(&self, got: usize) -> Result<(), RuntimeError> {
        if self.accepts(got) {
            Ok(())
        } else {
            Err(RuntimeError::Arity {
                expected: self.describe(),
                got,
            })
        }
    }
}

//=====================================================
//            Section 2: Callable shapes
//=====================================================

#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
}

impl Callable {
    pub fn arity(&self) -> Arity {
        match self {
            Callable::Function(function) => function.arity(),
            Callable::Native(native) => native.arity,
            Callable::Class(class) => class.arity(),
        }
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) if function.decl.name.is_empty() => f.write_str("<fn>"),
            Callable::Function(function) => write!(f, "<fn {}>", function.decl.name),
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
            Callable::Class(class) => f.write_str(&class.name),
        }
    }
}

/// A user-defined function paired with the scope it was declared in.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Env,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: Env) -> Self {
        Self { decl, closure }
    }

    pub fn arity(&self) -> Arity {
        Arity::range(self.decl.min_arity(), self.decl.max_arity())
    }

    /// A copy of this function whose scope binds `this` to `instance`.
    pub fn bind(&self, instance: Value) -> Rc<Function> {
        let environment = self.closure.child();
        environment.define("this", instance);
        Rc::new(Function {
            decl: Rc::clone(&self.decl),
            closure: environment,
        })
    }
}

/// Host function signature. The receiver is set for method-style natives
/// (string and array methods, promise and worker handles).
pub type NativeFn = fn(&mut Interpreter, Option<&Value>, Vec<Value>) -> Result<Value, Signal>;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFn,
    pub receiver: Option<Value>,
}

impl NativeFunction {
    pub fn value(name: &'static str, arity: Arity, func: NativeFn) -> Value {
        Value::Callable(Callable::Native(Rc::new(Self {
            name,
            arity,
            func,
            receiver: None,
        })))
    }

    pub fn method(name: &'static str, arity: Arity, func: NativeFn, receiver: Value) -> Value {
        Value::Callable(Callable::Native(Rc::new(Self {
            name,
            arity,
            func,
            receiver: Some(receiver),
        })))
    }
}

//=====================================================
//            Section 3: Classes and instances
//=====================================================

/// Host method resolved at lookup time and bound to the receiving instance.
pub type NativeMethod = (&'static str, Arity, NativeFn);

pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
    pub natives: Vec<NativeMethod>,
}

impl Class {
    pub fn new(
        name: impl Into<String>,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Rc<Function>>,
    ) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods,
            natives: Vec::new(),
        }
    }

    /// A class with no methods, used for host objects and object literals.
    pub fn bare(name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::new(name, None, HashMap::new()))
    }

    /// A host class whose methods are natives.
    pub fn host(name: impl Into<String>, natives: &[NativeMethod]) -> Rc<Self> {
        let mut class = Self::new(name, None, HashMap::new());
        class.natives = natives.to_vec();
        Rc::new(class)
    }

    pub fn find_native(&self, name: &str) -> Option<NativeMethod> {
        match self.natives.iter().find(|(native, _, _)| *native == name) {
            Some(native) => Some(*native),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_native(name)),
        }
    }

    /// Own methods first, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        match self.methods.get(name) {
            Some(method) => Some(Rc::clone(method)),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }

    pub fn arity(&self) -> Arity {
        self.find_method("init")
            .map(|init| init.arity())
            .unwrap_or(Arity::exact(0))
    }
}

pub struct Instance {
    pub class: Rc<Class>,
    pub fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_fields(class: Rc<Class>, fields: BTreeMap<String, Value>) -> Value {
        Value::Instance(Rc::new(RefCell::new(Self { class, fields })))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }
}

/// Property lookup on an instance: fields shadow methods, methods come back
/// bound to the instance.
pub fn instance_get(instance: &InstanceRef, name: &str) -> Option<Value> {
    let receiver = Value::Instance(Rc::clone(instance));
    let borrowed = instance.borrow();
    if let Some(value) = borrowed.fields.get(name) {
        return Some(value.clone());
    }
    if let Some(method) = borrowed.class.find_method(name) {
        return Some(Value::Callable(Callable::Function(method.bind(receiver))));
    }
    let (native, arity, func) = borrowed.class.find_native(name)?;
    Some(NativeFunction::method(native, arity, func, receiver))
}

//=====================================================
//            Section 4: Invocation
//=====================================================

impl Interpreter {
    /// Check arity, then dispatch on the callee's shape.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value, Signal> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::type_error("Can only call functions and classes.").into());
        };
        callable.arity().check(args.len())?;

        match callable {
            Callable::Function(function) => self.call_function(function, args),
            Callable::Native(native) => {
                let native = Rc::clone(native);
                (native.func)(self, native.receiver.as_ref(), args)
            }
            Callable::Class(class) => self.instantiate(class, args),
        }
    }

    //Function: call_function
    //Purpose: Run a user function body in a fresh frame under the closure
    //Inputs: function, already arity-checked arguments
    //Returns: the returned value, or nil when the body falls off the end
    pub(crate) fn call_function(
        &mut self,
        function: &Rc<Function>,
        args: Vec<Value>,
    ) -> Result<Value, Signal> {
        if self.call_depth >= self.options.max_call_depth {
            return Err(RuntimeError::StackOverflow(self.options.max_call_depth).into());
        }
        self.call_depth += 1;
        let outcome = self.invoke_body(function, args);
        self.call_depth -= 1;

        match outcome {
            Ok(()) => Ok(Value::Nil),
            Err(Signal::Return(value)) => Ok(value),
            Err(Signal::Break) => Err(RuntimeError::StrayLoopControl("break").into()),
            Err(Signal::Continue) => Err(RuntimeError::StrayLoopControl("continue").into()),
            Err(other) => Err(other),
        }
    }

    fn invoke_body(&mut self, function: &Rc<Function>, args: Vec<Value>) -> Result<(), Signal> {
        let environment = function.closure.child();
        let mut args = args.into_iter();
        for param in &function.decl.params {
            // Defaults evaluate in the call frame, so they see earlier params.
            let value = match (args.next(), &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => self.evaluate(default, &environment)?,
                (None, None) => Value::Nil,
            };
            self.bind_pattern(&param.pattern, value, &environment, false)?;
        }
        self.execute_block(&function.decl.body, &environment)
    }

    /// Allocate an instance and run the inherited or own `init`.
    pub(crate) fn instantiate(&mut self, class: &Rc<Class>, args: Vec<Value>) -> Result<Value, Signal> {
        let instance = Value::Instance(Rc::new(RefCell::new(Instance::new(Rc::clone(class)))));
        if let Some(init) = class.find_method("init") {
            self.call_function(&init.bind(instance.clone()), args)?;
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Position;

    fn method(name: &str) -> Rc<Function> {
        Rc::new(Function::new(
            Rc::new(FunctionDecl {
                name: name.into(),
                params: Vec::new(),
                body: Vec::new(),
                is_async: false,
                return_type: None,
                position: Position::default(),
            }),
            Env::new(),
        ))
    }

    #[test]
    fn arity_descriptions() {
        assert_eq!(Arity::exact(2).describe(), "2");
        assert_eq!(Arity::range(1, 3).describe(), "1-3");
        assert_eq!(Arity::at_least(1).describe(), "at least 1");
        assert!(Arity::at_least(0).accepts(99));
        assert!(!Arity::range(1, 3).accepts(0));
        assert!(!Arity::range(1, 3).accepts(4));
    }

    #[test]
    fn find_method_walks_superclass_chain() {
        let mut base_methods = HashMap::new();
        base_methods.insert("greet".to_string(), method("greet"));
        let base = Rc::new(Class::new("A", None, base_methods));
        let derived = Class::new("B", Some(Rc::clone(&base)), HashMap::new());

        assert!(derived.find_method("greet").is_some());
        assert!(derived.find_method("missing").is_none());
        assert_eq!(derived.arity(), Arity::exact(0));
    }

    #[test]
    fn fields_shadow_methods() {
        let mut methods = HashMap::new();
        methods.insert("name".to_string(), method("name"));
        let class = Rc::new(Class::new("Thing", None, methods));
        let instance = Rc::new(RefCell::new(Instance::new(class)));

        assert!(matches!(
            instance_get(&instance, "name"),
            Some(Value::Callable(Callable::Function(_)))
        ));
        instance.borrow_mut().set("name", Value::string("field"));
        assert_eq!(instance_get(&instance, "name"), Some(Value::string("field")));
        assert_eq!(instance_get(&instance, "other"), None);
    }
}

//=====================================================
// End of file
//=====================================================
