//=====================================================
// File: interpreter/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: FSK tree-walking evaluator
// Objective: Execute statements and evaluate expressions over the scope
//            chain, own the event loop and worker table, and report
//            uncaught failures to the diagnostic stream
//=====================================================

pub mod builtins;
pub mod callable;
pub mod environment;
pub mod errors;
pub mod methods;
pub mod pattern;
pub mod value;

pub use callable::{Arity, Callable, Class, Function, Instance, NativeFn, NativeFunction, NativeMethod};
pub use environment::Env;
pub use errors::{ErrorCode, RuntimeError, ScriptError, Signal, runtime_error_code};
pub use value::{ArrayRef, InstanceRef, Value};

use crate::ast::{
    BinaryOp, ClassDecl, Expr, LogicalOp, Pattern, Program, Stmt, TemplatePart, UnaryOp,
};
use crate::config::RuntimeOptions;
use crate::modules::ModuleLoader;
use crate::parser::parse_source;
use crate::runtime::event_loop::{EventLoop, LoopHandle, Ready};
use crate::runtime::server::ServerTable;
use crate::runtime::worker::{WorkerLink, WorkerTable};
use crate::tokenizer::Position;
use callable::instance_get;
use pattern::pattern_matches;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

//=====================================================
//            Section 1: Output sinks
//=====================================================

/// Where `print` and diagnostics go. Buffers let embedders capture output.
#[derive(Debug, Clone)]
pub enum Output {
    Stdout,
    Stderr,
    Buffer(Rc<RefCell<String>>),
}

impl Output {
    pub fn buffer() -> (Self, Rc<RefCell<String>>) {
        let buffer = Rc::new(RefCell::new(String::new()));
        (Output::Buffer(Rc::clone(&buffer)), buffer)
    }

    pub fn write_str(&self, text: &str) {
        // A closed terminal is not a script failure.
        match self {
            Output::Stdout => {
                let mut out = io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            Output::Stderr => {
                let _ = io::stderr().lock().write_all(text.as_bytes());
            }
            Output::Buffer(buffer) => buffer.borrow_mut().push_str(text),
        }
    }

    pub fn write_line(&self, line: &str) {
        self.write_str(&format!("{}\n", line));
    }
}

//=====================================================
//            Section 2: Interpreter state
//=====================================================

pub struct Interpreter {
    globals: Env,
    pub(crate) options: RuntimeOptions,
    pub(crate) call_depth: usize,
    event_loop: EventLoop,
    pub(crate) promises: HashMap<u64, Value>,
    pub(crate) next_ticket: u64,
    pub(crate) promise_class: Rc<Class>,
    object_class: Rc<Class>,
    pub(crate) workers: WorkerTable,
    pub(crate) worker_link: Option<WorkerLink>,
    pub(crate) servers: ServerTable,
    pub(crate) modules: ModuleLoader,
    module_dirs: Vec<PathBuf>,
    script_args: Vec<String>,
    stdout: Output,
    stderr: Output,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    //Function: with_options
    //Purpose: Build the global scope, register host bindings, run the prelude
    //Inputs: runtime options
    //Returns: a ready interpreter
    pub fn with_options(options: RuntimeOptions) -> Self {
        let modules = ModuleLoader::new(options.module_paths.clone());
        let mut interpreter = Self {
            globals: Env::new(),
            options,
            call_depth: 0,
            event_loop: EventLoop::new(),
            promises: HashMap::new(),
            next_ticket: 0,
            promise_class: crate::runtime::fetch::promise_class(),
            object_class: Class::bare("Object"),
            workers: WorkerTable::default(),
            worker_link: None,
            servers: ServerTable::default(),
            modules,
            module_dirs: Vec::new(),
            script_args: Vec::new(),
            stdout: Output::Stdout,
            stderr: Output::Stderr,
        };
        builtins::register(&mut interpreter);
        if let Some(prelude) = interpreter.options.prelude.clone() {
            interpreter.load_prelude(&prelude);
        }
        interpreter
    }

    fn load_prelude(&mut self, path: &Path) {
        match self.modules.load(path) {
            Ok(program) => {
                debug!(path = %path.display(), "running prelude");
                // Failures were already reported.
                let _ = self.interpret(&program);
            }
            Err(error) => warn!(path = %path.display(), %error, "prelude not loaded"),
        }
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }

    pub fn set_args(&mut self, args: Vec<String>) {
        self.script_args = args;
    }

    pub fn args(&self) -> &[String] {
        &self.script_args
    }

    /// Imports from the top-level script resolve relative to its directory.
    pub fn set_script_path(&mut self, path: &Path) {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.module_dirs = vec![dir];
    }

    pub(crate) fn script_dir(&self) -> Option<&Path> {
        self.module_dirs.last().map(PathBuf::as_path)
    }

    /// Turn this interpreter into the worker side of `link`.
    pub fn attach_worker(&mut self, link: WorkerLink) {
        self.worker_link = Some(link);
    }

    pub fn is_worker(&self) -> bool {
        self.worker_link.is_some()
    }

    /// Route `print` into a buffer and return it.
    pub fn capture_output(&mut self) -> Rc<RefCell<String>> {
        let (sink, buffer) = Output::buffer();
        self.stdout = sink;
        buffer
    }

    /// Route diagnostics into a buffer and return it.
    pub fn capture_errors(&mut self) -> Rc<RefCell<String>> {
        let (sink, buffer) = Output::buffer();
        self.stderr = sink;
        buffer
    }

    pub fn stdout(&self) -> &Output {
        &self.stdout
    }

    pub fn loop_handle(&self) -> LoopHandle {
        self.event_loop.handle()
    }

    pub fn schedule_timer(&mut self, callback: Value, delay_ms: f64, repeat: bool) -> u64 {
        let delay = Duration::from_millis(delay_ms.max(0.0) as u64);
        self.event_loop.schedule(callback, delay, repeat)
    }

    pub fn cancel_timer(&mut self, id: u64) -> bool {
        self.event_loop.cancel(id)
    }

    pub fn pending_timers(&self) -> usize {
        self.event_loop.pending_timers()
    }

    pub(crate) fn new_object(&self, fields: BTreeMap<String, Value>) -> Value {
        Instance::with_fields(Rc::clone(&self.object_class), fields)
    }

    //=================================================
    // Entry points
    //=================================================

    /// Execute top-level statements in the global scope. The first uncaught
    /// failure is reported and stops the remaining statements.
    pub fn interpret(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let globals = self.globals.clone();
        for statement in &program.statements {
            if let Err(signal) = self.execute(statement, &globals) {
                let error = signal.into_error();
                if error.is_catchable() {
                    self.report_at(&error, statement.position());
                }
                return Err(error);
            }
        }
        Ok(())
    }

    /// Parse, interpret and (when enabled) pump the event loop.
    pub fn run_source(&mut self, source: &str) -> Result<(), ScriptError> {
        let program = parse_source(source).map_err(|error| {
            let error = ScriptError::from(error);
            self.report(&error);
            error
        })?;
        self.interpret(&program)?;
        if self.options.run_event_loop {
            self.run_event_loop()?;
        }
        Ok(())
    }

    pub fn execute_in_globals(&mut self, statement: &Stmt) -> Result<(), RuntimeError> {
        let globals = self.globals.clone();
        self.execute(statement, &globals).map_err(Signal::into_error)
    }

    pub fn evaluate_in_globals(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let globals = self.globals.clone();
        self.evaluate(expr, &globals).map_err(Signal::into_error)
    }

    //Function: run_event_loop
    //Purpose: Pump timers and posted tasks until nothing can happen anymore
    //Inputs: none
    //Returns: Err only for `exit()`; other callback failures are reported
    pub fn run_event_loop(&mut self) -> Result<(), RuntimeError> {
        loop {
            let outcome = match self.event_loop.next_ready() {
                Ready::Timer(timer) => {
                    debug!(timer = timer.id, "timer fired");
                    let result = self.call_value(&timer.callback, Vec::new());
                    self.event_loop.rearm(timer);
                    result.map(|_| ()).map_err(Signal::into_error)
                }
                Ready::Task(task) => task(self),
                Ready::Idle => return Ok(()),
            };
            if let Err(error) = outcome {
                if !error.is_catchable() {
                    return Err(error);
                }
                self.report(&ScriptError::from(error));
            }
        }
    }

    pub fn report(&self, error: &ScriptError) {
        debug!(code = error.code_str(), message = %error.message, "uncaught failure");
        self.stderr.write_line(&error.to_string());
    }

    fn report_at(&self, error: &RuntimeError, position: Position) {
        let error = ScriptError::from(error.clone());
        debug!(code = error.code_str(), %position, message = %error.message, "uncaught failure");
        self.stderr.write_line(&format!(
            "{} (line {}, column {})",
            error, position.line, position.column
        ));
    }

    //=================================================
    // Statements
    //=================================================

    pub(crate) fn execute_block(&mut self, statements: &[Stmt], env: &Env) -> Result<(), Signal> {
        for statement in statements {
            self.execute(statement, env)?;
        }
        Ok(())
    }

    pub(crate) fn execute(&mut self, stmt: &Stmt, env: &Env) -> Result<(), Signal> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.evaluate(expr, env)?;
                Ok(())
            }
            Stmt::Print { expr, .. } => {
                let value = self.evaluate(expr, env)?;
                self.stdout.write_line(&value.to_string());
                Ok(())
            }
            Stmt::Let {
                pattern,
                type_hint,
                initializer,
                ..
            } => {
                let value = match initializer {
                    Some(expr) => {
                        let value = self.evaluate(expr, env)?;
                        if let (Some(hint), Pattern::Variable(name)) = (type_hint, pattern) {
                            check_type_hint(hint, name, &value)?;
                        }
                        value
                    }
                    None => Value::Nil,
                };
                self.bind_pattern(pattern, value, env, false)?;
                Ok(())
            }
            Stmt::Const {
                pattern,
                initializer,
                ..
            } => {
                let value = self.evaluate(initializer, env)?;
                self.bind_pattern(pattern, value, env, true)?;
                Ok(())
            }
            Stmt::Block { statements, .. } => self.execute_block(statements, &env.child()),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)
                } else {
                    Ok(())
                }
            }
            Stmt::While {
                condition,
                body,
                step,
                ..
            } => self.execute_while(condition, body, step.as_ref(), env),
            Stmt::Function { decl } => {
                let function = Function::new(Rc::clone(decl), env.clone());
                env.define(
                    decl.name.as_str(),
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(())
            }
            Stmt::Class { decl } => self.declare_class(decl, env),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                Err(Signal::Return(value))
            }
            Stmt::Throw { value, .. } => {
                let value = self.evaluate(value, env)?;
                Err(Signal::Throw(value))
            }
            Stmt::Try {
                body,
                catch_name,
                handler,
                ..
            } => match self.execute(body, env) {
                Err(Signal::Throw(value)) => self.run_handler(catch_name, value, handler, env),
                Err(Signal::Error(error)) if error.is_catchable() => {
                    debug!(%error, "runtime failure caught");
                    self.run_handler(catch_name, Value::String(error.to_string()), handler, env)
                }
                other => other,
            },
            Stmt::Match {
                scrutinee, arms, ..
            } => {
                let value = self.evaluate(scrutinee, env)?;
                for arm in arms {
                    if pattern_matches(&arm.pattern, &value) {
                        let scope = env.child();
                        self.bind_pattern(&arm.pattern, value.clone(), &scope, false)?;
                        return self.execute(&arm.body, &scope);
                    }
                }
                Ok(())
            }
            Stmt::Import { path, .. } => {
                let Value::String(spec) = self.evaluate(path, env)? else {
                    return Err(RuntimeError::type_error("Import path must be a string.").into());
                };
                self.import_module(&spec)
            }
            Stmt::Break { .. } => Err(Signal::Break),
            Stmt::Continue { .. } => Err(Signal::Continue),
        }
    }

    fn execute_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        step: Option<&Expr>,
        env: &Env,
    ) -> Result<(), Signal> {
        while self.evaluate(condition, env)?.is_truthy() {
            match self.execute(body, env) {
                Ok(()) | Err(Signal::Continue) => {}
                Err(Signal::Break) => break,
                Err(other) => return Err(other),
            }
            if let Some(step) = step {
                self.evaluate(step, env)?;
            }
        }
        Ok(())
    }

    fn run_handler(
        &mut self,
        catch_name: &str,
        caught: Value,
        handler: &Stmt,
        env: &Env,
    ) -> Result<(), Signal> {
        let scope = env.child();
        scope.define(catch_name, caught);
        self.execute(handler, &scope)
    }

    //Function: declare_class
    //Purpose: Build a class whose methods close over a scope exposing `super`
    //Inputs: class declaration, declaring scope
    //Returns: unit; the class is bound under its name
    fn declare_class(&mut self, decl: &ClassDecl, env: &Env) -> Result<(), Signal> {
        env.define(decl.name.as_str(), Value::Nil);

        let superclass = match &decl.superclass {
            Some(expr) => match self.evaluate(expr, env)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => return Err(RuntimeError::type_error("Superclass must be a class.").into()),
            },
            None => None,
        };

        let method_scope = match &superclass {
            Some(superclass) => {
                let scope = env.child();
                scope.define("super", Value::Callable(Callable::Class(Rc::clone(superclass))));
                scope
            }
            None => env.clone(),
        };

        let methods = decl
            .methods
            .iter()
            .map(|method| {
                let function = Function::new(Rc::clone(method), method_scope.clone());
                (method.name.clone(), Rc::new(function))
            })
            .collect();

        let class = Class::new(decl.name.as_str(), superclass, methods);
        env.define(decl.name.as_str(), Value::Callable(Callable::Class(Rc::new(class))));
        Ok(())
    }

    /// Resolve, parse and run a module in the global scope. Not memoized.
    fn import_module(&mut self, spec: &str) -> Result<(), Signal> {
        let path = self
            .modules
            .resolve(spec, self.script_dir())
            .map_err(RuntimeError::from)?;
        let program = self.modules.load(&path).map_err(RuntimeError::from)?;
        info!(spec, path = %path.display(), "importing module");

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.module_dirs.push(dir);
        let globals = self.globals.clone();
        let result = self.execute_block(&program.statements, &globals);
        self.module_dirs.pop();
        result
    }

    //=================================================
    // Expressions
    //=================================================

    pub(crate) fn evaluate(&mut self, expr: &Expr, env: &Env) -> Result<Value, Signal> {
        match expr {
            Expr::Literal { value, .. } => Ok(Value::from(value)),
            Expr::Variable { name, .. } => env
                .get(name)
                .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone()).into()),
            Expr::Assign { name, value, .. } => {
                let value = self.evaluate(value, env)?;
                env.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Binary {
                left, op, right, ..
            } => {
                let left = self.evaluate(left, env)?;
                let right = self.evaluate(right, env)?;
                match op {
                    BinaryOp::Pipe => self.pipe(left, right),
                    _ => Ok(binary(*op, &left, &right)?),
                }
            }
            Expr::Logical {
                left, op, right, ..
            } => {
                let left = self.evaluate(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Coalesce => !left.is_nil(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right, env)
                }
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.evaluate(operand, env)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
                    UnaryOp::Negate => match operand {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::type_error("Operand must be a number.").into()),
                    },
                }
            }
            Expr::Grouping { expr, .. } => self.evaluate(expr, env),
            Expr::Call { callee, args, .. } => {
                let callee = self.evaluate(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.evaluate(arg, env)?);
                }
                self.call_value(&callee, values)
            }
            Expr::Get {
                object,
                name,
                optional,
                ..
            } => {
                let object = self.evaluate(object, env)?;
                if *optional && object.is_nil() {
                    return Ok(Value::Nil);
                }
                Ok(get_property(&object, name)?)
            }
            Expr::Set {
                object,
                name,
                value,
                ..
            } => {
                let object = self.evaluate(object, env)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::type_error("Only instances have fields.").into());
                };
                let value = self.evaluate(value, env)?;
                instance.borrow_mut().set(name.as_str(), value.clone());
                Ok(value)
            }
            Expr::Index { object, index, .. } => {
                let object = self.evaluate(object, env)?;
                let index = self.evaluate(index, env)?;
                Ok(index_get(&object, &index)?)
            }
            Expr::IndexSet {
                object,
                index,
                value,
                ..
            } => {
                let object = self.evaluate(object, env)?;
                let index = self.evaluate(index, env)?;
                let value = self.evaluate(value, env)?;
                index_set(&object, &index, value.clone())?;
                Ok(value)
            }
            Expr::This { .. } => env
                .get("this")
                .ok_or_else(|| RuntimeError::UndefinedVariable("this".to_string()).into()),
            Expr::Super { method, .. } => self.super_method(method, env),
            Expr::Await { expr, .. } => {
                let value = self.evaluate(expr, env)?;
                self.await_value(value)
            }
            Expr::Function { decl } => Ok(Value::Callable(Callable::Function(Rc::new(
                Function::new(Rc::clone(decl), env.clone()),
            )))),
            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    let value = self.evaluate(&element.expr, env)?;
                    if element.spread {
                        let Value::Array(items) = value else {
                            return Err(
                                RuntimeError::type_error("Spread operator expects an array.").into()
                            );
                        };
                        values.extend(items.borrow().iter().cloned());
                    } else {
                        values.push(value);
                    }
                }
                Ok(Value::array(values))
            }
            Expr::Object { fields, .. } => {
                let mut values = BTreeMap::new();
                for (key, expr) in fields {
                    let value = self.evaluate(expr, env)?;
                    values.insert(key.clone(), value);
                }
                Ok(self.new_object(values))
            }
            Expr::Template { parts, .. } => {
                let mut text = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(chunk) => text.push_str(chunk),
                        TemplatePart::Expr(expr) => {
                            let value = self.evaluate(expr, env)?;
                            text.push_str(&value.to_string());
                        }
                    }
                }
                Ok(Value::String(text))
            }
        }
    }

    /// `value |> f` calls `f(value)`.
    fn pipe(&mut self, argument: Value, function: Value) -> Result<Value, Signal> {
        let Value::Callable(callable) = &function else {
            return Err(
                RuntimeError::type_error("Pipe operator expects a function on the right.").into(),
            );
        };
        if !callable.arity().accepts(1) {
            return Err(RuntimeError::type_error(
                "Pipe operator expects a function with 1 argument.",
            )
            .into());
        }
        self.call_value(&function, vec![argument])
    }

    /// `super.name` binds the superclass method to the current `this`.
    fn super_method(&mut self, method: &str, env: &Env) -> Result<Value, Signal> {
        let Some(Value::Callable(Callable::Class(superclass))) = env.get("super") else {
            return Err(RuntimeError::type_error("Cannot use 'super' outside of a subclass.").into());
        };
        let this = env
            .get("this")
            .ok_or_else(|| RuntimeError::UndefinedVariable("this".to_string()))?;
        let function = superclass
            .find_method(method)
            .ok_or_else(|| RuntimeError::UndefinedProperty(method.to_string()))?;
        Ok(Value::Callable(Callable::Function(function.bind(this))))
    }

    /// Instances exposing a callable `wait` are waited on synchronously;
    /// anything else passes through.
    fn await_value(&mut self, value: Value) -> Result<Value, Signal> {
        let wait = match &value {
            Value::Instance(instance) => instance_get(instance, "wait"),
            _ => None,
        };
        match wait {
            Some(wait @ Value::Callable(_)) => self.call_value(&wait, Vec::new()),
            _ => Ok(value),
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.workers.close_all();
        self.servers.close_all();
        self.promises.clear();
        self.globals.clear();
    }
}

//=====================================================
//            Section 3: Operators and access helpers
//=====================================================

fn check_type_hint(hint: &str, name: &str, value: &Value) -> Result<(), RuntimeError> {
    let expected = match hint {
        "int" | "number" | "float" => "number",
        "string" => "string",
        "bool" => "bool",
        _ => return Ok(()),
    };
    if value.type_name() == expected {
        Ok(())
    } else {
        Err(RuntimeError::type_error(format!(
            "Type mismatch: '{}' expects {} but got {}.",
            name,
            expected,
            value.type_name()
        )))
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    use Value::{Number, String};

    match op {
        BinaryOp::Equal => return Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => return Ok(Value::Bool(left != right)),
        BinaryOp::Add => {
            return match (left, right) {
                (Number(a), Number(b)) => Ok(Number(a + b)),
                (String(_), _) | (_, String(_)) => Ok(String(format!("{}{}", left, right))),
                _ => Err(RuntimeError::type_error(
                    "Operands must be two numbers or include a string.",
                )),
            };
        }
        _ => {}
    }

    let (Number(a), Number(b)) = (left, right) else {
        return Err(RuntimeError::type_error("Operands must be numbers."));
    };
    let (a, b) = (*a, *b);
    Ok(match op {
        BinaryOp::Subtract => Number(a - b),
        BinaryOp::Multiply => Number(a * b),
        BinaryOp::Divide => Number(a / b),
        BinaryOp::Modulo => Number(a % b),
        BinaryOp::Less => Value::Bool(a < b),
        BinaryOp::LessEqual => Value::Bool(a <= b),
        BinaryOp::Greater => Value::Bool(a > b),
        BinaryOp::GreaterEqual => Value::Bool(a >= b),
        BinaryOp::Add | BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Pipe => {
            return Err(RuntimeError::type_error(format!("Unsupported operator '{}'.", op)));
        }
    })
}

pub(crate) fn get_property(object: &Value, name: &str) -> Result<Value, RuntimeError> {
    match object {
        Value::Instance(instance) => instance_get(instance, name)
            .ok_or_else(|| RuntimeError::UndefinedProperty(name.to_string())),
        Value::Array(items) => methods::array_member(object, items, name),
        Value::String(text) => methods::string_member(object, text, name),
        other => Err(RuntimeError::type_error(format!(
            "Only instances, arrays and strings have properties; cannot read '{}' of {}.",
            name,
            other.type_name()
        ))),
    }
}

fn array_index(index: &Value, len: usize) -> Result<usize, RuntimeError> {
    let Value::Number(n) = index else {
        return Err(RuntimeError::type_error("Index must be a number."));
    };
    if n.fract() != 0.0 || *n < 0.0 || *n >= len as f64 {
        return Err(RuntimeError::index("Index out of bounds."));
    }
    Ok(*n as usize)
}

fn index_get(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match object {
        Value::Array(items) => {
            let items = items.borrow();
            let position = array_index(index, items.len())?;
            Ok(items[position].clone())
        }
        Value::String(text) => {
            let length = text.chars().count();
            let position = array_index(index, length)?;
            Ok(text
                .chars()
                .nth(position)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or_default())
        }
        Value::Instance(instance) => {
            let Value::String(key) = index else {
                return Err(RuntimeError::type_error("Index must be a string for objects."));
            };
            Ok(instance.borrow().fields.get(key).cloned().unwrap_or_default())
        }
        _ => Err(RuntimeError::type_error(
            "Only arrays, objects and strings can be indexed.",
        )),
    }
}

fn index_set(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match object {
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let position = array_index(index, items.len())?;
            items[position] = value;
            Ok(())
        }
        Value::Instance(instance) => {
            let Value::String(key) = index else {
                return Err(RuntimeError::type_error("Index must be a string for objects."));
            };
            instance.borrow_mut().set(key.as_str(), value);
            Ok(())
        }
        _ => Err(RuntimeError::type_error(
            "Only arrays and objects can have indexed assignments.",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> String {
        let mut interpreter = Interpreter::new();
        let output = interpreter.capture_output();
        interpreter.capture_errors();
        interpreter.run_source(source).expect("script runs");
        let text = output.borrow().clone();
        text
    }

    fn failure(source: &str) -> ScriptError {
        let mut interpreter = Interpreter::new();
        interpreter.capture_output();
        interpreter.capture_errors();
        interpreter.run_source(source).expect_err("script fails")
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(run("print 1 + 2 * 3; print \"n=\" + 4; print 7 % 3;"), "7\nn=4\n1\n");
    }

    #[test]
    fn test_division_by_zero_follows_ieee() {
        assert_eq!(run("print 1 / 0; print -1 / 0;"), "inf\n-inf\n");
    }

    #[test]
    fn test_numeric_operands_required() {
        let error = failure("print 1 - \"a\";");
        assert_eq!(error.code, ErrorCode::TypeMismatch);
        assert_eq!(error.message, "Operands must be numbers.");
    }

    #[test]
    fn test_strings_do_not_order() {
        for source in ["print \"a\" < \"b\";", "print \"b\" >= \"a\";"] {
            let error = failure(source);
            assert_eq!(error.code, ErrorCode::TypeMismatch);
            assert_eq!(error.message, "Operands must be numbers.");
        }
    }

    #[test]
    fn test_undefined_variable_is_lookup_failure() {
        let error = failure("print missing;");
        assert_eq!(error.code, ErrorCode::Lookup);
        assert_eq!(error.message, "Undefined variable 'missing'.");
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let output = run(
            "let hits = 0;
             fn bump() { hits = hits + 1; return true; }
             false and bump();
             true or bump();
             let v = nil ?? bump();
             print hits; print false ?? 1; print v;",
        );
        assert_eq!(output, "1\nfalse\ntrue\n");
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let output = run(
            "let out = [];
             for (let i = 0; i < 10; i = i + 1) {
                 if (i == 2) continue;
                 if (i == 5) break;
                 out.push(i);
             }
             print out;",
        );
        assert_eq!(output, "[0, 1, 3, 4]\n");
    }

    #[test]
    fn test_index_access_and_bounds() {
        assert_eq!(run("let a = [1, 2]; a[1] = 5; print a[1]; print \"hey\"[2];"), "5\ny\n");
        let error = failure("let a = [1]; print a[3];");
        assert_eq!(error.code, ErrorCode::Index);
        assert_eq!(error.message, "Index out of bounds.");
    }

    #[test]
    fn test_type_hints_are_enforced() {
        assert_eq!(run("let n: int = 3; print n;"), "3\n");
        let error = failure("let s: string = 5;");
        assert_eq!(error.code, ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_object_literals_and_index_by_key() {
        let output = run(
            "let point = { x: 1, y: 2 };
             point.z = point[\"x\"] + point.y;
             let { x, z } = point;
             print x + z;",
        );
        assert_eq!(output, "4\n");
    }

    #[test]
    fn test_top_level_return_is_reported() {
        let error = failure("return 1;");
        assert_eq!(error.message, "Cannot return from top-level code.");
    }

    #[test]
    fn test_uncaught_throw_reports_payload() {
        let mut interpreter = Interpreter::new();
        interpreter.capture_output();
        let errors = interpreter.capture_errors();
        let error = interpreter.run_source("throw \"bad\"; print 1;").unwrap_err();
        assert_eq!(error.code, ErrorCode::Thrown);
        assert!(errors.borrow().contains("Uncaught exception: bad"));
    }

    #[test]
    fn test_template_interpolation() {
        assert_eq!(run("let who = \"fsk\"; print `hi ${who}, ${1 + 1}`;"), "hi fsk, 2\n");
    }

    #[test]
    fn test_optional_access_on_nil() {
        assert_eq!(run("let n = nil; print n?.field;"), "nil\n");
        assert_eq!(failure("let n = nil; print n.field;").code, ErrorCode::TypeMismatch);
    }
}

//=====================================================
// End of file
//=====================================================
