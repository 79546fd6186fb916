//=====================================================
// File: interpreter/environment.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lexical scope chain
// Objective: Insertion-ordered name bindings with an enclosing link, shared
//            by every closure created inside the scope
//=====================================================

use super::errors::RuntimeError;
use super::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug)]
struct Binding {
    name: String,
    value: Value,
    constant: bool,
}

#[derive(Default)]
struct Scope {
    slots: HashMap<String, usize>,
    bindings: Vec<Binding>,
    enclosing: Option<Env>,
}

/// Handle to a scope frame. Cloning shares the frame.
#[derive(Clone, Default)]
pub struct Env(Rc<RefCell<Scope>>);

impl Env {
    /// A root scope with no enclosing frame.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Self {
        Env(Rc::new(RefCell::new(Scope {
            enclosing: Some(self.clone()),
            ..Scope::default()
        })))
    }

    pub fn enclosing(&self) -> Option<Env> {
        self.0.borrow().enclosing.clone()
    }

    /// Bind in this frame, replacing any binding of the same name here.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.insert(name.into(), value, false);
    }

    pub fn define_const(&self, name: impl Into<String>, value: Value) {
        self.insert(name.into(), value, true);
    }

    fn insert(&self, name: String, value: Value, constant: bool) {
        let mut scope = self.0.borrow_mut();
        match scope.slots.get(&name).copied() {
            Some(slot) => {
                let binding = &mut scope.bindings[slot];
                binding.value = value;
                binding.constant = constant;
            }
            None => {
                let slot = scope.bindings.len();
                scope.slots.insert(name.clone(), slot);
                scope.bindings.push(Binding {
                    name,
                    value,
                    constant,
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let scope = current.0.borrow();
                if let Some(&slot) = scope.slots.get(name) {
                    return Some(scope.bindings[slot].value.clone());
                }
                scope.enclosing.clone()?
            };
            current = next;
        }
    }

    /// Rebind the nearest frame that defines `name`.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut scope = current.0.borrow_mut();
                if let Some(&slot) = scope.slots.get(name) {
                    let binding = &mut scope.bindings[slot];
                    if binding.constant {
                        return Err(RuntimeError::ConstAssignment(name.to_string()));
                    }
                    binding.value = value;
                    return Ok(());
                }
                scope.enclosing.clone()
            };
            match next {
                Some(env) => current = env,
                None => return Err(RuntimeError::UndefinedVariable(name.to_string())),
            }
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.0.borrow().slots.contains_key(name)
    }

    /// Names bound in this frame, in definition order.
    pub fn local_names(&self) -> Vec<String> {
        self.0
            .borrow()
            .bindings
            .iter()
            .map(|binding| binding.name.clone())
            .collect()
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Drop every binding in this frame. Globals hold closures that capture
    /// the global frame, so the cycle is broken here at shutdown.
    pub fn clear(&self) {
        let drained = {
            let mut scope = self.0.borrow_mut();
            scope.slots.clear();
            std::mem::take(&mut scope.bindings)
        };
        drop(drained);
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.0.borrow();
        f.debug_struct("Env")
            .field("names", &scope.bindings.iter().map(|b| &b.name).collect::<Vec<_>>())
            .field("has_enclosing", &scope.enclosing.is_some())
            .finish()
    }
}


//=====================================================
// End of file
//=====================================================
