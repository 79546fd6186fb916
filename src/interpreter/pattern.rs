//=====================================================
// File: interpreter/pattern.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Pattern binding and matching
// Objective: Destructure values into a scope for let/const/params/match arms
//            and test match arm patterns without side effects
//=====================================================

use super::Interpreter;
use super::environment::Env;
use super::errors::RuntimeError;
use super::value::Value;
use crate::ast::{ArrayPatternElement, Pattern};

impl Interpreter {
    /// Introduce the bindings `pattern` describes for `value` into `env`.
    /// Missing array positions and object keys bind nil.
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        env: &Env,
        constant: bool,
    ) -> Result<(), RuntimeError> {
        match pattern {
            Pattern::Variable(name) => {
                if constant {
                    env.define_const(name.as_str(), value);
                } else {
                    env.define(name.as_str(), value);
                }
                Ok(())
            }
            // Placeholder only; nothing to bind.
            Pattern::Literal(_) => Ok(()),
            Pattern::Array(elements) => {
                let Value::Array(source) = value else {
                    return Err(RuntimeError::type_error("Cannot destructure non-array value."));
                };
                let items = source.borrow().clone();
                for (index, element) in elements.iter().enumerate() {
                    let bound = if element.spread {
                        Value::array(items.iter().skip(index).cloned().collect())
                    } else {
                        items.get(index).cloned().unwrap_or_default()
                    };
                    self.bind_pattern(&element.pattern, bound, env, constant)?;
                }
                Ok(())
            }
            Pattern::Object(fields) => {
                if !matches!(value, Value::Instance(_)) {
                    return Err(RuntimeError::type_error("Cannot destructure non-object value."));
                }
                for (key, sub_pattern) in fields {
                    self.bind_pattern(sub_pattern, value.field(key), env, constant)?;
                }
                Ok(())
            }
        }
    }
}

/// Read-only test of a match arm. Variables match anything; capture happens
/// later through `bind_pattern` once the arm is chosen.
pub fn pattern_matches(pattern: &Pattern, value: &Value) -> bool {
    match pattern {
        Pattern::Variable(_) => true,
        Pattern::Literal(literal) => Value::from(literal) == *value,
        Pattern::Array(elements) => match value {
            Value::Array(items) => array_matches(elements, &items.borrow()),
            _ => false,
        },
        Pattern::Object(fields) => match value {
            Value::Instance(instance) => fields.iter().all(|(key, sub_pattern)| {
                instance
                    .borrow()
                    .fields
                    .get(key)
                    .is_some_and(|field| pattern_matches(sub_pattern, field))
            }),
            _ => false,
        },
    }
}

fn array_matches(elements: &[ArrayPatternElement], items: &[Value]) -> bool {
    let has_rest = elements.last().is_some_and(|element| element.spread);
    let fixed = if has_rest { elements.len() - 1 } else { elements.len() };

    let length_ok = if has_rest {
        items.len() >= fixed
    } else {
        items.len() == fixed
    };

    length_ok
        && elements[..fixed]
            .iter()
            .zip(items)
            .all(|(element, item)| pattern_matches(&element.pattern, item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Literal;

    fn var(name: &str) -> ArrayPatternElement {
        ArrayPatternElement {
            pattern: Pattern::Variable(name.into()),
            spread: false,
        }
    }

    fn rest(name: &str) -> ArrayPatternElement {
        ArrayPatternElement {
            pattern: Pattern::Variable(name.into()),
            spread: true,
        }
    }

    fn numbers(values: &[f64]) -> Value {
        Value::array(values.iter().map(|n| Value::Number(*n)).collect())
    }

    #[test]
    fn array_binding_with_rest() {
        let mut interpreter = Interpreter::new();
        let env = Env::new();
        let pattern = Pattern::Array(vec![var("a"), rest("tail")]);
        interpreter
            .bind_pattern(&pattern, numbers(&[1.0, 2.0, 3.0]), &env, false)
            .unwrap();
        assert_eq!(env.get("a"), Some(Value::Number(1.0)));
        assert_eq!(env.get("tail"), Some(numbers(&[2.0, 3.0])));
    }

    #[test]
    fn short_arrays_bind_nil() {
        let mut interpreter = Interpreter::new();
        let env = Env::new();
        let pattern = Pattern::Array(vec![var("a"), var("b"), var("c")]);
        interpreter
            .bind_pattern(&pattern, numbers(&[1.0]), &env, false)
            .unwrap();
        assert_eq!(env.get("a"), Some(Value::Number(1.0)));
        assert_eq!(env.get("b"), Some(Value::Nil));
        assert_eq!(env.get("c"), Some(Value::Nil));
    }

    #[test]
    fn destructuring_a_scalar_fails() {
        let mut interpreter = Interpreter::new();
        let env = Env::new();
        let pattern = Pattern::Array(vec![var("a")]);
        let error = interpreter
            .bind_pattern(&pattern, Value::Number(1.0), &env, false)
            .unwrap_err();
        assert_eq!(error.to_string(), "Cannot destructure non-array value.");
    }

    #[test]
    fn match_requires_equal_length_without_rest() {
        let pattern = Pattern::Array(vec![var("a"), var("b")]);
        assert!(pattern_matches(&pattern, &numbers(&[2.0, 3.0])));
        assert!(!pattern_matches(&pattern, &numbers(&[2.0])));
        assert!(!pattern_matches(&pattern, &numbers(&[2.0, 3.0, 4.0])));

        let with_rest = Pattern::Array(vec![var("a"), rest("others")]);
        assert!(pattern_matches(&with_rest, &numbers(&[1.0, 2.0, 3.0])));
        assert!(!pattern_matches(&with_rest, &numbers(&[])));
    }

    #[test]
    fn literal_patterns_compare_by_value() {
        let one = Pattern::Literal(Literal::Number(1.0));
        assert!(pattern_matches(&one, &Value::Number(1.0)));
        assert!(!pattern_matches(&one, &numbers(&[1.0])));
        assert!(pattern_matches(&Pattern::Variable("x".into()), &Value::Nil));
    }
}

//=====================================================
// End of file
//=====================================================
