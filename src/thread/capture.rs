//! Захват замыкания и аргументов перед запуском потока.

use std::collections::HashMap;

use crate::error::{SpindleError, SpindleResult};
use crate::value::{Closure, Value};

/// Неизменяемая единица работы для потока: тело плюс связанные аргументы.
#[derive(Debug, Clone)]
pub struct ClosureUnit {
    callable: Closure,
    bound_args: Vec<Value>,
    /// Именованные функции, видимые в потоке
    functions: HashMap<String, Closure>,
}

impl ClosureUnit {
    pub fn callable(&self) -> &Closure {
        &self.callable
    }

    pub fn bound_args(&self) -> &[Value] {
        &self.bound_args
    }

    pub fn functions(&self) -> &HashMap<String, Closure> {
        &self.functions
    }

    /// Сделать именованные функции доступными в потоке.
    pub fn with_functions(mut self, functions: HashMap<String, Closure>) -> Self {
        self.functions = functions;
        self
    }

    pub(crate) fn into_parts(self) -> (Closure, Vec<Value>, HashMap<String, Closure>) {
        (self.callable, self.bound_args, self.functions)
    }
}

/// Упаковать вызываемое значение и аргументы.
///
/// Окружение, в котором определено замыкание, не копируется: поток видит
/// только свои аргументы. Аргументов может быть меньше, чем параметров
/// (недостающие станут `nil`), но не больше.
pub fn capture(callable: &Value, args: Vec<Value>) -> SpindleResult<ClosureUnit> {
    let closure = match callable {
        Value::Function(closure) => closure,
        Value::Nil => return Err(SpindleError::Capture("invalid parameter.".to_string())),
        other => {
            return Err(SpindleError::Capture(format!(
                "{} is not callable",
                other.type_name()
            )))
        }
    };

    if args.len() > closure.arity() {
        return Err(SpindleError::Capture(format!(
            "wrong number of arguments ({} for {})",
            args.len(),
            closure.arity()
        )));
    }

    let mut callable = closure.clone();
    callable.captured.clear();

    Ok(ClosureUnit {
        callable,
        bound_args: args,
        functions: HashMap::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expr;
    use std::sync::Arc;

    fn lambda(params: &[&str]) -> Value {
        let (asg, root) = parse_expr("1").unwrap();
        let params = params.iter().map(|p| p.to_string()).collect();
        Value::Function(Closure::new(None, params, root, asg))
    }

    #[test]
    fn test_capture_nil_is_invalid_parameter() {
        assert_eq!(
            capture(&Value::Nil, vec![]).unwrap_err(),
            SpindleError::Capture("invalid parameter.".to_string())
        );
    }

    #[test]
    fn test_capture_non_callable() {
        assert!(matches!(
            capture(&Value::Int(3), vec![]),
            Err(SpindleError::Capture(msg)) if msg.contains("int")
        ));
    }

    #[test]
    fn test_capture_too_many_args() {
        assert!(matches!(
            capture(&lambda(&["x"]), vec![Value::Int(1), Value::Int(2)]),
            Err(SpindleError::Capture(msg)) if msg.contains("2 for 1")
        ));
    }

    #[test]
    fn test_capture_fewer_args_allowed() {
        let unit = capture(&lambda(&["a", "b"]), vec![Value::Int(1)]).unwrap();
        assert_eq!(unit.bound_args(), &[Value::Int(1)]);
        assert_eq!(unit.callable().arity(), 2);
    }

    #[test]
    fn test_capture_copies_args_and_drops_environment() {
        let mut source = lambda(&["x"]);
        if let Value::Function(closure) = &mut source {
            closure.captured.insert("outer".to_string(), Value::Int(5));
        }

        let mut n = Value::Array(vec![Value::Int(1)]);
        let unit = capture(&source, vec![n.clone()]).unwrap();
        n = Value::Array(vec![Value::Int(11)]);

        assert_ne!(unit.bound_args()[0], n);
        assert!(unit.callable().captured.is_empty());
        if let Value::Function(source_closure) = &source {
            assert!(Arc::ptr_eq(&source_closure.program, &unit.callable().program));
        }
    }
}
