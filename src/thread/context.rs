//! Изолированный контекст выполнения для одного потока.

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::SpindleResult;
use crate::interpreter::Interpreter;
use crate::value::Value;

use super::capture::ClosureUnit;

/// Свежий интерпретатор, в который передана единица работы.
///
/// Переменные порождающего scope сюда не попадают; обращение к ним
/// завершается `UnknownVariable`.
pub struct ExecutionContext {
    unit: ClosureUnit,
    interpreter: Interpreter,
}

impl ExecutionContext {
    pub fn new(unit: ClosureUnit, config: Arc<RuntimeConfig>) -> Self {
        Self {
            unit,
            interpreter: Interpreter::with_shared_config(config),
        }
    }

    /// Выполнить тело до конца и вернуть значение последнего выражения.
    pub fn run(self) -> SpindleResult<Value> {
        let Self {
            unit,
            mut interpreter,
        } = self;
        let (callable, mut args, functions) = unit.into_parts();

        interpreter.install_functions(functions);
        args.resize(callable.arity(), Value::Nil);
        interpreter.invoke(&callable, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpindleError;
    use crate::thread::capture::capture;

    fn run_lambda(src: &str, args: Vec<Value>) -> SpindleResult<Value> {
        let mut interpreter = Interpreter::new();
        let callable = interpreter.eval_source(src)?;
        let unit = capture(&callable, args)?;
        ExecutionContext::new(unit, Arc::new(RuntimeConfig::default())).run()
    }

    #[test]
    fn test_empty_body_is_nil() {
        assert_eq!(run_lambda("(lambda ())", vec![]), Ok(Value::Nil));
    }

    #[test]
    fn test_args_bound_positionally() {
        let result = run_lambda("(lambda (a b) (- a b))", vec![Value::Int(10), Value::Int(3)]);
        assert_eq!(result, Ok(Value::Int(7)));
    }

    #[test]
    fn test_missing_args_are_nil() {
        let result = run_lambda("(lambda (a b) (is-nil b))", vec![Value::Int(1)]);
        assert_eq!(result, Ok(Value::Bool(true)));
    }

    #[test]
    fn test_outer_variables_are_not_visible() {
        let result = run_lambda(
            "(let outer 5) (let make (lambda () (let hidden 1) (lambda () hidden))) (make)",
            vec![],
        );
        assert_eq!(result, Err(SpindleError::UnknownVariable("hidden".to_string())));
    }
}
