//! Рантайм-значения Spindle.
//!
//! Все варианты `Send + Sync`: значения копируются в поток при запуске
//! и обратно при join.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::asg::{NodeID, ASG};
use crate::thread::ThreadHandle;

/// Представление рантайм-значений.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Отсутствие значения
    Nil,
    /// Целое число
    Int(i64),
    /// Число с плавающей точкой
    Float(f64),
    /// Булево значение
    Bool(bool),
    /// Строка
    String(String),
    /// Массив (семантика значения)
    Array(Vec<Value>),
    /// Функция или лямбда
    Function(Closure),
    /// Запущенный поток
    Thread(ThreadHandle),
    /// Ошибка: результат `throw` и маркер упавшего потока при join
    Error(String),
}

/// Замыкание: тело в разделяемом графе программы плюс захваченные переменные.
#[derive(Debug, Clone)]
pub struct Closure {
    /// Имя для `fn`, `None` для лямбды
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body_id: NodeID,
    /// Граф, в котором живёт тело
    pub program: Arc<ASG>,
    /// Переменные внешнего scope, видимые в момент создания
    pub captured: HashMap<String, Value>,
}

impl Closure {
    pub fn new(name: Option<String>, params: Vec<String>, body_id: NodeID, program: Arc<ASG>) -> Self {
        Self {
            name,
            params,
            body_id,
            program,
            captured: HashMap::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl PartialEq for Closure {
    /// Два замыкания равны, если указывают на одно тело одного графа.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.program, &other.program)
            && self.body_id == other.body_id
            && self.params == other.params
            && self.captured == other.captured
    }
}

impl Value {
    /// Имя типа для сообщений об ошибках.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
            Value::Thread(_) => "thread",
            Value::Error(_) => "error",
        }
    }

    /// Истинность: ложны только `nil` и `false`.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Форматировать значение для REPL (строки в кавычках).
    pub fn format_display(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            Value::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.format_display()).collect();
                format!("[{}]", items.join(", "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.format_display()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Function(closure) => match &closure.name {
                Some(name) => write!(f, "<fn {}({})>", name, closure.params.join(", ")),
                None => write!(f, "<lambda({})>", closure.params.join(", ")),
            },
            Value::Thread(handle) => write!(f, "<thread #{} {}>", handle.id(), handle.state().name()),
            Value::Error(msg) => write!(f, "<error: {}>", msg),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_value_is_send_sync() {
        assert_send_sync::<Value>();
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::Error("x".into()).is_truthy());
    }

    #[test]
    fn test_display() {
        let arr = Value::Array(vec![Value::Int(1), Value::from("a"), Value::Nil]);
        assert_eq!(arr.to_string(), "[1, \"a\", nil]");
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::from("hi").format_display(), "\"hi\"");
        assert_eq!(Value::Error("boom".into()).to_string(), "<error: boom>");
    }

    #[test]
    fn test_closure_equality_is_by_body() {
        let program = Arc::new(ASG::new());
        let a = Closure::new(None, vec!["x".into()], 3, Arc::clone(&program));
        let b = Closure::new(None, vec!["x".into()], 3, Arc::clone(&program));
        let other = Closure::new(None, vec!["x".into()], 3, Arc::new(ASG::new()));
        assert_eq!(a, b);
        assert_ne!(a, other);
    }
}
