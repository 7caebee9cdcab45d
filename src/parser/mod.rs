//! Модуль парсера S-Expression для Spindle.
//!
//! # Синтаксис
//!
//! ```lisp
//! ; Литералы
//! 42 3.14 true "hello" nil
//!
//! ; Переменные
//! (let x 42)      ; объявление
//! (set x 100)     ; присваивание
//!
//! ; Функции
//! (fn inc (x) (+ x 1))
//! (lambda (x) (* x x))
//!
//! ; Потоки
//! (let t (thread (lambda (a) (times 10 (set a (+ a 1))) a) 1))
//! (thread-join t) ; => 11
//! ```
//!
//! # Пример
//!
//! ```rust,ignore
//! use spindle_lang::parser::parse;
//!
//! let (asg, root_ids) = parse("(let x 1) x").unwrap();
//! ```

pub mod builder;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use builder::AsgBuilder;
pub use error::ParseError;
pub use lexer::Lexer;
pub use parser::{Atom, Parser, SExpr};
pub use token::{Span, Spanned, Token};

use std::sync::Arc;

use crate::asg::{NodeID, ASG};
use crate::error::{SpindleError, SpindleResult};

/// Запас стека для рекурсивного спуска по вложенным спискам.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 4 * 1024 * 1024;

/// Ошибка парсинга с номером строки и колонки.
fn located(source: &str, err: ParseError) -> SpindleError {
    let (line, col) = err.span().line_col(source);
    SpindleError::ParseError(format!("{} (line {}, column {})", err, line, col))
}

/// Парсит исходный код в ASG.
///
/// Возвращает граф (разделяемый между потоками) и ID корневых узлов
/// в порядке следования top-level выражений.
pub fn parse(source: &str) -> SpindleResult<(Arc<ASG>, Vec<NodeID>)> {
    let exprs = Parser::new(source)
        .parse_all()
        .map_err(|e| located(source, e))?;
    let (asg, roots) = AsgBuilder::new()
        .build(&exprs)
        .map_err(|e| located(source, e))?;
    log::debug!("parsed {} top-level forms into {} nodes", roots.len(), asg.node_count());
    Ok((Arc::new(asg), roots))
}

/// Парсит ровно одно выражение.
pub fn parse_expr(source: &str) -> SpindleResult<(Arc<ASG>, NodeID)> {
    let expr = Parser::new(source)
        .parse_single()
        .map_err(|e| located(source, e))?;
    let (asg, root) = AsgBuilder::new()
        .build_single(&expr)
        .map_err(|e| located(source, e))?;
    Ok((Arc::new(asg), root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::value::Value;

    #[test]
    fn test_parse_and_execute_add() {
        let (asg, root_id) = parse_expr("(+ 5 8)").unwrap();
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.execute(&asg, root_id).unwrap(), Value::Int(13));
    }

    #[test]
    fn test_parse_and_execute_nested() {
        let (asg, root_id) = parse_expr("(* (+ 2 3) 4)").unwrap();
        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.execute(&asg, root_id).unwrap(), Value::Int(20));
    }

    #[test]
    fn test_parse_let() {
        let (asg, root_ids) = parse("(let x 10) x").unwrap();
        let mut interpreter = Interpreter::new();

        let mut result = Value::Nil;
        for root_id in root_ids {
            result = interpreter.execute(&asg, root_id).unwrap();
        }
        assert_eq!(result, Value::Int(10));
    }

    #[test]
    fn test_parse_error_is_reported() {
        match parse("(let x 1)\n(let y (+ 1 2)") {
            Err(SpindleError::ParseError(msg)) => {
                assert!(msg.contains("Unclosed"));
                assert!(msg.contains("line 2, column 1"));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_deeply_nested_forms() {
        let depth = 50_000;
        let (asg, root_ids) = parse(&format!("{}1{}", "(do ".repeat(depth), ")".repeat(depth))).unwrap();
        assert_eq!(root_ids.len(), 1);
        assert_eq!(asg.node_count(), 1);

        let (asg, root_ids) = parse(&format!("{}1{}", "(- ".repeat(depth), ")".repeat(depth))).unwrap();
        assert_eq!(asg.node_count(), depth + 1);

        let mut interpreter = Interpreter::new();
        assert_eq!(interpreter.execute(&asg, root_ids[0]).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_deeply_nested_error_on_small_stack() {
        let depth = 50_000;
        let source = format!("{}(let){}", "(do ".repeat(depth), ")".repeat(depth));
        let result = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || parse(&source).map(|_| ()))
            .unwrap()
            .join()
            .unwrap();
        assert!(matches!(result, Err(SpindleError::ParseError(_))));
    }

    #[test]
    fn test_graph_serializes_to_json() {
        let (asg, _) = parse("(thread (lambda () 1))").unwrap();
        let json = serde_json::to_string(asg.as_ref()).unwrap();
        let back: ASG = serde_json::from_str(&json).unwrap();
        assert_eq!(back, *asg);
    }
}
