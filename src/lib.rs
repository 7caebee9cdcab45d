//! # Spindle
//!
//! Встраиваемый S-Expression рантайм с нативными потоками.
//!
//! ## Основные модули
//!
//! - [`asg`] - Абстрактный Синтаксический Граф (ASG)
//! - [`nodecodes`] - Типы узлов и рёбер
//! - [`parser`] - S-Expression парсер
//! - [`interpreter`] - Интерпретатор ASG
//! - [`value`] - Рантайм-значения
//! - [`thread`] - Потоки: захват, контекст выполнения, join
//! - [`config`] - Конфигурация рантайма
//!
//! ## Пример
//!
//! ```rust,ignore
//! use spindle_lang::Interpreter;
//!
//! let mut interpreter = Interpreter::new();
//! let result = interpreter
//!     .eval_source("(thread-join (thread (lambda (x) (* x 2)) 21))")
//!     .unwrap();
//! ```
//!
//! Из Rust поток запускается напрямую:
//!
//! ```rust,ignore
//! use spindle_lang::{spawn, Interpreter};
//!
//! let f = Interpreter::new().eval_source("(lambda (a b) (+ a b))")?;
//! let handle = spawn(&f, vec![1.into(), 2.into()])?;
//! assert_eq!(handle.join(), 3.into());
//! ```

pub mod asg;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod nodecodes;
pub mod parser;
pub mod thread;
pub mod value;

// === Re-exports для удобства ===
pub use asg::{Edge, Node, NodeID, ASG};
pub use config::RuntimeConfig;
pub use error::{SpindleError, SpindleResult};
pub use interpreter::Interpreter;
pub use nodecodes::{EdgeType, NodeType};
pub use parser::{parse, parse_expr};
pub use thread::{capture, spawn, ClosureUnit, ErrorInfo, ThreadHandle, ThreadState};
pub use value::{Closure, Value};
