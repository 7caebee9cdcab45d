//! Потоки: запуск замыкания в изолированном контексте и join.
//!
//! ```lisp
//! (let n 1)
//! (let t (thread (lambda (x) (times 10 (set x (+ x 1))) x) n))
//! (set n 11)
//! (thread-join t) ; => 11
//! ```
//!
//! Каждый поток получает свой интерпретатор. Аргументы копируются при
//! запуске, результат копируется обратно при join.

pub mod capture;
pub mod context;
pub mod handle;
pub mod join;

pub use capture::{capture, ClosureUnit};
pub use context::ExecutionContext;
pub use handle::{spawn, ThreadHandle};
pub use join::{ErrorInfo, JoinCoordinator, ThreadState};
