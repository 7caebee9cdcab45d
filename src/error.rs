//! Определения ошибок для Spindle.

use crate::nodecodes::EdgeType;
use thiserror::Error;

/// Основной тип `Result` для библиотеки.
pub type SpindleResult<T> = Result<T, SpindleError>;

/// Перечисление всех возможных ошибок.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpindleError {
    #[error("Node with ID {0} not found in ASG")]
    NodeNotFound(u64),

    #[error("Node {0} is missing required payload")]
    MissingPayload(u64),

    #[error("Node {0} has invalid payload (e.g., wrong size)")]
    InvalidPayload(u64),

    #[error("Node {0} is missing required edge of type {1:?}")]
    MissingEdge(u64, EdgeType),

    #[error("Type mismatch during execution: {0}")]
    TypeError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Ошибка, выброшенная пользовательским кодом через `(throw ...)`.
    #[error("Uncaught error: {0}")]
    Thrown(String),

    // === Потоки ===
    /// Значение нельзя вызвать или число аргументов не подходит (до запуска потока).
    #[error("Capture error: {0}")]
    Capture(String),

    /// Поток завершился с ошибкой; видна только через `join_outcome`.
    #[error("Thread #{thread_id} failed: {message}")]
    RuntimeFailure { thread_id: u64, message: String },

    #[error("Concurrency error: {0}")]
    Concurrency(String),

    // === Окружение ===
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for SpindleError {
    fn from(err: std::io::Error) -> Self {
        SpindleError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for SpindleError {
    fn from(err: serde_json::Error) -> Self {
        SpindleError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_failure_message() {
        let err = SpindleError::RuntimeFailure {
            thread_id: 7,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Thread #7 failed: boom");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SpindleError = io.into();
        assert!(matches!(err, SpindleError::IoError(msg) if msg.contains("missing")));
    }
}
