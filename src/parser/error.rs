//! Ошибки парсера.

use super::token::{Span, Token};
use thiserror::Error;

/// Ошибка парсинга.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at position {}: expected {expected}, found {found}", span.start)]
    UnexpectedToken {
        span: Span,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at position {}: {message}", span.start)]
    UnexpectedEof { span: Span, message: String },

    #[error("Unclosed parenthesis at position {}", span.start)]
    UnclosedParen { span: Span },

    #[error("Invalid syntax at position {}: {message}", span.start)]
    InvalidSyntax { span: Span, message: String },

    #[error("Lexer error at position {}: unexpected character", span.start)]
    LexerError { span: Span },

    /// Неверное количество аргументов у специальной формы.
    #[error("Wrong number of arguments for '{name}' at position {}: expected {expected}, got {got}", span.start)]
    WrongArity {
        span: Span,
        name: String,
        expected: String,
        got: usize,
    },
}

impl ParseError {
    pub fn unexpected_token(span: Span, expected: impl Into<String>, found: &Token) -> Self {
        Self::UnexpectedToken {
            span,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    pub fn unexpected_eof(span: Span, message: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            span,
            message: message.into(),
        }
    }

    pub fn invalid(span: Span, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            span,
            message: message.into(),
        }
    }

    pub fn wrong_arity(
        span: Span,
        name: impl Into<String>,
        expected: impl Into<String>,
        got: usize,
    ) -> Self {
        Self::WrongArity {
            span,
            name: name.into(),
            expected: expected.into(),
            got,
        }
    }

    /// Получить позицию ошибки.
    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEof { span, .. }
            | Self::UnclosedParen { span }
            | Self::InvalidSyntax { span, .. }
            | Self::LexerError { span }
            | Self::WrongArity { span, .. } => *span,
        }
    }
}
