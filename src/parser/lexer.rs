//! Лексер для S-Expression синтаксиса Spindle.

use logos::Logos;

use super::error::ParseError;
use super::token::{Span, Spanned, Token};

/// Внутренние токены для logos.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Пропускаем пробелы
#[logos(skip r";[^\n]*")] // Пропускаем комментарии ; до конца строки
enum LogosToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    // Ключевые литералы (до идентификаторов!)
    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("nil")]
    Nil,

    // Float (должен быть до Int для правильного приоритета)
    #[regex(r"-?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| i64::from_str_radix(&lex.slice()[2..], 16).ok())]
    HexInt(i64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        Some(unescape_string(&s[1..s.len()-1]))
    })]
    String(String),

    // Многосимвольные операторы сначала
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,

    // Идентификатор (включая имена с дефисом: thread-join)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice().to_string())]
    Ident(String),
}

/// Обработка escape-последовательностей в строке.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('r') => result.push('\r'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('0') => result.push('\0'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }

    result
}

/// Лексер для Spindle S-Expression.
pub struct Lexer<'a> {
    logos: logos::Lexer<'a, LogosToken>,
    source: &'a str,
    peeked: Option<Spanned<Token>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            logos: LogosToken::lexer(source),
            source,
            peeked: None,
        }
    }

    /// Получить следующий токен.
    pub fn next_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.read_token(),
        }
    }

    /// Посмотреть на следующий токен без его потребления.
    pub fn peek_token(&mut self) -> Result<&Spanned<Token>, ParseError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.read_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn read_token(&mut self) -> Result<Spanned<Token>, ParseError> {
        let Some(next) = self.logos.next() else {
            let pos = self.source.len();
            return Ok(Spanned::new(Token::Eof, Span::new(pos, pos)));
        };
        let span = Span::new(self.logos.span().start, self.logos.span().end);
        match next {
            Ok(logos_token) => Ok(Spanned::new(convert_token(logos_token), span)),
            Err(()) => Err(ParseError::LexerError { span }),
        }
    }
}

/// Конвертировать внутренний токен logos в публичный Token.
fn convert_token(logos_token: LogosToken) -> Token {
    let symbol = |s: &str| Token::Symbol(s.to_string());
    match logos_token {
        LogosToken::LParen => Token::LParen,
        LogosToken::RParen => Token::RParen,
        LogosToken::True => Token::Ident("true".to_string()),
        LogosToken::False => Token::Ident("false".to_string()),
        LogosToken::Nil => Token::Ident("nil".to_string()),
        LogosToken::Int(n) | LogosToken::HexInt(n) => Token::Int(n),
        LogosToken::Float(f) => Token::Float(f),
        LogosToken::String(s) => Token::String(s),
        LogosToken::Ident(s) => Token::Ident(s),
        LogosToken::Plus => symbol("+"),
        LogosToken::Minus => symbol("-"),
        LogosToken::Star => symbol("*"),
        LogosToken::Slash => symbol("/"),
        LogosToken::Percent => symbol("%"),
        LogosToken::Lt => symbol("<"),
        LogosToken::Gt => symbol(">"),
        LogosToken::Le => symbol("<="),
        LogosToken::Ge => symbol(">="),
        LogosToken::Eq => symbol("=="),
        LogosToken::Ne => symbol("!="),
        LogosToken::Bang => symbol("!"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap().value;
            if tok == Token::Eof {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn test_lexer_thread_form() {
        assert_eq!(
            tokens("(thread-join t1)"),
            vec![
                Token::LParen,
                Token::Ident("thread-join".to_string()),
                Token::Ident("t1".to_string()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_lexer_minus_vs_negative() {
        assert_eq!(
            tokens("(- x -1)"),
            vec![
                Token::LParen,
                Token::Symbol("-".to_string()),
                Token::Ident("x".to_string()),
                Token::Int(-1),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_lexer_keywords_and_comments() {
        assert_eq!(
            tokens("; comment\nnil true 0x1F"),
            vec![
                Token::Ident("nil".to_string()),
                Token::Ident("true".to_string()),
                Token::Int(31),
            ]
        );
    }

    #[test]
    fn test_lexer_string_escapes() {
        assert_eq!(tokens(r#""a\n\"b\"""#), vec![Token::String("a\n\"b\"".to_string())]);
    }

    #[test]
    fn test_lexer_error_span() {
        let mut lexer = Lexer::new("(print #)");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        match lexer.next_token() {
            Err(ParseError::LexerError { span }) => assert_eq!(span.start, 7),
            other => panic!("Expected lexer error, got {:?}", other),
        }
    }
}
