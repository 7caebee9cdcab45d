//! S-Expression парсер.

use super::error::ParseError;
use super::lexer::Lexer;
use super::token::{Span, Spanned, Token};
use super::{STACK_GROWTH, STACK_RED_ZONE};

/// S-Expression: атом или список.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Atom(Spanned<Atom>),
    List(Spanned<Vec<SExpr>>),
}

/// Атомарное значение.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Int(i64),
    Float(f64),
    String(String),
    /// Идентификатор (включая ключевые слова).
    Ident(String),
    /// Символ оператора.
    Symbol(String),
}

// Глубоко вложенный список освобождается по очереди, без рекурсии.
impl Drop for SExpr {
    fn drop(&mut self) {
        let SExpr::List(list) = self else {
            return;
        };
        let mut pending = std::mem::take(&mut list.value);
        while let Some(mut expr) = pending.pop() {
            if let SExpr::List(inner) = &mut expr {
                pending.append(&mut inner.value);
            }
        }
    }
}

impl SExpr {
    pub fn span(&self) -> Span {
        match self {
            SExpr::Atom(spanned) => spanned.span,
            SExpr::List(spanned) => spanned.span,
        }
    }

    /// Получить идентификатор из атома.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Spanned {
                value: Atom::Ident(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    /// Получить символ оператора из атома.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SExpr::Atom(Spanned {
                value: Atom::Symbol(s),
                ..
            }) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(Spanned { value, .. }) => Some(value),
            _ => None,
        }
    }

    /// Имя формы: первый элемент списка, если это идентификатор или символ.
    pub fn form_name(&self) -> Option<&str> {
        self.as_list()
            .and_then(|list| list.first())
            .and_then(|first| first.as_ident().or_else(|| first.as_symbol()))
    }
}

/// Парсер S-Expression.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Распарсить все S-выражения из исходника.
    pub fn parse_all(&mut self) -> Result<Vec<SExpr>, ParseError> {
        let mut exprs = Vec::new();
        while !matches!(self.lexer.peek_token()?.value, Token::Eof) {
            exprs.push(self.parse_sexpr()?);
        }
        Ok(exprs)
    }

    /// Распарсить ровно одно S-выражение; хвост после него считается ошибкой.
    pub fn parse_single(&mut self) -> Result<SExpr, ParseError> {
        let expr = self.parse_sexpr()?;
        let trailing = self.lexer.next_token()?;
        if trailing.value != Token::Eof {
            return Err(ParseError::unexpected_token(
                trailing.span,
                "end of input",
                &trailing.value,
            ));
        }
        Ok(expr)
    }

    /// Распарсить одно S-выражение.
    pub fn parse_sexpr(&mut self) -> Result<SExpr, ParseError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.parse_token())
    }

    fn parse_token(&mut self) -> Result<SExpr, ParseError> {
        let token = self.lexer.next_token()?;
        let atom = |value| Ok(SExpr::Atom(Spanned::new(value, token.span)));

        match token.value {
            Token::LParen => self.parse_list(token.span),
            Token::Int(n) => atom(Atom::Int(n)),
            Token::Float(f) => atom(Atom::Float(f)),
            Token::String(ref s) => atom(Atom::String(s.clone())),
            Token::Ident(ref s) => atom(Atom::Ident(s.clone())),
            Token::Symbol(ref s) => atom(Atom::Symbol(s.clone())),
            Token::RParen => Err(ParseError::unexpected_token(
                token.span,
                "expression",
                &Token::RParen,
            )),
            Token::Eof => Err(ParseError::unexpected_eof(token.span, "expected expression")),
        }
    }

    /// Распарсить список (после открывающей скобки).
    fn parse_list(&mut self, start_span: Span) -> Result<SExpr, ParseError> {
        let mut elements = Vec::new();

        loop {
            match self.lexer.peek_token()?.value {
                Token::RParen => {
                    let end_token = self.lexer.next_token()?;
                    let span = start_span.merge(end_token.span);
                    return Ok(SExpr::List(Spanned::new(elements, span)));
                }
                Token::Eof => return Err(ParseError::UnclosedParen { span: start_span }),
                _ => elements.push(self.parse_sexpr()?),
            }
        }
    }
}
