use crate::language::span::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    Float(f64),
    Str(String),

    True,
    False,
    DataKw,
    EnvKw,

    Dollar,
    EqEq,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Comma,
    LParen,
    RParen,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier `{}`", name),
            TokenKind::Integer(value) => format!("integer `{}`", value),
            TokenKind::Float(value) => format!("number `{}`", value),
            TokenKind::Str(value) => format!("string \"{}\"", value),
            TokenKind::True => "`true`".to_string(),
            TokenKind::False => "`false`".to_string(),
            TokenKind::DataKw => "`.data`".to_string(),
            TokenKind::EnvKw => "`.env`".to_string(),
            TokenKind::Dollar => "`$`".to_string(),
            TokenKind::EqEq => "`==`".to_string(),
            TokenKind::Lt => "`<`".to_string(),
            TokenKind::Gt => "`>`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Slash => "`/`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
        }
    }
}
