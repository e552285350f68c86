use std::fmt::{self, Display, Formatter};

use smol_str::SmolStr;

use crate::range::Range;

#[derive(PartialEq, Debug, Clone)]
pub struct Token {
    pub range: Range,
    pub kind: TokenKind,
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    Arrow,
    Asterisk,
    Caret,
    Comma,
    Eof,
    Function(SmolStr),
    LParen,
    Minus,
    Number(f64),
    PatternVariable(SmolStr),
    Percent,
    Plus,
    RParen,
    Slash,
    Variable(SmolStr),
}

impl Token {
    #[inline(always)]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match &self {
            TokenKind::Arrow => write!(f, "->"),
            TokenKind::Asterisk => write!(f, "*"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Function(name) => write!(f, "{}", name),
            TokenKind::LParen => write!(f, "("),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::PatternVariable(name) => write!(f, "<{}>", name),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Variable(name) => write!(f, "{}", name),
        }
    }
}
