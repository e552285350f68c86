use smol_str::SmolStr;
use thiserror::Error;

use crate::{
    eval::error::EvalError, lexer::error::LexerError, lexer::token::Token,
    parser::error::ParseError, range::Range,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Missing rule separator `->`")]
    MissingSeparator,
    #[error("Unexpected second rule separator `{0}`")]
    TooManySeparators(Token),
    #[error("Variable `<{0}>` is not bound by the left-hand side")]
    UndefinedVariable(SmolStr),
    #[error("Plain variable `{0}` is not allowed in a rule")]
    PlainVariable(SmolStr),
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Structure(#[from] EvalError),
}

impl RuleError {
    pub fn range(&self) -> Option<Range> {
        match self {
            RuleError::TooManySeparators(token) => Some(token.range),
            RuleError::Lexer(err) => Some(err.range()),
            RuleError::Parse(err) => Some(err.token().range),
            RuleError::MissingSeparator
            | RuleError::UndefinedVariable(_)
            | RuleError::PlainVariable(_)
            | RuleError::Structure(_) => None,
        }
    }
}
