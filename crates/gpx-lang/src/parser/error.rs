use thiserror::Error;

use crate::lexer::token::Token;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token `{0}`")]
    UnexpectedToken(Token),
    #[error("Unexpected EOF detected")]
    UnexpectedEOFDetected(Token),
    #[error("Expected a closing parenthesis `)` but got `{0}`")]
    ExpectedClosingParen(Token),
    #[error("Empty expression")]
    EmptyExpression(Token),
    #[error("Unexpected trailing token `{0}`")]
    TrailingTokens(Token),
    #[error("Unknown function `{0}`")]
    UnknownFunction(Token),
    #[error("Argument list is only allowed as function arguments")]
    UnexpectedList(Token),
    #[error("Expression is nested deeper than {max} levels", max = crate::MAX_DEPTH)]
    TooDeep(Token),
}

impl ParseError {
    #[cold]
    pub fn token(&self) -> &Token {
        match self {
            ParseError::UnexpectedToken(token) => token,
            ParseError::UnexpectedEOFDetected(token) => token,
            ParseError::ExpectedClosingParen(token) => token,
            ParseError::EmptyExpression(token) => token,
            ParseError::TrailingTokens(token) => token,
            ParseError::UnknownFunction(token) => token,
            ParseError::UnexpectedList(token) => token,
            ParseError::TooDeep(token) => token,
        }
    }
}
