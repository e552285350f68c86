use thiserror::Error;

use crate::range::Range;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{}` at {}", .remaining.chars().next().unwrap_or_default(), .range.start)]
    UnexpectedCharacter { remaining: String, range: Range },
}

impl LexerError {
    pub fn range(&self) -> Range {
        match self {
            LexerError::UnexpectedCharacter { range, .. } => *range,
        }
    }
}
