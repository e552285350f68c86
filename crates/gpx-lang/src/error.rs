use miette::{Diagnostic, SourceOffset, SourceSpan};

use crate::{
    eval::error::EvalError, lexer::error::LexerError, parser::error::ParseError, range::Range,
    rewrite::error::RuleError,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InnerError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Rule(#[from] RuleError),
}

impl InnerError {
    fn range(&self) -> Option<Range> {
        match self {
            InnerError::Eval(_) => None,
            InnerError::Lexer(err) => Some(err.range()),
            InnerError::Parse(err) => Some(err.token().range),
            InnerError::Rule(err) => err.range(),
        }
    }
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The source code related to the error.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: InnerError) -> Self {
        let source_code = source_code.into();

        let location = match cause.range() {
            Some(range) => {
                let start = SourceOffset::from_location(
                    &source_code,
                    range.start.line as usize,
                    range.start.column,
                );
                let end = SourceOffset::from_location(
                    &source_code,
                    range.end.line as usize,
                    range.end.column,
                );

                SourceSpan::new(
                    start,
                    std::cmp::max(end.offset().saturating_sub(start.offset()), 1),
                )
            }
            // Structural errors concern the expression as a whole.
            None => SourceSpan::new(SourceOffset::from(0), source_code.len()),
        };

        Self {
            cause,
            source_code,
            location,
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Lexer(LexerError::UnexpectedCharacter { .. }) => {
                "LexerError::UnexpectedCharacter"
            }
            InnerError::Parse(ParseError::UnexpectedToken(_)) => "ParseError::UnexpectedToken",
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => {
                "ParseError::UnexpectedEOFDetected"
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => {
                "ParseError::ExpectedClosingParen"
            }
            InnerError::Parse(ParseError::EmptyExpression(_)) => "ParseError::EmptyExpression",
            InnerError::Parse(ParseError::TrailingTokens(_)) => "ParseError::TrailingTokens",
            InnerError::Parse(ParseError::UnknownFunction(_)) => "ParseError::UnknownFunction",
            InnerError::Parse(ParseError::UnexpectedList(_)) => "ParseError::UnexpectedList",
            InnerError::Parse(ParseError::TooDeep(_)) => "ParseError::TooDeep",
            InnerError::Eval(EvalError::Structure { .. }) => "EvalError::Structure",
            InnerError::Eval(EvalError::Argument { .. }) => "EvalError::Argument",
            InnerError::Eval(EvalError::IndexOutOfBounds { .. }) => "EvalError::IndexOutOfBounds",
            InnerError::Eval(EvalError::TooDeep(_)) => "EvalError::TooDeep",
            InnerError::Rule(RuleError::MissingSeparator) => "RuleError::MissingSeparator",
            InnerError::Rule(RuleError::TooManySeparators(_)) => "RuleError::TooManySeparators",
            InnerError::Rule(RuleError::UndefinedVariable(_)) => "RuleError::UndefinedVariable",
            InnerError::Rule(RuleError::PlainVariable(_)) => "RuleError::PlainVariable",
            InnerError::Rule(RuleError::Lexer(_)) => "RuleError::Lexer",
            InnerError::Rule(RuleError::Parse(_)) => "RuleError::Parse",
            InnerError::Rule(RuleError::Structure(_)) => "RuleError::Structure",
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Lexer(_) => {
                Some("Only numbers, identifiers, `+ - * / % ^ **`, parentheses and commas are allowed.".to_string())
            }
            InnerError::Parse(ParseError::UnexpectedEOFDetected(_)) => {
                Some("Input ended unexpectedly. Check for an operator without a right operand.".to_string())
            }
            InnerError::Parse(ParseError::ExpectedClosingParen(_)) => {
                Some("Check for a missing closing parenthesis.".to_string())
            }
            InnerError::Parse(ParseError::UnknownFunction(token)) => {
                Some(format!("`{token}` is not a registered function."))
            }
            InnerError::Parse(ParseError::UnexpectedList(_)) => {
                Some("Comma separated arguments must directly follow a function name.".to_string())
            }
            InnerError::Parse(ParseError::TooDeep(_)) | InnerError::Eval(EvalError::TooDeep(_)) => {
                Some(format!("Nest brackets, calls and powers at most {} levels deep.", crate::MAX_DEPTH))
            }
            InnerError::Parse(_) => Some("Check for syntax errors or misplaced tokens.".to_string()),
            InnerError::Eval(EvalError::Structure { name, arity, .. }) => {
                Some(format!("`{name}` takes exactly {arity} arguments."))
            }
            InnerError::Eval(EvalError::Argument { expected, actual, .. }) => Some(format!(
                "Invalid number of arguments: expected {expected}, got {actual}."
            )),
            InnerError::Eval(EvalError::IndexOutOfBounds { .. }) => {
                Some("Pass one argument per distinct variable, ordered by variable name.".to_string())
            }
            InnerError::Rule(RuleError::MissingSeparator | RuleError::TooManySeparators(_)) => {
                Some("A rule has the form `<lhs> -> <rhs>`.".to_string())
            }
            InnerError::Rule(RuleError::PlainVariable(_)) => {
                Some("Write variables of a rule as `<name>`.".to_string())
            }
            InnerError::Rule(_) => None,
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}
