pub mod error;
pub mod token;

use error::LexerError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{map, map_res, opt, recognize},
    multi::many0,
    sequence::{delimited, pair},
};
use smol_str::SmolStr;
use token::{Token, TokenKind};

use crate::{
    op::{Operand, registry::Registry},
    range::{Position, Range, Span},
};

macro_rules! define_token_parser {
    ($name:ident, $tag:expr, $kind:expr) => {
        fn $name(input: Span) -> IResult<Span, Token> {
            map(tag($tag), |span: Span| Token {
                range: span.into(),
                kind: $kind,
            })
            .parse(input)
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Accept `<name>` pattern variables and the `->` rule separator, as
    /// used in rewrite rules.
    pub pattern_vars: bool,
}

pub struct Lexer {
    options: Options,
}

impl Lexer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Splits `input` into tokens terminated by an `Eof` token.
    ///
    /// Identifiers naming a function of `registry` become function tokens,
    /// every other identifier is a variable.
    pub fn tokenize<T: Operand>(
        &self,
        input: &str,
        registry: &Registry<T>,
    ) -> Result<Vec<Token>, LexerError> {
        let pattern_vars = self.options.pattern_vars;
        let result = many0(delimited(
            multispace0,
            |input| token(input, pattern_vars),
            multispace0,
        ))
        .parse(Span::new(input));

        let (span, mut tokens) = match result {
            Ok(parsed) => parsed,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(unexpected_character(e.input));
            }
            Err(nom::Err::Incomplete(_)) => unreachable!(),
        };

        let rest = match multispace0::<Span, nom::error::Error<Span>>(span) {
            Ok((rest, _)) => rest,
            Err(_) => span,
        };

        if !rest.fragment().is_empty() {
            return Err(unexpected_character(rest));
        }

        for token in tokens.iter_mut() {
            if let TokenKind::Variable(name) = &token.kind
                && registry.is_function(name)
            {
                token.kind = TokenKind::Function(name.clone());
            }
        }

        tokens.push(Token {
            range: rest.into(),
            kind: TokenKind::Eof,
        });

        tracing::trace!(count = tokens.len(), "tokenized");
        Ok(tokens)
    }
}

fn unexpected_character(span: Span) -> LexerError {
    let start = Position::from(span);
    LexerError::UnexpectedCharacter {
        remaining: span.fragment().to_string(),
        range: Range::new(start, Position::new(start.line, start.column + 1)),
    }
}

define_token_parser!(arrow, "->", TokenKind::Arrow);
define_token_parser!(double_asterisk, "**", TokenKind::Caret);
define_token_parser!(asterisk, "*", TokenKind::Asterisk);
define_token_parser!(caret, "^", TokenKind::Caret);
define_token_parser!(comma, ",", TokenKind::Comma);
define_token_parser!(l_paren, "(", TokenKind::LParen);
define_token_parser!(minus, "-", TokenKind::Minus);
define_token_parser!(percent, "%", TokenKind::Percent);
define_token_parser!(plus, "+", TokenKind::Plus);
define_token_parser!(r_paren, ")", TokenKind::RParen);
define_token_parser!(slash, "/", TokenKind::Slash);

fn operators(input: Span) -> IResult<Span, Token> {
    alt((
        double_asterisk,
        asterisk,
        caret,
        plus,
        minus,
        slash,
        percent,
    ))
    .parse(input)
}

fn punctuations(input: Span) -> IResult<Span, Token> {
    alt((l_paren, r_paren, comma)).parse(input)
}

fn number_literal(input: Span) -> IResult<Span, Token> {
    map_res(
        recognize((
            digit1,
            opt(pair(char('.'), digit1)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        )),
        |span: Span| {
            str::parse::<f64>(span.fragment()).map(|n| Token {
                range: span.into(),
                kind: TokenKind::Number(n),
            })
        },
    )
    .parse(input)
}

fn identifier(input: Span) -> IResult<Span, Span> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn variable(input: Span) -> IResult<Span, Token> {
    map(identifier, |span: Span| Token {
        range: span.into(),
        kind: TokenKind::Variable(SmolStr::new(span.fragment())),
    })
    .parse(input)
}

fn pattern_variable(input: Span) -> IResult<Span, Token> {
    map(
        recognize(delimited(char('<'), identifier, char('>'))),
        |span: Span| {
            let name = span.fragment().trim_start_matches('<').trim_end_matches('>');
            Token {
                range: span.into(),
                kind: TokenKind::PatternVariable(SmolStr::new(name)),
            }
        },
    )
    .parse(input)
}

fn token(input: Span, pattern_vars: bool) -> IResult<Span, Token> {
    if pattern_vars
        && let Ok(parsed) = alt((arrow, pattern_variable)).parse(input)
    {
        return Ok(parsed);
    }

    alt((operators, punctuations, number_literal, variable)).parse(input)
}
