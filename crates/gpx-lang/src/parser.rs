pub mod error;

use std::{iter::Peekable, marker::PhantomData};

use itertools::Itertools;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::{
    lexer::token::{Token, TokenKind},
    op::{Op, Operand, math, registry::Registry},
    range::Range,
    tree::Tree,
};
use error::ParseError;

/// Node types the parser can build trees of.
pub trait ParseNode: Sized {
    fn from_op(op: Op<f64>) -> Self;

    /// Builds a node for a `<name>` pattern variable, if this node type has one.
    fn from_pattern_var(_name: &SmolStr) -> Option<Self> {
        None
    }
}

impl ParseNode for Op<f64> {
    fn from_op(op: Op<f64>) -> Self {
        op
    }
}

enum Argument<N> {
    Single(Tree<N>),
    List(Vec<Tree<N>>, Token),
}

impl<N> Argument<N> {
    fn single(self) -> Result<Tree<N>, ParseError> {
        match self {
            Argument::Single(tree) => Ok(tree),
            Argument::List(_, token) => Err(ParseError::UnexpectedList(token)),
        }
    }

    fn into_args(self) -> Vec<Tree<N>> {
        match self {
            Argument::Single(tree) => vec![tree],
            Argument::List(trees, _) => trees,
        }
    }
}

/// Recursive descent parser for arithmetic expressions.
///
/// ```text
/// expression   := signedTerm ( ('+'|'-') term )*
/// term         := signedFactor ( ('*'|'/'|'%') signedFactor )*
/// factor       := argument ( '^' signedFactor )?
/// argument     := FUNCTION argument
///               | '(' expression (',' expression)* ')'
///               | value
/// value        := NUMBER | VARIABLE | PATTERN-VARIABLE
/// signedTerm   := ('+' | '-')? term
/// signedFactor := ('+' | '-')? factor
/// ```
///
/// Variables are created with index 0; run [`reindex`] on the result.
/// Brackets, calls and powers nest at most [`MAX_DEPTH`](crate::MAX_DEPTH)
/// levels deep.
pub struct Parser<'a, N> {
    tokens: Peekable<core::slice::Iter<'a, Token>>,
    registry: &'a Registry<f64>,
    depth: usize,
    _node: PhantomData<N>,
}

type ParseResult<N> = Result<Tree<N>, ParseError>;

impl<'a, N: ParseNode> Parser<'a, N> {
    pub fn new(tokens: core::slice::Iter<'a, Token>, registry: &'a Registry<f64>) -> Self {
        Self {
            tokens: tokens.peekable(),
            registry,
            depth: 0,
            _node: PhantomData,
        }
    }

    pub fn parse(&mut self) -> ParseResult<N> {
        if let Some(token) = self.tokens.peek()
            && token.is_eof()
        {
            return Err(ParseError::EmptyExpression((*token).clone()));
        }

        let tree = self.parse_expression()?;

        match self.tokens.next() {
            None => Ok(tree),
            Some(token) if token.is_eof() => Ok(tree),
            Some(token) => Err(ParseError::TrailingTokens(token.clone())),
        }
    }

    fn parse_expression(&mut self) -> ParseResult<N> {
        let mut left = self.parse_signed(Self::parse_term)?;

        while let Some(token) = self.next_if(|kind| matches!(kind, TokenKind::Plus | TokenKind::Minus)) {
            let right = self.parse_term()?;
            left = self.parse_binary_op(token, left, right)?;
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> ParseResult<N> {
        let mut left = self.parse_signed(Self::parse_factor)?;

        while let Some(token) = self.next_if(|kind| {
            matches!(
                kind,
                TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent
            )
        }) {
            let right = self.parse_signed(Self::parse_factor)?;
            left = self.parse_binary_op(token, left, right)?;
        }

        Ok(left)
    }

    // `^` recurses through the signed factor, so `a^b^c` is `a^(b^c)`.
    fn parse_factor(&mut self) -> ParseResult<N> {
        let base = self.parse_argument()?.single()?;

        match self.next_if(|kind| matches!(kind, TokenKind::Caret)) {
            Some(token) => {
                let exponent = self.nested(token, |parser| parser.parse_signed(Self::parse_factor))?;
                self.parse_binary_op(token, base, exponent)
            }
            None => Ok(base),
        }
    }

    fn parse_signed(&mut self, parse: fn(&mut Self) -> ParseResult<N>) -> ParseResult<N> {
        match self.next_if(|kind| matches!(kind, TokenKind::Plus | TokenKind::Minus)) {
            Some(token) if token.kind == TokenKind::Minus => {
                let operand = parse(self)?;
                self.call(token, math::NEG, vec![operand])
            }
            _ => parse(self),
        }
    }

    fn parse_argument(&mut self) -> Result<Argument<N>, ParseError> {
        let token = self.next_token()?;

        match &token.kind {
            TokenKind::Function(name) => {
                let args = self.nested(token, Self::parse_argument)?.into_args();
                self.call(token, name, args).map(Argument::Single)
            }
            TokenKind::LParen => self.nested(token, |parser| parser.parse_list(token)),
            _ => self.parse_value(token).map(Argument::Single),
        }
    }

    // After the opening bracket.
    fn parse_list(&mut self, token: &'a Token) -> Result<Argument<N>, ParseError> {
        let mut args = vec![self.parse_expression()?];

        while self.next_if(|kind| matches!(kind, TokenKind::Comma)).is_some() {
            args.push(self.parse_expression()?);
        }

        let closing = self.next_token()?;
        if closing.kind != TokenKind::RParen {
            return Err(ParseError::ExpectedClosingParen(closing.clone()));
        }

        match args.pop() {
            Some(arg) if args.is_empty() => Ok(Argument::Single(arg)),
            Some(arg) => {
                args.push(arg);
                Ok(Argument::List(args, token.clone()))
            }
            None => unreachable!(),
        }
    }

    fn nested<R>(
        &mut self,
        token: &Token,
        parse: impl FnOnce(&mut Self) -> Result<R, ParseError>,
    ) -> Result<R, ParseError> {
        if self.depth >= crate::MAX_DEPTH {
            return Err(ParseError::TooDeep(token.clone()));
        }

        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_value(&mut self, token: &'a Token) -> ParseResult<N> {
        match &token.kind {
            TokenKind::Number(n) => Ok(Tree::new(N::from_op(Op::constant(*n)))),
            TokenKind::Variable(name) => {
                if let Some(constant) = self.registry.constant(name) {
                    return Ok(Tree::new(N::from_op(Op::Const(constant.clone()))));
                }

                if matches!(self.tokens.peek(), Some(next) if next.kind == TokenKind::LParen) {
                    return Err(ParseError::UnknownFunction(token.clone()));
                }

                Ok(Tree::new(N::from_op(Op::var(name.clone(), 0))))
            }
            TokenKind::PatternVariable(name) => N::from_pattern_var(name)
                .map(Tree::new)
                .ok_or_else(|| ParseError::UnexpectedToken(token.clone())),
            TokenKind::Eof => Err(ParseError::UnexpectedEOFDetected(token.clone())),
            _ => Err(ParseError::UnexpectedToken(token.clone())),
        }
    }

    #[inline(always)]
    fn binary_op_function_name(kind: &TokenKind) -> &'static str {
        match kind {
            TokenKind::Plus => math::ADD,
            TokenKind::Minus => math::SUB,
            TokenKind::Asterisk => math::MUL,
            TokenKind::Slash => math::DIV,
            TokenKind::Percent => math::MOD,
            TokenKind::Caret => math::POW,
            _ => unreachable!(),
        }
    }

    fn parse_binary_op(&mut self, token: &'a Token, left: Tree<N>, right: Tree<N>) -> ParseResult<N> {
        self.call(token, Self::binary_op_function_name(&token.kind), vec![left, right])
    }

    fn call(&self, token: &Token, name: &str, args: Vec<Tree<N>>) -> ParseResult<N> {
        let function = self
            .registry
            .function(name)
            .ok_or_else(|| ParseError::UnknownFunction(token.clone()))?;

        let mut tree = Tree::new(N::from_op(Op::Function(function.clone())));
        let root = tree.root();
        for arg in args {
            tree.append(root, arg);
        }

        Ok(tree)
    }

    fn next_if(&mut self, f: impl Fn(&TokenKind) -> bool) -> Option<&'a Token> {
        self.tokens.next_if(|token| f(&token.kind))
    }

    fn next_token(&mut self) -> Result<&'a Token, ParseError> {
        self.tokens.next().ok_or_else(|| {
            ParseError::UnexpectedEOFDetected(Token {
                range: Range::default(),
                kind: TokenKind::Eof,
            })
        })
    }
}

/// Assigns every variable the rank of its name among all distinct variable
/// names of `tree`, in sorted order.
pub fn reindex<T: Operand>(tree: &mut Tree<Op<T>>) {
    let indexes = tree
        .values()
        .filter_map(|op| match op {
            Op::Var(var) => Some(SmolStr::new(var.name())),
            _ => None,
        })
        .sorted()
        .dedup()
        .enumerate()
        .map(|(index, name)| (name, index))
        .collect::<FxHashMap<_, _>>();

    reindex_with(tree, &indexes);
}

/// Assigns variables the index `indexes` maps their name to. Variables with
/// unmapped names keep their index.
pub fn reindex_with<T: Operand>(tree: &mut Tree<Op<T>>, indexes: &FxHashMap<SmolStr, usize>) {
    let ids = tree.preorder(tree.root()).collect::<Vec<_>>();

    for id in ids {
        if let Op::Var(var) = tree.value_mut(id)
            && let Some(index) = indexes.get(var.name())
        {
            var.set_index(*index);
        }
    }
}
