//! `gpx-lang` parses, evaluates, simplifies and recombines the operation
//! trees genetic programs are made of.
//!
//! ## Examples
//!
//! ```rust
//! use gpx_lang::{Expression, Style};
//!
//! // Variables are indexed by the sorted order of their names: x, y, z.
//! let expr = Expression::parse("2*z + 3*x - y").unwrap();
//! assert_eq!(expr.eval(&[3.0, 2.0, 1.0]), Ok(9.0));
//!
//! let mut expr = Expression::parse("4.0+4.0+x*(5.0+13.0)").unwrap();
//! expr.simplify();
//! assert_eq!(expr.format(Style::Bracketed), "8.0 + (x*18.0)");
//!
//! // Declarative rewrite rules
//! use gpx_lang::{Registry, RewriteRule, Rewriter};
//!
//! let rule = RewriteRule::compile("sub(<x>, <x>) -> 0").unwrap();
//! let mut tree = gpx_lang::parse("sin(a - a)", &Registry::math()).unwrap();
//! assert_eq!(rule.rewrite(&mut tree, 10), 1);
//! assert_eq!(tree.to_string(), "sin(0.0)");
//! ```
mod arena;
mod engine;
mod error;
mod expr;
mod range;

pub mod eval;
pub mod flat;
pub mod format;
pub mod generate;
pub mod lexer;
pub mod op;
pub mod parser;
pub mod persist;
pub mod rewrite;
pub mod tree;

use error::InnerError;
use lexer::Lexer;
use parser::Parser;

pub use arena::{Arena, ArenaId};
pub use engine::{DEFAULT_REWRITE_LIMIT, Engine, Options};
pub use error::Error;
pub use eval::error::EvalError;
pub use expr::Expression;
pub use flat::{FlatNode, PoolError, TerminalPool, flatten, rebuild};
pub use format::{Formatter, Style};
pub use generate::GenerateError;
pub use lexer::Options as LexerOptions;
pub use lexer::token::{Token, TokenKind};
pub use op::registry::Registry;
pub use op::{Const, Ephemeral, Function, Op, Operand, Program, Var};
pub use persist::{PersistError, PersistValue, Persisted, PersistedTree};
pub use range::{Position, Range};
pub use rewrite::error::RuleError;
pub use rewrite::rule::RewriteRule;
pub use rewrite::simplify::{ConstFolder, Simplifier};
pub use rewrite::{Rewriter, RuleSet};
pub use tree::{NodeId, Tree, error::TreeError, text::TreeFormat};

pub type GpxResult = Result<f64, Error>;

/// Deepest nesting the parser and the evaluator accept.
pub const MAX_DEPTH: usize = 128;

/// Parses `code` into a validated operation tree with re-indexed variables.
#[allow(clippy::result_large_err)]
pub fn parse(code: &str, registry: &Registry<f64>) -> Result<Tree<Op<f64>>, Error> {
    let tokens = tokenize(code, LexerOptions::default(), registry)?;

    let mut tree = Parser::new(tokens.iter(), registry)
        .parse()
        .map_err(|e| Error::from_error(code, InnerError::Parse(e)))?;

    parser::reindex(&mut tree);
    eval::validate(&tree).map_err(|e| Error::from_error(code, InnerError::Eval(e)))?;

    tracing::debug!(size = tree.len(), "parsed expression");
    Ok(tree)
}

#[allow(clippy::result_large_err)]
pub fn tokenize(
    code: &str,
    options: LexerOptions,
    registry: &Registry<f64>,
) -> Result<Vec<Token>, Error> {
    Lexer::new(options)
        .tokenize(code, registry)
        .map_err(|e| Error::from_error(code, InnerError::Lexer(e)))
}

/// Compiles a `<lhs> -> <rhs>` rewrite rule.
#[allow(clippy::result_large_err)]
pub fn compile_rule(rule: &str, registry: &Registry<f64>) -> Result<RewriteRule, Error> {
    RewriteRule::compile_with(rule, registry).map_err(|e| Error::from_error(rule, InnerError::Rule(e)))
}

/// Parses `code` with the arithmetic functions and evaluates it.
#[allow(clippy::result_large_err)]
pub fn eval(code: &str, args: &[f64]) -> GpxResult {
    Expression::parse(code)?
        .eval(args)
        .map_err(|e| Error::from_error(code, InnerError::Eval(e)))
}
