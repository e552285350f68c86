use std::{fmt, str::FromStr};

use itertools::Itertools;
use smol_str::SmolStr;

use crate::{
    Error, eval,
    eval::error::EvalError,
    format::{Style, format},
    op::{Op, registry::Registry, var_arity},
    rewrite::{Rewriter, simplify::Simplifier},
    tree::Tree,
};

/// A parsed, arity-checked arithmetic expression.
///
/// Variables are indexed by the sorted order of their names, so
/// `2*z + 3*x - y` takes its arguments as `[x, y, z]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    tree: Tree<Op<f64>>,
    arity: usize,
}

impl Expression {
    /// Parses `code` using the arithmetic functions and constants.
    #[allow(clippy::result_large_err)]
    pub fn parse(code: &str) -> Result<Self, Error> {
        Self::parse_with(code, &Registry::math())
    }

    #[allow(clippy::result_large_err)]
    pub fn parse_with(code: &str, registry: &Registry<f64>) -> Result<Self, Error> {
        let tree = crate::parse(code, registry)?;
        let arity = var_arity(&tree);
        Ok(Self { tree, arity })
    }

    /// Wraps an existing tree, which must satisfy the arity invariant.
    pub fn new(tree: Tree<Op<f64>>) -> Result<Self, EvalError> {
        eval::validate(&tree)?;
        let arity = var_arity(&tree);
        Ok(Self { tree, arity })
    }

    pub fn tree(&self) -> &Tree<Op<f64>> {
        &self.tree
    }

    pub fn into_tree(self) -> Tree<Op<f64>> {
        self.tree
    }

    /// Number of arguments [`Expression::eval`] needs.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Distinct variable names, ordered by index.
    pub fn vars(&self) -> Vec<SmolStr> {
        self.tree
            .values()
            .filter_map(|op| match op {
                Op::Var(var) => Some((var.index(), SmolStr::new(var.name()))),
                _ => None,
            })
            .sorted()
            .dedup()
            .map(|(_, name)| name)
            .collect()
    }

    /// Evaluates the expression. A negative zero result is returned as `0.0`.
    pub fn eval(&self, args: &[f64]) -> Result<f64, EvalError> {
        if args.len() < self.arity {
            return Err(EvalError::Argument {
                name: SmolStr::new_static("expression"),
                expected: self.arity,
                actual: args.len(),
            });
        }

        let value = eval::eval(&self.tree, args)?;
        Ok(if value == 0.0 { 0.0 } else { value })
    }

    /// Applies the built-in simplifier until nothing changes and returns the
    /// number of rewrites.
    pub fn simplify(&mut self) -> usize {
        self.rewrite(&Simplifier::default(), crate::DEFAULT_REWRITE_LIMIT)
    }

    pub fn simplified(mut self) -> Self {
        self.simplify();
        self
    }

    /// Rewrites the expression with `rewriter`, making at most `limit`
    /// rewrites.
    pub fn rewrite(&mut self, rewriter: &impl Rewriter<f64>, limit: usize) -> usize {
        let count = rewriter.rewrite(&mut self.tree, limit);
        self.arity = var_arity(&self.tree);
        count
    }

    pub fn format(&self, style: Style) -> String {
        format(&self.tree, style)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(Style::Bracketed))
    }
}

impl FromStr for Expression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Tree<Op<f64>>> for Expression {
    type Error = EvalError;

    fn try_from(tree: Tree<Op<f64>>) -> Result<Self, Self::Error> {
        Self::new(tree)
    }
}
