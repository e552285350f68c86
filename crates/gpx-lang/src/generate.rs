use std::mem;

use rand::Rng;
use smol_str::SmolStr;
use thiserror::Error;

use crate::{
    eval::error::EvalError,
    flat::{PoolError, TerminalPool},
    op::{Op, Operand, Program},
    tree::Tree,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerateError {
    #[error("Operation pool is empty")]
    EmptyOperations,
    #[error("Operation pool contains the terminal `{0}`")]
    TerminalOperation(SmolStr),
    #[error(transparent)]
    Terminals(#[from] PoolError),
    #[error(transparent)]
    Structure(#[from] EvalError),
}

/// Generates a random tree of exactly `depth` levels below the root using
/// the "full" method.
///
/// Every node above the last level is drawn from `operations`, every node
/// on it from `terminals`. A depth of 0 yields a single terminal. Levels are
/// filled one at a time, so nodes are created in breadth-first order.
pub fn full<T: Operand, R: Rng + ?Sized>(
    depth: usize,
    operations: &[Op<T>],
    terminals: &[Op<T>],
    rng: &mut R,
) -> Result<Tree<Op<T>>, GenerateError> {
    if operations.is_empty() {
        return Err(GenerateError::EmptyOperations);
    }
    if let Some(op) = operations.iter().find(|op| op.is_terminal()) {
        return Err(GenerateError::TerminalOperation(op.to_string().into()));
    }
    let terminals = TerminalPool::new(terminals.iter().cloned())?;

    if depth == 0 {
        return Ok(Tree::new(terminals.choose(rng)));
    }

    let mut tree = Tree::new(choose(operations, rng));
    let mut current = vec![tree.root()];
    let mut next = Vec::new();

    for level in 1..=depth {
        for parent in current.drain(..) {
            for _ in 0..tree.value(parent).arity() {
                let op = if level == depth {
                    terminals.choose(rng)
                } else {
                    choose(operations, rng)
                };
                next.push(tree.push(parent, op));
            }
        }
        mem::swap(&mut current, &mut next);
    }

    tracing::debug!(depth, size = tree.len(), "generated tree");
    Ok(tree)
}

fn choose<T: Operand, R: Rng + ?Sized>(ops: &[Op<T>], rng: &mut R) -> Op<T> {
    ops[rng.gen_range(0..ops.len())].clone()
}

impl<T: Operand> Program<T> {
    /// A program whose body is a random [`full`] tree.
    pub fn generate<R: Rng + ?Sized>(
        name: impl Into<SmolStr>,
        depth: usize,
        operations: &[Op<T>],
        terminals: &[Op<T>],
        rng: &mut R,
    ) -> Result<Self, GenerateError> {
        let body = full(depth, operations, terminals, rng)?;
        Ok(Program::new(name, body)?)
    }
}
