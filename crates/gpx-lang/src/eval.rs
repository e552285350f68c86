pub mod error;

use smallvec::SmallVec;
use smol_str::{SmolStr, ToSmolStr};

use crate::{
    op::{Op, Operand},
    tree::{NodeId, Tree},
};
use error::EvalError;

/// Anything that declares how many children its node must have.
pub trait Arity {
    fn arity(&self) -> usize;
    fn label(&self) -> SmolStr;
}

impl<T: Operand> Arity for Op<T> {
    fn arity(&self) -> usize {
        Op::arity(self)
    }

    fn label(&self) -> SmolStr {
        self.to_smolstr()
    }
}

/// Evaluates `tree` against `args`.
///
/// Terminals see the whole argument vector, every other node sees the
/// values of its children.
pub fn eval<T: Operand>(tree: &Tree<Op<T>>, args: &[T]) -> Result<T, EvalError> {
    eval_node(tree, tree.root(), args)
}

/// Evaluates the subtree rooted at `id`. Fails on subtrees nested deeper
/// than [`MAX_DEPTH`](crate::MAX_DEPTH).
pub fn eval_node<T: Operand>(tree: &Tree<Op<T>>, id: NodeId, args: &[T]) -> Result<T, EvalError> {
    eval_at(tree, id, args, 0)
}

fn eval_at<T: Operand>(tree: &Tree<Op<T>>, id: NodeId, args: &[T], depth: usize) -> Result<T, EvalError> {
    if depth > crate::MAX_DEPTH {
        return Err(EvalError::TooDeep(crate::MAX_DEPTH));
    }

    let op = tree.value(id);
    let children = tree.children(id);

    if children.len() != op.arity() {
        return Err(structure_error(tree, id));
    }

    if op.is_terminal() {
        return match op {
            Op::Function(function) => function.apply(&[]),
            op => op.apply(args),
        };
    }

    let values = children
        .iter()
        .map(|child| eval_at(tree, *child, args, depth + 1))
        .collect::<Result<SmallVec<[T; 4]>, _>>()?;

    op.apply(&values)
}

/// Checks that every node has as many children as its arity demands.
pub fn validate<N: Arity>(tree: &Tree<N>) -> Result<(), EvalError> {
    match tree
        .preorder(tree.root())
        .find(|id| tree.child_count(*id) != tree.value(*id).arity())
    {
        Some(id) => Err(structure_error(tree, id)),
        None => Ok(()),
    }
}

fn structure_error<N: Arity>(tree: &Tree<N>, id: NodeId) -> EvalError {
    let node = tree.value(id);
    EvalError::Structure {
        name: node.label(),
        arity: node.arity(),
        children: tree.child_count(id),
        path: tree.path(id),
    }
}
