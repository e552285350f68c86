//! Fixpoint tree rewriting.
//!
//! A [`Rewriter`] performs one rewrite per [`Rewriter::step`], at the first
//! matching node in pre-order. [`Rewriter::rewrite`] keeps stepping, each
//! time rescanning from the root, until nothing matches or the limit is hit.
pub mod error;
pub mod pattern;
pub mod rule;
pub mod simplify;

use crate::{op::Op, tree::Tree};

pub trait Rewriter<T> {
    /// Applies a single rewrite. Returns `false` if no node matched.
    fn step(&self, tree: &mut Tree<Op<T>>) -> bool;

    /// Rewrites `tree` until it reaches a fixpoint or `limit` rewrites were
    /// made, and returns the number of rewrites.
    fn rewrite(&self, tree: &mut Tree<Op<T>>, limit: usize) -> usize {
        let mut count = 0;

        while count < limit && self.step(tree) {
            count += 1;
        }

        if count == limit && limit > 0 {
            tracing::debug!(limit, "rewrite limit reached");
        }

        count
    }
}

/// Rewriters tried in order; the first one that applies wins the step.
pub struct RuleSet<T> {
    rewriters: Vec<Box<dyn Rewriter<T> + Send + Sync>>,
}

impl<T> Default for RuleSet<T> {
    fn default() -> Self {
        Self {
            rewriters: Vec::new(),
        }
    }
}

impl<T> RuleSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rewriter: impl Rewriter<T> + Send + Sync + 'static) -> Self {
        self.push(rewriter);
        self
    }

    pub fn push(&mut self, rewriter: impl Rewriter<T> + Send + Sync + 'static) {
        self.rewriters.push(Box::new(rewriter));
    }

    /// Appends the rewriters of `other` after the ones of `self`.
    pub fn concat(mut self, other: RuleSet<T>) -> Self {
        self.rewriters.extend(other.rewriters);
        self
    }

    pub fn len(&self) -> usize {
        self.rewriters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewriters.is_empty()
    }
}

impl<T> Rewriter<T> for RuleSet<T> {
    fn step(&self, tree: &mut Tree<Op<T>>) -> bool {
        self.rewriters.iter().any(|rewriter| rewriter.step(tree))
    }
}

impl<T, R: Rewriter<T> + ?Sized> Rewriter<T> for Box<R> {
    fn step(&self, tree: &mut Tree<Op<T>>) -> bool {
        (**self).step(tree)
    }
}
