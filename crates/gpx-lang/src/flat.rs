//! Breadth-first linear form of a tree, as used by recombination operators.
//!
//! Node `i` of a flattened sequence keeps its children at
//! `child_offset .. child_offset + child_count`. Sequences spliced together
//! from different trees are turned back into trees with [`rebuild`], which
//! fills every missing child with a random terminal.
use std::collections::VecDeque;

use rand::Rng;
use smol_str::SmolStr;
use thiserror::Error;

use crate::{
    op::{Op, Operand},
    tree::Tree,
};

/// One node of a flattened tree.
///
/// A flat sequence carries the genetic material of one tree instance, so
/// copies of a node keep the value of a resolved ephemeral.
#[derive(Debug, PartialEq)]
pub struct FlatNode<V> {
    pub value: V,
    pub child_count: usize,
    /// Index of the first child; `None` for leaves.
    pub child_offset: Option<usize>,
}

impl<T: Operand> Clone for FlatNode<Op<T>> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.duplicate(),
            child_count: self.child_count,
            child_offset: self.child_offset,
        }
    }
}

/// Lists the nodes of `tree` in breadth-first order.
pub fn flatten<T: Operand>(tree: &Tree<Op<T>>) -> Vec<FlatNode<Op<T>>> {
    let mut offset = 1;

    tree.breadth_first(tree.root())
        .map(|id| {
            let child_count = tree.child_count(id);
            let child_offset = (child_count > 0).then_some(offset);
            offset += child_count;

            FlatNode {
                value: tree.value(id).duplicate(),
                child_count,
                child_offset,
            }
        })
        .collect()
}

/// Child offsets of `seq` recomputed from the arities of its operations,
/// ignoring the stored `child_offset` column.
pub fn offsets<T: Operand>(seq: &[FlatNode<Op<T>>]) -> Vec<Option<usize>> {
    let mut offset = 1;

    seq.iter()
        .map(|node| {
            let arity = node.value.arity();
            let child_offset = (arity > 0).then_some(offset);
            offset += arity;
            child_offset
        })
        .collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Terminal pool is empty")]
    Empty,
    #[error("Operation `{name}` with arity {arity} is not a terminal")]
    NonTerminal { name: SmolStr, arity: usize },
}

/// Non-empty set of terminal operations to draw random leaves from.
#[derive(Debug, Clone)]
pub struct TerminalPool<T> {
    terminals: Vec<Op<T>>,
}

impl<T: Operand> TerminalPool<T> {
    pub fn new(terminals: impl IntoIterator<Item = Op<T>>) -> Result<Self, PoolError> {
        let terminals = terminals.into_iter().collect::<Vec<_>>();

        if terminals.is_empty() {
            return Err(PoolError::Empty);
        }

        if let Some(op) = terminals.iter().find(|op| !op.is_terminal()) {
            return Err(PoolError::NonTerminal {
                name: op.to_string().into(),
                arity: op.arity(),
            });
        }

        Ok(Self { terminals })
    }

    pub fn terminals(&self) -> &[Op<T>] {
        &self.terminals
    }

    /// A uniformly chosen terminal. Ephemeral terminals come back unresolved.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Op<T> {
        self.terminals[rng.gen_range(0..self.terminals.len())].clone()
    }
}

/// Rebuilds a tree from a possibly inconsistent flat sequence.
///
/// Children are looked up at the offsets recomputed by [`offsets`]; a child
/// whose position lies past the end of `seq` is replaced by a random terminal
/// from `terminals`. The result always satisfies the arity invariant, and an
/// empty sequence yields a single random terminal.
pub fn rebuild<T: Operand, R: Rng + ?Sized>(
    seq: &[FlatNode<Op<T>>],
    terminals: &TerminalPool<T>,
    rng: &mut R,
) -> Tree<Op<T>> {
    let Some(first) = seq.first() else {
        tracing::debug!("rebuilding empty sequence as a single terminal");
        return Tree::new(terminals.choose(rng));
    };

    let offsets = offsets(seq);
    let mut tree = Tree::new(first.value.duplicate());
    let mut queue = VecDeque::from([(0, tree.root())]);

    while let Some((index, id)) = queue.pop_front() {
        let Some(offset) = offsets[index] else {
            continue;
        };

        for position in offset..offset + tree.value(id).arity() {
            match seq.get(position) {
                Some(node) => {
                    let child = tree.push(id, node.value.duplicate());
                    queue.push_back((position, child));
                }
                None => {
                    tracing::debug!(position, len = seq.len(), "repairing missing child");
                    tree.push(id, terminals.choose(rng));
                }
            }
        }
    }

    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        eval,
        op::{Ephemeral, registry::Registry},
        parse,
    };
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::{fixture, rstest};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[fixture]
    fn pool() -> TerminalPool<f64> {
        TerminalPool::new([Op::var("x", 0), Op::constant(1.0)]).unwrap()
    }

    #[fixture]
    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn tree(code: &str) -> Tree<Op<f64>> {
        parse(code, &Registry::math()).unwrap()
    }

    #[test]
    fn test_flatten() {
        let flat = flatten(&tree("add(mul(x, 2), neg(y))"));

        let columns = flat
            .iter()
            .map(|node| (node.value.to_string(), node.child_count, node.child_offset))
            .collect::<Vec<_>>();

        assert_eq!(
            columns,
            vec![
                ("add".to_string(), 2, Some(1)),
                ("mul".to_string(), 2, Some(3)),
                ("neg".to_string(), 1, Some(5)),
                ("x".to_string(), 0, None),
                ("2.0".to_string(), 0, None),
                ("y".to_string(), 0, None),
            ]
        );
    }

    #[rstest]
    #[case("x")]
    #[case("add(mul(x, 2), neg(y))")]
    #[case("sin(x)^2 + cos(x)^2 - max(y, 1/z)")]
    fn test_rebuild_complete(#[case] code: &str, pool: TerminalPool<f64>, mut rng: StdRng) {
        let tree = tree(code);
        let flat = flatten(&tree);

        assert_eq!(
            offsets(&flat),
            flat.iter().map(|node| node.child_offset).collect::<Vec<_>>()
        );
        assert_eq!(rebuild(&flat, &pool, &mut rng), tree);
    }

    #[rstest]
    #[case::drop_leaves("add(mul(x, 2), neg(y))", 3)]
    #[case::root_only("add(mul(x, 2), neg(y))", 1)]
    #[case::deep("sin(cos(tan(x)))", 2)]
    fn test_rebuild_repairs_truncated(
        #[case] code: &str,
        #[case] len: usize,
        pool: TerminalPool<f64>,
        mut rng: StdRng,
    ) {
        let flat = flatten(&tree(code));
        let rebuilt = rebuild(&flat[..len], &pool, &mut rng);

        assert_eq!(eval::validate(&rebuilt), Ok(()));
        assert_eq!(rebuilt.root_value(), &flat[0].value);
        assert!(
            rebuilt
                .breadth_first(rebuilt.root())
                .skip(len)
                .all(|id| pool.terminals().contains(rebuilt.value(id)))
        );
    }

    #[rstest]
    fn test_rebuild_empty(pool: TerminalPool<f64>, mut rng: StdRng) {
        let rebuilt = rebuild(&[], &pool, &mut rng);
        assert_eq!(rebuilt.len(), 1);
        assert!(pool.terminals().contains(rebuilt.root_value()));
    }

    #[rstest]
    fn test_rebuild_spliced(pool: TerminalPool<f64>, mut rng: StdRng) {
        // root of one tree followed by the body of another
        let mut flat = flatten(&tree("x*y"));
        flat.truncate(1);
        flat.extend(flatten(&tree("sin(a) + b")));

        let rebuilt = rebuild(&flat, &pool, &mut rng);
        assert_eq!(eval::validate(&rebuilt), Ok(()));
        assert_eq!(rebuilt.len(), 6);
        assert!(rebuilt.to_string().starts_with("mul(add(b,a),sin("));
    }

    #[rstest]
    fn test_rebuild_keeps_resolved_ephemeral(pool: TerminalPool<f64>, mut rng: StdRng) {
        let draws = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&draws);
        let ephemeral = Ephemeral::of(move || (counter.fetch_add(1, Ordering::SeqCst) + 1) as f64);

        let mut tree = Tree::new(Op::Function(Registry::math().function("add").unwrap().clone()));
        let root = tree.root();
        tree.push(root, Op::Ephemeral(ephemeral));
        tree.push(root, Op::constant(10.0));
        assert_eq!(eval::eval(&tree, &[]), Ok(11.0));

        // splicing copies the nodes
        let seq = flatten(&tree).to_vec();
        let rebuilt = rebuild(&seq, &pool, &mut rng);

        assert_eq!(rebuilt, tree);
        assert_eq!(eval::eval(&rebuilt, &[]), Ok(11.0));
        assert_eq!(draws.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_errors() {
        assert_eq!(
            TerminalPool::<f64>::new([]).unwrap_err(),
            PoolError::Empty
        );

        let add = Op::Function(Registry::math().function("add").unwrap().clone());
        assert_eq!(
            TerminalPool::new([Op::constant(1.0), add]).unwrap_err(),
            PoolError::NonTerminal {
                name: "add".into(),
                arity: 2
            }
        );
    }
}
