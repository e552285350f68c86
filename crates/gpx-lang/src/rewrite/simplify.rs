use smallvec::SmallVec;

use super::Rewriter;
use crate::{
    op::{
        Function, Op, Operand,
        math::{ADD, DIV, MUL, POW, SUB},
        registry::Registry,
    },
    tree::{NodeId, Tree},
};

/// Replaces a function node whose children are all constants by the constant
/// it evaluates to.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstFolder;

impl ConstFolder {
    fn fold<T: Operand>(tree: &Tree<Op<T>>, id: NodeId) -> Option<T> {
        let Op::Function(function) = tree.value(id) else {
            return None;
        };

        let children = tree.children(id);
        if children.is_empty() {
            return None;
        }

        let args = children
            .iter()
            .map(|child| match tree.value(*child) {
                Op::Const(c) => Some(c.value().clone()),
                _ => None,
            })
            .collect::<Option<SmallVec<[T; 4]>>>()?;

        function.apply(&args).ok()
    }
}

impl<T: Operand> Rewriter<T> for ConstFolder {
    fn step(&self, tree: &mut Tree<Op<T>>) -> bool {
        let found = tree
            .preorder(tree.root())
            .find_map(|id| Self::fold(tree, id).map(|value| (id, value)));

        match found {
            Some((id, value)) => {
                tracing::debug!(rule = "fold", node = %tree.value(id), "rewrite");
                tree.replace(id, Tree::new(Op::constant(value)));
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Arg {
    Const(f64),
    Child(usize),
}

#[derive(Debug, Clone)]
enum Replacement {
    Const(f64),
    Child(usize),
    Call(Function<f64>, [Arg; 2]),
}

/// The built-in algebraic simplifier.
///
/// At every node, in pre-order, tries in turn: `x-x → 0`, `x+x → 2*x`,
/// `x-0 → x`, `x+0 → x`, `0+x → x`, `x/x → 1`, `x*0 → 0`, `0*x → 0`,
/// `x*1 → x`, `1*x → x`, `x*x → x^2`, `x^0 → 1`, `x^1 → x` and finally
/// constant folding. Operations are recognized by name, so `x` may be any
/// subtree and two operands are the same when they are structurally equal.
#[derive(Debug, Clone)]
pub struct Simplifier {
    multiply: Option<Function<f64>>,
    power: Option<Function<f64>>,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new(&Registry::math())
    }
}

impl Simplifier {
    /// Rewrites producing `mul` or `pow` are skipped when `registry` lacks
    /// them.
    pub fn new(registry: &Registry<f64>) -> Self {
        Self {
            multiply: registry.function(MUL).cloned(),
            power: registry.function(POW).cloned(),
        }
    }

    fn identity(&self, tree: &Tree<Op<f64>>, id: NodeId) -> Option<(&'static str, Replacement)> {
        if let Op::Function(function) = tree.value(id)
            && let &[left, right] = tree.children(id)
        {
            let same = tree.subtree_eq(left, tree, right);
            let is = |node: NodeId, expected: f64| matches!(tree.value(node), Op::Const(c) if *c.value() == expected);

            let found = match function.name() {
                SUB => same
                    .then_some(("x-x", Replacement::Const(0.0)))
                    .or_else(|| is(right, 0.0).then_some(("x-0", Replacement::Child(0)))),
                ADD => same
                    .then(|| self.multiply.clone())
                    .flatten()
                    .map(|mul| ("x+x", Replacement::Call(mul, [Arg::Const(2.0), Arg::Child(0)])))
                    .or_else(|| is(right, 0.0).then_some(("x+0", Replacement::Child(0))))
                    .or_else(|| is(left, 0.0).then_some(("0+x", Replacement::Child(1)))),
                DIV => same.then_some(("x/x", Replacement::Const(1.0))),
                MUL => is(right, 0.0)
                    .then_some(("x*0", Replacement::Const(0.0)))
                    .or_else(|| is(left, 0.0).then_some(("0*x", Replacement::Const(0.0))))
                    .or_else(|| is(right, 1.0).then_some(("x*1", Replacement::Child(0))))
                    .or_else(|| is(left, 1.0).then_some(("1*x", Replacement::Child(1))))
                    .or_else(|| {
                        same.then(|| self.power.clone())
                            .flatten()
                            .map(|pow| ("x*x", Replacement::Call(pow, [Arg::Child(0), Arg::Const(2.0)])))
                    }),
                POW => is(right, 0.0)
                    .then_some(("x^0", Replacement::Const(1.0)))
                    .or_else(|| is(right, 1.0).then_some(("x^1", Replacement::Child(0)))),
                _ => None,
            };

            if found.is_some() {
                return found;
            }
        }

        ConstFolder::fold(tree, id).map(|value| ("fold", Replacement::Const(value)))
    }

    fn apply(tree: &mut Tree<Op<f64>>, id: NodeId, replacement: Replacement) -> bool {
        let replacement = match replacement {
            Replacement::Const(value) => Tree::new(Op::constant(value)),
            Replacement::Child(index) => match tree.remove(id, index) {
                Ok(child) => child,
                Err(_) => return false,
            },
            Replacement::Call(function, args) => {
                let mut call = Tree::new(Op::Function(function));
                let root = call.root();
                for arg in args {
                    let arg = match arg {
                        Arg::Const(value) => Tree::new(Op::constant(value)),
                        Arg::Child(index) => match tree.child(id, index) {
                            Ok(child) => tree.subtree_with(child, Op::duplicate),
                            Err(_) => return false,
                        },
                    };
                    call.append(root, arg);
                }
                call
            }
        };

        tree.replace(id, replacement);
        true
    }
}

impl Rewriter<f64> for Simplifier {
    fn step(&self, tree: &mut Tree<Op<f64>>) -> bool {
        let found = tree
            .preorder(tree.root())
            .find_map(|id| self.identity(tree, id).map(|(rule, replacement)| (id, rule, replacement)));

        let Some((id, rule, replacement)) = found else {
            return false;
        };

        tracing::debug!(rule, node = %tree.value(id), "rewrite");
        Self::apply(tree, id, replacement)
    }
}
