use std::fmt::{self, Display};

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::{SmolStr, ToSmolStr};

use crate::{
    eval::Arity,
    op::{Op, Operand},
    parser::ParseNode,
    tree::{NodeId, Tree},
};

/// A pattern node: either a concrete operation or a variable matching any
/// subtree.
#[derive(Debug, Clone)]
pub enum Decl<T> {
    Val(Op<T>),
    Var(SmolStr),
}

impl<T: Operand> PartialEq for Decl<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Decl::Val(a), Decl::Val(b)) => a == b,
            (Decl::Var(a), Decl::Var(b)) => a == b,
            _ => false,
        }
    }
}

impl ParseNode for Decl<f64> {
    fn from_op(op: Op<f64>) -> Self {
        Decl::Val(op)
    }

    fn from_pattern_var(name: &SmolStr) -> Option<Self> {
        Some(Decl::Var(name.clone()))
    }
}

impl<T: Operand> Arity for Decl<T> {
    fn arity(&self) -> usize {
        match self {
            Decl::Val(op) => op.arity(),
            Decl::Var(_) => 0,
        }
    }

    fn label(&self) -> SmolStr {
        self.to_smolstr()
    }
}

impl<T: Operand> Display for Decl<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Val(op) => write!(f, "{}", op),
            Decl::Var(name) => write!(f, "<{}>", name),
        }
    }
}

/// Pattern variables bound to nodes of the matched tree.
pub type Bindings = FxHashMap<SmolStr, NodeId>;

#[derive(Debug, Clone)]
pub struct TreePattern<T> {
    tree: Tree<Decl<T>>,
}

impl<T: Operand> TreePattern<T> {
    pub fn new(tree: Tree<Decl<T>>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Tree<Decl<T>> {
        &self.tree
    }

    /// Names of the pattern variables.
    pub fn vars(&self) -> FxHashSet<SmolStr> {
        self.tree
            .values()
            .filter_map(|decl| match decl {
                Decl::Var(name) => Some(name.clone()),
                Decl::Val(_) => None,
            })
            .collect()
    }

    /// Unifies the pattern with the subtree of `tree` at `id`. A variable
    /// occurring more than once must bind structurally equal subtrees.
    pub fn matches(&self, tree: &Tree<Op<T>>, id: NodeId) -> Option<Bindings> {
        let mut bindings = Bindings::default();
        let mut stack = vec![(self.tree.root(), id)];

        while let Some((decl_id, node)) = stack.pop() {
            match self.tree.value(decl_id) {
                Decl::Var(name) => match bindings.get(name) {
                    Some(bound) if !tree.subtree_eq(*bound, tree, node) => return None,
                    Some(_) => {}
                    None => {
                        bindings.insert(name.clone(), node);
                    }
                },
                Decl::Val(op) => {
                    let (decls, children) = (self.tree.children(decl_id), tree.children(node));
                    if op != tree.value(node) || decls.len() != children.len() {
                        return None;
                    }
                    stack.extend(
                        decls
                            .iter()
                            .rev()
                            .copied()
                            .zip(children.iter().rev().copied()),
                    );
                }
            }
        }

        Some(bindings)
    }

    /// Builds the tree this pattern describes from `bindings` of a match at
    /// `anchor`, taking bound subtrees below `anchor` out of `tree`. A
    /// variable used more than once gets copies of its subtree.
    pub fn expand(
        &self,
        tree: &mut Tree<Op<T>>,
        anchor: NodeId,
        bindings: &Bindings,
    ) -> Option<Tree<Op<T>>> {
        let mut taken = FxHashMap::default();
        self.expand_node(self.tree.root(), tree, anchor, bindings, &mut taken)
    }

    fn expand_node(
        &self,
        decl_id: NodeId,
        tree: &mut Tree<Op<T>>,
        anchor: NodeId,
        bindings: &Bindings,
        taken: &mut FxHashMap<SmolStr, Tree<Op<T>>>,
    ) -> Option<Tree<Op<T>>> {
        match self.tree.value(decl_id) {
            Decl::Var(name) => {
                if let Some(subtree) = taken.get(name) {
                    return Some(subtree.map(Op::duplicate));
                }

                let node = *bindings.get(name)?;
                let subtree = if node == anchor || tree.is_root(node) {
                    tree.subtree_with(node, Op::duplicate)
                } else {
                    tree.detach(node).ok()?
                };
                taken.insert(name.clone(), subtree.map(Op::duplicate));
                Some(subtree)
            }
            Decl::Val(op) => {
                let mut result = Tree::new(op.clone());
                let root = result.root();
                for child in self.tree.children(decl_id) {
                    let child = self.expand_node(*child, tree, anchor, bindings, taken)?;
                    result.append(root, child);
                }
                Some(result)
            }
        }
    }
}

impl<T: Operand> Display for TreePattern<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tree)
    }
}
