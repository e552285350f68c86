pub mod error;
pub mod iter;
pub mod text;

use std::fmt::{self, Display};

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::arena::{Arena, ArenaId};
use error::TreeError;
use iter::{Ancestors, BreadthFirst, PathFromRoot, PostOrder, PreOrder};
use text::TreeFormat;

/// Key type of tree node ids.
#[derive(Debug, Clone)]
pub enum Node {}

pub type NodeId = ArenaId<Node>;

type Children = SmallVec<[NodeId; 2]>;

#[derive(Debug, Clone)]
struct NodeData<V> {
    value: V,
    parent: Option<NodeId>,
    children: Children,
}

impl<V> NodeData<V> {
    fn new(value: V, parent: Option<NodeId>) -> Self {
        Self {
            value,
            parent,
            children: SmallVec::new(),
        }
    }
}

/// An ordered n-ary tree stored in an arena.
///
/// Nodes are addressed by [`NodeId`]. An id stays valid until the node it
/// names is removed from the tree; passing a stale id panics, the same way
/// indexing a slice out of range does. Every node except the root has
/// exactly one parent, so subtrees are never shared.
#[derive(Debug, Clone)]
pub struct Tree<V> {
    nodes: Arena<NodeData<V>, Node>,
    root: NodeId,
}

impl<V> Tree<V> {
    pub fn new(value: V) -> Self {
        let mut nodes = Arena::new(1);
        let root = nodes.alloc(NodeData::new(value, None));
        Self { nodes, root }
    }

    /// Creates a tree with `children` as single-node subtrees of the root.
    pub fn with_children(value: V, children: impl IntoIterator<Item = V>) -> Self {
        let mut tree = Self::new(value);
        let root = tree.root;
        for child in children {
            tree.push(root, child);
        }
        tree
    }

    #[inline(always)]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the whole tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn value(&self, id: NodeId) -> &V {
        &self.nodes[id].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut V {
        &mut self.nodes[id].value
    }

    pub fn root_value(&self) -> &V {
        self.value(self.root)
    }

    /// Replaces the value of `id`, returning the previous one.
    pub fn set_value(&mut self, id: NodeId, value: V) -> V {
        std::mem::replace(&mut self.nodes[id].value, value)
    }

    pub fn into_root_value(mut self) -> V {
        let root = self.root;
        match self.nodes.remove(root) {
            Some(data) => data.value,
            None => unreachable!(),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes[id].children.len()
    }

    pub fn child(&self, id: NodeId, index: usize) -> Result<NodeId, TreeError> {
        let children = self.children(id);
        children
            .get(index)
            .copied()
            .ok_or(TreeError::IndexOutOfBounds {
                index,
                len: children.len(),
            })
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Position of `id` among its parent's children.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        index
            .checked_sub(1)
            .map(|index| self.children(parent)[index])
    }

    /// Number of siblings of `id`, the node itself excluded.
    pub fn sibling_count(&self, id: NodeId) -> usize {
        self.parent(id)
            .map(|parent| self.child_count(parent) - 1)
            .unwrap_or(0)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.parent(id).is_none()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id].children.is_empty()
    }

    pub fn leaf_count(&self, id: NodeId) -> usize {
        self.preorder(id).filter(|node| self.is_leaf(*node)).count()
    }

    pub fn first_leaf(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(child) = self.first_child(node) {
            node = child;
        }
        node
    }

    pub fn last_leaf(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(child) = self.last_child(node) {
            node = child;
        }
        node
    }

    /// Number of nodes of the subtree rooted at `id`.
    pub fn size(&self, id: NodeId) -> usize {
        self.preorder(id).count()
    }

    /// Longest distance from `id` down to one of its leaves.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut stack = vec![(id, 0)];

        while let Some((node, level)) = stack.pop() {
            depth = depth.max(level);
            stack.extend(self.children(node).iter().map(|child| (*child, level + 1)));
        }

        depth
    }

    /// Distance from the root to `id`.
    pub fn level(&self, id: NodeId) -> usize {
        self.ancestors(id).count() - 1
    }

    /// Returns `true` if `ancestor` lies strictly above `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).skip(1).any(|node| node == ancestor)
    }

    /// Returns `true` if `descendant` lies strictly below `id`.
    pub fn is_descendant(&self, descendant: NodeId, id: NodeId) -> bool {
        self.is_ancestor(id, descendant)
    }

    /// The deepest node that is an ancestor-or-self of both `a` and `b`.
    pub fn shared_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let above_a: FxHashSet<NodeId> = self.ancestors(a).collect();
        self.ancestors(b).find(|node| above_a.contains(node))
    }

    pub fn is_related(&self, a: NodeId, b: NodeId) -> bool {
        self.shared_ancestor(a, b).is_some()
    }

    /// Appends a new leaf below `parent`.
    pub fn push(&mut self, parent: NodeId, value: V) -> NodeId {
        let id = self.nodes.alloc(NodeData::new(value, Some(parent)));
        self.nodes[parent].children.push(id);
        id
    }

    /// Moves `tree` into this tree as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, tree: Tree<V>) -> NodeId {
        let id = self.put(Some(parent), tree);
        self.nodes[parent].children.push(id);
        id
    }

    /// Moves `tree` into this tree as child `index` of `parent`.
    pub fn insert(&mut self, parent: NodeId, index: usize, tree: Tree<V>) -> Result<NodeId, TreeError> {
        let len = self.child_count(parent);
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }

        let id = self.put(Some(parent), tree);
        self.nodes[parent].children.insert(index, id);
        Ok(id)
    }

    /// Moves the existing node `child` to the end of `parent`'s children,
    /// detaching it from its previous parent first.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if parent == child || self.is_ancestor(child, parent) || self.is_root(child) {
            return Err(TreeError::Cycle { parent, child });
        }

        self.unlink(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    /// Removes the subtree rooted at `id` and returns it as its own tree.
    pub fn detach(&mut self, id: NodeId) -> Result<Tree<V>, TreeError> {
        if self.is_root(id) {
            return Err(TreeError::InvalidNode(id));
        }

        self.unlink(id);
        Ok(self.take(id))
    }

    /// Removes child `index` of `parent` together with its subtree.
    pub fn remove(&mut self, parent: NodeId, index: usize) -> Result<Tree<V>, TreeError> {
        let child = self.child(parent, index)?;
        self.detach(child)
    }

    /// Removes every child subtree of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Vec<Tree<V>> {
        let children = std::mem::take(&mut self.nodes[id].children);
        children.into_iter().map(|child| self.take(child)).collect()
    }

    /// Puts `tree` where the subtree rooted at `id` was and returns the
    /// replaced subtree. The replacement keeps the position of `id`, so it
    /// can be found again through the parent.
    pub fn replace(&mut self, id: NodeId, tree: Tree<V>) -> Tree<V> {
        match self.parent(id) {
            None => std::mem::replace(self, tree),
            Some(parent) => {
                let index = self.child_index(id).unwrap_or_default();
                let old = self.take(id);
                let new = self.put(Some(parent), tree);
                self.nodes[parent].children[index] = new;
                old
            }
        }
    }

    /// Child indexes leading from the root to `id`.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = self
            .ancestors(id)
            .filter_map(|node| self.child_index(node))
            .collect::<Vec<_>>();
        path.reverse();
        path
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |node, index| self.children(node).get(*index).copied())
    }

    pub fn replace_at_path(&mut self, path: &[usize], tree: Tree<V>) -> Result<Tree<V>, TreeError> {
        let id = self
            .node_at_path(path)
            .ok_or_else(|| TreeError::InvalidPath(path.to_vec()))?;
        Ok(self.replace(id, tree))
    }

    pub fn preorder(&self, id: NodeId) -> PreOrder<'_, V> {
        PreOrder::new(self, id)
    }

    pub fn postorder(&self, id: NodeId) -> PostOrder<'_, V> {
        PostOrder::new(self, id)
    }

    pub fn breadth_first(&self, id: NodeId) -> BreadthFirst<'_, V> {
        BreadthFirst::new(self, id)
    }

    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, V> {
        Ancestors::new(self, id)
    }

    pub fn path_from_root(&self, id: NodeId) -> PathFromRoot {
        PathFromRoot::new(self, id)
    }

    /// Node values in pre-order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.preorder(self.root).map(|id| self.value(id))
    }

    /// Maps every value into a tree of the same shape. Node ids carry over.
    pub fn map<U>(&self, mut f: impl FnMut(&V) -> U) -> Tree<U> {
        Tree {
            nodes: self.nodes.map(|data| NodeData {
                value: f(&data.value),
                parent: data.parent,
                children: data.children.clone(),
            }),
            root: self.root,
        }
    }

    pub fn try_map<U, E>(&self, mut f: impl FnMut(&V) -> Result<U, E>) -> Result<Tree<U>, E> {
        Ok(Tree {
            nodes: self.nodes.try_map(|data| {
                Ok(NodeData {
                    value: f(&data.value)?,
                    parent: data.parent,
                    children: data.children.clone(),
                })
            })?,
            root: self.root,
        })
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|child| *child != id);
        }
    }

    /// Moves the subtree at `id` out of the arena. The parent's child list
    /// is left untouched.
    fn take(&mut self, id: NodeId) -> Tree<V> {
        let mut nodes = Arena::new(0);
        let root = move_subtree(&mut self.nodes, id, &mut nodes, None);
        Tree { nodes, root }
    }

    /// Moves `tree` into the arena below `parent` without registering it in
    /// the parent's child list.
    fn put(&mut self, parent: Option<NodeId>, tree: Tree<V>) -> NodeId {
        let Tree { mut nodes, root } = tree;
        move_subtree(&mut nodes, root, &mut self.nodes, parent)
    }
}

impl<V> Tree<V> {
    /// Copy of the subtree rooted at `id`, with every value copied by `copy`.
    pub fn subtree_with(&self, id: NodeId, copy: impl FnMut(&V) -> V) -> Tree<V> {
        let mut nodes = Arena::new(self.size(id));
        let root = copy_subtree(&self.nodes, id, &mut nodes, None, copy);
        Tree { nodes, root }
    }

    /// Copies the subtree of `other` rooted at `node` below `parent`, with
    /// every value copied by `copy`.
    pub fn graft_with(
        &mut self,
        parent: NodeId,
        other: &Tree<V>,
        node: NodeId,
        copy: impl FnMut(&V) -> V,
    ) -> NodeId {
        let id = copy_subtree(&other.nodes, node, &mut self.nodes, Some(parent), copy);
        self.nodes[parent].children.push(id);
        id
    }
}

impl<V: Clone> Tree<V> {
    /// Deep copy of the subtree rooted at `id`.
    pub fn subtree(&self, id: NodeId) -> Tree<V> {
        self.subtree_with(id, V::clone)
    }

    /// Copies the subtree of `other` rooted at `node` below `parent`.
    pub fn graft(&mut self, parent: NodeId, other: &Tree<V>, node: NodeId) -> NodeId {
        self.graft_with(parent, other, node, V::clone)
    }
}

fn move_subtree<V>(
    from: &mut Arena<NodeData<V>, Node>,
    id: NodeId,
    to: &mut Arena<NodeData<V>, Node>,
    parent: Option<NodeId>,
) -> NodeId {
    transfer(id, to, parent, |node| match from.remove(node) {
        Some(data) => (data.value, data.children),
        None => panic!("node {:?} is not part of this tree", node),
    })
}

fn copy_subtree<V>(
    from: &Arena<NodeData<V>, Node>,
    id: NodeId,
    to: &mut Arena<NodeData<V>, Node>,
    parent: Option<NodeId>,
    mut copy: impl FnMut(&V) -> V,
) -> NodeId {
    transfer(id, to, parent, |node| {
        let data = &from[node];
        (copy(&data.value), data.children.clone())
    })
}

fn transfer<V>(
    id: NodeId,
    to: &mut Arena<NodeData<V>, Node>,
    parent: Option<NodeId>,
    mut source: impl FnMut(NodeId) -> (V, Children),
) -> NodeId {
    let (value, children) = source(id);
    let root = to.alloc(NodeData::new(value, parent));
    let mut stack = children
        .into_iter()
        .rev()
        .map(|child| (child, root))
        .collect::<Vec<_>>();

    while let Some((node, new_parent)) = stack.pop() {
        let (value, children) = source(node);
        let new_id = to.alloc(NodeData::new(value, Some(new_parent)));
        to[new_parent].children.push(new_id);
        stack.extend(children.into_iter().rev().map(|child| (child, new_id)));
    }

    root
}

impl<V: PartialEq> Tree<V> {
    /// Compares the subtree at `a` with the subtree of `other` at `b`,
    /// stopping at the first difference.
    pub fn subtree_eq(&self, a: NodeId, other: &Tree<V>, b: NodeId) -> bool {
        let mut stack = vec![(a, b)];

        while let Some((a, b)) = stack.pop() {
            let (a_children, b_children) = (self.children(a), other.children(b));
            if self.value(a) != other.value(b) || a_children.len() != b_children.len() {
                return false;
            }
            stack.extend(a_children.iter().copied().zip(b_children.iter().copied()));
        }

        true
    }
}

impl<V: PartialEq> PartialEq for Tree<V> {
    fn eq(&self, other: &Self) -> bool {
        self.subtree_eq(self.root, other, other.root)
    }
}

/// The parentheses form, e.g. `a(b(e,f),c)`, which [`Tree::parse`] reads back.
impl<V: Display> Display for Tree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(TreeFormat::Parentheses))
    }
}
