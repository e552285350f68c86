use std::collections::VecDeque;

use super::{NodeId, Tree};

/// Depth-first, parent before children.
pub struct PreOrder<'a, V> {
    tree: &'a Tree<V>,
    stack: Vec<NodeId>,
}

impl<'a, V> PreOrder<'a, V> {
    pub(crate) fn new(tree: &'a Tree<V>, start: NodeId) -> Self {
        Self {
            tree,
            stack: vec![start],
        }
    }
}

impl<V> Iterator for PreOrder<'_, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Depth-first, children before parent.
pub struct PostOrder<'a, V> {
    tree: &'a Tree<V>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, V> PostOrder<'a, V> {
    pub(crate) fn new(tree: &'a Tree<V>, start: NodeId) -> Self {
        Self {
            tree,
            stack: vec![(start, false)],
        }
    }
}

impl<V> Iterator for PostOrder<'_, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, expanded) = self.stack.pop()?;

            if expanded || self.tree.is_leaf(id) {
                return Some(id);
            }

            self.stack.push((id, true));
            self.stack
                .extend(self.tree.children(id).iter().rev().map(|child| (*child, false)));
        }
    }
}

/// Level by level, left to right.
pub struct BreadthFirst<'a, V> {
    tree: &'a Tree<V>,
    queue: VecDeque<NodeId>,
}

impl<'a, V> BreadthFirst<'a, V> {
    pub(crate) fn new(tree: &'a Tree<V>, start: NodeId) -> Self {
        Self {
            tree,
            queue: VecDeque::from([start]),
        }
    }
}

impl<V> Iterator for BreadthFirst<'_, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.tree.children(id).iter().copied());
        Some(id)
    }
}

/// From a node up to the root, the node itself included.
pub struct Ancestors<'a, V> {
    tree: &'a Tree<V>,
    next: Option<NodeId>,
}

impl<'a, V> Ancestors<'a, V> {
    pub(crate) fn new(tree: &'a Tree<V>, start: NodeId) -> Self {
        Self {
            tree,
            next: Some(start),
        }
    }
}

impl<V> Iterator for Ancestors<'_, V> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.parent(id);
        Some(id)
    }
}

/// From the root down to a node.
pub struct PathFromRoot {
    path: std::iter::Rev<std::vec::IntoIter<NodeId>>,
}

impl PathFromRoot {
    pub(crate) fn new<V>(tree: &Tree<V>, end: NodeId) -> Self {
        Self {
            path: Ancestors::new(tree, end).collect::<Vec<_>>().into_iter().rev(),
        }
    }
}

impl Iterator for PathFromRoot {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.path.next()
    }
}
