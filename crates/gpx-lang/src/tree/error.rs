use thiserror::Error;

use super::NodeId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Child index {index} out of bounds, node has {len} children")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("Attaching node {child:?} below {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("Node {0:?} has no parent")]
    InvalidNode(NodeId),
    #[error("No node at child path {0:?}")]
    InvalidPath(Vec<usize>),
    #[error("Unexpected `{found}` at offset {offset} of the tree string")]
    UnexpectedChar { found: char, offset: usize },
    #[error("Tree string ends inside a node")]
    UnexpectedEnd,
}
