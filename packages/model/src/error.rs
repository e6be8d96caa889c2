use crate::node::NodeId;
use thiserror::Error;

pub type TreeResult<T> = Result<T, TreeError>;

/// Structural failures of tree operations and invariant checks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("A {parent} node cannot contain a {child} node")]
    InvalidChild {
        parent: &'static str,
        child: &'static str,
    },

    #[error("The root node cannot be removed or replaced")]
    RootImmutable,

    #[error("Cannot replace a {from} node with a {to} node")]
    IncompatibleReplace {
        from: &'static str,
        to: &'static str,
    },

    #[error("Node {0} is not reachable from the root")]
    Orphan(NodeId),

    #[error("Node {node} lists {listed} as parent but is a child of {actual}")]
    ParentMismatch {
        node: NodeId,
        listed: String,
        actual: NodeId,
    },

    #[error("Root has no children")]
    EmptyRoot,

    #[error("Offset {offset} is out of range for {node}")]
    OffsetOutOfRange { node: NodeId, offset: usize },

    #[error("Node {0} does not carry text")]
    NotText(NodeId),
}

impl TreeError {
    pub fn invalid_child(parent: &'static str, child: &'static str) -> Self {
        Self::InvalidChild { parent, child }
    }
}

/// Failure to encode a document
#[derive(Error, Debug)]
pub enum SerializeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
