//! Error types for the editor

use scribe_model::{NodeId, SerializeError, TreeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Serialize error: {0}")]
    Serialize(#[from] SerializeError),

    #[error("Image decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Session has been torn down")]
    SessionClosed,
}

/// Failure to turn a pasted or uploaded file into an image source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("File is empty")]
    Empty,

    #[error("File is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Why a command left the document untouched
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoOpReason {
    #[error("No selection")]
    NoSelection,

    #[error("Selection no longer resolves to live nodes")]
    StaleSelection,

    #[error("Selection is collapsed")]
    NothingSelected,

    #[error("Selection is not inside a table")]
    NotInTable,

    #[error("Selection is not inside a link")]
    NotInLink,

    #[error("Already applied")]
    AlreadyApplied,

    #[error("URL is empty after normalization")]
    EmptyUrl,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Caret is not at a position that can hold {0}")]
    InvalidPosition(&'static str),

    #[error("Node not found: {0}")]
    UnknownNode(NodeId),

    #[error("Session has been torn down")]
    SessionClosed,

    #[error("Image could not be decoded: {0}")]
    DecodeFailed(DecodeError),

    #[error("Command failed and was rolled back: {0}")]
    RolledBack(String),
}
