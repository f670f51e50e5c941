//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Errors surfaced at the edges of the tree API.
///
/// Linkage, cleanup and traversal never fail; these only report
/// precondition violations and bad input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node no longer exists")]
    NodeDropped,

    #[error("unknown cleanup mode: {0}")]
    UnknownMode(String),

    #[error("unknown traversal order: {0}")]
    UnknownOrder(String),
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;
