//! Graph error types.

use thiserror::Error;

/// Errors reported by [`Graph`](crate::Graph) and [`GraphManager`](crate::GraphManager).
///
/// Every variant is also logged with `log::warn!` where it is detected; the
/// failing call leaves the graph untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph has invalid dimension {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },
    #[error("graph execution already in progress")]
    ExecutionInProgress,
    #[error("no graph bound to the manager")]
    NoGraph,
    #[error("graph type is not set")]
    NoGraphType,
}

/// Errors from material lookups through the instance cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    #[error("material library is not configured")]
    LibraryNotConfigured,
    #[error("material `{0}` not found in library")]
    MaterialNotFound(String),
}
