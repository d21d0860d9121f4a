//! Error types for the merge core

use thiserror::Error;

/// Precondition violations detected while merging partial extractions.
///
/// Dangling or incomplete relationships are not errors; they are dropped and
/// reported through [`crate::MergeDiagnostics`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("entity #{position} in chunk {chunk} has no name")]
    MissingEntityName { chunk: usize, position: usize },
}

/// Result type alias for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;
