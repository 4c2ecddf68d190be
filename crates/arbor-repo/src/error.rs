//! Error types for repository operations.

use arbor_props::PropertyError;
use arbor_types::{TypeError, UserId};
use thiserror::Error;

/// Errors returned by a [`ResourcePort`](crate::ResourcePort).
#[derive(Debug, Error)]
pub enum RepoError {
    /// No resource (or no resource passing the filter) at the given path or id.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The path is locked by another user.
    #[error("resource locked: {path} (owner {owner})")]
    Locked { path: String, owner: UserId },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("property error: {0}")]
    Property(#[from] PropertyError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// An internal lock was poisoned by a panicking writer.
    #[error("repository state poisoned: {0}")]
    Poisoned(String),
}

/// Convenience type alias for repository operations.
pub type RepoResult<T> = std::result::Result<T, RepoError>;
