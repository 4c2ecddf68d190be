//! Error types for link rewriting.

use arbor_repo::RepoError;
use arbor_types::UserId;
use thiserror::Error;

/// Errors that abort a rewrite, or skip a single resource.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// A target lies inside its own source; copying would nest forever.
    #[error("target {target_path} lies inside its source {source_path}")]
    DependentTarget {
        source_path: String,
        target_path: String,
    },

    /// The target root is locked by another user.
    #[error("target {path} is locked by {}", display_owner(.owner))]
    LockConflict { path: String, owner: Option<UserId> },

    /// The configured default encoding has no known label.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Content bytes are not valid in the resolved encoding.
    #[error("content of {path} is not valid {encoding}")]
    Malformed { path: String, encoding: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("repository error: {0}")]
    Repository(#[from] RepoError),
}

impl RewriteError {
    /// Lift repository lock failures into [`RewriteError::LockConflict`].
    pub(crate) fn from_lock(error: RepoError) -> Self {
        match error {
            RepoError::Locked { path, owner } => RewriteError::LockConflict {
                path,
                owner: Some(owner),
            },
            other => RewriteError::Repository(other),
        }
    }
}

fn display_owner(owner: &Option<UserId>) -> String {
    owner.map_or_else(|| "another user".to_string(), |o| o.to_string())
}

/// Convenience type alias for rewrite operations.
pub type RewriteResult<T> = std::result::Result<T, RewriteError>;
