use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid resource name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A real id was required but the nil id was supplied.
    #[error("{field} must not be the nil id")]
    NilId { field: &'static str },

    #[error("unknown resource state code: {0}")]
    UnknownState(i32),

    #[error("unknown relation type: {0}")]
    UnknownRelationType(String),

    #[error("unknown project type code: {0}")]
    UnknownProjectType(i32),
}

/// Convenience type alias for type operations.
pub type Result<T> = std::result::Result<T, TypeError>;
