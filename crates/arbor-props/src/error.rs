//! Error types for property operations.

use thiserror::Error;

/// Errors that can occur during property operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// A mutator was called on a frozen property.
    #[error("property {name:?} is frozen")]
    Frozen { name: String },

    /// The property name is not valid.
    #[error("invalid property name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The backing source failed while looking up a value.
    #[error("property source error: {0}")]
    Source(String),
}

/// Convenience type alias for property operations.
pub type Result<T> = std::result::Result<T, PropertyError>;
