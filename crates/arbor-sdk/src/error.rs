use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("type error: {0}")]
    Type(#[from] arbor_types::TypeError),

    #[error("property error: {0}")]
    Property(#[from] arbor_props::PropertyError),

    #[error("repository error: {0}")]
    Repository(#[from] arbor_repo::RepoError),

    #[error("rewrite error: {0}")]
    Rewrite(#[from] arbor_rewrite::RewriteError),
}

pub type SdkResult<T> = Result<T, SdkError>;
