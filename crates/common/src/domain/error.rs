use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("No API key found in request")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("The API key has been revoked")]
    RevokedApiKey,

    #[error("The API key has expired")]
    ExpiredApiKey,

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Produce error: {0}")]
    ProduceError(String),

    #[error("Log error: {0}")]
    LogError(String),

    #[error("Corrupt stream record: {0}")]
    CorruptRecord(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
