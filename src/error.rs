// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No cookie in the jar looks like a usable bearer token.
    #[error("Authentication token not found. Please log in to the job site.")]
    NoCredential,

    #[error("Token ...{0} is unauthorized.")]
    Unauthorized(String),

    #[error("Rate limited by API (429). Backing off.")]
    RateLimited,

    #[error("{0}")]
    GraphQl(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any non-success status other than 401/429. Aborts the whole call.
    #[error("API request failed with status: {0}")]
    HttpStatus(u16),

    #[error("All API tokens failed.")]
    AllCredentialsFailed,

    #[error("Original job not found for details: {0}")]
    JobNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cookie file error: {0}")]
    CookieFile(String),

    #[error("configuration error: {0}")]
    Config(String),
}
