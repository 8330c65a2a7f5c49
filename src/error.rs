use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid API key")]
    InvalidKey,

    #[error("{0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable error code shared by the HTTP body and the channel ack envelope.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Unauthorized => "UNAUTHORIZED",
            Error::InvalidKey => "INVALID_KEY",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::NotFound => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
