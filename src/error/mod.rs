use thiserror::Error;

/// Errors raised by the service clients and the layers built on them.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error talking to {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} {status_text}: {body}")]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("unauthorized (HTTP 401), sign in again")]
    Unauthorized,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("no playable media source for item {0}")]
    NoMediaSource(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// HTTP status carried by the error, `0` when the request never got one.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Http { status, .. } => *status,
            ApiError::Unauthorized => 401,
            _ => 0,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::InvalidInput(format!("bad URL: {}", err))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
