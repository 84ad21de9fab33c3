use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiaryError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("attack store unavailable")]
    StoreUnavailable,

    #[error("store error: {0}")]
    Store(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("geolocation error: {0}")]
    Geo(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ApiaryResult<T> = Result<T, ApiaryError>;
