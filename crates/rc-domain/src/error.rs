/// Shared error type used across all call-orchestrator crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("tenant unknown: {0}")]
    TenantUnknown(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("empty result: {0}")]
    Empty(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
