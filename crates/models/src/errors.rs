use thiserror::Error;

/// Failures reported by a document store session.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected store response: {0}")]
    Decode(String),
    #[error("document rejected: {0}")]
    Rejected(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    /// A stored document no longer matches the record schema.
    #[error("schema mismatch: {0}")]
    Schema(String),
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl ModelError {
    pub fn not_found(key: &str) -> Self {
        Self::NotFound(format!("no record found with key: {key}"))
    }
}
