use models::errors::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// The document store could not be reached or refused the call.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Stored data no longer matches the model.
    #[error("model error: {0}")]
    Model(ModelError),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self {
        Self::NotFound(format!("{} not found", entity))
    }
}

impl From<ModelError> for ServiceError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::NotFound(msg) => Self::NotFound(msg),
            ModelError::Validation(msg) => Self::Validation(msg),
            ModelError::Store(store) => Self::Unavailable(store.to_string()),
            schema @ ModelError::Schema(_) => Self::Model(schema),
        }
    }
}
