use thiserror::Error;
use axum::http::StatusCode;

use crate::{
    db::error::StorageError,
    error::{ErrorMessage, HttpError},
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            ServiceError::Validation(message) => HttpError::new(message, status),

            // Storage details stay in the logs
            ServiceError::Storage(e) => {
                tracing::error!("Storage failure: {}", e);
                HttpError::new(ErrorMessage::ServerError.to_string(), status)
            }
        }
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
