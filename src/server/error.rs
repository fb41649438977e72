use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::normalize::{normalize_record_id, FieldError, FieldErrors};
use crate::persistence::StorageError;

/// Failure of a route handler, mapped onto an HTTP status.
#[derive(Debug, Error)]
pub enum ClinicError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The detail stays in the logs; clients only see the operation name.
    #[error("Failed to {operation}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
}

impl IntoResponse for ClinicError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, errors) = match self {
            ClinicError::Validation(errors) => (StatusCode::BAD_REQUEST, Some(errors)),
            ClinicError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
            ClinicError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ClinicError::Storage { operation, source } => {
                match source.upstream_status() {
                    Some(status) => error!(
                        "Failed to {} (upstream status {}): {}",
                        operation, status, source
                    ),
                    None => error!("Failed to {}: {}", operation, source),
                }
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };
        (status, Json(ErrorBody { message, errors })).into_response()
    }
}

impl From<JsonRejection> for ClinicError {
    fn from(rejection: JsonRejection) -> Self {
        ClinicError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ClinicError {
    fn from(rejection: QueryRejection) -> Self {
        ClinicError::BadRequest(rejection.body_text())
    }
}

impl ClinicError {
    pub fn storage(operation: &'static str, source: StorageError) -> Self {
        ClinicError::Storage { operation, source }
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        ClinicError::NotFound(format!("{} {} not found", what, id))
    }
}

/// Parses an identifier taken from the URL path.
pub fn path_id(field: &'static str, raw: &str) -> Result<i64, ClinicError> {
    normalize_record_id(raw)
        .map_err(|reason| ClinicError::Validation(vec![FieldError::new(field, reason)]))
}
