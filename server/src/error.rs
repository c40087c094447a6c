//! Mapping of ledger and request failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flight_surety_ledger::{ErrorKind, LedgerError};
use thiserror::Error;

use crate::models::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Ledger(err) => err.kind(),
            ApiError::Validation(_) => ErrorKind::Value,
            ApiError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::State | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Value => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let ApiError::Ledger(err) = &self {
            tracing::warn!(code = err.code(), kind = ?err.kind(), error = %err, "request rejected");
        }
        let body: ApiResponse<()> = ApiResponse::failure(self.to_string(), Some(self.kind()));
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
