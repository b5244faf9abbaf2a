//! Mapping from core errors to HTTP responses.

use api_shared::ErrorRes;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use curasphere_core::{HospitalError, HospitalResult};
use tokio::task::JoinError;

/// A failed request, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub enum ApiError {
    Core(HospitalError),
    /// A blocking task panicked or was cancelled.
    Task(JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let ApiError::Core(err) = self else {
            return StatusCode::INTERNAL_SERVER_ERROR;
        };
        match err {
            HospitalError::DuplicateIdentity(_)
            | HospitalError::Validation(_)
            | HospitalError::InvalidOrExpiredCode => StatusCode::BAD_REQUEST,
            HospitalError::InvalidCredentials | HospitalError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            HospitalError::Forbidden(_) => StatusCode::FORBIDDEN,
            HospitalError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<HospitalError> for ApiError {
    fn from(err: HospitalError) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            ApiError::Core(err) if status != StatusCode::INTERNAL_SERVER_ERROR => err.to_string(),
            other => {
                tracing::error!("Request failed: {:?}", other);
                "Internal error".to_string()
            }
        };
        (status, Json(ErrorRes { detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Run a core call on the blocking pool. Used for password hashing, which is CPU-bound.
pub async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> HospitalResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(ApiError::Task)?
        .map_err(ApiError::Core)
}
