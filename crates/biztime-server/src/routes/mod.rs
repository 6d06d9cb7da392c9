pub mod companies;
pub mod industries;
pub mod invoices;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::db::DbError;

/// Failure raised by a route handler. Converting it into a response is the
/// only place a failed request gets its body written.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] DbError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Unwraps a JSON body. A request that sends no JSON content type is read
/// as an empty object, so field validation reports what is missing.
pub(crate) fn json_body<T: Default>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        Err(rejection) => Err(rejection.into()),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(message) | ApiError::NotFound(message) => {
                serde_json::json!({ "message": message })
            }
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                serde_json::json!({
                    "message": "Internal Server Error",
                    "error": e.to_string(),
                })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handler results.
pub type ApiResult<T> = Result<T, ApiError>;

/// Maps a store miss onto a 404 carrying `message`; other store failures
/// pass through as internal errors.
pub(crate) fn or_not_found(message: &'static str) -> impl FnOnce(DbError) -> ApiError {
    move |e| match e {
        DbError::NotFound => {
            tracing::debug!(reason = message, "lookup missed");
            ApiError::not_found(message)
        }
        other => ApiError::Internal(other),
    }
}

/// Handler for requests that match no route.
pub async fn fallback() -> ApiError {
    ApiError::not_found("Not Found")
}
