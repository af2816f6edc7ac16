//! API error types with HTTP response mapping.

use application::{AppError, ErrorKind};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::response::Envelope;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// A use case failed.
    App(AppError),
    /// The request body, path or query could not be parsed or is out of range.
    Validation(String),
    /// No usable bearer token was supplied.
    Unauthorized,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::App(err) => {
                let kind = err.kind();
                (status_for(kind), kind.as_str(), err.to_string())
            }
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                msg.clone(),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ErrorKind::InvalidCredentials.as_str(),
                "Not authenticated".to_string(),
            ),
        }
    }
}

/// Status code for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::PermissionDenied | ErrorKind::Inactive => StatusCode::FORBIDDEN,
        ErrorKind::InsufficientStock => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidDomain => StatusCode::BAD_REQUEST,
        ErrorKind::ConcurrentModification | ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::InvalidCredentials => StatusCode::UNAUTHORIZED,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %message, "internal server error");
            "Internal server error".to_string()
        } else {
            tracing::debug!(%code, error = %message, "request failed");
            message
        };
        metrics::counter!("http_errors_total", "code" => code).increment(1);

        let mut response = (status, axum::Json(Envelope::error(code, message))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError::App(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
