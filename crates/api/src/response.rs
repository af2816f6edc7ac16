//! The JSON envelope every endpoint answers with.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// `{"code": ..., "message": ..., "result": ...}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub code: &'static str,
    pub message: Option<String>,
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            code: "OK",
            message: None,
            result: Some(result),
        }
    }
}

impl Envelope<()> {
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
            result: None,
        }
    }
}

/// A successful response: status plus enveloped payload.
pub struct ApiResponse<T> {
    status: StatusCode,
    body: Envelope<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(result: T) -> Self {
        Self {
            status: StatusCode::OK,
            body: Envelope::ok(result),
        }
    }

    pub fn created(result: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            body: Envelope::ok(result),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
