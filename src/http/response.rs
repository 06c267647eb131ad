//! Response helpers shared by handlers and middleware.
//!
//! # Responsibilities
//! - Carry handler-reported errors to the access log (`HandlerErrors`)
//! - Build the fixed JSON body returned for recovered faults
//!
//! Handlers attach errors as a response extension:
//! ```ignore
//! let mut errors = HandlerErrors::default();
//! errors.push("upstream cache unavailable");
//! (StatusCode::OK, Extension(errors), "stale").into_response()
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Errors a handler reports without failing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerErrors(Vec<String>);

impl HandlerErrors {
    pub fn push(&mut self, error: impl Into<String>) {
        self.0.push(error.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for HandlerErrors {
    fn from(errors: Vec<String>) -> Self {
        Self(errors)
    }
}

/// `500 {"error": "internal server error"}`.
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}
