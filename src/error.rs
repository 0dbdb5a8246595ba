//! Error types for the report service.
//!
//! Collaborators fail with [`ServiceError`]; handlers fail with
//! [`ReportError`], which always maps to a 500 carrying the error text.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failure reported by a collaborator (claim store, network graph, filter).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unknown claim ID: {0}")]
    UnknownClaim(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Unavailable(String),
}

/// Result type alias for collaborator calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error surfaced by a report handler.
///
/// Every kind is answered with 500; the status code does not distinguish
/// caller mistakes from downstream failures.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Downstream(#[from] ServiceError),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Downstream call timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl ReportError {
    /// Body sent to the caller: the JSON string form of the error.
    pub fn body(&self) -> String {
        format!("Error: {}", self)
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.body())).into_response()
    }
}

/// Result type alias for report handlers.
pub type ReportResult<T> = Result<T, ReportError>;
