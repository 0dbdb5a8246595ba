//! Identity middleware for axum.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{issuer_of, PUSH_TOKEN_HEADER};
use crate::domain::{Did, TokenIssuer};

/// Error response for identity failures.
#[derive(Debug, Serialize)]
pub struct AuthError {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Where the caller identity comes from.
#[derive(Debug, Clone)]
pub enum IdentitySource {
    /// The issuer of the push token header.
    PushToken,
    /// A fixed identity, for development with identity checks disabled.
    Fixed(Did),
}

/// Attach the caller's [`TokenIssuer`] to the request.
///
/// Requests without a readable push token are rejected with 401.
pub async fn require_issuer(
    State(source): State<IdentitySource>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let issuer = match source {
        IdentitySource::Fixed(did) => did,
        IdentitySource::PushToken => {
            let token = request
                .headers()
                .get(PUSH_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| AuthError {
                    error: "Missing push token".to_string(),
                    code: "MISSING_TOKEN".to_string(),
                })?;

            issuer_of(token).map_err(|e| {
                tracing::debug!(error = %e, "Push token rejected");
                AuthError {
                    error: format!("Invalid push token: {}", e),
                    code: "INVALID_TOKEN".to_string(),
                }
            })?
        }
    };

    request.extensions_mut().insert(TokenIssuer(issuer));

    Ok(next.run(request).await)
}
