//! Push token payload decoding.

use base64::{engine::general_purpose, Engine};
use serde::Deserialize;
use thiserror::Error;

use crate::domain::Did;

/// Header carrying the caller's push token.
pub const PUSH_TOKEN_HEADER: &str = "Uport-Push-Token";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushTokenError {
    #[error("Token is not a compact JWT")]
    Malformed,

    #[error("Token payload is not valid base64")]
    Encoding,

    #[error("Token payload is not valid JSON")]
    Payload,

    #[error("Token has no issuer")]
    MissingIssuer,
}

#[derive(Debug, Deserialize)]
struct PushTokenPayload {
    #[serde(default)]
    iss: Option<String>,
}

/// Read the issuer DID from a compact JWT without checking its signature.
pub fn issuer_of(token: &str) -> Result<Did, PushTokenError> {
    let mut segments = token.trim().split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
        _ => return Err(PushTokenError::Malformed),
    };

    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| PushTokenError::Encoding)?;
    let payload: PushTokenPayload =
        serde_json::from_slice(&bytes).map_err(|_| PushTokenError::Payload)?;

    payload
        .iss
        .filter(|iss| !iss.is_empty())
        .map(Did::new)
        .ok_or(PushTokenError::MissingIssuer)
}

/// Build an unsigned compact token for the given payload.
#[cfg(test)]
pub fn unsigned_token(payload: &serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"ES256K"}"#);
    let body = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}
