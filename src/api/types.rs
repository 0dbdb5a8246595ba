//! API request and response types.
//!
//! Query fields are kept as raw strings so that a missing or malformed
//! parameter reaches the handler. Query strings the extractor cannot
//! deserialize at all (such as a repeated key) are turned into a
//! `ReportError` by the handler.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ==================== Claims ====================

/// Query for issuers of a claim.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClaimIdQuery {
    /// ID of the claim.
    pub claim_id: Option<String>,
}

/// Query for action claims since a moment.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SinceQuery {
    /// RFC 3339 datetime or `YYYY-MM-DD`; all actions when absent.
    pub date: Option<String>,
}

// ==================== Tenure ====================

/// A geographic point.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PointQuery {
    /// Latitude in decimal degrees.
    pub lat: Option<String>,
    /// Longitude in decimal degrees.
    pub lon: Option<String>,
}

// ==================== Org roles ====================

/// Organization, role and the date the role must be held on.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrgRoleQuery {
    pub org_name: Option<String>,
    pub role_name: Option<String>,
    /// `YYYY-MM-DD`.
    pub on_date: Option<String>,
}

// ==================== Visibility ====================

/// Consent to be visible to everyone.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MakeVisibleRequest {
    /// Where others can learn more about the caller.
    #[serde(default)]
    pub url: Option<String>,
}

/// Acknowledgement of a completed registration.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

// ==================== Health ====================

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}
