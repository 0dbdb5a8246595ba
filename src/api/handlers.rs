//! HTTP request handlers.
//!
//! Each report handler makes exactly one collaborator call and, unless noted,
//! passes the result through the response filter before it is serialized.

use std::future::Future;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{StatusCode, Uri},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};

use crate::api::types::*;
use crate::domain::{Did, TokenIssuer};
use crate::error::{ReportError, ReportResult, ServiceResult};
use crate::AppState;

// ==================== Helpers ====================

/// Await a collaborator call, bounded by the downstream timeout.
async fn downstream<T>(
    state: &AppState,
    call: impl Future<Output = ServiceResult<T>>,
) -> ReportResult<T> {
    tokio::time::timeout(state.downstream_timeout, call)
        .await
        .map_err(|_| ReportError::Timeout(state.downstream_timeout))?
        .map_err(ReportError::from)
}

/// Run a collaborator result through the response filter.
async fn filtered(state: &AppState, issuer: &Did, result: Value) -> ReportResult<Json<Value>> {
    let payload = downstream(state, state.filter.hide_dids_and_add_links(issuer, result)).await?;
    Ok(Json(payload))
}

/// Emit the single server-side record of a failed request.
fn logged(route: &'static str, err: ReportError) -> ReportError {
    tracing::error!(route, error = %err, "Report request failed");
    err
}

/// Unwrap the query extractor, keeping rejections on the 500 error path.
fn query_params<T>(extracted: Result<Query<T>, QueryRejection>) -> ReportResult<T> {
    extracted
        .map(|Query(query)| query)
        .map_err(|rejection| ReportError::InvalidQuery(rejection.body_text()))
}

/// A request without a JSON content type is treated as having no body.
fn json_body<T>(extracted: Result<Json<T>, JsonRejection>) -> ReportResult<Option<T>> {
    match extracted {
        Ok(Json(body)) => Ok(Some(body)),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(None),
        Err(rejection) => Err(ReportError::InvalidBody(rejection.body_text())),
    }
}

fn required(name: &'static str, value: Option<String>) -> ReportResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ReportError::MissingParameter(name))
}

fn coordinate(name: &'static str, value: Option<String>) -> ReportResult<f64> {
    let raw = required(name, value)?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(ReportError::InvalidParameter { name, value: raw })
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 datetime.
fn date(name: &'static str, value: Option<String>) -> ReportResult<NaiveDate> {
    let raw = required(name, value)?;
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .ok_or(ReportError::InvalidParameter { name, value: raw })
}

/// Optional lower bound; a bare date means midnight UTC.
fn since(value: Option<String>) -> ReportResult<Option<DateTime<Utc>>> {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
        .map(Some)
        .ok_or(ReportError::InvalidParameter {
            name: "date",
            value: raw,
        })
}

// ==================== Claims ====================

/// Issuers who made or confirmed the same claim.
///
/// GET /issuersWhoClaimedOrConfirmed
#[utoipa::path(
    get,
    path = "/issuersWhoClaimedOrConfirmed",
    params(ClaimIdQuery),
    responses(
        (status = 200, description = "`{\"result\": [issuer DIDs]}`, filtered for the caller"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn issuers_who_claimed_or_confirmed(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
    extracted: Result<Query<ClaimIdQuery>, QueryRejection>,
) -> ReportResult<Json<Value>> {
    let query = query_params(extracted)?;
    let claim_id = required("claimId", query.claim_id)?;
    let result = downstream(&state, state.claims.issuers_matching_claim(&claim_id)).await?;
    filtered(&state, &issuer, json!({ "result": result })).await
}

/// Action claims and their confirmations since a date.
///
/// GET /actionClaimsAndConfirmationsSince
#[utoipa::path(
    get,
    path = "/actionClaimsAndConfirmationsSince",
    params(SinceQuery),
    responses(
        (status = 200, description = "Action claims with their confirmations"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn action_claims_and_confirmations_since(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
    extracted: Result<Query<SinceQuery>, QueryRejection>,
) -> ReportResult<Json<Value>> {
    let query = query_params(extracted)?;
    let from = since(query.date)?;
    let result = downstream(&state, state.actions.claims_and_confirmations_since(from)).await?;
    filtered(&state, &issuer, result).await
}

// ==================== Tenure ====================

/// Tenure claims at a point (up to 50).
///
/// GET /tenureClaimsAtPoint
#[utoipa::path(
    get,
    path = "/tenureClaimsAtPoint",
    params(PointQuery),
    responses(
        (status = 200, description = "Claimed tenures, up to 50"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn tenure_claims_at_point(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
    extracted: Result<Query<PointQuery>, QueryRejection>,
) -> ReportResult<Json<Value>> {
    let query = query_params(extracted)?;
    let lat = coordinate("lat", query.lat)?;
    let lon = coordinate("lon", query.lon)?;
    let result = downstream(&state, state.tenure.tenure_at_point(lat, lon)).await?;
    filtered(&state, &issuer, result).await
}

/// Tenure claims with confirmations at a point (up to 50).
///
/// GET /tenureClaimsAndConfirmationsAtPoint
#[utoipa::path(
    get,
    path = "/tenureClaimsAndConfirmationsAtPoint",
    params(PointQuery),
    responses(
        (status = 200, description = "Claimed tenures with confirmations, up to 50"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn tenure_claims_and_confirmations_at_point(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
    extracted: Result<Query<PointQuery>, QueryRejection>,
) -> ReportResult<Json<Value>> {
    let query = query_params(extracted)?;
    let lat = coordinate("lat", query.lat)?;
    let lon = coordinate("lon", query.lon)?;
    let result = downstream(
        &state,
        state.tenure.tenure_claims_and_confirmations_at_point(lat, lon),
    )
    .await?;
    filtered(&state, &issuer, result).await
}

// ==================== Org roles ====================

/// Org-role claims and confirmations held on a date.
///
/// GET /orgRoleClaimsAndConfirmationsOnDate
#[utoipa::path(
    get,
    path = "/orgRoleClaimsAndConfirmationsOnDate",
    params(OrgRoleQuery),
    responses(
        (status = 200, description = "Org-role claims with confirmations"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn org_role_claims_and_confirmations_on_date(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
    extracted: Result<Query<OrgRoleQuery>, QueryRejection>,
) -> ReportResult<Json<Value>> {
    let query = query_params(extracted)?;
    let org_name = required("orgName", query.org_name)?;
    let role_name = required("roleName", query.role_name)?;
    let on_date = date("onDate", query.on_date)?;
    let result = downstream(
        &state,
        state
            .org_roles
            .claims_and_confirmations_on_date(&org_name, &role_name, on_date),
    )
    .await?;
    filtered(&state, &issuer, result).await
}

// ==================== Aggregates and visibility ====================

/// Vote tallies.
///
/// GET /voteCounts
#[utoipa::path(
    get,
    path = "/voteCounts",
    responses(
        (status = 200, description = "Vote counts per option"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn vote_counts(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
) -> ReportResult<Json<Value>> {
    async {
        let result = downstream(&state, state.votes.vote_counts()).await?;
        filtered(&state, &issuer, result).await
    }
    .await
    .map_err(|e| logged("voteCounts", e))
}

/// All globally visible DIDs.
///
/// GET /globallyVisibleDids
#[utoipa::path(
    get,
    path = "/globallyVisibleDids",
    responses(
        (status = 200, description = "Globally visible DIDs with their URLs"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn globally_visible_dids(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
) -> ReportResult<Json<Value>> {
    async {
        let result = downstream(&state, state.visibility.seen_by_all()).await?;
        filtered(&state, &issuer, result).await
    }
    .await
    .map_err(|e| logged("globallyVisibleDids", e))
}

/// Consent to make the caller's DID visible to everyone.
///
/// POST /makeMeGloballyVisible
#[utoipa::path(
    post,
    path = "/makeMeGloballyVisible",
    request_body = MakeVisibleRequest,
    responses(
        (status = 201, description = "Registered", body = SuccessResponse),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn make_me_globally_visible(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
    body: Result<Json<MakeVisibleRequest>, JsonRejection>,
) -> ReportResult<(StatusCode, Json<SuccessResponse>)> {
    async {
        let url = json_body(body)?.and_then(|request| request.url);
        let url = required("url", url)?;
        downstream(&state, state.visibility.make_globally_visible(&issuer, &url)).await?;
        Ok::<_, ReportError>((StatusCode::CREATED, Json(SuccessResponse { success: true })))
    }
    .await
    .map_err(|e| logged("makeMeGloballyVisible", e))
}

/// Every DID the caller can see. Returned unfiltered.
///
/// GET /whichDidsICanSee
#[utoipa::path(
    get,
    path = "/whichDidsICanSee",
    responses(
        (status = 200, description = "DIDs visible to the caller"),
        (status = 500, description = "Error message")
    ),
    security(("push_token" = [])),
    tag = "report"
)]
pub async fn which_dids_i_can_see(
    State(state): State<AppState>,
    Extension(TokenIssuer(issuer)): Extension<TokenIssuer>,
) -> ReportResult<Json<Value>> {
    downstream(&state, state.visibility.dids_visible_to(&issuer))
        .await
        .map(Json)
        .map_err(|e| logged("whichDidsICanSee", e))
}

// ==================== Service ====================

/// Health check endpoint.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for unmatched paths.
pub async fn not_found(uri: Uri) -> (StatusCode, Json<String>) {
    (StatusCode::NOT_FOUND, Json(format!("Not found: {}", uri.path())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_parsing() {
        assert_eq!(coordinate("lat", Some("40.0".into())).unwrap(), 40.0);
        assert_eq!(coordinate("lon", Some(" -105.5 ".into())).unwrap(), -105.5);
        assert!(matches!(
            coordinate("lat", None),
            Err(ReportError::MissingParameter("lat"))
        ));
        assert!(matches!(
            coordinate("lat", Some("north".into())),
            Err(ReportError::InvalidParameter { name: "lat", .. })
        ));
        assert!(matches!(
            coordinate("lat", Some("NaN".into())),
            Err(ReportError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_date_parsing() {
        let expected = NaiveDate::from_ymd_opt(2019, 4, 1).unwrap();
        assert_eq!(date("onDate", Some("2019-04-01".into())).unwrap(), expected);
        assert_eq!(
            date("onDate", Some("2019-04-01T10:00:00Z".into())).unwrap(),
            expected
        );
        assert!(date("onDate", Some("April 1st".into())).is_err());
        assert!(matches!(
            date("onDate", Some("  ".into())),
            Err(ReportError::MissingParameter("onDate"))
        ));
    }

    #[test]
    fn test_since_parsing() {
        assert_eq!(since(None).unwrap(), None);
        assert_eq!(since(Some(String::new())).unwrap(), None);

        let midnight: DateTime<Utc> = "2019-04-01T00:00:00Z".parse().unwrap();
        assert_eq!(since(Some("2019-04-01".into())).unwrap(), Some(midnight));

        let offset: DateTime<Utc> = "2019-04-01T06:00:00Z".parse().unwrap();
        assert_eq!(
            since(Some("2019-04-01T00:00:00-06:00".into())).unwrap(),
            Some(offset)
        );

        assert!(since(Some("yesterday".into())).is_err());
    }
}
