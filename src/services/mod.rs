//! Collaborator seams for the report handlers.
//!
//! Each handler calls exactly one of these. Results are opaque JSON so the
//! router never depends on the shape a collaborator returns.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::domain::Did;
use crate::error::ServiceResult;

/// Finds everyone who made or confirmed a given claim.
#[async_trait]
pub trait ClaimIssuerService: Send + Sync {
    async fn issuers_matching_claim(&self, claim_id: &str) -> ServiceResult<Value>;
}

/// Land-tenure claims located at a point.
///
/// Implementations return at most [`crate::domain::MAX_TENURE_RESULTS`] items.
#[async_trait]
pub trait TenureService: Send + Sync {
    async fn tenure_at_point(&self, lat: f64, lon: f64) -> ServiceResult<Value>;

    async fn tenure_claims_and_confirmations_at_point(
        &self,
        lat: f64,
        lon: f64,
    ) -> ServiceResult<Value>;
}

/// Organization role claims valid on a date.
#[async_trait]
pub trait OrgRoleService: Send + Sync {
    async fn claims_and_confirmations_on_date(
        &self,
        org_name: &str,
        role_name: &str,
        on_date: NaiveDate,
    ) -> ServiceResult<Value>;
}

/// Action claims with their confirmations.
#[async_trait]
pub trait ActionService: Send + Sync {
    async fn claims_and_confirmations_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> ServiceResult<Value>;
}

/// Aggregate vote tallies.
#[async_trait]
pub trait VoteCountService: Send + Sync {
    async fn vote_counts(&self) -> ServiceResult<Value>;
}

/// Who can see which DIDs.
#[async_trait]
pub trait VisibilityService: Send + Sync {
    /// Every DID registered as visible to all.
    async fn seen_by_all(&self) -> ServiceResult<Value>;

    /// Register `issuer` as visible to all, pointing at `url`.
    async fn make_globally_visible(&self, issuer: &Did, url: &str) -> ServiceResult<()>;

    /// Every DID `issuer` is allowed to see.
    async fn dids_visible_to(&self, issuer: &Did) -> ServiceResult<Value>;
}

/// Redacts DIDs the caller may not see and links hidden ones to the
/// caller's network.
#[async_trait]
pub trait ResponseFilter: Send + Sync {
    async fn hide_dids_and_add_links(&self, issuer: &Did, payload: Value) -> ServiceResult<Value>;
}
