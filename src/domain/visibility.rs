//! Visibility and aggregate report values.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Did;

/// A DID that consented to being visible to everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GlobalVisibility {
    pub did: Did,
    /// Where others can learn more about this identity.
    pub url: String,
}

/// Number of votes cast for one option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VoteCount {
    pub option: String,
    pub count: u64,
}

/// Maximum number of tenure claims returned for one point.
pub const MAX_TENURE_RESULTS: usize = 50;
