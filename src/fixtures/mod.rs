//! Fixture-backed report collaborators.
//!
//! Serves claim, tenure, org-role, action and vote reports from records
//! loaded once from a JSON file. Intended for local development and tests;
//! nothing is ever written back.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{Did, VoteCount, MAX_TENURE_RESULTS};
use crate::error::{ServiceError, ServiceResult};
use crate::services::{
    ActionService, ClaimIssuerService, OrgRoleService, TenureService, VoteCountService,
};

/// Failure while loading a fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse fixture file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Fixture record references unknown claim: {0}")]
    DanglingClaim(String),
}

/// A signed claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: String,
    pub issuer: Did,
    pub claim: Value,
}

/// A confirmation of an earlier claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub id: String,
    pub issuer: Did,
    /// ID of the confirmed claim.
    pub confirms: String,
}

/// Bounding box of a tenure claim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenureRecord {
    pub claim_id: String,
    pub west_lon: f64,
    pub east_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl TenureRecord {
    fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.west_lon..=self.east_lon).contains(&lon)
    }
}

/// Role held in an organization over a date range.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgRoleRecord {
    pub claim_id: String,
    pub org_name: String,
    pub role_name: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl OrgRoleRecord {
    fn active_on(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| start <= date)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

/// An action claim tied to an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub claim_id: String,
    pub event_start_time: DateTime<Utc>,
}

/// A single vote.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteRecord {
    pub option: String,
}

/// On-disk layout of a fixture file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureFile {
    #[serde(default)]
    pub claims: Vec<ClaimRecord>,
    #[serde(default)]
    pub confirmations: Vec<ConfirmationRecord>,
    #[serde(default)]
    pub tenures: Vec<TenureRecord>,
    #[serde(default)]
    pub org_roles: Vec<OrgRoleRecord>,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
}

/// Read-only report collaborators over fixture records.
#[derive(Debug, Default)]
pub struct FixtureReports {
    claims: Vec<ClaimRecord>,
    claim_index: HashMap<String, usize>,
    confirmations: Vec<ConfirmationRecord>,
    tenures: Vec<TenureRecord>,
    org_roles: Vec<OrgRoleRecord>,
    actions: Vec<ActionRecord>,
    votes: Vec<VoteRecord>,
}

impl FixtureReports {
    /// No records at all; every report is empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load records from a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path)?;
        let file: FixtureFile = serde_json::from_str(&raw)?;
        Self::from_records(file)
    }

    /// Index records, rejecting references to claims that do not exist.
    pub fn from_records(file: FixtureFile) -> Result<Self, FixtureError> {
        let claim_index: HashMap<String, usize> = file
            .claims
            .iter()
            .enumerate()
            .map(|(i, claim)| (claim.id.clone(), i))
            .collect();

        let referenced = file
            .confirmations
            .iter()
            .map(|c| &c.confirms)
            .chain(file.tenures.iter().map(|t| &t.claim_id))
            .chain(file.org_roles.iter().map(|o| &o.claim_id))
            .chain(file.actions.iter().map(|a| &a.claim_id));
        for claim_id in referenced {
            if !claim_index.contains_key(claim_id) {
                return Err(FixtureError::DanglingClaim(claim_id.clone()));
            }
        }

        let mut actions = file.actions;
        actions.sort_by_key(|a| a.event_start_time);

        Ok(Self {
            claims: file.claims,
            claim_index,
            confirmations: file.confirmations,
            tenures: file.tenures,
            org_roles: file.org_roles,
            actions,
            votes: file.votes,
        })
    }

    fn claim(&self, id: &str) -> Option<&ClaimRecord> {
        self.claim_index.get(id).map(|&i| &self.claims[i])
    }

    fn confirmations_of<'a>(
        &'a self,
        claim_id: &'a str,
    ) -> impl Iterator<Item = &'a ConfirmationRecord> + 'a {
        self.confirmations
            .iter()
            .filter(move |c| c.confirms == claim_id)
    }

    /// `{ <key>: <claim>, "confirmations": [...] }` for a referenced claim.
    fn with_confirmations(&self, key: &str, claim_id: &str) -> ServiceResult<Value> {
        let claim = self
            .claim(claim_id)
            .ok_or_else(|| ServiceError::UnknownClaim(claim_id.to_string()))?;
        let confirmations: Vec<&ConfirmationRecord> = self.confirmations_of(claim_id).collect();

        let mut entry = Map::new();
        entry.insert(key.to_string(), serde_json::to_value(claim)?);
        entry.insert("confirmations".to_string(), serde_json::to_value(confirmations)?);
        Ok(Value::Object(entry))
    }

    fn tenures_at(&self, lat: f64, lon: f64) -> impl Iterator<Item = &TenureRecord> + '_ {
        self.tenures
            .iter()
            .filter(move |t| t.contains(lat, lon))
            .take(MAX_TENURE_RESULTS)
    }
}

#[async_trait]
impl ClaimIssuerService for FixtureReports {
    async fn issuers_matching_claim(&self, claim_id: &str) -> ServiceResult<Value> {
        let target = self
            .claim(claim_id)
            .ok_or_else(|| ServiceError::UnknownClaim(claim_id.to_string()))?;

        let matching: Vec<&ClaimRecord> = self
            .claims
            .iter()
            .filter(|c| c.claim == target.claim)
            .collect();
        let matching_ids: HashSet<&str> = matching.iter().map(|c| c.id.as_str()).collect();

        let mut seen = HashSet::new();
        let issuers: Vec<&Did> = matching
            .iter()
            .map(|c| &c.issuer)
            .chain(
                self.confirmations
                    .iter()
                    .filter(|c| matching_ids.contains(c.confirms.as_str()))
                    .map(|c| &c.issuer),
            )
            .filter(|did| seen.insert(*did))
            .collect();

        Ok(serde_json::to_value(issuers)?)
    }
}

#[async_trait]
impl TenureService for FixtureReports {
    async fn tenure_at_point(&self, lat: f64, lon: f64) -> ServiceResult<Value> {
        let claims = self
            .tenures_at(lat, lon)
            .map(|t| {
                self.claim(&t.claim_id)
                    .ok_or_else(|| ServiceError::UnknownClaim(t.claim_id.clone()))
            })
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(serde_json::to_value(claims)?)
    }

    async fn tenure_claims_and_confirmations_at_point(
        &self,
        lat: f64,
        lon: f64,
    ) -> ServiceResult<Value> {
        let entries = self
            .tenures_at(lat, lon)
            .map(|t| self.with_confirmations("tenure", &t.claim_id))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Value::Array(entries))
    }
}

#[async_trait]
impl OrgRoleService for FixtureReports {
    async fn claims_and_confirmations_on_date(
        &self,
        org_name: &str,
        role_name: &str,
        on_date: NaiveDate,
    ) -> ServiceResult<Value> {
        let entries = self
            .org_roles
            .iter()
            .filter(|o| o.org_name == org_name && o.role_name == role_name && o.active_on(on_date))
            .map(|o| self.with_confirmations("orgRole", &o.claim_id))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Value::Array(entries))
    }
}

#[async_trait]
impl ActionService for FixtureReports {
    async fn claims_and_confirmations_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> ServiceResult<Value> {
        let entries = self
            .actions
            .iter()
            .filter(|a| since.map_or(true, |since| a.event_start_time >= since))
            .map(|a| self.with_confirmations("action", &a.claim_id))
            .collect::<ServiceResult<Vec<_>>>()?;
        Ok(Value::Array(entries))
    }
}

#[async_trait]
impl VoteCountService for FixtureReports {
    async fn vote_counts(&self) -> ServiceResult<Value> {
        let mut tally: BTreeMap<&str, u64> = BTreeMap::new();
        for vote in &self.votes {
            *tally.entry(vote.option.as_str()).or_default() += 1;
        }
        let counts: Vec<VoteCount> = tally
            .into_iter()
            .map(|(option, count)| VoteCount {
                option: option.to_string(),
                count,
            })
            .collect();
        Ok(serde_json::to_value(counts)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn claim(id: &str, issuer: &str, body: Value) -> ClaimRecord {
        ClaimRecord {
            id: id.to_string(),
            issuer: Did::from(issuer),
            claim: body,
        }
    }

    fn confirmation(id: &str, issuer: &str, confirms: &str) -> ConfirmationRecord {
        ConfirmationRecord {
            id: id.to_string(),
            issuer: Did::from(issuer),
            confirms: confirms.to_string(),
        }
    }

    fn reports() -> FixtureReports {
        let file = FixtureFile {
            claims: vec![
                claim("c1", "did:ethr:0x1", json!({ "@type": "JoinAction", "event": "meetup" })),
                claim("c2", "did:ethr:0x2", json!({ "@type": "JoinAction", "event": "meetup" })),
                claim("c3", "did:ethr:0x3", json!({ "@type": "Tenure", "parcel": "A" })),
                claim("c4", "did:ethr:0x4", json!({ "@type": "Organization", "role": "President" })),
            ],
            confirmations: vec![
                confirmation("f1", "did:ethr:0x5", "c2"),
                confirmation("f2", "did:ethr:0x1", "c1"),
                confirmation("f3", "did:ethr:0x6", "c3"),
            ],
            tenures: vec![TenureRecord {
                claim_id: "c3".to_string(),
                west_lon: -106.0,
                east_lon: -104.0,
                min_lat: 39.0,
                max_lat: 41.0,
            }],
            org_roles: vec![OrgRoleRecord {
                claim_id: "c4".to_string(),
                org_name: "Cottonwood Cryptography Club".to_string(),
                role_name: "President".to_string(),
                start_date: NaiveDate::from_ymd_opt(2019, 1, 1),
                end_date: NaiveDate::from_ymd_opt(2019, 12, 31),
            }],
            actions: vec![
                ActionRecord {
                    claim_id: "c2".to_string(),
                    event_start_time: "2019-06-01T18:00:00Z".parse().unwrap(),
                },
                ActionRecord {
                    claim_id: "c1".to_string(),
                    event_start_time: "2019-05-01T18:00:00Z".parse().unwrap(),
                },
            ],
            votes: vec![
                VoteRecord { option: "yes".to_string() },
                VoteRecord { option: "no".to_string() },
                VoteRecord { option: "yes".to_string() },
            ],
        };
        FixtureReports::from_records(file).unwrap()
    }

    #[tokio::test]
    async fn test_issuers_matching_claim() {
        let issuers = assert_ok!(reports().issuers_matching_claim("c1").await);
        assert_eq!(
            issuers,
            json!(["did:ethr:0x1", "did:ethr:0x2", "did:ethr:0x5"])
        );
    }

    #[tokio::test]
    async fn test_issuers_for_unknown_claim() {
        let err = reports().issuers_matching_claim("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown claim ID: nope");
    }

    #[tokio::test]
    async fn test_tenure_at_point_inclusive_box() {
        let reports = reports();

        let inside = assert_ok!(reports.tenure_at_point(40.0, -105.0).await);
        assert_eq!(inside.as_array().unwrap().len(), 1);
        assert_eq!(inside[0]["id"], "c3");

        let edge = assert_ok!(reports.tenure_at_point(41.0, -104.0).await);
        assert_eq!(edge.as_array().unwrap().len(), 1);

        let outside = assert_ok!(reports.tenure_at_point(42.0, -105.0).await);
        assert_eq!(outside, json!([]));
    }

    #[tokio::test]
    async fn test_tenure_results_are_capped() {
        let claims = (0..60)
            .map(|i| claim(&format!("t{i}"), "did:ethr:0x9", json!({ "parcel": i })))
            .collect();
        let tenures = (0..60)
            .map(|i| TenureRecord {
                claim_id: format!("t{i}"),
                west_lon: -1.0,
                east_lon: 1.0,
                min_lat: -1.0,
                max_lat: 1.0,
            })
            .collect();
        let reports = FixtureReports::from_records(FixtureFile {
            claims,
            tenures,
            ..Default::default()
        })
        .unwrap();

        let result = assert_ok!(reports.tenure_at_point(0.0, 0.0).await);
        assert_eq!(result.as_array().unwrap().len(), MAX_TENURE_RESULTS);
    }

    #[tokio::test]
    async fn test_tenure_with_confirmations() {
        let result = assert_ok!(
            reports()
                .tenure_claims_and_confirmations_at_point(40.0, -105.0)
                .await
        );
        assert_eq!(result[0]["tenure"]["id"], "c3");
        assert_eq!(result[0]["confirmations"][0]["issuer"], "did:ethr:0x6");
    }

    #[tokio::test]
    async fn test_org_role_on_date() {
        let reports = reports();
        let org = "Cottonwood Cryptography Club";

        let during = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
        let result = assert_ok!(
            reports
                .claims_and_confirmations_on_date(org, "President", during)
                .await
        );
        assert_eq!(result[0]["orgRole"]["id"], "c4");

        let after = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let result = assert_ok!(
            reports
                .claims_and_confirmations_on_date(org, "President", after)
                .await
        );
        assert_eq!(result, json!([]));

        let result = assert_ok!(
            reports
                .claims_and_confirmations_on_date(org, "Secretary", during)
                .await
        );
        assert_eq!(result, json!([]));
    }

    #[tokio::test]
    async fn test_actions_since() {
        let reports = reports();

        let all = assert_ok!(reports.claims_and_confirmations_since(None).await);
        assert_eq!(all[0]["action"]["id"], "c1");
        assert_eq!(all[1]["action"]["id"], "c2");

        let since = "2019-05-15T00:00:00Z".parse().unwrap();
        let recent = assert_ok!(reports.claims_and_confirmations_since(Some(since)).await);
        assert_eq!(recent.as_array().unwrap().len(), 1);
        assert_eq!(recent[0]["action"]["id"], "c2");
        assert_eq!(recent[0]["confirmations"][0]["issuer"], "did:ethr:0x5");
    }

    #[tokio::test]
    async fn test_vote_counts() {
        let counts = assert_ok!(reports().vote_counts().await);
        assert_eq!(
            counts,
            json!([{ "option": "no", "count": 1 }, { "option": "yes", "count": 2 }])
        );
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let file = FixtureFile {
            confirmations: vec![confirmation("f1", "did:ethr:0x1", "missing")],
            ..Default::default()
        };
        let err = FixtureReports::from_records(file).unwrap_err();
        assert!(matches!(err, FixtureError::DanglingClaim(id) if id == "missing"));
    }
}
