//! In-memory visibility graph.
//!
//! Tracks which DIDs may see which other DIDs, plus the set of DIDs that
//! asked to be visible to everyone. Backs the default response filter.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::config::NetworkLink;
use crate::domain::{Did, GlobalVisibility, HIDDEN_DID};
use crate::error::ServiceResult;
use crate::services::{ResponseFilter, VisibilityService};

/// Suffix of the key added next to a hidden DID.
const LINKS_SUFFIX: &str = "VisibleToDids";

#[derive(Debug, Default)]
struct Network {
    /// agent -> subjects the agent may see
    links: HashMap<Did, HashSet<Did>>,
    /// globally visible DID -> url
    global: BTreeMap<Did, String>,
}

impl Network {
    fn can_see(&self, agent: &Did, subject: &Did) -> bool {
        agent == subject
            || self.global.contains_key(subject)
            || self
                .links
                .get(agent)
                .is_some_and(|subjects| subjects.contains(subject))
    }

    fn visible_to(&self, agent: &Did) -> BTreeSet<Did> {
        let mut visible: BTreeSet<Did> = self.global.keys().cloned().collect();
        visible.insert(agent.clone());
        if let Some(subjects) = self.links.get(agent) {
            visible.extend(subjects.iter().cloned());
        }
        visible
    }

    /// DIDs visible to `requester` that can themselves see `hidden`.
    fn links_to(&self, requester: &Did, hidden: &Did) -> Vec<Value> {
        self.visible_to(requester)
            .into_iter()
            .filter(|did| did != requester && self.can_see(did, hidden))
            .map(|did| Value::String(did.to_string()))
            .collect()
    }

    /// Returns the replacement for a string when it is a DID the requester
    /// may not see.
    fn hidden(&self, requester: &Did, value: &str) -> Option<Did> {
        if value == HIDDEN_DID || !Did::looks_like_did(value) {
            return None;
        }
        let did = Did::from(value);
        (!self.can_see(requester, &did)).then_some(did)
    }

    fn redact(&self, requester: &Did, value: Value) -> Value {
        match value {
            Value::String(s) => match self.hidden(requester, &s) {
                Some(_) => Value::String(HIDDEN_DID.to_string()),
                None => Value::String(s),
            },
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.redact(requester, item))
                    .collect(),
            ),
            Value::Object(fields) => {
                let mut out = Map::with_capacity(fields.len());
                let mut annotations = Vec::new();
                for (key, field) in fields {
                    let hidden = match &field {
                        Value::String(s) => self.hidden(requester, s),
                        _ => None,
                    };
                    match hidden {
                        Some(did) => {
                            annotations.push((
                                format!("{key}{LINKS_SUFFIX}"),
                                Value::Array(self.links_to(requester, &did)),
                            ));
                            out.insert(key, Value::String(HIDDEN_DID.to_string()));
                        }
                        None => {
                            out.insert(key, self.redact(requester, field));
                        }
                    }
                }
                // Keys already present in the payload win over annotations.
                for (key, links) in annotations {
                    out.entry(key).or_insert(links);
                }
                Value::Object(out)
            }
            other => other,
        }
    }
}

/// Shared handle to the visibility graph.
#[derive(Clone, Default)]
pub struct NetworkGraph {
    inner: Arc<RwLock<Network>>,
}

impl NetworkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph seeded with configured links.
    pub async fn with_links(links: &[NetworkLink]) -> Self {
        let graph = Self::new();
        for link in links {
            graph
                .allow(Did::new(&link.subject), Did::new(&link.agent))
                .await;
        }
        graph
    }

    /// Let `agent` see `subject`.
    pub async fn allow(&self, subject: Did, agent: Did) {
        let mut network = self.inner.write().await;
        network.links.entry(agent).or_default().insert(subject);
    }

    /// Whether `agent` may see `subject`.
    #[allow(dead_code)]
    pub async fn can_see(&self, agent: &Did, subject: &Did) -> bool {
        self.inner.read().await.can_see(agent, subject)
    }
}

#[async_trait]
impl VisibilityService for NetworkGraph {
    async fn seen_by_all(&self) -> ServiceResult<Value> {
        let network = self.inner.read().await;
        let entries: Vec<GlobalVisibility> = network
            .global
            .iter()
            .map(|(did, url)| GlobalVisibility {
                did: did.clone(),
                url: url.clone(),
            })
            .collect();
        Ok(serde_json::to_value(entries)?)
    }

    async fn make_globally_visible(&self, issuer: &Did, url: &str) -> ServiceResult<()> {
        let mut network = self.inner.write().await;
        network.global.insert(issuer.clone(), url.to_string());
        tracing::info!(did = %issuer, url = %url, "DID registered as globally visible");
        Ok(())
    }

    async fn dids_visible_to(&self, issuer: &Did) -> ServiceResult<Value> {
        let network = self.inner.read().await;
        Ok(serde_json::to_value(network.visible_to(issuer))?)
    }
}

#[async_trait]
impl ResponseFilter for NetworkGraph {
    async fn hide_dids_and_add_links(&self, issuer: &Did, payload: Value) -> ServiceResult<Value> {
        let network = self.inner.read().await;
        Ok(network.redact(issuer, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALICE: &str = "did:ethr:0xa11ce";
    const BOB: &str = "did:ethr:0xb0b";
    const CAROL: &str = "did:ethr:0xca401";
    const DAVE: &str = "did:ethr:0xda7e";

    async fn graph() -> NetworkGraph {
        let graph = NetworkGraph::new();
        // alice sees bob, bob sees carol
        graph.allow(Did::from(BOB), Did::from(ALICE)).await;
        graph.allow(Did::from(CAROL), Did::from(BOB)).await;
        graph
    }

    #[tokio::test]
    async fn test_visible_dids_pass_through() {
        let graph = graph().await;
        let payload = json!({ "issuer": BOB, "subject": ALICE, "count": 3 });

        let filtered = graph
            .hide_dids_and_add_links(&Did::from(ALICE), payload.clone())
            .await
            .unwrap();

        assert_eq!(filtered, payload);
    }

    #[tokio::test]
    async fn test_hidden_did_is_redacted_with_links() {
        let graph = graph().await;
        let payload = json!({ "issuer": CAROL, "claim": { "agent": DAVE } });

        let filtered = graph
            .hide_dids_and_add_links(&Did::from(ALICE), payload)
            .await
            .unwrap();

        assert_eq!(filtered["issuer"], HIDDEN_DID);
        assert_eq!(filtered["issuerVisibleToDids"], json!([BOB]));
        assert_eq!(filtered["claim"]["agent"], HIDDEN_DID);
        assert_eq!(filtered["claim"]["agentVisibleToDids"], json!([]));
    }

    #[tokio::test]
    async fn test_existing_annotation_key_is_kept() {
        let graph = graph().await;
        let payload = json!({ "issuer": CAROL, "issuerVisibleToDids": "caller supplied" });

        let filtered = graph
            .hide_dids_and_add_links(&Did::from(ALICE), payload)
            .await
            .unwrap();

        assert_eq!(filtered["issuer"], HIDDEN_DID);
        assert_eq!(filtered["issuerVisibleToDids"], "caller supplied");
    }

    #[tokio::test]
    async fn test_arrays_are_redacted_without_links() {
        let graph = graph().await;
        let payload = json!([BOB, CAROL, "not a did", 7, null]);

        let filtered = graph
            .hide_dids_and_add_links(&Did::from(ALICE), payload)
            .await
            .unwrap();

        assert_eq!(filtered, json!([BOB, HIDDEN_DID, "not a did", 7, null]));
    }

    #[tokio::test]
    async fn test_global_visibility() {
        crate::logging::init_test();
        let graph = graph().await;
        graph
            .make_globally_visible(&Did::from(DAVE), "https://dave.example")
            .await
            .unwrap();

        assert!(graph.can_see(&Did::from(CAROL), &Did::from(DAVE)).await);

        let seen = graph.seen_by_all().await.unwrap();
        assert_eq!(seen, json!([{ "did": DAVE, "url": "https://dave.example" }]));

        // re-registration replaces the url
        graph
            .make_globally_visible(&Did::from(DAVE), "https://dave.example/me")
            .await
            .unwrap();
        let seen = graph.seen_by_all().await.unwrap();
        assert_eq!(seen[0]["url"], "https://dave.example/me");
    }

    #[tokio::test]
    async fn test_dids_visible_to() {
        let graph = graph().await;
        graph
            .make_globally_visible(&Did::from(DAVE), "")
            .await
            .unwrap();

        let visible = graph.dids_visible_to(&Did::from(ALICE)).await.unwrap();
        assert_eq!(visible, json!([ALICE, BOB, DAVE]));

        let visible = graph.dids_visible_to(&Did::from(CAROL)).await.unwrap();
        assert_eq!(visible, json!([CAROL, DAVE]));
    }

    #[tokio::test]
    async fn test_seeded_links() {
        let links = vec![NetworkLink {
            subject: CAROL.to_string(),
            agent: ALICE.to_string(),
        }];
        let graph = NetworkGraph::with_links(&links).await;

        assert!(graph.can_see(&Did::from(ALICE), &Did::from(CAROL)).await);
        assert!(!graph.can_see(&Did::from(CAROL), &Did::from(ALICE)).await);
    }
}
