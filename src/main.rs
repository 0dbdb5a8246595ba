//! Endorser Report - report API over claims and confirmations.
//!
//! Serves claim, tenure, org-role and visibility reports, hiding every DID
//! the caller is not allowed to see.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod error;
mod fixtures;
mod logging;
mod network;
mod services;

use crate::api::build_router;
use crate::auth::IdentitySource;
use crate::config::Config;
use crate::domain::Did;
use crate::fixtures::FixtureReports;
use crate::network::NetworkGraph;
use crate::services::{
    ActionService, ClaimIssuerService, OrgRoleService, ResponseFilter, TenureService,
    VisibilityService, VoteCountService,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub claims: Arc<dyn ClaimIssuerService>,
    pub tenure: Arc<dyn TenureService>,
    pub org_roles: Arc<dyn OrgRoleService>,
    pub actions: Arc<dyn ActionService>,
    pub votes: Arc<dyn VoteCountService>,
    pub visibility: Arc<dyn VisibilityService>,
    /// Applied to every result except visibility registration and
    /// `whichDidsICanSee`.
    pub filter: Arc<dyn ResponseFilter>,
    /// Upper bound for each collaborator call.
    pub downstream_timeout: Duration,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is expected in production
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    logging::init();

    tracing::info!("Starting Endorser Report v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        mount_path = %config.server.mount_path,
        timeout_secs = config.downstream.timeout_secs,
        auth_enabled = %config.auth.enabled,
        "Configuration loaded"
    );

    let network = Arc::new(NetworkGraph::with_links(&config.network.links).await);
    tracing::info!(
        links = config.network.links.len(),
        "Visibility graph initialized"
    );

    let fixtures = match &config.fixtures.path {
        Some(path) => {
            let reports = FixtureReports::load(path).map_err(|e| {
                tracing::error!(error = %e, path = %path, "Failed to load fixtures");
                anyhow::anyhow!("Fixture error: {}", e)
            })?;
            tracing::info!(path = %path, "Fixture records loaded");
            reports
        }
        None => {
            tracing::warn!("No fixture file configured - reports will be empty");
            FixtureReports::empty()
        }
    };
    let fixtures = Arc::new(fixtures);

    let identity = if config.auth.enabled {
        IdentitySource::PushToken
    } else {
        tracing::warn!(
            issuer = %config.auth.dev_issuer,
            "Identity checks are DISABLED - every request uses the development issuer"
        );
        IdentitySource::Fixed(Did::new(config.auth.dev_issuer.clone()))
    };

    let state = AppState {
        claims: fixtures.clone(),
        tenure: fixtures.clone(),
        org_roles: fixtures.clone(),
        actions: fixtures.clone(),
        votes: fixtures,
        visibility: network.clone(),
        filter: network,
        downstream_timeout: config.downstream.timeout(),
    };

    let app = build_router(state, &config.server.mount_path, identity);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
