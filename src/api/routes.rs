//! Route definitions for the API.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::{DefaultOnFailure, TraceLayer};
use tracing::Level;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::cors::apply_cors;
use crate::api::handlers;
use crate::auth::{require_issuer, IdentitySource, PUSH_TOKEN_HEADER};
use crate::AppState;

/// Security scheme modifier for OpenAPI.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "push_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(PUSH_TOKEN_HEADER))),
            );
        }
    }
}

/// Report endpoints, relative to the mount path.
#[derive(OpenApi)]
#[openapi(paths(
    handlers::issuers_who_claimed_or_confirmed,
    handlers::action_claims_and_confirmations_since,
    handlers::tenure_claims_at_point,
    handlers::tenure_claims_and_confirmations_at_point,
    handlers::org_role_claims_and_confirmations_on_date,
    handlers::vote_counts,
    handlers::globally_visible_dids,
    handlers::make_me_globally_visible,
    handlers::which_dids_i_can_see,
))]
struct ReportDoc;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::health_check),
    components(schemas(
        crate::api::types::MakeVisibleRequest,
        crate::api::types::SuccessResponse,
        crate::api::types::HealthResponse,
        crate::domain::GlobalVisibility,
        crate::domain::VoteCount,
        crate::domain::Did,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "report", description = "Claim, tenure, org-role and visibility reports"),
        (name = "health", description = "Health and status endpoints")
    ),
    info(
        title = "Endorser Report API",
        version = "0.1.0",
        description = "Reports over claims and confirmations, filtered by the caller's network",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Ensure the mount path starts with `/` and has no trailing `/`.
fn normalize_mount(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Build the API router.
///
/// Report routes require a caller identity; `/health` and the docs do not.
/// The CORS middleware wraps everything, including the fallback.
pub fn build_router(state: AppState, mount_path: &str, identity: IdentitySource) -> Router {
    let reports = Router::new()
        .route(
            "/issuersWhoClaimedOrConfirmed",
            get(handlers::issuers_who_claimed_or_confirmed),
        )
        .route(
            "/actionClaimsAndConfirmationsSince",
            get(handlers::action_claims_and_confirmations_since),
        )
        .route(
            "/tenureClaimsAtPoint",
            get(handlers::tenure_claims_at_point),
        )
        .route(
            "/tenureClaimsAndConfirmationsAtPoint",
            get(handlers::tenure_claims_and_confirmations_at_point),
        )
        .route(
            "/orgRoleClaimsAndConfirmationsOnDate",
            get(handlers::org_role_claims_and_confirmations_on_date),
        )
        .route("/voteCounts", get(handlers::vote_counts))
        .route("/globallyVisibleDids", get(handlers::globally_visible_dids))
        .route(
            "/makeMeGloballyVisible",
            post(handlers::make_me_globally_visible),
        )
        .route("/whichDidsICanSee", get(handlers::which_dids_i_can_see))
        .route_layer(middleware::from_fn_with_state(identity, require_issuer))
        .with_state(state);

    let mount = normalize_mount(mount_path);
    let openapi = ApiDoc::openapi().nest(mount.as_str(), ReportDoc::openapi());

    let router = Router::new().route("/health", get(handlers::health_check));
    let router = if mount.is_empty() {
        router.merge(reports)
    } else {
        router.nest(&mount, reports)
    };

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(apply_cors))
        .layer(TraceLayer::new_for_http().on_failure(DefaultOnFailure::new().level(Level::DEBUG)))
}
