// ABOUTME: HTTP API layer for the CartShift portal providing REST endpoints and routing
// ABOUTME: Integration layer that depends on all domain packages

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
    routing::{delete, get, post, put},
    Router,
};

pub mod comments_handlers;
pub mod consultations_handlers;
pub mod organizations_handlers;
pub mod pricing_handlers;
pub mod requests_handlers;
pub mod response;
pub mod sse;
pub mod state;

pub use state::AppState;

use response::ApiResponse;

/// Simple liveness probe
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        ResponseJson(ApiResponse::success(serde_json::json!({ "status": "ok" }))),
    )
}

/// Creates the organizations API router, including the org-scoped request
/// and offer listings
pub fn create_organizations_router() -> Router<AppState> {
    Router::new()
        .route("/", get(organizations_handlers::list_organizations))
        .route("/", post(organizations_handlers::create_organization))
        .route("/{org_id}", get(organizations_handlers::get_organization))
        // Membership endpoints
        .route("/{org_id}/members", get(organizations_handlers::list_members))
        .route("/{org_id}/members", post(organizations_handlers::add_member))
        .route(
            "/{org_id}/members/{user_id}",
            delete(organizations_handlers::remove_member),
        )
        // Invite endpoints
        .route("/{org_id}/invites", get(organizations_handlers::list_invites))
        .route("/{org_id}/invites", post(organizations_handlers::create_invite))
        .route(
            "/invites/{invite_id}/accept",
            post(organizations_handlers::accept_invite),
        )
        .route(
            "/invites/{invite_id}/revoke",
            post(organizations_handlers::revoke_invite),
        )
        // Org-scoped request endpoints
        .route("/{org_id}/requests", get(requests_handlers::list_requests))
        .route("/{org_id}/requests", post(requests_handlers::create_request))
        .route(
            "/{org_id}/requests/eligible-for-pricing",
            get(requests_handlers::list_eligible_for_pricing),
        )
        .route("/{org_id}/requests/events", get(requests_handlers::request_events))
        // Org-scoped offer listings
        .route(
            "/{org_id}/pricing-offers",
            get(pricing_handlers::list_org_offers),
        )
        .route(
            "/{org_id}/pricing-offers/events",
            get(pricing_handlers::org_offer_events),
        )
}

/// Creates the request detail API router (lookups, status, comments)
pub fn create_requests_router() -> Router<AppState> {
    Router::new()
        .route("/{request_id}", get(requests_handlers::get_request))
        .route(
            "/{request_id}/status",
            put(requests_handlers::update_request_status),
        )
        .route("/{request_id}/comments", get(comments_handlers::list_comments))
        .route("/{request_id}/comments", post(comments_handlers::create_comment))
        .route(
            "/{request_id}/comments/events",
            get(comments_handlers::comment_events),
        )
}

/// Creates the pricing offers API router
pub fn create_pricing_router() -> Router<AppState> {
    Router::new()
        .route("/", get(pricing_handlers::list_all_offers))
        .route("/", post(pricing_handlers::create_offer))
        .route("/events", get(pricing_handlers::all_offer_events))
        .route("/{offer_id}", get(pricing_handlers::get_offer))
        .route("/{offer_id}", put(pricing_handlers::update_offer))
        .route("/{offer_id}", delete(pricing_handlers::delete_offer))
        .route("/{offer_id}/send", post(pricing_handlers::send_offer))
        .route("/{offer_id}/status", put(pricing_handlers::update_offer_status))
}

/// Creates the consultations API router
pub fn create_consultations_router() -> Router<AppState> {
    Router::new()
        .route("/", get(consultations_handlers::list_consultations))
        .route("/", post(consultations_handlers::create_consultation))
        .route("/events", get(consultations_handlers::consultation_events))
        .route("/conflicts", get(consultations_handlers::check_conflicts))
        .route(
            "/calendar/connection",
            get(consultations_handlers::calendar_connection),
        )
        .route("/{id}", get(consultations_handlers::get_consultation))
        .route(
            "/{id}/complete",
            post(consultations_handlers::complete_consultation),
        )
        .route("/{id}/cancel", post(consultations_handlers::cancel_consultation))
}

/// Assemble the full API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/organizations", create_organizations_router())
        .nest("/api/requests", create_requests_router())
        .nest("/api/pricing-offers", create_pricing_router())
        .nest("/api/consultations", create_consultations_router())
        .with_state(state)
}
