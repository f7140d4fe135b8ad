// ABOUTME: HTTP handlers for pricing offers
// ABOUTME: Draft filtering for client-role callers is applied here, not in the service

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Json as ResponseJson},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::error;

use cartshift_core::Actor;
use cartshift_pricing::{
    without_drafts, PricingError, PricingOfferCreateInput, PricingOfferStatus,
    PricingOfferUpdateInput,
};

use crate::response::ApiResponse;
use crate::sse::{create_sse_event, create_sse_response};
use crate::state::AppState;

/// Convert pricing errors to HTTP responses
fn error_response(e: PricingError) -> axum::response::Response {
    let (status, message) = match &e {
        PricingError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        PricingError::Validation(_)
        | PricingError::UnknownRequest(_)
        | PricingError::CrossOrgRequest { .. } => (StatusCode::BAD_REQUEST, e.to_string()),
        PricingError::NotEditable(_)
        | PricingError::NotDraft(_)
        | PricingError::RequestNotEligible(_) => (StatusCode::CONFLICT, e.to_string()),
        PricingError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
        }
    };

    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

/// Request body for creating an offer
#[derive(Deserialize)]
pub struct CreatePricingOfferBody {
    pub actor: Actor,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(flatten)]
    pub data: PricingOfferCreateInput,
}

/// Request body for marking an offer accepted/paid/declined
#[derive(Deserialize)]
pub struct UpdateOfferStatusBody {
    pub status: PricingOfferStatus,
}

/// Draft filter; clients always pass true
#[derive(Deserialize)]
pub struct DraftFilterQuery {
    #[serde(rename = "excludeDrafts", default)]
    pub exclude_drafts: bool,
}

pub async fn list_all_offers(State(state): State<AppState>) -> impl IntoResponse {
    match state.pricing.list_all().await {
        Ok(offers) => (StatusCode::OK, ResponseJson(ApiResponse::success(offers))).into_response(),
        Err(e) => {
            error!("Failed to list pricing offers: {}", e);
            error_response(e)
        }
    }
}

pub async fn list_org_offers(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Query(query): Query<DraftFilterQuery>,
) -> impl IntoResponse {
    match state.pricing.list_for_org(&org_id, query.exclude_drafts).await {
        Ok(offers) => (StatusCode::OK, ResponseJson(ApiResponse::success(offers))).into_response(),
        Err(e) => {
            error!("Failed to list pricing offers for {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn create_offer(
    State(state): State<AppState>,
    Json(body): Json<CreatePricingOfferBody>,
) -> impl IntoResponse {
    match state.pricing.create(&body.org_id, &body.actor, body.data).await {
        Ok(offer) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(offer))).into_response()
        }
        Err(e) => {
            error!("Failed to create pricing offer: {}", e);
            error_response(e)
        }
    }
}

pub async fn get_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> impl IntoResponse {
    match state.pricing.get(&offer_id).await {
        Ok(Some(offer)) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(offer))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            ResponseJson(ApiResponse::<()>::error("Pricing offer not found".to_string())),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to get pricing offer {}: {}", offer_id, e);
            error_response(e)
        }
    }
}

pub async fn update_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
    Json(input): Json<PricingOfferUpdateInput>,
) -> impl IntoResponse {
    match state.pricing.update(&offer_id, input).await {
        Ok(offer) => (StatusCode::OK, ResponseJson(ApiResponse::success(offer))).into_response(),
        Err(e) => {
            error!("Failed to update pricing offer {}: {}", offer_id, e);
            error_response(e)
        }
    }
}

pub async fn send_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> impl IntoResponse {
    match state.pricing.send(&offer_id).await {
        Ok(offer) => (StatusCode::OK, ResponseJson(ApiResponse::success(offer))).into_response(),
        Err(e) => {
            error!("Failed to send pricing offer {}: {}", offer_id, e);
            error_response(e)
        }
    }
}

pub async fn update_offer_status(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
    Json(body): Json<UpdateOfferStatusBody>,
) -> impl IntoResponse {
    match state.pricing.update_status(&offer_id, body.status).await {
        Ok(offer) => (StatusCode::OK, ResponseJson(ApiResponse::success(offer))).into_response(),
        Err(e) => {
            error!("Failed to update pricing offer {} status: {}", offer_id, e);
            error_response(e)
        }
    }
}

pub async fn delete_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<String>,
) -> impl IntoResponse {
    match state.pricing.delete(&offer_id).await {
        Ok(true) => (StatusCode::OK, ResponseJson(ApiResponse::success(()))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            ResponseJson(ApiResponse::<()>::error("Pricing offer not found".to_string())),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to delete pricing offer {}: {}", offer_id, e);
            error_response(e)
        }
    }
}

/// GET /api/pricing-offers/events - agency-wide SSE snapshot stream
pub async fn all_offer_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.pricing.subscribe_all();
    let initial = state.pricing.list_all().await.unwrap_or_default();

    let initial_event = create_sse_event("snapshot", &initial).unwrap_or_else(|_| Event::default());
    let updates = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(snapshot) => create_sse_event("snapshot", &snapshot).ok().map(Ok),
        Err(_) => None,
    });

    let stream = tokio_stream::once(Ok(initial_event)).chain(updates);
    create_sse_response(stream)
}

/// GET /api/organizations/{org_id}/pricing-offers/events - per-org SSE
/// snapshot stream; drafts are stripped when excludeDrafts is set.
pub async fn org_offer_events(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Query(query): Query<DraftFilterQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let exclude_drafts = query.exclude_drafts;
    let rx = state.pricing.subscribe_for_org(&org_id).await;
    let initial = state
        .pricing
        .list_for_org(&org_id, exclude_drafts)
        .await
        .unwrap_or_default();

    let initial_event = create_sse_event("snapshot", &initial).unwrap_or_else(|_| Event::default());
    let updates = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(snapshot) => {
            let payload = if exclude_drafts {
                without_drafts(&snapshot)
            } else {
                snapshot
            };
            create_sse_event("snapshot", &payload).ok().map(Ok)
        }
        Err(_) => None,
    });

    let stream = tokio_stream::once(Ok(initial_event)).chain(updates);
    create_sse_response(stream)
}
