// ABOUTME: HTTP handlers for service requests, including the SSE snapshot stream

use axum::{
    extract::{Json, Path, State},
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
use cartshift_requests::{RequestCreateInput, RequestError, RequestStatus};

use crate::response::ApiResponse;
use crate::sse::{create_sse_event, create_sse_response};
use crate::state::AppState;

/// Convert request errors to HTTP responses
fn error_response(e: RequestError) -> axum::response::Response {
    let (status, message) = match &e {
        RequestError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        RequestError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        RequestError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
        }
    };

    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

/// Request body for creating a request
#[derive(Deserialize)]
pub struct CreateRequestBody {
    pub actor: Actor,
    #[serde(flatten)]
    pub data: RequestCreateInput,
}

/// Request body for overwriting a request's status
#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub status: RequestStatus,
}

pub async fn list_requests(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> impl IntoResponse {
    match state.requests.list_for_org(&org_id).await {
        Ok(requests) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(requests))).into_response()
        }
        Err(e) => {
            error!("Failed to list requests for {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn create_request(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(body): Json<CreateRequestBody>,
) -> impl IntoResponse {
    match state.requests.create(&org_id, &body.actor, body.data).await {
        Ok(request) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(request))).into_response()
        }
        Err(e) => {
            error!("Failed to create request for {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn list_eligible_for_pricing(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> impl IntoResponse {
    match state.requests.list_eligible_for_pricing(&org_id).await {
        Ok(requests) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(requests))).into_response()
        }
        Err(e) => {
            error!("Failed to list eligible requests for {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> impl IntoResponse {
    match state.requests.get(&request_id).await {
        Ok(Some(request)) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(request))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            ResponseJson(ApiResponse::<()>::error("Request not found".to_string())),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to get request {}: {}", request_id, e);
            error_response(e)
        }
    }
}

pub async fn update_request_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<UpdateStatusBody>,
) -> impl IntoResponse {
    match state.requests.update_status(&request_id, body.status).await {
        Ok(request) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(request))).into_response()
        }
        Err(e) => {
            error!("Failed to update request {} status: {}", request_id, e);
            error_response(e)
        }
    }
}

/// GET /api/organizations/{org_id}/requests/events - SSE snapshot stream
pub async fn request_events(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.requests.subscribe(&org_id).await;
    let initial = state.requests.list_for_org(&org_id).await.unwrap_or_default();

    let initial_event = create_sse_event("snapshot", &initial).unwrap_or_else(|_| Event::default());
    let updates = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(snapshot) => create_sse_event("snapshot", &snapshot).ok().map(Ok),
        Err(_) => None,
    });

    let stream = tokio_stream::once(Ok(initial_event)).chain(updates);
    create_sse_response(stream)
}
