// ABOUTME: HTTP handlers for consultations and the advisory conflict check

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    response::{IntoResponse, Json as ResponseJson},
};
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::error;

use cartshift_consultations::{
    ConsultationCreateInput, ConsultationError, ConsultationFilter, ConsultationStatus,
};
use cartshift_core::Actor;

use crate::response::ApiResponse;
use crate::sse::{create_sse_event, create_sse_response};
use crate::state::AppState;

/// Convert consultation errors to HTTP responses
fn error_response(e: ConsultationError) -> axum::response::Response {
    let (status, message) = match &e {
        ConsultationError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        ConsultationError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        ConsultationError::AlreadyClosed(_) => (StatusCode::CONFLICT, e.to_string()),
        ConsultationError::Calendar(_) => (StatusCode::BAD_GATEWAY, e.to_string()),
        ConsultationError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
        }
    };

    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

/// Request body for scheduling a consultation
#[derive(Deserialize)]
pub struct CreateConsultationBody {
    pub actor: Actor,
    #[serde(flatten)]
    pub data: ConsultationCreateInput,
}

/// Request body for completing a consultation
#[derive(Deserialize)]
pub struct CompleteConsultationBody {
    pub actor: Actor,
    #[serde(rename = "meetingNotes")]
    pub meeting_notes: Option<String>,
}

/// Request body for canceling a consultation
#[derive(Deserialize)]
pub struct CancelConsultationBody {
    pub actor: Actor,
}

/// List filter
#[derive(Deserialize)]
pub struct ConsultationListQuery {
    #[serde(rename = "orgId")]
    pub org_id: Option<String>,
    pub status: Option<ConsultationStatus>,
}

/// Candidate slot for the conflict check
#[derive(Deserialize)]
pub struct ConflictQuery {
    #[serde(rename = "scheduledAt")]
    pub scheduled_at: DateTime<Utc>,
    pub duration: i64,
}

/// Org scope for the SSE stream; absent means agency-wide
#[derive(Deserialize)]
pub struct ConsultationEventsQuery {
    #[serde(rename = "orgId")]
    pub org_id: Option<String>,
}

pub async fn list_consultations(
    State(state): State<AppState>,
    Query(query): Query<ConsultationListQuery>,
) -> impl IntoResponse {
    let filter = ConsultationFilter {
        org_id: query.org_id,
        status: query.status,
    };

    match state.consultations.list(filter).await {
        Ok(consultations) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(consultations))).into_response()
        }
        Err(e) => {
            error!("Failed to list consultations: {}", e);
            error_response(e)
        }
    }
}

pub async fn create_consultation(
    State(state): State<AppState>,
    Json(body): Json<CreateConsultationBody>,
) -> impl IntoResponse {
    match state.consultations.create(&body.actor, body.data).await {
        Ok(consultation) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(consultation))).into_response()
        }
        Err(e) => {
            error!("Failed to create consultation: {}", e);
            error_response(e)
        }
    }
}

pub async fn get_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.consultations.get(&id).await {
        Ok(Some(consultation)) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(consultation))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            ResponseJson(ApiResponse::<()>::error("Consultation not found".to_string())),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to get consultation {}: {}", id, e);
            error_response(e)
        }
    }
}

pub async fn complete_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CompleteConsultationBody>,
) -> impl IntoResponse {
    match state
        .consultations
        .complete(&id, &body.actor, body.meeting_notes)
        .await
    {
        Ok(consultation) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(consultation))).into_response()
        }
        Err(e) => {
            error!("Failed to complete consultation {}: {}", id, e);
            error_response(e)
        }
    }
}

pub async fn cancel_consultation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CancelConsultationBody>,
) -> impl IntoResponse {
    match state.consultations.cancel(&id, &body.actor).await {
        Ok(consultation) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(consultation))).into_response()
        }
        Err(e) => {
            error!("Failed to cancel consultation {}: {}", id, e);
            error_response(e)
        }
    }
}

/// GET /api/consultations/conflicts - advisory overlap check for a slot.
/// Returns the busy windows the candidate collides with; never blocks.
pub async fn check_conflicts(
    State(state): State<AppState>,
    Query(query): Query<ConflictQuery>,
) -> impl IntoResponse {
    match state
        .consultations
        .check_conflicts(query.scheduled_at, query.duration)
        .await
    {
        Ok(conflicts) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(conflicts))).into_response()
        }
        Err(e) => {
            error!("Conflict check failed: {}", e);
            error_response(e)
        }
    }
}

/// GET /api/consultations/calendar/connection - calendar link status
pub async fn calendar_connection(State(state): State<AppState>) -> impl IntoResponse {
    let connection = state.consultations.calendar_connection().await;
    (StatusCode::OK, ResponseJson(ApiResponse::success(connection))).into_response()
}

/// GET /api/consultations/events - SSE snapshot stream, agency-wide or
/// scoped to one organization via orgId.
pub async fn consultation_events(
    State(state): State<AppState>,
    Query(query): Query<ConsultationEventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (rx, filter) = match query.org_id {
        Some(org_id) => (
            state.consultations.subscribe_for_org(&org_id).await,
            ConsultationFilter {
                org_id: Some(org_id),
                status: None,
            },
        ),
        None => (
            state.consultations.subscribe_all(),
            ConsultationFilter::default(),
        ),
    };

    let initial = state.consultations.list(filter).await.unwrap_or_default();

    let initial_event = create_sse_event("snapshot", &initial).unwrap_or_else(|_| Event::default());
    let updates = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(snapshot) => create_sse_event("snapshot", &snapshot).ok().map(Ok),
        Err(_) => None,
    });

    let stream = tokio_stream::once(Ok(initial_event)).chain(updates);
    create_sse_response(stream)
}
