// ABOUTME: HTTP handlers for request comment threads

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

use cartshift_comments::{visible_to_client, CommentCreateInput, CommentError};
use cartshift_core::Actor;

use crate::response::ApiResponse;
use crate::sse::{create_sse_event, create_sse_response};
use crate::state::AppState;

/// Convert comment errors to HTTP responses
fn error_response(e: CommentError) -> axum::response::Response {
    let (status, message) = match &e {
        CommentError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        CommentError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
        }
    };

    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

/// Request body for appending a comment
#[derive(Deserialize)]
pub struct CreateCommentBody {
    pub actor: Actor,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(flatten)]
    pub data: CommentCreateInput,
}

/// Visibility flag; agency callers pass true to see internal comments
#[derive(Deserialize)]
pub struct CommentVisibilityQuery {
    #[serde(rename = "includeAgencyOnly", default)]
    pub include_agency_only: bool,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(query): Query<CommentVisibilityQuery>,
) -> impl IntoResponse {
    match state
        .comments
        .list_for_request(&request_id, query.include_agency_only)
        .await
    {
        Ok(comments) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(comments))).into_response()
        }
        Err(e) => {
            error!("Failed to list comments for {}: {}", request_id, e);
            error_response(e)
        }
    }
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Json(body): Json<CreateCommentBody>,
) -> impl IntoResponse {
    match state
        .comments
        .create(&request_id, &body.org_id, &body.actor, body.data)
        .await
    {
        Ok(comment) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(comment))).into_response()
        }
        Err(e) => {
            error!("Failed to create comment on {}: {}", request_id, e);
            error_response(e)
        }
    }
}

/// GET /api/requests/{request_id}/comments/events - SSE snapshot stream.
/// Agency-only comments are stripped unless includeAgencyOnly is set.
pub async fn comment_events(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(query): Query<CommentVisibilityQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let include_agency_only = query.include_agency_only;
    let rx = state.comments.subscribe(&request_id).await;
    let initial = state
        .comments
        .list_for_request(&request_id, include_agency_only)
        .await
        .unwrap_or_default();

    let initial_event = create_sse_event("snapshot", &initial).unwrap_or_else(|_| Event::default());
    let updates = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(snapshot) => {
            let payload = if include_agency_only {
                snapshot
            } else {
                visible_to_client(&snapshot)
            };
            create_sse_event("snapshot", &payload).ok().map(Ok)
        }
        Err(_) => None,
    });

    let stream = tokio_stream::once(Ok(initial_event)).chain(updates);
    create_sse_response(stream)
}
