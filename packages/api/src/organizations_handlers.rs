// ABOUTME: HTTP handlers for organizations, members and invites

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
};
use serde::Deserialize;
use tracing::error;

use cartshift_organizations::{
    InviteCreateInput, MemberRole, OrganizationCreateInput, OrganizationError,
};

use crate::response::ApiResponse;
use crate::state::AppState;

/// Convert organization errors to HTTP responses
fn error_response(e: OrganizationError) -> axum::response::Response {
    let (status, message) = match &e {
        OrganizationError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        OrganizationError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        OrganizationError::InviteNotPending(_) | OrganizationError::DuplicateMember { .. } => {
            (StatusCode::CONFLICT, e.to_string())
        }
        OrganizationError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
        }
    };

    (status, ResponseJson(ApiResponse::<()>::error(message))).into_response()
}

/// Request body for adding a member directly
#[derive(Deserialize)]
pub struct AddMemberRequest {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "userName")]
    user_name: String,
    #[serde(default)]
    role: MemberRole,
}

/// Request body for accepting an invite
#[derive(Deserialize)]
pub struct AcceptInviteRequest {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "userName")]
    user_name: String,
}

pub async fn list_organizations(State(state): State<AppState>) -> impl IntoResponse {
    match state.organizations.list_organizations().await {
        Ok(organizations) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(organizations))).into_response()
        }
        Err(e) => {
            error!("Failed to list organizations: {}", e);
            error_response(e)
        }
    }
}

pub async fn create_organization(
    State(state): State<AppState>,
    Json(input): Json<OrganizationCreateInput>,
) -> impl IntoResponse {
    match state.organizations.create_organization(input).await {
        Ok(organization) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(organization))).into_response()
        }
        Err(e) => {
            error!("Failed to create organization: {}", e);
            error_response(e)
        }
    }
}

pub async fn get_organization(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> impl IntoResponse {
    match state.organizations.get_organization(&org_id).await {
        Ok(Some(organization)) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(organization))).into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            ResponseJson(ApiResponse::<()>::error("Organization not found".to_string())),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to get organization {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn list_members(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> impl IntoResponse {
    match state.organizations.list_members(&org_id).await {
        Ok(members) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(members))).into_response()
        }
        Err(e) => {
            error!("Failed to list members for {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn add_member(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> impl IntoResponse {
    match state
        .organizations
        .add_member(&org_id, &body.user_id, &body.user_name, body.role)
        .await
    {
        Ok(member) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(member))).into_response()
        }
        Err(e) => {
            error!("Failed to add member to {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn remove_member(
    State(state): State<AppState>,
    Path((org_id, user_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.organizations.remove_member(&org_id, &user_id).await {
        Ok(true) => (StatusCode::OK, ResponseJson(ApiResponse::success(()))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            ResponseJson(ApiResponse::<()>::error("Member not found".to_string())),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to remove member {} from {}: {}", user_id, org_id, e);
            error_response(e)
        }
    }
}

pub async fn list_invites(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> impl IntoResponse {
    match state.organizations.list_invites(&org_id).await {
        Ok(invites) => {
            (StatusCode::OK, ResponseJson(ApiResponse::success(invites))).into_response()
        }
        Err(e) => {
            error!("Failed to list invites for {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn create_invite(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(input): Json<InviteCreateInput>,
) -> impl IntoResponse {
    match state.organizations.create_invite(&org_id, input).await {
        Ok(invite) => {
            (StatusCode::CREATED, ResponseJson(ApiResponse::success(invite))).into_response()
        }
        Err(e) => {
            error!("Failed to create invite for {}: {}", org_id, e);
            error_response(e)
        }
    }
}

pub async fn accept_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<String>,
    Json(body): Json<AcceptInviteRequest>,
) -> impl IntoResponse {
    match state
        .organizations
        .accept_invite(&invite_id, &body.user_id, &body.user_name)
        .await
    {
        Ok(member) => (StatusCode::OK, ResponseJson(ApiResponse::success(member))).into_response(),
        Err(e) => {
            error!("Failed to accept invite {}: {}", invite_id, e);
            error_response(e)
        }
    }
}

pub async fn revoke_invite(
    State(state): State<AppState>,
    Path(invite_id): Path<String>,
) -> impl IntoResponse {
    match state.organizations.revoke_invite(&invite_id).await {
        Ok(invite) => (StatusCode::OK, ResponseJson(ApiResponse::success(invite))).into_response(),
        Err(e) => {
            error!("Failed to revoke invite {}: {}", invite_id, e);
            error_response(e)
        }
    }
}
