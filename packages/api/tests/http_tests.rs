// End-to-end HTTP tests over the assembled router: the request →
// pricing-offer → consultation workflow through the JSON API.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

use cartshift_api::{create_router, AppState};
use cartshift_consultations::DisconnectedCalendar;

async fn test_app() -> Router {
    let pool = cartshift_storage::connect_in_memory().await.unwrap();
    let state = AppState::new(pool, Arc::new(DisconnectedCalendar));
    create_router(state)
}

async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn actor(role: &str) -> Value {
    json!({ "userId": "u1", "userName": "Noa", "role": role })
}

async fn create_org(app: &Router, name: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/organizations",
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_request(app: &Router, org_id: &str, title: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        &format!("/api/organizations/{}/requests", org_id),
        Some(json!({
            "actor": actor("client"),
            "title": title,
            "description": "details",
            "type": "feature"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = send_json(&app, "GET", "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("ok"));
}

#[tokio::test]
async fn test_request_lifecycle_over_http() {
    let app = test_app().await;
    let org_id = create_org(&app, "Acme").await;
    let request_id = create_request(&app, &org_id, "Fix checkout").await;

    let (status, body) = send_json(&app, "GET", &format!("/api/requests/{}", request_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("new"));
    assert_eq!(body["data"]["orgId"], json!(org_id));

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/requests/{}/status", request_id),
        Some(json!({ "status": "in-progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("in-progress"));

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/organizations/{}/requests", org_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_offer_workflow_over_http() {
    let app = test_app().await;
    let org_id = create_org(&app, "Acme").await;
    let request_id = create_request(&app, &org_id, "Fix checkout").await;

    // Worked example: 2 × 5000 + 1 × 2500 = 12500 minor units
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/pricing-offers",
        Some(json!({
            "actor": actor("agency"),
            "orgId": org_id,
            "title": "Checkout revamp",
            "lineItems": [
                { "description": "Development", "quantity": 2, "unitPrice": 5000 },
                { "description": "QA", "quantity": 1, "unitPrice": 2500 }
            ],
            "currency": "USD",
            "requestIds": [request_id]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["totalAmount"], json!(12500));
    assert_eq!(body["data"]["status"], json!("draft"));
    let offer_id = body["data"]["id"].as_str().unwrap().to_string();

    // The bundled request left the eligible list
    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/organizations/{}/requests/eligible-for-pricing", org_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    // Clients see no drafts
    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/organizations/{}/pricing-offers?excludeDrafts=true", org_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    // Send, then sending again conflicts
    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/pricing-offers/{}/send", offer_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("sent"));
    assert!(body["data"]["sentAt"].is_string());

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/pricing-offers/{}/send", offer_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Mark accepted; edits are now rejected
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/pricing-offers/{}/status", offer_id),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("/api/pricing-offers/{}", offer_id),
        Some(json!({ "title": "Too late now" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_cross_org_bundle_rejected_over_http() {
    let app = test_app().await;
    let org_a = create_org(&app, "Acme").await;
    let org_b = create_org(&app, "Globex").await;
    let foreign_request = create_request(&app, &org_b, "Other org work").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/pricing-offers",
        Some(json!({
            "actor": actor("agency"),
            "orgId": org_a,
            "title": "Bad bundle",
            "lineItems": [{ "description": "Work", "quantity": 1, "unitPrice": 1000 }],
            "currency": "EUR",
            "requestIds": [foreign_request]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    // No offer was written
    let (_, body) = send_json(&app, "GET", "/api/pricing-offers", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_offer_validation_errors() {
    let app = test_app().await;
    let org_id = create_org(&app, "Acme").await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/pricing-offers",
        Some(json!({
            "actor": actor("agency"),
            "orgId": org_id,
            "title": "ab",
            "lineItems": [],
            "currency": "USD"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comments_visibility_over_http() {
    let app = test_app().await;
    let org_id = create_org(&app, "Acme").await;
    let request_id = create_request(&app, &org_id, "Fix checkout").await;

    for (content, visibility) in [("hello", "shared"), ("internal", "agency-only")] {
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/requests/{}/comments", request_id),
            Some(json!({
                "actor": actor("agency"),
                "orgId": org_id,
                "content": content,
                "visibility": visibility
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send_json(
        &app,
        "GET",
        &format!("/api/requests/{}/comments?includeAgencyOnly=true", request_id),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send_json(
        &app,
        "GET",
        &format!("/api/requests/{}/comments", request_id),
        None,
    )
    .await;
    let visible = body["data"].as_array().unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0]["content"], json!("hello"));

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/requests/{}/comments", request_id),
        Some(json!({
            "actor": actor("client"),
            "orgId": org_id,
            "content": "   "
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_consultation_workflow_over_http() {
    let app = test_app().await;
    let org_id = create_org(&app, "Acme").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/consultations",
        Some(json!({
            "actor": actor("agency"),
            "orgId": org_id,
            "type": "onboarding",
            "title": "Kickoff",
            "scheduledAt": "2024-06-01T10:00:00Z",
            "duration": 30
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], json!("scheduled"));
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // Disconnected calendar: a fallback add-to-calendar link was stored
    let link = body["data"]["externalCalendarLink"].as_str().unwrap();
    assert!(link.starts_with("https://calendar.google.com/"));

    // No busy windows, so a candidate slot reports no conflicts
    let (status, body) = send_json(
        &app,
        "GET",
        "/api/consultations/conflicts?scheduledAt=2024-06-01T10:00:00Z&duration=30",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/consultations/{}/complete", id),
        Some(json!({ "actor": actor("agency"), "meetingNotes": "went well" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("completed"));

    // Terminal state: cancel conflicts and the status is unchanged
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/consultations/{}/cancel", id),
        Some(json!({ "actor": actor("agency") })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send_json(&app, "GET", &format!("/api/consultations/{}", id), None).await;
    assert_eq!(body["data"]["status"], json!("completed"));

    let (_, body) = send_json(&app, "GET", "/api/consultations/calendar/connection", None).await;
    assert_eq!(body["data"]["connected"], json!(false));
}

#[tokio::test]
async fn test_invite_flow_over_http() {
    let app = test_app().await;
    let org_id = create_org(&app, "Acme").await;

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/organizations/{}/invites", org_id),
        Some(json!({ "email": "dev@acme.example" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let invite_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("/api/organizations/invites/{}/accept", invite_id),
        Some(json!({ "userId": "u9", "userName": "Dev" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orgId"], json!(org_id));

    // Accept is one-way
    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/organizations/invites/{}/accept", invite_id),
        Some(json!({ "userId": "u10", "userName": "Other" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send_json(
        &app,
        "GET",
        &format!("/api/organizations/{}/members", org_id),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
