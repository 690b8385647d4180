//! HTTP-level tests driving the full router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use cofund_api::state::{AppConfig, AppState};
use cofund_core::Timestamp;
use cofund_engine::{Engine, ManualClock, MemoryStore};

const SECRET: &str = "test-secret";

// ── Helpers ────────────────────────────────────────────────────────────────

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let start = Timestamp::parse("2026-03-01T12:00:00Z").unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let engine = Engine::new(MemoryStore::new(), clock.clone());
    let config = AppConfig {
        auth_token: Some(SECRET.into()),
        ..AppConfig::default()
    };
    Harness {
        app: cofund_api::app(AppState::with_engine(engine, config)),
        clock,
    }
}

fn member(id: Uuid) -> String {
    format!("Bearer member:{id}:{SECRET}")
}

fn council(id: Uuid) -> String {
    format!("Bearer council:{id}:{SECRET}")
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

fn community_center() -> Value {
    json!({
        "title": "Community center",
        "description": "Rebuild the neighbourhood hall",
        "stages": [
            {
                "name": "Walls",
                "starts_on": "2026-05-01",
                "ends_on": "2026-06-30",
                "requests": [
                    {"type": "materials", "description": "Bricks", "quantity": 5000, "unit": "units"}
                ]
            },
            {
                "name": "Foundations",
                "starts_on": "2026-03-01",
                "ends_on": "2026-04-30",
                "requests": [
                    {"type": "economic", "description": "Mason wages", "amount": "250000.00", "currency": "ARS"}
                ]
            }
        ]
    })
}

/// Request id by description, from a project tree response.
fn request_id(tree: &Value, description: &str) -> String {
    tree["requests"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["description"] == description)
        .map(|r| r["id"].as_str().unwrap().to_string())
        .unwrap()
}

// ── Health & auth ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_probes_need_no_auth() {
    let h = harness();
    let (status, body) = call(&h.app, "GET", "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
    let (status, _) = call(&h.app, "GET", "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let h = harness();
    let (status, body) = call(&h.app, "GET", "/v1/offers/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let wrong = format!("Bearer member:{}:nope", Uuid::new_v4());
    let (status, _) = call(&h.app, "GET", "/v1/offers/mine", Some(&wrong), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let h = harness();
    let auth = member(Uuid::new_v4());
    let (status, body) = call(&h.app, "GET", "/openapi.json", Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/v1/offers/{id}/accept"].is_object());
}

// ── Validation & lookup ────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_project_is_unprocessable() {
    let h = harness();
    let auth = member(Uuid::new_v4());
    let body = json!({
        "title": "Roof",
        "stages": [{
            "name": "Tiles",
            "starts_on": "2026-03-01",
            "ends_on": "2026-03-31",
            "requests": [{"type": "economic", "description": "Roofer", "currency": "ARS"}]
        }]
    });
    let (status, body) = call(&h.app, "POST", "/v1/projects", Some(&auth), Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let h = harness();
    let auth = member(Uuid::new_v4());
    let (status, _) = call(
        &h.app,
        "POST",
        "/v1/projects",
        Some(&auth),
        Some(json!({"stages": "nope"})),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let h = harness();
    let auth = member(Uuid::new_v4());
    let uri = format!("/v1/projects/{}", Uuid::new_v4());
    let (status, body) = call(&h.app, "GET", &uri, Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let uri = format!("/v1/offers/{}/accept", Uuid::new_v4());
    let (status, _) = call(&h.app, "POST", &uri, Some(&auth), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stages_are_listed_by_start_date() {
    let h = harness();
    let auth = member(Uuid::new_v4());
    let (status, tree) =
        call(&h.app, "POST", "/v1/projects", Some(&auth), Some(community_center())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = tree["project"]["id"].as_str().unwrap();

    let (status, stages) = call(&h.app, "GET", &format!("/v1/projects/{id}/stages"), Some(&auth), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stages[0]["name"], "Foundations");
    assert_eq!(stages[1]["name"], "Walls");
    assert_eq!(stages[0]["state"], "PENDING");

    let (status, _) = call(
        &h.app,
        "GET",
        &format!("/v1/projects/{id}/requests?state=bogus"),
        Some(&auth),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Full lifecycle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn project_lifecycle_end_to_end() {
    let h = harness();
    let owner = member(Uuid::new_v4());
    let alice = member(Uuid::new_v4());
    let bob = member(Uuid::new_v4());
    let carol = member(Uuid::new_v4());
    let elder = council(Uuid::new_v4());

    let (status, tree) =
        call(&h.app, "POST", "/v1/projects", Some(&owner), Some(community_center())).await;
    assert_eq!(status, StatusCode::CREATED);
    let project = tree["project"]["id"].as_str().unwrap().to_string();
    let bricks = request_id(&tree, "Bricks");
    let wages = request_id(&tree, "Mason wages");

    // Owners cannot bid on their own requests.
    let (status, _) = call(&h.app, "POST", &format!("/v1/requests/{bricks}/offers"), Some(&owner), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Two bidders on the bricks, one on the wages.
    let (status, a) = call(&h.app, "POST", &format!("/v1/requests/{bricks}/offers"), Some(&alice), Some(json!({"message": "5000 bricks from my yard"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, b) = call(&h.app, "POST", &format!("/v1/requests/{bricks}/offers"), Some(&bob), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, c) = call(&h.app, "POST", &format!("/v1/requests/{wages}/offers"), Some(&carol), Some(json!({"amount": "250000.00"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (offer_a, offer_b, offer_c) = (
        a["id"].as_str().unwrap().to_string(),
        b["id"].as_str().unwrap().to_string(),
        c["id"].as_str().unwrap().to_string(),
    );

    // A second pending offer from the same bidder conflicts.
    let (status, body) = call(&h.app, "POST", &format!("/v1/requests/{bricks}/offers"), Some(&bob), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // The owner sees both offers, a bidder only their own.
    let (_, listed) = call(&h.app, "GET", &format!("/v1/requests/{bricks}/offers"), Some(&owner), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
    let (_, listed) = call(&h.app, "GET", &format!("/v1/requests/{bricks}/offers"), Some(&bob), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // Starting with uncovered requests reports every blocker.
    let (status, body) = call(&h.app, "POST", &format!("/v1/projects/{project}/start"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    assert_eq!(body["error"]["details"]["blocking"].as_array().unwrap().len(), 2);

    // Only the owner arbitrates.
    let (status, _) = call(&h.app, "POST", &format!("/v1/offers/{offer_a}/accept"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Accepting Alice rejects Bob and funds the Walls stage.
    let (status, accepted) = call(&h.app, "POST", &format!("/v1/offers/{offer_a}/accept"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["offer"]["state"], "ACCEPTED");
    assert_eq!(accepted["request"]["state"], "COMMITTED");
    assert_eq!(accepted["stage_state"], "FUNDED");
    assert_eq!(accepted["auto_rejected"], json!([offer_b]));

    // Bob's offer is already decided.
    let (status, body) = call(&h.app, "POST", &format!("/v1/offers/{offer_b}/accept"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE");

    let (status, _) = call(&h.app, "POST", &format!("/v1/offers/{offer_c}/accept"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    // Council observations need a project in execution.
    let (status, _) = call(&h.app, "POST", &format!("/v1/projects/{project}/observations"), Some(&elder), Some(json!({"body": "Where is the permit?"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, started) = call(&h.app, "POST", &format!("/v1/projects/{project}/start"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["state"], "IN_EXECUTION");

    // Members cannot raise observations; council can.
    let (status, _) = call(&h.app, "POST", &format!("/v1/projects/{project}/observations"), Some(&alice), Some(json!({"body": "Looks slow"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, obs) = call(&h.app, "POST", &format!("/v1/projects/{project}/observations"), Some(&elder), Some(json!({"body": "Where is the permit?"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(obs["state"], "PENDING");
    let observation = obs["id"].as_str().unwrap().to_string();

    // Past the deadline, a plain read reports it overdue.
    h.clock.advance_days(6);
    let (status, read) = call(&h.app, "GET", &format!("/v1/observations/{observation}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["state"], "OVERDUE");
    let (_, overdue) = call(&h.app, "GET", &format!("/v1/projects/{project}/observations?state=overdue"), Some(&alice), None).await;
    assert_eq!(overdue.as_array().unwrap().len(), 1);

    // The owner answers; a second answer conflicts.
    let (status, resolved) = call(&h.app, "POST", &format!("/v1/observations/{observation}/resolve"), Some(&owner), Some(json!({"response": "Filed on March 3rd"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["state"], "RESOLVED");
    let (status, body) = call(&h.app, "POST", &format!("/v1/observations/{observation}/resolve"), Some(&owner), Some(json!({"response": "Again"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_RESOLVED");

    // Projects finish only when every stage is completed.
    let (status, body) = call(&h.app, "POST", &format!("/v1/projects/{project}/complete"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["blocking"][0]["type"], "stage");

    // Only the winning bidder confirms; the stage follows its requests.
    let (status, _) = call(&h.app, "POST", &format!("/v1/offers/{offer_a}/confirm"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, receipt) = call(&h.app, "POST", &format!("/v1/offers/{offer_a}/confirm"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["previous_state"], "COMMITTED");
    assert_eq!(receipt["new_state"], "COMPLETED");
    assert_eq!(receipt["stage_state"], "COMPLETED");
    let (status, body) = call(&h.app, "POST", &format!("/v1/offers/{offer_a}/confirm"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_CONFIRMED");

    // Carol's commitment is listed until she confirms it.
    let (_, mine) = call(&h.app, "GET", "/v1/offers/mine?request_state=committed", Some(&carol), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["stage_name"], "Foundations");
    let (status, _) = call(&h.app, "POST", &format!("/v1/offers/{offer_c}/confirm"), Some(&carol), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, mine) = call(&h.app, "GET", "/v1/offers/mine?request_state=committed", Some(&carol), None).await;
    assert!(mine.as_array().unwrap().is_empty());

    let (status, finished) = call(&h.app, "POST", &format!("/v1/projects/{project}/complete"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["state"], "FINISHED");
    assert!(finished["finished_at"].is_string());
}

#[tokio::test]
async fn stage_gate_over_http() {
    let h = harness();
    let owner = member(Uuid::new_v4());
    let bidder = member(Uuid::new_v4());

    let (_, tree) = call(
        &h.app,
        "POST",
        "/v1/projects",
        Some(&owner),
        Some(json!({
            "title": "Playground",
            "stages": [{
                "name": "Swings",
                "starts_on": "2026-03-01",
                "ends_on": "2026-03-31",
                "requests": [{"type": "labor", "description": "Welder", "quantity": 2, "unit": "days"}]
            }]
        })),
    )
    .await;
    let project = tree["project"]["id"].as_str().unwrap().to_string();
    let stage = tree["stages"][0]["id"].as_str().unwrap().to_string();
    let welder = request_id(&tree, "Welder");

    let (_, offer) = call(&h.app, "POST", &format!("/v1/requests/{welder}/offers"), Some(&bidder), Some(json!({}))).await;
    let offer = offer["id"].as_str().unwrap().to_string();
    call(&h.app, "POST", &format!("/v1/offers/{offer}/accept"), Some(&owner), None).await;
    let (status, _) = call(&h.app, "POST", &format!("/v1/projects/{project}/start"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    // A new uncovered need blocks the stage from starting.
    let (status, added) = call(
        &h.app,
        "POST",
        &format!("/v1/stages/{stage}/requests"),
        Some(&owner),
        Some(json!({"type": "equipment", "description": "Welding kit", "quantity": 1, "unit": "kit"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["state"], "PENDING");
    let (status, body) = call(&h.app, "POST", &format!("/v1/stages/{stage}/start"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["blocking"][0]["description"], "Welding kit");

    let kit = added["id"].as_str().unwrap().to_string();
    let (_, offer) = call(&h.app, "POST", &format!("/v1/requests/{kit}/offers"), Some(&bidder), Some(json!({}))).await;
    let offer = offer["id"].as_str().unwrap().to_string();
    call(&h.app, "POST", &format!("/v1/offers/{offer}/accept"), Some(&owner), None).await;

    let (status, started) = call(&h.app, "POST", &format!("/v1/stages/{stage}/start"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["state"], "IN_EXECUTION");

    // Requests cannot be added once the stage is running.
    let (status, _) = call(
        &h.app,
        "POST",
        &format!("/v1/stages/{stage}/requests"),
        Some(&owner),
        Some(json!({"type": "labor", "description": "Painter", "quantity": 1, "unit": "day"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, done) = call(&h.app, "POST", &format!("/v1/stages/{stage}/complete"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["state"], "COMPLETED");
    assert_eq!(done["transitions"].as_array().unwrap().last().unwrap()["trigger"], "manual");
}

#[tokio::test]
async fn delete_is_owner_only() {
    let h = harness();
    let owner = member(Uuid::new_v4());
    let stranger = member(Uuid::new_v4());
    let (_, tree) =
        call(&h.app, "POST", "/v1/projects", Some(&owner), Some(community_center())).await;
    let project = tree["project"]["id"].as_str().unwrap().to_string();
    let bricks = request_id(&tree, "Bricks");

    let (status, _) = call(&h.app, "DELETE", &format!("/v1/projects/{project}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&h.app, "DELETE", &format!("/v1/projects/{project}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Children are gone with the project.
    let (status, _) = call(&h.app, "GET", &format!("/v1/requests/{bricks}/offers"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn request_deletion_and_observation_edits() {
    let h = harness();
    let owner = member(Uuid::new_v4());
    let bidder = member(Uuid::new_v4());
    let gardener_bidder = member(Uuid::new_v4());
    let stranger = member(Uuid::new_v4());
    let elder = council(Uuid::new_v4());
    let other_elder = council(Uuid::new_v4());

    let (_, tree) = call(
        &h.app,
        "POST",
        "/v1/projects",
        Some(&owner),
        Some(json!({
            "title": "Garden",
            "stages": [{
                "name": "Beds",
                "starts_on": "2026-03-01",
                "ends_on": "2026-03-31",
                "requests": [
                    {"type": "materials", "description": "Soil", "quantity": 30, "unit": "bags"},
                    {"type": "labor", "description": "Gardener", "quantity": 4, "unit": "days"}
                ]
            }]
        })),
    )
    .await;
    let project = tree["project"]["id"].as_str().unwrap().to_string();
    let soil = request_id(&tree, "Soil");
    let gardener = request_id(&tree, "Gardener");

    // A zero quote is not an offer.
    let (status, body) = call(&h.app, "POST", &format!("/v1/requests/{gardener}/offers"), Some(&gardener_bidder), Some(json!({"amount": "0"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (_, offer) = call(&h.app, "POST", &format!("/v1/requests/{soil}/offers"), Some(&bidder), Some(json!({}))).await;
    let offer = offer["id"].as_str().unwrap().to_string();
    call(&h.app, "POST", &format!("/v1/offers/{offer}/accept"), Some(&owner), None).await;
    let (status, _) = call(&h.app, "POST", &format!("/v1/requests/{gardener}/offers"), Some(&gardener_bidder), Some(json!({"amount": "900.00"}))).await;
    assert_eq!(status, StatusCode::CREATED);

    // Covered requests stay; uncovered ones go with their offers.
    let (status, body) = call(&h.app, "DELETE", &format!("/v1/requests/{soil}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    let (status, _) = call(&h.app, "DELETE", &format!("/v1/requests/{gardener}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, stage) = call(&h.app, "DELETE", &format!("/v1/requests/{gardener}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stage["state"], "FUNDED");
    let (status, _) = call(&h.app, "GET", &format!("/v1/requests/{gardener}/offers"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&h.app, "POST", &format!("/v1/projects/{project}/start"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, obs) = call(&h.app, "POST", &format!("/v1/projects/{project}/observations"), Some(&elder), Some(json!({"body": "Soil receipts"}))).await;
    let observation = obs["id"].as_str().unwrap().to_string();

    let (status, edited) = call(&h.app, "PATCH", &format!("/v1/observations/{observation}"), Some(&owner), Some(json!({"body": "Soil receipts, March"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["body"], "Soil receipts, March");
    assert_eq!(edited["deadline"], obs["deadline"]);
    let (status, _) = call(&h.app, "PATCH", &format!("/v1/observations/{observation}"), Some(&other_elder), Some(json!({"body": "Not mine"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Reading the project past the deadline writes the escalation once.
    let (_, before) = call(&h.app, "GET", &format!("/v1/projects/{project}"), Some(&owner), None).await;
    h.clock.advance_days(6);
    let (status, after) = call(&h.app, "GET", &format!("/v1/projects/{project}"), Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["version"], before["version"].as_u64().unwrap() + 1);
    let (_, again) = call(&h.app, "GET", &format!("/v1/projects/{project}"), Some(&owner), None).await;
    assert_eq!(again["version"], after["version"]);
    let (_, listed) = call(&h.app, "GET", &format!("/v1/projects/{project}/observations?state=overdue"), Some(&owner), None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
