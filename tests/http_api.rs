use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use opensase_network::api::{self, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use opensase_network::events::EventPublisher;
use opensase_network::service::NetworkService;
use opensase_network::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    let service = NetworkService::new(Arc::new(MemoryStore::new()), EventPublisher::disabled());
    api::router(Arc::new(service))
}

fn request(method: &str, uri: &str, role: Option<(&Uuid, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
    if let Some((id, role)) = role {
        builder = builder.header(ACTOR_ID_HEADER, id.to_string()).header(ACTOR_ROLE_HEADER, role);
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    builder.body(body).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn period_body(name: &str) -> Value {
    json!({ "period_name": name, "start_date": "2024-05-01", "end_date": "2024-05-31" })
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_period_lifecycle_over_http() {
    let app = app();
    let admin = Uuid::new_v4();

    let (status, period) = send(&app, request("POST", "/api/v1/profit-periods", Some((&admin, "admin")), Some(period_body("May 2024")))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(period["status"], "calculated");
    assert_eq!(period["start_date"], "2024-05-01");
    let id = period["id"].as_str().unwrap().to_string();

    let close = format!("/api/v1/profit-periods/{}/close", id);
    let (status, closed) = send(&app, request("POST", &close, Some((&admin, "admin")), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "paid");

    let (status, body) = send(&app, request("POST", &close, Some((&admin, "admin")), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already closed"));

    let recalc = format!("/api/v1/profit-periods/{}/recalculate", id);
    let (status, _) = send(&app, request("POST", &recalc, Some((&admin, "admin")), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_period_routes_require_admin() {
    let app = app();
    let member = Uuid::new_v4();

    let (status, _) = send(&app, request("POST", "/api/v1/profit-periods", None, Some(period_body("Anon")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request("POST", "/api/v1/profit-periods", Some((&member, "member")), Some(period_body("Mine")))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request("GET", "/api/v1/profit-periods", Some((&member, "superuser")), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_period_name_is_bad_request() {
    let app = app();
    let admin = Uuid::new_v4();
    let body = json!({ "period_name": "", "start_date": "2024-05-01", "end_date": "2024-05-31" });
    let (status, _) = send(&app, request("POST", "/api/v1/profit-periods", Some((&admin, "admin")), Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request("POST", "/api/v1/profit-periods", Some((&admin, "admin")), Some(json!({ "period_name": "No dates" })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_members_read_only_their_own_earnings() {
    let app = app();
    let (status, ada) = send(&app, request("POST", "/api/v1/members", None, Some(json!({ "name": "Ada", "username": "ada" })))).await;
    assert_eq!(status, StatusCode::CREATED);
    let ada_id: Uuid = ada["id"].as_str().unwrap().parse().unwrap();

    let own = format!("/api/v1/members/{}/earnings", ada_id);
    let (status, earnings) = send(&app, request("GET", &own, Some((&ada_id, "member")), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(earnings, json!([]));

    let stranger = Uuid::new_v4();
    let (status, _) = send(&app, request("GET", &own, Some((&stranger, "member")), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_rank_table_lists_nine_ranks() {
    let (status, body) = send(&app(), request("GET", "/api/v1/ranks", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ranks"].as_array().unwrap().len(), 9);
    assert_eq!(body["ranks"][8]["rank"], "global_ambassador");
}

#[tokio::test]
async fn test_privileged_roles_need_an_admin_to_register() {
    let app = app();
    let body = json!({ "name": "Mallory", "username": "mallory", "role": "admin" });
    let (status, _) = send(&app, request("POST", "/api/v1/members", None, Some(body.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let member = Uuid::new_v4();
    let staff = json!({ "name": "Sam", "username": "sam", "role": "staff" });
    let (status, _) = send(&app, request("POST", "/api/v1/members", Some((&member, "member")), Some(staff.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = Uuid::new_v4();
    let (status, created) = send(&app, request("POST", "/api/v1/members", Some((&admin, "admin")), Some(staff))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "staff");

    let customer = json!({ "name": "Bo", "username": "bo", "role": "customer" });
    let (status, _) = send(&app, request("POST", "/api/v1/members", None, Some(customer))).await;
    assert_eq!(status, StatusCode::CREATED);
}
