/// Integration tests for authentication, account bootstrap and health

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{read_json, TestContext};
use kasir_shared::auth::jwt::{create_token, IdentityClaims};
use kasir_shared::store::memory::FailPoint;
use tower::Service as _;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = ctx.app.clone().call(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/api/auth/user", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");
    assert_eq!(ctx.store.account_count().await, 0);
}

#[tokio::test]
async fn test_non_bearer_header_is_bad_request() {
    let ctx = TestContext::new();

    let request = Request::builder()
        .uri("/api/auth/user")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, _) = read_json(ctx.app.clone().call(request).await.unwrap()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_unauthorized() {
    let ctx = TestContext::new();
    let token = create_token(
        &IdentityClaims::new("user_1", None),
        "some-other-secret-that-is-32-bytes-long",
    )
    .unwrap();

    let request = Request::builder()
        .uri("/api/auth/user")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = read_json(ctx.app.clone().call(request).await.unwrap()).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.store.account_count().await, 0);
}

#[tokio::test]
async fn test_first_call_provisions_account() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/api/auth/user", Some("user_1"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Account provisioned");
    assert_eq!(body["data"]["external_id"], "user_1");
    assert_eq!(body["data"]["role"], "admin");
    assert_eq!(body["data"]["email"], "");
    assert!(body["data"]["name"].is_null());

    assert_eq!(ctx.store.organization_count().await, 1);
    assert_eq!(ctx.store.account_count().await, 1);
    assert_eq!(ctx.store.membership_count().await, 1);
}

#[tokio::test]
async fn test_second_call_returns_same_account() {
    let ctx = TestContext::new();

    let (_, first) = ctx.send("GET", "/api/auth/user", Some("user_1"), None).await;
    let (status, second) = ctx.send("GET", "/api/auth/user", Some("user_1"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(second.get("message").is_none());
    assert_eq!(first["data"], second["data"]);
    assert_eq!(ctx.store.account_count().await, 1);
}

#[tokio::test]
async fn test_identities_share_default_organization() {
    let ctx = TestContext::new();

    let (_, a) = ctx.send("GET", "/api/auth/user", Some("user_a"), None).await;
    let (_, b) = ctx.send("GET", "/api/auth/user", Some("user_b"), None).await;

    assert_ne!(a["data"]["id"], b["data"]["id"]);
    assert_eq!(a["data"]["organization_id"], b["data"]["organization_id"]);
    assert_eq!(ctx.store.organization_count().await, 1);
}

#[tokio::test]
async fn test_store_failure_surfaces_step_and_writes_nothing() {
    let ctx = TestContext::new();
    ctx.store.fail_next(FailPoint::MembershipWrite).await;

    let (status, body) = ctx.send("GET", "/api/auth/user", Some("user_1"), None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to provision account (write_membership)");
    assert!(body["details"].as_str().unwrap().contains("injected failure"));
    assert_eq!(ctx.store.account_count().await, 0);
    assert_eq!(ctx.store.membership_count().await, 0);

    let (status, _) = ctx.send("GET", "/api/auth/user", Some("user_1"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.store.account_count().await, 1);
    assert_eq!(ctx.store.membership_count().await, 1);
}
