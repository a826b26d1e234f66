#![allow(dead_code)]

// Common test utilities for integration tests
//
// Builds the full router over an in-memory store so tests run without a
// database, and mints identity tokens the way the identity provider would.

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use kasir_api::app::{build_router, AppState};
use kasir_api::config::Config;
use kasir_shared::auth::jwt::{create_token, IdentityClaims};
use kasir_shared::models::account::{Account, NewAccount};
use kasir_shared::models::organization::NewOrganization;
use kasir_shared::models::role::Role;
use kasir_shared::provisioning::{DEFAULT_ORGANIZATION_NAME, DEFAULT_ORGANIZATION_SLUG};
use kasir_shared::store::{memory::MemoryStore, Store};
use serde_json::Value;
use std::sync::Arc;
use tower::Service as _;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
}

impl TestContext {
    /// Creates a context over an empty store
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "AUTH_JWT_SECRET" => Some(TEST_SECRET.to_string()),
            _ => None,
        })
        .expect("test configuration");

        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config));

        Self { store, app }
    }

    /// Authorization header value for an identity
    pub fn auth_header(&self, external_id: &str) -> String {
        let token = create_token(&IdentityClaims::new(external_id, None), TEST_SECRET)
            .expect("token creation");
        format!("Bearer {}", token)
    }

    /// Creates an account with the given role in the default organization,
    /// bypassing provisioning
    pub async fn seed_account(&self, external_id: &str, role: Role) -> Account {
        let organization = self
            .store
            .get_or_create_organization(NewOrganization {
                name: DEFAULT_ORGANIZATION_NAME.to_string(),
                slug: DEFAULT_ORGANIZATION_SLUG.to_string(),
            })
            .await
            .unwrap();

        let (account, _) = self
            .store
            .create_account_with_membership(NewAccount {
                external_id: external_id.to_string(),
                email: String::new(),
                name: None,
                role,
                organization_id: organization.id,
            })
            .await
            .unwrap();

        account
    }

    /// Sends a request as `external_id` (or anonymously) and returns the
    /// status with the parsed JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        external_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(external_id) = external_id {
            builder = builder.header("authorization", self.auth_header(external_id));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        read_json(response).await
    }
}

/// Splits a response into its status and JSON body (Null when empty)
pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    if body.is_empty() {
        return (status, Value::Null);
    }

    let json = serde_json::from_slice(&body).unwrap_or_else(|_| {
        panic!(
            "Expected JSON body, got {}: {}",
            status,
            String::from_utf8_lossy(&body)
        )
    });
    (status, json)
}
