use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use hyper::{Method, Request, Response, StatusCode};
use tokio_test::{assert_err, assert_ok};
use tower::{ServiceBuilder, ServiceExt};

use authgate::AppState;
use authgate::database::{DEFAULT_STORE_TIMEOUT, MemorySessionStore, SessionStoreHandle};
use authgate::gate::AuthGate;
use authgate::handlers;
use authgate::permission::PermissionTable;
use authgate::token::SigningKey;
use authgate::tower_middle::AuthLayer;
use shared::types::{AppConfig, AuthConfig, ServerConfig, StoreConfig};

fn config(enable_issue_endpoint: bool) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            bind: "127.0.0.1".to_string(),
            port: 0,
            public_paths: vec!["/health".to_string(), "/api/token".to_string()],
            enable_issue_endpoint,
        },
        auth: AuthConfig {
            signing_secret: Some("tower-test-secret-0123456789abcdef".to_string()),
            token_validity_minutes: 15,
        },
        store: StoreConfig::default(),
        permissions: BTreeMap::from([
            ("/protected".to_string(), 1),
            ("/api/logout".to_string(), 1),
            ("/admin/reports".to_string(), 3),
        ]),
    }
}

struct Harness {
    store: Arc<MemorySessionStore>,
    state: AppState,
}

impl Harness {
    fn new(enable_issue_endpoint: bool) -> Self {
        let config = config(enable_issue_endpoint);
        let store = Arc::new(MemorySessionStore::new());
        let gate = AuthGate::new(
            SigningKey::new("tower-test-secret-0123456789abcdef").unwrap(),
            PermissionTable::new(config.permissions.iter().map(|(p, l)| (p.as_str(), *l)))
                .unwrap(),
            SessionStoreHandle::new(store.clone(), DEFAULT_STORE_TIMEOUT),
        );
        Self {
            store,
            state: AppState::new(gate, config),
        }
    }

    async fn send(&self, req: Request<Full<Bytes>>) -> Response<BoxBody<Bytes, Infallible>> {
        let state = self.state.clone();
        let service = ServiceBuilder::new()
            .layer(
                AuthLayer::new(self.state.gate.clone())
                    .with_public_paths(self.state.config.server.public_paths.clone()),
            )
            .service(tower::service_fn(move |req: Request<Full<Bytes>>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handlers::route(req, state).await) }
            }));

        service.oneshot(req).await.unwrap()
    }

    async fn issue(&self, form: &'static str) -> serde_json::Value {
        let response = self
            .send(
                Request::post("/api/token")
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .header(USER_AGENT, "tower-test")
                    .body(Full::new(Bytes::from_static(form.as_bytes())))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        json(response).await
    }
}

fn get(path: &str, token: Option<&str>) -> Request<Full<Bytes>> {
    let mut builder = Request::get(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Full::new(Bytes::new())).unwrap()
}

async fn json(response: Response<BoxBody<Bytes, Infallible>>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let harness = Harness::new(false);
    let response = harness.send(get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["permission_rules"], 3);
}

#[tokio::test]
async fn missing_header_gets_401_envelope() {
    let harness = Harness::new(false);
    let response = harness.send(get("/protected", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
    let body = json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "MISSING_CREDENTIAL");
}

#[tokio::test]
async fn garbage_token_gets_401_and_store_untouched() {
    let harness = Harness::new(false);
    let response = harness
        .send(get("/protected", Some("invalid.token.value")))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["code"], "MALFORMED_CREDENTIAL");
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn issue_endpoint_is_off_by_default() {
    let harness = Harness::new(false);
    let response = harness
        .send(
            Request::post("/api/token")
                .body(Full::new(Bytes::from_static(b"subject=user123&roles=1")))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn bad_issue_form_is_400() {
    let harness = Harness::new(true);
    let response = harness
        .send(
            Request::post("/api/token")
                .body(Full::new(Bytes::from_static(b"roles=1")))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn issued_token_passes_through_to_the_handler() {
    let harness = Harness::new(true);
    let issued = harness.issue("subject=user123&roles=1").await;
    let token = issued["token"].as_str().unwrap();

    let response = harness.send(get("/protected", Some(token))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    assert_eq!(body["path"], "/protected");
    assert_eq!(body["subject"], "user123");
}

#[tokio::test]
async fn insufficient_role_is_403() {
    let harness = Harness::new(true);
    let issued = harness.issue("subject=user123&roles=1,2").await;
    let token = issued["token"].as_str().unwrap();

    let response = harness.send(get("/admin/reports", Some(token))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get("www-authenticate").is_none());
    assert_eq!(json(response).await["code"], "ACCESS_DENIED");
}

#[tokio::test]
async fn logout_revokes_the_callers_session() {
    let harness = Harness::new(true);
    let issued = harness.issue("subject=user123&roles=1").await;
    let token = issued["token"].as_str().unwrap();
    assert_eq!(harness.store.len().await, 1);

    let logout = harness
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/logout")
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .body(Full::new(Bytes::new()))
                .unwrap(),
        )
        .await;
    assert_eq!(logout.status(), StatusCode::OK);
    assert!(harness.store.is_empty().await);

    let response = harness.send(get("/protected", Some(token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn gate_decisions_show_up_in_health() {
    let harness = Harness::new(true);
    let issued = harness.issue("subject=user123&roles=1").await;
    let token = issued["token"].as_str().unwrap();

    let _ = harness.send(get("/protected", Some(token))).await;
    let _ = harness.send(get("/protected", None)).await;
    let _ = harness.send(get("/unlisted", Some(token))).await;

    let body = json(harness.send(get("/health", None)).await).await;
    assert_eq!(body["metrics"]["allowed"], 1);
    assert_eq!(body["metrics"]["denied_total"], 2);
}

#[test]
fn issue_form_parser_matches_endpoint_behaviour() {
    assert_ok!(handlers::auth::parse_issue_form(b"subject=a&roles=1"));
    assert_err!(handlers::auth::parse_issue_form(b"subject=a&roles=x"));
}
