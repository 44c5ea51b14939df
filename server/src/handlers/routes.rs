use std::convert::Infallible;
use std::fmt::Display;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use tracing::error;

use crate::AppState;
use crate::gate::{credentials, peek_claims};
use crate::handlers::auth::{handle_issue, handle_logout};
use crate::handlers::json_response::{deliver_serialized_json, internal_error};

pub const HEALTH_PATH: &str = "/health";
pub const ISSUE_PATH: &str = "/api/token";
pub const LOGOUT_PATH: &str = "/api/logout";

/// Dispatch a request that the auth layer has already let through.
///
/// Never fails: handler errors are logged and turned into a 500.
pub async fn route<B>(req: Request<B>, state: AppState) -> Response<BoxBody<Bytes, Infallible>>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: Display,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (&method, path.as_str()) {
        (&Method::GET, HEALTH_PATH) => handle_health(&state),
        (&Method::POST, ISSUE_PATH) => handle_issue(req, state).await,
        (&Method::POST, LOGOUT_PATH) => handle_logout(req, state).await,
        _ => handle_echo(&req),
    };

    result.unwrap_or_else(|e| {
        error!("Handler for {} {} failed: {:#}", method, path, e);
        internal_error()
    })
}

/// Liveness plus the gate's decision counters.
fn handle_health(state: &AppState) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let snapshot = state.gate.metrics().snapshot();

    deliver_serialized_json(
        &serde_json::json!({
            "status": "ok",
            "permission_rules": state.gate.permissions().len(),
            "metrics": snapshot,
        }),
        StatusCode::OK,
    )
    .context("Failed to deliver health response")
}

/// Stand-in for a protected resource: reports who got in and where.
fn handle_echo<B>(req: &Request<B>) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let subject = peek_claims(credentials::authorization_header(req.headers()))
        .ok()
        .map(|claims| claims.subject);

    deliver_serialized_json(
        &serde_json::json!({
            "status": "success",
            "method": req.method().as_str(),
            "path": req.uri().path(),
            "subject": subject,
        }),
        StatusCode::OK,
    )
    .context("Failed to deliver echo response")
}
