use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Display;

use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use tracing::{info, warn};

use shared::types::PermissionLevel;

use crate::AppState;
use crate::database::StoreError;
use crate::gate::{AuthError, TokenParts, credentials, peek_claims};
use crate::handlers::headers::get_user_agent;
use crate::handlers::json_response::{
    deliver_error_json, deliver_serialized_json, denial_response,
};

/// Fields accepted by `POST /api/token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueForm {
    pub subject: String,
    pub roles: Vec<PermissionLevel>,
    pub shop_id: Option<i64>,
    pub company_id: Option<i64>,
}

/// Parse `subject=..&roles=1,2&shop_id=..&company_id=..`.
pub fn parse_issue_form(body: &[u8]) -> Result<IssueForm> {
    let params = form_urlencoded::parse(body)
        .into_owned()
        .collect::<HashMap<String, String>>();

    let subject = params
        .get("subject")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("Missing subject field"))?;

    let roles = match params.get("roles") {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| {
                r.parse::<PermissionLevel>()
                    .with_context(|| format!("Invalid role: {}", r))
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(IssueForm {
        subject,
        roles,
        shop_id: optional_id(&params, "shop_id")?,
        company_id: optional_id(&params, "company_id")?,
    })
}

fn optional_id(params: &HashMap<String, String>, name: &str) -> Result<Option<i64>> {
    match params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse()
            .map(Some)
            .with_context(|| format!("Invalid {}: {}", name, v)),
        None => Ok(None),
    }
}

/// Issue a token for the subject in the form body.
pub async fn handle_issue<B>(
    req: Request<B>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>>
where
    B: Body + Send,
    B::Data: Send,
    B::Error: Display,
{
    if !state.config.server.enable_issue_endpoint {
        return deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND);
    }

    let user_agent = get_user_agent(req.headers());
    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| anyhow!("Failed to read request body: {}", e))?
        .to_bytes();

    let form = match parse_issue_form(&body) {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected token request: {:#}", e);
            return deliver_error_json("BAD_REQUEST", &format!("{:#}", e), StatusCode::BAD_REQUEST);
        }
    };

    match state
        .gate
        .issue_session(
            &form.subject,
            &user_agent,
            form.roles,
            form.shop_id,
            form.company_id,
        )
        .await
    {
        Ok(issued) => deliver_serialized_json(&issued, StatusCode::OK),
        // Already logged by the gate.
        Err(_) => deliver_error_json(
            "SESSION_NOT_CREATED",
            "Failed to create session",
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}

/// Revoke the caller's own session.
///
/// Only reachable through the auth layer, so the token has already been
/// verified and its session found.
pub async fn handle_logout<B>(
    req: Request<B>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let authorization = credentials::authorization_header(req.headers());

    let claims = match peek_claims(authorization) {
        Ok(claims) => claims,
        Err(denial) => return Ok(denial_response(denial)),
    };
    let signature = match credentials::bearer_token(authorization).and_then(TokenParts::split) {
        Ok(parts) => parts.signature.to_string(),
        Err(denial) => return Ok(denial_response(denial)),
    };

    match state.gate.revoke_session(&claims.subject, &signature).await {
        Ok(()) => {
            info!("User {} logged out", claims.subject);
            deliver_serialized_json(
                &serde_json::json!({
                    "status": "success",
                    "message": "Logged out successfully"
                }),
                StatusCode::OK,
            )
        }
        // Lost a race with another logout for the same token.
        Err(AuthError::Store(StoreError::NotFound)) => deliver_error_json(
            "SESSION_NOT_FOUND",
            "Session already revoked",
            StatusCode::UNAUTHORIZED,
        ),
        Err(_) => deliver_error_json(
            "SESSION_NOT_REVOKED",
            "Failed to revoke session",
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    }
}
