use anyhow::{Context, Result, anyhow};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use tracing::debug;

use shared::types::{Denial, ErrorResponse};

pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    Full::new(chunk.into()).boxed()
}

/// Serialize any `Serialize` type and deliver it as a JSON response.
pub fn deliver_serialized_json<T: Serialize>(
    data: &T,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let json = serde_json::to_string(data).context("Failed to serialize response")?;

    debug!("Delivering serialized JSON response, size: {} bytes", json.len());

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(json))
        .map_err(|e| anyhow!("Failed to build JSON response: {}", e))
}

/// Delivers a JSON error response with the specified error code, message, and status.
pub fn deliver_error_json(
    error_code: &str,
    message: &str,
    status: StatusCode,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    debug!(
        "Delivering error JSON: {} - {} ({})",
        status.as_u16(),
        error_code,
        message
    );

    deliver_serialized_json(&ErrorResponse::new(error_code, message), status)
}

/// Response for a request the gate refused.
///
/// Built without the fallible builder: this runs inside the middleware,
/// where there is no error channel left for a response that failed to build.
pub fn denial_response(denial: Denial) -> Response<BoxBody<Bytes, Infallible>> {
    let json = serde_json::to_string(&ErrorResponse::from(denial)).unwrap_or_default();

    let mut response = Response::new(full(json));
    *response.status_mut() = denial.status();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    if denial.status() == StatusCode::UNAUTHORIZED {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    response
}

/// Last-resort 500 when a handler itself failed.
pub fn internal_error() -> Response<BoxBody<Bytes, Infallible>> {
    let body = ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred");
    let json = serde_json::to_string(&body).unwrap_or_default();

    let mut response = Response::new(full(json));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response<BoxBody<Bytes, Infallible>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn denial_response_carries_code_and_status() {
        let response = denial_response(Denial::Expired);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn forbidden_denials_have_no_challenge() {
        let response = denial_response(Denial::AccessDenied);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[tokio::test]
    async fn error_json_uses_shared_envelope() {
        let response =
            deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND).unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "Endpoint not found");
    }
}
