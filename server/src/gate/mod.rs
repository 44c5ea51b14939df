//! Request-time authorization pipeline.
//!
//! A request passes these checks in order and stops at the first failure:
//!
//! | step                  | failure                 |
//! |-----------------------|-------------------------|
//! | header present        | `MissingCredential`     |
//! | `Bearer` scheme       | `MalformedCredential`   |
//! | three segments        | `MalformedCredential`   |
//! | payload decodes       | `MalformedCredential`   |
//! | signature             | `InvalidSignature`      |
//! | expiry                | `Expired`               |
//! | session record exists | `SessionNotFound`       |
//! | path has a rule       | `EndpointNotRecognized` |
//! | role held             | `AccessDenied`          |
//!
//! The payload is decoded before the signature is checked so that garbage
//! and forgeries land in different buckets.

pub mod credentials;
pub mod error;
pub mod session;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hyper::Request;
use hyper::header::HeaderValue;
use tracing::{debug, info, warn};

use shared::types::{Claims, Denial, PermissionLevel, SessionKey};

use crate::database::{SessionStoreHandle, StoreError};
use crate::permission::PermissionTable;
use crate::security::GateMetrics;
use crate::token::{self, SigningKey};

pub use credentials::{TokenParts, peek_claims};
pub use error::AuthError;
pub use session::IssuedToken;

/// Default validity window of issued tokens.
pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::from_secs(15 * 60);

/// What the gate knows about an allowed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub claims: Claims,
    pub signature: String,
    pub required: PermissionLevel,
}

/// The authorization gate.
///
/// Holds only read-only state (key, rule table, store handle) behind an
/// `Arc`, so clones are cheap and can be handed to every connection task.
#[derive(Clone, Debug)]
pub struct AuthGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    key: SigningKey,
    permissions: PermissionTable,
    store: SessionStoreHandle,
    validity: Duration,
    metrics: GateMetrics,
}

impl AuthGate {
    pub fn new(key: SigningKey, permissions: PermissionTable, store: SessionStoreHandle) -> Self {
        Self::with_validity(key, permissions, store, DEFAULT_TOKEN_VALIDITY)
    }

    pub fn with_validity(
        key: SigningKey,
        permissions: PermissionTable,
        store: SessionStoreHandle,
        validity: Duration,
    ) -> Self {
        info!(
            "Auth gate ready: {} permission rule(s), token validity {:?}, store timeout {:?}",
            permissions.len(),
            validity,
            store.timeout()
        );

        Self {
            inner: Arc::new(GateInner {
                key,
                permissions,
                store,
                validity,
                metrics: GateMetrics::new(),
            }),
        }
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.inner.metrics
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.inner.permissions
    }

    /// Run the full pipeline for an `Authorization` header value and a
    /// request path.
    pub async fn authorize(
        &self,
        authorization: Option<&HeaderValue>,
        path: &str,
    ) -> Result<Authorized, Denial> {
        let result = self.evaluate(authorization, path).await;

        match &result {
            Ok(authorized) => {
                self.inner.metrics.record_allowed();
                debug!(
                    "Allowed {} for {} (level {})",
                    path, authorized.claims.subject, authorized.required
                );
            }
            Err(denial) => {
                self.inner.metrics.record_denied(*denial);
                info!("Denied {}: {} ({})", path, denial.code(), denial);
            }
        }

        result
    }

    /// [`authorize`](Self::authorize) using the request's own header and path.
    pub async fn authorize_request<B>(&self, req: &Request<B>) -> Result<Authorized, Denial> {
        self.authorize(
            credentials::authorization_header(req.headers()),
            req.uri().path(),
        )
        .await
    }

    async fn evaluate(
        &self,
        authorization: Option<&HeaderValue>,
        path: &str,
    ) -> Result<Authorized, Denial> {
        let bearer = credentials::bearer_token(authorization)?;
        let parts = TokenParts::split(bearer)?;

        let claims = token::decode(parts.payload).map_err(|e| {
            debug!("Payload decode failed: {}", e);
            Denial::MalformedCredential
        })?;

        token::verify(&self.inner.key, parts.header, parts.payload, parts.signature)
            .map_err(|_| Denial::InvalidSignature)?;

        if claims.is_expired_at(unix_now()) {
            return Err(Denial::Expired);
        }

        self.check_session(&claims.subject, parts.signature).await?;

        let required = self
            .inner
            .permissions
            .resolve(path)
            .ok_or(Denial::EndpointNotRecognized)?;

        if !claims.has_role(required) {
            return Err(Denial::AccessDenied);
        }

        Ok(Authorized {
            signature: parts.signature.to_string(),
            claims,
            required,
        })
    }

    /// Fail closed: absence, backend errors and timeouts all deny.
    async fn check_session(&self, subject: &str, signature: &str) -> Result<(), Denial> {
        let key = SessionKey::new(subject, signature);

        match self.inner.store.get(&key).await {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound) => {
                debug!("No session record for {}", subject);
                Err(Denial::SessionNotFound)
            }
            Err(e) => {
                warn!("Session lookup failed for {}: {}", subject, e);
                Err(Denial::SessionNotFound)
            }
        }
    }
}

/// Current Unix timestamp in seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
