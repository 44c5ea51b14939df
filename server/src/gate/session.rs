use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use shared::types::{Claims, PermissionLevel, SessionKey, SessionRecord};

use crate::gate::{AuthError, AuthGate, unix_now};
use crate::token;

/// A freshly issued session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    /// `header.payload.signature`, to be sent as `Bearer <token>`.
    pub token: String,
    /// Revocation handle together with the subject.
    pub signature: String,
    pub expires_at: i64,
}

impl AuthGate {
    /// Mint a token and record its session.
    ///
    /// The token is only returned once the session record has been written;
    /// if the write fails no token exists.
    pub async fn issue_session(
        &self,
        subject: &str,
        user_agent: &str,
        roles: Vec<PermissionLevel>,
        shop_id: Option<i64>,
        company_id: Option<i64>,
    ) -> Result<IssuedToken, AuthError> {
        let now = unix_now();
        let claims = Claims::new(
            subject,
            roles,
            shop_id,
            company_id,
            now,
            i64::try_from(self.inner.validity.as_secs()).unwrap_or(i64::MAX),
        )
        .with_token_id(Uuid::new_v4().to_string());

        let encoded = token::encode(&self.inner.key, &claims)?;

        let key = SessionKey::new(subject, &encoded.signature);
        let record = SessionRecord {
            payload: encoded.payload,
            user_agent: user_agent.to_string(),
            created_at: now,
        };

        self.inner.store.put(&key, &record).await.map_err(|e| {
            error!("Failed to save session for {}: {}", subject, e);
            e
        })?;

        info!("Session issued for {} (expires at {})", subject, claims.expires_at);

        Ok(IssuedToken {
            token: encoded.token,
            signature: encoded.signature,
            expires_at: claims.expires_at,
        })
    }

    /// Delete the session record; the token stops working immediately.
    pub async fn revoke_session(&self, subject: &str, signature: &str) -> Result<(), AuthError> {
        let key = SessionKey::new(subject, signature);

        self.inner.store.delete(&key).await.map_err(|e| {
            if !e.is_not_found() {
                error!("Failed to revoke session for {}: {}", subject, e);
            }
            e
        })?;

        info!("Session revoked for {}", subject);
        Ok(())
    }
}
