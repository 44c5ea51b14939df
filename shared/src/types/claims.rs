use serde::{Deserialize, Serialize};

/// Permission level as carried in a token's role set and in the rule table.
pub type PermissionLevel = i32;

/// Fixed header of every issued token.
///
/// Field order is part of the wire format: `{"alg":"HS256","typ":"TOKEN"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenHeader {
    pub alg: &'static str,
    pub typ: &'static str,
}

impl TokenHeader {
    pub const HS256: TokenHeader = TokenHeader {
        alg: "HS256",
        typ: "TOKEN",
    };
}

/// Claims embedded in every token issued by the gate.
///
/// The serialized field order is fixed by declaration order, which keeps the
/// encoded payload deterministic for a given set of values.
///
/// # Revocation
/// The claims alone never authorise a request. The session record stored
/// under `subject:signature` must also exist; deleting it revokes the token
/// even before `exp` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Opaque user/account id.
    #[serde(rename = "uuid")]
    pub subject: String,

    /// Permission levels held by the subject. Checked by membership only,
    /// a higher level never implies a lower one.
    #[serde(default)]
    pub roles: Vec<PermissionLevel>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,

    #[serde(rename = "aud", default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Expiry (Unix timestamp, seconds). A missing `exp` decodes as 0, which
    /// is always expired.
    #[serde(rename = "exp", default)]
    pub expires_at: i64,

    /// Unique token id, set on issuance so two sessions for one subject never
    /// share a signature.
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,

    /// Issued-at (Unix timestamp, seconds).
    #[serde(rename = "iat", default)]
    pub issued_at: i64,

    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    #[serde(rename = "nbf", default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,

    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub registered_subject: Option<String>,
}

impl Claims {
    /// Build the claims for a new session valid for `validity_secs` from
    /// `issued_at`.
    pub fn new(
        subject: impl Into<String>,
        roles: Vec<PermissionLevel>,
        shop_id: Option<i64>,
        company_id: Option<i64>,
        issued_at: i64,
        validity_secs: i64,
    ) -> Self {
        Self {
            subject: subject.into(),
            roles,
            shop_id,
            company_id,
            audience: None,
            expires_at: issued_at.saturating_add(validity_secs),
            token_id: None,
            issued_at,
            issuer: None,
            not_before: None,
            registered_subject: None,
        }
    }

    pub fn with_token_id(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    /// Membership test against the role set.
    pub fn has_role(&self, level: PermissionLevel) -> bool {
        self.roles.contains(&level)
    }

    /// `true` once `now` has reached the expiry instant.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}
