use std::fmt;

use serde::{Deserialize, Serialize};

/// Value stored for every live session.
///
/// Only its existence matters to the gate; the fields are kept for auditing
/// and for listing a user's sessions from an admin tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Encoded (base64url) payload segment of the token.
    pub payload: String,
    #[serde(rename = "userAgent")]
    pub user_agent: String,
    pub created_at: i64,
}

/// Store key of a session: `subject:signature`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(subject: &str, signature: &str) -> Self {
        Self(format!("{}:{}", subject, signature))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
