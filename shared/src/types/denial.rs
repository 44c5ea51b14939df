use http::StatusCode;
use thiserror::Error;

/// Why the gate refused a request.
///
/// Every variant is an expected, client-recoverable outcome (the client
/// re-authenticates). Internal failures never end up here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denial {
    #[error("missing authorization header")]
    MissingCredential,

    #[error("malformed authorization credential")]
    MalformedCredential,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("session not found or invalid")]
    SessionNotFound,

    #[error("access denied: endpoint not recognized")]
    EndpointNotRecognized,

    #[error("access denied")]
    AccessDenied,
}

impl Denial {
    pub const ALL: [Denial; 7] = [
        Denial::MissingCredential,
        Denial::MalformedCredential,
        Denial::InvalidSignature,
        Denial::Expired,
        Denial::SessionNotFound,
        Denial::EndpointNotRecognized,
        Denial::AccessDenied,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::MalformedCredential => "MALFORMED_CREDENTIAL",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Expired => "TOKEN_EXPIRED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::EndpointNotRecognized => "ENDPOINT_NOT_RECOGNIZED",
            Self::AccessDenied => "ACCESS_DENIED",
        }
    }

    /// 401 asks the client to authenticate again, 403 means the credential
    /// was understood and refused.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredential
            | Self::MalformedCredential
            | Self::Expired
            | Self::SessionNotFound => StatusCode::UNAUTHORIZED,
            Self::InvalidSignature | Self::EndpointNotRecognized | Self::AccessDenied => {
                StatusCode::FORBIDDEN
            }
        }
    }
}
