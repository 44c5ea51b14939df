use thiserror::Error;

use crate::database::StoreError;
use crate::token::CodecError;

/// Failures of session issuance and revocation.
///
/// These are internal errors, never request denials: a caller must not turn
/// them into a 401/403.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token encoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("session store failure: {0}")]
    Store(#[from] StoreError),
}
