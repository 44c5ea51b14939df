//! Bearer-token authentication and per-endpoint authorization for hyper/tower
//! services.
//!
//! Tokens are `header.payload.signature` (base64url, HMAC-SHA256). A token is
//! only honoured while its session record exists in the [`SessionStore`], so
//! deleting the record revokes it immediately. Each path resolves to a
//! required permission level through a [`PermissionTable`]; the caller must
//! hold that level among its roles.
//!
//! [`SessionStore`]: database::SessionStore
//! [`PermissionTable`]: permission::PermissionTable

pub mod database;
pub mod gate;
pub mod handlers;
pub mod permission;
pub mod security;
pub mod serve;
pub mod token;
pub mod tower_middle;

use std::sync::Arc;

use shared::types::AppConfig;

pub use gate::AuthGate;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub gate: AuthGate,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(gate: AuthGate, config: AppConfig) -> Self {
        Self {
            gate,
            config: Arc::new(config),
        }
    }
}
