pub mod claims;
pub mod denial;
pub mod json_error;
pub mod server_config;
pub mod session;

pub use self::claims::{Claims, PermissionLevel, TokenHeader};
pub use self::denial::Denial;
pub use self::json_error::ErrorResponse;
pub use self::server_config::{AppConfig, AuthConfig, ConfigError, ServerConfig, StoreConfig};
pub use self::session::{SessionKey, SessionRecord};
