/// Tower middleware module
///
/// Contains the layer that puts the auth gate in front of a service.
pub mod tower_auth;

pub use tower_auth::{AuthLayer, AuthService};
