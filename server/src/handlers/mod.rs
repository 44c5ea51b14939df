pub mod auth;
pub mod headers;
pub mod json_response;
pub mod routes;

pub use routes::route;
