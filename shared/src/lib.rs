//! Wire types and configuration shared by the authgate server and its
//! clients.

pub mod config;
pub mod types;
