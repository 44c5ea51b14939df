use serde::{Deserialize, Serialize};

use crate::types::denial::Denial;

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            status: "error".to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<Denial> for ErrorResponse {
    fn from(denial: Denial) -> Self {
        Self::new(denial.code(), &denial.to_string())
    }
}
