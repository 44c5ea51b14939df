use hyper::header::{self, HeaderMap};
use tracing::debug;

/// Extract a header value as a string
pub fn get_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(|s| {
        debug!("Retrieved header: {}", name);
        s.to_string()
    })
}

/// User agent recorded with an issued session; empty when the client sent none.
pub fn get_user_agent(headers: &HeaderMap) -> String {
    get_header_value(headers, header::USER_AGENT.as_str()).unwrap_or_default()
}
