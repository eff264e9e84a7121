pub mod admin;
pub mod bookings;
pub mod health;
pub mod payment;
pub mod webhook;

use axum::http::HeaderMap;

/// Best-effort client key for rate limiting. Behind a proxy the first
/// X-Forwarded-For entry is the caller; otherwise everything collapses to
/// one bucket, which is still safe.
pub(crate) fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "local".to_string())
}
