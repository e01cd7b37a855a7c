use axum::http::{HeaderMap, HeaderName};

static PREFER: HeaderName = HeaderName::from_static("prefer");

/// RFC 7240: `Prefer: respond-async` on a write request selects Queue Port
/// publication over a direct, synchronous Storage Engine write.
#[must_use]
pub fn wants_async(headers: &HeaderMap) -> bool {
    headers
        .get(&PREFER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.split(',').any(|token| token.trim() == "respond-async"))
}
