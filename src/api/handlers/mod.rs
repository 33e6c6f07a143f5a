//! API request handlers.

/// Synchronous research endpoint.
pub mod research;
/// WebSocket streaming endpoint.
pub mod stream;

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
