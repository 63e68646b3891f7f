//! Per-request access log.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Log method, path, status and latency of every request.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = started.elapsed().as_millis();
    if status.is_server_error() {
        log::warn!("{method} {path} -> {} ({elapsed} ms)", status.as_u16());
    } else {
        log::info!("{method} {path} -> {} ({elapsed} ms)", status.as_u16());
    }
    response
}
