//! Request audit middleware.
//!
//! Runs outermost, so every request is recorded exactly once before any
//! authentication or routing decision, including requests that end in a
//! 401 or 404.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::audit::{AuditEntry, AuditLog};

/// Client address recorded when the peer address is unavailable.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Build the audit entry for an incoming request.
pub fn audit_entry(request: &Request) -> AuditEntry {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    AuditEntry::now(client_ip, user_agent, request.method().as_str(), url)
}

/// Axum middleware recording every request in the audit log.
pub async fn access_log_middleware(
    State(audit): State<AuditLog>,
    request: Request,
    next: Next,
) -> Response {
    audit.record(audit_entry(&request));
    next.run(request).await
}
