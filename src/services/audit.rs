//! Security and audit trail events.
//!
//! Events are ordinary `tracing` events on dedicated targets so they can be
//! routed separately (`RUST_LOG=security=info,audit=info`, or a Loki label
//! filter). Authentication activity goes to `security`, data changes go to
//! `audit`.

use tracing::{info, warn};

/// Where a request came from.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: String,
    pub user_agent: String,
}

impl ClientMeta {
    /// Picks the first hop of `X-Forwarded-For` when present, else the peer
    /// address.
    #[must_use]
    pub fn new(forwarded_for: Option<&str>, peer: Option<String>, user_agent: Option<&str>) -> Self {
        let ip = forwarded_for
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or(peer)
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            ip,
            user_agent: user_agent.unwrap_or_default().to_string(),
        }
    }
}

pub fn login_succeeded(user_id: i32, email: &str, client: &ClientMeta) {
    info!(
        target: "security",
        event = "login_success",
        user_id,
        email,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "User logged in"
    );
}

pub fn login_failed(email: &str, reason: &str, client: &ClientMeta) {
    warn!(
        target: "security",
        event = "login_failed",
        email,
        reason,
        ip = %client.ip,
        user_agent = %client.user_agent,
        "Login failed"
    );
}

pub fn logged_out(user_id: Option<i32>, client: &ClientMeta) {
    info!(
        target: "security",
        event = "logout",
        user_id,
        ip = %client.ip,
        "User logged out"
    );
}

pub fn password_changed(user_id: i32, client: &ClientMeta) {
    info!(
        target: "security",
        event = "password_changed",
        user_id,
        ip = %client.ip,
        "Password changed"
    );
}

pub fn permission_denied(user_id: i32, resource: &str, client: &ClientMeta) {
    warn!(
        target: "security",
        event = "permission_denied",
        user_id,
        resource,
        ip = %client.ip,
        "Permission denied"
    );
}

pub fn user_created(actor_id: i32, user_id: i32, email: &str, role: &str) {
    info!(target: "audit", event = "user_created", actor_id, user_id, email, role, "User created");
}

pub fn user_updated(actor_id: i32, user_id: i32) {
    info!(target: "audit", event = "user_updated", actor_id, user_id, "User updated");
}

pub fn role_changed(actor_id: i32, user_id: i32, old_role: &str, new_role: &str) {
    warn!(
        target: "audit",
        event = "role_changed",
        actor_id,
        user_id,
        old_role,
        new_role,
        "User role changed"
    );
}

pub fn user_deleted(actor_id: i32, user_id: i32, email: &str) {
    warn!(target: "audit", event = "user_deleted", actor_id, user_id, email, "User deleted");
}

pub fn certificate_changed(action: &'static str, actor_id: i32, certificate_id: i32, owner_id: i32) {
    info!(
        target: "audit",
        event = action,
        actor_id,
        certificate_id,
        owner_id,
        "Certificate {action}"
    );
}

pub fn file_uploaded(actor_id: i32, kind: &'static str, path: &str, bytes: usize) {
    info!(
        target: "audit",
        event = "file_uploaded",
        actor_id,
        kind,
        path,
        bytes,
        "File uploaded"
    );
}
