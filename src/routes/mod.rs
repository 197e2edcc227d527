use std::sync::Arc;

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::{self, AccessAuditor};
use crate::service::InsightsService;

pub mod insights;
pub mod security;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub service: Arc<InsightsService>,
    pub auditor: Arc<AccessAuditor>,
}

fn hash16(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Reports one health-data read to the auditor. Fire-and-forget: the verdict
/// and its alerts are handled inside the auditor and never fail the request.
pub fn report_access(state: &AppState, user_id: Uuid, action: &str, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    };
    let event = audit::event_now(
        user_id,
        action,
        hash16(header("x-forwarded-for")),
        hash16(header("user-agent")),
    );
    state.auditor.record_access(event);
}
