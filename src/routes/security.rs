use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::AppState;
use crate::models::AccessStatistics;

use super::insights::UserQuery;

#[derive(Serialize)]
pub struct SecurityOverview {
    pub user_id: Uuid,
    pub security_score: u8,
    pub rate_limited: bool,
    pub verification_required: bool,
    pub access_statistics: AccessStatistics,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/security/score", get(get_security_overview))
        .with_state(state)
}

async fn get_security_overview(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Json<SecurityOverview> {
    let user_id = params.user_id;
    Json(SecurityOverview {
        user_id,
        security_score: state.auditor.security_score(user_id),
        rate_limited: state.auditor.is_rate_limited(user_id),
        verification_required: state.auditor.requires_verification(user_id),
        access_statistics: state.auditor.access_statistics(user_id),
    })
}
