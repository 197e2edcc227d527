use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{report_access, AppState};
use crate::engine::notifications::NotificationBundle;
use crate::engine::phase::PhaseResult;
use crate::engine::prediction::Prediction;
use crate::engine::recommendations::RecommendationSet;
use crate::engine::statistics::CycleStatistics;
use crate::service::DashboardSummary;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

#[derive(Deserialize)]
pub struct NewCycle {
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub flow_intensity: Option<String>,
    pub mood: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct NewSymptom {
    pub user_id: Uuid,
    pub cycle_id: Option<Uuid>,
    pub date: NaiveDate,
    pub symptom_type: String,
    pub severity: i16,
    pub notes: Option<String>,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/cycle", post(log_cycle))
        .route("/symptom", post(log_symptom))
        .route("/statistics", get(get_statistics))
        .route("/phase", get(get_phase))
        .route("/prediction", get(get_prediction))
        .route("/recommendations", get(get_recommendations))
        .route("/notifications", get(get_notifications))
        .route("/dashboard", get(get_dashboard))
        .with_state(state)
}

fn log_db_error(e: &sqlx::Error) {
    if let Some(db_err) = e.as_database_error() {
        tracing::error!("❌ DB insert failed: {}", db_err.message());
        if let Some(constraint) = db_err.constraint() {
            tracing::info!("🔒 Constraint violated: {}", constraint);
        }
    } else {
        tracing::error!("❌ Unknown DB error: {}", e);
    }
}

async fn log_cycle(
    State(state): State<AppState>,
    Json(body): Json<NewCycle>,
) -> Result<StatusCode, (StatusCode, String)> {
    if let Some(end) = body.end_date {
        if end < body.start_date {
            return Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                "end_date must not precede start_date".into(),
            ));
        }
    }

    sqlx::query(
        "INSERT INTO cycles (id, user_id, start_date, end_date, flow_intensity, mood, notes, is_predicted)
         VALUES ($1, $2, $3, $4, $5, $6, $7, false)",
    )
    .bind(Uuid::new_v4())
    .bind(body.user_id)
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(body.flow_intensity)
    .bind(body.mood)
    .bind(body.notes)
    .execute(&state.pool)
    .await
    .map_err(|e| {
        log_db_error(&e);
        (StatusCode::UNPROCESSABLE_ENTITY, "DB error".into())
    })?;

    state.service.invalidate_user(body.user_id);
    Ok(StatusCode::CREATED)
}

async fn log_symptom(
    State(state): State<AppState>,
    Json(body): Json<NewSymptom>,
) -> Result<StatusCode, (StatusCode, String)> {
    if !(1..=5).contains(&body.severity) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "severity must be between 1 and 5".into(),
        ));
    }

    sqlx::query(
        "INSERT INTO symptom_entries (id, user_id, cycle_id, date, symptom_type, severity, notes)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::new_v4())
    .bind(body.user_id)
    .bind(body.cycle_id)
    .bind(body.date)
    .bind(body.symptom_type)
    .bind(body.severity)
    .bind(body.notes)
    .execute(&state.pool)
    .await
    .map_err(|e| {
        log_db_error(&e);
        (StatusCode::UNPROCESSABLE_ENTITY, "DB error".into())
    })?;

    state.service.invalidate_user(body.user_id);
    Ok(StatusCode::CREATED)
}

async fn get_statistics(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    headers: HeaderMap,
) -> Json<CycleStatistics> {
    report_access(&state, params.user_id, "view_statistics", &headers);
    Json(state.service.statistics(params.user_id).await)
}

async fn get_phase(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    headers: HeaderMap,
) -> Json<PhaseResult> {
    report_access(&state, params.user_id, "view_phase", &headers);
    let today = Utc::now().date_naive();
    Json(state.service.phase(params.user_id, today).await)
}

async fn get_prediction(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    headers: HeaderMap,
) -> Json<Prediction> {
    report_access(&state, params.user_id, "view_prediction", &headers);
    let today = Utc::now().date_naive();
    Json(state.service.prediction(params.user_id, today).await)
}

async fn get_recommendations(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    headers: HeaderMap,
) -> Json<RecommendationSet> {
    report_access(&state, params.user_id, "view_recommendations", &headers);
    let today = Utc::now().date_naive();
    Json(state.service.recommendations(params.user_id, today).await)
}

async fn get_notifications(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    headers: HeaderMap,
) -> Json<NotificationBundle> {
    report_access(&state, params.user_id, "view_notifications", &headers);
    let today = Utc::now().date_naive();
    Json(state.service.notifications(params.user_id, today).await)
}

async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
    headers: HeaderMap,
) -> Json<DashboardSummary> {
    report_access(&state, params.user_id, "view_dashboard", &headers);
    let today = Utc::now().date_naive();
    Json(state.service.dashboard(params.user_id, today).await)
}
