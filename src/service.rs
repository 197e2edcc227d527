use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{ComputationKind, ResultCache};
use crate::engine::notifications::{self, NotificationBundle};
use crate::engine::phase::{self, PhaseResult};
use crate::engine::prediction::{self, Prediction};
use crate::engine::recommendations::{self, RecommendationSet};
use crate::engine::statistics::{self, CycleStatistics, MAX_CYCLES_ANALYZED};
use crate::engine::symptoms::{self, LOOKBACK_DAYS};
use crate::models::{CycleRecord, SymptomEntry};
use crate::repository::HistoryRepository;

/// Aggregate returned by the dashboard endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub statistics: CycleStatistics,
    pub phase: PhaseResult,
    pub prediction: Prediction,
    pub notifications: NotificationBundle,
}

/// Composition root for the analytics engines: reads snapshots through the
/// repository, runs the engines over them, and memoizes results per user.
/// Every public method resolves failures to a safe default; none of them
/// surface errors to the route layer.
pub struct InsightsService {
    repository: Arc<dyn HistoryRepository>,
    cache: ResultCache,
}

impl InsightsService {
    pub fn new(repository: Arc<dyn HistoryRepository>, cache: ResultCache) -> Self {
        Self { repository, cache }
    }

    /// Snapshot fetch helpers: a repository failure is logged and surfaces as
    /// `None` so callers can fall back without caching the degraded result.
    async fn cycles(&self, user_id: Uuid) -> Option<Vec<CycleRecord>> {
        match self
            .repository
            .recent_cycles(user_id, MAX_CYCLES_ANALYZED as i64)
            .await
        {
            Ok(records) => Some(records),
            Err(err) => {
                tracing::error!(%user_id, error = %err, "failed to read cycle history");
                None
            }
        }
    }

    async fn symptoms(&self, user_id: Uuid, since: NaiveDate) -> Option<Vec<SymptomEntry>> {
        match self.repository.symptoms_since(user_id, since).await {
            Ok(entries) => Some(entries),
            Err(err) => {
                tracing::error!(%user_id, error = %err, "failed to read symptom history");
                None
            }
        }
    }

    pub async fn statistics(&self, user_id: Uuid) -> CycleStatistics {
        if let Some(hit) = self.cache.get(ComputationKind::Statistics, user_id) {
            return hit;
        }
        let Some(cycles) = self.cycles(user_id).await else {
            return CycleStatistics::insufficient(0);
        };
        let result = statistics::analyze(&cycles);
        self.cache.store(ComputationKind::Statistics, user_id, &result);
        result
    }

    pub async fn phase(&self, user_id: Uuid, today: NaiveDate) -> PhaseResult {
        let latest_start = self
            .cycles(user_id)
            .await
            .and_then(|cycles| cycles.first().map(|c| c.start_date));
        phase::classify(latest_start, today)
    }

    pub async fn prediction(&self, user_id: Uuid, today: NaiveDate) -> Prediction {
        let Some(cycles) = self.cycles(user_id).await else {
            return Prediction::Unavailable { cycles_available: 0 };
        };
        prediction::predict(&cycles, today)
    }

    pub async fn recommendations(&self, user_id: Uuid, today: NaiveDate) -> RecommendationSet {
        if let Some(hit) = self.cache.get(ComputationKind::Recommendations, user_id) {
            return hit;
        }
        let stats = self.statistics(user_id).await;
        let patterns = match self
            .symptoms(user_id, today - Duration::days(LOOKBACK_DAYS))
            .await
        {
            Some(entries) => symptoms::analyze(&entries),
            None => Vec::new(),
        };
        let result = recommendations::generate(&stats, &patterns);
        self.cache
            .store(ComputationKind::Recommendations, user_id, &result);
        result
    }

    pub async fn notifications(&self, user_id: Uuid, today: NaiveDate) -> NotificationBundle {
        if let Some(hit) = self.cache.get(ComputationKind::Notifications, user_id) {
            return hit;
        }
        let result = self.compute_notifications(user_id, today).await;
        self.cache
            .store(ComputationKind::Notifications, user_id, &result);
        result
    }

    async fn compute_notifications(&self, user_id: Uuid, today: NaiveDate) -> NotificationBundle {
        let cycles = self.cycles(user_id).await.unwrap_or_default();
        let recent = self
            .symptoms(
                user_id,
                today - Duration::days(notifications::SEVERE_SYMPTOM_LOOKBACK_DAYS),
            )
            .await
            .unwrap_or_default();
        let prediction = prediction::predict(&cycles, today);
        notifications::evaluate(&cycles, &recent, &prediction, today)
    }

    pub async fn dashboard(&self, user_id: Uuid, today: NaiveDate) -> DashboardSummary {
        if let Some(hit) = self.cache.get(ComputationKind::Dashboard, user_id) {
            return hit;
        }
        let cycles = self.cycles(user_id).await.unwrap_or_default();
        let latest_start = cycles.first().map(|c| c.start_date);
        let summary = DashboardSummary {
            statistics: statistics::analyze(&cycles),
            phase: phase::classify(latest_start, today),
            prediction: prediction::predict(&cycles, today),
            notifications: self.compute_notifications(user_id, today).await,
        };
        self.cache.store(ComputationKind::Dashboard, user_id, &summary);
        summary
    }

    /// New logged data makes every memoized view stale at once.
    pub fn invalidate_user(&self, user_id: Uuid) {
        for kind in [
            ComputationKind::Dashboard,
            ComputationKind::Statistics,
            ComputationKind::Recommendations,
            ComputationKind::Notifications,
        ] {
            self.cache.invalidate(kind, user_id);
        }
    }
}
