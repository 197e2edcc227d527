use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{CycleRecord, SymptomEntry};

/// Read-only view of a user's logged history. The analytics core depends on
/// this interface alone and never writes through it.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Most-recent-first, at most `limit` rows.
    async fn recent_cycles(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CycleRecord>, RepositoryError>;

    /// Entries on or after `since`, most-recent-first.
    async fn symptoms_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<SymptomEntry>, RepositoryError>;
}

pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn recent_cycles(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CycleRecord>, RepositoryError> {
        let records = sqlx::query_as::<_, CycleRecord>(
            r#"
            SELECT id, user_id, start_date, end_date, flow_intensity, mood, notes, is_predicted
            FROM cycles
            WHERE user_id = $1
            ORDER BY start_date DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn symptoms_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<SymptomEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, SymptomEntry>(
            r#"
            SELECT id, user_id, cycle_id, date, symptom_type, severity, notes
            FROM symptom_entries
            WHERE user_id = $1 AND date >= $2
            ORDER BY date DESC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

/// In-memory repository used by the integration tests.
#[derive(Default)]
pub struct InMemoryHistoryRepository {
    cycles: RwLock<Vec<CycleRecord>>,
    symptoms: RwLock<Vec<SymptomEntry>>,
}

impl InMemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cycle(&self, record: CycleRecord) {
        self.cycles.write().push(record);
    }

    pub fn add_symptom(&self, entry: SymptomEntry) {
        self.symptoms.write().push(entry);
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn recent_cycles(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CycleRecord>, RepositoryError> {
        let mut records: Vec<CycleRecord> = self
            .cycles
            .read()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        records.truncate(limit as usize);
        Ok(records)
    }

    async fn symptoms_since(
        &self,
        user_id: Uuid,
        since: NaiveDate,
    ) -> Result<Vec<SymptomEntry>, RepositoryError> {
        let mut entries: Vec<SymptomEntry> = self
            .symptoms
            .read()
            .iter()
            .filter(|s| s.user_id == user_id && s.date >= since)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }
}
