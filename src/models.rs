use serde::{ Serialize, Deserialize };
use uuid::Uuid;
use chrono::{NaiveDate, DateTime, Utc};
use std::collections::BTreeMap;

/// One logged menstrual cycle. Read-only to the analytics core; rows are
/// created by the logging routes.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CycleRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    /// When present, always >= start_date (enforced at logging time).
    pub end_date: Option<NaiveDate>,
    pub flow_intensity: Option<String>,
    pub mood: Option<String>,
    pub notes: Option<String>,
    pub is_predicted: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SymptomEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cycle_id: Option<Uuid>,
    pub date: NaiveDate,
    pub symptom_type: String,
    /// 1 (mild) to 5 (severe).
    pub severity: i16,
    pub notes: Option<String>,
}

/// One health-data read, as reported by the request layer. Lives only in the
/// auditor's one-hour rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    pub user_id: Uuid,
    pub action: String,
    pub ip_hash: String,
    pub user_agent_hash: String,
    pub timestamp: DateTime<Utc>,
}

/// Long-lived per-user access counters, updated incrementally on every event
/// and kept in the key-value store with a 30-day TTL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessStatistics {
    pub total_accesses: u64,
    pub action_counts: BTreeMap<String, u64>,
    /// Rolling per-day counts; days older than 30 days are evicted.
    pub daily_counts: BTreeMap<NaiveDate, u64>,
    pub last_access: Option<DateTime<Utc>>,
}
