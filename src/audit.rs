use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::KeyValueCache;
use crate::models::{AccessEvent, AccessStatistics};

/// Rolling anomaly window over health-data reads.
pub const WINDOW_SECONDS: i64 = 3600;
/// Strictly more events than this within the window is anomalous.
pub const HIGH_FREQUENCY_THRESHOLD: usize = 10;
pub const MAX_DISTINCT_IPS: usize = 3;
pub const MAX_DISTINCT_USER_AGENTS: usize = 2;

pub const RATE_LIMIT_TTL: Duration = Duration::from_secs(30 * 60);
pub const VERIFICATION_TTL: Duration = Duration::from_secs(60 * 60);
const SUSPICIOUS_TTL: Duration = Duration::from_secs(WINDOW_SECONDS as u64);
const STATISTICS_TTL: Duration = Duration::from_secs(30 * 24 * 3600);
const STATISTICS_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyFlag {
    HighFrequencyAccess,
    MultipleIpAddresses,
    MultipleUserAgents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditVerdict {
    pub flags: Vec<AnomalyFlag>,
    pub event_count: usize,
    pub distinct_ips: usize,
    pub distinct_user_agents: usize,
    /// Two or more simultaneous flags escalate to manual review.
    pub critical: bool,
}

impl AuditVerdict {
    fn clean(event_count: usize, distinct_ips: usize, distinct_user_agents: usize) -> Self {
        Self {
            flags: Vec::new(),
            event_count,
            distinct_ips,
            distinct_user_agents,
            critical: false,
        }
    }
}

/// Sliding-window anomaly detector and long-lived access-statistics
/// aggregator. All state lives in the injected key-value store; a per-user
/// lock makes the window's read-modify-write atomic so concurrent reads
/// cannot drop events that would have tripped a flag.
pub struct AccessAuditor {
    store: Arc<dyn KeyValueCache>,
    window_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AccessAuditor {
    pub fn new(store: Arc<dyn KeyValueCache>) -> Self {
        Self {
            store,
            window_locks: Mutex::new(HashMap::new()),
        }
    }

    fn window_key(user_id: Uuid) -> String {
        format!("audit:window:{user_id}")
    }

    fn stats_key(user_id: Uuid) -> String {
        format!("audit:stats:{user_id}")
    }

    fn suspicious_key(user_id: Uuid) -> String {
        format!("audit:suspicious:{user_id}")
    }

    fn rate_limit_key(user_id: Uuid) -> String {
        format!("audit:rate_limit:{user_id}")
    }

    fn verification_key(user_id: Uuid) -> String {
        format!("audit:verify:{user_id}")
    }

    fn alert_count_key(user_id: Uuid) -> String {
        format!("audit:alerts:{user_id}")
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        self.window_locks
            .lock()
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Records one health-data read: appends to the rolling window, updates
    /// the long-lived statistics, then evaluates the anomaly rules. The
    /// statistics update happens regardless of the evaluation outcome, and
    /// nothing here ever fails the audited operation.
    pub fn record_access(&self, event: AccessEvent) -> AuditVerdict {
        let user_id = event.user_id;
        let lock = self.user_lock(user_id);
        let _guard = lock.lock();

        let window = self.append_and_prune(&event);
        self.update_statistics(&event);
        self.evaluate(user_id, &window)
    }

    fn append_and_prune(&self, event: &AccessEvent) -> Vec<AccessEvent> {
        let key = Self::window_key(event.user_id);
        let mut window: Vec<AccessEvent> = self
            .store
            .get(&key)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        window.push(event.clone());
        let cutoff = event.timestamp - ChronoDuration::seconds(WINDOW_SECONDS);
        window.retain(|e| e.timestamp > cutoff);

        match serde_json::to_value(&window) {
            Ok(encoded) => self.store.set(
                &key,
                encoded,
                Duration::from_secs(WINDOW_SECONDS as u64),
            ),
            Err(err) => tracing::warn!(error = %err, "failed to persist access window"),
        }
        window
    }

    fn update_statistics(&self, event: &AccessEvent) {
        let key = Self::stats_key(event.user_id);
        let mut stats: AccessStatistics = self
            .store
            .get(&key)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        stats.total_accesses += 1;
        *stats.action_counts.entry(event.action.clone()).or_insert(0) += 1;
        let day = event.timestamp.date_naive();
        *stats.daily_counts.entry(day).or_insert(0) += 1;
        let oldest_kept = day - ChronoDuration::days(STATISTICS_WINDOW_DAYS);
        stats.daily_counts.retain(|&d, _| d > oldest_kept);
        stats.last_access = Some(event.timestamp);

        match serde_json::to_value(&stats) {
            Ok(encoded) => self.store.set(&key, encoded, STATISTICS_TTL),
            Err(err) => tracing::warn!(error = %err, "failed to persist access statistics"),
        }
    }

    fn evaluate(&self, user_id: Uuid, window: &[AccessEvent]) -> AuditVerdict {
        let distinct_ips: HashSet<&str> = window.iter().map(|e| e.ip_hash.as_str()).collect();
        let distinct_agents: HashSet<&str> =
            window.iter().map(|e| e.user_agent_hash.as_str()).collect();

        let mut flags = Vec::new();
        if window.len() > HIGH_FREQUENCY_THRESHOLD {
            flags.push(AnomalyFlag::HighFrequencyAccess);
        }
        if distinct_ips.len() > MAX_DISTINCT_IPS {
            flags.push(AnomalyFlag::MultipleIpAddresses);
        }
        if distinct_agents.len() > MAX_DISTINCT_USER_AGENTS {
            flags.push(AnomalyFlag::MultipleUserAgents);
        }

        if flags.is_empty() {
            return AuditVerdict::clean(window.len(), distinct_ips.len(), distinct_agents.len());
        }

        let critical = flags.len() >= 2;
        tracing::warn!(
            %user_id,
            ?flags,
            event_count = window.len(),
            distinct_ips = distinct_ips.len(),
            distinct_user_agents = distinct_agents.len(),
            "anomalous health-data access pattern"
        );
        self.store
            .increment(&Self::alert_count_key(user_id), STATISTICS_TTL);
        self.store.set(
            &Self::suspicious_key(user_id),
            serde_json::Value::Bool(true),
            SUSPICIOUS_TTL,
        );

        if flags.contains(&AnomalyFlag::HighFrequencyAccess) {
            self.store.set(
                &Self::rate_limit_key(user_id),
                serde_json::Value::Bool(true),
                RATE_LIMIT_TTL,
            );
        }
        if flags.contains(&AnomalyFlag::MultipleIpAddresses)
            || flags.contains(&AnomalyFlag::MultipleUserAgents)
        {
            self.store.set(
                &Self::verification_key(user_id),
                serde_json::Value::Bool(true),
                VERIFICATION_TTL,
            );
        }

        if critical {
            tracing::error!(
                %user_id,
                ?flags,
                "multiple simultaneous access anomalies, flagging for manual review"
            );
        }

        AuditVerdict {
            flags,
            event_count: window.len(),
            distinct_ips: distinct_ips.len(),
            distinct_user_agents: distinct_agents.len(),
            critical,
        }
    }

    fn flag_set(&self, key: &str) -> bool {
        matches!(self.store.get(key), Some(serde_json::Value::Bool(true)))
    }

    pub fn is_rate_limited(&self, user_id: Uuid) -> bool {
        self.flag_set(&Self::rate_limit_key(user_id))
    }

    pub fn requires_verification(&self, user_id: Uuid) -> bool {
        self.flag_set(&Self::verification_key(user_id))
    }

    /// 100 minus deductions for currently-set flags, floored at 0.
    pub fn security_score(&self, user_id: Uuid) -> u8 {
        let mut score: i32 = 100;
        if self.flag_set(&Self::suspicious_key(user_id)) {
            score -= 20;
        }
        if self.is_rate_limited(user_id) {
            score -= 15;
        }
        if self.requires_verification(user_id) {
            score -= 10;
        }
        score.max(0) as u8
    }

    pub fn access_statistics(&self, user_id: Uuid) -> AccessStatistics {
        self.store
            .get(&Self::stats_key(user_id))
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}

/// Builds the access event the route layer reports for one health-data read.
pub fn event_now(user_id: Uuid, action: &str, ip_hash: String, user_agent_hash: String) -> AccessEvent {
    AccessEvent {
        user_id,
        action: action.to_string(),
        ip_hash,
        user_agent_hash,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryTtlCache;
    use chrono::{DateTime, TimeZone};

    fn auditor() -> AccessAuditor {
        AccessAuditor::new(Arc::new(InMemoryTtlCache::new()))
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, minute, 0).unwrap()
    }

    fn event(user_id: Uuid, ip: &str, ua: &str, minute: u32) -> AccessEvent {
        AccessEvent {
            user_id,
            action: "view_statistics".to_string(),
            ip_hash: ip.to_string(),
            user_agent_hash: ua.to_string(),
            timestamp: at(minute),
        }
    }

    #[test]
    fn quiet_usage_raises_no_flags() {
        let auditor = auditor();
        let user = Uuid::new_v4();
        for minute in 0..5 {
            let verdict = auditor.record_access(event(user, "ip-1", "ua-1", minute));
            assert!(verdict.flags.is_empty());
            assert!(!verdict.critical);
        }
        assert_eq!(auditor.security_score(user), 100);
    }

    #[test]
    fn burst_across_four_ips_is_critical() {
        // 12 events within 59 minutes over 4 distinct ip hashes
        let auditor = auditor();
        let user = Uuid::new_v4();
        let mut last = AuditVerdict::clean(0, 0, 0);
        for i in 0..12u32 {
            let ip = format!("ip-{}", i % 4);
            last = auditor.record_access(event(user, &ip, "ua-1", i * 5));
        }
        assert!(last.flags.contains(&AnomalyFlag::HighFrequencyAccess));
        assert!(last.flags.contains(&AnomalyFlag::MultipleIpAddresses));
        assert!(!last.flags.contains(&AnomalyFlag::MultipleUserAgents));
        assert!(last.critical);
        assert_eq!(last.event_count, 12);
        assert_eq!(last.distinct_ips, 4);

        assert!(auditor.is_rate_limited(user));
        assert!(auditor.requires_verification(user));
        assert_eq!(auditor.security_score(user), 55);
    }

    #[test]
    fn events_older_than_an_hour_fall_out_of_the_window() {
        let auditor = auditor();
        let user = Uuid::new_v4();
        for i in 0..8u32 {
            auditor.record_access(event(user, "ip-1", "ua-1", i));
        }
        // 61+ minutes later: the old burst no longer counts
        let late = AccessEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 10, 13, 10, 0).unwrap(),
            ..event(user, "ip-1", "ua-1", 0)
        };
        let verdict = auditor.record_access(late);
        assert_eq!(verdict.event_count, 1);
    }

    #[test]
    fn three_user_agents_requires_verification_only() {
        let auditor = auditor();
        let user = Uuid::new_v4();
        let mut last = AuditVerdict::clean(0, 0, 0);
        for (i, ua) in ["ua-1", "ua-2", "ua-3"].iter().enumerate() {
            last = auditor.record_access(event(user, "ip-1", ua, i as u32));
        }
        assert_eq!(last.flags, vec![AnomalyFlag::MultipleUserAgents]);
        assert!(!last.critical);
        assert!(!auditor.is_rate_limited(user));
        assert!(auditor.requires_verification(user));
        // suspicious (-20) and verification (-10)
        assert_eq!(auditor.security_score(user), 70);
    }

    #[test]
    fn statistics_accumulate_independently_of_flags() {
        let auditor = auditor();
        let user = Uuid::new_v4();
        auditor.record_access(event(user, "ip-1", "ua-1", 0));
        auditor.record_access(AccessEvent {
            action: "view_dashboard".to_string(),
            ..event(user, "ip-1", "ua-1", 5)
        });

        let stats = auditor.access_statistics(user);
        assert_eq!(stats.total_accesses, 2);
        assert_eq!(stats.action_counts.get("view_statistics"), Some(&1));
        assert_eq!(stats.action_counts.get("view_dashboard"), Some(&1));
        assert_eq!(stats.last_access, Some(at(5)));
        assert_eq!(stats.daily_counts.values().sum::<u64>(), 2);
    }

    #[test]
    fn per_user_state_is_isolated() {
        let auditor = auditor();
        let noisy = Uuid::new_v4();
        let calm = Uuid::new_v4();
        for i in 0..12u32 {
            auditor.record_access(event(noisy, &format!("ip-{i}"), "ua-1", i));
        }
        let verdict = auditor.record_access(event(calm, "ip-1", "ua-1", 30));
        assert!(verdict.flags.is_empty());
        assert_eq!(auditor.security_score(calm), 100);
        assert!(auditor.security_score(noisy) < 100);
    }
}
