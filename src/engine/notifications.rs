use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::engine::prediction::Prediction;
use crate::models::{CycleRecord, SymptomEntry};

/// Days since the last cycle start after which the period counts as overdue.
pub const OVERDUE_THRESHOLD_DAYS: i64 = 35;
/// Predicted days-until-next at or below which a reminder fires.
pub const REMINDER_WINDOW_DAYS: i64 = 3;
/// Symptom lookback for the severe-symptom flag.
pub const SEVERE_SYMPTOM_LOOKBACK_DAYS: i64 = 7;
pub const SEVERE_SYMPTOM_THRESHOLD: i16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: String,
    pub message: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationBundle {
    pub alerts: Vec<Notification>,
    pub reminders: Vec<Notification>,
    pub health_flags: Vec<Notification>,
    /// Always the exact sum of the three lists above.
    pub count: usize,
}

/// Evaluates all three threshold rules on every call; they may co-occur.
pub fn evaluate(
    cycles: &[CycleRecord],
    recent_symptoms: &[SymptomEntry],
    prediction: &Prediction,
    today: NaiveDate,
) -> NotificationBundle {
    let mut alerts = Vec::new();
    let mut reminders = Vec::new();
    let mut health_flags = Vec::new();

    if let Some(latest) = cycles.first() {
        let days_since = (today - latest.start_date).num_days();
        if days_since > OVERDUE_THRESHOLD_DAYS {
            alerts.push(Notification {
                kind: "overdue_period".to_string(),
                message: format!(
                    "It has been {days_since} days since your last logged cycle start."
                ),
                priority: Priority::Medium,
            });
        }
    }

    if let Prediction::Available { days_until_next, .. } = prediction {
        if *days_until_next <= REMINDER_WINDOW_DAYS {
            reminders.push(Notification {
                kind: "period_reminder".to_string(),
                message: format!("Your next period is expected in {days_until_next} days."),
                priority: Priority::Low,
            });
        }
    }

    let lookback_start = today - Duration::days(SEVERE_SYMPTOM_LOOKBACK_DAYS);
    let severe: Vec<&SymptomEntry> = recent_symptoms
        .iter()
        .filter(|s| s.date >= lookback_start && s.severity >= SEVERE_SYMPTOM_THRESHOLD)
        .collect();
    if !severe.is_empty() {
        health_flags.push(Notification {
            kind: "severe_symptoms".to_string(),
            message: format!(
                "{} severe symptom entries in the last {} days. If this continues, \
                 consider seeking medical advice.",
                severe.len(),
                SEVERE_SYMPTOM_LOOKBACK_DAYS
            ),
            priority: Priority::High,
        });
    }

    let count = alerts.len() + reminders.len() + health_flags.len();
    NotificationBundle {
        alerts,
        reminders,
        health_flags,
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cycle(start: NaiveDate) -> CycleRecord {
        CycleRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            start_date: start,
            end_date: None,
            flow_intensity: None,
            mood: None,
            notes: None,
            is_predicted: false,
        }
    }

    fn symptom(day_offset: i64, severity: i16, today: NaiveDate) -> SymptomEntry {
        SymptomEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            cycle_id: None,
            date: today - Duration::days(day_offset),
            symptom_type: "cramps".to_string(),
            severity,
            notes: None,
        }
    }

    #[test]
    fn overdue_period_raises_a_medium_alert() {
        let today = date(2024, 3, 10);
        let cycles = vec![cycle(date(2024, 2, 1))]; // 38 days ago
        let bundle = evaluate(
            &cycles,
            &[],
            &Prediction::Unavailable { cycles_available: 1 },
            today,
        );
        assert_eq!(bundle.alerts.len(), 1);
        assert_eq!(bundle.alerts[0].kind, "overdue_period");
        assert_eq!(bundle.alerts[0].priority, Priority::Medium);
        assert_eq!(bundle.count, 1);
    }

    #[test]
    fn imminent_prediction_raises_a_reminder() {
        let today = date(2024, 3, 23);
        let cycles = vec![cycle(date(2024, 2, 26)), cycle(date(2024, 1, 29))];
        let prediction = crate::engine::prediction::predict(&cycles, today);
        let bundle = evaluate(&cycles, &[], &prediction, today);
        assert_eq!(bundle.reminders.len(), 1);
        assert_eq!(bundle.reminders[0].kind, "period_reminder");
        assert_eq!(bundle.reminders[0].priority, Priority::Low);
    }

    #[test]
    fn severe_recent_symptoms_raise_a_health_flag() {
        let today = date(2024, 3, 10);
        let cycles = vec![cycle(date(2024, 3, 1))];
        let symptoms = vec![
            symptom(1, 5, today),
            symptom(3, 4, today),
            symptom(5, 5, today),
        ];
        let bundle = evaluate(
            &cycles,
            &symptoms,
            &Prediction::Unavailable { cycles_available: 1 },
            today,
        );
        assert_eq!(bundle.health_flags.len(), 1);
        assert_eq!(bundle.health_flags[0].priority, Priority::High);
        assert_eq!(bundle.count, 1);
    }

    #[test]
    fn old_or_mild_symptoms_do_not_flag() {
        let today = date(2024, 3, 10);
        let cycles = vec![cycle(date(2024, 3, 1))];
        let symptoms = vec![symptom(10, 5, today), symptom(2, 3, today)];
        let bundle = evaluate(
            &cycles,
            &symptoms,
            &Prediction::Unavailable { cycles_available: 1 },
            today,
        );
        assert!(bundle.health_flags.is_empty());
        assert_eq!(bundle.count, 0);
    }

    #[test]
    fn rules_co_occur_and_count_is_the_exact_sum() {
        let today = date(2024, 3, 20);
        // last start 40 days ago -> overdue, and prediction long gone -> 0 days
        let cycles = vec![cycle(date(2024, 2, 9)), cycle(date(2024, 1, 12))];
        let prediction = crate::engine::prediction::predict(&cycles, today);
        let symptoms = vec![symptom(1, 5, today)];
        let bundle = evaluate(&cycles, &symptoms, &prediction, today);
        assert_eq!(bundle.alerts.len(), 1);
        assert_eq!(bundle.reminders.len(), 1);
        assert_eq!(bundle.health_flags.len(), 1);
        assert_eq!(
            bundle.count,
            bundle.alerts.len() + bundle.reminders.len() + bundle.health_flags.len()
        );
    }

    #[test]
    fn quiet_state_produces_an_empty_bundle() {
        let today = date(2024, 3, 10);
        let cycles = vec![cycle(date(2024, 3, 1)), cycle(date(2024, 2, 2))];
        let prediction = crate::engine::prediction::predict(&cycles, today);
        let bundle = evaluate(&cycles, &[], &prediction, today);
        assert_eq!(bundle.count, 0);
    }
}
