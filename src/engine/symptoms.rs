use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::SymptomEntry;

/// Symptom history window fed into the analyzer.
pub const LOOKBACK_DAYS: i64 = 90;
/// Entries of one type needed before a severity trend is reported.
pub const MIN_ENTRIES_FOR_TREND: usize = 4;

const HIGH_SEVERITY_THRESHOLD: f64 = 4.0;
const RECURRING_THRESHOLD: usize = 5;
const TREND_EPSILON: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTrend {
    Stable,
    Worsening,
    Improving,
    InsufficientData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymptomPattern {
    pub symptom_type: String,
    /// Occurrences within the lookback window.
    pub frequency: usize,
    pub average_severity: f64,
    pub trend: SeverityTrend,
    pub high_severity: bool,
    pub recurring: bool,
}

/// Mean severity of the two most recent entries against the next two older.
fn severity_trend(severities_recent_first: &[i16]) -> SeverityTrend {
    if severities_recent_first.len() < MIN_ENTRIES_FOR_TREND {
        return SeverityTrend::InsufficientData;
    }

    let recent = (severities_recent_first[0] + severities_recent_first[1]) as f64 / 2.0;
    let older = (severities_recent_first[2] + severities_recent_first[3]) as f64 / 2.0;
    let diff = recent - older;

    if diff.abs() < TREND_EPSILON {
        SeverityTrend::Stable
    } else if diff > 0.0 {
        SeverityTrend::Worsening
    } else {
        SeverityTrend::Improving
    }
}

/// Groups entries by symptom type and derives per-type frequency, severity
/// and trend. Expects entries already restricted to the lookback window,
/// ordered most-recent-first.
pub fn analyze(entries: &[SymptomEntry]) -> Vec<SymptomPattern> {
    let mut by_type: BTreeMap<&str, Vec<i16>> = BTreeMap::new();
    for entry in entries {
        by_type
            .entry(entry.symptom_type.as_str())
            .or_default()
            .push(entry.severity);
    }

    by_type
        .into_iter()
        .map(|(symptom_type, severities)| {
            let frequency = severities.len();
            let average_severity =
                severities.iter().map(|&s| s as f64).sum::<f64>() / frequency as f64;
            SymptomPattern {
                symptom_type: symptom_type.to_string(),
                frequency,
                average_severity,
                trend: severity_trend(&severities),
                high_severity: average_severity >= HIGH_SEVERITY_THRESHOLD,
                recurring: frequency >= RECURRING_THRESHOLD,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(symptom_type: &str, day: u32, severity: i16) -> SymptomEntry {
        SymptomEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            cycle_id: None,
            date: date(2024, 3, day),
            symptom_type: symptom_type.to_string(),
            severity,
            notes: None,
        }
    }

    #[test]
    fn groups_by_type_with_frequency_and_mean_severity() {
        let entries = vec![
            entry("cramps", 20, 5),
            entry("headache", 19, 2),
            entry("cramps", 18, 4),
            entry("cramps", 15, 5),
        ];
        let patterns = analyze(&entries);
        assert_eq!(patterns.len(), 2);

        let cramps = patterns
            .iter()
            .find(|p| p.symptom_type == "cramps")
            .unwrap();
        assert_eq!(cramps.frequency, 3);
        assert!((cramps.average_severity - 14.0 / 3.0).abs() < 1e-9);
        assert!(cramps.high_severity);
        assert!(!cramps.recurring);
    }

    #[test]
    fn worsening_trend_from_rising_recent_severity() {
        let entries = vec![
            entry("fatigue", 20, 5),
            entry("fatigue", 18, 4),
            entry("fatigue", 10, 2),
            entry("fatigue", 8, 2),
        ];
        let patterns = analyze(&entries);
        assert_eq!(patterns[0].trend, SeverityTrend::Worsening);
    }

    #[test]
    fn improving_trend_from_falling_recent_severity() {
        let entries = vec![
            entry("headache", 20, 1),
            entry("headache", 18, 2),
            entry("headache", 10, 4),
            entry("headache", 8, 4),
        ];
        let patterns = analyze(&entries);
        assert_eq!(patterns[0].trend, SeverityTrend::Improving);
    }

    #[test]
    fn trend_within_half_a_point_is_stable() {
        let entries = vec![
            entry("bloating", 20, 3),
            entry("bloating", 18, 3),
            entry("bloating", 10, 3),
            entry("bloating", 8, 3),
        ];
        let patterns = analyze(&entries);
        assert_eq!(patterns[0].trend, SeverityTrend::Stable);
    }

    #[test]
    fn three_entries_is_too_few_for_a_trend() {
        let entries = vec![
            entry("cramps", 20, 5),
            entry("cramps", 18, 4),
            entry("cramps", 15, 5),
        ];
        let patterns = analyze(&entries);
        assert_eq!(patterns[0].trend, SeverityTrend::InsufficientData);
    }

    #[test]
    fn five_occurrences_marks_a_recurring_symptom() {
        let entries: Vec<_> = (10..15).map(|d| entry("acne", d, 2)).collect();
        let patterns = analyze(&entries);
        assert!(patterns[0].recurring);
        assert!(!patterns[0].high_severity);
    }
}
