use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::CycleRecord;

pub const MIN_CYCLES_FOR_PREDICTION: usize = 2;
pub const MAX_CYCLES_FOR_PREDICTION: usize = 3;

const CONFIDENCE_PER_CYCLE: i64 = 15;
const CONFIDENCE_FLOOR: i64 = 30;
const CONFIDENCE_CEILING: i64 = 90;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Prediction {
    Available {
        next_period_date: NaiveDate,
        /// Never negative; 0 once the predicted date has passed.
        days_until_next: i64,
        average_cycle_length: f64,
        /// 15 per cycle used, clamped to [30, 90].
        confidence: u8,
        cycles_used: usize,
    },
    Unavailable {
        cycles_available: usize,
    },
}

/// Next-period estimate from up to the three most recent cycles.
/// Too little history is a status, not an error.
pub fn predict(records: &[CycleRecord], today: NaiveDate) -> Prediction {
    if records.len() < MIN_CYCLES_FOR_PREDICTION {
        return Prediction::Unavailable {
            cycles_available: records.len(),
        };
    }

    let recent = &records[..records.len().min(MAX_CYCLES_FOR_PREDICTION)];
    let deltas: Vec<i64> = recent
        .windows(2)
        .map(|pair| (pair[0].start_date - pair[1].start_date).num_days())
        .collect();
    let average = deltas.iter().sum::<i64>() as f64 / deltas.len() as f64;

    let last_start = recent[0].start_date;
    let next_period_date = last_start + Duration::days(average.round() as i64);
    let days_since_last = (today - last_start).num_days();
    let days_until_next = (average.round() as i64 - days_since_last).max(0);

    let confidence = (CONFIDENCE_PER_CYCLE * recent.len() as i64)
        .clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING) as u8;

    Prediction::Available {
        next_period_date,
        days_until_next,
        average_cycle_length: average,
        confidence,
        cycles_used: recent.len(),
    }
}
