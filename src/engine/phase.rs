use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Phase boundaries are fixed day thresholds, deliberately not personalized
/// to a user's own average cycle length.
const MENSTRUAL_LAST_DAY: i64 = 5;
const FOLLICULAR_LAST_DAY: i64 = 13;
const OVULATION_LAST_DAY: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Unknown,
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: CyclePhase,
    pub cycle_day: i64,
}

/// Total mapping from day-of-cycle to phase.
pub fn phase_for_day(cycle_day: i64) -> CyclePhase {
    if cycle_day <= MENSTRUAL_LAST_DAY {
        CyclePhase::Menstrual
    } else if cycle_day <= FOLLICULAR_LAST_DAY {
        CyclePhase::Follicular
    } else if cycle_day <= OVULATION_LAST_DAY {
        CyclePhase::Ovulation
    } else {
        CyclePhase::Luteal
    }
}

/// Re-evaluated from scratch on every call; no stored phase history.
/// `cycle_day` counts from 1 on the start date itself.
pub fn classify(latest_start: Option<NaiveDate>, today: NaiveDate) -> PhaseResult {
    match latest_start {
        None => PhaseResult {
            phase: CyclePhase::Unknown,
            cycle_day: 0,
        },
        Some(start) => {
            let cycle_day = (today - start).num_days() + 1;
            PhaseResult {
                phase: phase_for_day(cycle_day),
                cycle_day,
            }
        }
    }
}
