use serde::{Deserialize, Serialize};

use crate::models::CycleRecord;

/// At most this many recent cycles feed the regularity analysis.
pub const MAX_CYCLES_ANALYZED: usize = 12;
/// Fewer cycles than this and we report insufficient data.
pub const MIN_CYCLES_FOR_STATS: usize = 3;
/// Trend comparison needs two windows of recent cycle lengths.
pub const MIN_CYCLES_FOR_TREND: usize = 6;

const STDDEV_REGULAR: f64 = 3.0;
const STDDEV_FAIRLY_REGULAR: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regularity {
    Regular,
    FairlyRegular,
    Irregular,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleTrend {
    Stable,
    Lengthening,
    Shortening,
    InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleStatistics {
    pub status: Regularity,
    /// Mean cycle length in days, rounded to one decimal place.
    pub average_length: f64,
    /// Population standard deviation of cycle lengths, one decimal place.
    pub standard_deviation: f64,
    pub cycles_analyzed: usize,
    pub range: CycleRange,
    pub trend: CycleTrend,
}

impl CycleStatistics {
    pub fn insufficient(cycles_analyzed: usize) -> Self {
        Self {
            status: Regularity::InsufficientData,
            average_length: 0.0,
            standard_deviation: 0.0,
            cycles_analyzed,
            range: CycleRange { min: 0, max: 0 },
            trend: CycleTrend::InsufficientData,
        }
    }
}

/// Day-deltas between consecutive start dates, most recent delta first.
/// Expects `records` ordered most-recent-first, as the repository returns them.
fn cycle_lengths(records: &[CycleRecord]) -> Vec<i64> {
    records
        .windows(2)
        .map(|pair| (pair[0].start_date - pair[1].start_date).num_days())
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn mean(values: &[i64]) -> f64 {
    values.iter().sum::<i64>() as f64 / values.len() as f64
}

/// Regularity analysis over a user's recent cycle history.
pub fn analyze(records: &[CycleRecord]) -> CycleStatistics {
    let records = &records[..records.len().min(MAX_CYCLES_ANALYZED)];
    if records.len() < MIN_CYCLES_FOR_STATS {
        return CycleStatistics::insufficient(records.len());
    }

    let lengths = cycle_lengths(records);
    let avg = mean(&lengths);
    let variance = lengths
        .iter()
        .map(|&len| {
            let diff = len as f64 - avg;
            diff * diff
        })
        .sum::<f64>()
        / lengths.len() as f64;
    let std_dev = variance.sqrt();

    let status = if std_dev <= STDDEV_REGULAR {
        Regularity::Regular
    } else if std_dev <= STDDEV_FAIRLY_REGULAR {
        Regularity::FairlyRegular
    } else {
        Regularity::Irregular
    };

    CycleStatistics {
        status,
        average_length: round1(avg),
        standard_deviation: round1(std_dev),
        cycles_analyzed: records.len(),
        range: CycleRange {
            min: lengths.iter().copied().min().unwrap_or(0),
            max: lengths.iter().copied().max().unwrap_or(0),
        },
        trend: trend(records),
    }
}

/// Compares the mean of the three most recent cycle lengths against the
/// next-older window. With exactly six cycles the older window holds two
/// lengths; both windows must be non-empty.
pub fn trend(records: &[CycleRecord]) -> CycleTrend {
    if records.len() < MIN_CYCLES_FOR_TREND {
        return CycleTrend::InsufficientData;
    }

    let lengths = cycle_lengths(&records[..records.len().min(MAX_CYCLES_ANALYZED)]);
    if lengths.len() < 4 {
        return CycleTrend::InsufficientData;
    }

    let recent = mean(&lengths[..3]);
    let older = mean(&lengths[3..lengths.len().min(6)]);
    let diff = recent - older;

    if diff.abs() < 1.0 {
        CycleTrend::Stable
    } else if diff > 0.0 {
        CycleTrend::Lengthening
    } else {
        CycleTrend::Shortening
    }
}
