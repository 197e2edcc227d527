use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::statistics::{CycleStatistics, Regularity};
use crate::engine::symptoms::{SeverityTrend, SymptomPattern};
use crate::error::EngineError;

/// Candidates below this confidence are dropped.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const MAX_RECOMMENDATIONS: usize = 5;
pub const MODEL_VERSION: &str = "rules-v1";

const SHORT_CYCLE_DAYS: f64 = 21.0;
const LONG_CYCLE_DAYS: f64 = 35.0;
const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Ranked low-to-high priority so candidates sort cycle > symptom > lifestyle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RuleSource {
    Cycle,
    Symptom,
    Lifestyle,
}

impl RuleSource {
    fn name(self) -> &'static str {
        match self {
            RuleSource::Cycle => "cycle_regularity",
            RuleSource::Symptom => "symptom_patterns",
            RuleSource::Lifestyle => "lifestyle",
        }
    }
}

struct Candidate {
    text: String,
    confidence: f64,
    source: RuleSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub recommendations: Vec<String>,
    /// Parallel to `recommendations`.
    pub confidence_scores: Vec<f64>,
    /// Names of the rule sources that contributed.
    pub personalization_factors: Vec<String>,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}

fn cycle_rules(stats: &CycleStatistics, out: &mut Vec<Candidate>) {
    match stats.status {
        Regularity::InsufficientData => return,
        Regularity::Irregular => out.push(Candidate {
            text: "Your cycle lengths vary noticeably. Keep logging start dates; \
                   if irregularity persists over several months, consider discussing \
                   it with a healthcare provider."
                .to_string(),
            confidence: 0.8,
            source: RuleSource::Cycle,
        }),
        Regularity::Regular | Regularity::FairlyRegular => {}
    }

    if stats.average_length < SHORT_CYCLE_DAYS {
        out.push(Candidate {
            text: "Your average cycle is shorter than 21 days, which is worth \
                   mentioning to a healthcare provider."
                .to_string(),
            confidence: 0.9,
            source: RuleSource::Cycle,
        });
    } else if stats.average_length > LONG_CYCLE_DAYS {
        out.push(Candidate {
            text: "Your average cycle is longer than 35 days, which is worth \
                   mentioning to a healthcare provider."
                .to_string(),
            confidence: 0.9,
            source: RuleSource::Cycle,
        });
    }
}

fn symptom_rules(patterns: &[SymptomPattern], out: &mut Vec<Candidate>) {
    for pattern in patterns {
        if pattern.high_severity {
            out.push(Candidate {
                text: format!(
                    "Your {} has averaged severity {:.1} recently. Persistent severe \
                     symptoms deserve a professional opinion.",
                    pattern.symptom_type, pattern.average_severity
                ),
                confidence: 0.9,
                source: RuleSource::Symptom,
            });
        } else if pattern.recurring {
            out.push(Candidate {
                text: format!(
                    "{} has come up {} times in the last three months. Tracking what \
                     precedes it can help identify triggers.",
                    pattern.symptom_type, pattern.frequency
                ),
                confidence: 0.8,
                source: RuleSource::Symptom,
            });
        }
    }
}

fn lifestyle_rules(patterns: &[SymptomPattern], out: &mut Vec<Candidate>) {
    for pattern in patterns {
        match pattern.symptom_type.as_str() {
            "cramps" => out.push(Candidate {
                text: "For cramps, magnesium-rich foods, gentle heat and light \
                       movement can take the edge off."
                    .to_string(),
                confidence: 0.8,
                source: RuleSource::Lifestyle,
            }),
            "fatigue" if pattern.trend == SeverityTrend::Worsening => out.push(Candidate {
                text: "Your fatigue has been trending up. Prioritize sleep and \
                       consider lighter training days this week."
                    .to_string(),
                confidence: 0.75,
                source: RuleSource::Lifestyle,
            }),
            "headache" => out.push(Candidate {
                text: "Staying hydrated and keeping regular meals often reduces \
                       cycle-related headaches."
                    .to_string(),
                confidence: 0.75,
                source: RuleSource::Lifestyle,
            }),
            _ => {}
        }
    }
}

fn fallback_set() -> RecommendationSet {
    let generic = [
        "Keep logging your cycle start dates to unlock personalized insights.",
        "Note any symptoms as they happen; patterns emerge after a few cycles.",
        "Aim for consistent sleep and hydration across your cycle.",
    ];
    RecommendationSet {
        recommendations: generic.iter().map(|s| s.to_string()).collect(),
        confidence_scores: vec![FALLBACK_CONFIDENCE; generic.len()],
        personalization_factors: vec!["generic".to_string()],
        model_version: MODEL_VERSION.to_string(),
        generated_at: Utc::now(),
    }
}

fn build_candidates(
    stats: &CycleStatistics,
    patterns: &[SymptomPattern],
) -> Result<Vec<Candidate>, EngineError> {
    for pattern in patterns {
        if !(1.0..=5.0).contains(&pattern.average_severity) {
            return Err(EngineError::Computation(format!(
                "average severity {} out of range for {}",
                pattern.average_severity, pattern.symptom_type
            )));
        }
    }

    let mut candidates = Vec::new();
    cycle_rules(stats, &mut candidates);
    symptom_rules(patterns, &mut candidates);
    lifestyle_rules(patterns, &mut candidates);
    Ok(candidates)
}

/// Merges the three rule sources into at most five recommendations, each with
/// confidence >= 0.7, ranked cycle > symptom > lifestyle. Any internal fault
/// is logged and replaced by a generic fallback set; this never fails.
pub fn generate(stats: &CycleStatistics, patterns: &[SymptomPattern]) -> RecommendationSet {
    let mut candidates = match build_candidates(stats, patterns) {
        Ok(candidates) => candidates,
        Err(err) => {
            tracing::warn!(error = %err, "recommendation generation failed, serving fallback");
            return fallback_set();
        }
    };

    candidates.retain(|c| c.confidence >= CONFIDENCE_THRESHOLD);
    candidates.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then(b.confidence.total_cmp(&a.confidence))
    });
    candidates.truncate(MAX_RECOMMENDATIONS);

    let mut factors: Vec<String> = Vec::new();
    for candidate in &candidates {
        let name = candidate.source.name().to_string();
        if !factors.contains(&name) {
            factors.push(name);
        }
    }

    RecommendationSet {
        confidence_scores: candidates.iter().map(|c| c.confidence).collect(),
        recommendations: candidates.into_iter().map(|c| c.text).collect(),
        personalization_factors: factors,
        model_version: MODEL_VERSION.to_string(),
        generated_at: Utc::now(),
    }
}
