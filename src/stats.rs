use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{TestAttempt, TestType};

/// Points the newer half must move by to count as a trend
const TREND_BAND: Decimal = dec!(5);

/// Direction of recent form scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Improving => write!(f, "improving"),
            Trend::Declining => write!(f, "declining"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// Summary of a user's assessment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_attempts: usize,
    /// Mean form score rounded to the nearest integer
    pub average_form_score: Decimal,
    /// Highest form score attempt per test type
    pub best_performances: BTreeMap<TestType, TestAttempt>,
    pub recent_trend: Trend,
    /// Ten points per attempt, capped at 100
    pub weekly_progress: u32,
}

impl UserStats {
    /// Compute stats from attempts in any order
    pub fn from_attempts(attempts: &[TestAttempt]) -> Self {
        let mut chronological: Vec<&TestAttempt> = attempts.iter().collect();
        chronological.sort_by_key(|a| a.created_at);

        let average_form_score = mean_form_score(&chronological).round();

        let mut best_performances: BTreeMap<TestType, TestAttempt> = BTreeMap::new();
        for attempt in &chronological {
            let replace = best_performances
                .get(&attempt.test_type)
                .map_or(true, |best| attempt.form_score > best.form_score);
            if replace {
                best_performances.insert(attempt.test_type, (*attempt).clone());
            }
        }

        let weekly_progress = u32::try_from(attempts.len())
            .unwrap_or(u32::MAX)
            .saturating_mul(10)
            .min(100);

        Self {
            total_attempts: attempts.len(),
            average_form_score,
            best_performances,
            recent_trend: trend(&chronological),
            weekly_progress,
        }
    }
}

fn mean_form_score(attempts: &[&TestAttempt]) -> Decimal {
    if attempts.is_empty() {
        return Decimal::ZERO;
    }
    let total: Decimal = attempts.iter().map(|a| a.form_score).sum();
    total / Decimal::from(attempts.len() as u64)
}

/// Compare the newer half of the history against the older half
fn trend(chronological: &[&TestAttempt]) -> Trend {
    if chronological.len() < 2 {
        return Trend::Stable;
    }

    let (older, newer) = chronological.split_at(chronological.len() / 2);
    let delta = mean_form_score(newer) - mean_form_score(older);

    if delta > TREND_BAND {
        Trend::Improving
    } else if delta < -TREND_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}
