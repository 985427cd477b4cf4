//! EMG session aggregation
//!
//! Turns a stream of raw muscle-sensor readings into the aggregate
//! `session_data` carried by every [`EmgSession`], and derives rule-based
//! session insights from those aggregates.
//!
//! # Aggregation rules
//!
//! - Averages and maxima of muscle activity and fatigue over all samples
//! - Activation rate: share of samples with activation detected, as a percentage
//! - Active time: activation share multiplied by session length
//! - Every percentage is clamped to [0, 100]
//! - No samples means every aggregate is 0
//!
//! Only the last [`EMG_HISTORY_WINDOW`] raw samples are retained on a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::models::{EmgSample, EmgSession, EmgSessionData};

/// Raw samples retained on a stored session
pub const EMG_HISTORY_WINDOW: usize = 10;

impl EmgSessionData {
    /// Aggregate raw samples recorded over `session_seconds`
    pub fn from_samples(samples: &[EmgSample], session_seconds: f64) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let session_seconds = if session_seconds.is_finite() {
            session_seconds.max(0.0)
        } else {
            0.0
        };

        let activity: Vec<f64> = samples.iter().map(|s| clamp_percent(s.muscle_activity)).collect();
        let fatigue: Vec<f64> = samples.iter().map(|s| clamp_percent(s.fatigue)).collect();
        let active_share = samples.iter().filter(|s| s.activated).count() as f64 / samples.len() as f64;

        Self {
            avg_muscle_activity: clamp_percent(activity.iter().mean()),
            max_muscle_activity: clamp_percent(Statistics::max(activity.iter())),
            avg_fatigue: clamp_percent(fatigue.iter().mean()),
            max_fatigue: clamp_percent(Statistics::max(fatigue.iter())),
            activation_rate: clamp_percent(active_share * 100.0),
            total_active_time: active_share * session_seconds,
            total_session_time: session_seconds,
            data_points: samples.len(),
        }
    }
}

impl EmgSession {
    /// Build a session from raw samples, keeping only the most recent window
    pub fn new(
        user_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        samples: &[EmgSample],
        session_seconds: f64,
    ) -> Self {
        let session_data = EmgSessionData::from_samples(samples, session_seconds);
        let start = samples.len().saturating_sub(EMG_HISTORY_WINDOW);

        Self {
            user_id: user_id.into(),
            timestamp,
            session_data,
            emg_history: samples[start..].to_vec(),
        }
    }
}

/// Rule-based reading of one session's aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInsights {
    pub summary: String,
    pub performance: String,
    pub fatigue: String,
    pub activation_pattern: String,
    pub recommendations: Vec<String>,
}

impl SessionInsights {
    /// Derive insights from session aggregates
    ///
    /// - Performance: "Good muscle engagement" above 60% average activity
    /// - Fatigue: "High fatigue - rest needed" above 70% average fatigue
    /// - Activation pattern: "Consistent activation" above 60% activation rate
    pub fn derive(data: &EmgSessionData) -> Self {
        let summary = format!(
            "EMG session: {:.1}% avg activity over {:.1} minutes",
            data.avg_muscle_activity,
            data.total_session_time / 60.0
        );

        let performance = if data.avg_muscle_activity > 60.0 {
            "Good muscle engagement"
        } else {
            "Low muscle activation"
        };

        let fatigue = if data.avg_fatigue > 70.0 {
            "High fatigue - rest needed"
        } else {
            "Moderate fatigue levels"
        };

        let activation_pattern = if data.activation_rate > 60.0 {
            "Consistent activation"
        } else {
            "Inconsistent activation"
        };

        let recommendations = vec![
            if data.avg_muscle_activity < 40.0 {
                "Focus on proper muscle activation techniques"
            } else {
                "Maintain current activation levels"
            }
            .to_string(),
            if data.avg_fatigue > 80.0 {
                "Take adequate rest between sessions"
            } else {
                "Good recovery management"
            }
            .to_string(),
        ];

        Self {
            summary,
            performance: performance.to_string(),
            fatigue: fatigue.to_string(),
            activation_pattern: activation_pattern.to_string(),
            recommendations,
        }
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
