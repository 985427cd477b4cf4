//! Assessment workflow
//!
//! [`AssessmentService`] owns the configured classifier and synthesizer and
//! the three stores, and runs the record/plan/stats flows end to end.
//! Nothing here is global: every dependency is passed in at construction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{FitAssessError, Result};
use crate::leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardQuery};
use crate::metrics::MetricExtractor;
use crate::models::{EmgSample, EmgSession, MetricSet, TestAttempt, TestType, Tier, UserProfile};
use crate::stats::UserStats;
use crate::store::{AttemptStore, EmgSessionStore, ProfileStore};
use crate::tiers::TierClassifier;
use crate::training_plan::{PlanSynthesizer, TrainingPlan};

/// A completed test as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRequest {
    pub user_id: String,
    /// Test type tag, e.g. "pushUps"
    pub test_type: String,
    /// Raw metric payload in any of the accepted shapes
    pub metrics: Value,
    pub form_score: Decimal,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Defaults to now
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub struct AssessmentService {
    classifier: TierClassifier,
    synthesizer: PlanSynthesizer,
    attempts: Arc<dyn AttemptStore>,
    sessions: Arc<dyn EmgSessionStore>,
    profiles: Arc<dyn ProfileStore>,
    history_limit: usize,
    session_limit: usize,
}

impl AssessmentService {
    pub fn new(
        config: &AppConfig,
        attempts: Arc<dyn AttemptStore>,
        sessions: Arc<dyn EmgSessionStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Result<Self> {
        Ok(Self {
            classifier: TierClassifier::new(config.threshold_table()?),
            synthesizer: PlanSynthesizer::new(config.plan.clone()),
            attempts,
            sessions,
            profiles,
            history_limit: config.storage.history_limit,
            session_limit: config.storage.session_limit,
        })
    }

    /// Service backed by a single store implementing every store trait
    pub fn with_store<S>(config: &AppConfig, store: Arc<S>) -> Result<Self>
    where
        S: AttemptStore + EmgSessionStore + ProfileStore + 'static,
    {
        Self::new(config, store.clone(), store.clone(), store)
    }

    /// Extract metrics and classify them without storing anything
    pub fn evaluate(&self, test_type: &str, payload: &Value) -> Result<(TestType, MetricSet, Tier)> {
        let test_type: TestType = test_type.parse()?;
        let metrics = MetricExtractor::extract_for(test_type, payload);
        let tier = self.classifier.classify_metrics(test_type, &metrics)?;
        Ok((test_type, metrics, tier))
    }

    /// Normalize, classify and store one attempt
    pub fn record_attempt(&self, request: AttemptRequest) -> Result<TestAttempt> {
        let _span = info_span!("record_attempt", user_id = %request.user_id, test_type = %request.test_type).entered();

        if request.user_id.trim().is_empty() {
            return Err(FitAssessError::Validation("user id must not be empty".to_string()));
        }
        if request.form_score < Decimal::ZERO || request.form_score > dec!(100) {
            return Err(FitAssessError::Validation(format!(
                "form score must be between 0 and 100, got {}",
                request.form_score
            )));
        }

        let (test_type, metrics, badge) = self.evaluate(&request.test_type, &request.metrics)?;

        let attempt = TestAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id,
            test_type,
            metrics,
            form_score: request.form_score,
            badge,
            recommendations: request.recommendations,
            created_at: request.created_at.unwrap_or_else(Utc::now),
        };

        self.attempts.save_attempt(&attempt)?;
        info!(attempt_id = %attempt.id, badge = %attempt.badge, form_score = %attempt.form_score, "attempt recorded");
        Ok(attempt)
    }

    /// Aggregate raw EMG samples into a session and store it
    pub fn record_emg_session(
        &self,
        user_id: &str,
        samples: &[EmgSample],
        session_seconds: f64,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<EmgSession> {
        if samples.is_empty() {
            warn!(user_id, "recording EMG session without samples");
        }

        let session = EmgSession::new(user_id, timestamp.unwrap_or_else(Utc::now), samples, session_seconds);
        self.sessions.save_session(&session)?;

        info!(
            user_id,
            data_points = session.session_data.data_points,
            avg_activity = session.session_data.avg_muscle_activity,
            "EMG session recorded"
        );
        Ok(session)
    }

    /// Plan from the user's recent history
    pub fn generate_plan(&self, user_id: &str) -> Result<TrainingPlan> {
        let attempts = self.attempts.list_recent_attempts(user_id, self.history_limit)?;
        let sessions = self.sessions.list_recent_sessions(user_id, self.session_limit)?;
        let profile = self.profiles.get_profile(user_id)?;

        let mut plan = self.synthesizer.synthesize(&attempts, &sessions, profile.as_ref());
        // A user without a stored profile still owns the plan
        if plan.user_id.is_none() {
            plan.user_id = Some(user_id.to_string());
        }
        Ok(plan)
    }

    pub fn user_stats(&self, user_id: &str) -> Result<UserStats> {
        let attempts = self.attempts.list_recent_attempts(user_id, usize::MAX)?;
        Ok(UserStats::from_attempts(&attempts))
    }

    pub fn leaderboard(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>> {
        let profiles = self.profiles.list_profiles()?;
        let attempts = self.attempts.list_all_attempts()?;
        Ok(Leaderboard::build(query, &profiles, &attempts))
    }

    pub fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.profiles.get_profile(user_id)
    }

    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        if profile.id.trim().is_empty() {
            return Err(FitAssessError::Validation("profile id must not be empty".to_string()));
        }
        self.profiles.save_profile(profile)
    }

    pub fn recent_attempts(&self, user_id: &str) -> Result<Vec<TestAttempt>> {
        self.attempts.list_recent_attempts(user_id, self.history_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::training_plan::Intensity;
    use serde_json::json;

    fn service() -> AssessmentService {
        AssessmentService::with_store(&AppConfig::default(), Arc::new(InMemoryStore::new())).unwrap()
    }

    fn request(test_type: &str, metrics: Value, form_score: Decimal) -> AttemptRequest {
        AttemptRequest {
            user_id: "u1".to_string(),
            test_type: test_type.to_string(),
            metrics,
            form_score,
            recommendations: vec!["Keep elbows tucked".to_string()],
            created_at: None,
        }
    }

    #[test]
    fn test_record_attempt_classifies() {
        let service = service();
        let attempt = service
            .record_attempt(request("pushUps", json!({"reps": "21"}), dec!(78)))
            .unwrap();

        assert_eq!(attempt.test_type, TestType::PushUps);
        assert_eq!(attempt.badge, Tier::StateLevel);
        assert_eq!(attempt.metrics["reps"], dec!(21));
        assert_eq!(service.recent_attempts("u1").unwrap(), vec![attempt]);
    }

    #[test]
    fn test_record_attempt_rejects_bad_input() {
        let service = service();

        let err = service.record_attempt(request("curling", json!({}), dec!(50))).unwrap_err();
        assert!(matches!(err, FitAssessError::UnsupportedTestType(_)));

        let err = service.record_attempt(request("sitUps", json!({}), dec!(101))).unwrap_err();
        assert!(matches!(err, FitAssessError::Validation(_)));

        assert!(service.recent_attempts("u1").unwrap().is_empty());
    }

    #[test]
    fn test_plan_for_new_user() {
        let plan = service().generate_plan("fresh").unwrap();
        assert_eq!(plan.user_id.as_deref(), Some("fresh"));
        assert_eq!(plan.focus, vec!["General Fitness".to_string()]);
        assert_eq!(plan.intensity, Intensity::Low);
    }

    #[test]
    fn test_history_limit_bounds_plan_input() {
        let mut config = AppConfig::default();
        config.storage.history_limit = 2;
        let service = AssessmentService::with_store(&config, Arc::new(InMemoryStore::new())).unwrap();

        let base = Utc::now();
        for (i, score) in [dec!(20), dec!(90), dec!(90)].iter().enumerate() {
            let mut req = request("sitUps", json!({"reps": 30}), *score);
            req.created_at = Some(base + chrono::Duration::minutes(i as i64));
            service.record_attempt(req).unwrap();
        }

        // Oldest low score falls outside the window
        let plan = service.generate_plan("u1").unwrap();
        assert_eq!(plan.avg_form_score, dec!(90));
        assert_eq!(plan.intensity, Intensity::High);
    }

    #[test]
    fn test_emg_session_feeds_plan() {
        let service = service();
        let samples: Vec<EmgSample> = (0..4)
            .map(|i| EmgSample {
                emg: 100.0,
                muscle_activity: 25.0,
                fatigue: 85.0,
                activated: i % 2 == 0,
                timestamp: i,
            })
            .collect();

        let session = service.record_emg_session("u1", &samples, 120.0, None).unwrap();
        assert_eq!(session.session_data.activation_rate, 50.0);

        let plan = service.generate_plan("u1").unwrap();
        assert_eq!(plan.frequency, "3-4 times per week");
        assert_eq!(plan.muscle_weaknesses, vec!["Core Strength".to_string(), "Upper Body".to_string()]);
        assert_eq!(plan.exercises[0].name, "EMG-Guided Push-ups");
    }
}
