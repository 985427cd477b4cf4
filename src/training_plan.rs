use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info_span};

use crate::models::{EmgSession, TestAttempt, TestType, UserProfile};

/// Training intensity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intensity::Low => write!(f, "Low"),
            Intensity::Medium => write!(f, "Medium"),
            Intensity::High => write!(f, "High"),
        }
    }
}

/// Individual recommended exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: String,
    pub rest: String,
    pub target_muscles: Vec<String>,
    /// Muscle activity percentage the user should aim to reach
    pub emg_threshold: u8,
}

impl Exercise {
    fn new(name: &str, sets: u32, reps: &str, rest: &str, target_muscles: &[&str], emg_threshold: u8) -> Self {
        Self {
            name: name.to_string(),
            sets,
            reps: reps.to_string(),
            rest: rest.to_string(),
            target_muscles: target_muscles.iter().map(|m| m.to_string()).collect(),
            emg_threshold,
        }
    }

    /// Fallback routine used when history produced no targeted exercise
    pub fn defaults() -> Vec<Exercise> {
        vec![
            Exercise::new("Bodyweight Squats", 3, "12-15", "60s", &["Quadriceps", "Glutes"], 50),
            Exercise::new("Push-ups", 3, "8-12", "60s", &["Chest", "Triceps"], 60),
            Exercise::new("Plank Hold", 3, "30-45s", "30s", &["Core"], 40),
        ]
    }

    /// Corrective exercise for a weak test type
    pub fn for_weakness(test_type: TestType) -> Exercise {
        match test_type {
            TestType::VerticalJump => {
                Exercise::new("Plyometric Squats", 4, "10", "90s", &["Quadriceps", "Glutes"], 70)
            }
            TestType::SitUps => Exercise::new("Dead Bugs", 3, "10-12", "45s", &["Core", "Hip Flexors"], 50),
            TestType::PushUps => {
                Exercise::new("Incline Push-ups", 3, "10-12", "60s", &["Chest", "Triceps", "Shoulders"], 55)
            }
            TestType::PullUps => Exercise::new("Negative Pull-ups", 3, "5-6", "90s", &["Lats", "Biceps"], 65),
            TestType::ShuttleRun => Exercise::new("Shuttle Sprints", 6, "20m", "60s", &["Quadriceps", "Calves"], 65),
            TestType::EnduranceRun => Exercise::new(
                "Tempo Intervals",
                4,
                "4 min",
                "2 min",
                &["Quadriceps", "Hamstrings", "Calves"],
                45,
            ),
            TestType::FlexibilityTest => {
                Exercise::new("Dynamic Stretching", 2, "30s hold", "15s", &["Hip Flexors", "Hamstrings"], 20)
            }
            TestType::AgilityLadder => {
                Exercise::new("Ladder Footwork Drills", 4, "30s", "45s", &["Calves", "Hip Flexors"], 45)
            }
            TestType::HeightWeight => {
                Exercise::new("Circuit Training", 3, "40s on / 20s off", "60s", &["Full Body"], 50)
            }
        }
    }
}

/// Focus category a weak test type feeds into
pub fn focus_category(test_type: TestType) -> &'static str {
    match test_type {
        TestType::VerticalJump => "Explosive Power",
        TestType::SitUps => "Core Endurance",
        TestType::PushUps | TestType::PullUps => "Upper Body Strength",
        TestType::ShuttleRun | TestType::AgilityLadder => "Speed & Agility",
        TestType::EnduranceRun => "Cardiovascular Endurance",
        TestType::FlexibilityTest => "Flexibility",
        TestType::HeightWeight => "Body Composition",
    }
}

pub const GENERAL_FITNESS: &str = "General Fitness";
pub const MUSCLE_ACTIVATION: &str = "Muscle Activation";
pub const FORM_IMPROVEMENT: &str = "Form Improvement";
pub const CORE_STRENGTH: &str = "Core Strength";
pub const UPPER_BODY: &str = "Upper Body";
pub const RECOVERY_FREQUENCY: &str = "3-4 times per week";
pub const STANDARD_FREQUENCY: &str = "4-5 times per week";

/// Cut-offs used by the plan synthesizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSettings {
    /// Group mean form score above which a test type is a strength
    #[serde(with = "rust_decimal::serde::float")]
    pub strength_form_score: Decimal,

    /// Group mean form score below which a test type is a weakness
    #[serde(with = "rust_decimal::serde::float")]
    pub weakness_form_score: Decimal,

    /// Average form score above which intensity is High
    #[serde(with = "rust_decimal::serde::float")]
    pub high_intensity_form_score: Decimal,

    /// Average form score above which intensity is Medium
    #[serde(with = "rust_decimal::serde::float")]
    pub medium_intensity_form_score: Decimal,

    /// Average form score below which "Form Improvement" joins the focus
    #[serde(with = "rust_decimal::serde::float")]
    pub form_improvement_score: Decimal,

    /// Average muscle activity below which core strength is flagged
    pub low_activation: f64,

    /// Average muscle activity below which upper body is also flagged
    pub very_low_activation: f64,

    /// Session average fatigue above which recovery is needed
    pub high_fatigue: f64,

    /// Activation target for EMG-guided exercises
    pub emg_target_threshold: u8,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            strength_form_score: dec!(75),
            weakness_form_score: dec!(50),
            high_intensity_form_score: dec!(80),
            medium_intensity_form_score: dec!(60),
            form_improvement_score: dec!(60),
            low_activation: 40.0,
            very_low_activation: 30.0,
            high_fatigue: 80.0,
            emg_target_threshold: 60,
        }
    }
}

/// Personalised training plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    /// Owner, when a profile was supplied
    pub user_id: Option<String>,
    /// Weakness categories, in order of discovery
    pub focus: Vec<String>,
    pub intensity: Intensity,
    pub frequency: String,
    pub exercises: Vec<Exercise>,
    /// Test types whose mean form score marks them as strong
    pub strengths: Vec<TestType>,
    /// Test types whose mean form score marks them as weak
    pub weaknesses: Vec<TestType>,
    /// EMG-derived muscle group weaknesses
    pub muscle_weaknesses: Vec<String>,
    pub avg_form_score: Decimal,
    pub avg_muscle_activity: f64,
}

/// Form score summary of an attempt window
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceAnalysis {
    pub avg_form_score: Decimal,
    pub strengths: Vec<TestType>,
    pub weaknesses: Vec<TestType>,
}

/// EMG summary of a session window
#[derive(Debug, Clone, PartialEq)]
pub struct MuscleAnalysis {
    pub avg_muscle_activity: f64,
    pub weak_muscles: Vec<String>,
    pub low_activation: bool,
    pub recovery_needed: bool,
}

/// Derives a training plan from attempt and EMG history
///
/// Stateless: the same inputs always produce the same plan, and empty
/// histories produce a general-fitness plan rather than an error.
#[derive(Debug, Clone, Default)]
pub struct PlanSynthesizer {
    settings: PlanSettings,
}

impl PlanSynthesizer {
    pub fn new(settings: PlanSettings) -> Self {
        Self { settings }
    }

    /// Build a plan from recent attempts, EMG sessions and an optional profile
    pub fn synthesize(
        &self,
        attempts: &[TestAttempt],
        sessions: &[EmgSession],
        profile: Option<&UserProfile>,
    ) -> TrainingPlan {
        let _span = info_span!(
            "synthesize_plan",
            user_id = profile.map(|p| p.id.as_str()).unwrap_or("anonymous"),
            attempts = attempts.len(),
            sessions = sessions.len()
        )
        .entered();

        let performance = self.analyze_performance(attempts);
        let muscles = self.analyze_muscles(sessions);

        let intensity = self.intensity(performance.avg_form_score);
        let frequency = if muscles.recovery_needed {
            RECOVERY_FREQUENCY
        } else {
            STANDARD_FREQUENCY
        };

        let focus = self.focus(!attempts.is_empty(), &performance, &muscles);
        let exercises = self.exercises(&performance, &muscles);

        debug!(
            intensity = %intensity,
            frequency,
            focus = ?focus,
            exercises = exercises.len(),
            "training plan synthesized"
        );

        TrainingPlan {
            user_id: profile.map(|p| p.id.clone()),
            focus,
            intensity,
            frequency: frequency.to_string(),
            exercises,
            strengths: performance.strengths,
            weaknesses: performance.weaknesses,
            muscle_weaknesses: muscles.weak_muscles,
            avg_form_score: performance.avg_form_score.round_dp(2),
            avg_muscle_activity: muscles.avg_muscle_activity,
        }
    }

    /// Average form score overall and per test type
    ///
    /// Groups keep the order in which their test type first appears.
    pub fn analyze_performance(&self, attempts: &[TestAttempt]) -> PerformanceAnalysis {
        if attempts.is_empty() {
            return PerformanceAnalysis {
                avg_form_score: Decimal::ZERO,
                strengths: Vec::new(),
                weaknesses: Vec::new(),
            };
        }

        let mut groups: Vec<(TestType, Decimal, u32)> = Vec::new();
        let mut total = Decimal::ZERO;

        for attempt in attempts {
            let score = attempt.form_score.clamp(Decimal::ZERO, dec!(100));
            total += score;
            match groups.iter_mut().find(|(t, _, _)| *t == attempt.test_type) {
                Some((_, sum, count)) => {
                    *sum += score;
                    *count += 1;
                }
                None => groups.push((attempt.test_type, score, 1)),
            }
        }

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        for (test_type, sum, count) in groups {
            let mean = sum / Decimal::from(count);
            if mean > self.settings.strength_form_score {
                strengths.push(test_type);
            } else if mean < self.settings.weakness_form_score {
                weaknesses.push(test_type);
            }
        }

        PerformanceAnalysis {
            avg_form_score: total / Decimal::from(attempts.len() as u64),
            strengths,
            weaknesses,
        }
    }

    /// Average muscle activity and recovery need across sessions
    pub fn analyze_muscles(&self, sessions: &[EmgSession]) -> MuscleAnalysis {
        if sessions.is_empty() {
            return MuscleAnalysis {
                avg_muscle_activity: 0.0,
                weak_muscles: Vec::new(),
                low_activation: false,
                recovery_needed: false,
            };
        }

        let avg_muscle_activity = sessions
            .iter()
            .map(|s| finite_or_zero(s.session_data.avg_muscle_activity))
            .sum::<f64>()
            / sessions.len() as f64;

        let mut weak_muscles = Vec::new();
        if avg_muscle_activity < self.settings.low_activation {
            weak_muscles.push(CORE_STRENGTH.to_string());
        }
        if avg_muscle_activity < self.settings.very_low_activation {
            weak_muscles.push(UPPER_BODY.to_string());
        }

        let recovery_needed = sessions
            .iter()
            .any(|s| finite_or_zero(s.session_data.avg_fatigue) > self.settings.high_fatigue);

        MuscleAnalysis {
            avg_muscle_activity,
            low_activation: avg_muscle_activity < self.settings.low_activation,
            weak_muscles,
            recovery_needed,
        }
    }

    fn intensity(&self, avg_form_score: Decimal) -> Intensity {
        if avg_form_score > self.settings.high_intensity_form_score {
            Intensity::High
        } else if avg_form_score > self.settings.medium_intensity_form_score {
            Intensity::Medium
        } else {
            Intensity::Low
        }
    }

    fn focus(&self, has_attempts: bool, performance: &PerformanceAnalysis, muscles: &MuscleAnalysis) -> Vec<String> {
        let mut focus: Vec<String> = Vec::new();
        let mut push = |category: &str| {
            if !focus.iter().any(|f| f == category) {
                focus.push(category.to_string());
            }
        };

        if muscles.low_activation {
            push(MUSCLE_ACTIVATION);
        }
        for test_type in &performance.weaknesses {
            push(focus_category(*test_type));
        }
        if has_attempts && performance.avg_form_score < self.settings.form_improvement_score {
            push(FORM_IMPROVEMENT);
        }

        if focus.is_empty() {
            focus.push(GENERAL_FITNESS.to_string());
        }
        focus
    }

    fn exercises(&self, performance: &PerformanceAnalysis, muscles: &MuscleAnalysis) -> Vec<Exercise> {
        let mut exercises: Vec<Exercise> = Vec::new();

        if muscles.low_activation {
            exercises.push(Exercise::new(
                "EMG-Guided Push-ups",
                3,
                "8-12",
                "60s",
                &["Chest", "Triceps"],
                self.settings.emg_target_threshold,
            ));
        }

        for test_type in &performance.weaknesses {
            let exercise = Exercise::for_weakness(*test_type);
            if !exercises.iter().any(|e| e.name == exercise.name) {
                exercises.push(exercise);
            }
        }

        if exercises.is_empty() {
            Exercise::defaults()
        } else {
            exercises
        }
    }
}

/// Synthesize a plan with the default settings
pub fn synthesize_plan(
    attempts: &[TestAttempt],
    sessions: &[EmgSession],
    profile: Option<&UserProfile>,
) -> TrainingPlan {
    PlanSynthesizer::default().synthesize(attempts, sessions, profile)
}

impl TrainingPlan {
    /// Average form score as a float, for display
    pub fn avg_form_score_f64(&self) -> f64 {
        self.avg_form_score.to_f64().unwrap_or_default()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
