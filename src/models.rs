use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FitAssessError;

/// Canonical metric mapping for one attempt, keyed by metric name
pub type MetricSet = BTreeMap<String, Decimal>;

/// Fitness assessment test types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TestType {
    VerticalJump,
    SitUps,
    PushUps,
    PullUps,
    ShuttleRun,
    EnduranceRun,
    FlexibilityTest,
    AgilityLadder,
    HeightWeight,
}

impl TestType {
    pub const ALL: [TestType; 9] = [
        TestType::VerticalJump,
        TestType::SitUps,
        TestType::PushUps,
        TestType::PullUps,
        TestType::ShuttleRun,
        TestType::EnduranceRun,
        TestType::FlexibilityTest,
        TestType::AgilityLadder,
        TestType::HeightWeight,
    ];

    /// Wire tag, as used by clients and stores
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::VerticalJump => "verticalJump",
            TestType::SitUps => "sitUps",
            TestType::PushUps => "pushUps",
            TestType::PullUps => "pullUps",
            TestType::ShuttleRun => "shuttleRun",
            TestType::EnduranceRun => "enduranceRun",
            TestType::FlexibilityTest => "flexibilityTest",
            TestType::AgilityLadder => "agilityLadder",
            TestType::HeightWeight => "heightWeight",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            TestType::VerticalJump => "Vertical Jump",
            TestType::SitUps => "Sit-ups",
            TestType::PushUps => "Push-ups",
            TestType::PullUps => "Pull-ups",
            TestType::ShuttleRun => "Shuttle Run",
            TestType::EnduranceRun => "Endurance Run",
            TestType::FlexibilityTest => "Flexibility Test",
            TestType::AgilityLadder => "Agility Ladder",
            TestType::HeightWeight => "Height & Weight",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TestType {
    type Err = FitAssessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FitAssessError::UnsupportedTestType(s.to_string()))
    }
}

/// Performance tier (badge), ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    NeedsImprovement,
    Good,
    DistrictElite,
    StateLevel,
    NationalStandard,
}

impl Tier {
    /// Tiers opened by the four ordered cut-points, lowest first
    pub const RANKED: [Tier; 4] = [
        Tier::Good,
        Tier::DistrictElite,
        Tier::StateLevel,
        Tier::NationalStandard,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tier::NeedsImprovement => "Needs Improvement",
            Tier::Good => "Good",
            Tier::DistrictElite => "District Elite",
            Tier::StateLevel => "State Level",
            Tier::NationalStandard => "National Standard",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Tier {
    type Err = FitAssessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        match normalized.to_lowercase().as_str() {
            "needsimprovement" => Ok(Tier::NeedsImprovement),
            "good" => Ok(Tier::Good),
            "districtelite" => Ok(Tier::DistrictElite),
            "statelevel" => Ok(Tier::StateLevel),
            "nationalstandard" => Ok(Tier::NationalStandard),
            _ => Err(FitAssessError::Validation(format!("Unknown tier: {}", s))),
        }
    }
}

/// One completed assessment. Append-only once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestAttempt {
    /// Unique identifier
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Which test was performed
    pub test_type: TestType,

    /// Canonical metrics for the test type
    pub metrics: MetricSet,

    /// Quality-of-execution score (0-100), independent of raw performance
    pub form_score: Decimal,

    /// Tier computed from the primary metric
    pub badge: Tier,

    /// Free-text coaching tips, in display order
    pub recommendations: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// One raw EMG reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmgSample {
    /// Raw sensor value
    pub emg: f64,

    /// Muscle activity percentage (0-100)
    pub muscle_activity: f64,

    /// Fatigue percentage (0-100)
    pub fatigue: f64,

    /// Activation detected by the device
    pub activated: bool,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

/// Aggregate statistics for one EMG session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmgSessionData {
    pub avg_muscle_activity: f64,
    pub max_muscle_activity: f64,
    pub avg_fatigue: f64,
    pub max_fatigue: f64,
    pub activation_rate: f64,
    /// Seconds with activation detected (estimated from activation share)
    pub total_active_time: f64,
    /// Session length in seconds
    pub total_session_time: f64,
    pub data_points: usize,
}

/// One muscle-sensor monitoring session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmgSession {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub session_data: EmgSessionData,
    /// Most recent raw readings, bounded window
    pub emg_history: Vec<EmgSample>,
}

/// User profile as held by the profile store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u8>,
    pub gender: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub sport: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Name for display, falling back to the user id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
