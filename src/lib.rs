// Library interface for fitassess modules
// This allows integration tests and the CLI to access the core functionality

pub mod config;
pub mod database;
pub mod emg;
pub mod error;
pub mod leaderboard;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod service;
pub mod stats;
pub mod store;
pub mod thresholds;
pub mod tiers;
pub mod training_plan;

// Re-export commonly used types for convenience
pub use models::*;
pub use error::{ErrorSeverity, FitAssessError, Result, StoreError, ThresholdError};
pub use metrics::MetricExtractor;
pub use tiers::{classify_tier, TierClassifier};
pub use training_plan::{synthesize_plan, Exercise, Intensity, PlanSettings, PlanSynthesizer, TrainingPlan};
pub use store::{AttemptStore, EmgSessionStore, InMemoryStore, ProfileStore};
pub use service::AssessmentService;
pub use logging::{LogConfig, LogFormat, LogLevel};
