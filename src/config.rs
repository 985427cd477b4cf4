use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::thresholds::{ThresholdSection, ThresholdTable};
use crate::training_plan::PlanSettings;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Log output settings
    pub logging: LoggingSection,

    /// Results database settings
    pub storage: StorageSection,

    /// Plan synthesizer cut-offs
    pub plan: PlanSettings,

    /// Tier threshold overrides; unlisted test types keep the built-in table
    pub thresholds: ThresholdSection,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: "1.0".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Logging preferences, applied on top of command-line flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Daily-rolling JSON log file
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            file_path: None,
        }
    }
}

impl LoggingSection {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            format: self.format,
            file_path: self.file_path.clone(),
            ..LogConfig::default()
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// SQLite database path
    pub database_path: PathBuf,

    /// Attempts read per user when synthesizing a plan
    pub history_limit: usize,

    /// EMG sessions read per user when synthesizing a plan
    pub session_limit: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            database_path: AppConfig::config_dir().join("results.db"),
            history_limit: 20,
            session_limit: 5,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            metadata: ConfigMetadata::default(),
            logging: LoggingSection::default(),
            storage: StorageSection::default(),
            plan: PlanSettings::default(),
            thresholds: ThresholdSection::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// Threshold overrides are validated here so a bad table is reported at
    /// startup rather than on the first classification.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;

        config
            .threshold_table()
            .with_context(|| format!("Invalid thresholds in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Directory holding the config file and default database
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fitassess")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    ///
    /// A missing file is normal; a present but broken one is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from_file(&config_path)
    }

    /// Validated tier thresholds with defaults filled in
    pub fn threshold_table(&self) -> crate::error::Result<ThresholdTable> {
        ThresholdTable::from_section(&self.thresholds)
    }
}
