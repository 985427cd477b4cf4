use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{settings::Style, Table, Tabled};

use fitassess::config::AppConfig;
use fitassess::database::SqliteStore;
use fitassess::emg::SessionInsights;
use fitassess::leaderboard::{LeaderboardLevel, LeaderboardQuery, DEFAULT_LEADERBOARD_LIMIT};
use fitassess::logging::{init_logging, LogFormat};
use fitassess::metrics::MetricExtractor;
use fitassess::service::{AssessmentService, AttemptRequest};
use fitassess::thresholds::{Direction, ThresholdLoader};
use fitassess::tiers::TierClassifier;
use fitassess::{EmgSample, ErrorSeverity, TestType, Tier, TrainingPlan, UserProfile};

/// fitassess - Fitness Assessment CLI
///
/// Classifies fitness test results into performance tiers and builds
/// personalised training plans from attempt and EMG history.
#[derive(Parser)]
#[command(name = "fitassess")]
#[command(version)]
#[command(about = "Fitness assessment and training plan CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Results database (overrides the config file)
    #[arg(long, value_name = "FILE", global = true)]
    db: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format (pretty, json, compact)
    #[arg(long, value_name = "FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a primary metric value into a tier
    Classify {
        /// Test type tag (e.g. pushUps)
        test_type: String,

        /// Primary metric value (reps, cm, km, seconds or BMI)
        value: Decimal,

        /// Classify against a standalone threshold file instead of the config
        #[arg(long, value_name = "FILE")]
        threshold_file: Option<PathBuf>,
    },

    /// Normalize a raw metric payload
    Extract {
        /// Test type tag
        test_type: String,

        /// Metric payload as JSON
        #[arg(short, long)]
        metrics: String,

        /// Reject malformed values instead of defaulting them to 0
        #[arg(long)]
        strict: bool,
    },

    /// Record a completed test attempt
    Record {
        #[arg(short, long)]
        user: String,

        #[arg(short, long)]
        test_type: String,

        /// Metric payload as JSON
        #[arg(short, long)]
        metrics: String,

        /// Form score (0-100)
        #[arg(short, long)]
        form_score: Decimal,

        /// Coaching tip; repeat for several
        #[arg(short, long = "recommendation")]
        recommendations: Vec<String>,
    },

    /// Record an EMG session from a JSON array of samples
    Emg {
        #[arg(short, long)]
        user: String,

        /// Samples file
        #[arg(short, long)]
        file: PathBuf,

        /// Session length in seconds
        #[arg(short, long)]
        seconds: f64,
    },

    /// Generate a training plan from recent history
    Plan {
        #[arg(short, long)]
        user: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a user's assessment statistics
    Stats {
        #[arg(short, long)]
        user: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank users by best form score
    Leaderboard {
        /// district, state or national
        #[arg(short, long, default_value = "national")]
        level: LeaderboardLevel,

        /// District or state name for the chosen level
        #[arg(short, long)]
        region: Option<String>,

        #[arg(short, long)]
        sport: Option<String>,

        /// Rank on one test type only
        #[arg(short, long)]
        test_type: Option<TestType>,

        #[arg(long, default_value_t = DEFAULT_LEADERBOARD_LIMIT)]
        limit: usize,
    },

    /// Show or update a user profile
    Profile {
        #[arg(short, long)]
        user: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        age: Option<u8>,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long)]
        district: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        sport: Option<String>,
    },

    /// Manage configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,

        /// Print the tier threshold table
        #[arg(long)]
        thresholds: bool,

        /// Validate and print a standalone threshold file
        #[arg(long, value_name = "FILE")]
        threshold_file: Option<PathBuf>,
    },

    /// Show the results database location and row counts
    Database,
}

#[derive(Tabled)]
struct ThresholdRow {
    #[tabled(rename = "Test")]
    test: String,
    #[tabled(rename = "Good")]
    good: String,
    #[tabled(rename = "District Elite")]
    district_elite: String,
    #[tabled(rename = "State Level")]
    state_level: String,
    #[tabled(rename = "National Standard")]
    national: String,
    #[tabled(rename = "Better")]
    direction: String,
}

#[derive(Tabled)]
struct ExerciseRow {
    #[tabled(rename = "Exercise")]
    name: String,
    #[tabled(rename = "Sets")]
    sets: u32,
    #[tabled(rename = "Reps")]
    reps: String,
    #[tabled(rename = "Rest")]
    rest: String,
    #[tabled(rename = "Targets")]
    targets: String,
    #[tabled(rename = "EMG %")]
    emg_threshold: u8,
}

#[derive(Tabled)]
struct LeaderboardRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Badge")]
    badge: String,
    #[tabled(rename = "Attempts")]
    attempts: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.storage.database_path = db.clone();
    }

    let mut log_config = config.logging.to_log_config();
    log_config.level = config.logging.level.raised_by(cli.verbose);
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(&log_config)?;

    match cli.command {
        Commands::Classify { test_type, value, threshold_file } => {
            let table = match &threshold_file {
                Some(path) => ThresholdLoader::load_from_file(path).map_err(user_error)?,
                None => config.threshold_table()?,
            };
            let classifier = TierClassifier::new(table);
            let test_type: TestType = test_type.parse().map_err(user_error)?;
            let tier = classifier.classify(test_type, value).map_err(user_error)?;
            println!("{} {} → {}", test_type.display_name().bold(), value, paint_tier(tier));
        }

        Commands::Extract { test_type, metrics, strict } => {
            let payload: serde_json::Value =
                serde_json::from_str(&metrics).context("Metric payload is not valid JSON")?;
            let parsed: TestType = test_type.parse().map_err(user_error)?;
            if strict {
                MetricExtractor::validate(parsed, &payload).map_err(user_error)?;
            }
            let extracted = MetricExtractor::extract_for(parsed, &payload);
            println!("{}", serde_json::to_string_pretty(&extracted)?);
        }

        Commands::Record { user, test_type, metrics, form_score, recommendations } => {
            let service = open_service(&config)?;
            let payload: serde_json::Value =
                serde_json::from_str(&metrics).context("Metric payload is not valid JSON")?;
            let attempt = service
                .record_attempt(AttemptRequest {
                    user_id: user,
                    test_type,
                    metrics: payload,
                    form_score,
                    recommendations,
                    created_at: None,
                })
                .map_err(user_error)?;

            println!("{}", "✓ Attempt recorded".green().bold());
            println!("  ID: {}", attempt.id);
            println!("  Test: {}", attempt.test_type.display_name());
            println!("  Badge: {}", paint_tier(attempt.badge));
            println!("  Form score: {}", attempt.form_score);
        }

        Commands::Emg { user, file, seconds } => {
            let service = open_service(&config)?;
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read EMG samples: {}", file.display()))?;
            let samples: Vec<EmgSample> =
                serde_json::from_str(&content).context("EMG samples must be a JSON array")?;

            let session = service.record_emg_session(&user, &samples, seconds, None)?;
            let insights = SessionInsights::derive(&session.session_data);

            println!("{}", "✓ EMG session recorded".green().bold());
            println!("  {}", insights.summary);
            println!("  Performance: {}", insights.performance);
            println!("  Fatigue: {}", insights.fatigue);
            println!("  Activation: {}", insights.activation_pattern);
            for recommendation in &insights.recommendations {
                println!("  • {}", recommendation);
            }
        }

        Commands::Plan { user, json } => {
            let service = open_service(&config)?;
            let plan = service.generate_plan(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }

        Commands::Stats { user, json } => {
            let service = open_service(&config)?;
            let stats = service.user_stats(&user)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", format!("Statistics for {}", user).cyan().bold());
                println!("  Attempts: {}", stats.total_attempts);
                println!("  Average form score: {}", stats.average_form_score);
                println!("  Trend: {}", stats.recent_trend);
                println!("  Weekly progress: {}%", stats.weekly_progress);
                for (test_type, best) in &stats.best_performances {
                    println!(
                        "  Best {}: {} ({})",
                        test_type.display_name(),
                        best.form_score,
                        paint_tier(best.badge)
                    );
                }
            }
        }

        Commands::Leaderboard { level, region, sport, test_type, limit } => {
            let service = open_service(&config)?;
            let entries = service.leaderboard(&LeaderboardQuery {
                level,
                region,
                sport,
                test_type,
                limit,
            })?;

            if entries.is_empty() {
                println!("{}", "No ranked attempts yet".yellow());
            } else {
                let rows: Vec<LeaderboardRow> = entries
                    .into_iter()
                    .map(|e| LeaderboardRow {
                        rank: e.rank,
                        name: e.name,
                        region: match level {
                            LeaderboardLevel::District => e.district.unwrap_or_default(),
                            _ => e.state.unwrap_or_default(),
                        },
                        score: e.score.to_string(),
                        badge: e.badge.to_string(),
                        attempts: e.attempts,
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Profile { user, name, email, age, gender, district, state, sport } => {
            let service = open_service(&config)?;
            let mut profile = service.profile(&user)?.unwrap_or_else(|| UserProfile::new(user.clone()));

            let updates = [
                (&mut profile.name, name),
                (&mut profile.email, email),
                (&mut profile.gender, gender),
                (&mut profile.district, district),
                (&mut profile.state, state),
                (&mut profile.sport, sport),
            ];
            let mut changed = age.is_some();
            for (field, value) in updates {
                if value.is_some() {
                    *field = value;
                    changed = true;
                }
            }
            if age.is_some() {
                profile.age = age;
            }

            if changed {
                service.save_profile(&profile).map_err(user_error)?;
                println!("{}", "✓ Profile saved".green().bold());
            }
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }

        Commands::Config { init, thresholds, threshold_file } => {
            let path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
            if init {
                let mut fresh = AppConfig::default();
                fresh.save_to_file(&path)?;
                println!("{} {}", "✓ Wrote".green(), path.display());
            }

            if thresholds || threshold_file.is_some() {
                let table = match &threshold_file {
                    Some(path) => ThresholdLoader::load_from_file(path).map_err(user_error)?,
                    None => config.threshold_table()?,
                };
                let rows: Vec<ThresholdRow> = TestType::ALL
                    .iter()
                    .filter_map(|t| table.get(*t).map(|th| (*t, th)))
                    .map(|(t, th)| {
                        let cuts = th.cut_points();
                        ThresholdRow {
                            test: t.as_str().to_string(),
                            good: cuts[0].to_string(),
                            district_elite: cuts[1].to_string(),
                            state_level: cuts[2].to_string(),
                            national: cuts[3].to_string(),
                            direction: match th.direction() {
                                Direction::Higher => "higher".to_string(),
                                Direction::Lower => "lower".to_string(),
                            },
                        }
                    })
                    .collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
                let bmi = table.bmi();
                println!("heightWeight: Good when BMI is within [{}, {}]", bmi.min, bmi.max);
            } else if !init {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }

        Commands::Database => {
            let path = &config.storage.database_path;
            let store = SqliteStore::open(path)
                .with_context(|| format!("Failed to open results database: {}", path.display()))?;
            let stats = store.get_stats().map_err(user_error)?;

            println!("{}", format!("Results database: {}", path.display()).cyan().bold());
            println!("  Test attempts: {}", stats.attempt_count);
            println!("  EMG sessions: {}", stats.session_count);
            println!("  Profiles: {}", stats.profile_count);
        }
    }

    Ok(())
}

fn open_service(config: &AppConfig) -> Result<AssessmentService> {
    let store = SqliteStore::open(&config.storage.database_path).with_context(|| {
        format!("Failed to open results database: {}", config.storage.database_path.display())
    })?;
    Ok(AssessmentService::with_store(config, Arc::new(store))?)
}

fn user_error(err: fitassess::FitAssessError) -> anyhow::Error {
    match err.severity() {
        ErrorSeverity::Warning => tracing::debug!(error = %err, "command rejected"),
        ErrorSeverity::Error | ErrorSeverity::Critical => tracing::error!(error = %err, "command failed"),
    }
    anyhow::anyhow!(err.user_message())
}

fn paint_tier(tier: Tier) -> ColoredString {
    let label = tier.label();
    match tier {
        Tier::NationalStandard => label.magenta().bold(),
        Tier::StateLevel => label.blue().bold(),
        Tier::DistrictElite => label.cyan().bold(),
        Tier::Good => label.green().bold(),
        Tier::NeedsImprovement => label.yellow(),
    }
}

fn print_plan(plan: &TrainingPlan) {
    let owner = plan.user_id.as_deref().unwrap_or("anonymous");
    println!("{}", format!("Training plan for {}", owner).cyan().bold());
    println!("  Focus: {}", plan.focus.join(", "));
    println!("  Intensity: {}", plan.intensity);
    println!("  Frequency: {}", plan.frequency);
    println!("  Average form score: {:.1}", plan.avg_form_score_f64());

    if !plan.strengths.is_empty() {
        let names: Vec<&str> = plan.strengths.iter().map(|t| t.display_name()).collect();
        println!("  Strengths: {}", names.join(", ").green());
    }
    if !plan.weaknesses.is_empty() {
        let names: Vec<&str> = plan.weaknesses.iter().map(|t| t.display_name()).collect();
        println!("  Weaknesses: {}", names.join(", ").yellow());
    }
    if !plan.muscle_weaknesses.is_empty() {
        println!("  Muscle activation: {}", plan.muscle_weaknesses.join(", ").yellow());
    }

    let rows: Vec<ExerciseRow> = plan
        .exercises
        .iter()
        .map(|e| ExerciseRow {
            name: e.name.clone(),
            sets: e.sets,
            reps: e.reps.clone(),
            rest: e.rest.clone(),
            targets: e.target_muscles.join(", "),
            emg_threshold: e.emg_threshold,
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}
