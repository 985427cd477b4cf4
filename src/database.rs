use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::models::{EmgSample, EmgSession, EmgSessionData, MetricSet, TestAttempt, TestType, Tier, UserProfile};
use crate::store::{AttemptStore, EmgSessionStore, ProfileStore};

/// SQLite-backed attempt, session and profile store
///
/// Metrics, recommendations and EMG payloads are kept as JSON columns;
/// decimals are stored as text so they round-trip exactly.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub attempt_count: usize,
    pub session_count: usize,
    pub profile_count: usize,
}

impl SqliteStore {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(StoreError::from)?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;

        info!(path = %path.display(), "opened results database");
        Ok(store)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::from)?;
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock().map_err(|_| StoreError::Poisoned)?)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        // WAL for concurrent readers; in-memory databases report "memory"
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(StoreError::from)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(StoreError::from)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS test_attempts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                test_type TEXT NOT NULL,
                metrics TEXT NOT NULL,
                form_score TEXT NOT NULL,
                badge TEXT NOT NULL,
                recommendations TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_attempts_user_created
                ON test_attempts(user_id, created_at DESC);

            CREATE TABLE IF NOT EXISTS emg_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                session_data TEXT NOT NULL,
                emg_history TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_user_timestamp
                ON emg_sessions(user_id, timestamp DESC);

            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                name TEXT,
                email TEXT,
                age INTEGER,
                gender TEXT,
                district TEXT,
                state TEXT,
                sport TEXT,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(StoreError::from)?;

        debug!("results schema ready");
        Ok(())
    }

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .map_err(StoreError::from)?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            attempt_count: count("test_attempts")?,
            session_count: count("emg_sessions")?,
            profile_count: count("profiles")?,
        })
    }

    fn query_attempts(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<TestAttempt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql).map_err(StoreError::from)?;
        let rows = stmt
            .query_map(params, AttemptRow::from_row)
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;

        rows.into_iter().map(AttemptRow::into_attempt).collect()
    }
}

/// Raw columns of one attempt row, decoded outside the rusqlite callback
struct AttemptRow {
    id: String,
    user_id: String,
    test_type: String,
    metrics: serde_json::Value,
    form_score: String,
    badge: String,
    recommendations: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl AttemptRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            test_type: row.get("test_type")?,
            metrics: row.get("metrics")?,
            form_score: row.get("form_score")?,
            badge: row.get("badge")?,
            recommendations: row.get("recommendations")?,
            created_at: row.get("created_at")?,
        })
    }

    fn into_attempt(self) -> Result<TestAttempt> {
        let corrupt = |reason: String| StoreError::Corrupt {
            table: "test_attempts".to_string(),
            reason,
        };

        let test_type = TestType::from_str(&self.test_type)
            .map_err(|_| corrupt(format!("unknown test type '{}' on {}", self.test_type, self.id)))?;
        let badge = Tier::from_str(&self.badge)
            .map_err(|_| corrupt(format!("unknown badge '{}' on {}", self.badge, self.id)))?;
        let form_score = Decimal::from_str(&self.form_score)
            .map_err(|e| corrupt(format!("form score on {}: {}", self.id, e)))?;
        let metrics: MetricSet = serde_json::from_value(self.metrics)
            .map_err(|e| corrupt(format!("metrics on {}: {}", self.id, e)))?;
        let recommendations: Vec<String> = serde_json::from_value(self.recommendations)
            .map_err(|e| corrupt(format!("recommendations on {}: {}", self.id, e)))?;

        Ok(TestAttempt {
            id: self.id,
            user_id: self.user_id,
            test_type,
            metrics,
            form_score,
            badge,
            recommendations,
            created_at: self.created_at,
        })
    }
}

const ATTEMPT_COLUMNS: &str =
    "id, user_id, test_type, metrics, form_score, badge, recommendations, created_at";

impl AttemptStore for SqliteStore {
    fn save_attempt(&self, attempt: &TestAttempt) -> Result<()> {
        let metrics = serde_json::to_value(&attempt.metrics)?;
        let recommendations = serde_json::to_value(&attempt.recommendations)?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO test_attempts (
                id, user_id, test_type, metrics, form_score, badge, recommendations, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                attempt.id,
                attempt.user_id,
                attempt.test_type.as_str(),
                metrics,
                attempt.form_score.to_string(),
                attempt.badge.label(),
                recommendations,
                attempt.created_at,
            ],
        )
        .map_err(StoreError::from)?;

        debug!(attempt_id = %attempt.id, user_id = %attempt.user_id, "stored test attempt");
        Ok(())
    }

    fn list_recent_attempts(&self, user_id: &str, limit: usize) -> Result<Vec<TestAttempt>> {
        let sql = format!(
            "SELECT {} FROM test_attempts WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            ATTEMPT_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_attempts(&sql, &[&user_id, &limit])
    }

    fn list_all_attempts(&self) -> Result<Vec<TestAttempt>> {
        let sql = format!(
            "SELECT {} FROM test_attempts ORDER BY created_at DESC, rowid DESC",
            ATTEMPT_COLUMNS
        );
        self.query_attempts(&sql, &[])
    }
}

impl EmgSessionStore for SqliteStore {
    fn save_session(&self, session: &EmgSession) -> Result<()> {
        let session_data = serde_json::to_value(&session.session_data)?;
        let emg_history = serde_json::to_value(&session.emg_history)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO emg_sessions (user_id, timestamp, session_data, emg_history) VALUES (?1, ?2, ?3, ?4)",
            params![session.user_id, session.timestamp, session_data, emg_history],
        )
        .map_err(StoreError::from)?;

        debug!(user_id = %session.user_id, data_points = session.session_data.data_points, "stored EMG session");
        Ok(())
    }

    fn list_recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<EmgSession>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                r#"
                SELECT user_id, timestamp, session_data, emg_history
                FROM emg_sessions
                WHERE user_id = ?1
                ORDER BY timestamp DESC, id DESC
                LIMIT ?2
                "#,
            )
            .map_err(StoreError::from)?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![user_id, limit], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, DateTime<Utc>>(1)?,
                    row.get::<_, serde_json::Value>(2)?,
                    row.get::<_, serde_json::Value>(3)?,
                ))
            })
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;

        rows.into_iter()
            .map(|(user_id, timestamp, data, history)| {
                let corrupt = |e: serde_json::Error| StoreError::Corrupt {
                    table: "emg_sessions".to_string(),
                    reason: e.to_string(),
                };
                let session_data: EmgSessionData = serde_json::from_value(data).map_err(corrupt)?;
                let emg_history: Vec<EmgSample> = serde_json::from_value(history).map_err(corrupt)?;
                Ok(EmgSession {
                    user_id,
                    timestamp,
                    session_data,
                    emg_history,
                })
            })
            .collect()
    }
}

fn profile_from_row(row: &Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        age: row.get("age")?,
        gender: row.get("gender")?,
        district: row.get("district")?,
        state: row.get("state")?,
        sport: row.get("sport")?,
    })
}

impl ProfileStore for SqliteStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let conn = self.conn()?;
        let profile = conn
            .query_row(
                "SELECT id, name, email, age, gender, district, state, sport FROM profiles WHERE id = ?1",
                params![user_id],
                profile_from_row,
            )
            .optional()
            .map_err(StoreError::from)?;
        Ok(profile)
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO profiles (
                id, name, email, age, gender, district, state, sport, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                profile.id,
                profile.name,
                profile.email,
                profile.age,
                profile.gender,
                profile.district,
                profile.state,
                profile.sport,
                Utc::now(),
            ],
        )
        .map_err(StoreError::from)?;
        Ok(())
    }

    fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, email, age, gender, district, state, sport FROM profiles ORDER BY id")
            .map_err(StoreError::from)?;
        let profiles = stmt
            .query_map([], profile_from_row)
            .map_err(StoreError::from)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from)?;
        Ok(profiles)
    }
}
