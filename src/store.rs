//! Persistence collaborators
//!
//! The assessment core never talks to storage directly. Attempts, EMG
//! sessions and profiles are read through these traits so the service can be
//! backed by the in-memory store (tests, one-shot CLI runs) or by
//! [`crate::database::SqliteStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::models::{EmgSession, TestAttempt, UserProfile};

/// Append-only log of test attempts
pub trait AttemptStore: Send + Sync {
    fn save_attempt(&self, attempt: &TestAttempt) -> Result<()>;

    /// Most recent attempts for a user, newest first
    fn list_recent_attempts(&self, user_id: &str, limit: usize) -> Result<Vec<TestAttempt>>;

    /// Every attempt of every user, newest first
    fn list_all_attempts(&self) -> Result<Vec<TestAttempt>>;
}

/// Append-only log of EMG sessions
pub trait EmgSessionStore: Send + Sync {
    fn save_session(&self, session: &EmgSession) -> Result<()>;

    /// Most recent sessions for a user, newest first
    fn list_recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<EmgSession>>;
}

/// Profiles keyed by user id
pub trait ProfileStore: Send + Sync {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// Insert or replace
    fn save_profile(&self, profile: &UserProfile) -> Result<()>;

    fn list_profiles(&self) -> Result<Vec<UserProfile>>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    attempts: RwLock<Vec<TestAttempt>>,
    sessions: RwLock<Vec<EmgSession>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Stable sort keeps insertion order for equal timestamps, so reversing first
// puts the later insert ahead.
fn newest_first<T: Clone>(items: &[T], key: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    let mut sorted: Vec<T> = items.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| key(b).cmp(&key(a)));
    sorted
}

impl AttemptStore for InMemoryStore {
    fn save_attempt(&self, attempt: &TestAttempt) -> Result<()> {
        let mut attempts = self.attempts.write().map_err(|_| StoreError::Poisoned)?;
        attempts.push(attempt.clone());
        Ok(())
    }

    fn list_recent_attempts(&self, user_id: &str, limit: usize) -> Result<Vec<TestAttempt>> {
        let attempts = self.attempts.read().map_err(|_| StoreError::Poisoned)?;
        let owned: Vec<TestAttempt> = attempts.iter().filter(|a| a.user_id == user_id).cloned().collect();
        let mut recent = newest_first(&owned, |a| a.created_at);
        recent.truncate(limit);
        Ok(recent)
    }

    fn list_all_attempts(&self) -> Result<Vec<TestAttempt>> {
        let attempts = self.attempts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(newest_first(&attempts, |a| a.created_at))
    }
}

impl EmgSessionStore for InMemoryStore {
    fn save_session(&self, session: &EmgSession) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| StoreError::Poisoned)?;
        sessions.push(session.clone());
        Ok(())
    }

    fn list_recent_sessions(&self, user_id: &str, limit: usize) -> Result<Vec<EmgSession>> {
        let sessions = self.sessions.read().map_err(|_| StoreError::Poisoned)?;
        let owned: Vec<EmgSession> = sessions.iter().filter(|s| s.user_id == user_id).cloned().collect();
        let mut recent = newest_first(&owned, |s| s.timestamp);
        recent.truncate(limit);
        Ok(recent)
    }
}

impl ProfileStore for InMemoryStore {
    fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let profiles = self.profiles.read().map_err(|_| StoreError::Poisoned)?;
        Ok(profiles.get(user_id).cloned())
    }

    fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut profiles = self.profiles.write().map_err(|_| StoreError::Poisoned)?;
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    fn list_profiles(&self) -> Result<Vec<UserProfile>> {
        let profiles = self.profiles.read().map_err(|_| StoreError::Poisoned)?;
        let mut list: Vec<UserProfile> = profiles.values().cloned().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }
}
