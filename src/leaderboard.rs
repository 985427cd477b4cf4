use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FitAssessError;
use crate::models::{TestAttempt, TestType, Tier, UserProfile};

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

/// Geographic scope of a leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardLevel {
    District,
    State,
    #[default]
    National,
}

impl fmt::Display for LeaderboardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardLevel::District => write!(f, "district"),
            LeaderboardLevel::State => write!(f, "state"),
            LeaderboardLevel::National => write!(f, "national"),
        }
    }
}

impl FromStr for LeaderboardLevel {
    type Err = FitAssessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "district" => Ok(LeaderboardLevel::District),
            "state" => Ok(LeaderboardLevel::State),
            "national" => Ok(LeaderboardLevel::National),
            _ => Err(FitAssessError::Validation(format!("Unknown leaderboard level: {}", s))),
        }
    }
}

/// Leaderboard filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    pub level: LeaderboardLevel,
    /// District or state name, matched against the profile for that level
    pub region: Option<String>,
    pub sport: Option<String>,
    /// Rank on a single test type instead of all attempts
    pub test_type: Option<TestType>,
    pub limit: usize,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            level: LeaderboardLevel::default(),
            region: None,
            sport: None,
            test_type: None,
            limit: DEFAULT_LEADERBOARD_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub name: String,
    pub district: Option<String>,
    pub state: Option<String>,
    /// Best form score across the ranked attempts
    pub score: Decimal,
    /// Best tier across the ranked attempts
    pub badge: Tier,
    pub attempts: usize,
}

pub struct Leaderboard;

impl Leaderboard {
    /// Rank users by their best form score
    ///
    /// Users without a stored profile are ranked under their id, and are
    /// excluded by any region or sport filter.
    pub fn build(query: &LeaderboardQuery, profiles: &[UserProfile], attempts: &[TestAttempt]) -> Vec<LeaderboardEntry> {
        let profiles: HashMap<&str, &UserProfile> = profiles.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut best: HashMap<&str, (Decimal, Tier, usize)> = HashMap::new();
        for attempt in attempts {
            if query.test_type.is_some_and(|t| t != attempt.test_type) {
                continue;
            }
            let entry = best
                .entry(attempt.user_id.as_str())
                .or_insert((attempt.form_score, attempt.badge, 0));
            entry.0 = entry.0.max(attempt.form_score);
            entry.1 = entry.1.max(attempt.badge);
            entry.2 += 1;
        }

        let mut entries: Vec<LeaderboardEntry> = best
            .into_iter()
            .filter_map(|(user_id, (score, badge, count))| {
                let fallback;
                let profile = match profiles.get(user_id) {
                    Some(p) => *p,
                    None => {
                        fallback = UserProfile::new(user_id);
                        &fallback
                    }
                };
                if !Self::matches(query, profile) {
                    return None;
                }
                Some(LeaderboardEntry {
                    rank: 0,
                    user_id: user_id.to_string(),
                    name: profile.display_name().to_string(),
                    district: profile.district.clone(),
                    state: profile.state.clone(),
                    score,
                    badge,
                    attempts: count,
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.badge.cmp(&a.badge))
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        entries.truncate(query.limit);
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        entries
    }

    fn matches(query: &LeaderboardQuery, profile: &UserProfile) -> bool {
        let same = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            None => true,
            Some(w) => actual.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(w.trim())),
        };

        let region_ok = match query.level {
            LeaderboardLevel::District => same(&query.region, &profile.district),
            LeaderboardLevel::State => same(&query.region, &profile.state),
            LeaderboardLevel::National => true,
        };

        region_ok && same(&query.sport, &profile.sport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricSet;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn attempt(user_id: &str, test_type: TestType, form_score: Decimal, badge: Tier) -> TestAttempt {
        TestAttempt {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            test_type,
            metrics: MetricSet::new(),
            form_score,
            badge,
            recommendations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn profile(id: &str, name: &str, district: &str, state: &str, sport: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: Some(name.to_string()),
            district: Some(district.to_string()),
            state: Some(state.to_string()),
            sport: Some(sport.to_string()),
            ..Default::default()
        }
    }

    fn fixture() -> (Vec<UserProfile>, Vec<TestAttempt>) {
        let profiles = vec![
            profile("u1", "Asha", "Pune", "Maharashtra", "athletics"),
            profile("u2", "Bilal", "Nagpur", "Maharashtra", "football"),
            profile("u3", "Chitra", "Kochi", "Kerala", "athletics"),
        ];
        let attempts = vec![
            attempt("u1", TestType::SitUps, dec!(80), Tier::Good),
            attempt("u1", TestType::PushUps, dec!(70), Tier::StateLevel),
            attempt("u2", TestType::SitUps, dec!(92), Tier::DistrictElite),
            attempt("u3", TestType::VerticalJump, dec!(80), Tier::NationalStandard),
        ];
        (profiles, attempts)
    }

    #[test]
    fn test_national_ranking() {
        let (profiles, attempts) = fixture();
        let board = Leaderboard::build(&LeaderboardQuery::default(), &profiles, &attempts);

        let ids: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        // u1 and u3 tie on score; u3 holds the better badge
        assert_eq!(ids, vec!["u2", "u3", "u1"]);
        assert_eq!(board[2].badge, Tier::StateLevel);
        assert_eq!(board[2].attempts, 2);
        assert_eq!(board.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_level_and_sport_filters() {
        let (profiles, attempts) = fixture();

        let state = LeaderboardQuery {
            level: LeaderboardLevel::State,
            region: Some("maharashtra".to_string()),
            ..Default::default()
        };
        let board = Leaderboard::build(&state, &profiles, &attempts);
        assert_eq!(board.len(), 2);

        let district = LeaderboardQuery {
            level: LeaderboardLevel::District,
            region: Some("Pune".to_string()),
            ..Default::default()
        };
        assert_eq!(Leaderboard::build(&district, &profiles, &attempts)[0].name, "Asha");

        let sport = LeaderboardQuery {
            sport: Some("athletics".to_string()),
            ..Default::default()
        };
        let board = Leaderboard::build(&sport, &profiles, &attempts);
        assert_eq!(board.len(), 2);
        assert!(board.iter().all(|e| e.user_id != "u2"));
    }

    #[test]
    fn test_test_type_filter_and_limit() {
        let (profiles, attempts) = fixture();
        let query = LeaderboardQuery {
            test_type: Some(TestType::SitUps),
            limit: 1,
            ..Default::default()
        };
        let board = Leaderboard::build(&query, &profiles, &attempts);
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].user_id, "u2");
        assert_eq!(board[0].score, dec!(92));
    }

    #[test]
    fn test_user_without_profile() {
        let attempts = vec![attempt("ghost", TestType::SitUps, dec!(50), Tier::Good)];
        let board = Leaderboard::build(&LeaderboardQuery::default(), &[], &attempts);
        assert_eq!(board[0].name, "ghost");

        let filtered = LeaderboardQuery {
            level: LeaderboardLevel::District,
            region: Some("Pune".to_string()),
            ..Default::default()
        };
        assert!(Leaderboard::build(&filtered, &[], &attempts).is_empty());
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("STATE".parse::<LeaderboardLevel>().unwrap(), LeaderboardLevel::State);
        assert!("galactic".parse::<LeaderboardLevel>().is_err());
    }
}
