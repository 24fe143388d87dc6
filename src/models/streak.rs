// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily activity streak.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Streak document, keyed by user ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Streak {
    pub user_id: String,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    /// Last check-in day (`YYYY-MM-DD`, UTC)
    #[serde(default)]
    pub last_activity_date: Option<String>,
    #[serde(default)]
    pub updated_at: String,
}

/// What a check-in did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckIn {
    /// First check-in ever, or the streak was broken and restarted at 1.
    Started,
    /// Consecutive day; streak grew by one.
    Extended,
    /// Already checked in today.
    Unchanged,
}

impl Streak {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            updated_at: String::new(),
        }
    }

    /// Record activity on `today`.
    pub fn check_in(&mut self, today: NaiveDate) -> CheckIn {
        let last = self
            .last_activity_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok());

        let outcome = match last {
            Some(day) if day == today => return CheckIn::Unchanged,
            Some(day) if day.succ_opt() == Some(today) => {
                self.current_streak += 1;
                CheckIn::Extended
            }
            _ => {
                self.current_streak = 1;
                CheckIn::Started
            }
        };

        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_activity_date = Some(today.format(DATE_FORMAT).to_string());
        self.updated_at = chrono::Utc::now().to_rfc3339();
        outcome
    }

    /// Streak as it should be displayed on `today`: a streak whose last
    /// check-in is older than yesterday has lapsed and shows as zero.
    pub fn effective_current(&self, today: NaiveDate) -> u32 {
        let last = self
            .last_activity_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok());

        match last {
            Some(day) if day == today || day.succ_opt() == Some(today) => self.current_streak,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_first_check_in_starts_streak() {
        let mut streak = Streak::new("u1");
        assert_eq!(streak.check_in(day("2026-03-01")), CheckIn::Started);
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 1);
        assert_eq!(streak.last_activity_date.as_deref(), Some("2026-03-01"));
    }

    #[test]
    fn test_same_day_is_idempotent() {
        let mut streak = Streak::new("u1");
        streak.check_in(day("2026-03-01"));
        assert_eq!(streak.check_in(day("2026-03-01")), CheckIn::Unchanged);
        assert_eq!(streak.current_streak, 1);
    }

    #[test]
    fn test_consecutive_days_extend_across_month_boundary() {
        let mut streak = Streak::new("u1");
        streak.check_in(day("2026-02-27"));
        streak.check_in(day("2026-02-28"));
        assert_eq!(streak.check_in(day("2026-03-01")), CheckIn::Extended);
        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn test_gap_resets_current_but_keeps_longest() {
        let mut streak = Streak::new("u1");
        streak.check_in(day("2026-03-01"));
        streak.check_in(day("2026-03-02"));
        streak.check_in(day("2026-03-03"));

        assert_eq!(streak.check_in(day("2026-03-05")), CheckIn::Started);
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn test_effective_current_lapses_after_missed_day() {
        let mut streak = Streak::new("u1");
        streak.check_in(day("2026-03-01"));
        streak.check_in(day("2026-03-02"));

        assert_eq!(streak.effective_current(day("2026-03-02")), 2);
        assert_eq!(streak.effective_current(day("2026-03-03")), 2);
        assert_eq!(streak.effective_current(day("2026-03-04")), 0);
    }

    #[test]
    fn test_unparseable_last_date_restarts() {
        let mut streak = Streak::new("u1");
        streak.current_streak = 9;
        streak.longest_streak = 9;
        streak.last_activity_date = Some("garbage".to_string());

        assert_eq!(streak.check_in(day("2026-03-01")), CheckIn::Started);
        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 9);
    }
}
