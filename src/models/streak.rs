// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weekly attendance streak record and its transition rules.
//!
//! A streak counts consecutive Saturdays with a one-week grace period:
//! missing a single Saturday keeps the streak alive, missing two in a row
//! resets it. Reaching [`MILESTONE_WEEKS`] awards the season milestone once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Streak length that triggers the one-time season milestone.
pub const MILESTONE_WEEKS: u32 = 4;

/// Largest gap (in weeks) between counted Saturdays that still continues a streak.
pub const MAX_CONTINUATION_GAP_WEEKS: i64 = 2;

/// Identity of a streak record: one per member and season.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreakKey {
    pub member_id: String,
    pub season_id: String,
}

impl StreakKey {
    pub fn new(member_id: impl Into<String>, season_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            season_id: season_id.into(),
        }
    }

    /// Document ID used by persistent stores.
    ///
    /// Each part is percent-encoded with `_` escaped as well, so the `__`
    /// separator cannot occur inside a part and `/` never reaches the path.
    pub fn document_id(&self) -> String {
        format!(
            "{}__{}",
            encode_id_part(&self.member_id),
            encode_id_part(&self.season_id)
        )
    }
}

fn encode_id_part(part: &str) -> String {
    urlencoding::encode(part).replace('_', "%5F")
}

impl fmt::Display for StreakKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.member_id, self.season_id)
    }
}

/// Persisted streak state for one member in one season.
///
/// Stored at: `attendance_streaks/{member_id}__{season_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub member_id: String,
    pub season_id: String,

    /// Consecutive qualifying weeks counted so far
    #[serde(default)]
    pub current_streak_weeks: u32,
    /// Highest `current_streak_weeks` reached this season
    #[serde(default)]
    pub best_streak_weeks: u32,
    /// Local-midnight Saturday of the last counted attendance
    #[serde(default)]
    pub last_counted_saturday: Option<DateTime<Utc>>,

    /// Write-once: never reset within a season
    #[serde(default)]
    pub milestone_awarded: bool,
    #[serde(default)]
    pub milestone_awarded_at: Option<DateTime<Utc>>,

    /// Incremented by the store on every successful save.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreakRecord {
    /// A zeroed record, as created on first qualifying attendance.
    pub fn new(key: &StreakKey, now: DateTime<Utc>) -> Self {
        Self {
            member_id: key.member_id.clone(),
            season_id: key.season_id.clone(),
            current_streak_weeks: 0,
            best_streak_weeks: 0,
            last_counted_saturday: None,
            milestone_awarded: false,
            milestone_awarded_at: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> StreakKey {
        StreakKey::new(&self.member_id, &self.season_id)
    }

    /// Current position in the streak state machine.
    pub fn state(&self) -> StreakState {
        match self.last_counted_saturday {
            None => StreakState::NoHistory,
            Some(last_saturday) => StreakState::Active {
                weeks: self.current_streak_weeks,
                last_saturday,
            },
        }
    }

    /// Count an attendance on `saturday` (already normalized to local midnight).
    ///
    /// Returns the transition taken and whether the milestone was awarded by
    /// this call. The record is left untouched for
    /// [`StreakTransition::AlreadyCounted`] and [`StreakTransition::OutOfOrder`].
    pub fn apply_saturday(
        &mut self,
        saturday: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> (StreakTransition, bool) {
        let transition = advance_streak(self.state(), saturday);

        let weeks = match transition {
            StreakTransition::AlreadyCounted | StreakTransition::OutOfOrder { .. } => {
                return (transition, false);
            }
            StreakTransition::Started => 1,
            StreakTransition::Reset { .. } => 1,
            StreakTransition::Continued { .. } => self.current_streak_weeks + 1,
        };

        self.current_streak_weeks = weeks;
        self.last_counted_saturday = Some(saturday);
        if self.current_streak_weeks > self.best_streak_weeks {
            self.best_streak_weeks = self.current_streak_weeks;
        }
        self.updated_at = now;

        let award = self.current_streak_weeks >= MILESTONE_WEEKS && !self.milestone_awarded;
        if award {
            self.milestone_awarded = true;
            self.milestone_awarded_at = Some(now);
        }

        (transition, award)
    }
}

/// Streak state derived from the persisted fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakState {
    NoHistory,
    Active {
        weeks: u32,
        last_saturday: DateTime<Utc>,
    },
}

/// Outcome of presenting a Saturday to a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakTransition {
    /// First qualifying attendance
    Started,
    /// Gap of one or two weeks
    Continued { weeks_between: i64 },
    /// Gap of three weeks or more
    Reset { weeks_between: i64 },
    /// Saturday already counted
    AlreadyCounted,
    /// Saturday earlier than the last counted one
    OutOfOrder { weeks_between: i64 },
}

impl StreakTransition {
    /// Whether the transition changes the record.
    pub fn counts(&self) -> bool {
        matches!(
            self,
            StreakTransition::Started
                | StreakTransition::Continued { .. }
                | StreakTransition::Reset { .. }
        )
    }
}

/// Decide how `saturday` affects a streak in `state`.
pub fn advance_streak(state: StreakState, saturday: DateTime<Utc>) -> StreakTransition {
    let last_saturday = match state {
        StreakState::NoHistory => return StreakTransition::Started,
        StreakState::Active { last_saturday, .. } => last_saturday,
    };

    if last_saturday.timestamp_millis() == saturday.timestamp_millis() {
        return StreakTransition::AlreadyCounted;
    }

    let weeks_between = weeks_between(last_saturday, saturday);
    if weeks_between <= 0 {
        StreakTransition::OutOfOrder { weeks_between }
    } else if weeks_between > MAX_CONTINUATION_GAP_WEEKS {
        StreakTransition::Reset { weeks_between }
    } else {
        StreakTransition::Continued { weeks_between }
    }
}

/// Whole weeks from `from` to `to`, rounded to the nearest week.
///
/// Rounding absorbs the one-hour drift of local midnights across DST changes.
pub fn weeks_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    let week_ms = Duration::weeks(1).num_milliseconds() as f64;
    let diff_ms = (to - from).num_milliseconds() as f64;
    (diff_ms / week_ms).round() as i64
}
