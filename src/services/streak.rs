// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance streak service.
//!
//! Runs after an attendance has been stored and before points are assigned:
//! 1. Drop attendances that are not on a Saturday (reference timezone)
//! 2. Normalize to the Saturday's local midnight
//! 3. Get-or-create the member's streak record for the season
//! 4. Apply the streak transition and milestone check
//! 5. Save the record (revision-checked)

use crate::config::Config;
use crate::db::{ConfiguredStore, StreakStore};
use crate::error::{AppError, Result, StoreError};
use crate::models::{AttendanceEvent, StreakKey, StreakRecord, StreakTransition};
use crate::services::clock::{Clock, SystemClock};
use crate::time_utils::{format_utc_rfc3339, parse_date_like, saturday_of};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use validator::Validate;

/// Shared per-key locks serializing updates to one streak record.
pub type StreakLocks = Arc<DashMap<StreakKey, Arc<Mutex<()>>>>;

/// Result of counting a Saturday attendance.
#[derive(Debug, Clone, PartialEq)]
pub struct StreakUpdate {
    /// The record as stored after this call
    pub record: StreakRecord,
    /// True exactly once per member and season, when the milestone is reached
    pub award_milestone: bool,
    pub transition: StreakTransition,
}

/// Streak engine over a [`StreakStore`].
///
/// Clones share the store and the per-key locks.
#[derive(Clone)]
pub struct StreakService<S, C = SystemClock> {
    store: S,
    clock: C,
    timezone: Tz,
    locks: StreakLocks,
}

impl<S: StreakStore> StreakService<S> {
    pub fn new(store: S, timezone: Tz) -> Self {
        Self::with_clock(store, timezone, SystemClock)
    }

    /// Engine in the configured reference timezone.
    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(store, config.timezone)
    }
}

impl StreakService<ConfiguredStore> {
    /// Open the configured store backend and build an engine over it.
    pub async fn connect(config: &Config) -> std::result::Result<Self, StoreError> {
        let store = ConfiguredStore::from_config(config).await?;
        tracing::info!(
            backend = ?store.backend(),
            timezone = %config.timezone,
            "Streak engine ready"
        );
        Ok(Self::from_config(store, config))
    }
}

impl<S: StreakStore, C: Clock> StreakService<S, C> {
    pub fn with_clock(store: S, timezone: Tz, clock: C) -> Self {
        Self {
            store,
            clock,
            timezone,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate an attendance handed over by the registration flow and count it.
    pub async fn process_attendance(&self, event: &AttendanceEvent) -> Result<Option<StreakUpdate>> {
        event.validate()?;
        self.update_streak_on_attendance_str(
            &event.member_id,
            &event.season_id,
            &event.attendance_date,
        )
        .await
    }

    /// Count a date-like attendance value (see [`parse_date_like`]).
    pub async fn update_streak_on_attendance_str(
        &self,
        member_id: &str,
        season_id: &str,
        attendance_date: &str,
    ) -> Result<Option<StreakUpdate>> {
        let attendance = parse_date_like(attendance_date, self.timezone)?;
        self.update_streak_on_attendance(member_id, season_id, attendance)
            .await
    }

    /// Update the member's streak for an attendance at `attendance_date`.
    ///
    /// Returns `None` when the attendance is not on a Saturday in the
    /// reference timezone; nothing is read or written in that case.
    pub async fn update_streak_on_attendance(
        &self,
        member_id: &str,
        season_id: &str,
        attendance_date: DateTime<Utc>,
    ) -> Result<Option<StreakUpdate>> {
        if member_id.is_empty() || season_id.is_empty() {
            return Err(AppError::Validation(
                "member_id and season_id are required".to_string(),
            ));
        }

        let Some(saturday) = saturday_of(attendance_date, self.timezone) else {
            tracing::debug!(
                member_id,
                season_id,
                attendance = %format_utc_rfc3339(attendance_date),
                "Attendance is not on a Saturday, streak untouched"
            );
            return Ok(None);
        };

        let key = StreakKey::new(member_id, season_id);

        // Only one update per key runs at a time; the revision check in the
        // store covers writers in other processes.
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.count_saturday(&key, saturday).await
        };

        // Drop the entry unless another update is already waiting on it.
        drop(lock);
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        result.map(Some)
    }

    /// Steps 3-5 of the workflow. Callers hold the key's lock.
    async fn count_saturday(
        &self,
        key: &StreakKey,
        saturday: DateTime<Utc>,
    ) -> Result<StreakUpdate> {
        let (member_id, season_id) = (key.member_id.as_str(), key.season_id.as_str());
        let now = self.clock.now();
        let mut record = self
            .store
            .get_or_create(key, now)
            .await
            .map_err(|e| AppError::persistence(member_id, season_id, "get_or_create", e))?;

        let (transition, award_milestone) = record.apply_saturday(saturday, now);

        if !transition.counts() {
            tracing::debug!(
                member_id,
                season_id,
                saturday = %format_utc_rfc3339(saturday),
                ?transition,
                "Saturday not counted"
            );
            return Ok(StreakUpdate {
                record,
                award_milestone: false,
                transition,
            });
        }

        let record = self.store.save(&record).await.map_err(|e| {
            let err = AppError::persistence(member_id, season_id, "save", e);
            if err.is_conflict() {
                tracing::warn!(error = %err, "Streak record changed concurrently");
            } else {
                tracing::error!(error = %err, "Failed to save streak record");
            }
            err
        })?;

        tracing::info!(
            member_id,
            season_id,
            saturday = %format_utc_rfc3339(saturday),
            weeks = record.current_streak_weeks,
            best = record.best_streak_weeks,
            ?transition,
            "Streak updated"
        );

        if award_milestone {
            tracing::info!(
                member_id,
                season_id,
                weeks = record.current_streak_weeks,
                "Streak milestone reached"
            );
        }

        Ok(StreakUpdate {
            record,
            award_milestone,
            transition,
        })
    }

    /// Fetch a member's streak for a season, if one exists.
    pub async fn get_streak(&self, member_id: &str, season_id: &str) -> Result<Option<StreakRecord>> {
        self.store
            .get(&StreakKey::new(member_id, season_id))
            .await
            .map_err(|e| AppError::persistence(member_id, season_id, "get", e))
    }

    /// All streaks of a season, longest best streak first.
    pub async fn season_streaks(&self, season_id: &str) -> Result<Vec<StreakRecord>> {
        let mut records = self
            .store
            .list_for_season(season_id)
            .await
            .map_err(|e| AppError::persistence("*", season_id, "list_for_season", e))?;

        records.sort_by(|a, b| {
            b.best_streak_weeks
                .cmp(&a.best_streak_weeks)
                .then(b.current_streak_weeks.cmp(&a.current_streak_weeks))
                .then_with(|| a.member_id.cmp(&b.member_id))
        });
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStreakStore;
    use crate::services::clock::ManualClock;
    use chrono::TimeZone;
    use chrono_tz::America::Bogota;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 2, 18, 0, 0).unwrap())
    }

    fn service() -> StreakService<MemoryStreakStore, ManualClock> {
        StreakService::with_clock(MemoryStreakStore::new(), Bogota, clock())
    }

    #[test]
    fn test_from_config_uses_configured_timezone() {
        let config = Config {
            timezone: chrono_tz::Asia::Tokyo,
            ..Config::default()
        };
        let service = StreakService::from_config(MemoryStreakStore::new(), &config);
        assert_eq!(service.timezone(), chrono_tz::Asia::Tokyo);
    }

    #[tokio::test]
    async fn test_connect_selects_configured_backend() {
        let service = StreakService::connect(&Config::default()).await.unwrap();
        assert_eq!(service.store().backend(), crate::config::StoreBackend::Memory);

        let update = service
            .update_streak_on_attendance_str("m-1", "s-1", "2024-03-02")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.record.revision, 1);
    }

    #[tokio::test]
    async fn test_locks_released_after_updates() {
        let service = service();
        for date in ["2024-03-02", "2024-03-09", "2024-03-09", "2024-03-01"] {
            service
                .update_streak_on_attendance_str("m-1", "s-1", date)
                .await
                .unwrap();
        }
        assert!(service.locks.is_empty());

        let mut handles = Vec::new();
        for i in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let member = format!("m-{}", i % 4);
                service
                    .update_streak_on_attendance_str(&member, "s-1", "2024-03-16")
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_non_saturday_returns_none_without_write() {
        let service = service();
        let friday = Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap();

        let result = service
            .update_streak_on_attendance("m-1", "s-1", friday)
            .await
            .unwrap();

        assert!(result.is_none());
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn test_first_saturday_creates_and_saves_record() {
        let service = service();

        let update = service
            .update_streak_on_attendance_str("m-1", "s-1", "2024-03-02T09:30:00")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(update.transition, StreakTransition::Started);
        assert!(!update.award_milestone);
        assert_eq!(update.record.current_streak_weeks, 1);
        assert_eq!(update.record.best_streak_weeks, 1);
        assert_eq!(update.record.revision, 1);
        assert_eq!(
            update.record.last_counted_saturday,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 5, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_unchanged_outcomes_skip_save() {
        let service = service();
        service
            .update_streak_on_attendance_str("m-1", "s-1", "2024-03-09")
            .await
            .unwrap();

        let again = service
            .update_streak_on_attendance_str("m-1", "s-1", "2024-03-09T19:00:00")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.transition, StreakTransition::AlreadyCounted);
        assert_eq!(again.record.revision, 1);

        let earlier = service
            .update_streak_on_attendance_str("m-1", "s-1", "2024-03-02")
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            earlier.transition,
            StreakTransition::OutOfOrder { .. }
        ));
        assert_eq!(earlier.record.revision, 1);
    }

    #[tokio::test]
    async fn test_milestone_timestamp_comes_from_clock() {
        let clock = clock();
        let service = StreakService::with_clock(MemoryStreakStore::new(), Bogota, clock.clone());

        for date in ["2024-03-02", "2024-03-09", "2024-03-16"] {
            service
                .update_streak_on_attendance_str("m-1", "s-1", date)
                .await
                .unwrap();
        }

        let awarded_at = Utc.with_ymd_and_hms(2024, 3, 23, 20, 15, 0).unwrap();
        clock.set(awarded_at);
        let update = service
            .update_streak_on_attendance_str("m-1", "s-1", "2024-03-23")
            .await
            .unwrap()
            .unwrap();

        assert!(update.award_milestone);
        assert_eq!(update.record.milestone_awarded_at, Some(awarded_at));
    }

    #[tokio::test]
    async fn test_invalid_input_is_validation_error() {
        let service = service();

        let err = service
            .update_streak_on_attendance_str("m-1", "s-1", "yesterday")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let saturday = Utc.with_ymd_and_hms(2024, 3, 2, 18, 0, 0).unwrap();
        let err = service
            .update_streak_on_attendance("", "s-1", saturday)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn test_season_streaks_sorted_by_best() {
        let service = service();
        for (member, dates) in [
            ("ana", vec!["2024-03-02"]),
            ("ben", vec!["2024-03-02", "2024-03-09", "2024-03-16"]),
            ("cam", vec!["2024-03-02", "2024-03-09"]),
            ("dia", vec!["2024-03-02", "2024-03-09"]),
        ] {
            for date in dates {
                service
                    .update_streak_on_attendance_str(member, "s-1", date)
                    .await
                    .unwrap();
            }
        }

        let members: Vec<String> = service
            .season_streaks("s-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.member_id)
            .collect();
        assert_eq!(members, vec!["ben", "cam", "dia", "ana"]);
    }
}
