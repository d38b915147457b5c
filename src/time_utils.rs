// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling in the reference timezone.

use chrono::{
    DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

use crate::error::AppError;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a date-like value into an instant.
///
/// Accepts RFC 3339 timestamps (offset respected), naive
/// `YYYY-MM-DDTHH:MM:SS[.fff]` or `YYYY-MM-DD HH:MM:SS` local times, and
/// plain `YYYY-MM-DD` dates (local midnight). Naive values are read in `tz`.
pub fn parse_date_like(raw: &str, tz: Tz) -> Result<DateTime<Utc>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::Validation("attendance date is required".to_string()));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| AppError::Validation(format!("Invalid attendance date: {}", raw)))?;

    local_to_utc(naive, tz)
        .ok_or_else(|| AppError::Validation(format!("Nonexistent local time in {}: {}", tz, raw)))
}

/// The Saturday containing `instant`, at local midnight in `tz`.
///
/// Returns `None` when `instant` is not a Saturday in `tz`.
pub fn saturday_of(instant: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
    let local_date = instant.with_timezone(&tz).date_naive();
    if local_date.weekday() != Weekday::Sat {
        return None;
    }
    Some(local_midnight(local_date, tz))
}

/// Local midnight of `date` in `tz`.
///
/// DST gap fallback: if midnight does not exist locally, use the first
/// instant after the gap.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    local_to_utc(midnight, tz).unwrap_or_else(|| {
        (1..=3)
            .find_map(|h| local_to_utc(midnight + chrono::Duration::hours(h), tz))
            .unwrap_or_else(|| midnight.and_utc())
    })
}

fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
