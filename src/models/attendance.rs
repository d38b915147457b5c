// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance notification handed over by the registration flow.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A freshly persisted attendance, as seen by the streak engine.
///
/// `attendance_date` is date-like: an RFC 3339 timestamp, a naive
/// `YYYY-MM-DDTHH:MM:SS` local time, or a plain `YYYY-MM-DD` date.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttendanceEvent {
    #[validate(length(min = 1, message = "member_id must not be empty"))]
    pub member_id: String,
    #[validate(length(min = 1, message = "season_id must not be empty"))]
    pub season_id: String,
    #[validate(length(min = 1, message = "attendance_date is required"))]
    #[serde(default)]
    pub attendance_date: String,
}
