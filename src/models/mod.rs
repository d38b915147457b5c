// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendance;
pub mod streak;

pub use attendance::AttendanceEvent;
pub use streak::{
    advance_streak, StreakKey, StreakRecord, StreakState, StreakTransition, MILESTONE_WEEKS,
};
