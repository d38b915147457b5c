// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Attendance streaks: weekly Saturday streaks with a one-time season milestone.
//!
//! The attendance-registration flow calls
//! [`StreakService::update_streak_on_attendance`] after an attendance has been
//! stored. The returned `award_milestone` flag tells the caller to grant the
//! season reward; the engine itself never notifies or awards anything.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod time_utils;

pub use error::{AppError, Result, StoreError};
pub use models::{AttendanceEvent, StreakKey, StreakRecord, StreakTransition};
pub use services::{StreakService, StreakUpdate};
