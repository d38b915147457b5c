// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod clock;
pub mod streak;

pub use clock::{Clock, ManualClock, SystemClock};
pub use streak::{StreakLocks, StreakService, StreakUpdate};
