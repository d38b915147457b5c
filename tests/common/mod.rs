// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use attendance_streaks::db::{FirestoreDb, MemoryStreakStore};
use attendance_streaks::services::ManualClock;
use attendance_streaks::StreakService;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::America::Bogota;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Fixed clock used by test services.
#[allow(dead_code)]
pub fn test_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
}

/// In-memory engine in the Bogota reference timezone.
#[allow(dead_code)]
pub fn memory_service() -> StreakService<MemoryStreakStore, ManualClock> {
    StreakService::with_clock(MemoryStreakStore::new(), Bogota, test_clock())
}

/// 19:00 Bogota time on the given date.
#[allow(dead_code)]
pub fn evening(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Bogota
        .with_ymd_and_hms(y, m, d, 19, 0, 0)
        .unwrap()
        .with_timezone(&Utc)
}

/// Local midnight in Bogota on the given date, as stored on records.
#[allow(dead_code)]
pub fn bogota_midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
    attendance_streaks::time_utils::local_midnight(date, Bogota)
}

/// Generate a unique identifier for test isolation.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}
