// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.

/// Errors surfaced by the streak engine to its caller.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Streak {operation} failed for member {member_id} in season {season_id}: {source}")]
    Persistence {
        member_id: String,
        season_id: String,
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    /// Wrap a store failure with the key and operation it happened in.
    pub fn persistence(
        member_id: &str,
        season_id: &str,
        operation: &'static str,
        source: StoreError,
    ) -> Self {
        AppError::Persistence {
            member_id: member_id.to_string(),
            season_id: season_id.to_string(),
            operation,
            source,
        }
    }

    /// Whether this error is a lost compare-and-swap race.
    ///
    /// The engine never retries; callers may choose to.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::Persistence {
                source: StoreError::Conflict { .. },
                ..
            }
        )
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Errors reported by a [`StreakStore`](crate::db::StreakStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Revision conflict: expected {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database not connected (offline mode)")]
    Offline,
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, AppError>;
