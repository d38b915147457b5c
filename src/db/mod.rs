//! Database layer: streak record storage.
//!
//! [`StreakStore`] is the persistence seam of the engine. Every backend must
//! honor the one-record-per-(member, season) key and reject saves whose
//! `revision` does not match the stored record.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStreakStore;

use crate::config::{Config, StoreBackend};
use crate::error::StoreError;
use crate::models::{StreakKey, StreakRecord};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Collection names as constants.
pub mod collections {
    /// Streak records (keyed by [`StreakKey::document_id`])
    pub const STREAKS: &str = "attendance_streaks";
}

/// Storage for streak records.
pub trait StreakStore: Send + Sync {
    /// Fetch the record for `key`, creating a zeroed one stamped `now` if absent.
    fn get_or_create(
        &self,
        key: &StreakKey,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<StreakRecord, StoreError>> + Send;

    /// Store `record` if the stored revision still equals `record.revision`.
    ///
    /// Returns the stored record with its revision incremented.
    fn save(
        &self,
        record: &StreakRecord,
    ) -> impl Future<Output = Result<StreakRecord, StoreError>> + Send;

    /// Fetch the record for `key` without creating it.
    fn get(
        &self,
        key: &StreakKey,
    ) -> impl Future<Output = Result<Option<StreakRecord>, StoreError>> + Send;

    /// All records belonging to a season, in no particular order.
    fn list_for_season(
        &self,
        season_id: &str,
    ) -> impl Future<Output = Result<Vec<StreakRecord>, StoreError>> + Send;

    /// Remove every record of a season. Returns the number removed.
    fn delete_for_season(
        &self,
        season_id: &str,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}

/// Store selected by [`Config::store`](crate::config::Config).
#[derive(Clone)]
pub enum ConfiguredStore {
    Memory(MemoryStreakStore),
    Firestore(FirestoreDb),
}

impl ConfiguredStore {
    /// Open the configured backend, connecting to Firestore if selected.
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        match config.store {
            StoreBackend::Memory => {
                tracing::info!("Using in-memory streak store");
                Ok(ConfiguredStore::Memory(MemoryStreakStore::new()))
            }
            StoreBackend::Firestore => {
                let db = FirestoreDb::new(&config.gcp_project_id).await?;
                Ok(ConfiguredStore::Firestore(db))
            }
        }
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            ConfiguredStore::Memory(_) => StoreBackend::Memory,
            ConfiguredStore::Firestore(_) => StoreBackend::Firestore,
        }
    }
}

impl StreakStore for ConfiguredStore {
    async fn get_or_create(
        &self,
        key: &StreakKey,
        now: DateTime<Utc>,
    ) -> Result<StreakRecord, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.get_or_create(key, now).await,
            ConfiguredStore::Firestore(db) => db.get_or_create(key, now).await,
        }
    }

    async fn save(&self, record: &StreakRecord) -> Result<StreakRecord, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.save(record).await,
            ConfiguredStore::Firestore(db) => db.save(record).await,
        }
    }

    async fn get(&self, key: &StreakKey) -> Result<Option<StreakRecord>, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.get(key).await,
            ConfiguredStore::Firestore(db) => db.get(key).await,
        }
    }

    async fn list_for_season(&self, season_id: &str) -> Result<Vec<StreakRecord>, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.list_for_season(season_id).await,
            ConfiguredStore::Firestore(db) => db.list_for_season(season_id).await,
        }
    }

    async fn delete_for_season(&self, season_id: &str) -> Result<usize, StoreError> {
        match self {
            ConfiguredStore::Memory(store) => store.delete_for_season(season_id).await,
            ConfiguredStore::Firestore(db) => db.delete_for_season(season_id).await,
        }
    }
}
