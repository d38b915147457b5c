// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process streak store backed by a concurrent map.

use crate::db::StreakStore;
use crate::error::StoreError;
use crate::models::{StreakKey, StreakRecord};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Streak records held in memory.
///
/// Cloning shares the underlying map. Get-or-create and compare-and-swap
/// both run under the map's per-shard entry lock.
#[derive(Clone, Default)]
pub struct MemoryStreakStore {
    records: Arc<DashMap<StreakKey, StreakRecord>>,
}

impl MemoryStreakStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StreakStore for MemoryStreakStore {
    async fn get_or_create(
        &self,
        key: &StreakKey,
        now: DateTime<Utc>,
    ) -> Result<StreakRecord, StoreError> {
        let record = self
            .records
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::debug!(key = %key, "Creating streak record");
                StreakRecord::new(key, now)
            })
            .clone();
        Ok(record)
    }

    async fn save(&self, record: &StreakRecord) -> Result<StreakRecord, StoreError> {
        match self.records.entry(record.key()) {
            Entry::Occupied(mut stored) => {
                let found = stored.get().revision;
                if found != record.revision {
                    return Err(StoreError::Conflict {
                        expected: record.revision,
                        found,
                    });
                }
                let mut next = record.clone();
                next.revision += 1;
                stored.insert(next.clone());
                Ok(next)
            }
            Entry::Vacant(_) => Err(StoreError::NotFound(record.key().to_string())),
        }
    }

    async fn get(&self, key: &StreakKey) -> Result<Option<StreakRecord>, StoreError> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn list_for_season(&self, season_id: &str) -> Result<Vec<StreakRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.key().season_id == season_id)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn delete_for_season(&self, season_id: &str) -> Result<usize, StoreError> {
        let before = self.records.len();
        self.records.retain(|key, _| key.season_id != season_id);
        let deleted = before.saturating_sub(self.records.len());
        tracing::debug!(season_id, deleted, "Deleted season streak records");
        Ok(deleted)
    }
}
