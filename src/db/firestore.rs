// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed streak operations.
//!
//! Records live in the `attendance_streaks` collection under the document ID
//! `{member_id}__{season_id}`, which is what makes the (member, season) pair
//! unique. Saves run inside a Firestore transaction that re-reads the stored
//! revision, so writers on different instances cannot overwrite each other.

use crate::db::{collections, StreakStore};
use crate::error::StoreError;
use crate::models::{StreakKey, StreakRecord};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Outcome of the revision check inside a save transaction.
enum SaveOutcome {
    Saved(StreakRecord),
    Conflict { found: u64 },
    Missing,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return [`StoreError::Offline`].
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client.as_ref().ok_or(StoreError::Offline)
    }

    async fn fetch(&self, document_id: &str) -> Result<Option<StreakRecord>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::STREAKS)
            .obj()
            .one(document_id)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete(&self, document_ids: &[String]) -> Result<(), StoreError> {
        let client = self.get_client()?;

        for chunk in document_ids.chunks(BATCH_SIZE) {
            let mut transaction = client.begin_transaction().await.map_err(|e| {
                StoreError::Database(format!("Failed to begin transaction: {}", e))
            })?;

            for doc_id in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collections::STREAKS)
                    .document_id(doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        StoreError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            doc_id, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                StoreError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

impl StreakStore for FirestoreDb {
    async fn get_or_create(
        &self,
        key: &StreakKey,
        now: DateTime<Utc>,
    ) -> Result<StreakRecord, StoreError> {
        let doc_id = key.document_id();
        if let Some(existing) = self.fetch(&doc_id).await? {
            return Ok(existing);
        }

        let fresh = StreakRecord::new(key, now);
        let inserted: Result<StreakRecord, _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::STREAKS)
            .document_id(&doc_id)
            .object(&fresh)
            .execute()
            .await;

        match inserted {
            Ok(record) => {
                tracing::debug!(key = %key, "Created streak record");
                Ok(record)
            }
            Err(e) => {
                // Another writer may have created it between our read and insert.
                tracing::debug!(key = %key, error = %e, "Insert failed, re-reading streak record");
                self.fetch(&doc_id)
                    .await?
                    .ok_or_else(|| StoreError::Database(e.to_string()))
            }
        }
    }

    async fn save(&self, record: &StreakRecord) -> Result<StreakRecord, StoreError> {
        let doc_id = record.key().document_id();
        let expected = record.revision;
        let mut next = record.clone();
        next.revision = expected + 1;

        let outcome = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let doc_id = doc_id.clone();
                let next = next.clone();
                let expected: u64 = expected;
                async move {
                    // Reading through the transaction's db registers the document
                    // for conflict detection.
                    let stored: Option<StreakRecord> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::STREAKS)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let found = match stored {
                        None => return Ok(SaveOutcome::Missing),
                        Some(stored) => stored.revision,
                    };
                    if found != expected {
                        return Ok(SaveOutcome::Conflict { found });
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::STREAKS)
                        .document_id(&doc_id)
                        .object(&next)
                        .add_to_transaction(transaction)?;

                    Ok(SaveOutcome::Saved(next))
                }
                .boxed()
            })
            .await
            .map_err(|e| StoreError::Database(format!("Streak save transaction failed: {}", e)))?;

        match outcome {
            SaveOutcome::Saved(saved) => Ok(saved),
            SaveOutcome::Conflict { found } => Err(StoreError::Conflict { expected, found }),
            SaveOutcome::Missing => Err(StoreError::NotFound(doc_id)),
        }
    }

    async fn get(&self, key: &StreakKey) -> Result<Option<StreakRecord>, StoreError> {
        self.fetch(&key.document_id()).await
    }

    async fn list_for_season(&self, season_id: &str) -> Result<Vec<StreakRecord>, StoreError> {
        let season_id = season_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::STREAKS)
            .filter(move |q| q.for_all([q.field("season_id").eq(season_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn delete_for_season(&self, season_id: &str) -> Result<usize, StoreError> {
        let records = self.list_for_season(season_id).await?;
        let doc_ids: Vec<String> = records.iter().map(|r| r.key().document_id()).collect();

        self.batch_delete(&doc_ids).await?;

        tracing::info!(
            season_id,
            deleted = doc_ids.len(),
            "Season streak records deleted"
        );
        Ok(doc_ids.len())
    }
}
