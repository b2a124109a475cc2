// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (per-user account records)
//! - Mining states (accrued reward, timestamps, cached card sums)
//! - Card collections
//! - Mining sessions (the table scanned by the accrual job)
//!
//! The session mutation paths (accrual tick, collect) run as Firestore
//! transactions with an explicit version check, so a concurrent writer makes
//! the commit fail instead of being silently overwritten.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{CardCollection, MiningSession, MiningState, Profile};
use firestore::FirestoreConsistencySelector;

/// Outcome of the collect operation.
pub enum CollectOutcome {
    /// Collected amount moved to the balance; holds the new balance.
    Collected(f64),
    /// Uncollected amount was zero or negative.
    NothingToCollect,
}

/// Firestore database client.
#[derive(Clone)]
pub struct StoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl StoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
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
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Transactional Reads ─────────────────────────────────────
    //
    // Reads inside a transaction must carry the transaction id, otherwise
    // the documents are not registered for conflict detection and the
    // commit succeeds even when a concurrent writer got there first.

    async fn get_session_in_txn(
        &self,
        consistency: &FirestoreConsistencySelector,
        user_id: &str,
    ) -> Result<Option<MiningSession>, AppError> {
        self.get_client()?
            .clone_with_consistency_selector(consistency.clone())
            .fluent()
            .select()
            .by_id_in(collections::MINING_SESSIONS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read session in transaction: {}", e))
            })
    }

    async fn get_mining_state_in_txn(
        &self,
        consistency: &FirestoreConsistencySelector,
        user_id: &str,
    ) -> Result<Option<MiningState>, AppError> {
        self.get_client()?
            .clone_with_consistency_selector(consistency.clone())
            .fluent()
            .select()
            .by_id_in(collections::MINING_STATES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read state in transaction: {}", e))
            })
    }

    async fn get_profile_in_txn(
        &self,
        consistency: &FirestoreConsistencySelector,
        user_id: &str,
    ) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .clone_with_consistency_selector(consistency.clone())
            .fluent()
            .select()
            .by_id_in(collections::USER_PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read profile in transaction: {}", e))
            })
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a user's profile by ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_PROFILES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a profile.
    pub async fn set_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_PROFILES)
            .document_id(&profile.user_id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Look up a profile by its unique username, for the handle-uniqueness
    /// check and username login.
    pub async fn find_profile_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Profile>, AppError> {
        let username = username.to_string();
        let matches: Vec<Profile> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_PROFILES)
            .filter(move |q| q.for_all([q.field("username").eq(username.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.into_iter().next())
    }

    // ─── Mining State Operations ─────────────────────────────────

    /// Get a user's mining state.
    pub async fn get_mining_state(&self, user_id: &str) -> Result<Option<MiningState>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MINING_STATES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Overwrite a user's mining state.
    pub async fn set_mining_state(
        &self,
        user_id: &str,
        state: &MiningState,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MINING_STATES)
            .document_id(user_id)
            .object(state)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Card Operations ─────────────────────────────────────────

    /// Get a user's card collection.
    pub async fn get_cards(&self, user_id: &str) -> Result<Option<CardCollection>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CARD_COLLECTIONS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a user's card collection.
    pub async fn set_cards(&self, user_id: &str, cards: &CardCollection) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CARD_COLLECTIONS)
            .document_id(user_id)
            .object(cards)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Session Operations ──────────────────────────────────────

    /// Get a user's active session, if one is running.
    pub async fn get_session(&self, user_id: &str) -> Result<Option<MiningSession>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::MINING_SESSIONS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace a user's session.
    pub async fn set_session(&self, session: &MiningSession) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::MINING_SESSIONS)
            .document_id(&session.user_id)
            .object(session)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user's session. Deleting an absent document is a no-op, so
    /// session close stays idempotent.
    pub async fn delete_session(&self, user_id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::MINING_SESSIONS)
            .document_id(user_id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Snapshot the whole session table for one accrual tick.
    pub async fn list_sessions(&self) -> Result<Vec<MiningSession>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::MINING_SESSIONS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Transactional Session Mutations ─────────────────────────

    /// Apply one accrual step to a running session.
    ///
    /// Re-reads the session inside a transaction and checks its `version`
    /// against the tick's snapshot; a mismatch means another writer got there
    /// first and the step is skipped. On success the session's
    /// `reward_so_far`/`version` and the user's `nxo`/`last_mining` are
    /// committed together.
    ///
    /// Returns `true` if the step was applied.
    pub async fn accrue_session(
        &self,
        snapshot: &MiningSession,
        gain: f64,
        now: i64,
    ) -> Result<bool, AppError> {
        let user_id = snapshot.user_id.as_str();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let consistency =
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone());

        // Read within the transaction to register the documents for
        // conflict detection.
        let Some(current) = self.get_session_in_txn(&consistency, user_id).await? else {
            let _ = transaction.rollback().await;
            return Ok(false);
        };
        if current.version != snapshot.version {
            tracing::debug!(user_id, "Session version changed, skipping accrual step");
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        let Some(mut state) = self.get_mining_state_in_txn(&consistency, user_id).await? else {
            let _ = transaction.rollback().await;
            return Ok(false);
        };

        let mut session = current;
        session.reward_so_far += gain;
        session.version += 1;

        state.nxo += gain;
        state.last_mining = now;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::MINING_SESSIONS)
            .document_id(user_id)
            .object(&session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add session write: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::MINING_STATES)
            .document_id(user_id)
            .object(&state)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add state write: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Accrual commit failed: {}", e)))?;

        Ok(true)
    }

    /// Close an expired session: credit any still-owed reward to the user's
    /// uncollected amount and delete the session document, atomically.
    ///
    /// Returns `true` if this call performed the close (the version check
    /// makes concurrent closes lose and report `false`).
    pub async fn close_session(&self, snapshot: &MiningSession) -> Result<bool, AppError> {
        let user_id = snapshot.user_id.as_str();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let consistency =
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone());

        let Some(current) = self.get_session_in_txn(&consistency, user_id).await? else {
            // Already closed by an earlier tick.
            let _ = transaction.rollback().await;
            return Ok(false);
        };
        if current.version != snapshot.version {
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        let owed = current.reconcile_amount();

        if let Some(mut state) = self.get_mining_state_in_txn(&consistency, user_id).await? {
            if owed > 0.0 {
                state.nxo += owed;
            }
            state.next_mining = None;

            self.get_client()?
                .fluent()
                .update()
                .in_col(collections::MINING_STATES)
                .document_id(user_id)
                .object(&state)
                .add_to_transaction(&mut transaction)
                .map_err(|e| AppError::Database(format!("Failed to add state write: {}", e)))?;
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::MINING_SESSIONS)
            .document_id(user_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add session delete: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Session close commit failed: {}", e)))?;

        tracing::info!(user_id, owed, "Mining session closed");

        Ok(true)
    }

    /// Move the uncollected amount into the profile balance and zero it.
    ///
    /// Runs as a transaction so an accrual write landing between the read and
    /// the reset makes the commit fail instead of being erased.
    pub async fn collect_nxo(&self, user_id: &str) -> Result<CollectOutcome, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;
        let consistency =
            FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone());

        let Some(mut state) = self.get_mining_state_in_txn(&consistency, user_id).await? else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!(
                "Mining state for user {}",
                user_id
            )));
        };

        if state.nxo <= 0.0 {
            let _ = transaction.rollback().await;
            return Ok(CollectOutcome::NothingToCollect);
        }

        let Some(mut profile) = self.get_profile_in_txn(&consistency, user_id).await? else {
            let _ = transaction.rollback().await;
            return Err(AppError::NotFound(format!("Profile for user {}", user_id)));
        };

        profile.nxo_coin += state.nxo;
        state.nxo = 0.0;
        let new_balance = profile.nxo_coin;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_PROFILES)
            .document_id(user_id)
            .object(&profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add profile write: {}", e)))?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::MINING_STATES)
            .document_id(user_id)
            .object(&state)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add state write: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Collect commit failed: {}", e)))?;

        Ok(CollectOutcome::Collected(new_balance))
    }
}
