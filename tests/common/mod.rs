// SPDX-License-Identifier: MIT

use nxo_mining_api::cache::ReadCache;
use nxo_mining_api::config::Config;
use nxo_mining_api::db::StoreDb;
use nxo_mining_api::routes::create_router;
use nxo_mining_api::services::{IdentityService, MailerService};
use nxo_mining_api::AppState;
use std::sync::Arc;

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

/// Create a test database connection against the emulator.
#[allow(dead_code)]
pub async fn test_db() -> StoreDb {
    StoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by the Firestore emulator, with mock identity
/// and mailer. Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let cache = ReadCache::new(config.cache_ttl_secs);

    let state = Arc::new(AppState {
        config,
        db: test_db().await,
        cache,
        identity: IdentityService::new_mock(),
        mailer: MailerService::new_mock(),
    });

    (create_router(state.clone()), state)
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> StoreDb {
    StoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let cache = ReadCache::new(config.cache_ttl_secs);

    let state = Arc::new(AppState {
        config,
        db: test_db_offline(),
        cache,
        identity: IdentityService::new_mock(),
        mailer: MailerService::new_mock(),
    });

    (create_router(state.clone()), state)
}

/// Bearer token the mock identity service resolves to `uid`.
#[allow(dead_code)]
pub fn mock_token(uid: &str) -> String {
    format!("mock:{}", uid)
}
