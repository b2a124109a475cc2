// SPDX-License-Identifier: MIT

//! Process-local read-through cache for store reads.
//!
//! Entries are keyed by logical store path and expire after a short TTL.
//! Write paths never delete individual keys by hand: they call
//! [`ReadCache::invalidate_user`], which clears every derived entry for the
//! user, so a new write path cannot forget one.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Logical cache keys, one per derived store path.
pub mod keys {
    pub fn profile(user_id: &str) -> String {
        format!("users/{}/perso", user_id)
    }

    pub fn mining(user_id: &str) -> String {
        format!("users/{}/mining", user_id)
    }

    pub fn cards(user_id: &str) -> String {
        format!("users/{}/cards", user_id)
    }

    /// Every derived key for a user, for systematic invalidation.
    pub fn all_for_user(user_id: &str) -> [String; 3] {
        [profile(user_id), mining(user_id), cards(user_id)]
    }
}

#[derive(Clone)]
struct CachedEntry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// Short-TTL memoization of store reads, shared across requests.
#[derive(Clone)]
pub struct ReadCache {
    entries: std::sync::Arc<DashMap<String, CachedEntry>>,
    ttl_secs: i64,
}

impl ReadCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            entries: std::sync::Arc::new(DashMap::new()),
            ttl_secs: ttl_secs as i64,
        }
    }

    /// Fetch a cached value if present and not expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if Utc::now() >= entry.expires_at {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Store a value under `key` for one TTL window.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        self.entries.insert(
            key.to_string(),
            CachedEntry {
                value,
                expires_at: Utc::now() + Duration::seconds(self.ttl_secs),
            },
        );
    }

    /// Drop every derived entry for a user. Called by all write paths.
    pub fn invalidate_user(&self, user_id: &str) {
        for key in keys::all_for_user(user_id) {
            self.entries.remove(&key);
        }
    }
}
