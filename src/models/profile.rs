//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile, stored one document per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Identity-service user ID (also used as document ID)
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Handle, unique across users
    pub username: String,
    /// Email address
    pub email: String,
    /// Cumulative collected NXO balance
    #[serde(default)]
    pub nxo_coin: f64,
    /// When the account was created (Unix ms)
    pub created_at: i64,
}
