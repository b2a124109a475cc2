//! Database layer (Firestore-backed keyed store).

pub mod store;

pub use store::StoreDb;

/// Collection names as constants.
///
/// Each collection holds one document per user, keyed by the user ID.
/// `mining_sessions` doubles as the scan table for the accrual job:
/// a document exists there exactly while a session is running.
pub mod collections {
    pub const USER_PROFILES: &str = "user_profiles";
    pub const MINING_STATES: &str = "mining_states";
    pub const CARD_COLLECTIONS: &str = "card_collections";
    pub const MINING_SESSIONS: &str = "mining_sessions";
}
