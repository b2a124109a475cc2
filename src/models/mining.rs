//! Mining state and session models, plus the accrual math.
//!
//! The accrual formula is elapsed-time-proportional: each tick pays out the
//! share of the session's total reward corresponding to the wall-clock time
//! since the last accrual. Missed ticks are absorbed because the next tick
//! covers the whole elapsed window; the clamp keeps the payout from ever
//! exceeding the committed total.

use serde::{Deserialize, Serialize};

/// Per-user mining state, stored one document per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningState {
    /// Uncollected accrued NXO
    #[serde(default)]
    pub nxo: f64,
    /// Timestamp of the last accrual (Unix ms)
    #[serde(default)]
    pub last_mining: i64,
    /// Scheduled session end (Unix ms); None when no session was ever started
    #[serde(default)]
    pub next_mining: Option<i64>,
    /// Cached sum of active cards' puissance
    #[serde(default)]
    pub puissance: f64,
    /// Cached sum of active cards' bonus
    #[serde(default)]
    pub bonus: f64,
    /// Number of active (equipped) cards
    #[serde(default)]
    pub cards_count: u32,
}

impl MiningState {
    /// Fresh state for a new account.
    pub fn new_account(puissance: f64, bonus: f64, cards_count: u32) -> Self {
        Self {
            nxo: 0.0,
            last_mining: 0,
            next_mining: None,
            puissance,
            bonus,
            cards_count,
        }
    }

    /// Whether a session is still scheduled to run at `now`.
    pub fn session_running(&self, now: i64) -> bool {
        matches!(self.next_mining, Some(end) if now < end)
    }
}

/// An active mining session, keyed by user ID in its own table.
///
/// Absence of a document means no session is running for that user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningSession {
    /// Owning user (also the document ID)
    pub user_id: String,
    /// Total reward committed for the session
    pub total_reward: f64,
    /// Reward paid out so far by accrual ticks
    #[serde(default)]
    pub reward_so_far: f64,
    /// Session end (Unix ms)
    pub ends_at: i64,
    /// Optimistic-concurrency counter; bumped on every accrual write so a
    /// concurrent writer invalidates the transaction instead of being
    /// silently overwritten.
    #[serde(default)]
    pub version: u64,
}

impl MiningSession {
    pub fn new(user_id: &str, total_reward: f64, ends_at: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_reward,
            reward_so_far: 0.0,
            ends_at,
            version: 0,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.ends_at
    }

    /// Elapsed-time-proportional gain for one accrual step.
    ///
    /// `elapsed_ms` is the wall-clock time since the last accrual and
    /// `duration_ms` the full session length. The result is clamped so that
    /// `reward_so_far + gain` never exceeds `total_reward`.
    pub fn accrual_gain(&self, elapsed_ms: i64, duration_ms: i64) -> f64 {
        if elapsed_ms <= 0 || duration_ms <= 0 {
            return 0.0;
        }
        let proportional = self.total_reward * elapsed_ms as f64 / duration_ms as f64;
        let remaining = (self.total_reward - self.reward_so_far).max(0.0);
        proportional.min(remaining)
    }

    /// Positive difference still owed at expiry, if any tick was missed.
    pub fn reconcile_amount(&self) -> f64 {
        (self.total_reward - self.reward_so_far).max(0.0)
    }
}
