// SPDX-License-Identifier: MIT

//! Mining accrual job.
//!
//! A fixed-interval timer scans the session table, advances every running
//! session's accrued reward, and closes out sessions past their end time.
//! Entries are processed independently: one entry failing is logged and the
//! scan continues.
//!
//! Concurrency contract:
//! - the loop awaits the full tick body before sleeping again, so ticks
//!   never overlap within the process;
//! - every session mutation goes through a versioned transaction in
//!   [`StoreDb`], so a writer that lost the race skips the step instead of
//!   overwriting the winner.

use crate::error::AppError;
use crate::models::MiningSession;
use crate::time_utils::now_millis;
use crate::AppState;
use futures_util::{stream, StreamExt};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

/// Sessions processed concurrently within one tick.
const MAX_CONCURRENT_SESSIONS: usize = 16;

/// Spawn the accrual loop as a background task.
pub fn spawn(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run(state))
}

async fn run(state: Arc<AppState>) {
    let period = std::time::Duration::from_secs(state.config.accrual_interval_secs);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = state.config.accrual_interval_secs,
        "Accrual job started"
    );

    loop {
        interval.tick().await;
        run_tick(&state).await;
    }
}

/// One full pass over the session table.
pub async fn run_tick(state: &AppState) {
    let sessions = match state.db.list_sessions().await {
        Ok(sessions) => sessions,
        Err(e) => {
            tracing::error!(error = %e, "Failed to snapshot session table, skipping tick");
            return;
        }
    };

    if sessions.is_empty() {
        return;
    }

    tracing::debug!(count = sessions.len(), "Accrual tick");

    stream::iter(sessions)
        .map(|session| async move {
            let user_id = session.user_id.clone();
            if let Err(e) = process_session(state, session).await {
                tracing::warn!(user_id = %user_id, error = %e, "Accrual step failed for session");
            }
        })
        .buffer_unordered(MAX_CONCURRENT_SESSIONS)
        .collect::<Vec<()>>()
        .await;
}

/// Advance or close a single session.
async fn process_session(state: &AppState, session: MiningSession) -> Result<(), AppError> {
    let user_id = session.user_id.clone();

    let Some(mining) = state.db.get_mining_state(&user_id).await? else {
        // Defensive: session without a user record. Leave it alone.
        tracing::warn!(user_id = %user_id, "Session has no mining state, skipping");
        return Ok(());
    };

    let now = now_millis();

    if session.is_expired(now) {
        if state.db.close_session(&session).await? {
            state.cache.invalidate_user(&user_id);
            notify_session_ended(state, &user_id).await;
        }
        return Ok(());
    }

    let elapsed_ms = now - mining.last_mining;
    let duration_ms = state.config.session_duration_secs as i64 * 1000;
    let gain = session.accrual_gain(elapsed_ms, duration_ms);

    if gain > 0.0 && state.db.accrue_session(&session, gain, now).await? {
        state.cache.invalidate_user(&user_id);
        tracing::debug!(user_id = %user_id, gain, "Accrued mining reward");
    }

    Ok(())
}

/// Resolve the user's email and send the end-of-session notification.
/// Best-effort: failure is logged, not retried, never surfaced.
async fn notify_session_ended(state: &AppState, user_id: &str) {
    let email = match state.db.get_profile(user_id).await {
        Ok(Some(profile)) => profile.email,
        Ok(None) => {
            tracing::warn!(user_id = %user_id, "No profile for ended session, skipping email");
            return;
        }
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Profile lookup failed, skipping email");
            return;
        }
    };

    if email.is_empty() {
        return;
    }

    if let Err(e) = state.mailer.send_session_ended(&email).await {
        tracing::warn!(user_id = %user_id, error = %e, "Session-ended email failed");
    }
}
