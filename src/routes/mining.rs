// SPDX-License-Identifier: MIT

//! Mining routes: state reads, session start, collection and stat recompute.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::cache::keys;
use crate::db::store::CollectOutcome;
use crate::error::{AppError, Result};
use crate::middleware::auth::{ensure_owner, AuthUser};
use crate::models::{Card, CardCollection, MiningSession, MiningState};
use crate::time_utils::now_millis;
use crate::AppState;

/// Routes readable without authentication.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mining-data/{user_id}", get(get_mining_data))
        .route("/cards/{user_id}", get(get_cards))
        .route("/update-mining-stats/{user_id}", post(update_mining_stats))
}

/// Routes that mutate a user's balance or session; the bearer identity must
/// match the path's user.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start-mining/{user_id}", post(start_mining))
        .route("/collect-nxo/{user_id}", post(collect_nxo))
}

// ─── Mining Data ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct MiningDataResponse {
    pub success: bool,
    #[serde(rename = "miningData")]
    pub mining_data: MiningState,
}

/// Fetch current mining state, cache-first.
async fn get_mining_data(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<MiningDataResponse>> {
    let key = keys::mining(&user_id);

    let mining_data = if let Some(cached) = state.cache.get::<MiningState>(&key) {
        cached
    } else {
        let fresh = state
            .db
            .get_mining_state(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Mining data for user {}", user_id)))?;
        state.cache.put(&key, &fresh);
        fresh
    };

    Ok(Json(MiningDataResponse {
        success: true,
        mining_data,
    }))
}

// ─── Start Mining ────────────────────────────────────────────

#[derive(Serialize)]
pub struct StartMiningResponse {
    pub success: bool,
    #[serde(rename = "last-mining")]
    pub last_mining: i64,
    #[serde(rename = "next-mining")]
    pub next_mining: i64,
}

/// Start a new mining session for the caller.
///
/// Total reward = sum of active cards' puissance + the bonus carried over
/// from the current mining state (the bonus is not recomputed here; that is
/// what `update-mining-stats` is for).
async fn start_mining(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<StartMiningResponse>> {
    ensure_owner(&auth, &user_id)?;

    let mining = state
        .db
        .get_mining_state(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Mining data for user {}", user_id)))?;

    let now = now_millis();
    if mining.session_running(now) {
        return Err(AppError::BadRequest(
            "A mining session is already running".to_string(),
        ));
    }

    let cards = state.db.get_cards(&user_id).await?.unwrap_or_default();
    let puissance = cards.total_puissance();
    let bonus = mining.bonus;
    let total_reward = puissance + bonus;
    let ends_at = now + state.config.session_duration_secs as i64 * 1000;

    let session = MiningSession::new(&user_id, total_reward, ends_at);
    state.db.set_session(&session).await?;

    let new_state = MiningState {
        nxo: 0.0,
        last_mining: now,
        next_mining: Some(ends_at),
        puissance,
        bonus,
        cards_count: cards.active_count(),
    };
    state.db.set_mining_state(&user_id, &new_state).await?;
    state.cache.invalidate_user(&user_id);

    tracing::info!(
        user_id = %user_id,
        total_reward,
        ends_at,
        "Mining session started"
    );

    Ok(Json(StartMiningResponse {
        success: true,
        last_mining: now,
        next_mining: ends_at,
    }))
}

// ─── Collect ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CollectResponse {
    pub success: bool,
    #[serde(rename = "updatedNxoCoin")]
    pub updated_nxo_coin: f64,
}

/// Move the accrued amount into the caller's balance.
async fn collect_nxo(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<CollectResponse>> {
    ensure_owner(&auth, &user_id)?;

    let outcome = state.db.collect_nxo(&user_id).await?;
    state.cache.invalidate_user(&user_id);

    match outcome {
        CollectOutcome::Collected(updated_nxo_coin) => {
            tracing::info!(user_id = %user_id, balance = updated_nxo_coin, "NXO collected");
            Ok(Json(CollectResponse {
                success: true,
                updated_nxo_coin,
            }))
        }
        CollectOutcome::NothingToCollect => {
            Err(AppError::BadRequest("Nothing to collect".to_string()))
        }
    }
}

// ─── Cards ───────────────────────────────────────────────────

#[derive(Serialize)]
pub struct CardsResponse {
    pub success: bool,
    #[serde(rename = "activeCards")]
    pub active_cards: Vec<Card>,
}

/// List the user's active cards, cache-first.
async fn get_cards(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<CardsResponse>> {
    let key = keys::cards(&user_id);

    let collection = if let Some(cached) = state.cache.get::<CardCollection>(&key) {
        cached
    } else {
        let fresh = state
            .db
            .get_cards(&user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Cards for user {}", user_id)))?;
        state.cache.put(&key, &fresh);
        fresh
    };

    let active_cards = collection.active_cards().into_iter().cloned().collect();

    Ok(Json(CardsResponse {
        success: true,
        active_cards,
    }))
}

// ─── Stats Recompute ─────────────────────────────────────────

#[derive(Serialize)]
pub struct UpdateStatsResponse {
    pub success: bool,
    pub puissance: f64,
    pub bonus: f64,
}

/// Recompute the cached puissance/bonus sums from the active cards and
/// persist them into the mining state.
async fn update_mining_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UpdateStatsResponse>> {
    let cards = state
        .db
        .get_cards(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cards for user {}", user_id)))?;

    let mut mining = state
        .db
        .get_mining_state(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Mining data for user {}", user_id)))?;

    mining.puissance = cards.total_puissance();
    mining.bonus = cards.total_bonus();
    mining.cards_count = cards.active_count();

    state.db.set_mining_state(&user_id, &mining).await?;
    state.cache.invalidate_user(&user_id);

    tracing::debug!(
        user_id = %user_id,
        puissance = mining.puissance,
        bonus = mining.bonus,
        "Mining stats recomputed"
    );

    Ok(Json(UpdateStatsResponse {
        success: true,
        puissance: mining.puissance,
        bonus: mining.bonus,
    }))
}
