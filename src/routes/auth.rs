// SPDX-License-Identifier: MIT

//! Signup, login and logout routes.
//!
//! Credential storage and verification live in the external identity
//! service; these handlers only orchestrate it and keep the profile table
//! consistent with it.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Card, CardCollection, MiningState, Profile};
use crate::time_utils::now_millis;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

// ─── Signup ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub success: bool,
}

/// Create an account: identity record, profile, zeroed mining state and the
/// starter card.
///
/// The username-uniqueness check runs before the identity call, so a 409
/// leaves no identity record behind.
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<SignupResponse>> {
    require_field(&body.name, "name")?;
    require_field(&body.username, "username")?;
    require_field(&body.email, "email")?;
    require_field(&body.password, "password")?;

    if state
        .db
        .find_profile_by_username(&body.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let session = state.identity.sign_up(&body.email, &body.password).await?;
    let now = now_millis();

    let profile = Profile {
        user_id: session.uid.clone(),
        name: body.name,
        username: body.username,
        email: body.email,
        nxo_coin: 0.0,
        created_at: now,
    };

    let cards = CardCollection {
        cards: vec![Card::starter()],
    };
    let mining = MiningState::new_account(
        cards.total_puissance(),
        cards.total_bonus(),
        cards.active_count(),
    );

    state.db.set_profile(&profile).await?;
    state.db.set_cards(&session.uid, &cards).await?;
    state.db.set_mining_state(&session.uid, &mining).await?;
    state.cache.invalidate_user(&session.uid);

    tracing::info!(user_id = %session.uid, username = %profile.username, "Account created");

    Ok(Json(SignupResponse { success: true }))
}

// ─── Login ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub email: String,
    /// Bearer token for the protected routes.
    pub token: String,
}

/// Log in with an email or username plus password.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    require_field(&body.identifier, "identifier")?;
    require_field(&body.password, "password")?;

    // Usernames are resolved to the registered email before hitting the
    // identity service.
    let email = if body.identifier.contains('@') {
        body.identifier.clone()
    } else {
        state
            .db
            .find_profile_by_username(&body.identifier)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Unknown username {}", body.identifier)))?
            .email
    };

    let session = state.identity.sign_in(&email, &body.password).await?;

    tracing::info!(user_id = %session.uid, "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        email: session.email,
        token: session.token,
    }))
}

// ─── Logout ──────────────────────────────────────────────────

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Logout is client-side token disposal; the endpoint only acknowledges.
async fn logout() -> Json<LogoutResponse> {
    Json(LogoutResponse { success: true })
}

fn require_field(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing required field: {}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_field_rejects_empty_and_blank() {
        assert!(require_field("", "name").is_err());
        assert!(require_field("   ", "name").is_err());
        assert!(require_field("alice", "name").is_ok());
    }
}
