// SPDX-License-Identifier: MIT

//! Bearer-token authentication middleware.
//!
//! Token verification is delegated to the external identity service; the
//! verified identity is injected into the request extensions for handlers
//! to check ownership against.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

/// Middleware that requires a valid bearer token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(AppError::Unauthorized),
    };

    let verified = state.identity.verify_token(token).await?;

    request.extensions_mut().insert(AuthUser {
        uid: verified.uid,
        email: verified.email,
    });

    Ok(next.run(request).await)
}

/// Reject callers acting on an account that is not their own.
pub fn ensure_owner(auth: &AuthUser, user_id: &str) -> Result<(), AppError> {
    if auth.uid != user_id {
        tracing::warn!(
            caller = %auth.uid,
            target = %user_id,
            "Ownership mismatch"
        );
        return Err(AppError::Forbidden);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_owner_accepts_matching_uid() {
        let auth = AuthUser {
            uid: "u1".to_string(),
            email: "u1@example.test".to_string(),
        };
        assert!(ensure_owner(&auth, "u1").is_ok());
    }

    #[test]
    fn test_ensure_owner_rejects_other_uid() {
        let auth = AuthUser {
            uid: "u1".to_string(),
            email: "u1@example.test".to_string(),
        };
        assert!(matches!(ensure_owner(&auth, "u2"), Err(AppError::Forbidden)));
    }
}
