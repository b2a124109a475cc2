// SPDX-License-Identifier: MIT

//! Identity service client.
//!
//! Credential issuance and verification are delegated to an external
//! identity provider over REST. This client covers:
//! - Account creation (signup)
//! - Password sign-in (login)
//! - Bearer token verification (auth middleware)

use crate::error::AppError;
use serde::Deserialize;

/// A verified identity extracted from a bearer token.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: String,
}

/// Result of account creation or sign-in.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub uid: String,
    pub email: String,
    pub token: String,
}

/// External identity provider client.
#[derive(Clone)]
pub struct IdentityService {
    http: Option<reqwest::Client>,
    base_url: String,
    api_key: String,
}

impl IdentityService {
    /// Create a new identity client.
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: Some(reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Create a mock identity service for testing (offline mode).
    ///
    /// Accepts bearer tokens of the form `mock:{uid}` and synthesizes
    /// accounts without any network call.
    pub fn new_mock() -> Self {
        Self {
            http: None,
            base_url: String::new(),
            api_key: String::new(),
        }
    }

    fn get_http(&self) -> Option<&reqwest::Client> {
        self.http.as_ref()
    }

    /// Create a new identity record for an email/password pair.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<IdentitySession, AppError> {
        let Some(http) = self.get_http() else {
            return Ok(mock_session(email));
        };

        let url = format!("{}/v1/accounts:signUp?key={}", self.base_url, self.api_key);
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::IdentityApi(e.to_string()))?;

        let account: AccountResponse = check_response_json(response).await?;
        Ok(IdentitySession {
            uid: account.local_id,
            email: account.email.unwrap_or_else(|| email.to_string()),
            token: account.id_token,
        })
    }

    /// Verify an email/password pair and issue a session token.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdentitySession, AppError> {
        let Some(http) = self.get_http() else {
            return Ok(mock_session(email));
        };

        let url = format!(
            "{}/v1/accounts:signInWithPassword?key={}",
            self.base_url, self.api_key
        );
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });

        let response = http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::IdentityApi(e.to_string()))?;

        if response.status().as_u16() == 400 {
            // Wrong password / unknown account both come back as 400
            return Err(AppError::Unauthorized);
        }

        let account: AccountResponse = check_response_json(response).await?;
        Ok(IdentitySession {
            uid: account.local_id,
            email: account.email.unwrap_or_else(|| email.to_string()),
            token: account.id_token,
        })
    }

    /// Resolve a bearer token to the identity it was issued for.
    pub async fn verify_token(&self, token: &str) -> Result<VerifiedUser, AppError> {
        let Some(http) = self.get_http() else {
            // Offline mode: "mock:{uid}" tokens only
            return match token.strip_prefix("mock:") {
                Some(uid) if !uid.is_empty() => Ok(VerifiedUser {
                    uid: uid.to_string(),
                    email: format!("{}@example.test", uid),
                }),
                _ => Err(AppError::InvalidToken),
            };
        };

        let url = format!("{}/v1/accounts:lookup?key={}", self.base_url, self.api_key);
        let body = serde_json::json!({ "idToken": token });

        let response = http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::IdentityApi(e.to_string()))?;

        if response.status().as_u16() == 400 {
            return Err(AppError::InvalidToken);
        }

        let lookup: LookupResponse = check_response_json(response).await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(AppError::InvalidToken)?;

        Ok(VerifiedUser {
            uid: user.local_id,
            email: user.email.unwrap_or_default(),
        })
    }
}

/// Deterministic session for the offline mock: the uid is derived from the
/// email's local part.
fn mock_session(email: &str) -> IdentitySession {
    let uid = email.split('@').next().unwrap_or(email).to_string();
    IdentitySession {
        token: format!("mock:{}", uid),
        uid,
        email: email.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    id_token: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::IdentityApi(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::IdentityApi(format!("JSON parse error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_verify_token_accepts_mock_tokens() {
        let identity = IdentityService::new_mock();

        let user = identity.verify_token("mock:user-1").await.unwrap();
        assert_eq!(user.uid, "user-1");
    }

    #[tokio::test]
    async fn test_mock_verify_token_rejects_other_tokens() {
        let identity = IdentityService::new_mock();

        assert!(matches!(
            identity.verify_token("garbage").await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            identity.verify_token("mock:").await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_mock_sign_up_round_trips_through_verify() {
        let identity = IdentityService::new_mock();

        let session = identity.sign_up("alice@example.test", "pw").await.unwrap();
        let verified = identity.verify_token(&session.token).await.unwrap();
        assert_eq!(verified.uid, session.uid);
    }
}
