// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Hosted auth API client with a file-backed session store.
//!
//! Handles:
//! - Magic-link (OTP) email requests
//! - Completing a login from the link's redirect
//! - Token refresh, including once on restore when the stored token expired
//! - Sign-out (revocation plus local removal)

use crate::config::Config;
use crate::db::postgrest::error_message;
use crate::error::{ClubError, Result};
use crate::models::Session;
use crate::services::identity::{parse_login_redirect, IdentityProvider};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Refresh a restored session this long before it expires.
const RESTORE_REFRESH_MARGIN_SECS: i64 = 60;

/// Persists the signed-in session between runs.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the stored session. A missing or unreadable file means signed out.
    pub async fn load(&self) -> Result<Option<Session>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ClubError::Internal(anyhow::anyhow!(
                    "Reading session file {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClubError::Internal(anyhow::anyhow!("Creating {}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_vec_pretty(session)
            .map_err(|e| ClubError::Internal(anyhow::anyhow!("Encoding session: {}", e)))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ClubError::Internal(anyhow::anyhow!("Writing {}: {}", self.path.display(), e)))
    }

    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClubError::Internal(anyhow::anyhow!(
                "Removing {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Token response from the auth API.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Hosted auth API client.
#[derive(Clone)]
pub struct GoTrueAuth {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    store: SessionStore,
}

impl GoTrueAuth {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClubError::Internal(anyhow::anyhow!("HTTP client setup: {}", e)))?;

        Ok(Self {
            http,
            auth_url: format!("{}/auth/v1", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
            store: SessionStore::new(&config.session_path),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
    }

    /// Check response status and return error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClubError::from_status(status.as_u16(), auth_error_message(&body)))
    }
}

/// Auth API error bodies come in a few shapes depending on the endpoint.
fn auth_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct AuthError {
        #[serde(alias = "error_description", alias = "message")]
        msg: Option<String>,
    }

    match serde_json::from_str::<AuthError>(body) {
        Ok(AuthError { msg: Some(msg) }) => msg,
        _ => error_message(body),
    }
}

#[async_trait]
impl IdentityProvider for GoTrueAuth {
    async fn send_login_link(&self, email: &str, redirect_to: &str) -> Result<()> {
        let body = serde_json::json!({
            "email": email,
            "create_user": true,
        });

        let response = self
            .post("otp")
            .bearer_auth(&self.anon_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&body)
            .send()
            .await
            .map_err(|e| ClubError::AuthDelivery(format!("Login link request failed: {}", e)))?;

        Self::check_response(response)
            .await
            .map_err(|e| ClubError::AuthDelivery(e.to_string()))?;

        tracing::info!("Login link requested");
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        let Some(stored) = self.store.load().await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if !stored.expires_within(now, Duration::seconds(RESTORE_REFRESH_MARGIN_SECS)) {
            return Ok(Some(stored));
        }

        tracing::info!(user_id = %stored.user_id, "Stored session expiring, refreshing");
        match self.refresh_session(&stored).await {
            Ok(session) => Ok(Some(session)),
            Err(ClubError::PolicyDenied(msg)) => {
                tracing::warn!(error = %msg, "Refresh token rejected, clearing stored session");
                self.store.clear().await?;
                Ok(None)
            }
            Err(e) if stored.is_live(now) => {
                tracing::warn!(error = %e, "Refresh failed, keeping still-valid session");
                Ok(Some(stored))
            }
            Err(e) => Err(e),
        }
    }

    async fn complete_login(&self, redirect_url: &str) -> Result<Session> {
        let redirect = parse_login_redirect(redirect_url)?;
        let session = Session::from_tokens(&redirect.access_token, &redirect.refresh_token)?;
        self.store.save(&session).await?;
        tracing::info!(user_id = %session.user_id, "Login completed");
        Ok(session)
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session> {
        let body = serde_json::json!({ "refresh_token": session.refresh_token });

        let response = self
            .post("token")
            .bearer_auth(&self.anon_key)
            .query(&[("grant_type", "refresh_token")])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 {
            // Expired, revoked or reused refresh token
            let body = response.text().await.unwrap_or_default();
            return Err(ClubError::PolicyDenied(auth_error_message(&body)));
        }

        let tokens: TokenResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| ClubError::Transport(format!("JSON parse error: {}", e)))?;

        let refreshed = Session::from_tokens(&tokens.access_token, &tokens.refresh_token)?;
        self.store.save(&refreshed).await?;
        tracing::debug!(user_id = %refreshed.user_id, expires_at = %refreshed.expires_at, "Session refreshed");
        Ok(refreshed)
    }

    async fn sign_out(&self, session: &Session) -> Result<()> {
        // Forget locally first so a failed revocation still signs this device out.
        self.store.clear().await?;

        let response = self
            .post("logout")
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn forget_local(&self) -> Result<()> {
        self.store.clear().await
    }
}
