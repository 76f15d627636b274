// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider boundary.
//!
//! Sign-in is delegated entirely: the provider emails a magic link, the link
//! comes back to the app carrying tokens, and the provider refreshes and
//! revokes them. The client never sees a password.

use crate::error::{ClubError, Result};
use crate::models::Session;
use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Operations the client needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the provider to email a one-time login link. One attempt, no retry.
    async fn send_login_link(&self, email: &str, redirect_to: &str) -> Result<()>;

    /// The session restored from local storage, refreshed if it had expired.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Turn the redirect produced by a clicked magic link into a session.
    async fn complete_login(&self, redirect_url: &str) -> Result<Session>;

    /// Exchange the refresh token for a new session.
    async fn refresh_session(&self, session: &Session) -> Result<Session>;

    /// Revoke the session with the provider and forget it locally.
    async fn sign_out(&self, session: &Session) -> Result<()>;

    /// Forget any locally stored session without contacting the provider.
    async fn forget_local(&self) -> Result<()>;
}

/// Tokens carried back by a magic-link redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub access_token: String,
    pub refresh_token: String,
}

/// Parse `peachfc://auth#access_token=…&refresh_token=…` (or the `?` form).
///
/// A redirect carrying `error`/`error_description` (expired or reused link)
/// is rejected with the provider's description.
pub fn parse_login_redirect(redirect_url: &str) -> Result<LoginRedirect> {
    let url = Url::parse(redirect_url.trim())
        .map_err(|e| ClubError::InvalidInput(format!("malformed login redirect: {}", e)))?;

    // Tokens normally ride in the fragment; fall back to the query.
    let fragment = url.fragment().filter(|f| !f.is_empty()).map(str::to_owned);
    let params = match fragment {
        Some(fragment) => {
            let mut as_query = url;
            as_query.set_fragment(None);
            as_query.set_query(Some(&fragment));
            as_query
        }
        None => url,
    };

    let mut values: HashMap<String, String> = params.query_pairs().into_owned().collect();
    if values.is_empty() {
        return Err(ClubError::InvalidInput(
            "login redirect carries no parameters".to_string(),
        ));
    }

    if let Some(error) = values.get("error") {
        let description = values
            .get("error_description")
            .cloned()
            .unwrap_or_else(|| error.clone());
        return Err(ClubError::PolicyDenied(format!(
            "Login link rejected: {}",
            description
        )));
    }

    let mut take = |key: &'static str| {
        values
            .remove(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ClubError::InvalidInput(format!("login redirect is missing {}", key)))
    };

    Ok(LoginRedirect {
        access_token: take("access_token")?,
        refresh_token: take("refresh_token")?,
    })
}

/// Scriptable provider for tests and offline use.
///
/// Holds the "stored" session in memory and records every login link request.
#[derive(Default)]
pub struct MockIdentity {
    stored: Mutex<Option<Session>>,
    refreshed: Mutex<Option<Session>>,
    sent_links: Mutex<Vec<(String, String)>>,
    fail_delivery: AtomicBool,
    fail_sign_out: AtomicBool,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that restores `session` at startup.
    pub fn with_session(session: Session) -> Self {
        let mock = Self::default();
        *lock(&mock.stored) = Some(session);
        mock
    }

    /// Make `send_login_link` fail as if the provider rejected it.
    pub fn set_fail_delivery(&self, fail: bool) {
        self.fail_delivery.store(fail, Ordering::SeqCst);
    }

    /// Make the provider-side sign-out call fail.
    pub fn set_fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// The session the next refresh returns; without one, refresh is rejected.
    pub fn set_refreshed(&self, session: Session) {
        *lock(&self.refreshed) = Some(session);
    }

    /// Every `(email, redirect_to)` a link was sent for.
    pub fn sent_links(&self) -> Vec<(String, String)> {
        lock(&self.sent_links).clone()
    }

    /// The session currently held in "storage".
    pub fn stored_session(&self) -> Option<Session> {
        lock(&self.stored).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn send_login_link(&self, email: &str, redirect_to: &str) -> Result<()> {
        if self.fail_delivery.load(Ordering::SeqCst) {
            return Err(ClubError::AuthDelivery(
                "Email rate limit exceeded".to_string(),
            ));
        }
        lock(&self.sent_links).push((email.to_string(), redirect_to.to_string()));
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(lock(&self.stored).clone())
    }

    async fn complete_login(&self, redirect_url: &str) -> Result<Session> {
        let redirect = parse_login_redirect(redirect_url)?;
        let session = Session::from_tokens(&redirect.access_token, &redirect.refresh_token)?;
        *lock(&self.stored) = Some(session.clone());
        Ok(session)
    }

    async fn refresh_session(&self, _session: &Session) -> Result<Session> {
        let refreshed = lock(&self.refreshed)
            .take()
            .ok_or_else(|| ClubError::PolicyDenied("Invalid Refresh Token".to_string()))?;
        *lock(&self.stored) = Some(refreshed.clone());
        Ok(refreshed)
    }

    async fn sign_out(&self, _session: &Session) -> Result<()> {
        *lock(&self.stored) = None;
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(ClubError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    async fn forget_local(&self) -> Result<()> {
        *lock(&self.stored) = None;
        Ok(())
    }
}
