// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session tracker: the single owner of "who is signed in".
//!
//! Every other component reads the session through `current_session()` or a
//! subscription; only the tracker writes it. Changes are published over a
//! `watch` channel, so a subscriber always sees the latest state.

use crate::error::{ClubError, Result};
use crate::models::Session;
use crate::services::identity::IdentityProvider;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use validator::Validate;

/// Refresh when the access token has less than this left.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Validate)]
struct LoginLinkRequest {
    #[validate(email)]
    email: String,
}

/// Handle to an `on_change` handler. Dropping it stops the handler.
#[must_use = "dropping the subscription cancels it immediately"]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivering changes to the handler.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    redirect_url: String,
    tx: watch::Sender<Option<Session>>,
}

/// Mirrors the identity provider's session into local state.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<Inner>,
}

impl SessionTracker {
    /// Create a tracker with no session. Call `init()` to restore one.
    pub fn new(identity: Arc<dyn IdentityProvider>, redirect_url: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                identity,
                redirect_url: redirect_url.into(),
                tx,
            }),
        }
    }

    /// Restore the stored session, or record that there is none.
    pub async fn init(&self) -> Result<Option<Session>> {
        match self.inner.identity.current_session().await {
            Ok(session) => {
                match &session {
                    Some(s) => tracing::info!(user_id = %s.user_id, "Session restored"),
                    None => tracing::info!("No stored session"),
                }
                self.publish(session.clone());
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session restore failed");
                self.publish(None);
                Err(e)
            }
        }
    }

    /// The session as last published, live or not.
    pub fn current_session(&self) -> Option<Session> {
        self.inner.tx.borrow().clone()
    }

    /// The session, only if its token is still accepted.
    pub fn live_session(&self) -> Option<Session> {
        self.current_session().filter(|s| s.is_live(Utc::now()))
    }

    /// Email a login link. Exactly one attempt; failures are returned as-is.
    pub async fn request_login_link(&self, email: &str) -> Result<()> {
        let request = LoginLinkRequest {
            email: email.trim().to_string(),
        };
        request
            .validate()
            .map_err(|_| ClubError::AuthDelivery(format!("'{}' is not an email address", request.email)))?;

        self.inner
            .identity
            .send_login_link(&request.email, &self.inner.redirect_url)
            .await
            .map_err(|e| match e {
                ClubError::AuthDelivery(_) => e,
                other => ClubError::AuthDelivery(other.to_string()),
            })
    }

    /// Finish a login from the magic link's redirect URL.
    pub async fn complete_login(&self, redirect_url: &str) -> Result<Session> {
        let session = self.inner.identity.complete_login(redirect_url).await?;
        tracing::info!(user_id = %session.user_id, "Signed in");
        self.publish(Some(session.clone()));
        Ok(session)
    }

    /// Refresh the token if it is about to expire. Returns the current session.
    ///
    /// A rejected refresh token ends the session.
    pub async fn refresh_if_expiring(&self) -> Result<Option<Session>> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !session.expires_within(Utc::now(), Duration::seconds(REFRESH_MARGIN_SECS)) {
            return Ok(Some(session));
        }

        match self.inner.identity.refresh_session(&session).await {
            Ok(refreshed) => {
                tracing::debug!(user_id = %refreshed.user_id, "Token refreshed");
                self.publish(Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(ClubError::PolicyDenied(msg)) => {
                tracing::warn!(user_id = %session.user_id, error = %msg, "Refresh rejected, signing out");
                self.publish(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Sign out. Always clears the local session, even if the provider
    /// could not be reached to revoke it or the session was never restored.
    pub async fn sign_out(&self) {
        let Some(session) = self.current_session() else {
            // A stored session may remain from a restore that failed.
            if let Err(e) = self.inner.identity.forget_local().await {
                tracing::warn!(error = %e, "Clearing stored session failed");
            }
            return;
        };
        if let Err(e) = self.inner.identity.sign_out(&session).await {
            tracing::warn!(user_id = %session.user_id, error = %e, "Provider sign-out failed; cleared locally");
        }
        tracing::info!(user_id = %session.user_id, "Signed out");
        self.publish(None);
    }

    /// Receiver that observes every published session change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.inner.tx.subscribe()
    }

    /// Run `handler` on each change until the returned subscription is dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Option<Session>) + Send + 'static,
    {
        let mut rx = self.inner.tx.subscribe();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let session = rx.borrow_and_update().clone();
                handler(session);
            }
        });
        Subscription { task }
    }

    fn publish(&self, session: Option<Session>) {
        self.inner.tx.send_replace(session);
    }
}
