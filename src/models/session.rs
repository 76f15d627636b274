// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authenticated session model.

use crate::error::ClubError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Claims read from the provider's access token.
#[derive(Debug, Deserialize)]
struct AccessClaims {
    /// Subject (user id)
    sub: String,
    #[serde(default)]
    email: Option<String>,
    /// Expiration time (Unix timestamp)
    exp: i64,
}

/// The one signed-in actor of this app instance.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from tokens issued by the identity provider.
    ///
    /// The access token's claims are read without checking its signature:
    /// the client holds no key, and the backend verifies every request anyway.
    pub fn from_tokens(access_token: &str, refresh_token: &str) -> Result<Self, ClubError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<AccessClaims>(access_token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| ClubError::PolicyDenied(format!("Unreadable access token: {}", e)))?;

        let user_id = data.claims.sub.parse::<Uuid>().map_err(|_| {
            ClubError::PolicyDenied(format!("Access token subject is not a user id: {}", data.claims.sub))
        })?;
        let expires_at = DateTime::from_timestamp(data.claims.exp, 0)
            .ok_or_else(|| ClubError::PolicyDenied("Access token expiry out of range".to_string()))?;

        Ok(Self {
            user_id,
            email: data.claims.email,
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            expires_at,
        })
    }

    /// Whether the access token is still accepted at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Whether the token expires within `margin` of `now` (or already has).
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin >= self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
