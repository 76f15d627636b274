// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client error types with distinguishable outcomes.

/// Error type for every backend and session operation.
///
/// Nothing in the client retries on its own; each variant is surfaced to the
/// caller, which decides whether the user should try again.
#[derive(Debug, thiserror::Error)]
pub enum ClubError {
    #[error("Login link could not be sent: {0}")]
    AuthDelivery(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Not permitted: {0}")]
    PolicyDenied(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Screen state is stale: {0}")]
    Stale(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ClubError {
    /// Stable machine-readable name for the error.
    pub fn kind(&self) -> &'static str {
        match self {
            ClubError::AuthDelivery(_) => "auth_delivery",
            ClubError::NotFound(_) => "not_found",
            ClubError::PolicyDenied(_) => "policy_denied",
            ClubError::Transport(_) => "transport",
            ClubError::Conflict(_) => "conflict",
            ClubError::Stale(_) => "stale",
            ClubError::InvalidInput(_) => "invalid_input",
            ClubError::Internal(_) => "internal",
        }
    }

    /// Map a non-success HTTP status from the hosted backend.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ClubError::PolicyDenied(message),
            404 | 406 => ClubError::NotFound(message),
            409 => ClubError::Conflict(message),
            429 => {
                tracing::warn!("Backend rate limit hit (429)");
                ClubError::Transport(format!("HTTP {}: {}", status, message))
            }
            _ => ClubError::Transport(format!("HTTP {}: {}", status, message)),
        }
    }
}

impl From<reqwest::Error> for ClubError {
    fn from(err: reqwest::Error) -> Self {
        ClubError::Transport(err.to_string())
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClubError>;
