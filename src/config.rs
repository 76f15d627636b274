//! Client configuration loaded from environment variables.
//!
//! The team is fixed at build/deploy time: this client never lists or
//! switches teams, so the team id is part of configuration rather than state.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the hosted backend (e.g. https://xxxx.supabase.co)
    pub supabase_url: String,
    /// Public anonymous API key
    pub supabase_anon_key: String,
    /// The one team this client serves
    pub team_id: Uuid,
    /// Display name for the team
    pub team_name: String,
    /// Where magic links send the user back to
    pub auth_redirect_url: String,
    /// Cap on the event list view
    pub event_list_limit: u32,
    /// Per-request timeout for backend calls
    pub request_timeout: Duration,
    /// Where the signed-in session is persisted between runs
    pub session_path: PathBuf,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: "http://127.0.0.1:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            team_id: Uuid::nil(),
            team_name: "PEACH FC".to_string(),
            auth_redirect_url: "peachfc://auth".to_string(),
            event_list_limit: 200,
            request_timeout: Duration::from_secs(15),
            session_path: PathBuf::from(".peach-fc/session.json"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present. The `EXPO_PUBLIC_*` names used
    /// by the mobile app are accepted as fallbacks for the backend settings.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let supabase_url = var_or_fallback("SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_URL")
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let supabase_anon_key =
            var_or_fallback("SUPABASE_ANON_KEY", "EXPO_PUBLIC_SUPABASE_ANON_KEY")
                .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let team_id = env::var("PEACH_TEAM_ID")
            .map_err(|_| ConfigError::Missing("PEACH_TEAM_ID"))?
            .trim()
            .parse::<Uuid>()
            .map_err(|e| ConfigError::Invalid("PEACH_TEAM_ID", e.to_string()))?;

        let event_list_limit =
            parse_positive("EVENT_LIST_LIMIT", env::var("EVENT_LIST_LIMIT").ok(), 200u32)?;
        let request_timeout_secs =
            parse_positive("REQUEST_TIMEOUT_SECS", env::var("REQUEST_TIMEOUT_SECS").ok(), 15u64)?;

        Ok(Self {
            supabase_url: supabase_url.trim().trim_end_matches('/').to_string(),
            supabase_anon_key: supabase_anon_key.trim().to_string(),
            team_id,
            team_name: env::var("PEACH_TEAM_NAME").unwrap_or_else(|_| "PEACH FC".to_string()),
            auth_redirect_url: env::var("AUTH_REDIRECT_URL")
                .unwrap_or_else(|_| "peachfc://auth".to_string()),
            event_list_limit,
            request_timeout: Duration::from_secs(request_timeout_secs),
            session_path: env::var("SESSION_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".peach-fc/session.json")),
        })
    }
}

/// Parse an optional positive number, using `default` when unset.
fn parse_positive<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = value else {
        return Ok(default);
    };
    let parsed = raw.trim().parse::<T>().ok().filter(|n| *n > T::default());
    parsed.ok_or(ConfigError::Invalid(name, raw))
}

fn var_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    env::var(primary).or_else(|_| env::var(fallback)).ok()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
