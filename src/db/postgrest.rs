// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! REST client for the hosted Postgres tables.
//!
//! Handles:
//! - Filtered, ordered, limited reads of events and notices
//! - The caller's own attendance row
//! - Attendance upsert keyed by the (event_id, user_id) unique constraint

use crate::config::Config;
use crate::db::{tables, DataStore};
use crate::error::{ClubError, Result};
use crate::models::{AttendanceRecord, Event, Notice, Session};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

/// Conflict target for attendance upserts.
const ATTENDANCE_CONFLICT_TARGET: &str = "event_id,user_id";

/// REST gateway client.
#[derive(Clone)]
pub struct PostgrestDb {
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
}

impl PostgrestDb {
    /// Create a client for the backend named in `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClubError::Internal(anyhow::anyhow!("HTTP client setup: {}", e)))?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
        })
    }

    /// Start a request authenticated as `actor`, or as the anonymous key.
    fn request(
        &self,
        method: Method,
        table: &str,
        actor: Option<&Session>,
    ) -> reqwest::RequestBuilder {
        let token = actor
            .map(|s| s.access_token.as_str())
            .unwrap_or(self.anon_key.as_str());

        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    /// Generic filtered select.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        actor: Option<&Session>,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        tracing::debug!(table, authenticated = actor.is_some(), "Select");

        let response = self
            .request(Method::GET, table, actor)
            .query(&[("select", "*")])
            .query(query)
            .send()
            .await?;

        check_response_json(response).await
    }
}

#[async_trait]
impl DataStore for PostgrestDb {
    async fn next_event(
        &self,
        actor: Option<&Session>,
        team_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        let rows: Vec<Event> = self
            .select(
                tables::EVENTS,
                actor,
                &[
                    ("team_id", format!("eq.{}", team_id)),
                    ("start_at", format!("gt.{}", format_utc_rfc3339(after))),
                    ("order", "start_at.asc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_events(
        &self,
        actor: Option<&Session>,
        team_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Event>> {
        self.select(
            tables::EVENTS,
            actor,
            &[
                ("team_id", format!("eq.{}", team_id)),
                ("order", "start_at.asc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn get_event(&self, actor: Option<&Session>, event_id: Uuid) -> Result<Option<Event>> {
        let rows: Vec<Event> = self
            .select(
                tables::EVENTS,
                actor,
                &[
                    ("id", format!("eq.{}", event_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_attendance(
        &self,
        actor: &Session,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AttendanceRecord>> {
        let rows: Vec<AttendanceRecord> = self
            .select(
                tables::ATTENDANCE,
                Some(actor),
                &[
                    ("event_id", format!("eq.{}", event_id)),
                    ("user_id", format!("eq.{}", user_id)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert_attendance(
        &self,
        actor: Option<&Session>,
        record: &AttendanceRecord,
    ) -> Result<AttendanceRecord> {
        tracing::debug!(
            event_id = %record.event_id,
            user_id = %record.user_id,
            status = %record.status,
            "Upserting attendance"
        );

        let response = self
            .request(Method::POST, tables::ATTENDANCE, actor)
            .query(&[("on_conflict", ATTENDANCE_CONFLICT_TARGET)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&[record])
            .send()
            .await?;

        let rows: Vec<AttendanceRecord> = check_response_json(response).await?;

        // A policy that permits the write but not the read-back yields no rows;
        // the 2xx still acknowledges the write.
        match rows.into_iter().next() {
            Some(stored) => Ok(stored),
            None => {
                tracing::debug!(event_id = %record.event_id, "Upsert acknowledged without representation");
                Ok(record.clone())
            }
        }
    }

    async fn latest_notice(
        &self,
        actor: Option<&Session>,
        team_id: Uuid,
    ) -> Result<Option<Notice>> {
        let rows: Vec<Notice> = self
            .select(
                tables::NOTICES,
                actor,
                &[
                    ("team_id", format!("eq.{}", team_id)),
                    ("order", "created_at.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }
}

/// Error body returned by the REST gateway.
#[derive(Debug, Deserialize)]
struct GatewayError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Pull a readable message out of an error body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<GatewayError>(body) {
        Ok(GatewayError {
            message,
            code: Some(code),
        }) => format!("{} ({})", message, code),
        Ok(GatewayError { message, .. }) => message,
        Err(_) if body.is_empty() => "empty response body".to_string(),
        Err(_) => body.to_string(),
    }
}

/// Check response status and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClubError::from_status(status.as_u16(), error_message(&body)));
    }

    response
        .json()
        .await
        .map_err(|e| ClubError::Transport(format!("JSON parse error: {}", e)))
}
