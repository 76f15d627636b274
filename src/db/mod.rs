//! Data store layer (hosted Postgres behind a REST gateway, or in-memory).

pub mod memory;
pub mod postgrest;

pub use memory::MemoryDb;
pub use postgrest::PostgrestDb;

use crate::error::Result;
use crate::models::{AttendanceRecord, Event, Notice, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Table names as constants.
pub mod tables {
    pub const EVENTS: &str = "events";
    pub const ATTENDANCE: &str = "event_attendance";
    pub const NOTICES: &str = "team_notices";
}

/// Operations the client needs from the data store.
///
/// `actor` is the signed-in session whose token the backend checks against its
/// row-level policies; `None` means the anonymous key. Implementations must
/// report failures as errors, never as empty results.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Earliest event of the team starting strictly after `after`.
    async fn next_event(
        &self,
        actor: Option<&Session>,
        team_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<Event>>;

    /// Events of the team ordered by start time, at most `limit`.
    async fn list_events(
        &self,
        actor: Option<&Session>,
        team_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Event>>;

    /// A single event by id.
    async fn get_event(&self, actor: Option<&Session>, event_id: Uuid) -> Result<Option<Event>>;

    /// The (at most one) attendance row for `(event_id, user_id)`.
    async fn get_attendance(
        &self,
        actor: &Session,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AttendanceRecord>>;

    /// Insert the row, or overwrite status/comment of the existing one for
    /// the same `(event_id, user_id)`. Returns the stored row.
    async fn upsert_attendance(
        &self,
        actor: Option<&Session>,
        record: &AttendanceRecord,
    ) -> Result<AttendanceRecord>;

    /// Most recent notice of the team.
    async fn latest_notice(&self, actor: Option<&Session>, team_id: Uuid)
        -> Result<Option<Notice>>;
}
