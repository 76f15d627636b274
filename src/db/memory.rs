// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory data store.
//!
//! Mirrors the hosted backend's rules that the client depends on:
//! - one attendance row per (event, user), enforced on every upsert
//! - attendance writes need a live session acting for its own user
//! - attendance rows must reference an existing event
//!
//! Used for offline mode and tests. `set_offline(true)` makes every call fail
//! with a transport error, like a dropped connection.

use crate::db::DataStore;
use crate::error::{ClubError, Result};
use crate::models::{AttendanceRecord, Event, Notice, Session};
use crate::services::events::next_after;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use uuid::Uuid;

/// In-process backend.
#[derive(Default)]
pub struct MemoryDb {
    events: DashMap<Uuid, Event>,
    attendance: DashMap<(Uuid, Uuid), AttendanceRecord>,
    notices: DashMap<Uuid, Notice>,
    offline: AtomicBool,
    write_attempts: AtomicU64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Seeding ─────────────────────────────────────────────────

    pub fn insert_event(&self, event: Event) {
        self.events.insert(event.id, event);
    }

    /// Delete an event and its attendance rows (the foreign key cascades).
    pub fn remove_event(&self, event_id: Uuid) {
        self.events.remove(&event_id);
        self.attendance.retain(|(e, _), _| *e != event_id);
    }

    pub fn insert_notice(&self, notice: Notice) {
        self.notices.insert(notice.id, notice);
    }

    // ─── Fault injection and inspection ──────────────────────────

    /// Simulate losing (or regaining) the connection.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// All attendance rows stored for an event.
    pub fn attendance_for_event(&self, event_id: Uuid) -> Vec<AttendanceRecord> {
        self.attendance
            .iter()
            .filter(|entry| entry.key().0 == event_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// The stored row for `(event_id, user_id)`, bypassing policies.
    pub fn stored_attendance(&self, event_id: Uuid, user_id: Uuid) -> Option<AttendanceRecord> {
        self.attendance
            .get(&(event_id, user_id))
            .map(|r| r.value().clone())
    }

    /// Number of attendance writes that reached this store, accepted or not.
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ClubError::Transport("connection refused (offline)".to_string()));
        }
        Ok(())
    }
}

/// Reject anonymous or expired actors.
fn require_live(actor: Option<&Session>) -> Result<&Session> {
    let session =
        actor.ok_or_else(|| ClubError::PolicyDenied("anonymous access not permitted".to_string()))?;
    if !session.is_live(Utc::now()) {
        return Err(ClubError::PolicyDenied("session expired".to_string()));
    }
    Ok(session)
}

#[async_trait]
impl DataStore for MemoryDb {
    async fn next_event(
        &self,
        _actor: Option<&Session>,
        team_id: Uuid,
        after: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        self.ensure_online()?;
        let events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.team_id == team_id)
            .map(|e| e.value().clone())
            .collect();
        Ok(next_after(&events, after).cloned())
    }

    async fn list_events(
        &self,
        _actor: Option<&Session>,
        team_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Event>> {
        self.ensure_online()?;
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.team_id == team_id)
            .map(|e| e.value().clone())
            .collect();
        events.sort_by_key(|e| e.start_at);
        events.truncate(limit as usize);
        Ok(events)
    }

    async fn get_event(&self, _actor: Option<&Session>, event_id: Uuid) -> Result<Option<Event>> {
        self.ensure_online()?;
        Ok(self.events.get(&event_id).map(|e| e.value().clone()))
    }

    async fn get_attendance(
        &self,
        actor: &Session,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<AttendanceRecord>> {
        self.ensure_online()?;
        let session = require_live(Some(actor))?;
        // Rows of other users are filtered out, not refused.
        if session.user_id != user_id {
            return Ok(None);
        }
        Ok(self.stored_attendance(event_id, user_id))
    }

    async fn upsert_attendance(
        &self,
        actor: Option<&Session>,
        record: &AttendanceRecord,
    ) -> Result<AttendanceRecord> {
        self.ensure_online()?;
        self.write_attempts.fetch_add(1, Ordering::SeqCst);

        let session = require_live(actor)?;
        if session.user_id != record.user_id {
            return Err(ClubError::PolicyDenied(
                "new row violates row-level security policy for table \"event_attendance\""
                    .to_string(),
            ));
        }
        if !self.events.contains_key(&record.event_id) {
            return Err(ClubError::Conflict(format!(
                "event {} does not exist",
                record.event_id
            )));
        }

        // The entry lock serializes concurrent writers for the same key.
        let stored = match self.attendance.entry((record.event_id, record.user_id)) {
            Entry::Occupied(mut existing) => {
                let row = existing.get_mut();
                row.status = record.status;
                if record.comment.is_some() {
                    row.comment = record.comment.clone();
                }
                row.clone()
            }
            Entry::Vacant(vacant) => vacant.insert(record.clone()).value().clone(),
        };
        Ok(stored)
    }

    async fn latest_notice(
        &self,
        _actor: Option<&Session>,
        team_id: Uuid,
    ) -> Result<Option<Notice>> {
        self.ensure_online()?;
        Ok(self
            .notices
            .iter()
            .filter(|n| n.team_id == team_id)
            .max_by_key(|n| n.created_at)
            .map(|n| n.value().clone()))
    }
}
