// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event directory: read-only view of the team's schedule.

use crate::db::DataStore;
use crate::error::{ClubError, Result};
use crate::models::Event;
use crate::services::session::SessionTracker;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// What the dashboard shows as "next".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "event", rename_all = "snake_case")]
pub enum NextEvent {
    Upcoming(Event),
    /// Nothing scheduled after now. Not an error.
    NoneScheduled,
}

impl NextEvent {
    pub fn event(&self) -> Option<&Event> {
        match self {
            NextEvent::Upcoming(event) => Some(event),
            NextEvent::NoneScheduled => None,
        }
    }
}

/// Earliest event starting strictly after `now`.
///
/// Ties on start time go to the first in slice order.
pub fn next_after(events: &[Event], now: DateTime<Utc>) -> Option<&Event> {
    events
        .iter()
        .filter(|e| e.start_at > now)
        .min_by_key(|e| e.start_at)
}

/// Read projections of one team's events.
#[derive(Clone)]
pub struct EventDirectory {
    db: Arc<dyn DataStore>,
    sessions: SessionTracker,
    team_id: Uuid,
    list_limit: u32,
}

impl EventDirectory {
    pub fn new(
        db: Arc<dyn DataStore>,
        sessions: SessionTracker,
        team_id: Uuid,
        list_limit: u32,
    ) -> Self {
        Self {
            db,
            sessions,
            team_id,
            list_limit,
        }
    }

    pub fn team_id(&self) -> Uuid {
        self.team_id
    }

    /// The team's events in ascending start order, capped at the list limit.
    pub async fn list_upcoming(&self) -> Result<Vec<Event>> {
        let actor = self.sessions.current_session();
        let events = self
            .db
            .list_events(actor.as_ref(), self.team_id, self.list_limit)
            .await?;

        for event in events.iter().filter(|e| !e.has_valid_window()) {
            warn_inverted_window(event);
        }
        tracing::debug!(count = events.len(), "Events listed");
        Ok(events)
    }

    /// A single event of this team.
    pub async fn get_by_id(&self, event_id: Uuid) -> Result<Event> {
        let actor = self.sessions.current_session();
        let event = self
            .db
            .get_event(actor.as_ref(), event_id)
            .await?
            .filter(|e| e.team_id == self.team_id)
            .ok_or_else(|| ClubError::NotFound(format!("Event {} not found", event_id)))?;

        if !event.has_valid_window() {
            warn_inverted_window(&event);
        }
        Ok(event)
    }

    /// The earliest event starting strictly after `now`.
    pub async fn next_event(&self, now: DateTime<Utc>) -> Result<NextEvent> {
        let actor = self.sessions.current_session();
        let next = self
            .db
            .next_event(actor.as_ref(), self.team_id, now)
            .await?;

        Ok(match next {
            Some(event) => NextEvent::Upcoming(event),
            None => NextEvent::NoneScheduled,
        })
    }
}

fn warn_inverted_window(event: &Event) {
    tracing::warn!(
        event_id = %event.id,
        start_at = %event.start_at,
        end_at = %event.end_at,
        "Event ends before it starts"
    );
}
