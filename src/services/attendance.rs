// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance reconciler for one event detail view.
//!
//! Keeps the displayed RSVP consistent with the stored row:
//! 1. `load()` fetches the event and the caller's own row concurrently
//! 2. `select()` writes one upsert keyed by (event, user)
//! 3. The new status is shown only once the backend acknowledges it
//! 4. A failed write puts the previous status back on screen
//!
//! One reconciler lives for one screen visit. Dropping it (or a pending
//! `load`/`select` future) abandons the request without touching any other
//! screen's state.

use crate::db::DataStore;
use crate::error::{ClubError, Result};
use crate::models::{AttendanceRecord, AttendanceStatus, Event, Session};
use crate::services::events::EventDirectory;
use crate::services::session::SessionTracker;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// What the RSVP control shows once the current row is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "status", rename_all = "snake_case")]
pub enum AttendanceView {
    /// No row yet: the user has not answered
    NoRecord,
    Recorded(AttendanceStatus),
}

impl AttendanceView {
    pub fn status(&self) -> Option<AttendanceStatus> {
        match self {
            AttendanceView::NoRecord => None,
            AttendanceView::Recorded(status) => Some(*status),
        }
    }
}

/// Reconciler state for one (event, user) during one screen visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttendanceState {
    /// Current row not read yet; writes are refused
    Loading,
    Ready(AttendanceView),
    /// Write in flight; the previous view stays on screen
    Submitting {
        previous: AttendanceView,
        requested: AttendanceStatus,
    },
    /// Last write rejected; `previous` is what is shown
    Failed {
        previous: AttendanceView,
        message: String,
    },
}

impl AttendanceState {
    /// The view to render, if the row has been read.
    pub fn displayed(&self) -> Option<AttendanceView> {
        match self {
            AttendanceState::Loading => None,
            AttendanceState::Ready(view) => Some(*view),
            AttendanceState::Submitting { previous, .. } => Some(*previous),
            AttendanceState::Failed { previous, .. } => Some(*previous),
        }
    }

    /// The view a new write may start from: settled states only.
    fn settled(&self) -> Option<AttendanceView> {
        match self {
            AttendanceState::Ready(view) => Some(*view),
            AttendanceState::Failed { previous, .. } => Some(*previous),
            AttendanceState::Loading | AttendanceState::Submitting { .. } => None,
        }
    }
}

/// Loads and edits the signed-in user's RSVP for one event.
pub struct AttendanceReconciler {
    db: Arc<dyn DataStore>,
    directory: EventDirectory,
    sessions: SessionTracker,
    event_id: Uuid,
    event: Option<Event>,
    /// User whose row was loaded; `None` after an anonymous load
    loaded_for: Option<Uuid>,
    state: AttendanceState,
}

impl AttendanceReconciler {
    pub fn new(
        db: Arc<dyn DataStore>,
        directory: EventDirectory,
        sessions: SessionTracker,
        event_id: Uuid,
    ) -> Self {
        Self {
            db,
            directory,
            sessions,
            event_id,
            event: None,
            loaded_for: None,
            state: AttendanceState::Loading,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn state(&self) -> &AttendanceState {
        &self.state
    }

    /// The event detail, once loaded.
    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    /// Whether the RSVP controls should be enabled.
    pub fn can_edit(&self) -> bool {
        self.state.settled().is_some()
            && self
                .sessions
                .live_session()
                .is_some_and(|s| Some(s.user_id) == self.loaded_for)
    }

    /// Fetch the event and, when signed in, the caller's own row.
    ///
    /// Both requests run concurrently. On failure the state stays `Loading`,
    /// so no write can be based on an unread status.
    pub async fn load(&mut self) -> Result<&Event> {
        self.state = AttendanceState::Loading;
        self.loaded_for = None;

        let actor = self.sessions.live_session();
        let (event, record) = tokio::join!(
            self.directory.get_by_id(self.event_id),
            fetch_own_record(self.db.as_ref(), actor.as_ref(), self.event_id),
        );

        let event = event?;
        let record = record?;

        let view = match &record {
            Some(row) => AttendanceView::Recorded(row.status),
            None => AttendanceView::NoRecord,
        };
        tracing::debug!(
            event_id = %self.event_id,
            authenticated = actor.is_some(),
            ?view,
            "Attendance loaded"
        );

        self.loaded_for = actor.map(|s| s.user_id);
        self.state = AttendanceState::Ready(view);
        Ok(self.event.insert(event))
    }

    /// Record `status` for the signed-in user, keeping any stored comment.
    pub async fn select(&mut self, status: AttendanceStatus) -> Result<AttendanceStatus> {
        self.submit(status, None).await
    }

    /// Record `status` (and replace the comment when one is given).
    ///
    /// On success the state becomes `Ready(Recorded(status))`. On any failure
    /// it becomes `Failed` with the previously shown view, and the error is
    /// returned. Nothing is retried.
    pub async fn submit(
        &mut self,
        status: AttendanceStatus,
        comment: Option<String>,
    ) -> Result<AttendanceStatus> {
        let previous = match self.state.settled() {
            Some(view) => view,
            None if matches!(self.state, AttendanceState::Loading) => {
                return Err(ClubError::Stale(
                    "current attendance has not been read yet".to_string(),
                ))
            }
            None => {
                return Err(ClubError::Stale(
                    "an earlier write was abandoned; reload before answering again".to_string(),
                ))
            }
        };

        let session = self.sessions.live_session().ok_or_else(|| {
            ClubError::PolicyDenied("sign in to answer attendance".to_string())
        })?;
        if Some(session.user_id) != self.loaded_for {
            return Err(ClubError::Stale(
                "signed-in user changed since attendance was loaded".to_string(),
            ));
        }

        let record = AttendanceRecord {
            event_id: self.event_id,
            user_id: session.user_id,
            status,
            comment,
        };

        self.state = AttendanceState::Submitting {
            previous,
            requested: status,
        };

        match self.db.upsert_attendance(Some(&session), &record).await {
            Ok(stored) => {
                tracing::info!(
                    event_id = %self.event_id,
                    user_id = %session.user_id,
                    status = %stored.status,
                    "Attendance recorded"
                );
                self.state = AttendanceState::Ready(AttendanceView::Recorded(stored.status));
                Ok(stored.status)
            }
            Err(e) => {
                tracing::warn!(
                    event_id = %self.event_id,
                    user_id = %session.user_id,
                    requested = %status,
                    error = %e,
                    "Attendance write failed; restoring previous status"
                );
                self.state = AttendanceState::Failed {
                    previous,
                    message: e.to_string(),
                };
                Err(e)
            }
        }
    }
}

async fn fetch_own_record(
    db: &dyn DataStore,
    actor: Option<&Session>,
    event_id: Uuid,
) -> Result<Option<AttendanceRecord>> {
    match actor {
        Some(session) => db.get_attendance(session, event_id, session.user_id).await,
        None => Ok(None),
    }
}
