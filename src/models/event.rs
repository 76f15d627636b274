// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scheduled team event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Event row as stored in the `events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    /// Owning team (always the configured team for this client)
    pub team_id: Uuid,
    pub title: String,
    /// Category; the column is named `type`
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Venue
    #[serde(default)]
    pub place: Option<String>,
    /// Free-text note from the organizer
    #[serde(default)]
    pub note: Option<String>,
}

impl Event {
    /// Whether the event ends no earlier than it starts.
    ///
    /// The backend does not enforce this, so rows violating it can be read;
    /// callers decide whether to display them.
    pub fn has_valid_window(&self) -> bool {
        self.end_at >= self.start_at
    }
}

/// Category of event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Match,
    Training,
    Meeting,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Match => "match",
            EventKind::Training => "training",
            EventKind::Meeting => "meeting",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "match" => Ok(EventKind::Match),
            "training" => Ok(EventKind::Training),
            "meeting" => Ok(EventKind::Meeting),
            other => Err(format!("unknown event type: {}", other)),
        }
    }
}
