// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Attendance (RSVP) model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A user's answer for one event. Absence of a record means "no answer yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Yes,
    No,
    Maybe,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 3] = [
        AttendanceStatus::Yes,
        AttendanceStatus::No,
        AttendanceStatus::Maybe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Yes => "yes",
            AttendanceStatus::No => "no",
            AttendanceStatus::Maybe => "maybe",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(AttendanceStatus::Yes),
            "no" => Ok(AttendanceStatus::No),
            "maybe" => Ok(AttendanceStatus::Maybe),
            other => Err(format!(
                "unknown attendance status '{}' (expected yes, no or maybe)",
                other
            )),
        }
    }
}

/// Row in `event_attendance`, unique per (event_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: AttendanceStatus,
    /// Omitted on write to keep the stored comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
