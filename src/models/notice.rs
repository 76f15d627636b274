//! Team notice model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broadcast message in `team_notices`. Only the newest one is ever read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub team_id: Uuid,
    pub content: String,
    /// Server timestamp
    pub created_at: DateTime<Utc>,
}
