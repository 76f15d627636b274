//! Home dashboard: next event plus latest notice.

use crate::error::Result;
use crate::models::Notice;
use crate::services::events::{EventDirectory, NextEvent};
use crate::services::notices::NoticeFeed;
use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HomeDashboard {
    pub team_name: String,
    pub next_event: NextEvent,
    pub notice: Option<Notice>,
}

impl HomeDashboard {
    /// Fetch both panels concurrently. Either failure fails the load.
    pub async fn load(
        team_name: &str,
        events: &EventDirectory,
        notices: &NoticeFeed,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let (next_event, notice) = try_join(events.next_event(now), notices.latest()).await?;

        Ok(Self {
            team_name: team_name.to_string(),
            next_event,
            notice,
        })
    }
}
