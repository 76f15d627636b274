//! Notice feed: the team's latest announcement.

use crate::db::DataStore;
use crate::error::Result;
use crate::models::Notice;
use crate::services::session::SessionTracker;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct NoticeFeed {
    db: Arc<dyn DataStore>,
    sessions: SessionTracker,
    team_id: Uuid,
}

impl NoticeFeed {
    pub fn new(db: Arc<dyn DataStore>, sessions: SessionTracker, team_id: Uuid) -> Self {
        Self {
            db,
            sessions,
            team_id,
        }
    }

    /// Newest notice, or `None` if the team has never posted one.
    pub async fn latest(&self) -> Result<Option<Notice>> {
        let actor = self.sessions.current_session();
        self.db.latest_notice(actor.as_ref(), self.team_id).await
    }
}
