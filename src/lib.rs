// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! PEACH FC: club client for a single team
//!
//! This crate provides sign-in by magic link, the home dashboard (next event
//! and latest notice), the event schedule, and RSVP for the signed-in member,
//! against a hosted database that enforces row-level policies.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;

use chrono::Utc;
use config::Config;
use db::{DataStore, PostgrestDb};
use error::Result;
use services::{
    AttendanceReconciler, EventDirectory, GoTrueAuth, HomeDashboard, IdentityProvider,
    NoticeFeed, SessionTracker,
};
use std::sync::Arc;
use uuid::Uuid;

/// Shared client state.
pub struct Club {
    pub config: Config,
    pub db: Arc<dyn DataStore>,
    pub sessions: SessionTracker,
    pub events: EventDirectory,
    pub notices: NoticeFeed,
}

impl Club {
    /// Client for the hosted backend named in `config`.
    pub fn connect(config: Config) -> Result<Self> {
        let db = Arc::new(PostgrestDb::new(&config)?);
        let identity = Arc::new(GoTrueAuth::new(&config)?);
        Ok(Self::with_backends(config, db, identity))
    }

    /// Client over arbitrary backends (in-memory, mocks).
    pub fn with_backends(
        config: Config,
        db: Arc<dyn DataStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = SessionTracker::new(identity, config.auth_redirect_url.clone());
        let events = EventDirectory::new(
            db.clone(),
            sessions.clone(),
            config.team_id,
            config.event_list_limit,
        );
        let notices = NoticeFeed::new(db.clone(), sessions.clone(), config.team_id);

        Self {
            config,
            db,
            sessions,
            events,
            notices,
        }
    }

    /// Load the home dashboard as of now.
    pub async fn dashboard(&self) -> Result<HomeDashboard> {
        HomeDashboard::load(&self.config.team_name, &self.events, &self.notices, Utc::now()).await
    }

    /// Start an event detail visit for `event_id`.
    pub fn attendance(&self, event_id: Uuid) -> AttendanceReconciler {
        AttendanceReconciler::new(
            self.db.clone(),
            self.events.clone(),
            self.sessions.clone(),
            event_id,
        )
    }
}
