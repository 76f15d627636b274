// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - client logic layer.

pub mod attendance;
pub mod dashboard;
pub mod events;
pub mod gotrue;
pub mod identity;
pub mod notices;
pub mod session;

pub use attendance::{AttendanceReconciler, AttendanceState, AttendanceView};
pub use dashboard::HomeDashboard;
pub use events::{EventDirectory, NextEvent};
pub use gotrue::{GoTrueAuth, SessionStore};
pub use identity::{IdentityProvider, MockIdentity};
pub use notices::NoticeFeed;
pub use session::{SessionTracker, Subscription};
