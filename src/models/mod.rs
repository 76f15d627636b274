// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendance;
pub mod event;
pub mod notice;
pub mod session;

pub use attendance::{AttendanceRecord, AttendanceStatus};
pub use event::{Event, EventKind};
pub use notice::Notice;
pub use session::Session;
