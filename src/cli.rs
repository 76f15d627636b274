// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Command-line surface over the club client.

use peach_fc::models::{AttendanceStatus, Event};
use peach_fc::services::{AttendanceView, NextEvent};
use peach_fc::time_utils::format_event_window;
use peach_fc::Club;
use serde::Serialize;
use uuid::Uuid;

/// Club app for PEACH FC members
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Json output
    #[clap(long, global = true)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Email a login link
    Login { email: String },

    /// Finish login with the redirect URL from the emailed link
    Complete { redirect_url: String },

    /// Next event and latest notice
    Home,

    /// The team's schedule
    Events,

    /// One event with your RSVP
    Event { id: Uuid },

    /// Answer yes, no or maybe for an event
    Rsvp {
        id: Uuid,
        status: AttendanceStatus,
        /// Replace your comment
        #[clap(long)]
        comment: Option<String>,
    },

    /// Show who is signed in
    Whoami,

    /// Sign out of this device
    SignOut,
}

#[derive(Serialize)]
struct EventDetailOutput<'a> {
    event: &'a Event,
    attendance: Option<AttendanceView>,
    can_edit: bool,
}

#[derive(Serialize)]
struct ProfileOutput<'a> {
    team_name: &'a str,
    user_id: Option<Uuid>,
    email: Option<&'a str>,
}

impl Cli {
    pub async fn invoke(&self, club: &Club) -> anyhow::Result<()> {
        match &self.command {
            Commands::Login { email } => {
                club.sessions.request_login_link(email).await?;
                println!("Login link sent to {}. Check your email.", email.trim());
            }
            Commands::Complete { redirect_url } => {
                let session = club.sessions.complete_login(redirect_url).await?;
                println!(
                    "Signed in as {}",
                    session.email.as_deref().unwrap_or("(no email)")
                );
            }
            Commands::Home => {
                let dashboard = club.dashboard().await?;
                if self.json {
                    return print_json(&dashboard);
                }
                println!("{}", dashboard.team_name);
                if let Some(notice) = &dashboard.notice {
                    println!("📢 {}", notice.content);
                }
                match &dashboard.next_event {
                    NextEvent::Upcoming(event) => println!("Next: {}", describe(event)),
                    NextEvent::NoneScheduled => println!("No upcoming events."),
                }
            }
            Commands::Events => {
                let events = club.events.list_upcoming().await?;
                if self.json {
                    return print_json(&events);
                }
                if events.is_empty() {
                    println!("No events scheduled.");
                }
                for event in &events {
                    println!("{}  {}", event.id, describe(event));
                }
            }
            Commands::Event { id } => {
                let mut visit = club.attendance(*id);
                visit.load().await?;
                let output = EventDetailOutput {
                    event: visit.event().ok_or_else(|| anyhow::anyhow!("event not loaded"))?,
                    attendance: visit.state().displayed(),
                    can_edit: visit.can_edit(),
                };
                if self.json {
                    return print_json(&output);
                }
                println!("{}", describe(output.event));
                if let Some(note) = &output.event.note {
                    println!("{}", note);
                }
                match (output.can_edit, output.attendance) {
                    (false, _) => println!("Sign in to answer."),
                    (true, Some(AttendanceView::Recorded(status))) => {
                        println!("Your answer: {}", status)
                    }
                    (true, _) => println!("You have not answered yet."),
                }
            }
            Commands::Rsvp {
                id,
                status,
                comment,
            } => {
                let mut visit = club.attendance(*id);
                visit.load().await?;
                let stored = visit.submit(*status, comment.clone()).await?;
                println!("Recorded: {}", stored);
            }
            Commands::Whoami => {
                let session = club.sessions.current_session();
                let output = ProfileOutput {
                    team_name: &club.config.team_name,
                    user_id: session.as_ref().map(|s| s.user_id),
                    email: session.as_ref().and_then(|s| s.email.as_deref()),
                };
                if self.json {
                    return print_json(&output);
                }
                match output.user_id {
                    Some(_) => println!(
                        "{} · {}",
                        output.email.unwrap_or("(no email)"),
                        output.team_name
                    ),
                    None => println!("Not signed in."),
                }
            }
            Commands::SignOut => {
                club.sessions.sign_out().await;
                println!("Signed out.");
            }
        }
        Ok(())
    }
}

fn describe(event: &Event) -> String {
    let mut line = format!(
        "[{}] {} · {}",
        event.kind,
        event.title,
        format_event_window(event.start_at, event.end_at)
    );
    if let Some(place) = &event.place {
        line.push_str(" @ ");
        line.push_str(place);
    }
    line
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
