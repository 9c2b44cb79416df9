//! Per-window reminder checks.

use std::{collections::HashSet, fmt::Debug, sync::Arc, time::Duration};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Error, Note, NoteId, Repository, Result,
    repository::{NoteDelta, config::SchedulerConfig},
};

const NOTIFICATION_TITLE: &str = "Reminder";
const NOTIFICATION_ICON: &str = "appointment-soon";
const DUE_FORMAT: &str = "%Y-%m-%d %H:%M";
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// What happens to a recurring reminder once it has fired.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurrencePolicy {
    /// Recurrence is only descriptive, every stored reminder fires once
    #[default]
    MetadataOnly,
    /// Move the reminder to its next occurrence after it fires
    AdvanceOnFire,
}

#[derive(Debug, Clone, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct Notification {
    title: String,
    body: String,
    icon: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    fn reminder(note: &Note, due: DateTime<Utc>) -> Self {
        let due = due.with_timezone(&Local).format(DUE_FORMAT);
        Self::new(
            NOTIFICATION_TITLE,
            format!("{} - {due}", note.display_title()),
        )
        .with_icon(NOTIFICATION_ICON)
    }
}

/// Where reminder notifications go. Delivery is fire-and-forget.
pub trait NotificationSink: Send + Sync + Debug {
    fn notify(&self, notification: Notification);
}

/// Checks one window's mirror for due reminders.
///
/// The set of already notified notes lives only here, so every open window notifies once for the
/// same reminder and a restart notifies again.
#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    policy: RecurrencePolicy,
    notified: HashSet<NoteId>,
    sink: Arc<dyn NotificationSink>,
}

impl Scheduler {
    pub fn new(cfg: &SchedulerConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            interval: cfg.interval(),
            policy: cfg.recurrence,
            notified: HashSet::new(),
            sink,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> RecurrencePolicy {
        self.policy
    }

    pub fn is_notified(&self, id: &NoteId) -> bool {
        self.notified.contains(id)
    }

    /// Notify every due reminder in the mirror that this window has not notified yet. Returns the
    /// number of notifications sent.
    pub fn tick(&mut self, repo: &mut Repository) -> Result<usize> {
        let now = repo.now();
        let due: Vec<(NoteId, DateTime<Utc>)> = repo
            .notes()
            .iter()
            .filter(|note| !self.notified.contains(note.id()))
            .filter_map(|note| {
                note.reminder_at
                    .filter(|at| *at <= now)
                    .map(|at| (note.id().clone(), at))
            })
            .collect();

        for (id, at) in &due {
            let Some(note) = repo.get(id) else {
                continue;
            };

            self.notified.insert(id.clone());
            self.sink.notify(Notification::reminder(note, *at));
            info!("{} fired reminder for note {id}", repo.window());

            if self.policy == RecurrencePolicy::AdvanceOnFire {
                self.advance(repo, id, *at, now)?;
            }
        }

        Ok(due.len())
    }

    fn advance(
        &mut self,
        repo: &mut Repository,
        id: &NoteId,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(recurrence) = repo.get(id).and_then(|note| note.recurrence) else {
            return Ok(());
        };
        // Derived from the stored value, so windows advancing the same occurrence agree
        let Some(next) = recurrence.next_after(at, now) else {
            return Ok(());
        };

        if repo.update(id, NoteDelta::new().reminder_at(next))?.is_some() {
            self.notified.remove(id);
            debug!("Advanced {recurrence} reminder of note {id} to {next}");
        }

        Ok(())
    }
}

/// The soonest reminder strictly after `now`.
pub fn next_due(notes: &[Note], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    notes
        .iter()
        .filter_map(|note| note.reminder_at)
        .filter(|at| *at > now)
        .min()
}

/// Parse a reminder typed by the user.
///
/// Accepts RFC 3339, or `YYYY-MM-DD HH:MM[:SS]` (a `T` may separate date and time) read as local
/// time.
pub fn parse_reminder(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();
    let invalid = || Error::InvalidReminder(input.to_string());

    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.to_utc());
    }

    let normalized = input.replacen('T', " ", 1);
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&normalized, format).ok())
        .ok_or_else(invalid)?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|at| at.to_utc())
        .ok_or_else(invalid)
}
