//! Shared fixtures for unit tests.

use std::{
    collections::VecDeque,
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use proptest::{collection, option, prelude::*, sample};
use strum::IntoEnumIterator;

use crate::{
    Repository,
    broadcast::{LocalBroadcaster, WindowId},
    capture::{AudioCapture, CaptureError, Recording},
    clock::{Clock, ManualClock},
    lock::Prompt,
    repository::{Color, Note, NoteDelta, Recurrence, store::DbStore},
    scheduler::{Notification, NotificationSink},
};

/// One store, one broadcast hub and one frozen clock shared by any number of windows.
#[derive(Debug)]
pub(crate) struct Fixture {
    pub store: Arc<DbStore>,
    pub hub: LocalBroadcaster,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(DbStore::in_memory().unwrap()),
            hub: LocalBroadcaster::default(),
            clock: Arc::new(ManualClock::new(
                Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            )),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A repository for a new window over the shared store.
    pub fn repository(&self) -> Repository {
        Repository::open(
            WindowId::next(),
            self.store.clone(),
            Arc::new(self.hub.clone()),
            self.clock.clone(),
        )
        .unwrap()
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}

/// Answers prompts from a fixed script and remembers what was asked.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompt {
    answers: VecDeque<Option<String>>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<'a>(answers: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self {
            answers: answers
                .into_iter()
                .map(|answer| answer.map(str::to_string))
                .collect(),
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, message: &str) -> Option<String> {
        self.asked.push(message.to_string());
        self.answers.pop_front().flatten()
    }
}

#[derive(Debug)]
pub(crate) struct FakeMicrophone {
    clip: Option<Vec<u8>>,
    recording: bool,
    discarded: Arc<AtomicBool>,
}

impl FakeMicrophone {
    pub fn with_clip(clip: Vec<u8>) -> Self {
        Self {
            clip: Some(clip),
            recording: false,
            discarded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A device the user refused access to.
    pub fn denied() -> Self {
        Self {
            clip: None,
            ..Self::with_clip(Vec::new())
        }
    }

    pub fn discarded(&self) -> Arc<AtomicBool> {
        self.discarded.clone()
    }
}

impl AudioCapture for FakeMicrophone {
    fn start(&mut self) -> Result<(), CaptureError> {
        if self.clip.is_none() {
            return Err(CaptureError::Denied("permission refused".into()));
        }
        self.recording = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<Recording, CaptureError> {
        if !self.recording {
            return Err(CaptureError::NotRecording);
        }
        self.recording = false;
        Ok(Recording::new(
            self.clip.clone().unwrap_or_default(),
            "audio/webm",
        ))
    }

    fn discard(&mut self) {
        self.recording = false;
        self.discarded.store(true, Ordering::SeqCst);
    }
}

// Strategies for property tests

/// Any instant between 1970 and 2096, at millisecond precision like the stored form.
pub(crate) fn arb_time() -> impl Strategy<Value = DateTime<Utc>> {
    (0_i64..4_000_000_000_000).prop_map(|ms| DateTime::<Utc>::from_timestamp_millis(ms).unwrap())
}

pub(crate) fn arb_color() -> impl Strategy<Value = Color> {
    sample::select(Color::iter().collect::<Vec<_>>())
}

pub(crate) fn arb_tags() -> impl Strategy<Value = Vec<String>> {
    collection::vec("[a-zA-Z]{1,6}", 0..4)
}

/// A note with this id and arbitrary user editable fields.
pub(crate) fn arb_note(id: String) -> impl Strategy<Value = Note> {
    let text = ("\\PC{0,16}", "\\PC{0,32}", arb_color(), any::<bool>());
    let filing = ("[a-z]{0,8}", arb_tags());
    let reminder = (
        option::of(arb_time()),
        option::of(sample::select(Recurrence::iter().collect::<Vec<_>>())),
    );
    let stamps = (arb_time(), 0_i64..1_000_000_000);

    (text, filing, reminder, stamps).prop_map(move |(text, filing, reminder, stamps)| {
        let (created, edited_after) = stamps;
        let mut note = Note::mock(&id, created);
        (note.title, note.content, note.color, note.pinned) = text;
        (note.folder, note.tags) = filing;
        (note.reminder_at, note.recurrence) = reminder;
        note.touch(created + TimeDelta::milliseconds(edited_after));
        note
    })
}

/// A collection with distinct ids `note-0`, `note-1`, and so on.
pub(crate) fn arb_notes(len: Range<usize>) -> impl Strategy<Value = Vec<Note>> {
    len.prop_flat_map(|len| {
        (0..len)
            .map(|i| arb_note(format!("note-{i}")))
            .collect::<Vec<_>>()
    })
}

/// Any delta over the fields a user edits directly. Lock state goes through the lock guard.
pub(crate) fn arb_delta() -> impl Strategy<Value = NoteDelta> {
    (
        option::of("\\PC{0,16}"),
        option::of("\\PC{0,32}"),
        option::of(arb_color()),
        option::of(any::<bool>()),
        option::of("[a-z]{0,8}"),
        option::of(arb_tags()),
        option::of(option::of(arb_time())),
    )
        .prop_map(
            |(title, content, color, pinned, folder, tags, reminder_at)| NoteDelta {
                title,
                content,
                color,
                pinned,
                folder,
                tags,
                reminder_at,
                ..NoteDelta::default()
            },
        )
}
