use std::collections::HashSet;

use chrono::{DateTime, Months, TimeDelta, Utc, serde::ts_milliseconds, serde::ts_milliseconds_option};
use clap::ValueEnum;
use derive_more::{Deref, Display, From};
use getset::{CopyGetters, Getters};
use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use uuid::Uuid;

use crate::{
    Error,
    repository::models::{DEFAULT_FOLDER, Template, UNTITLED},
};

/// Opaque, immutable identifier of a [`Note`].
///
/// Notes created here get a random UUID, but any string read back from the store is accepted
/// verbatim.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Deref,
)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The fixed note palette. Stored as the hex code of the color.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    ValueEnum,
)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum Color {
    #[default]
    #[strum(serialize = "#f5b81b")]
    Amber,
    #[strum(serialize = "#1ad1a5")]
    Mint,
    #[strum(serialize = "#38bdf8")]
    Sky,
    #[strum(serialize = "#f472b6")]
    Pink,
    #[strum(serialize = "#fb7185")]
    Rose,
    #[strum(serialize = "#a3e635")]
    Lime,
    #[strum(serialize = "#f97316")]
    Orange,
}

impl Color {
    /// Pick a palette entry uniformly at random.
    pub fn random() -> Self {
        let palette: Vec<Color> = Color::iter().collect();
        palette
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default()
    }

    pub fn hex(&self) -> &'static str {
        (*self).into()
    }
}

// Colors outside the palette are coerced instead of failing the whole load.
impl From<String> for Color {
    fn from(value: String) -> Self {
        value.trim().parse().unwrap_or_default()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.hex().to_string()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    EnumString,
    EnumIter,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    /// The occurrence `n` periods after `from`. Monthly steps are computed from `from` directly
    /// so a reminder on the 31st returns to the 31st whenever the month has one.
    pub fn nth(self, from: DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        match self {
            Recurrence::None => None,
            Recurrence::Daily => from.checked_add_signed(TimeDelta::try_days(i64::from(n))?),
            Recurrence::Weekly => from.checked_add_signed(TimeDelta::try_weeks(i64::from(n))?),
            Recurrence::Monthly => from.checked_add_months(Months::new(n)),
        }
    }

    /// The first occurrence after `now`, stepping forward from the stored `from`.
    pub fn next_after(self, from: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut n: u32 = 1;
        loop {
            let next = self.nth(from, n)?;
            if next > now {
                return Some(next);
            }
            n = n.checked_add(1)?;
        }
    }
}

/// A recorded voice clip attached to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceNote {
    /// `data:` URL holding the encoded audio.
    pub data: String,
    /// Estimated length in seconds.
    #[serde(default)]
    pub duration: u32,
}

/// A single sticky note.
///
/// Instances handed out by a [`Repository`](crate::Repository) are copies: changing a field here
/// changes nothing until it is written back through
/// [`Repository::update`](crate::Repository::update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, CopyGetters)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[getset(get = "pub")]
    id: NoteId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default)]
    pub color: Color,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pinned: bool,
    #[serde(default = "default_folder", deserialize_with = "folder_or_default")]
    pub folder: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    #[getset(get_copy = "pub")]
    locked: bool,
    #[serde(default)]
    password: Option<String>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub reminder_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "recurrence_or_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub voice_notes: Vec<VoiceNote>,
    #[serde(with = "ts_milliseconds")]
    #[getset(get_copy = "pub")]
    created_at: DateTime<Utc>,
    #[serde(with = "ts_milliseconds")]
    #[getset(get_copy = "pub")]
    updated_at: DateTime<Utc>,
}

impl Note {
    pub(crate) fn new(id: NoteId, template: Template, color: Color, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: template.title().to_string(),
            content: template.content().to_string(),
            color,
            pinned: false,
            folder: DEFAULT_FOLDER.to_string(),
            tags: Vec::new(),
            locked: false,
            password: None,
            reminder_at: None,
            recurrence: None,
            voice_notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A copy of this note under a new id, with fresh timestamps and a marked title.
    pub(crate) fn duplicate(&self, id: NoteId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: format!("{} (copy)", self.display_title()),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// The title, or a placeholder when it is empty.
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED
        } else {
            &self.title
        }
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Merge `delta` into this note. Nothing changes if the result would break the
    /// locked-implies-password invariant.
    pub(crate) fn apply(&mut self, delta: NoteDelta) -> crate::Result<()> {
        let locked = delta.locked.unwrap_or(self.locked);
        let password = match &delta.password {
            Some(password) => password.as_deref(),
            None => self.password.as_deref(),
        };
        if locked && password.is_none_or(str::is_empty) {
            return Err(Error::InvalidDelta);
        }

        let NoteDelta {
            title,
            content,
            color,
            pinned,
            folder,
            tags,
            locked,
            password,
            reminder_at,
            recurrence,
            voice_notes,
        } = delta;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(content) = content {
            self.content = content;
        }
        if let Some(color) = color {
            self.color = color;
        }
        if let Some(pinned) = pinned {
            self.pinned = pinned;
        }
        if let Some(folder) = folder {
            self.folder = folder;
        }
        if let Some(tags) = tags {
            self.tags = dedup_tags(tags);
        }
        if let Some(locked) = locked {
            self.locked = locked;
        }
        if let Some(password) = password {
            self.password = password;
        }
        if let Some(reminder_at) = reminder_at {
            self.reminder_at = reminder_at;
        }
        if let Some(recurrence) = recurrence {
            self.recurrence = recurrence;
        }
        if let Some(voice_notes) = voice_notes {
            self.voice_notes = voice_notes;
        }

        Ok(())
    }

    /// Stamp `updated_at`, never moving it backwards or leaving it unchanged.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self
            .updated_at
            .checked_add_signed(TimeDelta::milliseconds(1))
            .unwrap_or(self.updated_at);
        self.updated_at = now.max(floor);
    }

    #[cfg(test)]
    pub(crate) fn mock(id: &str, now: DateTime<Utc>) -> Self {
        Self::new(NoteId::from(id), Template::Blank, Color::default(), now)
    }
}

/// A partial update of a [`Note`]. Unset fields are left as they are.
///
/// Fields that can be cleared are doubly optional: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDelta {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<Color>,
    pub pinned: Option<bool>,
    pub folder: Option<String>,
    pub tags: Option<Vec<String>>,
    pub(crate) locked: Option<bool>,
    pub(crate) password: Option<Option<String>>,
    pub reminder_at: Option<Option<DateTime<Utc>>>,
    pub recurrence: Option<Option<Recurrence>>,
    pub voice_notes: Option<Vec<VoiceNote>>,
}

impl NoteDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn reminder(mut self, at: Option<DateTime<Utc>>, recurrence: Option<Recurrence>) -> Self {
        self.reminder_at = Some(at);
        self.recurrence = Some(recurrence);
        self
    }

    pub fn reminder_at(mut self, at: DateTime<Utc>) -> Self {
        self.reminder_at = Some(Some(at));
        self
    }

    pub fn voice_notes(mut self, voice_notes: Vec<VoiceNote>) -> Self {
        self.voice_notes = Some(voice_notes);
        self
    }

    pub(crate) fn lock(mut self, password: String) -> Self {
        self.locked = Some(true);
        self.password = Some(Some(password));
        self
    }

    pub(crate) fn unlock(mut self) -> Self {
        self.locked = Some(false);
        self.password = Some(None);
        self
    }
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

fn default_folder() -> String {
    DEFAULT_FOLDER.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn folder_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_folder))
}

// Older data stores "" for no recurrence; unknown values are dropped rather than failing the load.
fn recurrence_or_none<'de, D>(deserializer: D) -> Result<Option<Recurrence>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| value.trim().parse().ok()))
}
