use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    Result,
    broadcast::{Broadcaster, WindowId},
    clock::Clock,
    repository::store::StoreHandle,
    scheduler::parse_reminder,
};

pub mod config;
pub mod models;
pub mod store;

pub use models::{Color, Note, NoteDelta, NoteId, Recurrence, Template, VoiceNote};

/// One window's mirror of the note collection.
///
/// Every mutator works on the mirror, writes the *entire* mirror back to the
/// [`Store`](store::Store) and then signals the other windows. There is no merging: if another
/// window saved in the meantime and this mirror was not refreshed, that save is overwritten
/// (last writer wins). Operations on ids that are not in the mirror are silent no-ops, which
/// keeps windows racing on a deleted note harmless.
#[derive(Debug)]
pub struct Repository {
    window: WindowId,
    store: StoreHandle,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
    notes: Vec<Note>,
}

impl Repository {
    pub fn open(
        window: WindowId,
        store: StoreHandle,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let notes = store.load()?;

        Ok(Self {
            window,
            store,
            broadcaster,
            clock,
            notes,
        })
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The mirror, in stored order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id() == id)
    }

    /// Throw the mirror away and reload it from the store.
    pub fn refresh_from_store(&mut self) -> Result<()> {
        self.notes = self.store.load()?;
        debug!("{} reloaded {} notes", self.window, self.notes.len());
        Ok(())
    }

    // Single note operations

    pub fn create(&mut self, template: Template) -> Result<Note> {
        let note = Note::new(NoteId::generate(), template, Color::random(), self.now());
        self.insert(note)
    }

    /// Return the note with this id, creating a blank one bound to exactly that id if it does not
    /// exist yet.
    pub fn open_or_create(&mut self, id: &NoteId) -> Result<Note> {
        if let Some(note) = self.get(id) {
            return Ok(note.clone());
        }

        let note = Note::new(id.clone(), Template::Blank, Color::random(), self.now());
        info!("{} created note {id} on first open", self.window);
        self.insert(note)
    }

    /// Merge `delta` into the note and persist. Returns the updated note, or `None` when the id
    /// is unknown.
    pub fn update(&mut self, id: &NoteId, delta: NoteDelta) -> Result<Option<Note>> {
        let now = self.now();
        let mut notes = self.notes.clone();

        let Some(note) = notes.iter_mut().find(|n| n.id() == id) else {
            debug!("{} ignored update of missing note {id}", self.window);
            return Ok(None);
        };
        note.apply(delta)?;
        note.touch(now);
        let updated = note.clone();

        self.commit(notes)?;

        Ok(Some(updated))
    }

    /// Remove the note. Returns whether it was present.
    pub fn delete(&mut self, id: &NoteId) -> Result<bool> {
        Ok(self.delete_many(std::slice::from_ref(id))? == 1)
    }

    pub fn duplicate(&mut self, id: &NoteId) -> Result<Option<Note>> {
        let Some(source) = self.get(id) else {
            return Ok(None);
        };

        let copy = source.duplicate(NoteId::generate(), self.now());
        self.insert(copy).map(Some)
    }

    /// Set the reminder from user input. Empty input clears it; unparseable input is rejected
    /// without touching the note.
    pub fn set_reminder(
        &mut self,
        id: &NoteId,
        input: &str,
        recurrence: Option<Recurrence>,
    ) -> Result<Option<Note>> {
        if input.trim().is_empty() {
            return self.clear_reminder(id);
        }

        let at = parse_reminder(input)?;
        let recurrence = recurrence.filter(|r| *r != Recurrence::None);
        self.update(id, NoteDelta::new().reminder(Some(at), recurrence))
    }

    pub fn clear_reminder(&mut self, id: &NoteId) -> Result<Option<Note>> {
        self.update(id, NoteDelta::new().reminder(None, None))
    }

    /// Append a tag. Blank and already present tags leave the note untouched.
    pub fn add_tag(&mut self, id: &NoteId, tag: &str) -> Result<Option<Note>> {
        let tag = tag.trim();
        let Some(note) = self.get(id) else {
            return Ok(None);
        };
        if tag.is_empty() || note.tags.iter().any(|t| t == tag) {
            return Ok(Some(note.clone()));
        }

        let mut tags = note.tags.clone();
        tags.push(tag.to_string());
        self.update(id, NoteDelta::new().tags(tags))
    }

    pub fn remove_tag(&mut self, id: &NoteId, tag: &str) -> Result<Option<Note>> {
        let Some(note) = self.get(id) else {
            return Ok(None);
        };
        if !note.tags.iter().any(|t| t == tag) {
            return Ok(Some(note.clone()));
        }

        let tags = note.tags.iter().filter(|t| *t != tag).cloned().collect();
        self.update(id, NoteDelta::new().tags(tags))
    }

    pub fn set_folder(&mut self, id: &NoteId, folder: &str) -> Result<Option<Note>> {
        self.update(id, NoteDelta::new().folder(folder))
    }

    pub fn set_color(&mut self, id: &NoteId, color: Color) -> Result<Option<Note>> {
        self.update(id, NoteDelta::new().color(color))
    }

    pub fn toggle_pin(&mut self, id: &NoteId) -> Result<Option<Note>> {
        let Some(pinned) = self.get(id).map(|n| n.pinned) else {
            return Ok(None);
        };
        self.update(id, NoteDelta::new().pinned(!pinned))
    }

    pub fn add_voice_note(&mut self, id: &NoteId, voice_note: VoiceNote) -> Result<Option<Note>> {
        let Some(note) = self.get(id) else {
            return Ok(None);
        };

        let mut voice_notes = note.voice_notes.clone();
        voice_notes.push(voice_note);
        self.update(id, NoteDelta::new().voice_notes(voice_notes))
    }

    /// Remove the voice note at `index`. Out of range indices are ignored.
    pub fn remove_voice_note(&mut self, id: &NoteId, index: usize) -> Result<Option<Note>> {
        let Some(note) = self.get(id) else {
            return Ok(None);
        };
        if index >= note.voice_notes.len() {
            return Ok(Some(note.clone()));
        }

        let mut voice_notes = note.voice_notes.clone();
        voice_notes.remove(index);
        self.update(id, NoteDelta::new().voice_notes(voice_notes))
    }

    // Bulk operations, each a single write and a single broadcast

    /// Remove every listed note that exists. Returns how many were removed.
    pub fn delete_many(&mut self, ids: &[NoteId]) -> Result<usize> {
        let before = self.notes.len();
        let notes: Vec<Note> = self
            .notes
            .iter()
            .filter(|n| !ids.contains(n.id()))
            .cloned()
            .collect();
        let removed = before.saturating_sub(notes.len());

        if removed > 0 {
            self.commit(notes)?;
        }

        Ok(removed)
    }

    /// Add `tag` to every listed note. Returns how many notes changed.
    pub fn tag_many(&mut self, ids: &[NoteId], tag: &str) -> Result<usize> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(0);
        }

        self.update_many(ids, |note| {
            if note.tags.iter().any(|t| t == tag) {
                return None;
            }
            let mut tags = note.tags.clone();
            tags.push(tag.to_string());
            Some(NoteDelta::new().tags(tags))
        })
    }

    /// Move every listed note into `folder`. Returns how many notes changed.
    pub fn move_many(&mut self, ids: &[NoteId], folder: &str) -> Result<usize> {
        self.update_many(ids, |_| Some(NoteDelta::new().folder(folder)))
    }

    fn update_many<F>(&mut self, ids: &[NoteId], mut delta_for: F) -> Result<usize>
    where
        F: FnMut(&Note) -> Option<NoteDelta>,
    {
        let now = self.now();
        let mut notes = self.notes.clone();
        let mut changed = 0usize;

        for note in notes.iter_mut().filter(|n| ids.contains(n.id())) {
            if let Some(delta) = delta_for(note) {
                note.apply(delta)?;
                note.touch(now);
                changed = changed.saturating_add(1);
            }
        }

        if changed > 0 {
            self.commit(notes)?;
        }

        Ok(changed)
    }

    fn insert(&mut self, note: Note) -> Result<Note> {
        // Newest first
        let notes: Vec<Note> = std::iter::once(note.clone())
            .chain(self.notes.iter().cloned())
            .collect();

        self.commit(notes)?;
        debug!("{} added note {}", self.window, note.id());

        Ok(note)
    }

    /// Write the whole collection, adopt it as the mirror and tell the other windows.
    fn commit(&mut self, notes: Vec<Note>) -> Result<()> {
        self.store.save(&notes)?;
        self.notes = notes;
        self.broadcaster.notify_changed(self.window);

        Ok(())
    }

    #[cfg(test)]
    /// Return a mock [`Repository`] over an in-memory database that no other window shares.
    pub(crate) fn mock() -> Self {
        crate::testing::Fixture::new().repository()
    }
}
