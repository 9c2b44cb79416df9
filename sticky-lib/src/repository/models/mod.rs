//! Persisted data model.
//!
//! The whole collection is stored as one JSON array of [`Note`] records. Field names and
//! encodings stay compatible with data written by earlier versions of the board, so every field
//! that was added after the first release tolerates being absent or `null`.

mod note;
mod template;

pub use note::{Color, Note, NoteDelta, NoteId, Recurrence, VoiceNote};
pub use template::Template;

/// Namespaced key the collection is stored under.
pub const STORAGE_KEY: &str = "sticky-notes:v1";

/// Folder assigned to new notes.
pub const DEFAULT_FOLDER: &str = "default";

/// Title used wherever a note has none.
pub const UNTITLED: &str = "Untitled";
