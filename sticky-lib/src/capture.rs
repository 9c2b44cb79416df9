//! Voice note recording.

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{Note, NoteId, Repository, Result, repository::VoiceNote};

/// Encoded bytes per second assumed when estimating a clip's length.
const BYTES_PER_SECOND: usize = 16_000;
const HALF_SECOND: usize = 8_000;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Microphone access denied: {0}")]
    Denied(String),
    #[error("No recording in progress")]
    NotRecording,
    #[error("Audio device failed: {0}")]
    Device(String),
}

/// One finished clip as delivered by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    bytes: Vec<u8>,
    mime: String,
}

impl Recording {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Length in whole seconds, rounded to the nearest.
    pub fn duration_estimate(&self) -> u32 {
        let seconds = self
            .bytes
            .len()
            .saturating_add(HALF_SECOND)
            .checked_div(BYTES_PER_SECOND)
            .unwrap_or_default();
        u32::try_from(seconds).unwrap_or(u32::MAX)
    }

    pub fn into_voice_note(self) -> VoiceNote {
        let duration = self.duration_estimate();
        VoiceNote {
            data: format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes)),
            duration,
        }
    }
}

/// The platform microphone.
pub trait AudioCapture {
    fn start(&mut self) -> std::result::Result<(), CaptureError>;

    fn stop(&mut self) -> std::result::Result<Recording, CaptureError>;

    /// Stop without producing anything.
    fn discard(&mut self);
}

/// Records at most one clip at a time and attaches it to a note when stopped.
///
/// Dropping the recorder while it records throws the clip away.
#[derive(Debug)]
pub struct VoiceRecorder<C: AudioCapture> {
    device: C,
    target: Option<NoteId>,
}

impl<C: AudioCapture> VoiceRecorder<C> {
    pub fn new(device: C) -> Self {
        Self {
            device,
            target: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.target.is_some()
    }

    /// The note the running recording belongs to.
    pub fn target(&self) -> Option<&NoteId> {
        self.target.as_ref()
    }

    /// Start recording for `id`. A recording already running for another note is discarded.
    pub fn start(&mut self, id: &NoteId) -> Result<()> {
        self.abandon();
        self.device.start()?;
        self.target = Some(id.clone());
        debug!("Recording voice note for {id}");
        Ok(())
    }

    /// Finish the recording and append it to its note. Returns the updated note, or `None` if
    /// the note was deleted meanwhile.
    pub fn stop(&mut self, repo: &mut Repository) -> Result<Option<Note>> {
        let id = self.target.take().ok_or(CaptureError::NotRecording)?;
        let recording = self.device.stop()?;

        let voice_note = recording.into_voice_note();
        debug!("Recorded {}s voice note for {id}", voice_note.duration);
        repo.add_voice_note(&id, voice_note)
    }

    /// Start when idle, stop and attach when recording.
    pub fn toggle(&mut self, repo: &mut Repository, id: &NoteId) -> Result<Option<Note>> {
        if self.is_recording() {
            self.stop(repo)
        } else {
            self.start(id)?;
            Ok(None)
        }
    }

    /// Drop the running recording, if any, without persisting anything.
    pub fn abandon(&mut self) {
        if let Some(id) = self.target.take() {
            warn!("Discarded unfinished voice note for {id}");
            self.device.discard();
        }
    }
}

impl<C: AudioCapture> Drop for VoiceRecorder<C> {
    fn drop(&mut self) {
        self.abandon();
    }
}
