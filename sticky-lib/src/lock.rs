//! Password gate in front of a note's content.
//!
//! Locking stores a password with the note; unlocking with the same password removes both the
//! flag and the password. A wrong password changes nothing and fails with
//! [`Error::IncorrectPassword`], a canceled prompt changes nothing and is not an error.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Error, Note, NoteId, Repository, Result,
    repository::{NoteDelta, config::LockConfig},
};

const UNLOCK_PROMPT: &str = "Enter password to unlock:";
const LOCK_PROMPT: &str = "Set a password to lock this note:";
const VIEW_PROMPT: &str = "Enter password to view this note:";

/// How the lock password is kept in the store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PasswordStorage {
    /// As typed. Readable by anyone with access to the store
    Plaintext,
    /// Salted Argon2id hash in PHC string format
    #[default]
    Argon2,
}

/// Asks the user for a line of text.
pub trait Prompt {
    /// `None` means the user canceled.
    fn ask(&mut self, message: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Locked,
    Unlocked,
    Canceled,
}

#[derive(Debug, Clone)]
pub struct LockGuard {
    storage: PasswordStorage,
    params: Params,
}

impl LockGuard {
    pub fn new(cfg: &LockConfig) -> Result<Self> {
        let params = Params::new(cfg.argon2_memory_kib, cfg.argon2_iterations, 1, None)
            .map_err(argon2::password_hash::Error::from)?;

        Ok(Self {
            storage: cfg.password_storage,
            params,
        })
    }

    /// Lock the note with `password`. Surrounding whitespace is dropped and a blank password
    /// cancels. A note that is already locked keeps its current password.
    pub fn lock(&self, repo: &mut Repository, id: &NoteId, password: &str) -> Result<LockOutcome> {
        let password = password.trim();
        let Some(note) = repo.get(id) else {
            return Ok(LockOutcome::Canceled);
        };
        if note.locked() {
            return Ok(LockOutcome::Locked);
        }
        if password.is_empty() {
            return Ok(LockOutcome::Canceled);
        }

        let sealed = self.seal(password)?;
        repo.update(id, NoteDelta::new().lock(sealed))?;
        info!("Locked note {id}");

        Ok(LockOutcome::Locked)
    }

    /// Unlock the note if `password` matches exactly.
    pub fn unlock(
        &self,
        repo: &mut Repository,
        id: &NoteId,
        password: &str,
    ) -> Result<LockOutcome> {
        let Some(note) = repo.get(id) else {
            return Ok(LockOutcome::Canceled);
        };
        if !note.locked() {
            return Ok(LockOutcome::Unlocked);
        }
        if !Self::verify(note, password) {
            debug!("Rejected password for note {id}");
            return Err(Error::IncorrectPassword);
        }

        repo.update(id, NoteDelta::new().unlock())?;
        info!("Unlocked note {id}");

        Ok(LockOutcome::Unlocked)
    }

    /// Unlock a locked note or lock an unlocked one, asking `prompt` for the password.
    pub fn toggle(
        &self,
        repo: &mut Repository,
        id: &NoteId,
        prompt: &mut dyn Prompt,
    ) -> Result<LockOutcome> {
        let Some(locked) = repo.get(id).map(Note::locked) else {
            return Ok(LockOutcome::Canceled);
        };

        let message = if locked { UNLOCK_PROMPT } else { LOCK_PROMPT };
        let Some(answer) = prompt.ask(message) else {
            return Ok(LockOutcome::Canceled);
        };

        if locked {
            self.unlock(repo, id, &answer)
        } else {
            self.lock(repo, id, &answer)
        }
    }

    /// The note, if it is unlocked or the user presents its password. `None` when the note does
    /// not exist or the prompt was canceled.
    pub fn reveal(
        &self,
        repo: &Repository,
        id: &NoteId,
        prompt: &mut dyn Prompt,
    ) -> Result<Option<Note>> {
        let Some(note) = repo.get(id) else {
            return Ok(None);
        };
        if !note.locked() {
            return Ok(Some(note.clone()));
        }

        let Some(answer) = prompt.ask(VIEW_PROMPT) else {
            return Ok(None);
        };
        if !Self::verify(note, &answer) {
            return Err(Error::IncorrectPassword);
        }

        Ok(Some(note.clone()))
    }

    /// Whether `presented` matches the note's password, in either stored form.
    pub fn verify(note: &Note, presented: &str) -> bool {
        let Some(stored) = note.password() else {
            return false;
        };

        match PasswordHash::new(stored) {
            Ok(hash) => Argon2::default()
                .verify_password(presented.as_bytes(), &hash)
                .is_ok(),
            Err(_) => stored == presented,
        }
    }

    fn seal(&self, password: &str) -> Result<String> {
        match self.storage {
            PasswordStorage::Plaintext => Ok(password.to_string()),
            PasswordStorage::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
                Ok(argon2.hash_password(password.as_bytes(), &salt)?.to_string())
            }
        }
    }
}
