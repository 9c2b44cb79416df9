//! Core of the Sticky Notes board.
//!
//! Several windows (the board and any number of pop-out notes) share one note collection kept
//! in a local [`Store`](repository::store::Store). Each window owns a [`Repository`] mirror of
//! that collection, tells its siblings about changes through a
//! [`Broadcaster`](broadcast::Broadcaster), and runs its own reminder
//! [`Scheduler`](scheduler::Scheduler).

use thiserror::Error;

pub mod broadcast;
pub mod capture;
pub mod clock;
pub mod fs;
pub mod lock;
pub mod query;
pub mod repository;
pub mod scheduler;
pub mod window;

#[cfg(test)]
mod testing;

pub use repository::{Note, NoteId, Repository};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] repository::store::Error),
    #[error(transparent)]
    Config(#[from] repository::config::Error),
    #[error(transparent)]
    Capture(#[from] capture::CaptureError),
    #[error("Invalid reminder date: {0:?}")]
    InvalidReminder(String),
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error("A locked note needs a non-empty password")]
    InvalidDelta,
    #[error("Password hashing failed: {0}")]
    Hash(#[from] argon2::password_hash::Error),
}
