//! Durable persistence of the whole note collection as a single serialized blob.
//!
//! A store has no policy: it loads and saves the full collection and nothing else. Missing or
//! malformed content is not an error, it loads as an empty collection. A record that cannot be
//! read is skipped and the rest of the collection survives.

use std::{fmt::Debug, io, sync::Arc};

use thiserror::Error;
use tracing::warn;

use crate::repository::{
    config::{CoreConfig, StoreBackend},
    models::Note,
};

mod db;
mod file;

pub use db::DbStore;
pub use file::FileStore;

pub type Result<T> = std::result::Result<T, Error>;

/// Shared handle to whichever [`Store`] backs the collection.
pub type StoreHandle = Arc<dyn Store>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Internal database error {0}")]
    Internal(#[from] agdb::DbError),
    #[error("Store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to replace the store file: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Failed to serialize notes: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Store path is not valid UTF-8")]
    InvalidPath,
}

pub trait Store: Send + Sync + Debug {
    /// Read the entire collection. Returns an empty collection when nothing has been saved yet
    /// or the saved blob cannot be understood.
    fn load(&self) -> Result<Vec<Note>>;

    /// Replace the entire collection. Callers never observe a partially written blob.
    fn save(&self, notes: &[Note]) -> Result<()>;
}

/// Open the store selected by the configuration.
pub fn open(cfg: &CoreConfig) -> crate::Result<StoreHandle> {
    let path = cfg.store_path()?;
    Ok(match cfg.store.backend {
        StoreBackend::Db => Arc::new(DbStore::open(&path)?),
        StoreBackend::File => Arc::new(FileStore::new(path)),
    })
}

pub(crate) fn encode(notes: &[Note]) -> Result<String> {
    Ok(serde_json::to_string(notes)?)
}

pub(crate) fn decode(raw: &str) -> Vec<Note> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("Stored notes are not valid JSON, starting empty: {err}");
            return Vec::new();
        }
    };

    let serde_json::Value::Array(records) = value else {
        warn!("Stored notes are not an array, starting empty");
        return Vec::new();
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(position, record)| match serde_json::from_value(record) {
            Ok(note) => Some(note),
            Err(err) => {
                warn!("Skipping unreadable stored note at position {position}: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Utc;
    use proptest::prelude::*;
    use tempfile::tempdir;

    use super::{DbStore, FileStore, Store, StoreHandle, decode, encode};
    use crate::{repository::models::Note, testing::arb_notes};

    #[test]
    fn test_decode_garbage_is_empty() {
        assert!(decode("").is_empty());
        assert!(decode("not json").is_empty());
        assert!(decode(r#"{"id":"a"}"#).is_empty());
        assert!(decode(r#"[{"title":"no id"}]"#).is_empty());
    }

    #[test]
    fn test_decode_skips_only_bad_records() {
        let now = Utc::now();
        let good = vec![Note::mock("a", now), Note::mock("b", now)];
        let raw = encode(&good).unwrap();
        let with_bad = raw.replacen(
            '[',
            r#"[{"id":"c","title":"no timestamps"},{"id":"d","createdAt":"soon","updatedAt":1},"#,
            1,
        );

        assert_eq!(decode(&with_bad), good);
    }

    #[test]
    fn test_encode_decode_is_identity_on_serialized_form() {
        let now = Utc::now();
        let mut b = Note::mock("b", now);
        b.tags = vec!["work".into()];
        let notes = vec![Note::mock("a", now), b, Note::mock("c", now)];

        let first = encode(&notes).unwrap();
        let second = encode(&decode(&first)).unwrap();

        assert_eq!(first, second);
        assert_eq!(decode(&second), notes);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Saving what was loaded leaves the serialized form unchanged, on both backends.
        #[test]
        fn prop_save_of_load_is_identity(notes in arb_notes(0..8)) {
            let dir = tempdir().unwrap();
            let stores: [StoreHandle; 2] = [
                Arc::new(DbStore::in_memory().unwrap()),
                Arc::new(FileStore::new(dir.path().join("notes.json"))),
            ];

            for store in stores {
                store.save(&notes).unwrap();
                let loaded = store.load().unwrap();
                store.save(&loaded).unwrap();

                prop_assert_eq!(&loaded, &notes);
                prop_assert_eq!(
                    encode(&store.load().unwrap()).unwrap(),
                    encode(&notes).unwrap()
                );
            }
        }
    }
}
