use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::repository::{
    models::Note,
    store::{Result, Store, decode, encode},
};

/// A [`Store`] kept in a plain JSON file.
///
/// Every save writes a sibling temporary file and renames it over the target, so separate
/// processes only ever read a complete collection.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for FileStore {
    fn load(&self) -> Result<Vec<Note>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(decode(&raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) if err.kind() == ErrorKind::InvalidData => {
                warn!("Store file {} is not UTF-8, starting empty", self.path.display());
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, notes: &[Note]) -> Result<()> {
        let blob = encode(notes)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(blob.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;

        debug!("Saved {} notes to {}", notes.len(), self.path.display());

        Ok(())
    }
}
