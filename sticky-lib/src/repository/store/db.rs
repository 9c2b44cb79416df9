use std::{path::Path, sync::Arc};

use agdb::{DbAny, DbError, QueryBuilder};
use derive_more::Deref;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::repository::{
    models::{Note, STORAGE_KEY},
    store::{Error, Result, Store, decode, encode},
};

/// Alias of the node that carries the collection blob.
const STORE_NODE: &str = "store";

/// A [`Store`] kept in an embedded agdb database.
///
/// Cloning the handle shares the same open database, which is how several windows in one process
/// see each other's writes. Separate handles on one file, as separate processes would open, are
/// not coordinated; use [`FileStore`](super::FileStore) for those.
#[derive(Debug, Clone, Deref)]
pub struct DbStore {
    #[deref]
    db: Arc<RwLock<DbAny>>,
}

impl DbStore {
    pub fn open(path: &Path) -> Result<Self> {
        let path_str = path.to_str().ok_or(Error::InvalidPath)?;

        let store = Self {
            db: Arc::new(RwLock::new(DbAny::new_file(path_str)?)),
        };

        store.init()?;

        debug!("Opened note database at {path_str}");

        Ok(store)
    }

    /// Create a memory backed database, mostly for use in tests
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            db: Arc::new(RwLock::new(DbAny::new_memory("sticky-notes")?)),
        };

        store.init()?;

        Ok(store)
    }

    fn init(&self) -> Result<()> {
        let alias_count = self
            .db
            .read()
            .exec(QueryBuilder::select().aliases().query())?
            .result;

        if alias_count == 0 {
            self.db.write().transaction_mut(|t| -> std::result::Result<(), DbError> {
                t.exec_mut(QueryBuilder::insert().nodes().aliases([STORE_NODE]).query())?;

                // Start with an empty collection so reads never miss the key
                t.exec_mut(
                    QueryBuilder::insert()
                        .values([[(STORAGE_KEY, "[]").into()]])
                        .ids(STORE_NODE)
                        .query(),
                )?;

                Ok(())
            })?;
        }

        Ok(())
    }
}

impl Store for DbStore {
    fn load(&self) -> Result<Vec<Note>> {
        let result = self.db.read().exec(
            QueryBuilder::select()
                .values(STORAGE_KEY)
                .ids(STORE_NODE)
                .query(),
        );

        let value = match result {
            Ok(result) => result
                .elements
                .into_iter()
                .next()
                .and_then(|element| element.values.into_iter().next())
                .map(|kv| kv.value),
            Err(err) => {
                warn!("Stored notes are unreadable, starting empty: {err}");
                return Ok(Vec::new());
            }
        };

        Ok(match value.map(String::try_from) {
            Some(Ok(raw)) => decode(&raw),
            Some(Err(_)) | None => Vec::new(),
        })
    }

    fn save(&self, notes: &[Note]) -> Result<()> {
        let blob = encode(notes)?;

        self.db.write().exec_mut(
            QueryBuilder::insert()
                .values([[(STORAGE_KEY, blob).into()]])
                .ids(STORE_NODE)
                .query(),
        )?;

        Ok(())
    }
}
