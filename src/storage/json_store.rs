//! Single-file JSON document store.
//!
//! The whole store is held in memory and rewritten on every insert. Writes go
//! to a fresh temp file in the store's directory that is then renamed over
//! the store, so a crash mid-write leaves the previous contents intact.
//!
//! An open store holds an exclusive lock on `<store>.lock` until it is
//! dropped. A second open of the same path fails instead of overwriting the
//! first run's documents from a stale snapshot.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions, TryLockError};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use crate::error::{AppError, Result};
use crate::models::Document;
use crate::storage::{DEFAULT_COLLECTION, DocId, DocumentStore};

/// Documents of one collection keyed by id.
pub type Collection = BTreeMap<DocId, Document>;

#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    collections: BTreeMap<String, Collection>,
    current: String,
    _lock: File,
}

fn store_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Take the exclusive lock guarding `path`, failing fast when it is held.
fn acquire_lock(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(lock_path(path))?;

    match file.try_lock() {
        Ok(()) => Ok(file),
        Err(TryLockError::WouldBlock) => Err(AppError::Io(io::Error::new(
            io::ErrorKind::WouldBlock,
            format!("document store {} is in use by another run", path.display()),
        ))),
        Err(TryLockError::Error(e)) => Err(AppError::Io(e)),
    }
}

async fn read_collections(path: &Path) -> Result<BTreeMap<String, Collection>> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Documents of `collection` read straight from the store file, without
/// creating or locking it. A missing file reads as an empty collection.
pub async fn read_collection(path: &Path, collection: &str) -> Result<Collection> {
    Ok(read_collections(path)
        .await?
        .remove(collection)
        .unwrap_or_default())
}

impl JsonStore {
    /// Open the store at `path` for exclusive use, creating the file (and
    /// its directory) when it does not exist yet.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        tokio::fs::create_dir_all(store_dir(&path)).await?;

        let lock = acquire_lock(&path)?;
        let collections = read_collections(&path).await?;

        let store = Self {
            path,
            collections,
            current: DEFAULT_COLLECTION.to_string(),
            _lock: lock,
        };
        if !store.path.exists() {
            store.persist()?;
        }

        info!(
            collections = store.collections.len(),
            documents = store.collections.values().map(BTreeMap::len).sum::<usize>(),
            "Opened document store"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All documents of a collection in id order.
    pub fn all(&self, collection: &str) -> Vec<(DocId, &Document)> {
        self.collections
            .get(collection)
            .map(|c| c.iter().map(|(id, doc)| (*id, doc)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, BTreeMap::len)
    }

    /// Names of every collection holding at least one document.
    pub fn collections(&self) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Name of the collection [`JsonStore::insert`] writes to.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn collection(&self) -> &str {
        &self.current
    }

    /// Select the collection for subsequent [`JsonStore::insert`] calls.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn set_collection(&mut self, name: impl Into<String>) {
        self.current = name.into();
    }

    /// Append `document` to the current collection.
    #[cfg_attr(not(test), allow(dead_code))]
    pub async fn insert(&mut self, document: Document) -> Result<DocId> {
        let collection = self.current.clone();
        self.insert_into(&collection, document).await
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn get(&self, collection: &str, id: DocId) -> Option<&Document> {
        self.collections.get(collection)?.get(&id)
    }

    /// Documents of a collection matching `predicate`, in id order.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn search<F>(&self, collection: &str, predicate: F) -> Vec<(DocId, &Document)>
    where
        F: Fn(&Document) -> bool,
    {
        self.all(collection)
            .into_iter()
            .filter(|(_, doc)| predicate(*doc))
            .collect()
    }

    /// Write the whole store atomically (temp file, then rename).
    fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.collections)?;

        let mut tmp = NamedTempFile::new_in(store_dir(&self.path))?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(bytes = bytes.len(), "Persisted document store");
        Ok(())
    }
}

impl DocumentStore for JsonStore {
    #[instrument(level = "info", skip(self, document))]
    async fn insert_into(&mut self, collection: &str, document: Document) -> Result<DocId> {
        let docs = self.collections.entry(collection.to_string()).or_default();
        let id = docs.keys().next_back().map_or(1, |last| last + 1);
        docs.insert(id, document);

        if let Err(e) = self.persist() {
            if let Some(docs) = self.collections.get_mut(collection) {
                docs.remove(&id);
            }
            return Err(e);
        }

        debug!(id, "Inserted document");
        Ok(id)
    }
}
