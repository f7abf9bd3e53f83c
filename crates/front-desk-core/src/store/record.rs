//! Generic keyed collection persisted as one JSON document.
//!
//! The whole collection is rewritten on every mutation. Writes go to a
//! temporary file in the same directory which is then renamed over the live
//! file, so a crash mid-write leaves the previous state intact.

use std::collections::btree_map::{self, BTreeMap};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use super::{StoreError, StoreResult};

/// Keyed records loaded from and persisted to a single backing file.
#[derive(Debug)]
pub struct RecordStore<R> {
    path: PathBuf,
    records: BTreeMap<String, R>,
}

impl<R> RecordStore<R>
where
    R: Serialize + DeserializeOwned,
{
    /// Load the store from `path`. A missing file yields an empty store.
    pub fn load<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                tracing::error!(path = %path.display(), error = %source, "Refusing to load corrupt store file");
                StoreError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No store file yet, starting empty");
                BTreeMap::new()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        tracing::debug!(path = %path.display(), records = records.len(), "Loaded store");
        Ok(Self { path, records })
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.records.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate records in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, R> {
        self.records.iter()
    }

    pub fn values(&self) -> btree_map::Values<'_, String, R> {
        self.records.values()
    }

    /// Insert or overwrite a record and persist. Returns the replaced record.
    ///
    /// On a persistence failure the in-memory change is undone.
    pub fn put(&mut self, key: String, record: R) -> StoreResult<Option<R>> {
        let previous = self.records.insert(key.clone(), record);
        if let Err(e) = self.persist() {
            match previous {
                Some(previous) => {
                    self.records.insert(key, previous);
                }
                None => {
                    self.records.remove(&key);
                }
            }
            return Err(e);
        }
        Ok(previous)
    }

    /// Remove a record. Persists only when something was removed.
    pub fn remove(&mut self, key: &str) -> StoreResult<Option<R>> {
        let Some(removed) = self.records.remove(key) else {
            return Ok(None);
        };
        if let Err(e) = self.persist() {
            self.records.insert(key.to_string(), removed);
            return Err(e);
        }
        Ok(Some(removed))
    }

    /// Remove `old_key` and insert `record` under `new_key` with a single write.
    ///
    /// Either both changes are persisted or neither is.
    pub fn swap(&mut self, old_key: &str, new_key: String, record: R) -> StoreResult<Option<R>> {
        let removed = self.records.remove(old_key);
        let displaced = self.records.insert(new_key.clone(), record);
        if let Err(e) = self.persist() {
            self.records.remove(&new_key);
            if let Some(displaced) = displaced {
                self.records.insert(new_key, displaced);
            }
            if let Some(removed) = removed {
                self.records.insert(old_key.to_string(), removed);
            }
            return Err(e);
        }
        Ok(removed)
    }

    /// Write the whole collection to the backing file atomically.
    pub fn persist(&self) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.records)?;
            writer.write_all(b"\n").map_err(|source| self.io_error(source))?;
            writer.flush().map_err(|source| self.io_error(source))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|source| self.io_error(source))?;
        tmp.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        sync_dir(&dir);

        tracing::trace!(path = %self.path.display(), records = self.records.len(), "Persisted store");
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Make the rename itself durable. Best effort: some filesystems reject directory fsync.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = fs::File::open(dir) {
        if let Err(e) = handle.sync_all() {
            tracing::debug!(dir = %dir.display(), error = %e, "Directory fsync failed");
        }
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
