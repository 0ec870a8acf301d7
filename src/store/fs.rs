//! Directory-backed stores
//!
//! Durable reference backends used by the CLI.
//!
//! ## Layout
//! ```text
//! hot/
//!   ├── p_{partitionKey}/{id}.json   (partitioned records)
//!   └── unpartitioned/{id}.json      (records with no partition key)
//! cold/
//!   └── {id}.json                    (archived records)
//! ```
//!
//! Every write lands in a temporary file first and is renamed into place
//! after fsync, so readers never observe a half-written document.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TierError};
use crate::record::{validate_identifier, NewRecord, Record, ID_FIELD, PARTITION_KEY_FIELD};

use super::{archive_object_name, AgeQuery, ColdStore, HotStore, Lookup};

// =============================================================================
// Hot Store
// =============================================================================

/// Hot tier stored as one JSON file per record
pub struct FsHotStore {
    /// Root directory holding one subdirectory per partition
    root: PathBuf,

    /// Stamps write timestamps
    clock: Arc<dyn Clock>,

    /// Serializes creates so the existence check and write are atomic
    write_lock: Mutex<()>,
}

impl FsHotStore {
    const PARTITION_PREFIX: &'static str = "p_";
    const UNPARTITIONED_DIR: &'static str = "unpartitioned";

    /// Open or create a hot store rooted at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        fs::create_dir_all(path)?;
        Ok(Self {
            root: path.to_path_buf(),
            clock,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn partition_dir(&self, partition_key: Option<&str>) -> PathBuf {
        match partition_key {
            Some(pk) => self.root.join(format!("{}{}", Self::PARTITION_PREFIX, pk)),
            None => self.root.join(Self::UNPARTITIONED_DIR),
        }
    }

    fn record_path(&self, id: &str, partition_key: Option<&str>) -> PathBuf {
        self.partition_dir(partition_key).join(archive_object_name(id))
    }

    /// Load every document in one partition directory
    fn scan_partition(&self, dir: &Path, query: &AgeQuery, out: &mut Vec<Record>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !is_document(&path) {
                continue;
            }

            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                // Deleted between listing and reading
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            match Record::from_json_bytes(&bytes) {
                Ok(record) if query.matches(&record) => out.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable hot document");
                }
            }
        }
        Ok(())
    }
}

impl HotStore for FsHotStore {
    fn create(&self, record: NewRecord) -> Result<Record> {
        validate_identifier(ID_FIELD, &record.id)?;
        let record = record.stamp(self.clock.now());
        let partition_key = record.partition_key();
        if let Some(pk) = partition_key {
            validate_identifier(PARTITION_KEY_FIELD, pk)?;
        }

        let path = self.record_path(&record.id, partition_key);
        let bytes = record.to_json_bytes()?;

        let _guard = self.write_lock.lock();
        if path.try_exists()? {
            return Err(TierError::Backend(format!(
                "record {} already exists in partition {:?}",
                record.id, partition_key
            )));
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        write_atomic(&path, &bytes)?;

        Ok(record)
    }

    fn get(&self, id: &str, partition_key: &str) -> Result<Lookup<Record>> {
        validate_identifier(ID_FIELD, id)?;
        validate_identifier(PARTITION_KEY_FIELD, partition_key)?;

        match fs::read(self.record_path(id, Some(partition_key))) {
            Ok(bytes) => Ok(Lookup::Found(Record::from_json_bytes(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Lookup::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    fn query_older_than(&self, query: &AgeQuery) -> Result<Vec<Record>> {
        let mut matches = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                self.scan_partition(&entry.path(), query, &mut matches)?;
            }
        }
        Ok(query.finish(matches))
    }

    fn delete(&self, id: &str, partition_key: &str) -> Result<()> {
        if id.is_empty() || partition_key.is_empty() {
            return Err(TierError::NotFound(
                "delete requires both id and partition key".to_string(),
            ));
        }
        validate_identifier(ID_FIELD, id)?;
        validate_identifier(PARTITION_KEY_FIELD, partition_key)?;

        match fs::remove_file(self.record_path(id, Some(partition_key))) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Cold Store
// =============================================================================

/// Cold tier stored as `{id}.json` objects in one directory
pub struct FsColdStore {
    root: PathBuf,
}

impl FsColdStore {
    /// Open or create a cold store rooted at `path`
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &str) -> Result<PathBuf> {
        validate_identifier(ID_FIELD, id)?;
        Ok(self.root.join(archive_object_name(id)))
    }
}

impl ColdStore for FsColdStore {
    fn put(&self, id: &str, blob: Bytes) -> Result<()> {
        let path = self.object_path(id)?;
        write_atomic(&path, &blob)
    }

    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.object_path(id)?.try_exists()?)
    }

    fn get(&self, id: &str) -> Result<Lookup<Bytes>> {
        match fs::read(self.object_path(id)?) {
            Ok(bytes) => Ok(Lookup::Found(Bytes::from(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Lookup::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Write `bytes` to `path` via fsync + rename, replacing any existing file
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| TierError::Backend(format!("no parent directory for {}", path.display())))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Unique per writer so overlapping runs never share a temp file
    let tmp_path = dir.join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));

    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Finished documents only; temp files end in `.tmp`, ids may start with `.`
fn is_document(path: &Path) -> bool {
    path.extension().map(|ext| ext == "json").unwrap_or(false)
}
