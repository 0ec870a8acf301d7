//! In-memory backends
//!
//! Map-backed stores for embedding and tests. Both use a `parking_lot::RwLock`
//! so lookups run concurrently while writes are exclusive.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TierError};
use crate::record::{NewRecord, Record};

use super::{AgeQuery, ColdStore, HotStore, Lookup};

/// (partition key, id); records without a partition key use `None`
type HotKey = (Option<String>, String);

/// Hot tier held in memory
pub struct MemoryHotStore {
    records: RwLock<BTreeMap<HotKey, Record>>,
    clock: Arc<dyn Clock>,
}

impl MemoryHotStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use `clock` to stamp write timestamps
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Whether any partition holds a record with this id
    pub fn contains_id(&self, id: &str) -> bool {
        self.records.read().keys().any(|(_, key_id)| key_id == id)
    }
}

impl Default for MemoryHotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HotStore for MemoryHotStore {
    fn create(&self, record: NewRecord) -> Result<Record> {
        let record = record.stamp(self.clock.now());
        let key = (record.partition_key().map(str::to_string), record.id.clone());

        let mut records = self.records.write();
        if records.contains_key(&key) {
            return Err(TierError::Backend(format!(
                "record {} already exists in partition {:?}",
                record.id, key.0
            )));
        }
        records.insert(key, record.clone());
        Ok(record)
    }

    fn get(&self, id: &str, partition_key: &str) -> Result<Lookup<Record>> {
        let key = (Some(partition_key.to_string()), id.to_string());
        Ok(self.records.read().get(&key).cloned().into())
    }

    fn query_older_than(&self, query: &AgeQuery) -> Result<Vec<Record>> {
        let matches = self
            .records
            .read()
            .values()
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        Ok(query.finish(matches))
    }

    fn delete(&self, id: &str, partition_key: &str) -> Result<()> {
        if id.is_empty() || partition_key.is_empty() {
            return Err(TierError::NotFound(
                "delete requires both id and partition key".to_string(),
            ));
        }
        let key = (Some(partition_key.to_string()), id.to_string());
        self.records.write().remove(&key);
        Ok(())
    }
}

/// Cold tier held in memory
#[derive(Default)]
pub struct MemoryColdStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl MemoryColdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

impl ColdStore for MemoryColdStore {
    fn put(&self, id: &str, blob: Bytes) -> Result<()> {
        self.blobs.write().insert(id.to_string(), blob);
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.blobs.read().contains_key(id))
    }

    fn get(&self, id: &str) -> Result<Lookup<Bytes>> {
        Ok(self.blobs.read().get(id).cloned().into())
    }
}
