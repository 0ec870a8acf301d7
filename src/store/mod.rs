//! Store Module
//!
//! Contracts for the two storage tiers, plus reference backends.
//!
//! ## Responsibilities
//! - `HotStore`: partitioned point lookup, age-filtered scan, delete
//! - `ColdStore`: idempotent key → blob put, existence check, get
//! - Explicit found / not-found results instead of not-found errors
//!
//! ## Persisted Layout
//! ```text
//! hot:  one document per record, partitioned by partitionKey
//!       { id, partitionKey, writeTimestamp, ...payload }
//! cold: one object per archived record, named "{id}.json",
//!       holding the record exactly as serialized from the hot tier
//! ```

mod fs;
mod memory;

pub use fs::{FsColdStore, FsHotStore};
pub use memory::{MemoryColdStore, MemoryHotStore};

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::record::{NewRecord, Record};

/// Outcome of a point lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    /// Convert into an `Option`
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}

/// Cross-partition scan for records written before a cutoff
///
/// Built from typed values; backends translate it into whatever
/// parameterized form they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeQuery {
    cutoff: DateTime<Utc>,
    limit: Option<usize>,
}

impl AgeQuery {
    /// Match records with `writeTimestamp < cutoff`
    pub fn older_than(cutoff: DateTime<Utc>) -> Self {
        Self {
            cutoff,
            limit: None,
        }
    }

    /// Return at most `limit` records (oldest first)
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// Whether a record satisfies the filter
    pub fn matches(&self, record: &Record) -> bool {
        record.write_timestamp < self.cutoff
    }

    /// Sort matches oldest first and apply the limit
    pub(crate) fn finish(&self, mut records: Vec<Record>) -> Vec<Record> {
        records.sort_by(|a, b| {
            a.write_timestamp
                .cmp(&b.write_timestamp)
                .then_with(|| a.id.cmp(&b.id))
        });
        if let Some(limit) = self.limit {
            records.truncate(limit);
        }
        records
    }
}

/// Hot tier: recent, frequently accessed records
pub trait HotStore: Send + Sync {
    /// Write a new record, assigning its write timestamp
    fn create(&self, record: NewRecord) -> Result<Record>;

    /// Point lookup by `(id, partitionKey)`
    fn get(&self, id: &str, partition_key: &str) -> Result<Lookup<Record>>;

    /// Cross-partition scan for records older than the query cutoff
    fn query_older_than(&self, query: &AgeQuery) -> Result<Vec<Record>>;

    /// Remove a record; deleting an absent record succeeds
    fn delete(&self, id: &str, partition_key: &str) -> Result<()>;
}

/// Cold tier: durable archive keyed by record id
pub trait ColdStore: Send + Sync {
    /// Store a blob, replacing any existing one (idempotent upsert)
    fn put(&self, id: &str, blob: Bytes) -> Result<()>;

    fn exists(&self, id: &str) -> Result<bool>;

    fn get(&self, id: &str) -> Result<Lookup<Bytes>>;
}

/// Name of the archive object for a record id
pub fn archive_object_name(id: &str) -> String {
    format!("{}.json", id)
}
