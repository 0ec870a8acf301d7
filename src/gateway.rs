//! Gateway Module
//!
//! Record creation and tiered reads.
//!
//! ## Responsibilities
//! - Create: normalize the client document and write it to the hot tier only
//! - Read: hot tier first; cold tier only on a hot miss
//! - Keep "absent everywhere" (`NotFound`) distinct from backend failures

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::context::TierContext;
use crate::error::{Result, TierError};
use crate::partition::PartitionKeyStrategy;
use crate::record::{validate_identifier, NewRecord, Record, ID_FIELD};
use crate::store::{ColdStore, HotStore, Lookup};

/// Which tier served a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Hot,
    Cold,
}

/// A record returned by `Gateway::read`
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Live record from the hot tier
    Hot(Record),

    /// Archived object, exactly as stored
    Cold(Bytes),
}

impl Fetched {
    pub fn tier(&self) -> Tier {
        match self {
            Fetched::Hot(_) => Tier::Hot,
            Fetched::Cold(_) => Tier::Cold,
        }
    }

    /// JSON body for the caller; archived bytes are passed through verbatim
    pub fn to_json_bytes(&self) -> Result<Bytes> {
        match self {
            Fetched::Hot(record) => record.to_json_bytes(),
            Fetched::Cold(blob) => Ok(blob.clone()),
        }
    }

    /// Decode into a `Record` regardless of tier
    pub fn into_record(self) -> Result<Record> {
        match self {
            Fetched::Hot(record) => Ok(record),
            Fetched::Cold(blob) => Record::from_json_bytes(&blob),
        }
    }
}

/// Front door for creates and reads
pub struct Gateway {
    hot: Arc<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
    partitioner: Arc<dyn PartitionKeyStrategy>,
}

impl Gateway {
    /// Build a gateway sharing the context's store handles
    pub fn new(context: &TierContext) -> Self {
        Self {
            hot: Arc::clone(&context.hot),
            cold: Arc::clone(&context.cold),
            partitioner: Arc::clone(&context.partitioner),
        }
    }

    /// Create a record from a raw JSON body
    pub fn create(&self, body: &[u8]) -> Result<Record> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| TierError::Validation(format!("invalid JSON: {}", e)))?;
        self.create_document(document)
    }

    /// Create a record from an already-parsed document
    pub fn create_document(&self, document: Value) -> Result<Record> {
        let record = NewRecord::from_document(document, self.partitioner.as_ref())?;
        self.hot.create(record).map_err(into_backend)
    }

    /// Look a record up by id, falling back from hot to cold
    ///
    /// The hot lookup uses the strategy's partition key for `id`. A record
    /// created with an explicit `partitionKey` that differs from it is not
    /// visible here until it has been archived.
    pub fn read(&self, id: &str) -> Result<Fetched> {
        validate_identifier(ID_FIELD, id)?;

        // Step 1: Hot tier (authoritative when present)
        match self.partitioner.resolve(id).filter(|pk| !pk.is_empty()) {
            Some(partition_key) => {
                if let Lookup::Found(record) = self.hot.get(id, &partition_key).map_err(into_backend)? {
                    return Ok(Fetched::Hot(record));
                }
                tracing::debug!(record_id = %id, "Record not in hot tier, checking archive");
            }
            None => {
                tracing::debug!(record_id = %id, "No partition key for id, reading archive only");
            }
        }

        // Step 2: Cold tier
        match self.cold.get(id).map_err(into_backend)? {
            Lookup::Found(blob) => Ok(Fetched::Cold(blob)),
            Lookup::NotFound => Err(TierError::NotFound(format!(
                "record {} not found in hot or cold storage",
                id
            ))),
        }
    }
}

/// Store errors other than validation surface as backend failures
fn into_backend(error: TierError) -> TierError {
    match error {
        TierError::Validation(_) | TierError::Backend(_) => error,
        other => TierError::Backend(other.to_string()),
    }
}
