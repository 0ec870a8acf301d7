//! Record
//!
//! The unit of storage, shared by both tiers.
//!
//! ## Document Layout
//! A record is a flat JSON object. Three fields are reserved; everything else
//! is opaque payload:
//! ```text
//! {
//!   "id": "...",               // globally unique, stable across tiers
//!   "partitionKey": "...",     // required for any hot-tier delete
//!   "writeTimestamp": "...",   // RFC 3339, assigned by the hot store
//!   ...payload fields
//! }
//! ```

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Result, TierError};
use crate::partition::PartitionKeyStrategy;

pub const ID_FIELD: &str = "id";
pub const PARTITION_KEY_FIELD: &str = "partitionKey";
pub const WRITE_TIMESTAMP_FIELD: &str = "writeTimestamp";

/// A stored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,

    #[serde(
        rename = "partitionKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub partition_key: Option<String>,

    /// Migration-eligibility clock
    #[serde(rename = "writeTimestamp")]
    pub write_timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Record {
    /// Partition key, treating an empty string as absent
    pub fn partition_key(&self) -> Option<&str> {
        self.partition_key.as_deref().filter(|pk| !pk.is_empty())
    }

    /// Serialize to the JSON bytes stored in the archive
    pub fn to_json_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parse a record from JSON bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The full document as a JSON value
    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A record that has not been written yet (no write timestamp)
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub id: String,
    pub partition_key: Option<String>,
    pub payload: Map<String, Value>,
}

impl NewRecord {
    pub fn new(id: impl Into<String>, partition_key: Option<String>) -> Self {
        Self {
            id: id.into(),
            partition_key,
            payload: Map::new(),
        }
    }

    /// Attach a payload field
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload.insert(name.into(), value);
        self
    }

    /// Build from a client-supplied document
    ///
    /// Rules:
    /// - the document must be a JSON object
    /// - `id`, when present, must be a non-empty string; otherwise one is assigned
    /// - `partitionKey`, when present, must be a string; otherwise the strategy decides
    /// - any incoming `writeTimestamp` is dropped (the store assigns it)
    pub fn from_document(document: Value, strategy: &dyn PartitionKeyStrategy) -> Result<Self> {
        let mut payload = match document {
            Value::Object(map) => map,
            other => {
                return Err(TierError::Validation(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let id = match payload.remove(ID_FIELD) {
            None | Some(Value::Null) => Uuid::new_v4().to_string(),
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(_) => {
                return Err(TierError::Validation(
                    "`id` must be a non-empty string".to_string(),
                ))
            }
        };
        validate_identifier(ID_FIELD, &id)?;

        let partition_key = match payload.remove(PARTITION_KEY_FIELD) {
            None | Some(Value::Null) => strategy.resolve(&id),
            Some(Value::String(pk)) => Some(pk),
            Some(_) => {
                return Err(TierError::Validation(
                    "`partitionKey` must be a string".to_string(),
                ))
            }
        };
        if let Some(pk) = partition_key.as_deref().filter(|pk| !pk.is_empty()) {
            validate_identifier(PARTITION_KEY_FIELD, pk)?;
        }

        payload.remove(WRITE_TIMESTAMP_FIELD);

        Ok(Self {
            id,
            partition_key,
            payload,
        })
    }

    /// Assign the write timestamp, producing a stored record
    pub fn stamp(self, write_timestamp: DateTime<Utc>) -> Record {
        Record {
            id: self.id,
            partition_key: self.partition_key,
            write_timestamp,
            payload: self.payload,
        }
    }
}

/// Identifiers name files in the directory backends, so path syntax is refused
pub fn validate_identifier(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TierError::Validation(format!("`{}` must not be empty", field)));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(TierError::Validation(format!(
            "`{}` contains illegal characters: {:?}",
            field, value
        )));
    }
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
