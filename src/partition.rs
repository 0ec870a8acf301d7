//! Partition-key resolution
//!
//! The hot store needs `(id, partitionKey)` for point reads and deletes, but
//! callers only know the id. How an id maps to its partition is a deployment
//! decision, so it is injected as a strategy.

/// Maps a record id to the partition key it lives under
pub trait PartitionKeyStrategy: Send + Sync {
    /// `None` means the id carries no partition; such records are never
    /// looked up in (or deleted from) the hot store by id alone.
    fn resolve(&self, id: &str) -> Option<String>;
}

/// The id is its own partition key
#[derive(Debug, Clone, Copy, Default)]
pub struct IdAsPartitionKey;

impl PartitionKeyStrategy for IdAsPartitionKey {
    fn resolve(&self, id: &str) -> Option<String> {
        Some(id.to_string())
    }
}

/// Every record shares one partition
#[derive(Debug, Clone)]
pub struct FixedPartitionKey(pub String);

impl PartitionKeyStrategy for FixedPartitionKey {
    fn resolve(&self, _id: &str) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Partition is the id prefix before the first delimiter
///
/// `"tenant-a:0042"` with delimiter `':'` resolves to `"tenant-a"`.
#[derive(Debug, Clone, Copy)]
pub struct PrefixPartitionKey {
    pub delimiter: char,
}

impl PartitionKeyStrategy for PrefixPartitionKey {
    fn resolve(&self, id: &str) -> Option<String> {
        let (prefix, _) = id.split_once(self.delimiter)?;
        if prefix.is_empty() {
            None
        } else {
            Some(prefix.to_string())
        }
    }
}

impl<F> PartitionKeyStrategy for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve(&self, id: &str) -> Option<String> {
        self(id)
    }
}
