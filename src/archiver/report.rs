//! Archival run results

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Why a candidate was left in the hot tier without an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Hot deletes need a partition key, so the record cannot be moved safely
    MissingPartitionKey,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingPartitionKey => write!(f, "missing partition key"),
        }
    }
}

/// Result of migrating one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Written to cold, confirmed, deleted from hot
    Archived,

    /// Not attempted; still hot
    Skipped(SkipReason),

    /// Attempted and failed; still hot, eligible again next run
    Failed(String),
}

/// Summary of one archival run
#[derive(Debug, Clone)]
pub struct ArchivalReport {
    /// The single eligibility instant used for the whole run
    pub cutoff: DateTime<Utc>,

    /// Records returned by the age query
    pub candidates: usize,

    /// Ids moved to the cold tier
    pub archived: Vec<String>,

    /// Ids left in place without an attempt
    pub skipped: Vec<String>,

    /// Ids whose migration failed, with the error text
    pub failed: Vec<(String, String)>,

    pub elapsed: Duration,
}

impl ArchivalReport {
    pub(crate) fn new(cutoff: DateTime<Utc>, candidates: usize) -> Self {
        Self {
            cutoff,
            candidates,
            archived: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, id: String, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Archived => self.archived.push(id),
            RecordOutcome::Skipped(_) => self.skipped.push(id),
            RecordOutcome::Failed(error) => self.failed.push((id, error)),
        }
    }

    /// Sort the id lists; worker completion order is arbitrary
    pub(crate) fn finish(mut self, elapsed: Duration) -> Self {
        self.archived.sort();
        self.skipped.sort();
        self.failed.sort();
        self.elapsed = elapsed;
        self
    }

    /// No record-level failures
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for ArchivalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cutoff={} candidates={} archived={} skipped={} failed={} elapsed={:?}",
            self.cutoff.to_rfc3339(),
            self.candidates,
            self.archived.len(),
            self.skipped.len(),
            self.failed.len(),
            self.elapsed
        )
    }
}
