//! Archiver Module
//!
//! Moves records past the retention window from the hot tier to the cold tier.
//!
//! ## Responsibilities
//! - Compute one cutoff per run and use it for every decision in that run
//! - Copy each candidate to cold storage and confirm the copy
//! - Delete from hot storage only after the copy is confirmed
//! - Contain record-level failures; abort only when the candidate query fails
//!
//! ## Per-Record Migration
//! ```text
//!   candidate ──► partition key? ──no──► skip (warn, stays hot)
//!                      │yes
//!                      ▼
//!              cold.put(id, json)        (idempotent upsert)
//!                      │
//!                      ▼
//!              confirm cold copy ──no──► fail (stays hot)
//!                      │yes
//!                      ▼
//!              hot.delete(id, pk)
//! ```
//!
//! A crash anywhere in this sequence leaves the record hot (and possibly
//! also cold). The next run repeats the upsert and finishes the delete.
//! Overlapping runs are safe for the same reason: neither ever deletes
//! without a confirmed cold copy.

mod report;

pub use report::{ArchivalReport, RecordOutcome, SkipReason};

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use crossbeam::channel;

use crate::clock::Clock;
use crate::config::VerifyMode;
use crate::context::TierContext;
use crate::error::{Result, TierError};
use crate::record::Record;
use crate::store::{AgeQuery, ColdStore, HotStore, Lookup};

/// Runs archival batches against a pair of stores
pub struct Archiver {
    hot: Arc<dyn HotStore>,
    cold: Arc<dyn ColdStore>,
    clock: Arc<dyn Clock>,

    /// Worker threads per run (1 = sequential)
    workers: usize,

    verify_mode: VerifyMode,

    /// Upper bound on candidates per run
    max_records: Option<usize>,
}

impl Archiver {
    /// Build an archiver sharing the context's store handles
    pub fn new(context: &TierContext) -> Self {
        Self {
            hot: Arc::clone(&context.hot),
            cold: Arc::clone(&context.cold),
            clock: Arc::clone(&context.clock),
            workers: context.config.archive_workers.max(1),
            verify_mode: context.config.verify_mode,
            max_records: context.config.max_records_per_run,
        }
    }

    /// Archive every hot record older than `now - retention`
    ///
    /// Fails only if the candidate query fails; per-record problems are
    /// reported in the returned `ArchivalReport`.
    pub fn run_archival(&self, retention: Duration) -> Result<ArchivalReport> {
        if retention < Duration::zero() {
            return Err(TierError::Config(format!(
                "retention window must not be negative: {}",
                retention
            )));
        }

        // Computed once; every eligibility decision in this run uses it
        let cutoff = self.clock.now().checked_sub_signed(retention).ok_or_else(|| {
            TierError::Config(format!(
                "retention window of {} reaches before the earliest representable instant",
                retention
            ))
        })?;
        self.run_with_cutoff(cutoff)
    }

    /// Archive every hot record written before `cutoff`
    pub fn run_with_cutoff(&self, cutoff: DateTime<Utc>) -> Result<ArchivalReport> {
        let started = Instant::now();

        let mut query = AgeQuery::older_than(cutoff);
        if let Some(limit) = self.max_records {
            query = query.limit(limit);
        }

        // Step 1: Find candidates (a failure here aborts the run)
        let candidates = self.hot.query_older_than(&query).map_err(|e| {
            tracing::error!(cutoff = %cutoff, error = %e, "Archival query failed, aborting run");
            e
        })?;

        tracing::info!(
            cutoff = %cutoff,
            candidates = candidates.len(),
            workers = self.workers,
            "Starting archival run"
        );

        // Step 2: Migrate each candidate independently
        let mut report = ArchivalReport::new(cutoff, candidates.len());
        let outcomes = if self.workers > 1 && candidates.len() > 1 {
            self.migrate_parallel(candidates)?
        } else {
            candidates
                .into_iter()
                .map(|record| {
                    let outcome = self.migrate_record(&record);
                    (record.id, outcome)
                })
                .collect()
        };

        for (id, outcome) in outcomes {
            report.record(id, outcome);
        }
        let report = report.finish(started.elapsed());

        tracing::info!(
            archived = report.archived.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Archival run complete"
        );

        Ok(report)
    }

    /// Migrate a single record, containing any failure
    pub fn migrate_record(&self, record: &Record) -> RecordOutcome {
        let Some(partition_key) = record.partition_key() else {
            tracing::warn!(
                record_id = %record.id,
                "Skipping record without partition key; it stays in the hot tier"
            );
            return RecordOutcome::Skipped(SkipReason::MissingPartitionKey);
        };

        match self.migrate(record, partition_key) {
            Ok(()) => {
                tracing::debug!(record_id = %record.id, partition_key, "Archived record");
                RecordOutcome::Archived
            }
            Err(e) => {
                tracing::error!(
                    record_id = %record.id,
                    partition_key,
                    error = %e,
                    "Failed to archive record"
                );
                RecordOutcome::Failed(e.to_string())
            }
        }
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write, confirm, delete. The delete is unreachable unless confirmed.
    fn migrate(&self, record: &Record, partition_key: &str) -> Result<()> {
        let blob = record.to_json_bytes()?;

        self.cold.put(&record.id, blob.clone())?;

        if !self.confirm(&record.id, &blob)? {
            return Err(TierError::Backend(format!(
                "cold copy of {} could not be confirmed",
                record.id
            )));
        }

        self.hot.delete(&record.id, partition_key)
    }

    fn confirm(&self, id: &str, written: &Bytes) -> Result<bool> {
        match self.verify_mode {
            VerifyMode::Exists => self.cold.exists(id),
            VerifyMode::Checksum => match self.cold.get(id)? {
                Lookup::Found(stored) => {
                    Ok(crc32fast::hash(&stored) == crc32fast::hash(written))
                }
                Lookup::NotFound => Ok(false),
            },
        }
    }

    /// Fan candidates out to a bounded pool of scoped worker threads
    fn migrate_parallel(&self, candidates: Vec<Record>) -> Result<Vec<(String, RecordOutcome)>> {
        crossbeam::scope(|scope| {
            let (task_tx, task_rx) = channel::bounded::<Record>(self.workers * 2);
            let (done_tx, done_rx) = channel::unbounded::<(String, RecordOutcome)>();

            for _ in 0..self.workers {
                let task_rx = task_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move |_| {
                    for record in task_rx.iter() {
                        let outcome = self.migrate_record(&record);
                        if done_tx.send((record.id, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(task_rx);
            drop(done_tx);

            for record in candidates {
                if task_tx.send(record).is_err() {
                    break;
                }
            }
            drop(task_tx);

            done_rx.iter().collect::<Vec<_>>()
        })
        .map_err(|_| TierError::Backend("archival worker panicked".to_string()))
    }
}
