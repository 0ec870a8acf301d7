//! Tests for Archiver
//!
//! These tests verify:
//! - Eligibility: only records older than the cutoff move
//! - Records without a partition key are skipped (with a warning), never moved
//! - Retention windows are rejected when negative or out of range
//! - Archived blobs are byte-identical to the hot record
//! - Record-level failures are contained; query failures abort the run
//! - Idempotence and crash recovery between cold write and hot delete
//! - Bounded parallel runs reach the same end state as sequential ones

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tiervault::archiver::{RecordOutcome, SkipReason};
use tiervault::clock::ManualClock;
use tiervault::store::{
    AgeQuery, ColdStore, HotStore, Lookup, MemoryColdStore, MemoryHotStore,
};
use tiervault::{Archiver, Config, NewRecord, Record, TierContext, TierError, VerifyMode};

// =============================================================================
// Helper Functions
// =============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

fn retention() -> Duration {
    Duration::days(90)
}

struct Fixture {
    clock: Arc<ManualClock>,
    hot: Arc<MemoryHotStore>,
    cold: Arc<MemoryColdStore>,
}

impl Fixture {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(now()));
        Self {
            hot: Arc::new(MemoryHotStore::with_clock(clock.clone())),
            cold: Arc::new(MemoryColdStore::new()),
            clock,
        }
    }

    /// Create a record as if written `age_days` ago
    fn insert_aged(&self, id: &str, pk: Option<&str>, age_days: i64) -> Record {
        self.clock.set(now() - Duration::days(age_days));
        let record = self
            .hot
            .create(NewRecord::new(id, pk.map(str::to_string)).with_field("amount", json!(42)))
            .unwrap();
        self.clock.set(now());
        record
    }

    fn context(&self, config: Config) -> TierContext {
        self.context_with(config, self.hot.clone(), self.cold.clone())
    }

    fn context_with(
        &self,
        config: Config,
        hot: Arc<dyn HotStore>,
        cold: Arc<dyn ColdStore>,
    ) -> TierContext {
        TierContext::new(config, hot, cold).with_clock(self.clock.clone())
    }

    fn archiver(&self) -> Archiver {
        Archiver::new(&self.context(Config::default()))
    }

    fn in_hot(&self, id: &str, pk: &str) -> bool {
        self.hot.get(id, pk).unwrap().is_found()
    }

    fn in_cold(&self, id: &str) -> bool {
        self.cold.exists(id).unwrap()
    }
}

/// Log sink shared with a thread-local subscriber
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with WARN-and-above events captured
fn with_captured_warnings<R>(f: impl FnOnce() -> R) -> (R, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}

/// Cold store whose puts fail for selected ids
struct FlakyColdStore {
    inner: Arc<MemoryColdStore>,
    failing: HashSet<String>,
}

impl ColdStore for FlakyColdStore {
    fn put(&self, id: &str, blob: Bytes) -> tiervault::Result<()> {
        if self.failing.contains(id) {
            return Err(TierError::Backend(format!("throttled writing {}", id)));
        }
        self.inner.put(id, blob)
    }

    fn exists(&self, id: &str) -> tiervault::Result<bool> {
        self.inner.exists(id)
    }

    fn get(&self, id: &str) -> tiervault::Result<Lookup<Bytes>> {
        self.inner.get(id)
    }
}

/// Cold store that accepts writes but never confirms them
struct UnconfirmedColdStore {
    inner: Arc<MemoryColdStore>,
}

impl ColdStore for UnconfirmedColdStore {
    fn put(&self, id: &str, blob: Bytes) -> tiervault::Result<()> {
        self.inner.put(id, blob)
    }

    fn exists(&self, _id: &str) -> tiervault::Result<bool> {
        Ok(false)
    }

    fn get(&self, _id: &str) -> tiervault::Result<Lookup<Bytes>> {
        Ok(Lookup::NotFound)
    }
}

/// Cold store that silently truncates what it stores
struct CorruptingColdStore {
    inner: Arc<MemoryColdStore>,
}

impl ColdStore for CorruptingColdStore {
    fn put(&self, id: &str, blob: Bytes) -> tiervault::Result<()> {
        self.inner.put(id, blob.slice(..blob.len() / 2))
    }

    fn exists(&self, id: &str) -> tiervault::Result<bool> {
        self.inner.exists(id)
    }

    fn get(&self, id: &str) -> tiervault::Result<Lookup<Bytes>> {
        self.inner.get(id)
    }
}

/// Hot store whose candidate query always fails
struct UnavailableHotStore {
    inner: Arc<MemoryHotStore>,
}

impl HotStore for UnavailableHotStore {
    fn create(&self, record: NewRecord) -> tiervault::Result<Record> {
        self.inner.create(record)
    }

    fn get(&self, id: &str, partition_key: &str) -> tiervault::Result<Lookup<Record>> {
        self.inner.get(id, partition_key)
    }

    fn query_older_than(&self, _query: &AgeQuery) -> tiervault::Result<Vec<Record>> {
        Err(TierError::Backend("query timed out".to_string()))
    }

    fn delete(&self, id: &str, partition_key: &str) -> tiervault::Result<()> {
        self.inner.delete(id, partition_key)
    }
}

/// Hot store that "crashes" on delete while the flag is set
struct CrashBeforeDeleteHotStore {
    inner: Arc<MemoryHotStore>,
    crash: AtomicBool,
}

impl HotStore for CrashBeforeDeleteHotStore {
    fn create(&self, record: NewRecord) -> tiervault::Result<Record> {
        self.inner.create(record)
    }

    fn get(&self, id: &str, partition_key: &str) -> tiervault::Result<Lookup<Record>> {
        self.inner.get(id, partition_key)
    }

    fn query_older_than(&self, query: &AgeQuery) -> tiervault::Result<Vec<Record>> {
        self.inner.query_older_than(query)
    }

    fn delete(&self, id: &str, partition_key: &str) -> tiervault::Result<()> {
        if self.crash.load(Ordering::SeqCst) {
            return Err(TierError::Backend("process died before delete".to_string()));
        }
        self.inner.delete(id, partition_key)
    }
}

// =============================================================================
// Eligibility Tests
// =============================================================================

#[test]
fn test_old_record_is_archived() {
    let fx = Fixture::new();
    let a = fx.insert_aged("A", Some("pk1"), 100);

    let report = fx.archiver().run_archival(retention()).unwrap();

    assert_eq!(report.archived, vec!["A".to_string()]);
    assert!(!fx.in_hot("A", "pk1"));
    let blob = fx.cold.get("A").unwrap().found().unwrap();
    assert_eq!(blob, a.to_json_bytes().unwrap());
    assert_eq!(Record::from_json_bytes(&blob).unwrap().payload["amount"], json!(42));
}

#[test]
fn test_recent_record_stays_hot() {
    let fx = Fixture::new();
    fx.insert_aged("B", Some("pk1"), 10);

    let report = fx.archiver().run_archival(retention()).unwrap();

    assert_eq!(report.candidates, 0);
    assert!(fx.in_hot("B", "pk1"));
    assert!(!fx.in_cold("B"));
}

#[test]
fn test_cutoff_is_now_minus_retention() {
    let fx = Fixture::new();

    let report = fx.archiver().run_archival(retention()).unwrap();

    assert_eq!(report.cutoff, now() - retention());
}

#[test]
fn test_record_exactly_at_cutoff_stays_hot() {
    let fx = Fixture::new();
    fx.insert_aged("edge", Some("pk1"), 90);

    let report = fx.archiver().run_archival(retention()).unwrap();

    assert!(report.archived.is_empty());
    assert!(fx.in_hot("edge", "pk1"));
}

#[test]
fn test_missing_partition_key_is_skipped() {
    let fx = Fixture::new();
    fx.insert_aged("C", None, 100);
    fx.insert_aged("D", Some(""), 100);

    let report = fx.archiver().run_archival(retention()).unwrap();

    assert_eq!(report.skipped, vec!["C".to_string(), "D".to_string()]);
    assert!(report.archived.is_empty());
    assert!(report.is_clean());
    assert_eq!(fx.hot.len(), 2);
    assert!(fx.cold.is_empty());
}

#[test]
fn test_missing_partition_key_skip_is_logged() {
    let fx = Fixture::new();
    fx.insert_aged("C", None, 100);
    let archiver = fx.archiver();

    let (report, logs) = with_captured_warnings(|| archiver.run_archival(retention()).unwrap());

    assert_eq!(report.skipped, vec!["C".to_string()]);
    assert!(logs.contains("WARN"));
    assert!(logs.contains("without partition key"));
    assert!(logs.contains("record_id=C"));
}

#[test]
fn test_migrate_record_reports_skip_reason() {
    let fx = Fixture::new();
    let c = fx.insert_aged("C", None, 100);

    let outcome = fx.archiver().migrate_record(&c);

    assert_eq!(outcome, RecordOutcome::Skipped(SkipReason::MissingPartitionKey));
}

#[test]
fn test_mixed_batch() {
    let fx = Fixture::new();
    fx.insert_aged("A", Some("pk1"), 100);
    fx.insert_aged("B", Some("pk1"), 10);
    fx.insert_aged("C", None, 100);

    let report = fx.archiver().run_archival(retention()).unwrap();

    assert_eq!(report.candidates, 2);
    assert_eq!(report.archived, vec!["A".to_string()]);
    assert_eq!(report.skipped, vec!["C".to_string()]);
    assert!(fx.hot.contains_id("B"));
    assert!(fx.hot.contains_id("C"));
    assert!(!fx.hot.contains_id("A"));
    assert_eq!(fx.cold.len(), 1);
}

#[test]
fn test_negative_retention_rejected() {
    let fx = Fixture::new();

    let result = fx.archiver().run_archival(Duration::days(-1));

    assert!(matches!(result, Err(TierError::Config(_))));
}

#[test]
fn test_retention_past_representable_range_rejected() {
    let fx = Fixture::new();
    fx.insert_aged("A", Some("pk1"), 100);
    let config = Config::builder().retention_days(u32::MAX).build();
    assert!(config.validate().is_ok());

    let result = fx.archiver().run_archival(config.retention());

    assert!(matches!(result, Err(TierError::Config(_))));
    assert!(fx.in_hot("A", "pk1"));
}

#[test]
fn test_max_records_per_run_limits_batch() {
    let fx = Fixture::new();
    for (i, age) in [300, 200, 100].iter().enumerate() {
        fx.insert_aged(&format!("r{}", i), Some("pk"), *age);
    }
    let config = Config::builder().max_records_per_run(Some(2)).build();

    let report = Archiver::new(&fx.context(config)).run_archival(retention()).unwrap();

    // Oldest first
    assert_eq!(report.archived, vec!["r0".to_string(), "r1".to_string()]);
    assert!(fx.in_hot("r2", "pk"));
}

// =============================================================================
// Failure Containment Tests
// =============================================================================

#[test]
fn test_cold_write_failure_is_contained() {
    let fx = Fixture::new();
    fx.insert_aged("bad", Some("pk"), 100);
    fx.insert_aged("good", Some("pk"), 100);
    let cold = Arc::new(FlakyColdStore {
        inner: fx.cold.clone(),
        failing: HashSet::from(["bad".to_string()]),
    });
    let context = fx.context_with(Config::default(), fx.hot.clone(), cold);

    let report = Archiver::new(&context).run_archival(retention()).unwrap();

    assert_eq!(report.archived, vec!["good".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "bad");
    assert!(report.failed[0].1.contains("throttled"));
    assert!(!report.is_clean());
    assert!(fx.in_hot("bad", "pk"));
    assert!(!fx.in_cold("bad"));
}

#[test]
fn test_failed_record_is_retried_next_run() {
    let fx = Fixture::new();
    fx.insert_aged("bad", Some("pk"), 100);
    let flaky = Arc::new(FlakyColdStore {
        inner: fx.cold.clone(),
        failing: HashSet::from(["bad".to_string()]),
    });
    let context = fx.context_with(Config::default(), fx.hot.clone(), flaky);
    Archiver::new(&context).run_archival(retention()).unwrap();

    let report = fx.archiver().run_archival(retention()).unwrap();

    assert_eq!(report.archived, vec!["bad".to_string()]);
    assert!(!fx.in_hot("bad", "pk"));
    assert!(fx.in_cold("bad"));
}

#[test]
fn test_unconfirmed_write_keeps_hot_copy() {
    let fx = Fixture::new();
    fx.insert_aged("A", Some("pk"), 100);
    let cold = Arc::new(UnconfirmedColdStore {
        inner: fx.cold.clone(),
    });
    let context = fx.context_with(Config::default(), fx.hot.clone(), cold);

    let report = Archiver::new(&context).run_archival(retention()).unwrap();

    assert!(report.archived.is_empty());
    assert_eq!(report.failed.len(), 1);
    assert!(fx.in_hot("A", "pk"));
}

#[test]
fn test_checksum_mode_catches_corrupt_copy() {
    let fx = Fixture::new();
    fx.insert_aged("A", Some("pk"), 100);
    let cold = Arc::new(CorruptingColdStore {
        inner: fx.cold.clone(),
    });

    // Existence check alone is fooled
    let exists = fx.context_with(Config::default(), fx.hot.clone(), cold.clone());
    let checksum = fx.context_with(
        Config::builder().verify_mode(VerifyMode::Checksum).build(),
        fx.hot.clone(),
        cold,
    );

    let report = Archiver::new(&checksum).run_archival(retention()).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert!(fx.in_hot("A", "pk"));

    let report = Archiver::new(&exists).run_archival(retention()).unwrap();
    assert_eq!(report.archived, vec!["A".to_string()]);
}

#[test]
fn test_checksum_mode_archives_intact_copy() {
    let fx = Fixture::new();
    fx.insert_aged("A", Some("pk"), 100);
    let config = Config::builder().verify_mode(VerifyMode::Checksum).build();

    let report = Archiver::new(&fx.context(config)).run_archival(retention()).unwrap();

    assert_eq!(report.archived, vec!["A".to_string()]);
    assert!(!fx.in_hot("A", "pk"));
}

#[test]
fn test_query_failure_aborts_run() {
    let fx = Fixture::new();
    fx.insert_aged("A", Some("pk"), 100);
    let hot = Arc::new(UnavailableHotStore {
        inner: fx.hot.clone(),
    });
    let context = fx.context_with(Config::default(), hot, fx.cold.clone());

    let result = Archiver::new(&context).run_archival(retention());

    assert!(matches!(result, Err(TierError::Backend(_))));
    assert!(fx.in_hot("A", "pk"));
    assert!(fx.cold.is_empty());
}

// =============================================================================
// Idempotence and Recovery Tests
// =============================================================================

#[test]
fn test_second_run_is_a_no_op() {
    let fx = Fixture::new();
    fx.insert_aged("A", Some("pk1"), 100);
    fx.insert_aged("B", Some("pk1"), 10);
    fx.insert_aged("C", None, 100);
    let archiver = fx.archiver();
    let cutoff = now() - retention();

    archiver.run_with_cutoff(cutoff).unwrap();
    let hot_after_first = fx.hot.query_older_than(&AgeQuery::older_than(now())).unwrap();
    let cold_after_first = fx.cold.get("A").unwrap();

    let second = archiver.run_with_cutoff(cutoff).unwrap();

    assert!(second.archived.is_empty());
    assert_eq!(second.skipped, vec!["C".to_string()]);
    assert_eq!(
        fx.hot.query_older_than(&AgeQuery::older_than(now())).unwrap(),
        hot_after_first
    );
    assert_eq!(fx.cold.get("A").unwrap(), cold_after_first);
    assert_eq!(fx.cold.len(), 1);
}

#[test]
fn test_crash_between_cold_write_and_hot_delete_recovers() {
    let fx = Fixture::new();
    let a = fx.insert_aged("A", Some("pk1"), 100);
    let crashing = Arc::new(CrashBeforeDeleteHotStore {
        inner: fx.hot.clone(),
        crash: AtomicBool::new(true),
    });
    let context = fx.context_with(Config::default(), crashing.clone(), fx.cold.clone());
    let archiver = Archiver::new(&context);

    // Interrupted run: cold copy written, hot copy still present
    let first = archiver.run_archival(retention()).unwrap();
    assert_eq!(first.failed.len(), 1);
    assert!(fx.in_hot("A", "pk1"));
    assert!(fx.in_cold("A"));

    // Recovery run repeats the upsert and completes the delete
    crashing.crash.store(false, Ordering::SeqCst);
    let second = archiver.run_archival(retention()).unwrap();

    assert_eq!(second.archived, vec!["A".to_string()]);
    assert!(second.is_clean());
    assert!(!fx.in_hot("A", "pk1"));
    assert_eq!(fx.cold.get("A").unwrap(), Lookup::Found(a.to_json_bytes().unwrap()));
}

#[test]
fn test_overlapping_runs_are_safe() {
    let fx = Fixture::new();
    for i in 0..20 {
        fx.insert_aged(&format!("r{:02}", i), Some("pk"), 100 + i);
    }
    let first = fx.archiver();
    let second = fx.archiver();

    std::thread::scope(|s| {
        s.spawn(|| first.run_archival(retention()).unwrap());
        s.spawn(|| second.run_archival(retention()).unwrap());
    });

    assert!(fx.hot.is_empty());
    assert_eq!(fx.cold.len(), 20);
}

// =============================================================================
// Parallelism Tests
// =============================================================================

#[test]
fn test_parallel_run_matches_sequential() {
    let fx = Fixture::new();
    for i in 0..50 {
        let pk = if i % 10 == 0 { None } else { Some("pk") };
        fx.insert_aged(&format!("r{:02}", i), pk, 91 + i);
    }
    fx.insert_aged("fresh", Some("pk"), 1);
    let config = Config::builder().archive_workers(4).build();

    let report = Archiver::new(&fx.context(config)).run_archival(retention()).unwrap();

    assert_eq!(report.candidates, 50);
    assert_eq!(report.archived.len(), 45);
    assert_eq!(report.skipped.len(), 5);
    assert!(report.is_clean());
    assert_eq!(fx.cold.len(), 45);
    assert_eq!(fx.hot.len(), 6);
    assert!(fx.in_hot("fresh", "pk"));

    let mut sorted = report.archived.clone();
    sorted.sort();
    assert_eq!(report.archived, sorted);
}
