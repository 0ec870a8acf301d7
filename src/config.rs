//! Configuration for TierVault
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, TierError};

/// Main configuration for a TierVault deployment
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the directory-backed stores
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── hot/     (one subdirectory per partition)
    ///     └── cold/    ({id}.json archive objects)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Archival Configuration
    // -------------------------------------------------------------------------
    /// Age (in days) after which a hot record becomes eligible for migration
    pub retention_days: u32,

    /// Worker threads used by one archival run (1 = sequential)
    pub archive_workers: usize,

    /// How a cold write is confirmed before the hot copy is deleted
    pub verify_mode: VerifyMode,

    /// Upper bound on candidates processed by a single run
    pub max_records_per_run: Option<usize>,
}

/// Cold-write confirmation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Confirm the archive object exists
    #[default]
    Exists,

    /// Read the archive object back and compare CRC32 with what was written
    Checksum,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./tiervault_data"),
            retention_days: 90,
            archive_workers: 1,
            verify_mode: VerifyMode::Exists,
            max_records_per_run: None,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Retention window as a duration
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    /// Reject settings that would make an archival run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.retention_days == 0 {
            return Err(TierError::Config(
                "retention_days must be at least 1".to_string(),
            ));
        }
        if self.archive_workers == 0 {
            return Err(TierError::Config(
                "archive_workers must be at least 1".to_string(),
            ));
        }
        if self.max_records_per_run == Some(0) {
            return Err(TierError::Config(
                "max_records_per_run must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for both tiers)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the retention window (in days)
    pub fn retention_days(mut self, days: u32) -> Self {
        self.config.retention_days = days;
        self
    }

    /// Set the number of archival worker threads
    pub fn archive_workers(mut self, count: usize) -> Self {
        self.config.archive_workers = count;
        self
    }

    /// Set the cold-write verification mode
    pub fn verify_mode(mut self, mode: VerifyMode) -> Self {
        self.config.verify_mode = mode;
        self
    }

    /// Cap the number of records migrated per run
    pub fn max_records_per_run(mut self, limit: Option<usize>) -> Self {
        self.config.max_records_per_run = limit;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
