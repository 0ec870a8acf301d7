//! Tier Context
//!
//! Everything the archiver and gateway share, built once at startup and
//! handed to both by reference.
//!
//! ## Responsibilities
//! - Own the hot and cold store handles
//! - Own the clock and partition-key strategy
//! - Open the directory-backed stores from a `Config`

use std::fs;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::partition::{IdAsPartitionKey, PartitionKeyStrategy};
use crate::store::{ColdStore, FsColdStore, FsHotStore, HotStore};

/// Store handles plus deployment choices
///
/// Handles are read-only after construction; cloning shares them.
#[derive(Clone)]
pub struct TierContext {
    pub config: Config,
    pub hot: Arc<dyn HotStore>,
    pub cold: Arc<dyn ColdStore>,
    pub clock: Arc<dyn Clock>,
    pub partitioner: Arc<dyn PartitionKeyStrategy>,
}

impl TierContext {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const HOT_DIR: &'static str = "hot";
    const COLD_DIR: &'static str = "cold";

    /// Wire arbitrary backends together with the system clock and
    /// the id-as-partition-key strategy
    pub fn new(config: Config, hot: Arc<dyn HotStore>, cold: Arc<dyn ColdStore>) -> Self {
        Self {
            config,
            hot,
            cold,
            clock: Arc::new(SystemClock),
            partitioner: Arc::new(IdAsPartitionKey),
        }
    }

    /// Open directory-backed stores under `config.data_dir`
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Create `hot/` and `cold/` if missing
    /// 3. Open both stores against the system clock
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(&config.data_dir)?;
        let hot = FsHotStore::open(&config.data_dir.join(Self::HOT_DIR))?;
        let cold = FsColdStore::open(&config.data_dir.join(Self::COLD_DIR))?;

        tracing::debug!(data_dir = %config.data_dir.display(), "Opened tier stores");

        Ok(Self::new(config, Arc::new(hot), Arc::new(cold)))
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the partition-key strategy
    pub fn with_partitioner(mut self, partitioner: Arc<dyn PartitionKeyStrategy>) -> Self {
        self.partitioner = partitioner;
        self
    }
}
