//! # TierVault
//!
//! A two-tier record store with:
//! - A hot tier for recent, frequently accessed records
//! - A cold archive tier for records past a retention window
//! - Verified, write-before-delete archival that never loses a record
//! - Tiered reads that fall back from hot to cold transparently
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │         Gateway          │      │         Archiver         │
//! │  create ─► hot           │      │  query hot (age < cutoff)│
//! │  read   ─► hot, else cold│      │  put cold ─► confirm     │
//! └────────────┬─────────────┘      │  ─► delete hot           │
//!              │                    └────────────┬─────────────┘
//!              │          TierContext            │
//!              └──────────────┬──────────────────┘
//!                  ┌──────────┴──────────┐
//!                  ▼                     ▼
//!           ┌─────────────┐       ┌─────────────┐
//!           │  HotStore   │       │  ColdStore  │
//!           │ (id, pk)    │       │  {id}.json  │
//!           └─────────────┘       └─────────────┘
//! ```
//!
//! The archiver and gateway never talk to each other; they share only the
//! store handles held by `TierContext`.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod clock;

pub mod record;
pub mod partition;
pub mod store;
pub mod context;
pub mod archiver;
pub mod gateway;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{TierError, Result};
pub use config::{Config, VerifyMode};
pub use context::TierContext;
pub use record::{NewRecord, Record};
pub use archiver::{ArchivalReport, Archiver};
pub use gateway::{Fetched, Gateway, Tier};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TierVault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
