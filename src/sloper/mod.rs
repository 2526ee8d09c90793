//! Sync engine for the upstream "sloper" guidebook source: fetch,
//! match against the external-reference store, insert or update,
//! duplicate resolution, and post-sync cleanup.

pub mod client;
pub mod engine;
pub mod error;
pub mod fields;
pub mod log;
pub mod refs;

pub use client::{HttpSloperApi, SloperApi};
pub use engine::{cleanup_pass, sync_crags_and_sectors, sync_issues, sync_routes, SectorHandle};
pub use error::SyncError;
pub use log::{SyncLog, SyncStats};
