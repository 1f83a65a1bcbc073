//! Data types for the endpoint janitor
//!
//! This crate defines the shapes shared by every other crate:
//! - SQL endpoint snapshots and creation payloads (as seen on the wire)
//! - Access-control requests
//! - Lifecycle signals, retention decisions and termination candidates
//! - Per-workspace and per-run reports

mod report;
mod retention;
mod types;

pub use report::*;
pub use retention::*;
pub use types::*;

/// Current report format version
pub const REPORT_VERSION: u32 = 1;
