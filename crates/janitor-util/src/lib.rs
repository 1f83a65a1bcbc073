//! Shared utilities for the endpoint janitor
//!
//! This crate provides:
//! - ID types (EndpointId, RunId)
//! - Clock helpers (local time and date, with a mock override in debug builds)
//! - Default paths for config, data, and report directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
