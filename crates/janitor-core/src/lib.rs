//! Core of the endpoint janitor
//!
//! This crate contains:
//! - Lifecycle tag interpretation (`KeepAlive` / `KeepUntil`)
//! - The retention evaluator, a pure keep/terminate classifier
//! - Provisioning of shared endpoints and their access grant
//! - The per-workspace cleanup pass and report rendering

pub mod lifecycle;
mod engine;
mod provision;
mod report;
mod retention;

pub use engine::*;
pub use provision::*;
pub use report::*;
pub use retention::*;
