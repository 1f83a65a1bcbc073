//! Workspace control-plane interface for the endpoint janitor
//!
//! This crate defines the boundary between the janitor core and the remote
//! workspace API. It contains no transport code itself; see
//! `janitor-databricks` for the HTTP implementation.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
