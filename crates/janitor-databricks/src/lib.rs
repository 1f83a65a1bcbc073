//! Workspace control-plane client over HTTP
//!
//! Provides:
//! - Bearer-token authenticated access to the SQL endpoints API
//! - Endpoint listing, creation, stop and delete
//! - Access-control updates on endpoints

mod client;

pub use client::*;
