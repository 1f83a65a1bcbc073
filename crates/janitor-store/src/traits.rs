//! Store trait definitions

use chrono::{DateTime, Local};
use janitor_api::{EndpointAction, RunReport};
use janitor_util::RunId;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Termination ledger

    /// Record what happened to one termination candidate
    fn record_termination(&self, record: &TerminationRecord) -> StoreResult<()>;

    /// All ledger rows for a run, in insertion order
    fn get_terminations(&self, run_id: &RunId) -> StoreResult<Vec<TerminationRecord>>;

    // Run reports

    /// Save the combined report of a run
    fn save_run_report(&self, report: &RunReport) -> StoreResult<()>;

    /// Load a previously saved run report
    fn load_run_report(&self, run_id: &RunId) -> StoreResult<Option<RunReport>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// One row of the termination ledger
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TerminationRecord {
    pub run_id: RunId,
    pub workspace: String,
    pub recorded_at: DateTime<Local>,
    pub action: EndpointAction,
}
