//! Audit event types

use chrono::{DateTime, Local};
use janitor_api::{KeepUntil, TerminationCandidate};
use janitor_util::{EndpointId, RunId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Run started
    RunStarted {
        run_id: RunId,
        dry_run: bool,
        workspace_count: usize,
    },

    /// Run finished
    RunFinished {
        run_id: RunId,
        deleted: usize,
        failed: usize,
    },

    /// Workspace is configured with `skip = true`
    WorkspaceSkipped { workspace: String },

    /// Workspace pass could not complete
    WorkspaceFailed { workspace: String, error: String },

    /// Shared endpoint was missing and has been created
    SharedEndpointCreated {
        workspace: String,
        name: String,
        endpoint_id: EndpointId,
    },

    /// ACL grant applied to a shared endpoint
    PermissionsApplied {
        workspace: String,
        endpoint_id: EndpointId,
        group_name: String,
        permission_level: String,
    },

    /// Creating or granting a shared endpoint failed
    ProvisionFailed {
        workspace: String,
        name: String,
        error: String,
    },

    /// Endpoint deleted by the retention pass
    EndpointTerminated {
        workspace: String,
        endpoint_id: EndpointId,
        name: String,
        keep_alive: bool,
        keep_until: KeepUntil,
    },

    /// Endpoint flagged but left alone because of dry run
    TerminationSkipped {
        workspace: String,
        endpoint_id: EndpointId,
    },

    /// Delete call failed
    TerminationFailed {
        workspace: String,
        endpoint_id: EndpointId,
        error: String,
    },
}

impl AuditEventType {
    pub fn terminated(workspace: &str, candidate: &TerminationCandidate) -> Self {
        AuditEventType::EndpointTerminated {
            workspace: workspace.to_string(),
            endpoint_id: candidate.cluster_id.clone(),
            name: candidate.cluster_name.clone(),
            keep_alive: candidate.keep_alive,
            keep_until: candidate.keep_until,
        }
    }
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: janitor_util::now(),
            event,
        }
    }
}
