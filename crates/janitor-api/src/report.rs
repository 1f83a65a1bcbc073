//! Report types produced by a janitor run

use chrono::{DateTime, Local};
use janitor_util::{EndpointId, RunId};
use serde::{Deserialize, Serialize};

use crate::{TerminationCandidate, REPORT_VERSION};

/// What happened to a termination candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Delete call succeeded
    Deleted,
    /// Would have been deleted; run was a dry run
    DryRun,
    /// Delete call failed
    Failed { error: String },
}

/// A termination candidate and the result of acting on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAction {
    pub candidate: TerminationCandidate,
    pub outcome: ActionOutcome,
}

/// Result of ensuring one shared endpoint exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionAction {
    pub name: String,
    pub endpoint_id: Option<EndpointId>,
    /// Endpoint did not exist and was created in this pass
    pub created: bool,
    pub acl_applied: bool,
    pub error: Option<String>,
}

/// Everything one workspace pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceReport {
    pub workspace: String,
    pub url: String,
    #[serde(default)]
    pub provisioned: Vec<ProvisionAction>,
    #[serde(default)]
    pub endpoints: Vec<EndpointAction>,
    /// Set when the pass could not complete (e.g. the listing failed)
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkspaceReport {
    pub fn new(workspace: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            url: url.into(),
            provisioned: Vec::new(),
            endpoints: Vec::new(),
            error: None,
        }
    }

    pub fn deleted_count(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|a| a.outcome == ActionOutcome::Deleted)
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|a| matches!(a.outcome, ActionOutcome::Failed { .. }))
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.error.is_none()
            && self.failed_count() == 0
            && self.provisioned.iter().all(|p| p.error.is_none())
    }
}

/// Combined report for a run across all workspaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub report_version: u32,
    pub run_id: RunId,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub dry_run: bool,
    pub workspaces: Vec<WorkspaceReport>,
}

impl RunReport {
    pub fn new(
        run_id: RunId,
        started_at: DateTime<Local>,
        finished_at: DateTime<Local>,
        dry_run: bool,
        workspaces: Vec<WorkspaceReport>,
    ) -> Self {
        Self {
            report_version: REPORT_VERSION,
            run_id,
            started_at,
            finished_at,
            dry_run,
            workspaces,
        }
    }

    pub fn total_deleted(&self) -> usize {
        self.workspaces.iter().map(|w| w.deleted_count()).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.workspaces.iter().map(|w| w.failed_count()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.workspaces.iter().all(|w| w.is_clean())
    }
}
