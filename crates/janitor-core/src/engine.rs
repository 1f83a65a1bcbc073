//! Per-workspace cleanup pass

use chrono::NaiveDate;
use janitor_api::{ActionOutcome, EndpointAction, TerminationCandidate, WorkspaceReport};
use janitor_config::{Policy, WorkspaceConfig};
use janitor_store::{AuditEvent, AuditEventType, Store, TerminationRecord};
use janitor_util::RunId;
use janitor_workspace_api::WorkspaceClient;
use std::sync::Arc;
use tracing::{info, warn};

use crate::provision::ensure_shared_endpoints;
use crate::RetentionEvaluator;

/// Drives provisioning and retention for one workspace at a time
pub struct Janitor {
    policy: Policy,
    store: Arc<dyn Store>,
}

impl Janitor {
    pub fn new(policy: Policy, store: Arc<dyn Store>) -> Self {
        info!(
            workspace_count = policy.workspaces.len(),
            shared_endpoints = policy.shared_endpoints.len(),
            "Janitor initialized"
        );
        Self { policy, store }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Evaluator bound to the configured exemptions and `today`
    pub fn evaluator(&self, today: NaiveDate) -> RetentionEvaluator {
        RetentionEvaluator::new(self.policy.retention.clone(), today)
    }

    /// Run a full pass against one workspace.
    ///
    /// Remote failures never abort the pass as a whole: provisioning and
    /// delete errors are recorded per endpoint, and a failed listing is
    /// reported on the returned [`WorkspaceReport`].
    pub async fn run_workspace(
        &self,
        client: &dyn WorkspaceClient,
        workspace: &WorkspaceConfig,
        run_id: &RunId,
        today: NaiveDate,
        dry_run: bool,
    ) -> WorkspaceReport {
        let mut report = WorkspaceReport::new(&workspace.name, &workspace.url);
        info!(workspace = %workspace.name, dry_run, "Starting workspace pass");

        report.provisioned = ensure_shared_endpoints(
            client,
            &self.policy.shared_endpoints,
            &self.policy.access_control,
            &workspace.name,
            self.store.as_ref(),
            dry_run,
        )
        .await;

        let endpoints = match client.list_endpoints().await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!(workspace = %workspace.name, error = %e, "Failed to list endpoints");
                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::WorkspaceFailed {
                    workspace: workspace.name.clone(),
                    error: e.to_string(),
                }));
                report.error = Some(e.to_string());
                return report;
            }
        };

        let evaluator = self.evaluator(today);
        if dry_run {
            for (endpoint, classification) in evaluator.evaluate_all(&endpoints) {
                info!(
                    workspace = %workspace.name,
                    endpoint_id = %endpoint.id,
                    name = %endpoint.name,
                    state = ?endpoint.state,
                    keep_alive = classification.signal.keep_alive,
                    keep_until = %classification.signal.keep_until,
                    decision = ?classification.decision,
                    "Dry run: lifecycle"
                );
            }
        }
        let eligible = endpoints.iter().filter(|e| evaluator.is_eligible(e)).count();
        let candidates = evaluator.select_termination_candidates(&endpoints);
        info!(
            workspace = %workspace.name,
            listed = endpoints.len(),
            stopped_not_exempt = eligible,
            candidates = candidates.len(),
            "Retention evaluated"
        );

        for candidate in candidates {
            let action = self
                .terminate(client, &workspace.name, candidate, dry_run)
                .await;

            let _ = self.store.record_termination(&TerminationRecord {
                run_id: run_id.clone(),
                workspace: workspace.name.clone(),
                recorded_at: janitor_util::now(),
                action: action.clone(),
            });
            report.endpoints.push(action);
        }

        info!(
            workspace = %workspace.name,
            deleted = report.deleted_count(),
            failed = report.failed_count(),
            "Workspace pass finished"
        );
        report
    }

    async fn terminate(
        &self,
        client: &dyn WorkspaceClient,
        workspace: &str,
        candidate: TerminationCandidate,
        dry_run: bool,
    ) -> EndpointAction {
        let id = candidate.cluster_id.clone();

        if dry_run {
            info!(workspace = %workspace, endpoint_id = %id, name = %candidate.cluster_name, "Dry run: would delete endpoint");
            let _ = self.store.append_audit(AuditEvent::new(AuditEventType::TerminationSkipped {
                workspace: workspace.to_string(),
                endpoint_id: id,
            }));
            return EndpointAction {
                candidate,
                outcome: ActionOutcome::DryRun,
            };
        }

        let outcome = match client.delete_endpoint(&id).await {
            Ok(()) => {
                info!(
                    workspace = %workspace,
                    endpoint_id = %id,
                    name = %candidate.cluster_name,
                    keep_alive = candidate.keep_alive,
                    keep_until = %candidate.keep_until,
                    "Endpoint deleted"
                );
                let _ = self
                    .store
                    .append_audit(AuditEvent::new(AuditEventType::terminated(workspace, &candidate)));
                ActionOutcome::Deleted
            }
            Err(e) => {
                warn!(workspace = %workspace, endpoint_id = %id, error = %e, "Failed to delete endpoint");
                let _ = self.store.append_audit(AuditEvent::new(AuditEventType::TerminationFailed {
                    workspace: workspace.to_string(),
                    endpoint_id: id,
                    error: e.to_string(),
                }));
                ActionOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        EndpointAction { candidate, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use janitor_api::{CustomTag, Endpoint, EndpointState, EndpointTags};
    use janitor_config::TokenSource;
    use janitor_store::SqliteStore;
    use janitor_util::EndpointId;
    use janitor_workspace_api::{MockCall, MockWorkspace};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn workspace() -> WorkspaceConfig {
        WorkspaceConfig {
            name: "dev".into(),
            url: "https://dev.example.com".into(),
            token: TokenSource::Inline("dapi-test".into()),
            skip: false,
        }
    }

    fn endpoint(id: &str, name: &str, state: EndpointState, tags: &[(&str, &str)]) -> Endpoint {
        Endpoint {
            id: EndpointId::new(id),
            name: name.into(),
            state,
            creator_name: Some("dev@example.com".into()),
            auto_stop_mins: Some(30),
            min_num_clusters: Some(1),
            max_num_clusters: Some(1),
            cluster_size: Some("2X-Small".into()),
            tags: Some(EndpointTags::new(
                tags.iter().map(|(k, v)| CustomTag::new(*k, *v)).collect(),
            )),
            enable_photon: None,
            spot_instance_policy: None,
        }
    }

    fn fleet() -> Vec<Endpoint> {
        vec![
            endpoint("s1", "Shared Endpoint", EndpointState::Stopped, &[("KeepAlive", "True")]),
            endpoint("p1", "Shared Endpoint - Photon", EndpointState::Stopped, &[]),
            endpoint("old", "old-experiment", EndpointState::Stopped, &[]),
            endpoint("busy", "busy", EndpointState::Running, &[]),
            endpoint("kept", "kept", EndpointState::Stopped, &[("keepalive", "")]),
            endpoint(
                "lapsed",
                "lapsed",
                EndpointState::Stopping,
                &[("KeepAlive", "True"), ("KeepUntil", "01/01/2024")],
            ),
        ]
    }

    fn janitor(store: Arc<SqliteStore>) -> Janitor {
        Janitor::new(Policy::default(), store)
    }

    #[tokio::test]
    async fn test_full_pass_deletes_candidates() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let janitor = janitor(store.clone());
        let ws = MockWorkspace::new().with_endpoints(fleet());
        let run_id = RunId::new();

        let report = janitor
            .run_workspace(&ws, &workspace(), &run_id, today(), false)
            .await;

        assert!(report.is_clean());
        assert_eq!(report.provisioned.len(), 2);
        assert!(report.provisioned.iter().all(|p| !p.created && p.acl_applied));

        let deleted: Vec<_> = report
            .endpoints
            .iter()
            .map(|a| a.candidate.cluster_id.as_str())
            .collect();
        assert_eq!(deleted, vec!["old", "lapsed"]);
        assert_eq!(report.deleted_count(), 2);

        let remaining: Vec<_> = ws.endpoints().into_iter().map(|e| e.id.to_string()).collect();
        assert_eq!(remaining, vec!["s1", "p1", "busy", "kept"]);

        let ledger = store.get_terminations(&run_id).unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|r| r.action.outcome == ActionOutcome::Deleted));
    }

    #[tokio::test]
    async fn test_failed_delete_does_not_stop_pass() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let janitor = janitor(store.clone());
        let ws = MockWorkspace::new().with_endpoints(fleet());
        ws.fail_delete_of("old");

        let report = janitor
            .run_workspace(&ws, &workspace(), &RunId::new(), today(), false)
            .await;

        assert!(!report.is_clean());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.deleted_count(), 1);
        assert!(matches!(
            report.endpoints[0].outcome,
            ActionOutcome::Failed { .. }
        ));
        assert!(ws.endpoints().iter().any(|e| e.id.as_str() == "old"));
        assert!(!ws.endpoints().iter().any(|e| e.id.as_str() == "lapsed"));

        let audits = store.get_recent_audits(50).unwrap();
        assert!(audits
            .iter()
            .any(|a| matches!(a.event, AuditEventType::TerminationFailed { .. })));
    }

    #[tokio::test]
    async fn test_dry_run_deletes_nothing() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let janitor = janitor(store.clone());
        let ws = MockWorkspace::new().with_endpoints(fleet());

        let report = janitor
            .run_workspace(&ws, &workspace(), &RunId::new(), today(), true)
            .await;

        assert_eq!(report.endpoints.len(), 2);
        assert!(report
            .endpoints
            .iter()
            .all(|a| a.outcome == ActionOutcome::DryRun));
        assert_eq!(ws.endpoints().len(), 6);
        assert!(ws.calls().iter().all(|c| matches!(c, MockCall::List)));
    }

    #[tokio::test]
    async fn test_listing_failure_reported() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let janitor = janitor(store.clone());
        let ws = MockWorkspace::new();
        *ws.fail_list.lock().unwrap() = true;

        let report = janitor
            .run_workspace(&ws, &workspace(), &RunId::new(), today(), false)
            .await;

        assert!(report.error.is_some());
        assert!(report.endpoints.is_empty());
        assert!(!ws.calls().iter().any(|c| matches!(c, MockCall::Delete { .. })));

        let audits = store.get_recent_audits(1).unwrap();
        assert!(matches!(audits[0].event, AuditEventType::WorkspaceFailed { .. }));
    }

    #[tokio::test]
    async fn test_created_shared_endpoints_survive_pass() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let janitor = janitor(store);
        let ws = MockWorkspace::new();

        let report = janitor
            .run_workspace(&ws, &workspace(), &RunId::new(), today(), false)
            .await;

        assert!(report.provisioned.iter().all(|p| p.created));
        assert!(report.endpoints.is_empty());
        assert_eq!(ws.endpoints().len(), 2);
    }
}
