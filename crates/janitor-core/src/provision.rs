//! Shared endpoint provisioning

use janitor_api::{AccessControlRequest, Endpoint, EndpointSpec, ProvisionAction};
use janitor_store::{AuditEvent, AuditEventType, Store};
use janitor_util::EndpointId;
use janitor_workspace_api::{WorkspaceClient, WorkspaceError};
use tracing::{info, warn};

/// Make sure every shared endpoint in `specs` exists and carries the grant.
///
/// A missing endpoint is created and then stopped straight away so it costs
/// nothing until first use. The grant is applied to new and existing
/// endpoints alike. Each endpoint is handled independently; a failure is
/// recorded on its [`ProvisionAction`] and the next one is attempted.
///
/// In a dry run nothing is created or changed.
pub async fn ensure_shared_endpoints(
    client: &dyn WorkspaceClient,
    specs: &[EndpointSpec],
    acl: &AccessControlRequest,
    workspace: &str,
    store: &dyn Store,
    dry_run: bool,
) -> Vec<ProvisionAction> {
    let existing = match client.list_endpoints().await {
        Ok(endpoints) => endpoints,
        Err(e) => {
            warn!(workspace = %workspace, error = %e, "Could not list endpoints for provisioning");
            return specs
                .iter()
                .map(|spec| {
                    record_failure(store, workspace, &spec.name, e.to_string());
                    ProvisionAction {
                        name: spec.name.clone(),
                        endpoint_id: None,
                        created: false,
                        acl_applied: false,
                        error: Some(e.to_string()),
                    }
                })
                .collect();
        }
    };

    let mut actions = Vec::with_capacity(specs.len());
    for spec in specs {
        let action = ensure_one(client, spec, acl, &existing, workspace, store, dry_run).await;
        actions.push(action);
    }
    actions
}

async fn ensure_one(
    client: &dyn WorkspaceClient,
    spec: &EndpointSpec,
    acl: &AccessControlRequest,
    existing: &[Endpoint],
    workspace: &str,
    store: &dyn Store,
    dry_run: bool,
) -> ProvisionAction {
    let mut action = ProvisionAction {
        name: spec.name.clone(),
        endpoint_id: None,
        created: false,
        acl_applied: false,
        error: None,
    };

    let mut matches = existing.iter().filter(|e| e.name == spec.name);
    let found = matches.next();
    if matches.next().is_some() {
        warn!(
            workspace = %workspace,
            name = %spec.name,
            "Several endpoints share this name; granting on the first"
        );
    }

    if let Some(endpoint) = found {
        action.endpoint_id = Some(endpoint.id.clone());
    } else if dry_run {
        info!(workspace = %workspace, name = %spec.name, "Dry run: would create shared endpoint");
        return action;
    } else {
        match create_stopped(client, spec).await {
            Ok(id) => {
                info!(workspace = %workspace, name = %spec.name, endpoint_id = %id, "Shared endpoint created");
                let _ = store.append_audit(AuditEvent::new(AuditEventType::SharedEndpointCreated {
                    workspace: workspace.to_string(),
                    name: spec.name.clone(),
                    endpoint_id: id.clone(),
                }));
                action.endpoint_id = Some(id);
                action.created = true;
            }
            Err((None, e)) => {
                warn!(workspace = %workspace, name = %spec.name, error = %e, "Shared endpoint creation failed");
                record_failure(store, workspace, &spec.name, e.to_string());
                action.error = Some(e.to_string());
                return action;
            }
            // Created but still running: keep the stop error and grant anyway
            Err((Some(id), e)) => {
                warn!(workspace = %workspace, name = %spec.name, endpoint_id = %id, error = %e, "Shared endpoint created but not stopped");
                let _ = store.append_audit(AuditEvent::new(AuditEventType::SharedEndpointCreated {
                    workspace: workspace.to_string(),
                    name: spec.name.clone(),
                    endpoint_id: id.clone(),
                }));
                record_failure(store, workspace, &spec.name, e.to_string());
                action.endpoint_id = Some(id);
                action.created = true;
                action.error = Some(e.to_string());
            }
        }
    }

    if dry_run {
        return action;
    }

    // Both branches above leave an ID behind
    let Some(id) = action.endpoint_id.clone() else {
        return action;
    };

    match client.set_permissions(&id, acl).await {
        Ok(()) => {
            action.acl_applied = true;
            for entry in &acl.access_control_list {
                let _ = store.append_audit(AuditEvent::new(AuditEventType::PermissionsApplied {
                    workspace: workspace.to_string(),
                    endpoint_id: id.clone(),
                    group_name: entry.group_name.clone(),
                    permission_level: entry.permission_level.to_string(),
                }));
            }
        }
        Err(e) => {
            warn!(workspace = %workspace, endpoint_id = %id, error = %e, "Failed to apply grant");
            record_failure(store, workspace, &spec.name, e.to_string());
            action.error = Some(match action.error.take() {
                Some(earlier) => format!("{earlier}; {e}"),
                None => e.to_string(),
            });
        }
    }

    action
}

/// Create an endpoint and stop it. On a failed stop the new ID is returned
/// alongside the error.
async fn create_stopped(
    client: &dyn WorkspaceClient,
    spec: &EndpointSpec,
) -> Result<EndpointId, (Option<EndpointId>, WorkspaceError)> {
    let id = client.create_endpoint(spec).await.map_err(|e| (None, e))?;
    match client.stop_endpoint(&id).await {
        Ok(()) => Ok(id),
        Err(e) => Err((Some(id), e)),
    }
}

fn record_failure(store: &dyn Store, workspace: &str, name: &str, error: String) {
    let _ = store.append_audit(AuditEvent::new(AuditEventType::ProvisionFailed {
        workspace: workspace.to_string(),
        name: name.to_string(),
        error,
    }));
}
