//! Mock workspace for testing

use async_trait::async_trait;
use janitor_api::{AccessControlRequest, Endpoint, EndpointSpec, EndpointState};
use janitor_util::EndpointId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::{WorkspaceClient, WorkspaceError, WorkspaceResult};

/// A remote call recorded by [`MockWorkspace`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    List,
    Create { name: String },
    Stop { id: EndpointId },
    Delete { id: EndpointId },
    SetPermissions { id: EndpointId, acl: AccessControlRequest },
}

/// In-memory workspace for unit/integration testing
pub struct MockWorkspace {
    next_id: AtomicU64,
    endpoints: Arc<Mutex<Vec<Endpoint>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,

    /// Configure listing to fail
    pub fail_list: Arc<Mutex<bool>>,

    /// Configure endpoint creation to fail
    pub fail_create: Arc<Mutex<bool>>,

    /// Configure stop calls to fail, leaving the endpoint running
    pub fail_stop: Arc<Mutex<bool>>,

    /// Configure ACL updates to fail
    pub fail_permissions: Arc<Mutex<bool>>,

    /// Endpoint IDs whose delete call fails
    pub fail_delete: Arc<Mutex<HashSet<EndpointId>>>,
}

impl MockWorkspace {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            endpoints: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_list: Arc::new(Mutex::new(false)),
            fail_create: Arc::new(Mutex::new(false)),
            fail_stop: Arc::new(Mutex::new(false)),
            fail_permissions: Arc::new(Mutex::new(false)),
            fail_delete: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_endpoints(self, endpoints: Vec<Endpoint>) -> Self {
        *self.endpoints.lock().unwrap() = endpoints;
        self
    }

    /// Current endpoint snapshot
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.lock().unwrap().clone()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make the delete call for `id` fail
    pub fn fail_delete_of(&self, id: impl Into<EndpointId>) {
        self.fail_delete.lock().unwrap().insert(id.into());
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn mock_error(endpoint: &str) -> WorkspaceError {
        WorkspaceError::Api {
            endpoint: endpoint.to_string(),
            status: 500,
            body: "Mock failure".into(),
        }
    }
}

impl Default for MockWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkspaceClient for MockWorkspace {
    async fn list_endpoints(&self) -> WorkspaceResult<Vec<Endpoint>> {
        self.record(MockCall::List);
        if *self.fail_list.lock().unwrap() {
            return Err(Self::mock_error("GET /sql/endpoints/"));
        }
        Ok(self.endpoints())
    }

    async fn create_endpoint(&self, spec: &EndpointSpec) -> WorkspaceResult<EndpointId> {
        self.record(MockCall::Create {
            name: spec.name.clone(),
        });
        if *self.fail_create.lock().unwrap() {
            return Err(Self::mock_error("POST /sql/endpoints/"));
        }

        let id = EndpointId::new(format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        self.endpoints.lock().unwrap().push(Endpoint {
            id: id.clone(),
            name: spec.name.clone(),
            state: EndpointState::Starting,
            creator_name: Some("janitor".into()),
            auto_stop_mins: spec.auto_stop_mins,
            min_num_clusters: Some(spec.min_num_clusters),
            max_num_clusters: Some(spec.max_num_clusters),
            cluster_size: Some(spec.cluster_size.clone()),
            tags: Some(spec.tags.clone()),
            enable_photon: Some(spec.enable_photon),
            spot_instance_policy: Some(spec.spot_instance_policy),
        });

        Ok(id)
    }

    async fn stop_endpoint(&self, id: &EndpointId) -> WorkspaceResult<()> {
        self.record(MockCall::Stop { id: id.clone() });
        if *self.fail_stop.lock().unwrap() {
            return Err(Self::mock_error(&format!("POST /sql/endpoints/{id}/stop")));
        }

        let mut endpoints = self.endpoints.lock().unwrap();
        match endpoints.iter_mut().find(|e| &e.id == id) {
            Some(endpoint) => {
                endpoint.state = EndpointState::Stopped;
                Ok(())
            }
            None => Err(WorkspaceError::EndpointNotFound(id.clone())),
        }
    }

    async fn delete_endpoint(&self, id: &EndpointId) -> WorkspaceResult<()> {
        self.record(MockCall::Delete { id: id.clone() });
        if self.fail_delete.lock().unwrap().contains(id) {
            return Err(Self::mock_error(&format!("DELETE /sql/endpoints/{id}")));
        }

        let mut endpoints = self.endpoints.lock().unwrap();
        let before = endpoints.len();
        endpoints.retain(|e| &e.id != id);
        if endpoints.len() == before {
            return Err(WorkspaceError::EndpointNotFound(id.clone()));
        }
        Ok(())
    }

    async fn set_permissions(
        &self,
        id: &EndpointId,
        acl: &AccessControlRequest,
    ) -> WorkspaceResult<()> {
        self.record(MockCall::SetPermissions {
            id: id.clone(),
            acl: acl.clone(),
        });
        if *self.fail_permissions.lock().unwrap() {
            return Err(Self::mock_error(&format!("PATCH /permissions/sql/endpoints/{id}")));
        }
        Ok(())
    }
}
