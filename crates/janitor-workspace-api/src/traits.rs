//! Workspace client trait

use async_trait::async_trait;
use janitor_api::{AccessControlRequest, Endpoint, EndpointSpec};
use janitor_util::EndpointId;
use thiserror::Error;

/// Errors from workspace control-plane operations
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(EndpointId),

    #[error("Client configuration error: {0}")]
    Config(String),
}

pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Remote operations the janitor needs from a workspace.
///
/// Every method is a single remote call: no retries, no batching. A failure
/// is returned to the caller, who decides whether the rest of the pass goes on.
#[async_trait]
pub trait WorkspaceClient: Send + Sync {
    /// List every SQL endpoint in the workspace
    async fn list_endpoints(&self) -> WorkspaceResult<Vec<Endpoint>>;

    /// Create an endpoint from a spec, returning its new ID
    async fn create_endpoint(&self, spec: &EndpointSpec) -> WorkspaceResult<EndpointId>;

    /// Ask a running endpoint to stop
    async fn stop_endpoint(&self, id: &EndpointId) -> WorkspaceResult<()>;

    /// Delete an endpoint
    async fn delete_endpoint(&self, id: &EndpointId) -> WorkspaceResult<()>;

    /// Add grants to an endpoint's access-control list
    async fn set_permissions(
        &self,
        id: &EndpointId,
        acl: &AccessControlRequest,
    ) -> WorkspaceResult<()>;
}
