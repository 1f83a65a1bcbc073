//! SQL endpoint types as exchanged with the workspace control plane

use janitor_util::EndpointId;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a SQL endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Deleting,
    Deleted,
    /// Forward-compatible catch-all.
    #[default]
    #[serde(other)]
    Unknown,
}

impl EndpointState {
    /// Whether the endpoint is stopped or on its way there
    pub fn is_stopped(&self) -> bool {
        matches!(self, EndpointState::Stopped | EndpointState::Stopping)
    }
}

impl std::fmt::Display for EndpointState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EndpointState::Starting => "STARTING",
            EndpointState::Running => "RUNNING",
            EndpointState::Stopping => "STOPPING",
            EndpointState::Stopped => "STOPPED",
            EndpointState::Deleting => "DELETING",
            EndpointState::Deleted => "DELETED",
            EndpointState::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A single `{key, value}` tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl CustomTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Tag block of an endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_tags: Option<Vec<CustomTag>>,
}

impl EndpointTags {
    pub fn new(custom_tags: Vec<CustomTag>) -> Self {
        Self {
            custom_tags: Some(custom_tags),
        }
    }
}

/// Spot instance policy for endpoint clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpotInstancePolicy {
    #[default]
    CostOptimized,
    ReliabilityOptimized,
    PolicyUnspecified,
}

/// Snapshot of a SQL endpoint as returned by the listing call
///
/// Only `id` and `name` are required; every descriptive attribute is
/// optional so that a partially populated listing still deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub name: String,
    #[serde(default)]
    pub state: EndpointState,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub auto_stop_mins: Option<u32>,
    #[serde(default)]
    pub min_num_clusters: Option<u32>,
    #[serde(default)]
    pub max_num_clusters: Option<u32>,
    #[serde(default)]
    pub cluster_size: Option<String>,
    #[serde(default)]
    pub tags: Option<EndpointTags>,
    #[serde(default)]
    pub enable_photon: Option<bool>,
    #[serde(default)]
    pub spot_instance_policy: Option<SpotInstancePolicy>,
}

impl Endpoint {
    /// Custom tags in their original order; empty when the block is absent
    pub fn custom_tags(&self) -> &[CustomTag] {
        self.tags
            .as_ref()
            .and_then(|t| t.custom_tags.as_deref())
            .unwrap_or(&[])
    }
}

/// Response body of `GET /sql/endpoints/`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListEndpointsResponse {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Response body of `POST /sql/endpoints/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEndpointResponse {
    pub id: EndpointId,
}

/// Creation payload for a SQL endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub name: String,
    pub cluster_size: String,
    pub min_num_clusters: u32,
    pub max_num_clusters: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_stop_mins: Option<u32>,
    pub spot_instance_policy: SpotInstancePolicy,
    pub enable_photon: bool,
    pub tags: EndpointTags,
}

/// Permission level granted on an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    CanUse,
    CanManage,
    IsOwner,
}

impl std::fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PermissionLevel::CanUse => "CAN_USE",
            PermissionLevel::CanManage => "CAN_MANAGE",
            PermissionLevel::IsOwner => "IS_OWNER",
        };
        f.write_str(s)
    }
}

/// One group grant in an access-control list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlEntry {
    pub group_name: String,
    pub permission_level: PermissionLevel,
}

/// Body of `PATCH /permissions/sql/endpoints/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlRequest {
    pub access_control_list: Vec<AccessControlEntry>,
}

impl AccessControlRequest {
    pub fn single(group_name: impl Into<String>, permission_level: PermissionLevel) -> Self {
        Self {
            access_control_list: vec![AccessControlEntry {
                group_name: group_name.into(),
                permission_level,
            }],
        }
    }
}
