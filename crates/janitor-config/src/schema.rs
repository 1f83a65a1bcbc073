//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Report settings
    #[serde(default)]
    pub report: RawReportConfig,

    /// Retention settings
    #[serde(default)]
    pub retention: RawRetentionConfig,

    /// Grant applied to every shared endpoint (default: `users` / `CAN_USE`)
    #[serde(default)]
    pub access_control: Option<RawAccessControl>,

    /// Shared endpoint templates (default: "Shared Endpoint" and "Shared Endpoint - Photon")
    #[serde(default)]
    pub shared_endpoints: Option<Vec<RawEndpointTemplate>>,

    /// Workspaces to clean up, in order
    #[serde(default)]
    pub workspaces: Vec<RawWorkspace>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Directory reports are written to (default: `<data_dir>/reports`)
    pub report_dir: Option<PathBuf>,

    /// Per-request timeout for control-plane calls
    pub request_timeout_seconds: Option<u64>,
}

/// Report settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReportConfig {
    /// Subject line for the report
    pub subject: Option<String>,

    /// Report recipients
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Retention settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRetentionConfig {
    /// Endpoint names that are never terminated
    pub exempt_names: Option<Vec<String>>,
}

/// Access-control grant
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAccessControl {
    pub group_name: String,

    /// "CAN_USE", "CAN_MANAGE" or "IS_OWNER"
    pub permission_level: String,
}

/// Shared endpoint template
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawEndpointTemplate {
    pub name: String,

    #[serde(default = "default_cluster_size")]
    pub cluster_size: String,

    #[serde(default = "default_min_clusters")]
    pub min_num_clusters: u32,

    #[serde(default = "default_max_clusters")]
    pub max_num_clusters: u32,

    pub auto_stop_mins: Option<u32>,

    /// "COST_OPTIMIZED", "RELIABILITY_OPTIMIZED" or "POLICY_UNSPECIFIED"
    #[serde(default = "default_spot_policy")]
    pub spot_instance_policy: String,

    #[serde(default)]
    pub enable_photon: bool,

    /// Tags applied at creation (default: `KeepAlive = "True"`)
    pub tags: Option<Vec<RawTag>>,
}

/// A `{key, value}` tag
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// Workspace definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawWorkspace {
    /// Display name, used in reports
    pub name: String,

    /// Base URL of the workspace (e.g. https://example.cloud.databricks.com)
    pub url: String,

    /// API token, inline
    pub token: Option<String>,

    /// Name of an environment variable holding the API token
    pub token_env: Option<String>,

    /// Keep the workspace in config but leave it alone
    #[serde(default)]
    pub skip: bool,
}

fn default_cluster_size() -> String {
    "Medium".to_string()
}

fn default_min_clusters() -> u32 {
    1
}

fn default_max_clusters() -> u32 {
    5
}

fn default_spot_policy() -> String {
    "COST_OPTIMIZED".to_string()
}
