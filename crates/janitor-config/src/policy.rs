//! Validated policy structures

use crate::schema::{RawAccessControl, RawConfig, RawEndpointTemplate, RawWorkspace};
use crate::validation::{parse_permission_level, parse_spot_policy};
use crate::{ConfigError, ConfigResult};
use janitor_api::{
    AccessControlRequest, CustomTag, EndpointSpec, EndpointTags, PermissionLevel,
    SpotInstancePolicy,
};
use std::path::PathBuf;
use std::time::Duration;

/// Name of the general-purpose shared endpoint
pub const SHARED_ENDPOINT_NAME: &str = "Shared Endpoint";

/// Name of the photon-enabled shared endpoint
pub const PHOTON_ENDPOINT_NAME: &str = "Shared Endpoint - Photon";

/// Endpoints that are never terminated unless config says otherwise
pub const DEFAULT_EXEMPT_NAMES: [&str; 4] = [
    SHARED_ENDPOINT_NAME,
    PHOTON_ENDPOINT_NAME,
    "RIVERY_ENDPOINT",
    "FIVETRAN_ENDPOINT",
];

/// Default report subject
pub const DEFAULT_REPORT_SUBJECT: &str = "Automated Endpoints Usage Report";

/// Validated policy ready for use by the core
#[derive(Debug, Clone)]
pub struct Policy {
    pub service: ServiceConfig,
    pub report: ReportConfig,
    pub retention: RetentionPolicy,

    /// Grant applied to every shared endpoint
    pub access_control: AccessControlRequest,

    /// Endpoints that must always exist in every workspace
    pub shared_endpoints: Vec<EndpointSpec>,

    /// Workspaces in config order
    pub workspaces: Vec<WorkspaceConfig>,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let retention = raw
            .retention
            .exempt_names
            .map(RetentionPolicy::new)
            .unwrap_or_default();

        let access_control = raw
            .access_control
            .map(convert_access_control)
            .unwrap_or_else(default_access_control);

        let shared_endpoints = raw
            .shared_endpoints
            .map(|t| t.into_iter().map(convert_template).collect())
            .unwrap_or_else(default_shared_endpoints);

        let report = ReportConfig {
            subject: raw
                .report
                .subject
                .unwrap_or_else(|| DEFAULT_REPORT_SUBJECT.to_string()),
            recipients: raw.report.recipients,
        };

        Self {
            service: ServiceConfig::from_raw(raw.service),
            report,
            retention,
            access_control,
            shared_endpoints,
            workspaces: raw.workspaces.into_iter().map(WorkspaceConfig::from_raw).collect(),
        }
    }

    /// Get workspace by name
    pub fn get_workspace(&self, name: &str) -> Option<&WorkspaceConfig> {
        self.workspaces.iter().find(|w| w.name == name)
    }

    /// Workspaces that are not marked `skip`
    pub fn active_workspaces(&self) -> impl Iterator<Item = &WorkspaceConfig> {
        self.workspaces.iter().filter(|w| !w.skip)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            report: ReportConfig::default(),
            retention: RetentionPolicy::default(),
            access_control: default_access_control(),
            shared_endpoints: default_shared_endpoints(),
            workspaces: Vec::new(),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub report_dir: PathBuf,
    pub request_timeout: Duration,
}

impl ServiceConfig {
    fn from_raw(raw: crate::schema::RawServiceConfig) -> Self {
        let data_dir = raw
            .data_dir
            .unwrap_or_else(janitor_util::default_data_dir);
        let report_dir = raw
            .report_dir
            .unwrap_or_else(|| janitor_util::report_dir_in(&data_dir));

        Self {
            data_dir,
            report_dir,
            request_timeout: Duration::from_secs(raw.request_timeout_seconds.unwrap_or(30)),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(Default::default())
    }
}

/// Report configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub subject: String,
    pub recipients: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_REPORT_SUBJECT.to_string(),
            recipients: Vec::new(),
        }
    }
}

/// Names that the retention pass never terminates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    exempt_names: Vec<String>,
}

impl RetentionPolicy {
    pub fn new(exempt_names: Vec<String>) -> Self {
        Self { exempt_names }
    }

    /// Exact, case-sensitive name match
    pub fn is_exempt(&self, name: &str) -> bool {
        self.exempt_names.iter().any(|n| n == name)
    }

    pub fn exempt_names(&self) -> &[String] {
        &self.exempt_names
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXEMPT_NAMES.iter().map(|s| s.to_string()).collect())
    }
}

/// Where a workspace's API token comes from
#[derive(Clone, PartialEq, Eq)]
pub enum TokenSource {
    Inline(String),
    Env(String),
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Inline(_) => f.write_str("Inline(<redacted>)"),
            TokenSource::Env(var) => f.debug_tuple("Env").field(var).finish(),
        }
    }
}

/// Validated workspace definition
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub name: String,
    pub url: String,
    pub token: TokenSource,
    pub skip: bool,
}

impl WorkspaceConfig {
    fn from_raw(raw: RawWorkspace) -> Self {
        // Validation guarantees exactly one source is present
        let token = match (raw.token, raw.token_env) {
            (Some(token), _) => TokenSource::Inline(token),
            (None, Some(var)) => TokenSource::Env(var),
            (None, None) => TokenSource::Inline(String::new()),
        };

        Self {
            name: raw.name,
            url: raw.url.trim_end_matches('/').to_string(),
            token,
            skip: raw.skip,
        }
    }

    /// Resolve the API token, reading the environment if needed
    pub fn resolve_token(&self) -> ConfigResult<String> {
        match &self.token {
            TokenSource::Inline(token) => Ok(token.clone()),
            TokenSource::Env(var) => match std::env::var(var) {
                Ok(token) if !token.trim().is_empty() => Ok(token),
                _ => Err(ConfigError::MissingToken {
                    workspace: self.name.clone(),
                    var: var.clone(),
                }),
            },
        }
    }
}

// Conversion helpers

fn convert_access_control(raw: RawAccessControl) -> AccessControlRequest {
    let level = parse_permission_level(&raw.permission_level).unwrap_or(PermissionLevel::CanUse);
    AccessControlRequest::single(raw.group_name, level)
}

fn convert_template(raw: RawEndpointTemplate) -> EndpointSpec {
    let tags = raw
        .tags
        .map(|tags| {
            tags.into_iter()
                .map(|t| CustomTag::new(t.key, t.value))
                .collect()
        })
        .unwrap_or_else(default_shared_tags);

    EndpointSpec {
        name: raw.name,
        cluster_size: raw.cluster_size,
        min_num_clusters: raw.min_num_clusters,
        max_num_clusters: raw.max_num_clusters,
        auto_stop_mins: raw.auto_stop_mins,
        spot_instance_policy: parse_spot_policy(&raw.spot_instance_policy)
            .unwrap_or(SpotInstancePolicy::CostOptimized),
        enable_photon: raw.enable_photon,
        tags: EndpointTags::new(tags),
    }
}

fn default_access_control() -> AccessControlRequest {
    AccessControlRequest::single("users", PermissionLevel::CanUse)
}

fn default_shared_tags() -> Vec<CustomTag> {
    vec![CustomTag::new("KeepAlive", "True")]
}

fn shared_template(name: &str, enable_photon: bool) -> EndpointSpec {
    EndpointSpec {
        name: name.to_string(),
        cluster_size: "Medium".into(),
        min_num_clusters: 1,
        max_num_clusters: 5,
        auto_stop_mins: None,
        spot_instance_policy: SpotInstancePolicy::CostOptimized,
        enable_photon,
        tags: EndpointTags::new(default_shared_tags()),
    }
}

fn default_shared_endpoints() -> Vec<EndpointSpec> {
    vec![
        shared_template(SHARED_ENDPOINT_NAME, false),
        shared_template(PHOTON_ENDPOINT_NAME, true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_templates() {
        let policy = Policy::default();
        assert_eq!(policy.shared_endpoints.len(), 2);

        let shared = &policy.shared_endpoints[0];
        assert_eq!(shared.name, "Shared Endpoint");
        assert!(!shared.enable_photon);
        assert_eq!(shared.cluster_size, "Medium");
        assert_eq!((shared.min_num_clusters, shared.max_num_clusters), (1, 5));
        assert_eq!(shared.spot_instance_policy, SpotInstancePolicy::CostOptimized);
        assert_eq!(
            shared.tags.custom_tags.as_deref(),
            Some(&[CustomTag::new("KeepAlive", "True")][..])
        );

        let photon = &policy.shared_endpoints[1];
        assert_eq!(photon.name, "Shared Endpoint - Photon");
        assert!(photon.enable_photon);
    }

    #[test]
    fn default_grant() {
        let policy = Policy::default();
        assert_eq!(
            policy.access_control,
            AccessControlRequest::single("users", PermissionLevel::CanUse)
        );
    }

    #[test]
    fn exemption_is_exact() {
        let retention = RetentionPolicy::default();
        assert!(retention.is_exempt("Shared Endpoint"));
        assert!(retention.is_exempt("FIVETRAN_ENDPOINT"));
        assert!(!retention.is_exempt("shared endpoint"));
        assert!(!retention.is_exempt("Shared Endpoint 2"));
    }

    #[test]
    fn token_from_env() {
        let workspace = WorkspaceConfig {
            name: "dev".into(),
            url: "https://dev.example.com".into(),
            token: TokenSource::Env("JANITOR_TEST_TOKEN_THAT_IS_NOT_SET".into()),
            skip: false,
        };
        assert!(matches!(
            workspace.resolve_token(),
            Err(ConfigError::MissingToken { .. })
        ));
    }

    #[test]
    fn inline_token_is_redacted_in_debug() {
        let source = TokenSource::Inline("dapi-secret".into());
        assert!(!format!("{:?}", source).contains("dapi-secret"));
    }
}
