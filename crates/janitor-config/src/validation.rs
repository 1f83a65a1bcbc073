//! Configuration validation

use crate::policy::{DEFAULT_EXEMPT_NAMES, PHOTON_ENDPOINT_NAME, SHARED_ENDPOINT_NAME};
use crate::schema::{RawConfig, RawEndpointTemplate, RawWorkspace};
use janitor_api::{PermissionLevel, SpotInstancePolicy};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Workspace '{workspace}': {message}")]
    WorkspaceError { workspace: String, message: String },

    #[error("Duplicate workspace name: {0}")]
    DuplicateWorkspace(String),

    #[error("Shared endpoint '{name}': {message}")]
    TemplateError { name: String, message: String },

    #[error("Duplicate shared endpoint name: {0}")]
    DuplicateTemplate(String),

    #[error("Shared endpoint '{0}' is not listed in retention.exempt_names and would be terminated")]
    SharedEndpointNotExempt(String),

    #[error("Invalid permission level '{0}'")]
    InvalidPermissionLevel(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Check for duplicate workspace names
    let mut seen = HashSet::new();
    for workspace in &config.workspaces {
        if !seen.insert(&workspace.name) {
            errors.push(ValidationError::DuplicateWorkspace(workspace.name.clone()));
        }
    }

    for workspace in &config.workspaces {
        errors.extend(validate_workspace(workspace));
    }

    // Shared endpoint templates
    let template_names: Vec<String> = match &config.shared_endpoints {
        Some(templates) => {
            let mut seen = HashSet::new();
            for template in templates {
                if !seen.insert(&template.name) {
                    errors.push(ValidationError::DuplicateTemplate(template.name.clone()));
                }
                errors.extend(validate_template(template));
            }
            templates.iter().map(|t| t.name.clone()).collect()
        }
        None => vec![SHARED_ENDPOINT_NAME.into(), PHOTON_ENDPOINT_NAME.into()],
    };

    // Every shared endpoint must survive the retention pass that follows provisioning
    if let Some(exempt) = &config.retention.exempt_names {
        for name in &template_names {
            if !exempt.contains(name) {
                errors.push(ValidationError::SharedEndpointNotExempt(name.clone()));
            }
        }
    } else {
        for name in &template_names {
            if !DEFAULT_EXEMPT_NAMES.contains(&name.as_str()) {
                errors.push(ValidationError::SharedEndpointNotExempt(name.clone()));
            }
        }
    }

    if let Some(acl) = &config.access_control {
        if acl.group_name.trim().is_empty() {
            errors.push(ValidationError::GlobalError(
                "access_control.group_name cannot be empty".into(),
            ));
        }
        if parse_permission_level(&acl.permission_level).is_err() {
            errors.push(ValidationError::InvalidPermissionLevel(
                acl.permission_level.clone(),
            ));
        }
    }

    if config.service.request_timeout_seconds == Some(0) {
        errors.push(ValidationError::GlobalError(
            "service.request_timeout_seconds must be greater than 0".into(),
        ));
    }

    errors
}

fn validate_workspace(workspace: &RawWorkspace) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let err = |message: &str| ValidationError::WorkspaceError {
        workspace: workspace.name.clone(),
        message: message.into(),
    };

    if workspace.name.trim().is_empty() {
        errors.push(err("name cannot be empty"));
    }

    if !(workspace.url.starts_with("https://") || workspace.url.starts_with("http://")) {
        errors.push(err("url must start with http:// or https://"));
    }

    match (&workspace.token, &workspace.token_env) {
        (None, None) => errors.push(err("one of token or token_env is required")),
        (Some(_), Some(_)) => errors.push(err("token and token_env are mutually exclusive")),
        (Some(token), None) if token.trim().is_empty() => {
            errors.push(err("token cannot be empty"))
        }
        (None, Some(var)) if var.trim().is_empty() => {
            errors.push(err("token_env cannot be empty"))
        }
        _ => {}
    }

    errors
}

fn validate_template(template: &RawEndpointTemplate) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let err = |message: String| ValidationError::TemplateError {
        name: template.name.clone(),
        message,
    };

    if template.name.trim().is_empty() {
        errors.push(err("name cannot be empty".into()));
    }

    if template.min_num_clusters == 0 {
        errors.push(err("min_num_clusters must be at least 1".into()));
    }

    if template.min_num_clusters > template.max_num_clusters {
        errors.push(err(format!(
            "min_num_clusters ({}) exceeds max_num_clusters ({})",
            template.min_num_clusters, template.max_num_clusters
        )));
    }

    if let Err(e) = parse_spot_policy(&template.spot_instance_policy) {
        errors.push(err(e));
    }

    if let Some(tags) = &template.tags {
        for tag in tags {
            if tag.key.trim().is_empty() {
                errors.push(err("tag keys cannot be empty".into()));
            }
        }
    }

    errors
}

/// Parse a permission level name (case-insensitive)
pub fn parse_permission_level(s: &str) -> Result<PermissionLevel, String> {
    match s.to_uppercase().as_str() {
        "CAN_USE" => Ok(PermissionLevel::CanUse),
        "CAN_MANAGE" => Ok(PermissionLevel::CanManage),
        "IS_OWNER" => Ok(PermissionLevel::IsOwner),
        other => Err(format!("Unknown permission level: {}", other)),
    }
}

/// Parse a spot instance policy name (case-insensitive)
pub fn parse_spot_policy(s: &str) -> Result<SpotInstancePolicy, String> {
    match s.to_uppercase().as_str() {
        "COST_OPTIMIZED" => Ok(SpotInstancePolicy::CostOptimized),
        "RELIABILITY_OPTIMIZED" => Ok(SpotInstancePolicy::ReliabilityOptimized),
        "POLICY_UNSPECIFIED" => Ok(SpotInstancePolicy::PolicyUnspecified),
        other => Err(format!("Unknown spot instance policy: {}", other)),
    }
}
