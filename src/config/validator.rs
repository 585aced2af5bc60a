//! Configuration validation for cluster specifications.
//!
//! This module checks a parsed configuration for values the planners would
//! accept but that can never provision correctly, before anything is
//! rendered.

use crate::error::{ClusterIamError, ConfigError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{
    AddonPolicies, ClusterConfig, ClusterIam, NodeGroupConfig, ServiceAccountConfig, is_disabled,
    non_empty,
};

/// Validator for cluster configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a cluster configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error found if validation fails.
    pub fn validate(&self, config: &ClusterConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ClusterIamError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Collects every error and warning in `config`.
    #[must_use]
    pub fn check(&self, config: &ClusterConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_metadata(config, &mut result);
        Self::validate_cluster_iam(&config.iam, &mut result);
        Self::validate_node_groups(&config.node_groups, &mut result);
        Self::validate_service_accounts(&config.iam, &mut result);

        result
    }

    /// Validates cluster identity.
    fn validate_metadata(config: &ClusterConfig, result: &mut ValidationResult) {
        let name = &config.metadata.name;
        if name.is_empty() {
            result.error("metadata.name", "Cluster name cannot be empty");
        } else if !is_valid_name(name) {
            result.error(
                "metadata.name",
                format!("Cluster name '{name}' is invalid. Must be lowercase alphanumeric with hyphens."),
            );
        }

        if config.metadata.region.as_ref().is_some_and(String::is_empty) {
            result.error("metadata.region", "Region cannot be empty when set");
        }
    }

    /// Validates cluster-level IAM settings.
    fn validate_cluster_iam(iam: &ClusterIam, result: &mut ValidationResult) {
        check_arn(iam.service_role_arn.as_ref(), "iam.service_role_arn", result);
        check_arn(
            iam.service_role_permissions_boundary.as_ref(),
            "iam.service_role_permissions_boundary",
            result,
        );

        if non_empty(iam.service_role_arn.as_ref()).is_some()
            && non_empty(iam.service_role_permissions_boundary.as_ref()).is_some()
        {
            result.warnings.push(String::from(
                "iam.service_role_permissions_boundary is ignored when iam.service_role_arn is set",
            ));
        }

        if let Some(oidc) = &iam.oidc {
            check_arn(Some(&oidc.provider_arn), "iam.oidc.provider_arn", result);
            if !oidc.issuer_url.starts_with("https://") {
                result.error(
                    "iam.oidc.issuer_url",
                    format!("Issuer URL '{}' must use https", oidc.issuer_url),
                );
            }
            if oidc.audience.is_empty() {
                result.error("iam.oidc.audience", "Audience cannot be empty");
            }
        }
    }

    /// Validates all node group configurations.
    fn validate_node_groups(node_groups: &[NodeGroupConfig], result: &mut ValidationResult) {
        let mut names = HashSet::new();

        for (i, ng) in node_groups.iter().enumerate() {
            let prefix = format!("node_groups[{i}]");

            if !is_valid_name(&ng.name) {
                result.error(
                    format!("{prefix}.name"),
                    format!("Node group name '{}' is invalid. Must be lowercase alphanumeric with hyphens.", ng.name),
                );
            }
            if !names.insert(ng.name.as_str()) {
                result.error(format!("{prefix}.name"), format!("Duplicate node group name '{}'", ng.name));
            }

            Self::validate_node_group_iam(ng, &prefix, result);
        }
    }

    /// Validates the IAM settings of one node group.
    fn validate_node_group_iam(ng: &NodeGroupConfig, prefix: &str, result: &mut ValidationResult) {
        let iam = &ng.iam;

        check_arn(iam.instance_profile_arn.as_ref(), &format!("{prefix}.iam.instance_profile_arn"), result);
        check_arn(iam.instance_role_arn.as_ref(), &format!("{prefix}.iam.instance_role_arn"), result);
        check_arn(
            iam.instance_role_permissions_boundary.as_ref(),
            &format!("{prefix}.iam.instance_role_permissions_boundary"),
            result,
        );
        for (j, arn) in iam.attach_policy_arns.iter().enumerate() {
            check_arn(Some(arn), &format!("{prefix}.iam.attach_policy_arns[{j}]"), result);
        }
        if let Some(document) = &iam.attach_policy {
            check_policy_document(document, &format!("{prefix}.iam.attach_policy"), result);
        }

        let external_profile = non_empty(iam.instance_profile_arn.as_ref()).is_some();
        let external_role = non_empty(iam.instance_role_arn.as_ref()).is_some();

        if non_empty(iam.instance_role_name.as_ref()).is_some() && (external_profile || external_role) {
            result.error(
                format!("{prefix}.iam.instance_role_name"),
                "instance_role_name cannot be combined with an existing instance profile or role",
            );
        }

        let requests_policies = !iam.attach_policy_arns.is_empty()
            || iam.attach_policy.is_some()
            || non_empty(iam.instance_role_permissions_boundary.as_ref()).is_some()
            || is_disabled(iam.cni_policy)
            || iam.with_addon_policies != AddonPolicies::default();

        if requests_policies && (external_profile || external_role) {
            result.error(
                format!("{prefix}.iam"),
                format!(
                    "Node group '{}' uses an existing instance {} so policies cannot be attached",
                    ng.name,
                    if external_profile { "profile" } else { "role" }
                ),
            );
        }
    }

    /// Validates service accounts.
    fn validate_service_accounts(iam: &ClusterIam, result: &mut ValidationResult) {
        if !iam.service_accounts.is_empty() && iam.oidc.is_none() {
            result.error("iam.oidc", "Service accounts require an OIDC provider");
        }

        let mut seen = HashSet::new();
        for (i, sa) in iam.service_accounts.iter().enumerate() {
            let prefix = format!("iam.service_accounts[{i}]");
            Self::validate_service_account(sa, &prefix, result);

            if !seen.insert((sa.metadata.namespace.as_str(), sa.metadata.name.as_str())) {
                result.error(
                    format!("{prefix}.metadata"),
                    format!("Duplicate service account '{}'", sa.metadata.qualified_name()),
                );
            }
        }
    }

    /// Validates one service account.
    fn validate_service_account(sa: &ServiceAccountConfig, prefix: &str, result: &mut ValidationResult) {
        if !is_valid_name(&sa.metadata.name) {
            result.error(
                format!("{prefix}.metadata.name"),
                format!("Service account name '{}' is invalid", sa.metadata.name),
            );
        }
        if !is_valid_name(&sa.metadata.namespace) {
            result.error(
                format!("{prefix}.metadata.namespace"),
                format!("Namespace '{}' is invalid", sa.metadata.namespace),
            );
        }

        for (j, arn) in sa.attach_policy_arns.iter().enumerate() {
            check_arn(Some(arn), &format!("{prefix}.attach_policy_arns[{j}]"), result);
        }
        check_arn(sa.permissions_boundary.as_ref(), &format!("{prefix}.permissions_boundary"), result);
        if let Some(document) = &sa.attach_policy {
            check_policy_document(document, &format!("{prefix}.attach_policy"), result);
        }

        if sa.attach_policy_arns.is_empty() && sa.attach_policy.is_none() {
            result.warnings.push(format!(
                "Service account '{}' has no policies; its role grants nothing",
                sa.metadata.qualified_name()
            ));
        }
    }
}

/// Records an error if a set, non-empty value is not shaped like an ARN.
fn check_arn(value: Option<&String>, field: &str, result: &mut ValidationResult) {
    if let Some(arn) = non_empty(value)
        && !is_arn(arn)
    {
        result.error(field, format!("'{arn}' is not a valid ARN"));
    }
}

/// Returns true for `arn:partition:service:region:account:resource`.
fn is_arn(value: &str) -> bool {
    let parts: Vec<&str> = value.splitn(6, ':').collect();
    parts.len() == 6
        && parts[0] == "arn"
        && !parts[1].is_empty()
        && !parts[2].is_empty()
        && !parts[5].is_empty()
}

/// Records an error unless `document` is an object with a `Statement`.
fn check_policy_document(document: &serde_json::Value, field: &str, result: &mut ValidationResult) {
    let has_statement = document
        .as_object()
        .is_some_and(|o| o.contains_key("Statement"));
    if !has_statement {
        result.error(field, "Policy document must be an object with a Statement");
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    let mut chars = name.chars();

    // First character must be a letter
    if let Some(first) = chars.next()
        && !first.is_ascii_lowercase() {
            return false;
        }

    // Rest must be lowercase alphanumeric or hyphen
    for c in chars {
        if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
            return false;
        }
    }

    // Cannot end with hyphen
    if name.ends_with('-') {
        return false;
    }

    // Cannot have consecutive hyphens
    if name.contains("--") {
        return false;
    }

    true
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
