//! Interfaces to the systems planning depends on but never drives itself.
//!
//! The planner performs no network I/O. Provisioning, role import and
//! trust-document formatting are reached through these traits.

use serde_json::json;
use std::collections::HashMap;

use crate::config::OidcConfig;
use crate::error::{ProvisionError, RoleImportError};
use crate::graph::policy::POLICY_VERSION;

/// Privilege a stack needs from the provisioning engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// The stack creates IAM resources.
    Iam,
    /// The stack creates IAM resources with caller-fixed names.
    NamedIam,
}

impl Capability {
    /// Returns the capability identifier understood by the engine.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Iam => "CAPABILITY_IAM",
            Self::NamedIam => "CAPABILITY_NAMED_IAM",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Materializes a rendered template.
#[cfg_attr(test, mockall::automock)]
pub trait ProvisioningEngine {
    /// Provisions `template` as `stack_name` and returns the stack outputs
    /// once the stack is complete and stable.
    ///
    /// # Errors
    ///
    /// Returns an engine-defined error; callers do not inspect it.
    fn provision(
        &self,
        stack_name: &str,
        template: &str,
        capabilities: &[Capability],
    ) -> Result<HashMap<String, String>, ProvisionError>;
}

/// Finds the role owning an existing instance profile.
#[cfg_attr(test, mockall::automock)]
pub trait RoleImporter {
    /// Returns the ARN of the role attached to `profile_arn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be read or has no role.
    fn import_instance_role(&self, profile_arn: &str) -> Result<String, RoleImportError>;
}

/// Formats federated trust policies for service accounts.
#[cfg_attr(test, mockall::automock)]
pub trait TrustDocumentProvider {
    /// Returns a trust policy allowing `namespace/service_account` to assume
    /// the role.
    fn assume_role_policy_document(&self, namespace: &str, service_account: &str) -> serde_json::Value;
}

/// Role importer backed by a fixed profile-to-role table.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleImporter {
    roles: HashMap<String, String>,
}

impl StaticRoleImporter {
    /// Creates an importer from `(profile ARN, role ARN)` pairs.
    #[must_use]
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            roles: pairs.into_iter().collect(),
        }
    }
}

impl RoleImporter for StaticRoleImporter {
    fn import_instance_role(&self, profile_arn: &str) -> Result<String, RoleImportError> {
        self.roles
            .get(profile_arn)
            .cloned()
            .ok_or_else(|| RoleImportError::new(profile_arn, "no role known for this instance profile"))
    }
}

/// Trust documents for an OIDC identity provider.
#[derive(Debug, Clone)]
pub struct OidcTrust {
    provider_arn: String,
    issuer: String,
    audience: String,
}

impl OidcTrust {
    /// Creates a provider from the cluster's OIDC settings.
    #[must_use]
    pub fn new(config: &OidcConfig) -> Self {
        let issuer = config
            .issuer_url
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();
        Self {
            provider_arn: config.provider_arn.clone(),
            issuer,
            audience: config.audience.clone(),
        }
    }
}

impl TrustDocumentProvider for OidcTrust {
    fn assume_role_policy_document(&self, namespace: &str, service_account: &str) -> serde_json::Value {
        let mut conditions = serde_json::Map::new();
        conditions.insert(
            format!("{}:sub", self.issuer),
            json!(format!("system:serviceaccount:{namespace}:{service_account}")),
        );
        conditions.insert(format!("{}:aud", self.issuer), json!(self.audience));

        json!({
            "Version": POLICY_VERSION,
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Federated": self.provider_arn },
                "Action": ["sts:AssumeRoleWithWebIdentity"],
                "Condition": { "StringEquals": conditions },
            }]
        })
    }
}
