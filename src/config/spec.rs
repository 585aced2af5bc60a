//! Configuration specification types for cluster IAM planning.
//!
//! This module defines the structs that map to the `clusteriam.yaml` file.
//! Identifiers written back after provisioning go to `status` blocks, which
//! planning never reads, so a saved specification plans the same resources
//! again.

use serde::{Deserialize, Serialize};

/// The root configuration structure for a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Cluster identity.
    pub metadata: ClusterMeta,
    /// Cluster-level IAM settings.
    #[serde(default)]
    pub iam: ClusterIam,
    /// Node groups attached to the cluster.
    #[serde(default)]
    pub node_groups: Vec<NodeGroupConfig>,
}

/// Cluster identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterMeta {
    /// Cluster name.
    pub name: String,
    /// Region the cluster runs in.
    #[serde(default)]
    pub region: Option<String>,
}

/// Cluster-level IAM settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterIam {
    /// Existing control-plane service role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_role_arn: Option<String>,
    /// Permissions boundary applied to a created service role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_role_permissions_boundary: Option<String>,
    /// Attach the VPC resource controller policy (default: enabled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_resource_controller_policy: Option<bool>,
    /// OIDC provider used to federate service accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oidc: Option<OidcConfig>,
    /// Per-workload federated roles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_accounts: Vec<ServiceAccountConfig>,
    /// Provisioning status. Written back after provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterIamStatus>,
}

/// Provisioning status of the control-plane service role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterIamStatus {
    /// ARN of the service role, created or supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_role_arn: Option<String>,
}

/// OIDC provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OidcConfig {
    /// ARN of the IAM OIDC identity provider.
    pub provider_arn: String,
    /// Issuer URL of the cluster's OIDC endpoint.
    pub issuer_url: String,
    /// Audience expected in web identity tokens.
    #[serde(default = "default_audience")]
    pub audience: String,
}

/// Configuration for a single node group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeGroupConfig {
    /// Node group name, unique within the cluster.
    pub name: String,
    /// IAM settings of the worker nodes.
    #[serde(default)]
    pub iam: NodeGroupIam,
}

/// IAM settings of a node group.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeGroupIam {
    /// Existing instance profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_profile_arn: Option<String>,
    /// Existing instance role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_role_arn: Option<String>,
    /// Fixed name for a created instance role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_role_name: Option<String>,
    /// Permissions boundary applied to a created instance role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_role_permissions_boundary: Option<String>,
    /// Additional managed policies for a created instance role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attach_policy_arns: Vec<String>,
    /// Inline policy document for a created instance role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_policy: Option<serde_json::Value>,
    /// Attach the CNI policy (default: enabled).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni_policy: Option<bool>,
    /// Policies for common cluster add-ons.
    #[serde(default)]
    pub with_addon_policies: AddonPolicies,
    /// Provisioning status. Written back after provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeGroupIamStatus>,
}

/// Provisioning status of a node group's instance identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeGroupIamStatus {
    /// ARN of the instance profile, created or supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_profile_arn: Option<String>,
    /// ARN of the instance role, created, supplied or imported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_role_arn: Option<String>,
}

/// Add-on policy toggles for node roles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AddonPolicies {
    /// Allow pushing images to the container registry.
    #[serde(default)]
    pub image_builder: bool,
    /// Cluster autoscaler permissions.
    #[serde(default)]
    pub auto_scaler: bool,
    /// external-dns permissions.
    #[serde(default)]
    pub external_dns: bool,
    /// cert-manager DNS01 permissions.
    #[serde(default)]
    pub cert_manager: bool,
    /// EBS CSI driver permissions.
    #[serde(default)]
    pub ebs: bool,
    /// X-Ray daemon permissions.
    #[serde(default)]
    pub xray: bool,
    /// CloudWatch agent permissions.
    #[serde(default)]
    pub cloud_watch: bool,
    /// Systems Manager agent permissions.
    #[serde(default)]
    pub ssm: bool,
}

/// A service account backed by a federated role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceAccountConfig {
    /// Namespace and name of the service account.
    pub metadata: ServiceAccountMeta,
    /// Managed policies attached to the role.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attach_policy_arns: Vec<String>,
    /// Inline policy document attached to the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_policy: Option<serde_json::Value>,
    /// Permissions boundary applied to the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions_boundary: Option<String>,
    /// Provisioning status. Written back after provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServiceAccountStatus>,
}

/// Namespace and name of a service account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceAccountMeta {
    /// Service account name.
    pub name: String,
    /// Namespace of the service account.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

/// Provisioning status of a service account role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceAccountStatus {
    /// ARN of the provisioned role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
}

// Default value functions

fn default_audience() -> String {
    String::from("sts.amazonaws.com")
}

fn default_namespace() -> String {
    String::from("default")
}

/// Returns the value if it is set and non-empty.
#[must_use]
pub fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Returns true only when a toggle is explicitly set to `false`.
#[must_use]
pub const fn is_disabled(toggle: Option<bool>) -> bool {
    matches!(toggle, Some(false))
}

impl ClusterConfig {
    /// Finds a node group by name.
    #[must_use]
    pub fn node_group(&self, name: &str) -> Option<&NodeGroupConfig> {
        self.node_groups.iter().find(|ng| ng.name == name)
    }

    /// Finds a node group by name, mutably.
    pub fn node_group_mut(&mut self, name: &str) -> Option<&mut NodeGroupConfig> {
        self.node_groups.iter_mut().find(|ng| ng.name == name)
    }

    /// Finds a service account by namespace and name.
    #[must_use]
    pub fn service_account(&self, namespace: &str, name: &str) -> Option<&ServiceAccountConfig> {
        self.iam
            .service_accounts
            .iter()
            .find(|sa| sa.metadata.namespace == namespace && sa.metadata.name == name)
    }

    /// Finds a service account by namespace and name, mutably.
    pub fn service_account_mut(
        &mut self,
        namespace: &str,
        name: &str,
    ) -> Option<&mut ServiceAccountConfig> {
        self.iam
            .service_accounts
            .iter_mut()
            .find(|sa| sa.metadata.namespace == namespace && sa.metadata.name == name)
    }
}

impl ServiceAccountMeta {
    /// Returns `namespace/name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

impl ServiceAccountConfig {
    /// Creates a service account without policies.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ServiceAccountMeta {
                name: name.into(),
                namespace: namespace.into(),
            },
            attach_policy_arns: vec![],
            attach_policy: None,
            permissions_boundary: None,
            status: None,
        }
    }
}

impl NodeGroupConfig {
    /// Creates a node group with default IAM settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iam: NodeGroupIam::default(),
        }
    }
}
