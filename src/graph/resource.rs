//! Resource declarations understood by the graph.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::policy::PolicyDocument;
use super::value::Value;

/// Kind of a declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// An IAM role.
    Role,
    /// An instance profile binding compute instances to a role.
    InstanceProfile,
    /// An inline policy attached to one or more roles.
    Policy,
}

impl ResourceKind {
    /// Returns the resource type name used in rendered templates.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Role => "AWS::IAM::Role",
            Self::InstanceProfile => "AWS::IAM::InstanceProfile",
            Self::Policy => "AWS::IAM::Policy",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Role => "role",
            Self::InstanceProfile => "instance-profile",
            Self::Policy => "policy",
        };
        write!(f, "{s}")
    }
}

/// An IAM role declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    /// Trust policy: who may assume the role.
    pub assume_role_policy_document: serde_json::Value,
    /// Managed policies attached to the role.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub managed_policy_arns: Vec<Value>,
    /// Maximum-permissions ceiling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions_boundary: Option<Value>,
    /// Caller-fixed role name; generated by the engine when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
}

/// An instance profile declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceProfile {
    /// Profile path.
    pub path: String,
    /// Roles bound to the profile.
    pub roles: Vec<Value>,
}

/// An inline policy declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Policy {
    /// Name of the policy.
    pub policy_name: Value,
    /// Roles the policy is attached to.
    pub roles: Vec<Value>,
    /// Permissions granted by the policy.
    pub policy_document: PolicyDocument,
}

/// A declared resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// See [`Role`].
    Role(Role),
    /// See [`InstanceProfile`].
    InstanceProfile(InstanceProfile),
    /// See [`Policy`].
    Policy(Policy),
}

impl Resource {
    /// Returns the kind of this resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Role(_) => ResourceKind::Role,
            Self::InstanceProfile(_) => ResourceKind::InstanceProfile,
            Self::Policy(_) => ResourceKind::Policy,
        }
    }

    /// Returns the logical names of every resource referenced by this one.
    #[must_use]
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Self::Role(role) => {
                for arn in &role.managed_policy_arns {
                    arn.collect_references(&mut out);
                }
                if let Some(boundary) = &role.permissions_boundary {
                    boundary.collect_references(&mut out);
                }
            }
            Self::InstanceProfile(profile) => {
                for role in &profile.roles {
                    role.collect_references(&mut out);
                }
            }
            Self::Policy(policy) => {
                policy.policy_name.collect_references(&mut out);
                for role in &policy.roles {
                    role.collect_references(&mut out);
                }
                policy.policy_document.collect_references(&mut out);
            }
        }
        out
    }

    /// Returns the role declaration, if this is a role.
    #[must_use]
    pub const fn as_role(&self) -> Option<&Role> {
        match self {
            Self::Role(role) => Some(role),
            _ => None,
        }
    }

    /// Returns the instance profile declaration, if this is one.
    #[must_use]
    pub const fn as_instance_profile(&self) -> Option<&InstanceProfile> {
        match self {
            Self::InstanceProfile(profile) => Some(profile),
            _ => None,
        }
    }

    /// Returns the policy declaration, if this is a policy.
    #[must_use]
    pub const fn as_policy(&self) -> Option<&Policy> {
        match self {
            Self::Policy(policy) => Some(policy),
            _ => None,
        }
    }
}

impl From<Role> for Resource {
    fn from(role: Role) -> Self {
        Self::Role(role)
    }
}

impl From<InstanceProfile> for Resource {
    fn from(profile: InstanceProfile) -> Self {
        Self::InstanceProfile(profile)
    }
}

impl From<Policy> for Resource {
    fn from(policy: Policy) -> Self {
        Self::Policy(policy)
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("Type", self.kind().type_name())?;
        match self {
            Self::Role(role) => map.serialize_entry("Properties", role)?,
            Self::InstanceProfile(profile) => map.serialize_entry("Properties", profile)?,
            Self::Policy(policy) => map.serialize_entry("Properties", policy)?,
        }
        map.end()
    }
}
