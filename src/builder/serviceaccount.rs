//! Federated roles for Kubernetes service accounts.

use tracing::info;

use crate::config::{ServiceAccountConfig, ServiceAccountStatus, non_empty};
use crate::error::Result;
use crate::graph::{Value, attach_document};

use super::TEMPLATE_DESCRIPTION_SUFFIX;
use super::collaborators::TrustDocumentProvider;
use super::resource_set::ResourceSet;
use super::role::{RoleTemplate, declare_role};

/// Logical name of the service account role, also used as its output.
pub const SERVICE_ACCOUNT_ROLE: &str = "Role1";

/// Logical name of the inline policy built from `attach_policy`.
pub const SERVICE_ACCOUNT_POLICY: &str = "Policy1";

/// Plans one federated role per service account.
pub struct ServiceAccountIamPlanner<'a> {
    cluster_name: String,
    trust: &'a dyn TrustDocumentProvider,
}

impl std::fmt::Debug for ServiceAccountIamPlanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountIamPlanner")
            .field("cluster_name", &self.cluster_name)
            .finish_non_exhaustive()
    }
}

impl<'a> ServiceAccountIamPlanner<'a> {
    /// Creates a planner that takes trust policies from `trust`.
    #[must_use]
    pub fn new(cluster_name: impl Into<String>, trust: &'a dyn TrustDocumentProvider) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            trust,
        }
    }

    /// Plans the role of `service_account`.
    ///
    /// The role ARN is written to `status.role_arn` on collection. The
    /// output is never exported.
    ///
    /// # Errors
    ///
    /// Returns an error if a declaration collides with an existing name.
    pub fn plan(&self, service_account: &ServiceAccountConfig) -> Result<ResourceSet<'static, ServiceAccountConfig>> {
        let meta = &service_account.metadata;
        info!(
            "Planning IAM for service account {} in cluster {}",
            meta.qualified_name(),
            self.cluster_name
        );

        let mut rs = ResourceSet::new(format!(
            "IAM role for service account {:?} {TEMPLATE_DESCRIPTION_SUFFIX}",
            meta.qualified_name()
        ));
        rs.set_with_iam(true);
        rs.set_with_named_iam(false);

        let role = declare_role(
            rs.graph_mut(),
            SERVICE_ACCOUNT_ROLE,
            RoleTemplate {
                trust: self.trust.assume_role_policy_document(&meta.namespace, &meta.name),
                managed_policies: service_account
                    .attach_policy_arns
                    .iter()
                    .map(|arn| Value::literal(arn.as_str()))
                    .collect(),
                permissions_boundary: non_empty(service_account.permissions_boundary.as_ref()),
                role_name: None,
            },
        )?;

        if let Some(document) = &service_account.attach_policy {
            attach_document(rs.graph_mut(), SERVICE_ACCOUNT_POLICY, &role, document.clone())?;
        }

        rs.define_output_from_att(
            SERVICE_ACCOUNT_ROLE,
            &role,
            "Arn",
            false,
            |sa: &mut ServiceAccountConfig, v| {
                sa.status
                    .get_or_insert_with(ServiceAccountStatus::default)
                    .role_arn = Some(v.to_string());
                Ok(())
            },
        )?;

        Ok(rs)
    }
}
