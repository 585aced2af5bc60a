//! Read-only overview of every unit planned for a cluster.

use serde::Serialize;
use tracing::info;

use crate::config::ClusterConfig;
use crate::error::{ConfigError, Result};

use super::collaborators::{RoleImporter, TrustDocumentProvider};
use super::resource_set::ResourceSet;
use super::{
    ClusterIamPlanner, NodeGroupIamPlanner, ServiceAccountIamPlanner, cluster_stack_name,
    node_group_stack_name, service_account_stack_name,
};

/// Kind of provisioned unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Control-plane service role.
    Cluster,
    /// Node group instance identity.
    NodeGroup,
    /// Service account role.
    ServiceAccount,
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cluster => write!(f, "cluster"),
            Self::NodeGroup => write!(f, "nodegroup"),
            Self::ServiceAccount => write!(f, "serviceaccount"),
        }
    }
}

/// A declared resource as shown in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedResource {
    /// Logical name.
    pub logical_name: String,
    /// Template resource type.
    pub resource_type: String,
}

/// An output binding as shown in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedOutput {
    /// Output name.
    pub name: String,
    /// Where the value comes from.
    pub source: String,
}

/// Summary of one planned unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    /// Unit kind.
    pub kind: UnitKind,
    /// Unit name (`namespace/name` for service accounts).
    pub name: String,
    /// Stack the unit is provisioned as.
    pub stack_name: String,
    /// Identity state the unit was planned in.
    pub state: String,
    /// Whether IAM resources are created.
    pub with_iam: bool,
    /// Whether named IAM resources are created.
    pub with_named_iam: bool,
    /// Declared resources in logical-name order.
    pub resources: Vec<PlannedResource>,
    /// Output bindings in registration order.
    pub outputs: Vec<PlannedOutput>,
    /// SHA-256 of the rendered template.
    pub fingerprint: String,
}

impl UnitSummary {
    /// Summarizes `resources`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be rendered.
    pub fn from_set<S>(
        kind: UnitKind,
        name: impl Into<String>,
        stack_name: String,
        state: &str,
        resources: &ResourceSet<'_, S>,
    ) -> Result<Self> {
        let graph = resources.graph();
        Ok(Self {
            kind,
            name: name.into(),
            stack_name,
            state: state.to_string(),
            with_iam: resources.with_iam(),
            with_named_iam: resources.with_named_iam(),
            resources: graph
                .resources()
                .map(|(name, resource)| PlannedResource {
                    logical_name: name.to_string(),
                    resource_type: resource.kind().type_name().to_string(),
                })
                .collect(),
            outputs: resources
                .outputs()
                .bindings()
                .map(|(name, source)| PlannedOutput {
                    name: name.to_string(),
                    source: source.to_string(),
                })
                .collect(),
            fingerprint: graph.fingerprint()?,
        })
    }
}

/// Every unit planned for one cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterPlan {
    /// Cluster name.
    pub cluster: String,
    /// Units in provisioning order: cluster, node groups, service accounts.
    pub units: Vec<UnitSummary>,
}

impl ClusterPlan {
    /// Plans every unit of `config` without provisioning anything.
    ///
    /// # Errors
    ///
    /// Returns an error if service accounts are configured without a trust
    /// provider, or if any planner fails.
    pub fn build(
        config: &ClusterConfig,
        importer: &dyn RoleImporter,
        trust: Option<&dyn TrustDocumentProvider>,
    ) -> Result<Self> {
        let cluster = config.metadata.name.as_str();
        let mut units = Vec::new();

        let cluster_set = ClusterIamPlanner::new(cluster).plan(&config.iam)?;
        let cluster_state = if cluster_set.with_iam() {
            "managed"
        } else {
            "external-role"
        };
        units.push(UnitSummary::from_set(
            UnitKind::Cluster,
            cluster,
            cluster_stack_name(cluster),
            cluster_state,
            &cluster_set,
        )?);

        let node_planner = NodeGroupIamPlanner::new(cluster, importer);
        for ng in &config.node_groups {
            let plan = node_planner.plan(ng)?;
            units.push(UnitSummary::from_set(
                UnitKind::NodeGroup,
                ng.name.as_str(),
                node_group_stack_name(cluster, &ng.name),
                plan.state.name(),
                &plan.resources,
            )?);
        }

        if !config.iam.service_accounts.is_empty() {
            let trust = trust.ok_or_else(|| {
                ConfigError::validation(
                    "service accounts require an OIDC provider",
                    "iam.oidc",
                )
            })?;
            let sa_planner = ServiceAccountIamPlanner::new(cluster, trust);
            for sa in &config.iam.service_accounts {
                let rs = sa_planner.plan(sa)?;
                units.push(UnitSummary::from_set(
                    UnitKind::ServiceAccount,
                    sa.metadata.qualified_name(),
                    service_account_stack_name(cluster, &sa.metadata.namespace, &sa.metadata.name),
                    "managed",
                    &rs,
                )?);
            }
        }

        info!("Planned {} units for cluster {cluster}", units.len());
        Ok(Self {
            cluster: cluster.to_string(),
            units,
        })
    }

    /// Total number of declared resources across all units.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.units.iter().map(|u| u.resources.len()).sum()
    }

    /// Number of units that create IAM resources.
    #[must_use]
    pub fn iam_unit_count(&self) -> usize {
        self.units.iter().filter(|u| u.with_iam).count()
    }
}
