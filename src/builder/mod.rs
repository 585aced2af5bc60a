//! IAM planners and the resource sets they produce.
//!
//! Each planner turns one slice of the cluster specification into an
//! independently provisioned unit:
//! - [`ClusterIamPlanner`]: control-plane service role
//! - [`NodeGroupIamPlanner`]: worker instance role and profile
//! - [`ServiceAccountIamPlanner`]: federated roles for workloads

mod cluster;
mod collaborators;
mod nodegroup;
mod resource_set;
mod role;
mod serviceaccount;
mod summary;

pub use cluster::{
    ClusterIamPlanner, POLICY_EKS_CLUSTER, POLICY_EKS_VPC_RESOURCE_CONTROLLER, SERVICE_ROLE,
};
pub use collaborators::{
    Capability, OidcTrust, ProvisioningEngine, RoleImporter, StaticRoleImporter,
    TrustDocumentProvider,
};
pub use nodegroup::{
    NODE_INSTANCE_PROFILE, NODE_INSTANCE_ROLE, NodeGroupIamPlan, NodeGroupIamPlanner, NodeIamState,
    node_managed_policies,
};
pub use resource_set::ResourceSet;
pub use role::{RoleTemplate, declare_role};
pub use serviceaccount::{SERVICE_ACCOUNT_POLICY, SERVICE_ACCOUNT_ROLE, ServiceAccountIamPlanner};
pub use summary::{ClusterPlan, PlannedOutput, PlannedResource, UnitKind, UnitSummary};

/// Appended to every template description.
pub const TEMPLATE_DESCRIPTION_SUFFIX: &str = "[created and managed by clusteriam]";

const STACK_PREFIX: &str = "clusteriam";

/// Returns the stack name of the cluster unit.
#[must_use]
pub fn cluster_stack_name(cluster: &str) -> String {
    format!("{STACK_PREFIX}-{cluster}-cluster")
}

/// Returns the stack name of a node group unit.
#[must_use]
pub fn node_group_stack_name(cluster: &str, node_group: &str) -> String {
    format!("{STACK_PREFIX}-{cluster}-nodegroup-{node_group}")
}

/// Returns the stack name of a service account unit.
#[must_use]
pub fn service_account_stack_name(cluster: &str, namespace: &str, name: &str) -> String {
    format!("{STACK_PREFIX}-{cluster}-addon-iamserviceaccount-{namespace}-{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_names() {
        assert_eq!(cluster_stack_name("prod"), "clusteriam-prod-cluster");
        assert_eq!(node_group_stack_name("prod", "ng-1"), "clusteriam-prod-nodegroup-ng-1");
        assert_eq!(
            service_account_stack_name("prod", "kube-system", "aws-node"),
            "clusteriam-prod-addon-iamserviceaccount-kube-system-aws-node"
        );
    }
}
