//! Control-plane service role planning.

use tracing::info;

use crate::config::{ClusterIam, ClusterIamStatus, is_disabled, non_empty};
use crate::error::Result;
use crate::graph::{assume_role_for_services, attach_allow, managed_policy_arn};
use crate::outputs::CLUSTER_SERVICE_ROLE_ARN;

use super::TEMPLATE_DESCRIPTION_SUFFIX;
use super::resource_set::ResourceSet;
use super::role::{RoleTemplate, declare_role};

/// Managed policy every created service role carries.
pub const POLICY_EKS_CLUSTER: &str = "AmazonEKSClusterPolicy";

/// Managed policy for the VPC resource controller.
pub const POLICY_EKS_VPC_RESOURCE_CONTROLLER: &str = "AmazonEKSVPCResourceController";

/// Logical name of the created service role.
pub const SERVICE_ROLE: &str = "ServiceRole";

/// Principals trusted by the service role. The second one lets the
/// control plane schedule pods onto serverless compute.
const SERVICE_ROLE_PRINCIPALS: &[&str] = &["eks.amazonaws.com", "eks-fargate-pods.amazonaws.com"];

/// Plans the control-plane service role of a cluster.
#[derive(Debug, Clone)]
pub struct ClusterIamPlanner {
    cluster_name: String,
}

impl ClusterIamPlanner {
    /// Creates a planner for the named cluster.
    #[must_use]
    pub fn new(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
        }
    }

    /// Plans the service role.
    ///
    /// When `iam.service_role_arn` is set nothing is declared and the ARN is
    /// passed through to the output unchanged. Collection writes the ARN to
    /// `status.service_role_arn`.
    ///
    /// # Errors
    ///
    /// Returns an error if a declaration collides with an existing name.
    pub fn plan(&self, iam: &ClusterIam) -> Result<ResourceSet<'static, ClusterIam>> {
        let mut rs = ResourceSet::new(format!(
            "IAM resources for cluster {:?} {TEMPLATE_DESCRIPTION_SUFFIX}",
            self.cluster_name
        ));
        rs.set_with_named_iam(false);

        if let Some(arn) = non_empty(iam.service_role_arn.as_ref()) {
            info!("Using existing service role {arn}");
            rs.set_with_iam(false);
            rs.define_pass_through_output(CLUSTER_SERVICE_ROLE_ARN, arn, true, write_service_role_arn)?;
            return Ok(rs);
        }

        info!("Creating service role for cluster {}", self.cluster_name);
        rs.set_with_iam(true);

        let mut managed_policies = vec![managed_policy_arn(POLICY_EKS_CLUSTER)];
        if !is_disabled(iam.vpc_resource_controller_policy) {
            managed_policies.push(managed_policy_arn(POLICY_EKS_VPC_RESOURCE_CONTROLLER));
        }

        let service_role = declare_role(
            rs.graph_mut(),
            SERVICE_ROLE,
            RoleTemplate {
                trust: assume_role_for_services(SERVICE_ROLE_PRINCIPALS),
                managed_policies,
                permissions_boundary: non_empty(iam.service_role_permissions_boundary.as_ref()),
                role_name: None,
            },
        )?;

        attach_allow(
            rs.graph_mut(),
            "PolicyCloudWatchMetrics",
            &service_role,
            "*",
            &["cloudwatch:PutMetricData"],
        )?;
        // Needed to create load balancers; not part of the cluster policy.
        attach_allow(
            rs.graph_mut(),
            "PolicyELBPermissions",
            &service_role,
            "*",
            &[
                "ec2:DescribeAccountAttributes",
                "ec2:DescribeAddresses",
                "ec2:DescribeInternetGateways",
            ],
        )?;

        rs.define_output_from_att(
            CLUSTER_SERVICE_ROLE_ARN,
            &service_role,
            "Arn",
            true,
            write_service_role_arn,
        )?;

        Ok(rs)
    }
}

#[allow(clippy::unnecessary_wraps)]
fn write_service_role_arn(iam: &mut ClusterIam, value: &str) -> Result<()> {
    iam.status
        .get_or_insert_with(ClusterIamStatus::default)
        .service_role_arn = Some(value.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PolicyDocument, ResourceKind, Value};
    use crate::outputs::OutputSource;
    use std::collections::HashMap;

    fn planner() -> ClusterIamPlanner {
        ClusterIamPlanner::new("prod")
    }

    #[test]
    fn test_existing_service_role_passes_through() {
        let iam = ClusterIam {
            service_role_arn: Some(String::from("arn:aws:iam::1:role/existing")),
            ..ClusterIam::default()
        };

        let rs = planner().plan(&iam).unwrap();

        assert!(!rs.with_iam());
        assert!(!rs.with_named_iam());
        assert!(rs.graph().is_empty());
        assert_eq!(
            rs.outputs().source(CLUSTER_SERVICE_ROLE_ARN),
            Some(&OutputSource::PassThrough(String::from("arn:aws:iam::1:role/existing")))
        );

        let mut target = iam.clone();
        rs.collect(&mut target, &HashMap::new()).unwrap();
        assert_eq!(target.service_role_arn, iam.service_role_arn);
        assert_eq!(
            target.status.and_then(|s| s.service_role_arn).as_deref(),
            Some("arn:aws:iam::1:role/existing")
        );
    }

    #[test]
    fn test_empty_service_role_creates_role() {
        let iam = ClusterIam {
            service_role_arn: Some(String::new()),
            ..ClusterIam::default()
        };

        let rs = planner().plan(&iam).unwrap();

        assert!(rs.with_iam());
        assert_eq!(
            rs.graph().resource_names(),
            vec!["PolicyCloudWatchMetrics", "PolicyELBPermissions", "ServiceRole"]
        );
    }

    #[test]
    fn test_created_role_defaults() {
        let rs = planner().plan(&ClusterIam::default()).unwrap();

        let role = rs.graph().resource(SERVICE_ROLE).and_then(|r| r.as_role()).unwrap();
        assert_eq!(
            role.managed_policy_arns,
            vec![
                managed_policy_arn(POLICY_EKS_CLUSTER),
                managed_policy_arn(POLICY_EKS_VPC_RESOURCE_CONTROLLER),
            ]
        );
        assert_eq!(
            role.assume_role_policy_document["Statement"][0]["Principal"]["Service"],
            serde_json::json!(["eks.amazonaws.com", "eks-fargate-pods.amazonaws.com"])
        );
        assert!(role.permissions_boundary.is_none());
        assert!(role.role_name.is_none());
        assert!(!rs.with_named_iam());
    }

    #[test]
    fn test_vpc_controller_policy_disabled() {
        let iam = ClusterIam {
            vpc_resource_controller_policy: Some(false),
            ..ClusterIam::default()
        };

        let rs = planner().plan(&iam).unwrap();

        let role = rs.graph().resource(SERVICE_ROLE).and_then(|r| r.as_role()).unwrap();
        assert_eq!(role.managed_policy_arns, vec![managed_policy_arn("AmazonEKSClusterPolicy")]);
    }

    #[test]
    fn test_permissions_boundary_applied() {
        let iam = ClusterIam {
            service_role_permissions_boundary: Some(String::from("arn:aws:iam::1:policy/boundary")),
            ..ClusterIam::default()
        };

        let rs = planner().plan(&iam).unwrap();

        let role = rs.graph().resource(SERVICE_ROLE).and_then(|r| r.as_role()).unwrap();
        assert_eq!(
            role.permissions_boundary,
            Some(Value::from("arn:aws:iam::1:policy/boundary"))
        );
    }

    #[test]
    fn test_fixed_allow_statements() {
        let rs = planner().plan(&ClusterIam::default()).unwrap();

        let elb = rs
            .graph()
            .resource("PolicyELBPermissions")
            .and_then(|r| r.as_policy())
            .unwrap();
        assert_eq!(elb.roles, vec![Value::Ref(String::from(SERVICE_ROLE))]);
        match &elb.policy_document {
            PolicyDocument::Allow(statement) => {
                assert_eq!(statement.actions.len(), 3);
                assert!(statement.actions.contains(&String::from("ec2:DescribeInternetGateways")));
            }
            PolicyDocument::Raw(_) => panic!("expected an allow statement"),
        }

        let metrics = rs.graph().resource("PolicyCloudWatchMetrics").unwrap();
        assert_eq!(metrics.kind(), ResourceKind::Policy);
    }

    #[test]
    fn test_service_role_arn_collected() {
        let rs = planner().plan(&ClusterIam::default()).unwrap();

        let output = rs.graph().output(CLUSTER_SERVICE_ROLE_ARN).unwrap();
        assert!(output.exported);

        let mut iam = ClusterIam::default();
        let reported = HashMap::from([(
            String::from(CLUSTER_SERVICE_ROLE_ARN),
            String::from("arn:aws:iam::1:role/prod-ServiceRole-ABC"),
        )]);
        rs.collect(&mut iam, &reported).unwrap();

        assert!(iam.service_role_arn.is_none());
        assert_eq!(
            iam.status.and_then(|s| s.service_role_arn).as_deref(),
            Some("arn:aws:iam::1:role/prod-ServiceRole-ABC")
        );
    }

    #[test]
    fn test_collected_role_does_not_change_next_plan() {
        let mut iam = ClusterIam::default();
        let first = planner().plan(&iam).unwrap();
        let names: Vec<String> = first.graph().resource_names().iter().map(ToString::to_string).collect();

        let reported = HashMap::from([(
            String::from(CLUSTER_SERVICE_ROLE_ARN),
            String::from("arn:aws:iam::1:role/prod-ServiceRole-ABC"),
        )]);
        first.collect(&mut iam, &reported).unwrap();

        let second = planner().plan(&iam).unwrap();
        assert!(second.with_iam());
        assert_eq!(second.graph().resource_names(), names);
    }
}
