//! Worker-node instance role and instance profile planning.
//!
//! What a node group needs depends on which identifiers the caller already
//! owns. [`NodeIamState::classify`] picks exactly one of five states up
//! front; each state then has its own build step.

use tracing::{debug, info};

use crate::config::{NodeGroupConfig, NodeGroupIam, NodeGroupIamStatus, is_disabled, non_empty};
use crate::error::{GraphError, Result};
use crate::graph::{
    InstanceProfile, Reference, ResourceGraph, Value, assume_role_for_services, attach_allow,
    attach_document, managed_policy_arn,
};
use crate::outputs::{NODE_GROUP_INSTANCE_PROFILE_ARN, NODE_GROUP_INSTANCE_ROLE_ARN};

use super::TEMPLATE_DESCRIPTION_SUFFIX;
use super::collaborators::RoleImporter;
use super::resource_set::ResourceSet;
use super::role::{RoleTemplate, declare_role};

/// Logical name of the created instance role.
pub const NODE_INSTANCE_ROLE: &str = "NodeInstanceRole";

/// Logical name of the created instance profile.
pub const NODE_INSTANCE_PROFILE: &str = "NodeInstanceProfile";

/// Base managed policy of every created node role.
pub const POLICY_EKS_WORKER_NODE: &str = "AmazonEKSWorkerNodePolicy";
/// Pod networking policy.
pub const POLICY_EKS_CNI: &str = "AmazonEKS_CNI_Policy";
/// Container registry push and pull.
pub const POLICY_ECR_POWER_USER: &str = "AmazonEC2ContainerRegistryPowerUser";
/// Container registry pull.
pub const POLICY_ECR_READ_ONLY: &str = "AmazonEC2ContainerRegistryReadOnly";
/// CloudWatch agent.
pub const POLICY_CLOUDWATCH_AGENT: &str = "CloudWatchAgentServerPolicy";
/// Systems Manager agent.
pub const POLICY_SSM_CORE: &str = "AmazonSSMManagedInstanceCore";
/// X-Ray daemon.
pub const POLICY_XRAY_DAEMON: &str = "AWSXRayDaemonWriteAccess";
/// EBS CSI driver.
pub const POLICY_EBS_CSI_DRIVER: &str = "service-role/AmazonEBSCSIDriverPolicy";

const NODE_PRINCIPALS: &[&str] = &["ec2.amazonaws.com"];

const HOSTED_ZONES: &str = "arn:${AWS::Partition}:route53:::hostedzone/*";

/// IAM configuration state of a node group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIamState {
    /// Both instance profile and role are supplied.
    ExternalProfileAndRole {
        /// Supplied instance profile ARN.
        profile_arn: String,
        /// Supplied instance role ARN.
        role_arn: String,
    },
    /// Only the instance profile is supplied; its role is imported later.
    ExternalProfile {
        /// Supplied instance profile ARN.
        profile_arn: String,
    },
    /// Only the role is supplied; a profile is created for it.
    ExternalRole {
        /// Supplied instance role ARN.
        role_arn: String,
    },
    /// Role and profile are created; the role gets a caller-fixed name.
    ManagedNamed {
        /// Fixed role name.
        role_name: String,
    },
    /// Role and profile are created with generated names.
    Managed,
}

impl NodeIamState {
    /// Picks the state for `iam`. Empty strings count as unset.
    #[must_use]
    pub fn classify(iam: &NodeGroupIam) -> Self {
        let profile = non_empty(iam.instance_profile_arn.as_ref());
        let role = non_empty(iam.instance_role_arn.as_ref());

        match (profile, role) {
            (Some(profile), Some(role)) => Self::ExternalProfileAndRole {
                profile_arn: profile.to_string(),
                role_arn: role.to_string(),
            },
            (Some(profile), None) => Self::ExternalProfile {
                profile_arn: profile.to_string(),
            },
            (None, Some(role)) => Self::ExternalRole {
                role_arn: role.to_string(),
            },
            (None, None) => non_empty(iam.instance_role_name.as_ref()).map_or(Self::Managed, |name| {
                Self::ManagedNamed {
                    role_name: name.to_string(),
                }
            }),
        }
    }

    /// Returns a short name for display.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ExternalProfileAndRole { .. } => "external-profile-and-role",
            Self::ExternalProfile { .. } => "external-profile",
            Self::ExternalRole { .. } => "external-role",
            Self::ManagedNamed { .. } => "managed-named",
            Self::Managed => "managed",
        }
    }

    /// Returns true if the state declares new IAM resources.
    #[must_use]
    pub const fn creates_iam(&self) -> bool {
        !matches!(
            self,
            Self::ExternalProfileAndRole { .. } | Self::ExternalProfile { .. }
        )
    }

    /// Returns true if the state declares a role with a fixed name.
    #[must_use]
    pub const fn creates_named_iam(&self) -> bool {
        matches!(self, Self::ManagedNamed { .. })
    }
}

impl std::fmt::Display for NodeIamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Result of planning a node group.
#[derive(Debug)]
pub struct NodeGroupIamPlan<'a> {
    /// The state the node group was classified into.
    pub state: NodeIamState,
    /// Resources and outputs of the node group unit.
    pub resources: ResourceSet<'a, NodeGroupConfig>,
    /// Instance profile to put in the launch template.
    pub instance_profile_arn: Value,
}

/// Plans the IAM resources of node groups.
pub struct NodeGroupIamPlanner<'a> {
    cluster_name: String,
    importer: &'a dyn RoleImporter,
}

impl std::fmt::Debug for NodeGroupIamPlanner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeGroupIamPlanner")
            .field("cluster_name", &self.cluster_name)
            .finish_non_exhaustive()
    }
}

impl<'a> NodeGroupIamPlanner<'a> {
    /// Creates a planner. `importer` resolves the role of an externally
    /// managed instance profile during output collection.
    #[must_use]
    pub fn new(cluster_name: impl Into<String>, importer: &'a dyn RoleImporter) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            importer,
        }
    }

    /// Plans the IAM resources of `node_group`.
    ///
    /// # Errors
    ///
    /// Returns an error if a declaration collides with an existing name.
    pub fn plan(&self, node_group: &NodeGroupConfig) -> Result<NodeGroupIamPlan<'a>> {
        let state = NodeIamState::classify(&node_group.iam);
        info!("Planning IAM for node group {} ({state})", node_group.name);

        let mut rs = ResourceSet::new(format!(
            "IAM resources for node group {:?} of cluster {:?} {TEMPLATE_DESCRIPTION_SUFFIX}",
            node_group.name, self.cluster_name
        ));
        rs.set_with_iam(state.creates_iam());
        rs.set_with_named_iam(state.creates_named_iam());

        let instance_profile_arn = match &state {
            NodeIamState::ExternalProfileAndRole {
                profile_arn,
                role_arn,
            } => Self::plan_external_profile_and_role(&mut rs, profile_arn, role_arn)?,
            NodeIamState::ExternalProfile { profile_arn } => {
                self.plan_external_profile(&mut rs, profile_arn)?
            }
            NodeIamState::ExternalRole { role_arn } => Self::plan_external_role(&mut rs, role_arn)?,
            NodeIamState::ManagedNamed { .. } | NodeIamState::Managed => {
                Self::plan_managed(&mut rs, &node_group.iam)?
            }
        };

        Ok(NodeGroupIamPlan {
            state,
            resources: rs,
            instance_profile_arn,
        })
    }

    /// Uses both identifiers as they are.
    fn plan_external_profile_and_role(
        rs: &mut ResourceSet<'a, NodeGroupConfig>,
        profile_arn: &str,
        role_arn: &str,
    ) -> Result<Value> {
        rs.define_pass_through_output(NODE_GROUP_INSTANCE_PROFILE_ARN, profile_arn, true, write_profile_arn)?;
        rs.define_pass_through_output(NODE_GROUP_INSTANCE_ROLE_ARN, role_arn, true, write_role_arn)?;
        Ok(Value::literal(profile_arn))
    }

    /// Uses the profile and imports its role once the unit is provisioned.
    fn plan_external_profile(
        &self,
        rs: &mut ResourceSet<'a, NodeGroupConfig>,
        profile_arn: &str,
    ) -> Result<Value> {
        rs.define_pass_through_output(NODE_GROUP_INSTANCE_PROFILE_ARN, profile_arn, true, write_profile_arn)?;

        let importer = self.importer;
        rs.define_lookup_output(
            NODE_GROUP_INSTANCE_ROLE_ARN,
            profile_arn,
            move |ng: &mut NodeGroupConfig, profile: &str| {
                let role_arn = importer.import_instance_role(profile)?;
                debug!("Imported instance role {role_arn} from {profile}");
                node_status(ng).instance_role_arn = Some(role_arn);
                Ok(())
            },
        )?;
        Ok(Value::literal(profile_arn))
    }

    /// Creates a profile around the supplied role.
    fn plan_external_role(rs: &mut ResourceSet<'a, NodeGroupConfig>, role_arn: &str) -> Result<Value> {
        // The role is not part of the graph, so the profile holds its
        // identifier rather than a reference.
        let profile = rs.graph_mut().declare(
            NODE_INSTANCE_PROFILE,
            InstanceProfile {
                path: String::from("/"),
                roles: vec![Value::literal(role_arn)],
            },
        )?;

        rs.define_output_from_att(NODE_GROUP_INSTANCE_PROFILE_ARN, &profile, "Arn", true, write_profile_arn)?;
        rs.define_pass_through_output(NODE_GROUP_INSTANCE_ROLE_ARN, role_arn, true, write_role_arn)?;
        Ok(profile.get_att("Arn"))
    }

    /// Creates both role and profile.
    fn plan_managed(rs: &mut ResourceSet<'a, NodeGroupConfig>, iam: &NodeGroupIam) -> Result<Value> {
        let role = create_node_role(rs.graph_mut(), iam)?;
        let profile = rs.graph_mut().declare(
            NODE_INSTANCE_PROFILE,
            InstanceProfile {
                path: String::from("/"),
                roles: vec![role.to_ref()],
            },
        )?;

        rs.define_output_from_att(NODE_GROUP_INSTANCE_PROFILE_ARN, &profile, "Arn", true, write_profile_arn)?;
        rs.define_output_from_att(NODE_GROUP_INSTANCE_ROLE_ARN, &role, "Arn", true, write_role_arn)?;
        Ok(profile.get_att("Arn"))
    }
}

fn node_status(ng: &mut NodeGroupConfig) -> &mut NodeGroupIamStatus {
    ng.iam.status.get_or_insert_with(NodeGroupIamStatus::default)
}

#[allow(clippy::unnecessary_wraps)]
fn write_profile_arn(ng: &mut NodeGroupConfig, value: &str) -> Result<()> {
    node_status(ng).instance_profile_arn = Some(value.to_string());
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn write_role_arn(ng: &mut NodeGroupConfig, value: &str) -> Result<()> {
    node_status(ng).instance_role_arn = Some(value.to_string());
    Ok(())
}

/// Returns the managed policies of a created node role, in attachment order.
#[must_use]
pub fn node_managed_policies(iam: &NodeGroupIam) -> Vec<Value> {
    let addons = &iam.with_addon_policies;
    let mut policies = vec![managed_policy_arn(POLICY_EKS_WORKER_NODE)];

    if !is_disabled(iam.cni_policy) {
        policies.push(managed_policy_arn(POLICY_EKS_CNI));
    }
    if addons.image_builder {
        policies.push(managed_policy_arn(POLICY_ECR_POWER_USER));
    } else {
        policies.push(managed_policy_arn(POLICY_ECR_READ_ONLY));
    }
    if addons.cloud_watch {
        policies.push(managed_policy_arn(POLICY_CLOUDWATCH_AGENT));
    }
    if addons.ssm {
        policies.push(managed_policy_arn(POLICY_SSM_CORE));
    }
    if addons.xray {
        policies.push(managed_policy_arn(POLICY_XRAY_DAEMON));
    }
    if addons.ebs {
        policies.push(managed_policy_arn(POLICY_EBS_CSI_DRIVER));
    }

    policies.extend(iam.attach_policy_arns.iter().map(|arn| Value::literal(arn.as_str())));
    policies
}

/// Declares the node role and every inline policy it needs.
fn create_node_role(graph: &mut ResourceGraph, iam: &NodeGroupIam) -> std::result::Result<Reference, GraphError> {
    let role = declare_role(
        graph,
        NODE_INSTANCE_ROLE,
        RoleTemplate {
            trust: assume_role_for_services(NODE_PRINCIPALS),
            managed_policies: node_managed_policies(iam),
            permissions_boundary: non_empty(iam.instance_role_permissions_boundary.as_ref()),
            role_name: non_empty(iam.instance_role_name.as_ref()),
        },
    )?;

    let addons = &iam.with_addon_policies;
    if addons.auto_scaler {
        attach_allow(
            graph,
            "PolicyAutoScaling",
            &role,
            "*",
            &[
                "autoscaling:DescribeAutoScalingGroups",
                "autoscaling:DescribeAutoScalingInstances",
                "autoscaling:DescribeLaunchConfigurations",
                "autoscaling:DescribeTags",
                "autoscaling:SetDesiredCapacity",
                "autoscaling:TerminateInstanceInAutoScalingGroup",
                "ec2:DescribeLaunchTemplateVersions",
            ],
        )?;
    }

    if addons.external_dns {
        attach_allow(
            graph,
            "PolicyExternalDNSChangeSet",
            &role,
            Value::sub(HOSTED_ZONES),
            &["route53:ChangeResourceRecordSets"],
        )?;
        attach_allow(
            graph,
            "PolicyExternalDNSHostedZones",
            &role,
            "*",
            &[
                "route53:ListHostedZones",
                "route53:ListResourceRecordSets",
                "route53:ListTagsForResource",
            ],
        )?;
    }

    if addons.cert_manager {
        attach_allow(
            graph,
            "PolicyCertManagerChangeSet",
            &role,
            Value::sub(HOSTED_ZONES),
            &["route53:ChangeResourceRecordSets"],
        )?;
        attach_allow(
            graph,
            "PolicyCertManagerGetChange",
            &role,
            Value::sub("arn:${AWS::Partition}:route53:::change/*"),
            &["route53:GetChange"],
        )?;
        attach_allow(
            graph,
            "PolicyCertManagerHostedZones",
            &role,
            "*",
            &["route53:ListResourceRecordSets", "route53:ListHostedZonesByName"],
        )?;
    }

    if let Some(document) = &iam.attach_policy {
        attach_document(graph, "PolicyCustom", &role, document.clone())?;
    }

    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::collaborators::MockRoleImporter;
    use crate::config::AddonPolicies;
    use crate::error::{ClusterIamError, RoleImportError};
    use crate::outputs::OutputSource;
    use serde_json::json;
    use std::collections::HashMap;

    fn node_group(iam: NodeGroupIam) -> NodeGroupConfig {
        NodeGroupConfig {
            name: String::from("ng-1"),
            iam,
        }
    }

    fn unused_importer() -> MockRoleImporter {
        let mut importer = MockRoleImporter::new();
        importer.expect_import_instance_role().never();
        importer
    }

    fn profile_and_role() -> NodeGroupIam {
        NodeGroupIam {
            instance_profile_arn: Some(String::from("arn:profile:1")),
            instance_role_arn: Some(String::from("arn:role:1")),
            ..NodeGroupIam::default()
        }
    }

    fn profile_only() -> NodeGroupIam {
        NodeGroupIam {
            instance_profile_arn: Some(String::from("arn:profile:1")),
            ..NodeGroupIam::default()
        }
    }

    fn role_only() -> NodeGroupIam {
        NodeGroupIam {
            instance_role_arn: Some(String::from("arn:role:1")),
            ..NodeGroupIam::default()
        }
    }

    fn named() -> NodeGroupIam {
        NodeGroupIam {
            instance_role_name: Some(String::from("workers")),
            ..NodeGroupIam::default()
        }
    }

    #[test]
    fn test_classify_all_states() {
        assert_eq!(
            NodeIamState::classify(&profile_and_role()),
            NodeIamState::ExternalProfileAndRole {
                profile_arn: String::from("arn:profile:1"),
                role_arn: String::from("arn:role:1"),
            }
        );
        assert_eq!(
            NodeIamState::classify(&profile_only()),
            NodeIamState::ExternalProfile {
                profile_arn: String::from("arn:profile:1"),
            }
        );
        assert_eq!(
            NodeIamState::classify(&role_only()),
            NodeIamState::ExternalRole {
                role_arn: String::from("arn:role:1"),
            }
        );
        assert_eq!(
            NodeIamState::classify(&named()),
            NodeIamState::ManagedNamed {
                role_name: String::from("workers"),
            }
        );
        assert_eq!(NodeIamState::classify(&NodeGroupIam::default()), NodeIamState::Managed);
    }

    #[test]
    fn test_classify_profile_wins_over_role_name() {
        let iam = NodeGroupIam {
            instance_role_name: Some(String::from("workers")),
            ..profile_only()
        };
        assert!(matches!(NodeIamState::classify(&iam), NodeIamState::ExternalProfile { .. }));
    }

    #[test]
    fn test_classify_empty_strings_are_unset() {
        let iam = NodeGroupIam {
            instance_profile_arn: Some(String::new()),
            instance_role_arn: Some(String::new()),
            instance_role_name: Some(String::new()),
            ..NodeGroupIam::default()
        };
        assert_eq!(NodeIamState::classify(&iam), NodeIamState::Managed);
    }

    #[test]
    fn test_flags_and_resources_per_state() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);

        let cases: Vec<(NodeGroupIam, bool, bool, Vec<&str>)> = vec![
            (profile_and_role(), false, false, vec![]),
            (profile_only(), false, false, vec![]),
            (role_only(), true, false, vec![NODE_INSTANCE_PROFILE]),
            (named(), true, true, vec![NODE_INSTANCE_PROFILE, NODE_INSTANCE_ROLE]),
            (NodeGroupIam::default(), true, false, vec![NODE_INSTANCE_PROFILE, NODE_INSTANCE_ROLE]),
        ];

        for (iam, with_iam, with_named_iam, resources) in cases {
            let plan = planner.plan(&node_group(iam)).unwrap();
            let state = plan.state.name();
            assert_eq!(plan.resources.with_iam(), with_iam, "with_iam for {state}");
            assert_eq!(plan.resources.with_named_iam(), with_named_iam, "with_named_iam for {state}");
            assert_eq!(plan.resources.graph().resource_names(), resources, "resources for {state}");
        }
    }

    #[test]
    fn test_external_profile_and_role_passes_both_through() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);
        let ng = node_group(profile_and_role());

        let plan = planner.plan(&ng).unwrap();
        let outputs = plan.resources.outputs();

        assert_eq!(
            outputs.source(NODE_GROUP_INSTANCE_PROFILE_ARN),
            Some(&OutputSource::PassThrough(String::from("arn:profile:1")))
        );
        assert_eq!(
            outputs.source(NODE_GROUP_INSTANCE_ROLE_ARN),
            Some(&OutputSource::PassThrough(String::from("arn:role:1")))
        );
        assert_eq!(plan.instance_profile_arn, Value::literal("arn:profile:1"));

        let mut target = ng.clone();
        plan.resources.collect(&mut target, &HashMap::new()).unwrap();
        assert_eq!(target, ng);
    }

    #[test]
    fn test_external_profile_imports_role() {
        let mut importer = MockRoleImporter::new();
        importer
            .expect_import_instance_role()
            .withf(|profile| profile == "arn:profile:1")
            .times(1)
            .returning(|_| Ok(String::from("arn:role:imported")));
        let planner = NodeGroupIamPlanner::new("prod", &importer);
        let ng = node_group(profile_only());

        let plan = planner.plan(&ng).unwrap();
        let bindings: Vec<(&str, &OutputSource)> = plan.resources.outputs().bindings().collect();
        assert_eq!(
            bindings,
            vec![
                (
                    NODE_GROUP_INSTANCE_PROFILE_ARN,
                    &OutputSource::PassThrough(String::from("arn:profile:1"))
                ),
                (
                    NODE_GROUP_INSTANCE_ROLE_ARN,
                    &OutputSource::Lookup(String::from("arn:profile:1"))
                ),
            ]
        );
        assert!(plan.resources.graph().output(NODE_GROUP_INSTANCE_ROLE_ARN).is_none());

        let mut target = ng.clone();
        plan.resources.collect(&mut target, &HashMap::new()).unwrap();
        assert_eq!(target.iam.instance_role_arn, None);
        assert_eq!(
            target.iam.status,
            Some(NodeGroupIamStatus {
                instance_profile_arn: Some(String::from("arn:profile:1")),
                instance_role_arn: Some(String::from("arn:role:imported")),
            })
        );
    }

    #[test]
    fn test_external_profile_import_failure() {
        let mut importer = MockRoleImporter::new();
        importer
            .expect_import_instance_role()
            .times(1)
            .returning(|profile| Err(RoleImportError::new(profile, "profile has no role")));
        let planner = NodeGroupIamPlanner::new("prod", &importer);
        let ng = node_group(profile_only());

        let plan = planner.plan(&ng).unwrap();
        let mut target = ng.clone();
        let err = plan.resources.collect(&mut target, &HashMap::new()).unwrap_err();

        match err {
            ClusterIamError::RoleImport(e) => {
                assert_eq!(e, RoleImportError::new("arn:profile:1", "profile has no role"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(target.iam.status.and_then(|s| s.instance_role_arn).is_none());
    }

    #[test]
    fn test_external_role_creates_profile() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);
        let ng = node_group(role_only());

        let plan = planner.plan(&ng).unwrap();
        let graph = plan.resources.graph();

        let profile = graph
            .resource(NODE_INSTANCE_PROFILE)
            .and_then(|r| r.as_instance_profile())
            .unwrap();
        assert_eq!(profile.roles, vec![Value::literal("arn:role:1")]);
        assert_eq!(profile.path, "/");
        assert_eq!(
            plan.resources.outputs().source(NODE_GROUP_INSTANCE_ROLE_ARN),
            Some(&OutputSource::PassThrough(String::from("arn:role:1")))
        );
        assert_eq!(plan.instance_profile_arn, Value::GetAtt {
            resource: String::from(NODE_INSTANCE_PROFILE),
            attribute: String::from("Arn"),
        });

        let mut target = ng.clone();
        let reported = HashMap::from([(String::from(NODE_GROUP_INSTANCE_PROFILE_ARN), String::from("P"))]);
        plan.resources.collect(&mut target, &reported).unwrap();
        assert!(target.iam.instance_profile_arn.is_none());
        assert_eq!(
            target.iam.status,
            Some(NodeGroupIamStatus {
                instance_profile_arn: Some(String::from("P")),
                instance_role_arn: Some(String::from("arn:role:1")),
            })
        );
    }

    #[test]
    fn test_managed_round_trip_writes_only_arns() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);
        let ng = node_group(NodeGroupIam {
            attach_policy_arns: vec![String::from("arn:aws:iam::1:policy/extra")],
            ..NodeGroupIam::default()
        });

        let plan = planner.plan(&ng).unwrap();
        let mut target = ng.clone();
        let reported = HashMap::from([
            (String::from(NODE_GROUP_INSTANCE_PROFILE_ARN), String::from("P")),
            (String::from(NODE_GROUP_INSTANCE_ROLE_ARN), String::from("R")),
        ]);
        plan.resources.collect(&mut target, &reported).unwrap();

        let mut expected = ng.clone();
        expected.iam.status = Some(NodeGroupIamStatus {
            instance_profile_arn: Some(String::from("P")),
            instance_role_arn: Some(String::from("R")),
        });
        assert_eq!(target, expected);

        let replanned = planner.plan(&target).unwrap();
        assert_eq!(replanned.state, NodeIamState::Managed);
        assert_eq!(
            replanned.resources.graph().resource_names(),
            vec![NODE_INSTANCE_PROFILE, NODE_INSTANCE_ROLE]
        );
    }

    #[test]
    fn test_managed_profile_references_role() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);

        let plan = planner.plan(&node_group(NodeGroupIam::default())).unwrap();
        let graph = plan.resources.graph();

        let profile = graph
            .resource(NODE_INSTANCE_PROFILE)
            .and_then(|r| r.as_instance_profile())
            .unwrap();
        assert_eq!(profile.roles, vec![Value::Ref(String::from(NODE_INSTANCE_ROLE))]);

        let role = graph.resource(NODE_INSTANCE_ROLE).and_then(|r| r.as_role()).unwrap();
        assert_eq!(
            role.assume_role_policy_document["Statement"][0]["Principal"]["Service"],
            json!(["ec2.amazonaws.com"])
        );
        assert!(role.role_name.is_none());
        assert!(graph.output(NODE_GROUP_INSTANCE_PROFILE_ARN).is_some_and(|o| o.exported));
        assert!(graph.output(NODE_GROUP_INSTANCE_ROLE_ARN).is_some_and(|o| o.exported));
    }

    #[test]
    fn test_managed_named_role() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);
        let ng = node_group(NodeGroupIam {
            instance_role_permissions_boundary: Some(String::from("arn:aws:iam::1:policy/boundary")),
            ..named()
        });

        let plan = planner.plan(&ng).unwrap();
        let role = plan
            .resources
            .graph()
            .resource(NODE_INSTANCE_ROLE)
            .and_then(|r| r.as_role())
            .unwrap();

        assert_eq!(role.role_name.as_deref(), Some("workers"));
        assert_eq!(role.permissions_boundary, Some(Value::literal("arn:aws:iam::1:policy/boundary")));
    }

    #[test]
    fn test_default_managed_policies() {
        assert_eq!(
            node_managed_policies(&NodeGroupIam::default()),
            vec![
                managed_policy_arn(POLICY_EKS_WORKER_NODE),
                managed_policy_arn(POLICY_EKS_CNI),
                managed_policy_arn(POLICY_ECR_READ_ONLY),
            ]
        );
    }

    #[test]
    fn test_managed_policies_follow_flags() {
        let iam = NodeGroupIam {
            cni_policy: Some(false),
            attach_policy_arns: vec![String::from("arn:aws:iam::1:policy/extra")],
            with_addon_policies: AddonPolicies {
                image_builder: true,
                cloud_watch: true,
                ..AddonPolicies::default()
            },
            ..NodeGroupIam::default()
        };

        assert_eq!(
            node_managed_policies(&iam),
            vec![
                managed_policy_arn(POLICY_EKS_WORKER_NODE),
                managed_policy_arn(POLICY_ECR_POWER_USER),
                managed_policy_arn(POLICY_CLOUDWATCH_AGENT),
                Value::literal("arn:aws:iam::1:policy/extra"),
            ]
        );
    }

    #[test]
    fn test_addon_and_custom_policies_attached() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);
        let ng = node_group(NodeGroupIam {
            attach_policy: Some(json!({"Version": "2012-10-17", "Statement": []})),
            with_addon_policies: AddonPolicies {
                auto_scaler: true,
                external_dns: true,
                cert_manager: true,
                ..AddonPolicies::default()
            },
            ..NodeGroupIam::default()
        });

        let plan = planner.plan(&ng).unwrap();

        assert_eq!(
            plan.resources.graph().resource_names(),
            vec![
                NODE_INSTANCE_PROFILE,
                NODE_INSTANCE_ROLE,
                "PolicyAutoScaling",
                "PolicyCertManagerChangeSet",
                "PolicyCertManagerGetChange",
                "PolicyCertManagerHostedZones",
                "PolicyCustom",
                "PolicyExternalDNSChangeSet",
                "PolicyExternalDNSHostedZones",
            ]
        );
    }

    #[test]
    fn test_template_renders() {
        let importer = unused_importer();
        let planner = NodeGroupIamPlanner::new("prod", &importer);

        let plan = planner.plan(&node_group(NodeGroupIam::default())).unwrap();
        let rendered: serde_json::Value =
            serde_json::from_str(&plan.resources.render_json().unwrap()).unwrap();

        assert_eq!(
            rendered["Outputs"]["InstanceRoleARN"]["Value"],
            json!({"Fn::GetAtt": ["NodeInstanceRole", "Arn"]})
        );
        assert_eq!(
            rendered["Resources"]["NodeInstanceProfile"]["Properties"]["Roles"],
            json!([{"Ref": "NodeInstanceRole"}])
        );
    }
}
