//! Configuration module for the cluster IAM planner.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `clusteriam.yaml`
//! - Validation of configuration values
//! - Serializing the specification after outputs are written back

mod parser;
mod spec;
mod validator;

pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, ENV_CLUSTER_NAME, ENV_REGION, find_config_file};
pub use spec::{
    AddonPolicies, ClusterConfig, ClusterIam, ClusterIamStatus, ClusterMeta, NodeGroupConfig,
    NodeGroupIam, NodeGroupIamStatus, OidcConfig, ServiceAccountConfig, ServiceAccountMeta,
    ServiceAccountStatus, is_disabled, non_empty,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
