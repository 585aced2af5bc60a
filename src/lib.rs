// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # clusteriam
//!
//! Plans the IAM resources a managed Kubernetes cluster needs and writes the
//! provisioned identifiers back into the cluster specification.
//!
//! ## Overview
//!
//! Each slice of the specification becomes an independently provisioned
//! unit: a resource graph rendered as an infrastructure template, plus the
//! output bindings that copy provisioned identifiers back once the unit is
//! complete.
//!
//! - The control plane gets a service role, or reuses an existing one
//! - Every node group gets an instance role and instance profile, or reuses
//!   the ones it is given
//! - Every service account gets a role federated through the cluster's OIDC
//!   provider
//!
//! ## Architecture
//!
//! 1. **Specification**: Defined in `clusteriam.yaml`
//! 2. **Planning**: A planner fills a [`builder::ResourceSet`] per unit
//! 3. **Provisioning**: An external [`builder::ProvisioningEngine`] creates the stack
//! 4. **Collection**: Reported outputs are written back into the specification
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`graph`]: Resource graph, intrinsic values and policy documents
//! - [`outputs`]: Output bindings and write-backs
//! - [`builder`]: Cluster, node group and service account planners
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! metadata:
//!   name: prod
//!   region: eu-west-1
//!
//! node_groups:
//!   - name: ng-1
//!     iam:
//!       with_addon_policies:
//!         auto_scaler: true
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod outputs;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{
    ClusterIamPlanner, ClusterPlan, NodeGroupIamPlanner, NodeIamState, ResourceSet,
    ServiceAccountIamPlanner,
};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ClusterConfig, ConfigParser, ConfigValidator};
pub use error::{ClusterIamError, Result};
pub use graph::{ResourceGraph, Value};
pub use outputs::{OutputRegistry, OutputSource};
