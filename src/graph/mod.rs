//! Declarative resource graph.
//!
//! This module holds the building blocks every planner writes into:
//! - Property values and intrinsic references
//! - IAM resource declarations (roles, instance profiles, policies)
//! - The append-only graph and its template rendering
//! - Helpers attaching policy documents to roles

pub mod policy;
mod resource;
mod template;
mod value;

pub use policy::{
    AllowStatement, PolicyDocument, ResourcePattern, assume_role_for_services, attach_allow,
    attach_document, managed_policy_arn,
};
pub use resource::{InstanceProfile, Policy, Resource, ResourceKind, Role};
pub use template::{Output, Reference, ResourceGraph, TEMPLATE_FORMAT_VERSION, short_hash};
pub use value::Value;
