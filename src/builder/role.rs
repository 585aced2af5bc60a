//! Role declaration shared by every planner.

use tracing::debug;

use crate::error::GraphError;
use crate::graph::{Reference, ResourceGraph, Role, Value};

/// What to put into a new role.
#[derive(Debug, Clone)]
pub struct RoleTemplate<'t> {
    /// Trust policy.
    pub trust: serde_json::Value,
    /// Managed policies, in attachment order.
    pub managed_policies: Vec<Value>,
    /// Optional permissions boundary ARN.
    pub permissions_boundary: Option<&'t str>,
    /// Optional caller-fixed role name.
    pub role_name: Option<&'t str>,
}

/// Declares a role named `logical_name` from `template`.
///
/// Empty boundary or role name strings count as unset.
///
/// # Errors
///
/// Returns an error if `logical_name` is already declared.
pub fn declare_role(
    graph: &mut ResourceGraph,
    logical_name: &str,
    template: RoleTemplate<'_>,
) -> Result<Reference, GraphError> {
    let permissions_boundary = template
        .permissions_boundary
        .filter(|b| !b.is_empty())
        .map(Value::from);
    let role_name = template
        .role_name
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    debug!(
        "Declaring role {logical_name} with {} managed policies",
        template.managed_policies.len()
    );

    graph.declare(
        logical_name,
        Role {
            assume_role_policy_document: template.trust,
            managed_policy_arns: template.managed_policies,
            permissions_boundary,
            role_name,
        },
    )
}
