//! Policy documents and the helpers that attach them to roles.

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::GraphError;

use super::resource::Policy;
use super::template::{Reference, ResourceGraph};
use super::value::Value;

/// Policy language version used by every generated document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Resources an allow statement applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResourcePattern {
    /// A single pattern such as `*`.
    Single(Value),
    /// A set of patterns.
    Many(Vec<Value>),
}

/// A single `Allow` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowStatement {
    /// Resources the statement covers.
    pub resources: ResourcePattern,
    /// Actions granted.
    pub actions: Vec<String>,
}

/// The permissions carried by a [`Policy`] resource.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyDocument {
    /// One generated allow statement.
    Allow(AllowStatement),
    /// A caller-supplied document, rendered as-is.
    Raw(serde_json::Value),
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RenderedStatement<'d> {
    effect: &'static str,
    resource: &'d ResourcePattern,
    action: &'d [String],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RenderedDocument<'d> {
    version: &'static str,
    statement: [RenderedStatement<'d>; 1],
}

impl PolicyDocument {
    /// Collects the logical names referenced by the statement resources.
    pub fn collect_references<'v>(&'v self, out: &mut Vec<&'v str>) {
        if let Self::Allow(statement) = self {
            match &statement.resources {
                ResourcePattern::Single(value) => value.collect_references(out),
                ResourcePattern::Many(values) => {
                    for value in values {
                        value.collect_references(out);
                    }
                }
            }
        }
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Allow(statement) => RenderedDocument {
                version: POLICY_VERSION,
                statement: [RenderedStatement {
                    effect: "Allow",
                    resource: &statement.resources,
                    action: &statement.actions,
                }],
            }
            .serialize(serializer),
            Self::Raw(document) => document.serialize(serializer),
        }
    }
}

impl From<&str> for ResourcePattern {
    fn from(pattern: &str) -> Self {
        Self::Single(Value::from(pattern))
    }
}

impl From<Value> for ResourcePattern {
    fn from(pattern: Value) -> Self {
        Self::Single(pattern)
    }
}

impl From<Vec<&str>> for ResourcePattern {
    fn from(patterns: Vec<&str>) -> Self {
        Self::Many(patterns.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<Value>> for ResourcePattern {
    fn from(patterns: Vec<Value>) -> Self {
        Self::Many(patterns)
    }
}

/// Declares an inline policy named `name` that allows `actions` on
/// `resources`, attached to `role`.
///
/// # Errors
///
/// Returns an error if `name` is already declared or `role` is not part of
/// the graph.
pub fn attach_allow(
    graph: &mut ResourceGraph,
    name: &str,
    role: &Reference,
    resources: impl Into<ResourcePattern>,
    actions: &[&str],
) -> Result<Reference, GraphError> {
    debug!("Attaching allow policy {name} to {}", role.name());
    let document = PolicyDocument::Allow(AllowStatement {
        resources: resources.into(),
        actions: actions.iter().map(|a| (*a).to_string()).collect(),
    });
    attach(graph, name, role, document)
}

/// Declares an inline policy named `name` carrying a caller-supplied
/// document, attached to `role`.
///
/// # Errors
///
/// Returns an error if `name` is already declared or `role` is not part of
/// the graph.
pub fn attach_document(
    graph: &mut ResourceGraph,
    name: &str,
    role: &Reference,
    document: serde_json::Value,
) -> Result<Reference, GraphError> {
    debug!("Attaching policy document {name} to {}", role.name());
    attach(graph, name, role, PolicyDocument::Raw(document))
}

fn attach(
    graph: &mut ResourceGraph,
    name: &str,
    role: &Reference,
    document: PolicyDocument,
) -> Result<Reference, GraphError> {
    graph.declare(
        name,
        Policy {
            policy_name: stack_scoped_name(name),
            roles: vec![role.to_ref()],
            policy_document: document,
        },
    )
}

/// Returns `<stack name>-<name>`, resolved by the provisioning engine.
#[must_use]
pub fn stack_scoped_name(name: &str) -> Value {
    Value::sub(format!("${{AWS::StackName}}-{name}"))
}

/// Returns the partition-aware ARN of an AWS managed policy.
#[must_use]
pub fn managed_policy_arn(name: &str) -> Value {
    Value::sub(format!("arn:${{AWS::Partition}}:iam::aws:policy/{name}"))
}

/// Builds a trust policy allowing the given service principals to assume
/// the role.
#[must_use]
pub fn assume_role_for_services(services: &[&str]) -> serde_json::Value {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": services },
            "Action": ["sts:AssumeRole"],
        }],
    })
}
