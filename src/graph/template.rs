//! The resource graph: named resource declarations plus named outputs.
//!
//! The graph is append-only. Every reference a declaration carries must
//! point at a resource that is already present, so planners declare in
//! dependency order and the rendered template never dangles.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::GraphError;

use super::resource::Resource;
use super::value::Value;

/// Template format version emitted in rendered templates.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Opaque handle to a declared resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference(String);

impl Reference {
    /// Returns the logical name of the referenced resource.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns a `Ref` to the resource.
    #[must_use]
    pub fn to_ref(&self) -> Value {
        Value::Ref(self.0.clone())
    }

    /// Returns an attribute of the resource.
    #[must_use]
    pub fn get_att(&self, attribute: &str) -> Value {
        Value::GetAtt {
            resource: self.0.clone(),
            attribute: attribute.to_string(),
        }
    }
}

/// A template output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Value of the output.
    pub value: Value,
    /// Whether the output is exported for other stacks.
    pub exported: bool,
}

/// Append-only builder of resource declarations and outputs.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    description: String,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
}

impl ResourceGraph {
    /// Creates an empty graph with the given template description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Declares a new resource.
    ///
    /// The graph is left unchanged when the call fails.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateName`] if `name` is already declared,
    /// or [`GraphError::UnknownReference`] if the resource references an
    /// undeclared resource.
    pub fn declare(
        &mut self,
        name: &str,
        resource: impl Into<Resource>,
    ) -> Result<Reference, GraphError> {
        let resource = resource.into();

        if self.resources.contains_key(name) {
            return Err(GraphError::DuplicateName {
                name: name.to_string(),
            });
        }
        self.check_references(name, resource.references())?;

        debug!("Declaring {} {name}", resource.kind());
        self.resources.insert(name.to_string(), resource);
        Ok(Reference(name.to_string()))
    }

    /// Binds an attribute of a declared resource to an output.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if `name` is already bound, or
    /// [`GraphError::UnknownReference`] if `source` is not part of this graph.
    pub fn bind_output(
        &mut self,
        name: &str,
        source: &Reference,
        attribute: &str,
        exported: bool,
    ) -> Result<(), GraphError> {
        self.bind_output_value(name, source.get_att(attribute), exported)
    }

    /// Binds an arbitrary value to an output.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if `name` is already bound, or
    /// [`GraphError::UnknownReference`] if `value` references an undeclared
    /// resource.
    pub fn bind_output_value(
        &mut self,
        name: &str,
        value: Value,
        exported: bool,
    ) -> Result<(), GraphError> {
        if self.outputs.contains_key(name) {
            return Err(GraphError::DuplicateOutput {
                name: name.to_string(),
            });
        }
        let mut references = Vec::new();
        value.collect_references(&mut references);
        self.check_references(name, references)?;

        debug!("Binding output {name}");
        self.outputs.insert(name.to_string(), Output { value, exported });
        Ok(())
    }

    fn check_references(&self, owner: &str, references: Vec<&str>) -> Result<(), GraphError> {
        match references
            .into_iter()
            .find(|r| !self.resources.contains_key(*r))
        {
            Some(missing) => Err(GraphError::UnknownReference {
                owner: owner.to_string(),
                reference: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Returns a declared resource by name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Iterates over declared resources in name order.
    pub fn resources(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the names of declared resources in name order.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Returns a bound output by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.get(name)
    }

    /// Returns the number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if no resource is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Renders the graph as a pretty-printed JSON template.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_json(&self) -> Result<String, GraphError> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::serialization(e.to_string()))
    }

    /// Renders the graph as a YAML template.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_yaml(&self) -> Result<String, GraphError> {
        serde_yaml::to_string(self).map_err(|e| GraphError::serialization(e.to_string()))
    }

    /// Computes a SHA-256 fingerprint of the rendered template.
    ///
    /// Two graphs with the same declarations always share a fingerprint, so
    /// callers can skip provisioning units whose template did not change.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn fingerprint(&self) -> Result<String, GraphError> {
        let rendered = serde_json::to_vec(self).map_err(|e| GraphError::serialization(e.to_string()))?;
        Ok(hex::encode(Sha256::digest(&rendered)))
    }
}

/// Returns the first 8 characters of a fingerprint, for display.
#[must_use]
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(8).collect()
}

struct RenderedOutput<'o> {
    name: &'o str,
    output: &'o Output,
}

impl Serialize for RenderedOutput<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.output.exported { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("Value", &self.output.value)?;
        if self.output.exported {
            let mut export = BTreeMap::new();
            export.insert("Name", Value::sub(format!("${{AWS::StackName}}::{}", self.name)));
            map.serialize_entry("Export", &export)?;
        }
        map.end()
    }
}

impl Serialize for ResourceGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let outputs: BTreeMap<&str, RenderedOutput<'_>> = self
            .outputs
            .iter()
            .map(|(name, output)| (name.as_str(), RenderedOutput { name, output }))
            .collect();

        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("AWSTemplateFormatVersion", TEMPLATE_FORMAT_VERSION)?;
        map.serialize_entry("Description", &self.description)?;
        map.serialize_entry("Resources", &self.resources)?;
        map.serialize_entry("Outputs", &outputs)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::resource::{InstanceProfile, Role};
    use serde_json::json;

    fn role() -> Role {
        Role {
            assume_role_policy_document: json!({}),
            managed_policy_arns: vec![],
            permissions_boundary: None,
            role_name: None,
        }
    }

    fn profile_for(role: &Reference) -> InstanceProfile {
        InstanceProfile {
            path: String::from("/"),
            roles: vec![role.to_ref()],
        }
    }

    #[test]
    fn test_declare_returns_reference() {
        let mut graph = ResourceGraph::new("test");
        let reference = graph.declare("NodeInstanceRole", role()).unwrap();

        assert_eq!(reference.name(), "NodeInstanceRole");
        assert_eq!(
            reference.get_att("Arn"),
            Value::GetAtt {
                resource: String::from("NodeInstanceRole"),
                attribute: String::from("Arn"),
            }
        );
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_duplicate_name_leaves_graph_unchanged() {
        let mut graph = ResourceGraph::new("test");
        let reference = graph.declare("NodeInstanceRole", role()).unwrap();
        graph.declare("NodeInstanceProfile", profile_for(&reference)).unwrap();
        let before = graph.render_json().unwrap();

        let err = graph
            .declare(
                "NodeInstanceProfile",
                InstanceProfile {
                    path: String::from("/other/"),
                    roles: vec![],
                },
            )
            .unwrap_err();

        assert_eq!(
            err,
            GraphError::DuplicateName {
                name: String::from("NodeInstanceProfile")
            }
        );
        assert_eq!(graph.render_json().unwrap(), before);
    }

    #[test]
    fn test_declare_is_not_idempotent() {
        let mut graph = ResourceGraph::new("test");
        graph.declare("Role1", role()).unwrap();

        assert!(graph.declare("Role1", role()).is_err());
        assert!(graph.declare("Role1", role()).is_err());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let mut graph = ResourceGraph::new("test");
        let foreign = ResourceGraph::new("other")
            .declare("NodeInstanceRole", role())
            .unwrap();

        let err = graph
            .declare("NodeInstanceProfile", profile_for(&foreign))
            .unwrap_err();

        assert_eq!(
            err,
            GraphError::UnknownReference {
                owner: String::from("NodeInstanceProfile"),
                reference: String::from("NodeInstanceRole"),
            }
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let mut graph = ResourceGraph::new("test");
        let reference = graph.declare("Role1", role()).unwrap();
        graph.bind_output("Role1", &reference, "Arn", false).unwrap();

        let err = graph
            .bind_output_value("Role1", Value::literal("arn:aws:iam::1:role/x"), true)
            .unwrap_err();

        assert_eq!(
            err,
            GraphError::DuplicateOutput {
                name: String::from("Role1")
            }
        );
        assert_eq!(graph.output("Role1").map(|o| o.exported), Some(false));
    }

    #[test]
    fn test_render_template_with_exports() {
        let mut graph = ResourceGraph::new("IAM for test");
        let reference = graph.declare("ServiceRole", role()).unwrap();
        graph.bind_output("ServiceRoleARN", &reference, "Arn", true).unwrap();

        let rendered: serde_json::Value =
            serde_json::from_str(&graph.render_json().unwrap()).unwrap();

        assert_eq!(rendered["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert_eq!(rendered["Description"], json!("IAM for test"));
        assert_eq!(rendered["Resources"]["ServiceRole"]["Type"], json!("AWS::IAM::Role"));
        assert_eq!(
            rendered["Outputs"]["ServiceRoleARN"],
            json!({
                "Value": {"Fn::GetAtt": ["ServiceRole", "Arn"]},
                "Export": {"Name": {"Fn::Sub": "${AWS::StackName}::ServiceRoleARN"}}
            })
        );
    }

    #[test]
    fn test_render_yaml() {
        let mut graph = ResourceGraph::new("yaml");
        graph.declare("Role1", role()).unwrap();

        let rendered = graph.render_yaml().unwrap();
        assert!(rendered.contains("AWS::IAM::Role"));
        assert!(rendered.contains("Role1"));
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let mut first = ResourceGraph::new("test");
        first.declare("Role1", role()).unwrap();
        let mut second = ResourceGraph::new("test");
        second.declare("Role1", role()).unwrap();

        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());

        second.declare("Role2", role()).unwrap();
        assert_ne!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    }

    #[test]
    fn test_short_hash() {
        let short = short_hash("abcdef1234567890abcdef1234567890");
        assert_eq!(short, "abcdef12");
    }
}
