//! Property values and intrinsic references.
//!
//! A [`Value`] is either a literal or one of the template intrinsic
//! functions. References to other resources are tracked so the graph can
//! refuse dangling ones.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Prefix of the pseudo parameters provided by the provisioning engine.
const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";

/// A property value inside a resource declaration or an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Plain string.
    Literal(String),
    /// Reference to a resource (or a pseudo parameter).
    Ref(String),
    /// Attribute of a declared resource.
    GetAtt {
        /// Logical name of the resource.
        resource: String,
        /// Attribute name (e.g. `Arn`).
        attribute: String,
    },
    /// String substitution evaluated by the provisioning engine.
    Sub(String),
    /// List of values.
    List(Vec<Value>),
}

impl Value {
    /// Creates a literal value.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Creates a substitution value.
    #[must_use]
    pub fn sub(template: impl Into<String>) -> Self {
        Self::Sub(template.into())
    }

    /// Collects the logical names of every resource this value refers to.
    ///
    /// Pseudo parameters are not resources and are skipped.
    pub fn collect_references<'v>(&'v self, out: &mut Vec<&'v str>) {
        match self {
            Self::Ref(name) if !name.starts_with(PSEUDO_PARAMETER_PREFIX) => out.push(name),
            Self::GetAtt { resource, .. } => out.push(resource),
            Self::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Ref(_) | Self::Literal(_) | Self::Sub(_) => {}
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Literal(s) => serializer.serialize_str(s),
            Self::Ref(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", name)?;
                map.end()
            }
            Self::GetAtt {
                resource,
                attribute,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[resource, attribute])?;
                map.end()
            }
            Self::Sub(template) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Sub", template)?;
                map.end()
            }
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}
