//! Output bindings: write-backs from provisioned outputs into the
//! specification.
//!
//! A planner records one binding per output name. Once the provisioning
//! engine reports a unit as complete, [`OutputRegistry::resolve`] runs every
//! write-back in a single pass, in registration order. The registry is
//! consumed by resolution, so a write-back can never run twice.

use std::collections::HashMap;
use tracing::debug;

use crate::error::{GraphError, OutputError, Result};

/// Output carrying the control-plane service role ARN.
pub const CLUSTER_SERVICE_ROLE_ARN: &str = "ServiceRoleARN";

/// Output carrying a node group's instance profile ARN.
pub const NODE_GROUP_INSTANCE_PROFILE_ARN: &str = "InstanceProfileARN";

/// Output carrying a node group's instance role ARN.
pub const NODE_GROUP_INSTANCE_ROLE_ARN: &str = "InstanceRoleARN";

/// Write-back invoked with the resolved value of an output.
pub type Collector<'a, S> = Box<dyn FnOnce(&mut S, &str) -> Result<()> + 'a>;

/// Where the value handed to a write-back comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSource {
    /// Reported by the provisioning engine under the output name.
    Provisioned,
    /// Known at planning time and passed through unchanged.
    PassThrough(String),
    /// Known at planning time; the write-back performs an external lookup
    /// with it.
    Lookup(String),
}

impl std::fmt::Display for OutputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provisioned => write!(f, "provisioned"),
            Self::PassThrough(v) => write!(f, "pass-through ({v})"),
            Self::Lookup(v) => write!(f, "lookup ({v})"),
        }
    }
}

struct OutputBinding<'a, S> {
    name: String,
    source: OutputSource,
    collector: Collector<'a, S>,
}

/// Registry of output write-backs for one unit.
pub struct OutputRegistry<'a, S> {
    bindings: Vec<OutputBinding<'a, S>>,
}

impl<'a, S> OutputRegistry<'a, S> {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Records a write-back for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateOutput`] if `name` already has a binding.
    pub fn register(
        &mut self,
        name: &str,
        source: OutputSource,
        collector: impl FnOnce(&mut S, &str) -> Result<()> + 'a,
    ) -> std::result::Result<(), GraphError> {
        if self.contains(name) {
            return Err(GraphError::DuplicateOutput {
                name: name.to_string(),
            });
        }
        debug!("Registering {source} output binding {name}");
        self.bindings.push(OutputBinding {
            name: name.to_string(),
            source,
            collector: Box::new(collector),
        });
        Ok(())
    }

    /// Returns true if `name` already has a binding.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.iter().any(|b| b.name == name)
    }

    /// Returns the source of the binding for `name`.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&OutputSource> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.source)
    }

    /// Iterates over `(name, source)` pairs in registration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &OutputSource)> {
        self.bindings.iter().map(|b| (b.name.as_str(), &b.source))
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if there is no binding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Runs every write-back against `spec`.
    ///
    /// Values of provisioned bindings are taken from `reported`. All of them
    /// are checked before the first write-back runs, so a missing output
    /// leaves `spec` untouched.
    ///
    /// # Errors
    ///
    /// Returns [`OutputError::Missing`] if a provisioned output was not
    /// reported, or the first error returned by a write-back.
    pub fn resolve(self, spec: &mut S, reported: &HashMap<String, String>) -> Result<()> {
        let mut pending = Vec::with_capacity(self.bindings.len());
        for binding in self.bindings {
            let value = match binding.source {
                OutputSource::Provisioned => reported
                    .get(&binding.name)
                    .cloned()
                    .ok_or_else(|| OutputError::Missing {
                        name: binding.name.clone(),
                    })?,
                OutputSource::PassThrough(value) | OutputSource::Lookup(value) => value,
            };
            pending.push((binding.name, value, binding.collector));
        }

        for (name, value, collector) in pending {
            debug!("Collecting output {name}");
            collector(spec, &value)?;
        }
        Ok(())
    }
}

impl<S> Default for OutputRegistry<'_, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for OutputRegistry<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.bindings()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClusterIamError, RoleImportError};

    #[derive(Debug, Default)]
    struct Target {
        profile: Option<String>,
        role: Option<String>,
    }

    #[test]
    fn test_resolve_runs_each_collector_once() {
        let mut registry = OutputRegistry::<Target>::new();
        registry
            .register("Profile", OutputSource::Provisioned, |t, v| {
                t.profile = Some(v.to_string());
                Ok(())
            })
            .unwrap();
        registry
            .register("Role", OutputSource::PassThrough(String::from("R")), |t, v| {
                t.role = Some(v.to_string());
                Ok(())
            })
            .unwrap();

        let reported = HashMap::from([(String::from("Profile"), String::from("P"))]);
        let mut target = Target::default();
        registry.resolve(&mut target, &reported).unwrap();

        assert_eq!(target.profile.as_deref(), Some("P"));
        assert_eq!(target.role.as_deref(), Some("R"));
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut registry = OutputRegistry::<Target>::new();
        registry
            .register("Role", OutputSource::Provisioned, |_, _| Ok(()))
            .unwrap();

        let err = registry
            .register("Role", OutputSource::PassThrough(String::from("x")), |_, _| Ok(()))
            .unwrap_err();

        assert_eq!(
            err,
            GraphError::DuplicateOutput {
                name: String::from("Role")
            }
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.source("Role"), Some(&OutputSource::Provisioned));
    }

    #[test]
    fn test_missing_output_mutates_nothing() {
        let mut registry = OutputRegistry::<Target>::new();
        registry
            .register("Role", OutputSource::PassThrough(String::from("R")), |t, v| {
                t.role = Some(v.to_string());
                Ok(())
            })
            .unwrap();
        registry
            .register("Profile", OutputSource::Provisioned, |t, v| {
                t.profile = Some(v.to_string());
                Ok(())
            })
            .unwrap();

        let mut target = Target::default();
        let err = registry.resolve(&mut target, &HashMap::new()).unwrap_err();

        assert!(matches!(
            err,
            ClusterIamError::Output(OutputError::Missing { ref name }) if name == "Profile"
        ));
        assert!(target.role.is_none());
        assert!(target.profile.is_none());
    }

    #[test]
    fn test_collector_error_surfaces_unchanged() {
        let mut registry = OutputRegistry::<Target>::new();
        registry
            .register("Role", OutputSource::Lookup(String::from("arn:profile:1")), |_, v| {
                Err(RoleImportError::new(v, "not found").into())
            })
            .unwrap();

        let mut target = Target::default();
        let err = registry.resolve(&mut target, &HashMap::new()).unwrap_err();

        match err {
            ClusterIamError::RoleImport(e) => assert_eq!(e, RoleImportError::new("arn:profile:1", "not found")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(target.role.is_none());
    }

    #[test]
    fn test_bindings_keep_registration_order() {
        let mut registry = OutputRegistry::<Target>::new();
        registry.register("B", OutputSource::Provisioned, |_, _| Ok(())).unwrap();
        registry.register("A", OutputSource::Provisioned, |_, _| Ok(())).unwrap();

        let names: Vec<&str> = registry.bindings().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
