//! A resource set: the graph, output bindings and control flags of one
//! independently provisioned unit.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::graph::{Reference, ResourceGraph, Value};
use crate::outputs::{OutputRegistry, OutputSource};

use super::collaborators::{Capability, ProvisioningEngine};

/// Everything planned for one unit.
///
/// A planner creates the set, fills it and hands it out by value. `S` is
/// the specification fragment the output write-backs update.
#[derive(Debug)]
pub struct ResourceSet<'a, S> {
    graph: ResourceGraph,
    outputs: OutputRegistry<'a, S>,
    with_iam: bool,
    with_named_iam: bool,
}

impl<'a, S> ResourceSet<'a, S> {
    /// Creates an empty set with the given template description.
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            graph: ResourceGraph::new(description),
            outputs: OutputRegistry::new(),
            with_iam: false,
            with_named_iam: false,
        }
    }

    /// Returns the resource graph.
    #[must_use]
    pub const fn graph(&self) -> &ResourceGraph {
        &self.graph
    }

    /// Returns the resource graph for appending declarations.
    pub const fn graph_mut(&mut self) -> &mut ResourceGraph {
        &mut self.graph
    }

    /// Returns the output bindings.
    #[must_use]
    pub const fn outputs(&self) -> &OutputRegistry<'a, S> {
        &self.outputs
    }

    /// States whether IAM resources will be created.
    #[must_use]
    pub const fn with_iam(&self) -> bool {
        self.with_iam
    }

    /// States whether IAM resources with caller-fixed names will be created.
    #[must_use]
    pub const fn with_named_iam(&self) -> bool {
        self.with_named_iam
    }

    pub(crate) const fn set_with_iam(&mut self, with_iam: bool) {
        self.with_iam = with_iam;
    }

    pub(crate) const fn set_with_named_iam(&mut self, with_named_iam: bool) {
        self.with_named_iam = with_named_iam;
    }

    /// Returns the capabilities the provisioning engine must be granted.
    #[must_use]
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut capabilities = Vec::new();
        if self.with_iam {
            capabilities.push(Capability::Iam);
        }
        if self.with_named_iam {
            capabilities.push(Capability::NamedIam);
        }
        capabilities
    }

    /// Binds `resource.attribute` to output `name` and registers its
    /// write-back.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already bound.
    pub fn define_output_from_att(
        &mut self,
        name: &str,
        resource: &Reference,
        attribute: &str,
        exported: bool,
        collector: impl FnOnce(&mut S, &str) -> Result<()> + 'a,
    ) -> Result<()> {
        self.check_output_free(name)?;
        self.graph.bind_output(name, resource, attribute, exported)?;
        self.outputs.register(name, OutputSource::Provisioned, collector)?;
        Ok(())
    }

    /// Declares output `name` with a value known at planning time and
    /// registers a write-back that receives it unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already bound.
    pub fn define_pass_through_output(
        &mut self,
        name: &str,
        value: &str,
        exported: bool,
        collector: impl FnOnce(&mut S, &str) -> Result<()> + 'a,
    ) -> Result<()> {
        self.check_output_free(name)?;
        self.graph
            .bind_output_value(name, Value::literal(value), exported)?;
        self.outputs
            .register(name, OutputSource::PassThrough(value.to_string()), collector)?;
        Ok(())
    }

    /// Registers a write-back that looks up `name` from `key` during
    /// collection. Nothing is added to the template.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is already bound.
    pub fn define_lookup_output(
        &mut self,
        name: &str,
        key: &str,
        collector: impl FnOnce(&mut S, &str) -> Result<()> + 'a,
    ) -> Result<()> {
        self.check_output_free(name)?;
        self.outputs
            .register(name, OutputSource::Lookup(key.to_string()), collector)?;
        Ok(())
    }

    fn check_output_free(&self, name: &str) -> Result<()> {
        if self.outputs.contains(name) || self.graph.output(name).is_some() {
            return Err(crate::error::GraphError::DuplicateOutput {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Renders the template as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_json(&self) -> Result<String> {
        Ok(self.graph.render_json()?)
    }

    /// Renders the template as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_yaml(&self) -> Result<String> {
        Ok(self.graph.render_yaml()?)
    }

    /// Writes the reported outputs back into `spec`, consuming the set.
    ///
    /// # Errors
    ///
    /// Returns an error if a provisioned output is missing or a write-back
    /// fails.
    pub fn collect(self, spec: &mut S, reported: &HashMap<String, String>) -> Result<()> {
        debug!("Collecting {} outputs", self.outputs.len());
        self.outputs.resolve(spec, reported)
    }

    /// Renders the set, provisions it as `stack_name` and collects the
    /// reported outputs into `spec`.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged, or any rendering or collection
    /// error.
    pub fn apply(
        self,
        stack_name: &str,
        engine: &dyn ProvisioningEngine,
        spec: &mut S,
    ) -> Result<()> {
        let template = self.render_json()?;
        info!(
            "Provisioning stack {stack_name} ({} resources)",
            self.graph.len()
        );
        let reported = engine.provision(stack_name, &template, &self.capabilities())?;
        self.collect(spec, &reported)
    }
}
