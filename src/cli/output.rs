//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::builder::{ClusterPlan, UnitSummary};
use crate::config::ValidationResult;
use crate::graph::short_hash;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Unit row for table display.
#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Capabilities")]
    capabilities: String,
    #[tabled(rename = "Resources")]
    resources: usize,
    #[tabled(rename = "Outputs")]
    outputs: String,
    #[tabled(rename = "Hash")]
    hash: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a cluster plan for display.
    #[must_use]
    pub fn format_plan(&self, plan: &ClusterPlan) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(plan).unwrap_or_default(),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(plan: &ClusterPlan) -> String {
        let mut output = String::new();

        let _ = write!(output, "\nIAM plan for cluster {}\n\n", plan.cluster.bold());

        let rows: Vec<UnitRow> = plan.units.iter().map(Self::unit_row).collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        for unit in &plan.units {
            let _ = writeln!(output, "\n{} ({})", unit.stack_name.bold(), unit.kind);
            if unit.resources.is_empty() {
                let _ = writeln!(output, "   {}", "no resources".dimmed());
            }
            for resource in &unit.resources {
                let _ = writeln!(
                    output,
                    "   {} {} {}",
                    "+".green(),
                    resource.logical_name,
                    resource.resource_type.dimmed()
                );
            }
            for out in &unit.outputs {
                let _ = writeln!(output, "   {} {} <- {}", "=".cyan(), out.name, out.source);
            }
        }

        let _ = write!(
            output,
            "\nPlan: {} units, {} create IAM resources, {} resources in total\n",
            plan.units.len(),
            plan.iam_unit_count().to_string().yellow(),
            plan.resource_count().to_string().green()
        );

        output
    }

    fn unit_row(unit: &UnitSummary) -> UnitRow {
        let capabilities = match (unit.with_iam, unit.with_named_iam) {
            (_, true) => "iam, named-iam".yellow().to_string(),
            (true, false) => "iam".yellow().to_string(),
            (false, false) => "none".dimmed().to_string(),
        };

        UnitRow {
            kind: unit.kind.to_string(),
            name: Self::truncate(&unit.name, 40),
            state: unit.state.clone(),
            capabilities,
            resources: unit.resources.len(),
            outputs: unit
                .outputs
                .iter()
                .map(|o| o.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            hash: short_hash(&unit.fingerprint),
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": if show_warnings { result.warnings.clone() } else { Vec::new() },
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid\n", "✓".green())
                } else {
                    let mut output = format!(
                        "{} Configuration has {} error(s):\n",
                        "✗".red(),
                        result.error_count()
                    );
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{kept}...")
        }
    }
}
