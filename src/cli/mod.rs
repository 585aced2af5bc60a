//! CLI module for the cluster IAM planner.
//!
//! This module provides the command-line interface for validating,
//! planning, rendering and collecting IAM units.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, TemplateFormat, UnitCommand};
pub use output::OutputFormatter;
