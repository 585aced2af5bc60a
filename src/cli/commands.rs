//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// clusteriam - IAM resource planner for Kubernetes clusters.
#[derive(Parser, Debug)]
#[command(name = "clusteriam")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "CLUSTERIAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the cluster configuration.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Plan every unit and show what each one declares.
    Plan,

    /// Render the template of one unit.
    Render {
        /// Template format.
        #[arg(short, long, default_value = "json")]
        format: TemplateFormat,

        /// Unit to render.
        #[command(subcommand)]
        unit: UnitCommand,
    },

    /// Write reported stack outputs back into the configuration.
    Collect {
        /// JSON object mapping output names to values.
        #[arg(long)]
        outputs: PathBuf,

        /// Role owning an existing instance profile, as `PROFILE_ARN=ROLE_ARN`.
        #[arg(long = "profile-role", value_parser = parse_profile_role)]
        profile_roles: Vec<(String, String)>,

        /// Write the updated configuration back to the file.
        #[arg(short, long)]
        write: bool,

        /// Unit whose outputs are collected.
        #[command(subcommand)]
        unit: UnitCommand,
    },
}

/// Selects one provisioned unit.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UnitCommand {
    /// The control-plane service role.
    Cluster,

    /// A node group's instance role and profile.
    Nodegroup {
        /// Node group name.
        name: String,
    },

    /// A service account role.
    Serviceaccount {
        /// Namespace of the service account.
        namespace: String,
        /// Service account name.
        name: String,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Template format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TemplateFormat {
    /// JSON template.
    #[default]
    Json,
    /// YAML template.
    Yaml,
}

/// Parses a `PROFILE_ARN=ROLE_ARN` pair.
fn parse_profile_role(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((profile, role)) if !profile.is_empty() && !role.is_empty() => {
            Ok((profile.to_string(), role.to_string()))
        }
        _ => Err(format!("expected PROFILE_ARN=ROLE_ARN, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render_nodegroup() {
        let cli = Cli::try_parse_from(["clusteriam", "render", "--format", "yaml", "nodegroup", "ng-1"]).unwrap();

        match cli.command {
            Commands::Render { format, unit } => {
                assert_eq!(format, TemplateFormat::Yaml);
                assert_eq!(unit, UnitCommand::Nodegroup { name: String::from("ng-1") });
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_collect() {
        let cli = Cli::try_parse_from([
            "clusteriam",
            "collect",
            "--outputs",
            "outputs.json",
            "--profile-role",
            "arn:aws:iam::1:instance-profile/p=arn:aws:iam::1:role/r",
            "--write",
            "serviceaccount",
            "default",
            "s3-reader",
        ])
        .unwrap();

        match cli.command {
            Commands::Collect {
                outputs,
                profile_roles,
                write,
                unit,
            } => {
                assert_eq!(outputs, PathBuf::from("outputs.json"));
                assert_eq!(
                    profile_roles,
                    vec![(
                        String::from("arn:aws:iam::1:instance-profile/p"),
                        String::from("arn:aws:iam::1:role/r")
                    )]
                );
                assert!(write);
                assert_eq!(
                    unit,
                    UnitCommand::Serviceaccount {
                        namespace: String::from("default"),
                        name: String::from("s3-reader"),
                    }
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_profile_role_requires_separator() {
        assert!(parse_profile_role("arn:profile").is_err());
        assert!(parse_profile_role("=arn:role").is_err());
    }
}
