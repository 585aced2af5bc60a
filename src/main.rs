//! clusteriam CLI entrypoint.
//!
//! This is the main entrypoint for the clusteriam command-line tool.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clusteriam::builder::{
    ClusterIamPlanner, ClusterPlan, NodeGroupIamPlanner, OidcTrust, ResourceSet,
    ServiceAccountIamPlanner, StaticRoleImporter, TrustDocumentProvider,
};
use clusteriam::cli::{Cli, Commands, OutputFormatter, TemplateFormat, UnitCommand};
use clusteriam::config::{
    ClusterConfig, ConfigParser, ConfigValidator, OidcConfig, find_config_file,
};
use clusteriam::error::{ClusterIamError, ConfigError, OutputError, Result};

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Dispatches the parsed command.
fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, &formatter),
        Commands::Plan => cmd_plan(cli.config.as_ref(), &formatter),
        Commands::Render { format, unit } => cmd_render(cli.config.as_ref(), format, &unit),
        Commands::Collect {
            outputs,
            profile_roles,
            write,
            unit,
        } => cmd_collect(cli.config.as_ref(), &outputs, profile_roles, write, &unit),
    }
}

/// Validate configuration.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let result = ConfigValidator::new().check(&config);
    eprintln!("{}", formatter.format_validation(&result, show_warnings));

    if result.is_valid() {
        eprintln!("Configuration summary:");
        eprintln!("  Cluster: {}", config.metadata.name);
        eprintln!("  Node groups: {}", config.node_groups.len());
        eprintln!("  Service accounts: {}", config.iam.service_accounts.len());
        Ok(())
    } else {
        Err(ClusterIamError::Config(ConfigError::validation_general(format!(
            "{} error(s) found",
            result.error_count()
        ))))
    }
}

/// Show the plan of every unit.
fn cmd_plan(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let trust = trust_provider(config.iam.oidc.as_ref());
    let importer = StaticRoleImporter::default();

    let plan = ClusterPlan::build(
        &config,
        &importer,
        trust.as_ref().map(|t| t as &dyn TrustDocumentProvider),
    )?;

    write_stdout(&formatter.format_plan(&plan))
}

/// Render the template of one unit.
fn cmd_render(config_path: Option<&PathBuf>, format: TemplateFormat, unit: &UnitCommand) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let cluster = config.metadata.name.as_str();

    match unit {
        UnitCommand::Cluster => {
            let rs = ClusterIamPlanner::new(cluster).plan(&config.iam)?;
            emit_template(&rs, format)
        }
        UnitCommand::Nodegroup { name } => {
            let ng = config.node_group(name).ok_or_else(|| unknown_unit("node group", name))?;
            let importer = StaticRoleImporter::default();
            let plan = NodeGroupIamPlanner::new(cluster, &importer).plan(ng)?;
            debug!("Instance profile for launch template: {:?}", plan.instance_profile_arn);
            emit_template(&plan.resources, format)
        }
        UnitCommand::Serviceaccount { namespace, name } => {
            let sa = config
                .service_account(namespace, name)
                .ok_or_else(|| unknown_unit("service account", &format!("{namespace}/{name}")))?;
            let trust = require_trust(&config)?;
            let rs = ServiceAccountIamPlanner::new(cluster, &trust).plan(sa)?;
            emit_template(&rs, format)
        }
    }
}

/// Write reported outputs back into the configuration.
fn cmd_collect(
    config_path: Option<&PathBuf>,
    outputs_file: &Path,
    profile_roles: Vec<(String, String)>,
    write_back: bool,
    unit: &UnitCommand,
) -> Result<()> {
    let (mut config, config_file) = load_config(config_path)?;
    let reported = read_outputs(outputs_file)?;
    let cluster = config.metadata.name.clone();

    match unit {
        UnitCommand::Cluster => {
            let rs = ClusterIamPlanner::new(&cluster).plan(&config.iam)?;
            rs.collect(&mut config.iam, &reported)?;
        }
        UnitCommand::Nodegroup { name } => {
            let importer = StaticRoleImporter::new(profile_roles);
            let ng = config.node_group(name).ok_or_else(|| unknown_unit("node group", name))?;
            let plan = NodeGroupIamPlanner::new(&cluster, &importer).plan(ng)?;
            let target = config
                .node_group_mut(name)
                .ok_or_else(|| unknown_unit("node group", name))?;
            plan.resources.collect(target, &reported)?;
        }
        UnitCommand::Serviceaccount { namespace, name } => {
            let trust = require_trust(&config)?;
            let qualified = format!("{namespace}/{name}");
            let sa = config
                .service_account(namespace, name)
                .ok_or_else(|| unknown_unit("service account", &qualified))?;
            let rs = ServiceAccountIamPlanner::new(&cluster, &trust).plan(sa)?;
            let target = config
                .service_account_mut(namespace, name)
                .ok_or_else(|| unknown_unit("service account", &qualified))?;
            rs.collect(target, &reported)?;
        }
    }

    if write_back {
        ConfigParser::save_file(&config, &config_file)?;
        eprintln!("Updated: {}", config_file.display());
        Ok(())
    } else {
        write_stdout(&ConfigParser::to_yaml(&config)?)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Creates a parser rooted next to the configuration file.
fn parser_for(config_file: &Path) -> ConfigParser {
    ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")))
}

/// Loads and validates the configuration.
fn load_config(config_path: Option<&PathBuf>) -> Result<(ClusterConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let parser = parser_for(&config_file);
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    ConfigValidator::new().validate(&config)?;

    Ok((config, config_file))
}

fn trust_provider(oidc: Option<&OidcConfig>) -> Option<OidcTrust> {
    oidc.map(OidcTrust::new)
}

fn require_trust(config: &ClusterConfig) -> Result<OidcTrust> {
    trust_provider(config.iam.oidc.as_ref()).ok_or_else(|| {
        ClusterIamError::Config(ConfigError::validation(
            "service accounts require an OIDC provider",
            "iam.oidc",
        ))
    })
}

fn unknown_unit(unit_type: &str, name: &str) -> ClusterIamError {
    ClusterIamError::Config(ConfigError::UnknownUnit {
        unit_type: unit_type.to_string(),
        name: name.to_string(),
    })
}

/// Reads a JSON object of reported outputs.
fn read_outputs(path: &Path) -> Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        ClusterIamError::Output(OutputError::InvalidDocument {
            message: format!("{}: {e}", path.display()),
        })
    })
}

/// Renders `resources` in the requested format to stdout.
fn emit_template<S>(resources: &ResourceSet<'_, S>, format: TemplateFormat) -> Result<()> {
    let capabilities: Vec<&str> = resources.capabilities().iter().map(|c| c.as_str()).collect();
    info!("Required capabilities: [{}]", capabilities.join(", "));

    let rendered = match format {
        TemplateFormat::Json => resources.render_json()?,
        TemplateFormat::Yaml => resources.render_yaml()?,
    };
    write_stdout(&rendered)
}

fn write_stdout(content: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    if !content.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}
