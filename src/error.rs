//! Error types for the cluster IAM planner.
//!
//! This module provides the error hierarchy for every stage of a unit's
//! life: configuration, resource graph construction, output collection,
//! role import and provisioning.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the cluster IAM planner.
#[derive(Debug, Error)]
pub enum ClusterIamError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource graph construction errors.
    #[error("Resource graph error: {0}")]
    Graph(#[from] GraphError),

    /// Output collection errors.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// The owning role of an instance profile could not be imported.
    #[error(transparent)]
    RoleImport(#[from] RoleImportError),

    /// The provisioning engine failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A unit referenced on the command line does not exist.
    #[error("Unknown {unit_type}: {name}")]
    UnknownUnit {
        /// Type of unit (node group, service account).
        unit_type: String,
        /// The requested name.
        name: String,
    },
}

/// Resource graph construction errors.
///
/// All of them are programmer or configuration errors and abort planning of
/// the unit that raised them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A resource with the same logical name is already declared.
    #[error("Duplicate resource name: {name}")]
    DuplicateName {
        /// The duplicated logical name.
        name: String,
    },

    /// An output with the same name is already bound.
    #[error("Duplicate output name: {name}")]
    DuplicateOutput {
        /// The duplicated output name.
        name: String,
    },

    /// A property references a resource that is not declared yet.
    #[error("'{owner}' references undeclared resource '{reference}'")]
    UnknownReference {
        /// Resource or output holding the reference.
        owner: String,
        /// The unresolved logical name.
        reference: String,
    },

    /// The template could not be serialized.
    #[error("Template serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },
}

/// Output collection errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutputError {
    /// The provisioning engine did not report a bound output.
    #[error("Output '{name}' was not reported by the provisioning engine")]
    Missing {
        /// Name of the missing output.
        name: String,
    },

    /// The reported outputs could not be decoded.
    #[error("Invalid outputs document: {message}")]
    InvalidDocument {
        /// Description of the decoding issue.
        message: String,
    },
}

/// Failure to import the role that owns an externally managed instance profile.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Failed to import instance role from profile {profile_arn}: {message}")]
pub struct RoleImportError {
    /// The instance profile that was looked up.
    pub profile_arn: String,
    /// Description of the failure.
    pub message: String,
}

/// Opaque failure reported by the provisioning engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Provisioning of stack {stack} failed: {message}")]
pub struct ProvisionError {
    /// Stack that failed to provision.
    pub stack: String,
    /// Engine-defined description.
    pub message: String,
}

/// Result type alias for cluster IAM operations.
pub type Result<T> = std::result::Result<T, ClusterIamError>;

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl GraphError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

impl RoleImportError {
    /// Creates a role import error for the given profile.
    #[must_use]
    pub fn new(profile_arn: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            profile_arn: profile_arn.into(),
            message: message.into(),
        }
    }
}

impl ProvisionError {
    /// Creates a provisioning error for the given stack.
    #[must_use]
    pub fn new(stack: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            message: message.into(),
        }
    }
}
