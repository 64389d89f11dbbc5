//! IaC error types

use crate::provisioner::Operation;
use planton_core::{DecodeError, ExtractError, Provider};
use std::path::PathBuf;
use thiserror::Error;

/// Malformed backend or provisioner labels on a manifest
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendConfigError {
    #[error("backend labels incomplete: both must be specified together (found {present}, missing {missing})")]
    Incomplete { present: String, missing: String },

    #[error("backend label {label} cannot be empty")]
    EmptyValue { label: String },

    #[error("unsupported backend type \"{0}\": expected one of s3, gcs, azurerm, local")]
    UnsupportedType(String),

    #[error("invalid stack.fqdn format \"{0}\": expected <organization>/<project>/<stack>")]
    InvalidStackFqdn(String),

    #[error("stack FQDN components cannot be empty: \"{0}\"")]
    EmptyStackFqdnComponent(String),

    #[error("missing required Pulumi backend labels: {}", .0.join(", "))]
    MissingPulumiLabels(Vec<String>),

    #[error("Pulumi backend labels cannot be empty")]
    EmptyPulumiLabels,

    #[error("unknown provisioner \"{0}\": expected pulumi, tofu or terraform")]
    UnknownProvisioner(String),
}

/// Failures while assembling a stack input
#[derive(Error, Debug)]
pub enum StackInputError {
    #[error("Failed to read provider config {path}: {source}")]
    ReadProviderConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse provider config {path}: {source}")]
    ParseProviderConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Provider config {path} must be a YAML mapping")]
    NotAMapping { path: PathBuf },

    #[error("Failed to read credentials file {path}: {source}")]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} needs {expected} credentials, got a {found} provider config")]
    ProviderMismatch {
        kind: String,
        expected: Provider,
        found: Provider,
    },

    #[error("Invalid stack input: {0}")]
    Decode(#[from] DecodeError),

    #[error("Stack input field error: {0}")]
    Extract(#[from] ExtractError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised by a provisioner while running an engine
#[derive(Error, Debug)]
pub enum IacError {
    #[error("{binary} not found in PATH. Install it from {install_url}")]
    BinaryNotFound {
        binary: &'static str,
        install_url: &'static str,
    },

    #[error("{binary} {command} failed: {message}")]
    CommandFailed {
        binary: &'static str,
        command: String,
        message: String,
    },

    #[error("Module directory not found: {0}")]
    ModuleNotFound(PathBuf),

    #[error("Pulumi stack FQDN is required. Provide it via --stack or the pulumi.project-planton.org/stack.fqdn label")]
    MissingStack,

    #[error("Backend config error: {0}")]
    Backend(#[from] BackendConfigError),

    #[error("Stack input error: {0}")]
    StackInput(#[from] StackInputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An engine failure annotated with what was being provisioned
#[derive(Error, Debug)]
#[error("{operation} failed for {kind}")]
pub struct ProvisionError {
    pub kind: String,
    pub operation: Operation,
    #[source]
    pub source: IacError,
}

/// Failures of [`ProvisionerRegistry::dispatch`](crate::ProvisionerRegistry::dispatch)
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No provisioner registered for kind {kind}")]
    UnsupportedKind { kind: String },

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

pub type Result<T, E = IacError> = std::result::Result<T, E>;
