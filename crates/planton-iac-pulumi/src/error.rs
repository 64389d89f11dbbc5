//! Pulumi provisioner error types

use planton_iac::IacError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulumiError {
    #[error("pulumi not found. Please install: https://www.pulumi.com/docs/install/")]
    PulumiNotFound,

    #[error("pulumi {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Invalid Pulumi project file {path}: {source}")]
    ProjectFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Iac(#[from] IacError),
}

impl From<PulumiError> for IacError {
    fn from(err: PulumiError) -> Self {
        match err {
            PulumiError::PulumiNotFound => IacError::BinaryNotFound {
                binary: "pulumi",
                install_url: "https://www.pulumi.com/docs/install/",
            },
            PulumiError::CommandFailed { command, message } => IacError::CommandFailed {
                binary: "pulumi",
                command,
                message,
            },
            PulumiError::Io(e) => IacError::Io(e),
            PulumiError::Iac(e) => e,
            other => IacError::CommandFailed {
                binary: "pulumi",
                command: "setup".to_string(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, PulumiError>;
