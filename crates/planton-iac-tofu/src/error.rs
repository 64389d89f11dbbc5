//! OpenTofu provisioner error types

use planton_iac::IacError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TofuError {
    #[error("tofu not found. Please install: https://opentofu.org/docs/intro/install/")]
    TofuNotFound,

    #[error("tofu {command} failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Iac(#[from] IacError),
}

impl From<TofuError> for IacError {
    fn from(err: TofuError) -> Self {
        match err {
            TofuError::TofuNotFound => IacError::BinaryNotFound {
                binary: "tofu",
                install_url: "https://opentofu.org/docs/intro/install/",
            },
            TofuError::CommandFailed { command, message } => IacError::CommandFailed {
                binary: "tofu",
                command,
                message,
            },
            TofuError::Json(e) => IacError::CommandFailed {
                binary: "tofu",
                command: "output".to_string(),
                message: e.to_string(),
            },
            TofuError::Io(e) => IacError::Io(e),
            TofuError::Iac(e) => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, TofuError>;
