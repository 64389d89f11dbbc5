//! tofu CLI wrapper
//!
//! Wraps the OpenTofu CLI commands a deployment component module needs.

use crate::error::{Result, TofuError};
use planton_iac::{
    CommandOutput, Operation, StackOutputs, TofuBackendConfig, binary_exists, run_interactive,
    run_streaming,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Override file pinning the backend type chosen by manifest labels
pub const BACKEND_OVERRIDE_FILE: &str = "planton_backend_override.tf";

/// tofu CLI wrapper bound to one module directory
pub struct TofuCli {
    module_dir: PathBuf,
    env: BTreeMap<String, String>,
    echo: bool,
}

impl TofuCli {
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            module_dir: module_dir.into(),
            env: BTreeMap::new(),
            echo: true,
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Stream engine output to the terminal (default: on)
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Check if tofu is installed
    pub async fn check_installed(&self) -> Result<()> {
        if binary_exists("tofu").await {
            Ok(())
        } else {
            Err(TofuError::TofuNotFound)
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new("tofu");
        cmd.args(args);
        cmd.current_dir(&self.module_dir);
        cmd.envs(&self.env);
        // Suppress next-step hints meant for interactive use
        cmd.env("TF_IN_AUTOMATION", "1");

        tracing::debug!(
            "Running: tofu {} (in {})",
            args.join(" "),
            self.module_dir.display()
        );
        cmd
    }

    async fn run_command(&self, args: &[String], interactive: bool) -> Result<CommandOutput> {
        let cmd = self.command(args);
        let output = if interactive {
            run_interactive(cmd).await?
        } else {
            run_streaming(cmd, self.echo).await?
        };
        if !output.success {
            return Err(TofuError::CommandFailed {
                command: args.first().cloned().unwrap_or_default(),
                message: output.failure_summary(),
            });
        }
        Ok(output)
    }

    /// `tofu init` with the manifest's backend, if any
    pub async fn init(&self, backend: Option<&TofuBackendConfig>) -> Result<()> {
        let removed = sync_backend_override(&self.module_dir, backend)?;
        let mut args = init_args(backend);
        if removed {
            // The module falls back to its own backend
            args.push("-reconfigure".to_string());
        }
        self.run_command(&args, false).await?;
        Ok(())
    }

    /// Run plan/apply/refresh/destroy
    pub async fn run_operation(
        &self,
        operation: Operation,
        auto_approve: bool,
        destroy_plan: bool,
    ) -> Result<CommandOutput> {
        let args = operation_args(operation, auto_approve, destroy_plan);
        let interactive = operation.is_mutating() && !auto_approve;
        self.run_command(&args, interactive).await
    }

    /// Read root module outputs
    pub async fn outputs(&self) -> Result<StackOutputs> {
        let args = vec!["output".to_string(), "-json".to_string()];
        let output = run_streaming(self.command(&args), false).await?;
        if !output.success {
            return Err(TofuError::CommandFailed {
                command: "output".to_string(),
                message: output.failure_summary(),
            });
        }
        parse_outputs(&output.stdout)
    }
}

/// Arguments for `tofu init`
pub fn init_args(backend: Option<&TofuBackendConfig>) -> Vec<String> {
    let mut args = vec!["init".to_string(), "-input=false".to_string()];
    if let Some(backend) = backend {
        args.push("-reconfigure".to_string());
        args.extend(
            backend
                .init_args()
                .into_iter()
                .map(|arg| format!("-backend-config={arg}")),
        );
    }
    args
}

/// Arguments for an operation
pub fn operation_args(operation: Operation, auto_approve: bool, destroy_plan: bool) -> Vec<String> {
    let mut args = vec![operation.as_str().to_string()];
    match operation {
        Operation::Init => args.push("-input=false".to_string()),
        Operation::Plan => {
            args.push("-input=false".to_string());
            if destroy_plan {
                args.push("-destroy".to_string());
            }
        }
        Operation::Refresh => args.push("-input=false".to_string()),
        Operation::Apply | Operation::Destroy => {
            if auto_approve {
                args.push("-input=false".to_string());
                args.push("-auto-approve".to_string());
            }
        }
    }
    args
}

/// Flatten `tofu output -json` into stack outputs
pub fn parse_outputs(json: &str) -> Result<StackOutputs> {
    if json.trim().is_empty() {
        return Ok(StackOutputs::default());
    }
    let value: serde_json::Value = serde_json::from_str(json)?;
    let values: serde_json::Map<String, serde_json::Value> = value
        .as_object()
        .map(|outputs| {
            outputs
                .iter()
                .map(|(k, v)| (k.clone(), v.get("value").cloned().unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();
    Ok(StackOutputs::from_json(&serde_json::Value::Object(values)))
}

/// Write the backend override, or remove a stale one when the manifest has
/// no backend. Returns whether a stale override was removed.
fn sync_backend_override(module_dir: &Path, backend: Option<&TofuBackendConfig>) -> Result<bool> {
    let path = module_dir.join(BACKEND_OVERRIDE_FILE);
    let Some(backend) = backend else {
        return match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed stale backend override");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        };
    };
    let content = format!(
        "terraform {{\n  backend \"{}\" {{}}\n}}\n",
        backend.backend_type
    );
    std::fs::write(path, content)?;
    Ok(false)
}
