//! pulumi CLI wrapper
//!
//! Wraps the pulumi CLI commands a deployment component module needs.

use crate::error::{PulumiError, Result};
use planton_iac::{
    CommandOutput, Operation, StackOutputs, binary_exists, run_interactive, run_streaming,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Environment variable the modules read their stack input from
pub const STACK_INPUT_ENV: &str = "STACK_INPUT_YAML";

/// pulumi CLI wrapper bound to one module directory
pub struct PulumiCli {
    module_dir: PathBuf,
    env: BTreeMap<String, String>,
    echo: bool,
}

impl PulumiCli {
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

    /// Check if pulumi is installed
    pub async fn check_installed(&self) -> Result<()> {
        if binary_exists("pulumi").await {
            Ok(())
        } else {
            Err(PulumiError::PulumiNotFound)
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new("pulumi");
        cmd.args(args);
        cmd.current_dir(&self.module_dir);
        cmd.envs(&self.env);

        tracing::debug!(
            "Running: pulumi {} (in {})",
            args.join(" "),
            self.module_dir.display()
        );
        cmd
    }

    async fn run_command(&self, args: &[String], echo: bool) -> Result<CommandOutput> {
        Ok(run_streaming(self.command(args), echo).await?)
    }

    /// Select the stack, creating it when missing
    pub async fn select_stack(&self, stack_fqdn: &str) -> Result<()> {
        let args = vec![
            "stack".to_string(),
            "select".to_string(),
            "--create".to_string(),
            stack_fqdn.to_string(),
            "--non-interactive".to_string(),
        ];
        let output = self.run_command(&args, self.echo).await?;
        if !output.success {
            return Err(PulumiError::CommandFailed {
                command: "stack select".to_string(),
                message: output.failure_summary(),
            });
        }
        Ok(())
    }

    /// Run preview/up/refresh/destroy
    ///
    /// Pulumi may exit non-zero after printing a valid result; only output
    /// carrying `error:` diagnostics counts as a failure. Runs that need
    /// confirmation are attached to the terminal instead of captured.
    pub async fn run_operation(
        &self,
        operation: Operation,
        stack_fqdn: &str,
        auto_approve: bool,
    ) -> Result<CommandOutput> {
        let args = operation_args(operation, stack_fqdn, auto_approve);
        if needs_confirmation(operation, auto_approve) {
            let output = run_interactive(self.command(&args)).await?;
            if !output.success {
                return Err(PulumiError::CommandFailed {
                    command: verb(operation).to_string(),
                    message: output.failure_summary(),
                });
            }
            return Ok(output);
        }

        let output = run_streaming(self.command(&args), self.echo).await?;
        if !output.success && has_error_diagnostics(&output.combined()) {
            return Err(PulumiError::CommandFailed {
                command: verb(operation).to_string(),
                message: output.failure_summary(),
            });
        }
        if !output.success {
            tracing::warn!(
                code = ?output.code,
                "pulumi exited non-zero without error diagnostics; treating as success"
            );
        }
        Ok(output)
    }

    /// Read the stack's exported outputs
    pub async fn stack_outputs(&self, stack_fqdn: &str) -> Result<StackOutputs> {
        let args = vec![
            "stack".to_string(),
            "output".to_string(),
            "--json".to_string(),
            "--show-secrets".to_string(),
            "--stack".to_string(),
            stack_fqdn.to_string(),
        ];
        let output = self.run_command(&args, false).await?;
        if !output.success {
            return Err(PulumiError::CommandFailed {
                command: "stack output".to_string(),
                message: output.failure_summary(),
            });
        }
        if output.stdout.trim().is_empty() {
            return Ok(StackOutputs::default());
        }
        let value: serde_json::Value = serde_json::from_str(&output.stdout)?;
        Ok(StackOutputs::from_json(&value))
    }
}

/// pulumi verb for an operation
pub fn verb(operation: Operation) -> &'static str {
    match operation {
        Operation::Init => "stack select",
        Operation::Plan => "preview",
        Operation::Apply => "up",
        Operation::Refresh => "refresh",
        Operation::Destroy => "destroy",
    }
}

/// Whether pulumi will ask before changing resources
pub fn needs_confirmation(operation: Operation, auto_approve: bool) -> bool {
    !auto_approve && !matches!(operation, Operation::Plan | Operation::Init)
}

/// Arguments for a pulumi run
pub fn operation_args(operation: Operation, stack_fqdn: &str, auto_approve: bool) -> Vec<String> {
    let verb = verb(operation);
    let mut args = vec![
        verb.to_string(),
        "--stack".to_string(),
        stack_fqdn.to_string(),
    ];
    if !needs_confirmation(operation, auto_approve) {
        args.push("--non-interactive".to_string());
    }
    if auto_approve && operation != Operation::Plan {
        args.push("--yes".to_string());
        if operation == Operation::Apply {
            args.push("--skip-preview".to_string());
        }
    }
    args
}

/// Whether pulumi output carries error diagnostics
pub fn has_error_diagnostics(output: &str) -> bool {
    output.contains("error:")
}
