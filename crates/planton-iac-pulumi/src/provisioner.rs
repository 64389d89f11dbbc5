//! Pulumi provisioner implementation

use crate::cli::{PulumiCli, STACK_INPUT_ENV};
use crate::error::{PulumiError, Result};
use async_trait::async_trait;
use planton_core::IacEngine;
use planton_iac::{
    IacError, Operation, ProvisionContext, ProvisionOutcome, Provisioner, PulumiBackendConfig,
    StackInput, StackOutputs, resolve_module_dir, resolve_pulumi_backend,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Runs deployment component Pulumi programs
#[derive(Debug, Clone)]
pub struct PulumiProvisioner {
    echo: bool,
}

impl Default for PulumiProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl PulumiProvisioner {
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Capture engine output without echoing it
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Stack to run: manifest labels first, then the context
    pub fn stack(ctx: &ProvisionContext, stack_input: &StackInput) -> Result<PulumiBackendConfig> {
        if let Some(backend) = resolve_pulumi_backend(&stack_input.labels()).map_err(IacError::from)? {
            debug!(stack = %backend.stack_fqdn, "Using Pulumi stack from manifest labels");
            return Ok(backend);
        }
        let fqdn = ctx
            .stack_fqdn
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(PulumiError::Iac(IacError::MissingStack))?;
        Ok(PulumiBackendConfig::parse_fqdn(fqdn).map_err(IacError::from)?)
    }

    async fn run(&self, ctx: &ProvisionContext, stack_input: &StackInput) -> Result<ProvisionOutcome> {
        debug!("Step 1: Resolving stack");
        let stack = Self::stack(ctx, stack_input)?;
        let stack_fqdn = stack.stack_fqdn;

        debug!("Step 2: Resolving module directory");
        let module_root = ctx.module_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let module_dir = resolve_module_dir(&module_root, stack_input.component(), IacEngine::Pulumi)?;
        info!(module_dir = %module_dir.display(), stack = %stack_fqdn, "Pulumi module");

        debug!("Step 3: Preparing stack input");
        let mut env = ctx.env.clone();
        env.insert(
            STACK_INPUT_ENV.to_string(),
            stack_input.to_yaml().map_err(IacError::from)?,
        );
        set_project_name(&module_dir, &stack.project)?;

        let cli = PulumiCli::new(&module_dir)
            .with_env(env)
            .with_echo(self.echo);
        cli.check_installed().await?;

        if ctx.operation == Operation::Init {
            cli.select_stack(&stack_fqdn).await?;
            return Ok(ProvisionOutcome::success());
        }

        debug!(operation = %ctx.operation, "Step 4: Running pulumi");
        let output = match cli
            .run_operation(ctx.operation, &stack_fqdn, ctx.auto_approve)
            .await
        {
            Ok(output) => output,
            Err(PulumiError::CommandFailed { message, .. }) => {
                return Ok(ProvisionOutcome::Failed { reason: message });
            }
            Err(e) => return Err(e),
        };

        let mut warnings = Vec::new();
        if !output.success {
            warnings.push(format!(
                "pulumi exited with {}; no error diagnostics were reported",
                output
                    .code
                    .map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
            ));
        }

        let outputs = if matches!(ctx.operation, Operation::Apply | Operation::Refresh) {
            match cli.stack_outputs(&stack_fqdn).await {
                Ok(outputs) => outputs,
                Err(e) => {
                    warn!(error = %e, "Could not read stack outputs");
                    warnings.push(format!("could not read stack outputs: {e}"));
                    StackOutputs::default()
                }
            }
        } else {
            StackOutputs::default()
        };

        if warnings.is_empty() {
            Ok(ProvisionOutcome::Success { outputs })
        } else {
            Ok(ProvisionOutcome::Partial { outputs, warnings })
        }
    }
}

#[async_trait]
impl Provisioner for PulumiProvisioner {
    fn name(&self) -> &str {
        "pulumi"
    }

    fn engine(&self) -> IacEngine {
        IacEngine::Pulumi
    }

    async fn provision(
        &self,
        ctx: &ProvisionContext,
        stack_input: &StackInput,
    ) -> planton_iac::Result<ProvisionOutcome> {
        Ok(self.run(ctx, stack_input).await?)
    }
}

/// Point `Pulumi.yaml`'s project name at the stack's project
pub fn set_project_name(module_dir: &Path, project: &str) -> Result<()> {
    if project.is_empty() {
        return Ok(());
    }
    let path = module_dir.join("Pulumi.yaml");
    let content = std::fs::read_to_string(&path)?;
    let mut doc: serde_yaml::Mapping =
        serde_yaml::from_str(&content).map_err(|source| PulumiError::ProjectFile {
            path: path.clone(),
            source,
        })?;

    let name = serde_yaml::Value::String("name".to_string());
    if doc.get(&name).and_then(serde_yaml::Value::as_str) == Some(project) {
        return Ok(());
    }
    doc.insert(name, serde_yaml::Value::String(project.to_string()));
    let rendered = serde_yaml::to_string(&doc).map_err(|source| PulumiError::ProjectFile {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, rendered)?;
    debug!(path = %path.display(), project, "Updated Pulumi project name");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use planton_core::load_manifest_from_str;
    use planton_iac::ProviderConfig;

    fn input(labels: &str) -> StackInput {
        let yaml = format!(
            "apiVersion: kubernetes.project-planton.org/v1\nkind: RedisKubernetes\nmetadata:\n  name: cache\n{labels}spec:\n  container:\n    replicas: 1\n"
        );
        let manifest = load_manifest_from_str(&yaml).unwrap();
        StackInput::new(&manifest, &ProviderConfig::new(manifest.component().provider)).unwrap()
    }

    #[test]
    fn test_stack_from_labels_wins() {
        let stack_input = input(
            "  labels:\n    pulumi.project-planton.org/stack.fqdn: acme/cache/prod\n",
        );
        let ctx = ProvisionContext::new(Operation::Plan).with_stack_fqdn(Some("x/y/z".into()));
        let stack = PulumiProvisioner::stack(&ctx, &stack_input).unwrap();
        assert_eq!(stack.stack_fqdn, "acme/cache/prod");
        assert_eq!(stack.project, "cache");
    }

    #[test]
    fn test_stack_from_context() {
        let ctx = ProvisionContext::new(Operation::Plan).with_stack_fqdn(Some("x/y/z".into()));
        let stack = PulumiProvisioner::stack(&ctx, &input("")).unwrap();
        assert_eq!(stack.stack_fqdn, "x/y/z");
        assert_eq!(stack.project, "y");
    }

    #[test]
    fn test_stack_required() {
        let err = PulumiProvisioner::stack(&ProvisionContext::new(Operation::Plan), &input(""))
            .unwrap_err();
        assert!(matches!(err, PulumiError::Iac(IacError::MissingStack)));
    }

    #[test]
    fn test_malformed_stack_flag() {
        for fqdn in ["dev", "acme/dev", "acme//dev"] {
            let ctx = ProvisionContext::new(Operation::Plan).with_stack_fqdn(Some(fqdn.into()));
            let err = PulumiProvisioner::stack(&ctx, &input("")).unwrap_err();
            assert!(
                matches!(err, PulumiError::Iac(IacError::Backend(_))),
                "{fqdn}: {err}"
            );
        }
    }

    #[test]
    fn test_set_project_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Pulumi.yaml");
        std::fs::write(&path, "name: placeholder\nruntime: go\n").unwrap();

        set_project_name(dir.path(), "cache").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("name: cache"));
        assert!(content.contains("runtime: go"));
    }

    #[tokio::test]
    async fn test_missing_module_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProvisionContext::new(Operation::Apply)
            .with_module_dir(dir.path())
            .with_stack_fqdn(Some("acme/cache/dev".into()));
        let err = PulumiProvisioner::new()
            .provision(&ctx, &input(""))
            .await
            .unwrap_err();
        assert!(matches!(err, IacError::ModuleNotFound(_)));
    }
}
