//! OpenTofu provisioner implementation

use crate::cli::TofuCli;
use crate::error::{Result, TofuError};
use crate::tfvars::write_tfvars;
use async_trait::async_trait;
use planton_core::IacEngine;
use planton_iac::{
    IacError, Operation, ProvisionContext, ProvisionOutcome, Provisioner, StackInput,
    StackOutputs, TofuBackendConfig, resolve_backend, resolve_module_dir,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Runs deployment component OpenTofu modules
#[derive(Debug, Clone)]
pub struct TofuProvisioner {
    echo: bool,
}

impl Default for TofuProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

impl TofuProvisioner {
    pub fn new() -> Self {
        Self { echo: true }
    }

    /// Capture engine output without echoing it
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Backend to initialise with: the context first, then manifest labels
    pub fn backend(
        ctx: &ProvisionContext,
        stack_input: &StackInput,
    ) -> Result<Option<TofuBackendConfig>> {
        if let Some(backend) = &ctx.backend {
            return Ok(Some(backend.clone()));
        }
        Ok(resolve_backend(&stack_input.labels()).map_err(IacError::from)?)
    }

    async fn run(&self, ctx: &ProvisionContext, stack_input: &StackInput) -> Result<ProvisionOutcome> {
        debug!("Step 1: Resolving module directory");
        let module_root = ctx.module_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let module_dir = resolve_module_dir(&module_root, stack_input.component(), IacEngine::Tofu)?;
        info!(module_dir = %module_dir.display(), "OpenTofu module");

        debug!("Step 2: Resolving backend");
        let backend = Self::backend(ctx, stack_input)?;
        match &backend {
            Some(b) => info!(backend_type = %b.backend_type, object = %b.backend_object, "Using backend from manifest labels"),
            None => debug!("No backend labels, using the module's default backend"),
        }

        debug!("Step 3: Writing tfvars");
        write_tfvars(&module_dir, stack_input.target())?;

        let mut env = stack_input.provider_config().env_vars();
        env.extend(ctx.env.clone());
        let cli = TofuCli::new(&module_dir).with_env(env).with_echo(self.echo);
        cli.check_installed().await?;

        debug!("Step 4: tofu init");
        cli.init(backend.as_ref()).await?;
        if ctx.operation == Operation::Init {
            return Ok(ProvisionOutcome::success());
        }

        debug!(operation = %ctx.operation, "Step 5: Running tofu");
        match cli
            .run_operation(ctx.operation, ctx.auto_approve, ctx.destroy_plan)
            .await
        {
            Ok(_) => {}
            Err(TofuError::CommandFailed { message, .. }) => {
                return Ok(ProvisionOutcome::Failed { reason: message });
            }
            Err(e) => return Err(e),
        }

        if !matches!(ctx.operation, Operation::Apply | Operation::Refresh) {
            return Ok(ProvisionOutcome::success());
        }
        match cli.outputs().await {
            Ok(outputs) => Ok(ProvisionOutcome::Success { outputs }),
            Err(e) => {
                warn!(error = %e, "Could not read module outputs");
                Ok(ProvisionOutcome::Partial {
                    outputs: StackOutputs::default(),
                    warnings: vec![format!("could not read module outputs: {e}")],
                })
            }
        }
    }
}

#[async_trait]
impl Provisioner for TofuProvisioner {
    fn name(&self) -> &str {
        "tofu"
    }

    fn engine(&self) -> IacEngine {
        IacEngine::Tofu
    }

    async fn provision(
        &self,
        ctx: &ProvisionContext,
        stack_input: &StackInput,
    ) -> planton_iac::Result<ProvisionOutcome> {
        Ok(self.run(ctx, stack_input).await?)
    }
}
