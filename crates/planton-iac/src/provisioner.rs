//! Provisioner trait and kind-based dispatch

use crate::backend::TofuBackendConfig;
use crate::error::{DispatchError, ProvisionError, Result};
use crate::stack_input::{StackInput, StackOutputs};
use async_trait::async_trait;
use planton_core::{IacEngine, SchemaRegistry};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Lifecycle operation requested from an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Init,
    /// `pulumi preview` / `tofu plan`
    Plan,
    /// `pulumi up` / `tofu apply`
    Apply,
    Refresh,
    Destroy,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Plan => "plan",
            Operation::Apply => "apply",
            Operation::Refresh => "refresh",
            Operation::Destroy => "destroy",
        }
    }

    /// Whether the operation changes cloud resources
    pub fn is_mutating(&self) -> bool {
        matches!(self, Operation::Apply | Operation::Destroy)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a provisioner needs besides the stack input
#[derive(Debug, Clone)]
pub struct ProvisionContext {
    pub operation: Operation,
    /// Skip interactive approval (`--yes` / `-auto-approve`)
    pub auto_approve: bool,
    /// Plan a destroy instead of an apply (`tofu plan -destroy`)
    pub destroy_plan: bool,
    /// Module directory, or the root of a project-planton checkout
    pub module_dir: Option<PathBuf>,
    pub backend: Option<TofuBackendConfig>,
    pub stack_fqdn: Option<String>,
    /// Extra environment for the engine process
    pub env: BTreeMap<String, String>,
}

impl ProvisionContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            auto_approve: false,
            destroy_plan: false,
            module_dir: None,
            backend: None,
            stack_fqdn: None,
            env: BTreeMap::new(),
        }
    }

    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn with_destroy_plan(mut self, destroy_plan: bool) -> Self {
        self.destroy_plan = destroy_plan;
        self
    }

    pub fn with_module_dir(mut self, module_dir: impl Into<PathBuf>) -> Self {
        self.module_dir = Some(module_dir.into());
        self
    }

    pub fn with_backend(mut self, backend: Option<TofuBackendConfig>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_stack_fqdn(mut self, stack_fqdn: Option<String>) -> Self {
        self.stack_fqdn = stack_fqdn;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Result of a one-shot provisioning run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Success {
        outputs: StackOutputs,
    },
    /// The engine finished but reported problems worth surfacing
    Partial {
        outputs: StackOutputs,
        warnings: Vec<String>,
    },
    Failed {
        reason: String,
    },
    /// The kind is in the catalog but has no module for the engine
    NotYetSupported {
        kind: String,
        engine: IacEngine,
    },
}

impl ProvisionOutcome {
    pub fn success() -> Self {
        ProvisionOutcome::Success {
            outputs: StackOutputs::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ProvisionOutcome::Success { .. } | ProvisionOutcome::Partial { .. }
        )
    }

    pub fn outputs(&self) -> Option<&StackOutputs> {
        match self {
            ProvisionOutcome::Success { outputs } | ProvisionOutcome::Partial { outputs, .. } => {
                Some(outputs)
            }
            _ => None,
        }
    }
}

/// An IaC engine able to provision deployment components
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Engine name (e.g., "pulumi", "tofu")
    fn name(&self) -> &str;

    fn engine(&self) -> IacEngine;

    /// Run `ctx.operation` for the stack input's target
    async fn provision(
        &self,
        ctx: &ProvisionContext,
        stack_input: &StackInput,
    ) -> Result<ProvisionOutcome>;
}

/// Stand-in for kinds the catalog knows but the engine has no module for
#[derive(Debug, Clone, Copy)]
pub struct UnsupportedModule {
    engine: IacEngine,
}

impl UnsupportedModule {
    pub fn new(engine: IacEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Provisioner for UnsupportedModule {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn engine(&self) -> IacEngine {
        self.engine
    }

    async fn provision(
        &self,
        _ctx: &ProvisionContext,
        stack_input: &StackInput,
    ) -> Result<ProvisionOutcome> {
        Ok(ProvisionOutcome::NotYetSupported {
            kind: stack_input.kind().to_string(),
            engine: self.engine,
        })
    }
}

/// Maps deployment component kinds to provisioners
#[derive(Default, Clone)]
pub struct ProvisionerRegistry {
    provisioners: HashMap<String, Arc<dyn Provisioner>>,
}

impl ProvisionerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provisioner for one kind, replacing any previous one
    pub fn register(&mut self, kind: impl Into<String>, provisioner: Arc<dyn Provisioner>) {
        self.provisioners.insert(kind.into(), provisioner);
    }

    /// Register `provisioner` for every catalog kind that ships a module for
    /// its engine, and [`UnsupportedModule`] for the rest
    pub fn register_catalog(&mut self, catalog: &SchemaRegistry, provisioner: Arc<dyn Provisioner>) {
        let engine = provisioner.engine();
        for component in catalog.components() {
            if component.supports(engine) {
                self.register(component.kind.clone(), Arc::clone(&provisioner));
            } else {
                self.register(component.kind.clone(), Arc::new(UnsupportedModule::new(engine)));
            }
        }
        debug!(engine = %engine, kinds = self.provisioners.len(), "Registered catalog");
    }

    pub fn get(&self, kind: &str) -> Option<&Arc<dyn Provisioner>> {
        self.provisioners.get(kind)
    }

    pub fn len(&self) -> usize {
        self.provisioners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provisioners.is_empty()
    }

    /// Run the provisioner registered for the stack input's kind
    #[instrument(skip(self, ctx, stack_input), fields(kind = %stack_input.kind(), operation = %ctx.operation))]
    pub async fn dispatch(
        &self,
        ctx: &ProvisionContext,
        stack_input: &StackInput,
    ) -> std::result::Result<ProvisionOutcome, DispatchError> {
        let kind = stack_input.kind();
        let provisioner = self
            .get(kind)
            .ok_or_else(|| DispatchError::UnsupportedKind {
                kind: kind.to_string(),
            })?;

        info!(provisioner = provisioner.name(), "Dispatching");
        let outcome = provisioner
            .provision(ctx, stack_input)
            .await
            .map_err(|source| ProvisionError {
                kind: kind.to_string(),
                operation: ctx.operation,
                source,
            })?;

        match &outcome {
            ProvisionOutcome::Partial { warnings, .. } => {
                warn!(warnings = warnings.len(), "Provisioning finished with warnings")
            }
            ProvisionOutcome::Failed { reason } => warn!(%reason, "Provisioning failed"),
            ProvisionOutcome::NotYetSupported { engine, .. } => {
                warn!(%engine, "No module for this kind yet")
            }
            ProvisionOutcome::Success { .. } => debug!("Provisioning succeeded"),
        }
        Ok(outcome)
    }
}

impl fmt::Debug for ProvisionerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self
            .provisioners
            .iter()
            .map(|(kind, p)| (kind.as_str(), p.name()))
            .collect();
        kinds.sort();
        f.debug_struct("ProvisionerRegistry")
            .field("provisioners", &kinds)
            .finish()
    }
}
