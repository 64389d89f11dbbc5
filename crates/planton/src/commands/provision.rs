use crate::args::ProvisionArgs;
use crate::commands::validate::print_violations;
use crate::manifest;
use colored::Colorize;
use planton_config::CliConfig;
use planton_core::{IacEngine, SchemaRegistry, ensure_valid};
use planton_iac::{
    BackendConfigError, Operation, ProviderConfig, ProvisionContext, ProvisionOutcome,
    Provisioner, ProvisionerKind, ProvisionerRegistry, StackInput, TofuBackendConfig,
    detect_provisioner, resolve_backend, resolve_pulumi_backend,
};
use std::collections::BTreeMap;
use planton_iac_pulumi::PulumiProvisioner;
use planton_iac_tofu::TofuProvisioner;
use std::sync::Arc;
use tracing::{debug, warn};

/// Load, validate and provision a manifest
///
/// `forced` is set by the engine-specific subcommands (`pulumi`, `tofu`).
pub async fn handle(
    operation: Operation,
    args: ProvisionArgs,
    forced: Option<ProvisionerKind>,
    destroy_plan: bool,
) -> anyhow::Result<()> {
    debug!("Step 1: Loading manifest");
    let manifest = manifest::load(&args.manifest).await?;

    debug!("Step 2: Validating manifest");
    if let Err(e) = ensure_valid(manifest.message()) {
        print_violations(&e.violations);
        std::process::exit(1);
    }

    debug!("Step 3: Selecting provisioner");
    let config = CliConfig::load()?;
    let label = detect_provisioner(&manifest.labels())?;
    let kind = select_provisioner(
        forced,
        label,
        args.provisioner,
        config.default_provisioner.as_deref(),
    )?;

    debug!("Step 4: Resolving backend");
    let backend = resolve_engine_backend(kind.engine(), &manifest.labels())?;

    debug!("Step 5: Building stack input");
    let provider = manifest.component().provider;
    let provider_config_file = args.provider_config_file(provider);
    let provider_config = ProviderConfig::resolve(provider, provider_config_file.as_deref())?;
    let stack_input = StackInput::new(&manifest, &provider_config)?;

    let mut ctx = ProvisionContext::new(operation)
        .with_auto_approve(args.yes)
        .with_destroy_plan(destroy_plan)
        .with_backend(backend)
        .with_stack_fqdn(args.stack);
    if let Some(dir) = args.module_dir.or(config.modules_dir) {
        ctx = ctx.with_module_dir(dir);
    }

    println!(
        "{} {} {} ({}) with {}",
        "▶".blue().bold(),
        operation.as_str().bold(),
        manifest.kind().cyan(),
        manifest.name(),
        kind
    );

    debug!("Step 6: Dispatching");
    let registry = provisioner_registry(kind.engine())?;
    let outcome = registry.dispatch(&ctx, &stack_input).await?;

    print_outcome(operation, &outcome)?;
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Engine subcommand, then manifest label, then `--provisioner`, then config default
fn select_provisioner(
    forced: Option<ProvisionerKind>,
    label: Option<ProvisionerKind>,
    flag: Option<ProvisionerKind>,
    config_default: Option<&str>,
) -> anyhow::Result<ProvisionerKind> {
    if let Some(forced) = forced {
        if let Some(label) = label.filter(|l| l.engine() != forced.engine()) {
            warn!(%label, %forced, "Ignoring provisioner label for engine subcommand");
        }
        return Ok(forced);
    }
    if let Some(kind) = label.or(flag) {
        return Ok(kind);
    }
    if let Some(default) = config_default {
        return Ok(default.parse()?);
    }
    anyhow::bail!(
        "No provisioner selected. Add the label project-planton.org/provisioner to the manifest, \
         pass --provisioner, or run `project-planton config set default-provisioner <pulumi|tofu>`"
    )
}

/// Tofu state backend from the manifest labels. Pulumi stack labels are only
/// checked here; the Pulumi provisioner reads them itself.
fn resolve_engine_backend(
    engine: IacEngine,
    labels: &BTreeMap<String, String>,
) -> Result<Option<TofuBackendConfig>, BackendConfigError> {
    match engine {
        IacEngine::Tofu => resolve_backend(labels),
        IacEngine::Pulumi => resolve_pulumi_backend(labels).map(|_| None),
    }
}

fn provisioner_registry(engine: IacEngine) -> anyhow::Result<ProvisionerRegistry> {
    let catalog = SchemaRegistry::builtin()?;
    let provisioner: Arc<dyn Provisioner> = match engine {
        IacEngine::Pulumi => Arc::new(PulumiProvisioner::new()),
        IacEngine::Tofu => Arc::new(TofuProvisioner::new()),
    };
    let mut registry = ProvisionerRegistry::new();
    registry.register_catalog(catalog, provisioner);
    Ok(registry)
}

fn print_outcome(operation: Operation, outcome: &ProvisionOutcome) -> anyhow::Result<()> {
    match outcome {
        ProvisionOutcome::Success { outputs } => {
            println!(
                "{}",
                format!("✓ {operation} completed").green().bold()
            );
            if !outputs.is_empty() {
                println!();
                println!("{}", "Outputs:".bold());
                for (key, value) in outputs.iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ProvisionOutcome::Partial { outputs, warnings } => {
            println!(
                "{}",
                format!("✓ {operation} completed with warnings").yellow().bold()
            );
            for w in warnings {
                println!("  ⚠ {}", w.yellow());
            }
            if !outputs.is_empty() {
                println!();
                print!("{}", outputs.to_yaml()?);
            }
        }
        ProvisionOutcome::Failed { reason } => {
            eprintln!("{}", format!("✗ {operation} failed").red().bold());
            eprintln!("  {reason}");
        }
        ProvisionOutcome::NotYetSupported { kind, engine } => {
            eprintln!(
                "{}",
                format!("✗ {kind} has no {engine} module yet").red().bold()
            );
            let other = match engine {
                IacEngine::Pulumi => "tofu",
                IacEngine::Tofu => "pulumi",
            };
            eprintln!("  Try --provisioner {other}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_engine_wins() {
        let kind = select_provisioner(
            Some(ProvisionerKind::Pulumi),
            Some(ProvisionerKind::Tofu),
            Some(ProvisionerKind::Tofu),
            Some("tofu"),
        )
        .unwrap();
        assert_eq!(kind, ProvisionerKind::Pulumi);
    }

    #[test]
    fn test_label_before_flag() {
        let kind = select_provisioner(
            None,
            Some(ProvisionerKind::Terraform),
            Some(ProvisionerKind::Pulumi),
            None,
        )
        .unwrap();
        assert_eq!(kind, ProvisionerKind::Terraform);
    }

    #[test]
    fn test_flag_then_config_default() {
        assert_eq!(
            select_provisioner(None, None, Some(ProvisionerKind::Pulumi), Some("tofu")).unwrap(),
            ProvisionerKind::Pulumi
        );
        assert_eq!(
            select_provisioner(None, None, None, Some("tofu")).unwrap(),
            ProvisionerKind::Tofu
        );
    }

    #[test]
    fn test_no_provisioner() {
        let err = select_provisioner(None, None, None, None).unwrap_err();
        assert!(err.to_string().contains("No provisioner selected"));
    }

    #[test]
    fn test_backend_resolved_for_selected_engine() {
        let labels: BTreeMap<String, String> = [
            ("terraform.project-planton.org/backend.type", "s3"),
            ("terraform.project-planton.org/backend.object", "state/vpc"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let backend = resolve_engine_backend(IacEngine::Tofu, &labels).unwrap().unwrap();
        assert_eq!(backend.backend_type, "s3");
        assert_eq!(resolve_engine_backend(IacEngine::Pulumi, &labels).unwrap(), None);
    }

    #[test]
    fn test_malformed_backend_fails_before_dispatch() {
        let labels: BTreeMap<String, String> =
            [("terraform.project-planton.org/backend.type".to_string(), "s3".to_string())]
                .into_iter()
                .collect();
        let err = resolve_engine_backend(IacEngine::Tofu, &labels).unwrap_err();
        assert!(matches!(err, BackendConfigError::Incomplete { .. }));

        let labels: BTreeMap<String, String> =
            [("pulumi.project-planton.org/stack.fqdn".to_string(), "dev".to_string())]
                .into_iter()
                .collect();
        assert!(resolve_engine_backend(IacEngine::Pulumi, &labels).is_err());
    }

    #[test]
    fn test_registry_covers_catalog() {
        let registry = provisioner_registry(IacEngine::Tofu).unwrap();
        let catalog = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.len(), catalog.components().count());
    }
}
