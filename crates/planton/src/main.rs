mod args;
mod commands;
mod manifest;

use args::{ManifestArgs, ProvisionArgs};
use clap::{Parser, Subcommand};
use colored::Colorize;
use planton_config::ConfigKey;
use planton_iac::{Operation, ProvisionerKind};

#[derive(Parser)]
#[command(name = "project-planton")]
#[command(
    about = "Open-source multi-cloud deployment framework",
    long_about = "Validate deployment component manifests and provision them with Pulumi or OpenTofu."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the resources described by a manifest
    Apply(ProvisionArgs),
    /// Destroy the resources described by a manifest
    Destroy(ProvisionArgs),
    /// Preview the changes an apply would make
    Plan {
        #[command(flatten)]
        args: ProvisionArgs,
        /// Preview a destroy instead of an apply
        #[arg(long)]
        destroy: bool,
    },
    /// Reconcile engine state with the real resources
    Refresh(ProvisionArgs),
    /// Initialise the IaC module and its state backend
    Init(ProvisionArgs),
    /// Validate a manifest and print every violation
    #[command(name = "validate-manifest")]
    ValidateManifest(ManifestArgs),
    /// Print the effective manifest with defaults and overrides applied
    #[command(name = "load-manifest")]
    LoadManifest(ManifestArgs),
    /// List the deployment component kinds in the catalog
    #[command(name = "list-deployment-component")]
    ListDeploymentComponent {
        /// Only show kinds of this provider (e.g. aws, gcp, kubernetes)
        #[arg(short, long)]
        provider: Option<String>,
    },
    /// Manage CLI configuration
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Run a manifest through Pulumi
    #[command(subcommand)]
    Pulumi(PulumiCommands),
    /// Run a manifest through OpenTofu
    #[command(subcommand)]
    Tofu(TofuCommands),
    /// Show version information
    Version,
}

/// Configuration subcommands
#[derive(Subcommand)]
enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// backend-url, modules-dir or default-provisioner
        key: ConfigKey,
        value: String,
    },
    /// Print a configuration value
    Get { key: ConfigKey },
    /// Remove a configuration value
    Unset { key: ConfigKey },
    /// Print every configuration value
    List,
}

/// Pulumi subcommands
#[derive(Subcommand)]
enum PulumiCommands {
    /// Preview changes (pulumi preview)
    Preview(ProvisionArgs),
    /// Create or update resources (pulumi up)
    Update(ProvisionArgs),
    /// Refresh stack state (pulumi refresh)
    Refresh(ProvisionArgs),
    /// Destroy resources (pulumi destroy)
    Destroy(ProvisionArgs),
    /// Select or create the stack
    Init(ProvisionArgs),
}

/// OpenTofu subcommands
#[derive(Subcommand)]
enum TofuCommands {
    /// Initialise the module and backend (tofu init)
    Init(ProvisionArgs),
    /// Show an execution plan (tofu plan)
    Plan {
        #[command(flatten)]
        args: ProvisionArgs,
        /// Plan a destroy instead of an apply
        #[arg(long)]
        destroy: bool,
    },
    /// Apply changes (tofu apply)
    Apply(ProvisionArgs),
    /// Refresh state (tofu refresh)
    Refresh(ProvisionArgs),
    /// Destroy resources (tofu destroy)
    Destroy(ProvisionArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    install_panic_hook();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Version => {
            println!("project-planton {}", env!("CARGO_PKG_VERSION"));
            println!(
                "platform: {}/{}",
                std::env::consts::OS,
                std::env::consts::ARCH
            );
        }
        Commands::Apply(args) => {
            commands::provision::handle(Operation::Apply, args, None, false).await?;
        }
        Commands::Destroy(args) => {
            commands::provision::handle(Operation::Destroy, args, None, false).await?;
        }
        Commands::Plan { args, destroy } => {
            commands::provision::handle(Operation::Plan, args, None, destroy).await?;
        }
        Commands::Refresh(args) => {
            commands::provision::handle(Operation::Refresh, args, None, false).await?;
        }
        Commands::Init(args) => {
            commands::provision::handle(Operation::Init, args, None, false).await?;
        }
        Commands::ValidateManifest(args) => {
            commands::validate::handle(args).await?;
        }
        Commands::LoadManifest(args) => {
            commands::load::handle(args).await?;
        }
        Commands::ListDeploymentComponent { provider } => {
            commands::list::handle(provider.as_deref())?;
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Set { key, value } => commands::config::set(key, &value)?,
            ConfigCommands::Get { key } => commands::config::get(key)?,
            ConfigCommands::Unset { key } => commands::config::unset(key)?,
            ConfigCommands::List => commands::config::list()?,
        },
        Commands::Pulumi(pulumi_cmd) => {
            let (operation, args) = match pulumi_cmd {
                PulumiCommands::Preview(args) => (Operation::Plan, args),
                PulumiCommands::Update(args) => (Operation::Apply, args),
                PulumiCommands::Refresh(args) => (Operation::Refresh, args),
                PulumiCommands::Destroy(args) => (Operation::Destroy, args),
                PulumiCommands::Init(args) => (Operation::Init, args),
            };
            commands::provision::handle(operation, args, Some(ProvisionerKind::Pulumi), false)
                .await?;
        }
        Commands::Tofu(tofu_cmd) => {
            let (operation, args, destroy) = match tofu_cmd {
                TofuCommands::Init(args) => (Operation::Init, args, false),
                TofuCommands::Plan { args, destroy } => (Operation::Plan, args, destroy),
                TofuCommands::Apply(args) => (Operation::Apply, args, false),
                TofuCommands::Refresh(args) => (Operation::Refresh, args, false),
                TofuCommands::Destroy(args) => (Operation::Destroy, args, false),
            };
            commands::provision::handle(operation, args, Some(ProvisionerKind::Tofu), destroy)
                .await?;
        }
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays pipeable
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Replace the default panic output with a bug report template
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!();
        eprintln!("{}", "✗ project-planton crashed unexpectedly".red().bold());
        eprintln!();
        eprintln!("{info}");
        eprintln!();
        eprintln!("Please open an issue at https://github.com/plantonhq/project-planton/issues");
        eprintln!("and include the following:");
        eprintln!();
        eprintln!("  version: {}", env!("CARGO_PKG_VERSION"));
        eprintln!(
            "  os/arch: {}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        eprintln!(
            "  command: {}",
            std::env::args().collect::<Vec<_>>().join(" ")
        );
        std::process::exit(101);
    }));
}
