//! Flags shared by several subcommands

use clap::Args;
use planton_core::{Provider, ValueOverride};
use planton_iac::ProvisionerKind;
use std::path::{Path, PathBuf};

/// Manifest file expected inside `--input-dir`
pub const INPUT_DIR_MANIFEST: &str = "target.yaml";

/// Where the manifest comes from and how to tweak it
///
/// Sources are tried in order: `--manifest`, `--input-dir`, then
/// `--kustomize-dir` with `--overlay`.
#[derive(Args, Debug, Clone, Default)]
pub struct ManifestArgs {
    /// Manifest file path or http(s) URL
    #[arg(
        short = 'f',
        long = "manifest",
        value_name = "PATH|URL",
        required_unless_present_any = ["input_dir", "kustomize_dir"]
    )]
    pub manifest: Option<String>,

    /// Directory containing target.yaml and <provider>-provider-config.yaml files
    #[arg(long, value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Kustomize base directory; the manifest is built from overlays/<overlay>
    #[arg(long, value_name = "DIR", requires = "overlay")]
    pub kustomize_dir: Option<PathBuf>,

    /// Kustomize overlay to build (e.g. dev, staging, prod)
    #[arg(long, value_name = "NAME", requires = "kustomize_dir")]
    pub overlay: Option<String>,

    /// Override a manifest field, e.g. --set spec.container.replicas=3 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<ValueOverride>,
}

/// Provider credential files; the environment is used when absent
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderConfigArgs {
    /// AWS provider config file
    #[arg(long, value_name = "FILE")]
    pub aws_provider_config: Option<PathBuf>,

    /// Azure provider config file
    #[arg(long, value_name = "FILE")]
    pub azure_provider_config: Option<PathBuf>,

    /// Civo provider config file
    #[arg(long, value_name = "FILE")]
    pub civo_provider_config: Option<PathBuf>,

    /// Cloudflare provider config file
    #[arg(long, value_name = "FILE")]
    pub cloudflare_provider_config: Option<PathBuf>,

    /// DigitalOcean provider config file
    #[arg(long, value_name = "FILE")]
    pub digitalocean_provider_config: Option<PathBuf>,

    /// GCP provider config file
    #[arg(long, value_name = "FILE")]
    pub gcp_provider_config: Option<PathBuf>,

    /// Kubernetes provider config file
    #[arg(long, value_name = "FILE")]
    pub kubernetes_provider_config: Option<PathBuf>,
}

impl ProviderConfigArgs {
    pub fn for_provider(&self, provider: Provider) -> Option<&Path> {
        let path = match provider {
            Provider::Aws => &self.aws_provider_config,
            Provider::Azure => &self.azure_provider_config,
            Provider::Civo => &self.civo_provider_config,
            Provider::Cloudflare => &self.cloudflare_provider_config,
            Provider::DigitalOcean => &self.digitalocean_provider_config,
            Provider::Gcp => &self.gcp_provider_config,
            Provider::Kubernetes => &self.kubernetes_provider_config,
        };
        path.as_deref()
    }
}

/// Flags of every provisioning command
#[derive(Args, Debug, Clone)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Module directory, or a checkout of the modules repository
    #[arg(long, value_name = "DIR")]
    pub module_dir: Option<PathBuf>,

    /// Pulumi stack as <org>/<project>/<stack> when the manifest has no stack label
    #[arg(long, value_name = "FQDN")]
    pub stack: Option<String>,

    /// Skip interactive approval
    #[arg(short = 'y', long = "yes", visible_alias = "auto-approve")]
    pub yes: bool,

    /// Engine to use when the manifest has no provisioner label: pulumi, tofu or terraform
    #[arg(long, env = "PROJECT_PLANTON_PROVISIONER")]
    pub provisioner: Option<ProvisionerKind>,

    #[command(flatten)]
    pub provider_configs: ProviderConfigArgs,
}

impl ProvisionArgs {
    /// Provider config file: the explicit flag, then `--input-dir`
    pub fn provider_config_file(&self, provider: Provider) -> Option<PathBuf> {
        if let Some(path) = self.provider_configs.for_provider(provider) {
            return Some(path.to_path_buf());
        }
        self.manifest
            .input_dir
            .as_ref()
            .map(|dir| dir.join(format!("{provider}-provider-config.yaml")))
            .filter(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_lookup() {
        let args = ProviderConfigArgs {
            gcp_provider_config: Some(PathBuf::from("gcp.yaml")),
            ..Default::default()
        };
        assert_eq!(args.for_provider(Provider::Gcp), Some(Path::new("gcp.yaml")));
        assert_eq!(args.for_provider(Provider::Aws), None);
    }

    #[test]
    fn test_provider_config_from_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("aws-provider-config.yaml"), "region: us-east-1\n").unwrap();

        let mut args = ProvisionArgs {
            manifest: ManifestArgs {
                input_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            },
            module_dir: None,
            stack: None,
            yes: false,
            provisioner: None,
            provider_configs: ProviderConfigArgs::default(),
        };
        assert_eq!(
            args.provider_config_file(Provider::Aws),
            Some(dir.path().join("aws-provider-config.yaml"))
        );
        assert_eq!(args.provider_config_file(Provider::Gcp), None);

        args.provider_configs.aws_provider_config = Some(PathBuf::from("explicit.yaml"));
        assert_eq!(
            args.provider_config_file(Provider::Aws),
            Some(PathBuf::from("explicit.yaml"))
        );
    }
}
