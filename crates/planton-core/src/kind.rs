//! Deployment component catalog entries and kind name handling

use crate::descriptor::IacEngine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cloud provider a deployment component belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aws,
    Azure,
    Civo,
    Cloudflare,
    DigitalOcean,
    Gcp,
    Kubernetes,
}

impl Provider {
    pub const ALL: [Provider; 7] = [
        Provider::Aws,
        Provider::Azure,
        Provider::Civo,
        Provider::Cloudflare,
        Provider::DigitalOcean,
        Provider::Gcp,
        Provider::Kubernetes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Civo => "civo",
            Provider::Cloudflare => "cloudflare",
            Provider::DigitalOcean => "digitalocean",
            Provider::Gcp => "gcp",
            Provider::Kubernetes => "kubernetes",
        }
    }

    /// Message describing this provider's credentials in a stack input
    pub fn config_message(&self) -> &'static str {
        match self {
            Provider::Aws => "AwsProviderConfig",
            Provider::Azure => "AzureProviderConfig",
            Provider::Civo => "CivoProviderConfig",
            Provider::Cloudflare => "CloudflareProviderConfig",
            Provider::DigitalOcean => "DigitalOceanProviderConfig",
            Provider::Gcp => "GcpProviderConfig",
            Provider::Kubernetes => "KubernetesProviderConfig",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_kind(s);
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("unknown provider: {s}"))
    }
}

/// Catalog entry for one deployment component kind
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentComponent {
    pub kind: String,
    pub api_version: String,
    pub provider: Provider,
    pub id_prefix: String,
    pub spec_message: String,
    /// Engines this component ships an IaC module for
    pub iac: Vec<IacEngine>,
    /// Keys of the stack outputs the module produces
    pub outputs: Vec<String>,
}

impl DeploymentComponent {
    /// Name of the top-level resource message (same as the kind)
    pub fn message_name(&self) -> &str {
        &self.kind
    }

    pub fn stack_input_message(&self) -> String {
        format!("{}StackInput", self.kind)
    }

    /// Directory name of this component under `provider/<provider>/`
    pub fn module_dir_name(&self) -> String {
        self.kind.to_lowercase()
    }

    pub fn supports(&self, engine: IacEngine) -> bool {
        self.iac.contains(&engine)
    }
}

/// Normalize a kind name for lookup: case-insensitive, `-` and `_` ignored.
///
/// `aws-s3-bucket`, `AWS_S3_BUCKET` and `AwsS3Bucket` all normalize to
/// `awss3bucket`.
pub fn normalize_kind(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_kind() {
        assert_eq!(normalize_kind("AwsS3Bucket"), "awss3bucket");
        assert_eq!(normalize_kind("aws-s3-bucket"), "awss3bucket");
        assert_eq!(normalize_kind(" AWS_S3_BUCKET "), "awss3bucket");
        assert_eq!(normalize_kind(""), "");
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("aws".parse::<Provider>().unwrap(), Provider::Aws);
        assert_eq!(
            "digital-ocean".parse::<Provider>().unwrap(),
            Provider::DigitalOcean
        );
        assert_eq!("GCP".parse::<Provider>().unwrap(), Provider::Gcp);
        assert!("oracle".parse::<Provider>().is_err());
    }
}
