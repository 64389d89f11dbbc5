//! State backend and provisioner resolution from manifest labels
//!
//! Manifests may pin where engine state lives and which engine runs them:
//!
//! ```yaml
//! metadata:
//!   labels:
//!     project-planton.org/provisioner: tofu
//!     terraform.project-planton.org/backend.type: s3
//!     terraform.project-planton.org/backend.object: my-bucket/envs/dev.tfstate
//!     pulumi.project-planton.org/stack.fqdn: acme/networking/dev
//! ```
//!
//! All resolvers are total over label maps: absent labels yield `Ok(None)`,
//! malformed ones a [`BackendConfigError`].

use crate::error::BackendConfigError;
use planton_core::IacEngine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const BACKEND_TYPE_LABEL: &str = "terraform.project-planton.org/backend.type";
pub const BACKEND_OBJECT_LABEL: &str = "terraform.project-planton.org/backend.object";

pub const PULUMI_STACK_FQDN_LABEL: &str = "pulumi.project-planton.org/stack.fqdn";
pub const PULUMI_ORGANIZATION_LABEL: &str = "pulumi.project-planton.org/organization";
pub const PULUMI_PROJECT_LABEL: &str = "pulumi.project-planton.org/project";
pub const PULUMI_STACK_NAME_LABEL: &str = "pulumi.project-planton.org/stack.name";

pub const PROVISIONER_LABEL: &str = "project-planton.org/provisioner";

/// Backend types `tofu init` is configured for
pub const SUPPORTED_BACKEND_TYPES: [&str; 4] = ["s3", "gcs", "azurerm", "local"];

/// Tofu state backend declared by a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TofuBackendConfig {
    pub backend_type: String,
    pub backend_object: String,
}

impl TofuBackendConfig {
    /// `-backend-config` values for `tofu init`
    ///
    /// The object is split on its first `/` into a container and a key.
    pub fn init_args(&self) -> Vec<String> {
        let (container, key) = match self.backend_object.split_once('/') {
            Some((container, key)) => (container, Some(key)),
            None => (self.backend_object.as_str(), None),
        };
        let (container_arg, key_arg) = match self.backend_type.as_str() {
            "s3" => ("bucket", "key"),
            "gcs" => ("bucket", "prefix"),
            "azurerm" => ("container_name", "key"),
            "local" => {
                return if self.backend_object.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("path={}", self.backend_object)]
                };
            }
            _ => return Vec::new(),
        };

        let mut args = vec![format!("{container_arg}={container}")];
        if let Some(key) = key.filter(|k| !k.is_empty()) {
            args.push(format!("{key_arg}={key}"));
        }
        args
    }
}

/// Resolve the Tofu backend from manifest labels
///
/// Both labels absent is not an error: the module's own backend (usually
/// local state) is used.
pub fn resolve_backend(
    labels: &BTreeMap<String, String>,
) -> Result<Option<TofuBackendConfig>, BackendConfigError> {
    let backend_type = labels.get(BACKEND_TYPE_LABEL);
    let backend_object = labels.get(BACKEND_OBJECT_LABEL);

    let (backend_type, backend_object) = match (backend_type, backend_object) {
        (None, None) => return Ok(None),
        (Some(_), None) => {
            return Err(BackendConfigError::Incomplete {
                present: BACKEND_TYPE_LABEL.to_string(),
                missing: BACKEND_OBJECT_LABEL.to_string(),
            });
        }
        (None, Some(_)) => {
            return Err(BackendConfigError::Incomplete {
                present: BACKEND_OBJECT_LABEL.to_string(),
                missing: BACKEND_TYPE_LABEL.to_string(),
            });
        }
        (Some(t), Some(o)) => (t.as_str(), o.as_str()),
    };

    if backend_type.trim().is_empty() {
        return Err(BackendConfigError::EmptyValue {
            label: BACKEND_TYPE_LABEL.to_string(),
        });
    }
    if backend_object.trim().is_empty() {
        return Err(BackendConfigError::EmptyValue {
            label: BACKEND_OBJECT_LABEL.to_string(),
        });
    }
    if !SUPPORTED_BACKEND_TYPES.contains(&backend_type) {
        return Err(BackendConfigError::UnsupportedType(backend_type.to_string()));
    }

    Ok(Some(TofuBackendConfig {
        backend_type: backend_type.to_string(),
        backend_object: backend_object.to_string(),
    }))
}

/// Pulumi stack declared by a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulumiBackendConfig {
    pub stack_fqdn: String,
    pub organization: String,
    pub project: String,
    pub stack_name: String,
}

impl PulumiBackendConfig {
    /// Parse `<organization>/<project>/<stack>`
    pub fn parse_fqdn(fqdn: &str) -> Result<Self, BackendConfigError> {
        let parts: Vec<&str> = fqdn.split('/').map(str::trim).collect();
        let [organization, project, stack_name] = parts.as_slice() else {
            return Err(BackendConfigError::InvalidStackFqdn(fqdn.to_string()));
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(BackendConfigError::EmptyStackFqdnComponent(fqdn.to_string()));
        }
        Ok(Self::from_parts(organization, project, stack_name))
    }

    fn from_parts(organization: &str, project: &str, stack_name: &str) -> Self {
        Self {
            stack_fqdn: format!("{organization}/{project}/{stack_name}"),
            organization: organization.to_string(),
            project: project.to_string(),
            stack_name: stack_name.to_string(),
        }
    }
}

/// Resolve the Pulumi stack from manifest labels
///
/// `stack.fqdn` takes precedence over the organization/project/stack.name
/// triple.
pub fn resolve_pulumi_backend(
    labels: &BTreeMap<String, String>,
) -> Result<Option<PulumiBackendConfig>, BackendConfigError> {
    if let Some(fqdn) = labels.get(PULUMI_STACK_FQDN_LABEL) {
        if !fqdn.trim().is_empty() {
            return PulumiBackendConfig::parse_fqdn(fqdn.trim()).map(Some);
        }
    }

    let keys = [
        PULUMI_ORGANIZATION_LABEL,
        PULUMI_PROJECT_LABEL,
        PULUMI_STACK_NAME_LABEL,
    ];
    let values: Vec<Option<&String>> = keys.iter().map(|k| labels.get(*k)).collect();
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }

    let missing: Vec<String> = keys
        .iter()
        .zip(&values)
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| k.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(BackendConfigError::MissingPulumiLabels(missing));
    }

    let values: Vec<&str> = values.into_iter().flatten().map(|v| v.trim()).collect();
    if values.iter().any(|v| v.is_empty()) {
        return Err(BackendConfigError::EmptyPulumiLabels);
    }
    Ok(Some(PulumiBackendConfig::from_parts(
        values[0], values[1], values[2],
    )))
}

/// IaC engine that provisions a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionerKind {
    Pulumi,
    Tofu,
    Terraform,
}

impl ProvisionerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionerKind::Pulumi => "pulumi",
            ProvisionerKind::Tofu => "tofu",
            ProvisionerKind::Terraform => "terraform",
        }
    }

    /// Engine running the modules; Terraform modules run under OpenTofu
    pub fn engine(&self) -> IacEngine {
        match self {
            ProvisionerKind::Pulumi => IacEngine::Pulumi,
            ProvisionerKind::Tofu | ProvisionerKind::Terraform => IacEngine::Tofu,
        }
    }
}

impl fmt::Display for ProvisionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisionerKind {
    type Err = BackendConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pulumi" => Ok(ProvisionerKind::Pulumi),
            "tofu" => Ok(ProvisionerKind::Tofu),
            "terraform" => Ok(ProvisionerKind::Terraform),
            _ => Err(BackendConfigError::UnknownProvisioner(s.to_string())),
        }
    }
}

/// Provisioner named by the `project-planton.org/provisioner` label, if any
pub fn detect_provisioner(
    labels: &BTreeMap<String, String>,
) -> Result<Option<ProvisionerKind>, BackendConfigError> {
    match labels.get(PROVISIONER_LABEL) {
        Some(value) if !value.trim().is_empty() => value.parse().map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_labels_is_none() {
        assert_eq!(resolve_backend(&BTreeMap::new()).unwrap(), None);
        assert_eq!(
            resolve_backend(&labels(&[("team", "platform")])).unwrap(),
            None
        );
    }

    #[test]
    fn test_valid_backend() {
        let config = resolve_backend(&labels(&[
            (BACKEND_TYPE_LABEL, "s3"),
            (BACKEND_OBJECT_LABEL, "bucket/path"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.backend_type, "s3");
        assert_eq!(config.backend_object, "bucket/path");
    }

    #[test]
    fn test_only_one_label() {
        let err = resolve_backend(&labels(&[(BACKEND_TYPE_LABEL, "s3")])).unwrap_err();
        assert!(err.to_string().contains("both"));

        let err = resolve_backend(&labels(&[(BACKEND_OBJECT_LABEL, "bucket/key")])).unwrap_err();
        assert!(err.to_string().contains("both must be specified together"));
    }

    #[test]
    fn test_empty_values() {
        let err = resolve_backend(&labels(&[
            (BACKEND_TYPE_LABEL, ""),
            (BACKEND_OBJECT_LABEL, "bucket/key"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));

        let err = resolve_backend(&labels(&[
            (BACKEND_TYPE_LABEL, "gcs"),
            (BACKEND_OBJECT_LABEL, "  "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_unsupported_type() {
        let err = resolve_backend(&labels(&[
            (BACKEND_TYPE_LABEL, "consul"),
            (BACKEND_OBJECT_LABEL, "state"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("unsupported backend type"));

        let err = resolve_backend(&labels(&[
            (BACKEND_TYPE_LABEL, " s3 "),
            (BACKEND_OBJECT_LABEL, "bucket/key"),
        ]))
        .unwrap_err();
        assert!(matches!(err, BackendConfigError::UnsupportedType(t) if t == " s3 "));
    }

    #[test]
    fn test_init_args() {
        let config = |t: &str, o: &str| TofuBackendConfig {
            backend_type: t.to_string(),
            backend_object: o.to_string(),
        };
        assert_eq!(
            config("s3", "my-bucket/envs/dev/terraform.tfstate").init_args(),
            vec!["bucket=my-bucket", "key=envs/dev/terraform.tfstate"]
        );
        assert_eq!(
            config("gcs", "my-bucket/vpc").init_args(),
            vec!["bucket=my-bucket", "prefix=vpc"]
        );
        assert_eq!(
            config("azurerm", "tfstate/prod.tfstate").init_args(),
            vec!["container_name=tfstate", "key=prod.tfstate"]
        );
        assert_eq!(config("s3", "only-bucket").init_args(), vec!["bucket=only-bucket"]);
        assert_eq!(
            config("local", "/tmp/state.tfstate").init_args(),
            vec!["path=/tmp/state.tfstate"]
        );
    }

    #[test]
    fn test_pulumi_fqdn_takes_precedence() {
        let config = resolve_pulumi_backend(&labels(&[
            (PULUMI_STACK_FQDN_LABEL, "demo-org/aws-examples/dev"),
            (PULUMI_ORGANIZATION_LABEL, "ignored"),
            (PULUMI_PROJECT_LABEL, "ignored"),
            (PULUMI_STACK_NAME_LABEL, "ignored"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(
            config,
            PulumiBackendConfig {
                stack_fqdn: "demo-org/aws-examples/dev".into(),
                organization: "demo-org".into(),
                project: "aws-examples".into(),
                stack_name: "dev".into(),
            }
        );
    }

    #[test]
    fn test_pulumi_individual_labels() {
        let config = resolve_pulumi_backend(&labels(&[
            (PULUMI_ORGANIZATION_LABEL, "my-org"),
            (PULUMI_PROJECT_LABEL, "my-project"),
            (PULUMI_STACK_NAME_LABEL, "production"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.stack_fqdn, "my-org/my-project/production");
    }

    #[test]
    fn test_pulumi_errors() {
        let cases: &[(&[(&str, &str)], &str)] = &[
            (&[(PULUMI_STACK_FQDN_LABEL, "invalid-format")], "invalid stack.fqdn format"),
            (&[(PULUMI_STACK_FQDN_LABEL, "org//stack")], "stack FQDN components cannot be empty"),
            (
                &[(PULUMI_ORGANIZATION_LABEL, "my-org"), (PULUMI_PROJECT_LABEL, "my-project")],
                "missing required Pulumi backend labels",
            ),
            (
                &[
                    (PULUMI_ORGANIZATION_LABEL, "my-org"),
                    (PULUMI_PROJECT_LABEL, ""),
                    (PULUMI_STACK_NAME_LABEL, "dev"),
                ],
                "Pulumi backend labels cannot be empty",
            ),
        ];
        for (pairs, expected) in cases {
            let err = resolve_pulumi_backend(&labels(pairs)).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "{err} should contain {expected}"
            );
        }
    }

    #[test]
    fn test_pulumi_no_labels() {
        assert_eq!(resolve_pulumi_backend(&BTreeMap::new()).unwrap(), None);
    }

    #[test]
    fn test_parse_fqdn_trims_components() {
        let config = PulumiBackendConfig::parse_fqdn(" org / proj / dev ").unwrap();
        assert_eq!(config.stack_fqdn, "org/proj/dev");
    }

    #[test]
    fn test_detect_provisioner() {
        assert_eq!(detect_provisioner(&BTreeMap::new()).unwrap(), None);
        assert_eq!(
            detect_provisioner(&labels(&[(PROVISIONER_LABEL, "Tofu")])).unwrap(),
            Some(ProvisionerKind::Tofu)
        );
        assert_eq!(
            detect_provisioner(&labels(&[(PROVISIONER_LABEL, "terraform")])).unwrap(),
            Some(ProvisionerKind::Terraform)
        );
        assert!(matches!(
            detect_provisioner(&labels(&[(PROVISIONER_LABEL, "ansible")])),
            Err(BackendConfigError::UnknownProvisioner(_))
        ));
        assert_eq!(ProvisionerKind::Terraform.engine(), IacEngine::Tofu);
    }
}
