//! Stack inputs, provider credentials and stack outputs
//!
//! A stack input is what an IaC module receives: the target manifest plus the
//! provider credentials, shaped as `<Kind>StackInput`:
//!
//! ```yaml
//! target:
//!   apiVersion: aws.project-planton.org/v1
//!   kind: AwsS3Bucket
//!   ...
//! providerConfig:
//!   accessKeyId: ...
//! ```

use crate::error::StackInputError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use planton_core::{
    DeploymentComponent, DynamicMessage, ExtractError, Manifest, Provider,
    extract_api_resource_metadata, extract_api_resource_spec,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

type Result<T> = std::result::Result<T, StackInputError>;

/// Credentials for one cloud provider, keyed by `<Provider>ProviderConfig` field names
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    provider: Provider,
    values: Map<String, Value>,
}

impl ProviderConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            values: Map::new(),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Value::String(value.into()));
    }

    /// Load a provider config YAML file
    pub fn from_file(provider: Provider, path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| StackInputError::ReadProviderConfig {
                path: path.to_path_buf(),
                source,
            })?;
        let value: Value = serde_yaml::from_str(&content).map_err(|source| {
            StackInputError::ParseProviderConfig {
                path: path.to_path_buf(),
                source,
            }
        })?;
        match value {
            Value::Object(values) => Ok(Self { provider, values }),
            Value::Null => Ok(Self::new(provider)),
            _ => Err(StackInputError::NotAMapping {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Build a provider config from the usual environment variables
    ///
    /// Returns `None` when the environment does not carry a complete set of
    /// credentials for `provider`.
    pub fn from_env(provider: Provider) -> Result<Option<Self>> {
        let mut config = Self::new(provider);
        match provider {
            Provider::Aws => {
                let (Some(access_key_id), Some(secret_access_key)) =
                    (env("AWS_ACCESS_KEY_ID"), env("AWS_SECRET_ACCESS_KEY"))
                else {
                    return Ok(None);
                };
                let region = env("AWS_REGION")
                    .or_else(|| env("AWS_DEFAULT_REGION"))
                    .unwrap_or_else(|| "us-east-1".to_string());
                config.set("accessKeyId", access_key_id);
                config.set("secretAccessKey", secret_access_key);
                config.set("region", region);
                if let Some(account_id) = env("AWS_ACCOUNT_ID") {
                    config.set("accountId", account_id);
                }
                if let Some(session_token) = env("AWS_SESSION_TOKEN") {
                    config.set("sessionToken", session_token);
                }
            }
            Provider::Gcp => {
                let key_json = if let Some(path) = env("GOOGLE_APPLICATION_CREDENTIALS") {
                    let path = PathBuf::from(path);
                    std::fs::read(&path)
                        .map_err(|source| StackInputError::ReadCredentials { path, source })?
                } else if let Some(json) = env("GOOGLE_CREDENTIALS") {
                    json.into_bytes()
                } else {
                    return Ok(None);
                };
                config.set("serviceAccountKeyBase64", BASE64.encode(key_json));
            }
            Provider::Azure => {
                let vars = [
                    ("clientId", "ARM_CLIENT_ID"),
                    ("clientSecret", "ARM_CLIENT_SECRET"),
                    ("tenantId", "ARM_TENANT_ID"),
                    ("subscriptionId", "ARM_SUBSCRIPTION_ID"),
                ];
                for (field, var) in vars {
                    let Some(value) = env(var) else {
                        return Ok(None);
                    };
                    config.set(field, value);
                }
            }
            Provider::Cloudflare => {
                if let Some(token) = env("CLOUDFLARE_API_TOKEN") {
                    config.set("apiToken", token);
                } else if let (Some(key), Some(email)) =
                    (env("CLOUDFLARE_API_KEY"), env("CLOUDFLARE_EMAIL"))
                {
                    config.set("apiKey", key);
                    config.set("email", email);
                } else {
                    return Ok(None);
                }
                if let Some(account_id) = env("CLOUDFLARE_ACCOUNT_ID") {
                    config.set("accountId", account_id);
                }
            }
            Provider::DigitalOcean => {
                let Some(token) = env("DIGITALOCEAN_TOKEN") else {
                    return Ok(None);
                };
                config.set("apiToken", token);
                if let (Some(id), Some(secret)) =
                    (env("SPACES_ACCESS_KEY_ID"), env("SPACES_SECRET_ACCESS_KEY"))
                {
                    config.set("spacesAccessId", id);
                    config.set("spacesSecretKey", secret);
                }
            }
            Provider::Civo => {
                let Some(token) = env("CIVO_TOKEN") else {
                    return Ok(None);
                };
                config.set("apiToken", token);
            }
            Provider::Kubernetes => return Ok(None),
        }
        debug!(provider = %provider, "Built provider config from environment");
        Ok(Some(config))
    }

    /// The file when given, otherwise the environment, otherwise empty
    pub fn resolve(provider: Provider, file: Option<&Path>) -> Result<Self> {
        if let Some(path) = file {
            debug!(provider = %provider, path = %path.display(), "Loading provider config file");
            return Self::from_file(provider, path);
        }
        Ok(Self::from_env(provider)?.unwrap_or_else(|| Self::new(provider)))
    }

    /// Environment variables the provider's Terraform/OpenTofu provider reads
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        let mapping: &[(&str, &str)] = match self.provider {
            Provider::Aws => &[
                ("accessKeyId", "AWS_ACCESS_KEY_ID"),
                ("secretAccessKey", "AWS_SECRET_ACCESS_KEY"),
                ("region", "AWS_REGION"),
                ("sessionToken", "AWS_SESSION_TOKEN"),
            ],
            Provider::Azure => &[
                ("clientId", "ARM_CLIENT_ID"),
                ("clientSecret", "ARM_CLIENT_SECRET"),
                ("tenantId", "ARM_TENANT_ID"),
                ("subscriptionId", "ARM_SUBSCRIPTION_ID"),
            ],
            Provider::Cloudflare => &[
                ("apiToken", "CLOUDFLARE_API_TOKEN"),
                ("apiKey", "CLOUDFLARE_API_KEY"),
                ("email", "CLOUDFLARE_EMAIL"),
            ],
            Provider::DigitalOcean => &[
                ("apiToken", "DIGITALOCEAN_TOKEN"),
                ("spacesAccessId", "SPACES_ACCESS_KEY_ID"),
                ("spacesSecretKey", "SPACES_SECRET_ACCESS_KEY"),
            ],
            Provider::Civo => &[("apiToken", "CIVO_TOKEN")],
            Provider::Kubernetes => &[("context", "KUBE_CTX")],
            Provider::Gcp => &[],
        };

        let mut vars: BTreeMap<String, String> = mapping
            .iter()
            .filter_map(|(field, var)| {
                self.get(field)
                    .filter(|v| !v.is_empty())
                    .map(|v| (var.to_string(), v.to_string()))
            })
            .collect();

        if self.provider == Provider::Gcp {
            if let Some(key) = self
                .get("serviceAccountKeyBase64")
                .and_then(|encoded| BASE64.decode(encoded).ok())
                .and_then(|decoded| String::from_utf8(decoded).ok())
            {
                vars.insert("GOOGLE_CREDENTIALS".to_string(), key);
            }
        }
        vars
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// A `<Kind>StackInput` message built from a manifest and its credentials
#[derive(Debug, Clone)]
pub struct StackInput {
    component: DeploymentComponent,
    message: DynamicMessage,
}

impl StackInput {
    pub fn new(manifest: &Manifest, provider_config: &ProviderConfig) -> Result<Self> {
        let component = manifest.component().clone();
        if provider_config.provider() != component.provider {
            return Err(StackInputError::ProviderMismatch {
                kind: component.kind.clone(),
                expected: component.provider,
                found: provider_config.provider(),
            });
        }

        let mut input = Map::new();
        input.insert("target".to_string(), manifest.message().to_value());
        if !provider_config.is_empty() {
            input.insert(
                "providerConfig".to_string(),
                Value::Object(provider_config.values().clone()),
            );
        }

        let message = DynamicMessage::decode(
            manifest.message().registry(),
            &component.stack_input_message(),
            &Value::Object(input),
        )?;
        Ok(Self { component, message })
    }

    pub fn kind(&self) -> &str {
        &self.component.kind
    }

    pub fn component(&self) -> &DeploymentComponent {
        &self.component
    }

    pub fn message(&self) -> &DynamicMessage {
        &self.message
    }

    /// The target manifest as a JSON value
    pub fn target(&self) -> &Value {
        static NULL: Value = Value::Null;
        self.message.get("target").unwrap_or(&NULL)
    }

    pub fn spec(&self) -> std::result::Result<DynamicMessage, ExtractError> {
        extract_api_resource_spec(&self.message)
    }

    pub fn metadata(&self) -> std::result::Result<DynamicMessage, ExtractError> {
        extract_api_resource_metadata(&self.message)
    }

    /// `target.metadata.labels`
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.target()
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(Value::as_object)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `providerConfig` rebuilt as a [`ProviderConfig`]
    pub fn provider_config(&self) -> ProviderConfig {
        let values = self
            .message
            .get("providerConfig")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        ProviderConfig {
            provider: self.component.provider,
            values,
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(self.message.to_yaml()?)
    }
}

/// Outputs exported by a stack, in stable key order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs(BTreeMap<String, String>);

impl StackOutputs {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Flatten a JSON object; non-string values keep their JSON rendering
    pub fn from_json(value: &Value) -> Self {
        let mut outputs = Self::default();
        if let Value::Object(map) = value {
            for (key, value) in map {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                outputs.insert(key.clone(), rendered);
            }
        }
        outputs
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.0)
    }
}
