pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Overrides the CLI home directory (default `~/.project-planton`)
pub const HOME_ENV: &str = "PROJECT_PLANTON_HOME";

const CONFIG_FILE: &str = "config.yaml";
const DOWNLOADS_DIR: &str = "downloads";

/// CLI home directory, created on first use
///
/// Resolution order:
/// 1. `PROJECT_PLANTON_HOME`
/// 2. `~/.project-planton`
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = match std::env::var_os(HOME_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".project-planton"),
    };

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Directory remote manifests are downloaded into
pub fn get_download_dir() -> Result<PathBuf> {
    let dir = get_config_dir()?.join(DOWNLOADS_DIR);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE))
}

/// Settable configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BackendUrl,
    ModulesDir,
    DefaultProvisioner,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 3] = [
        ConfigKey::BackendUrl,
        ConfigKey::ModulesDir,
        ConfigKey::DefaultProvisioner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::BackendUrl => "backend-url",
            ConfigKey::ModulesDir => "modules-dir",
            ConfigKey::DefaultProvisioner => "default-provisioner",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// Contents of `config.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliConfig {
    /// Project Planton backend service URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,

    /// Checkout of the project-planton repository holding the IaC modules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modules_dir: Option<PathBuf>,

    /// Provisioner used when a manifest does not name one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provisioner: Option<String>,
}

impl CliConfig {
    /// Load the config file from the CLI home directory; missing file means defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        debug!(path = %path.display(), "Saved config file");
        Ok(())
    }

    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::BackendUrl => self.backend_url.clone(),
            ConfigKey::ModulesDir => self
                .modules_dir
                .as_ref()
                .map(|p| p.display().to_string()),
            ConfigKey::DefaultProvisioner => self.default_provisioner.clone(),
        }
    }

    /// Set a key after checking its value
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid(key, "value must not be empty"));
        }
        match key {
            ConfigKey::BackendUrl => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(invalid(key, "must start with http:// or https://"));
                }
                self.backend_url = Some(value.trim_end_matches('/').to_string());
            }
            ConfigKey::ModulesDir => {
                self.modules_dir = Some(PathBuf::from(value));
            }
            ConfigKey::DefaultProvisioner => {
                let normalized = value.to_lowercase();
                if !matches!(normalized.as_str(), "pulumi" | "tofu" | "terraform") {
                    return Err(invalid(key, "must be one of pulumi, tofu, terraform"));
                }
                self.default_provisioner = Some(normalized);
            }
        }
        Ok(())
    }

    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::BackendUrl => self.backend_url = None,
            ConfigKey::ModulesDir => self.modules_dir = None,
            ConfigKey::DefaultProvisioner => self.default_provisioner = None,
        }
    }

    /// Every key with its current value, in display order
    pub fn entries(&self) -> Vec<(ConfigKey, Option<String>)> {
        ConfigKey::ALL.into_iter().map(|k| (k, self.get(k))).collect()
    }
}

fn invalid(key: ConfigKey, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
