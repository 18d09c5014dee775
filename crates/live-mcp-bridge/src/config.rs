//! Bridge configuration: a TOML file plus environment overrides.
//!
//! Discovery order is a `live-bridge.toml` in the working directory,
//! then the platform config directory, then built-in defaults. The
//! environment wins over both:
//!
//! - `LIVE_BRIDGE_CALL_TIMEOUT_SECS` - dispatch deadline in seconds
//! - `LIVE_BRIDGE_PROVIDER_<NAME>` - endpoint URL for provider `<name>`,
//!   added if the file did not declare it
//! - `LIVE_BRIDGE_BEARER_<NAME>` - bearer token for provider `<name>`

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalizer::{parent_reference, NormalizerSet, PolymorphicRef};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub files: Vec<PathBuf>,
    pub env_overrides: Vec<String>,
}

/// Top-level bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Per-invocation dispatch deadline, in seconds.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// MCP providers to connect at startup.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Polymorphic-reference normalizers. Defaults to the built-in
    /// parent-reference table; set to `[]` to disable normalization.
    #[serde(default = "default_normalizers")]
    pub normalizers: Vec<PolymorphicRef>,
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_normalizers() -> Vec<PolymorphicRef> {
    vec![parent_reference()]
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout_secs(),
            providers: Vec::new(),
            normalizers: default_normalizers(),
        }
    }
}

/// One MCP provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Short name used as the handler-name prefix, e.g. `notion`.
    pub name: String,

    /// Streamable HTTP endpoint URL.
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl BridgeConfig {
    /// Load configuration from the discovered file (if any) and the
    /// environment.
    pub fn load() -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = match discover_config_file() {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                sources.files.push(path);
                config
            }
            None => Self::default(),
        };
        config.apply_env_overrides(&mut sources);
        Ok((config, sources))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Overlay environment variables onto this configuration, recording
    /// each applied override in `sources`.
    pub fn apply_env_overrides(&mut self, sources: &mut ConfigSources) {
        if let Ok(raw) = env::var("LIVE_BRIDGE_CALL_TIMEOUT_SECS") {
            if let Ok(secs) = raw.parse() {
                self.call_timeout_secs = secs;
                sources
                    .env_overrides
                    .push("LIVE_BRIDGE_CALL_TIMEOUT_SECS".to_string());
            }
        }

        // Endpoints before tokens, so a token can attach to a provider
        // the environment itself introduced.
        for (key, url) in env::vars() {
            if let Some(name) = key.strip_prefix("LIVE_BRIDGE_PROVIDER_") {
                let name = name.to_lowercase();
                match self.providers.iter_mut().find(|p| p.name == name) {
                    Some(provider) => provider.url = url,
                    None => self.providers.push(ProviderConfig {
                        name,
                        url,
                        bearer_token: None,
                        enabled: true,
                    }),
                }
                sources.env_overrides.push(key);
            }
        }
        for (key, token) in env::vars() {
            if let Some(name) = key.strip_prefix("LIVE_BRIDGE_BEARER_") {
                let name = name.to_lowercase();
                if let Some(provider) = self.providers.iter_mut().find(|p| p.name == name) {
                    provider.bearer_token = Some(token);
                    sources.env_overrides.push(key);
                }
            }
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn normalizer_set(&self) -> NormalizerSet {
        NormalizerSet::new(self.normalizers.clone())
    }

    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("live-bridge.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(dirs) = directories::BaseDirs::new() {
        let user = dirs.config_dir().join("live-bridge").join("config.toml");
        if user.exists() {
            return Some(user);
        }
    }
    None
}
