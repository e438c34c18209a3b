//! Configuration schema with serde defaults

use super::error::ConfigError;
use crate::providers::{ProviderRegistry, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MedleyConfig {
    /// Per-provider overrides; providers not listed keep builtin defaults
    #[serde(default)]
    pub providers: Vec<ProviderOverride>,

    /// Global retry settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Global request/stream timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// Overrides for one provider
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderOverride {
    /// Provider id this entry applies to
    pub id: String,

    /// Whether dispatch may use this provider
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fixed output-cap override, returned verbatim by the estimator
    #[serde(default)]
    pub output_cap_override: Option<u32>,

    /// Replacement base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Replacement default model
    #[serde(default)]
    pub default_model: Option<String>,

    /// Replacement credential environment variable
    #[serde(default)]
    pub credential_env: Option<String>,
}

/// Global retry settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Global timeouts in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,

    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
            connect_secs: default_connect_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_request_secs() -> u64 {
    120
}

fn default_connect_secs() -> u64 {
    10
}

impl MedleyConfig {
    /// Validate provider entries: unique ids and parseable base URLs
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate provider entry: {}",
                    provider.id
                )));
            }
            if let Some(base_url) = &provider.base_url {
                url::Url::parse(base_url).map_err(|e| {
                    ConfigError::Invalid(format!(
                        "provider {} has an invalid base_url: {e}",
                        provider.id
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Apply provider overrides onto a descriptor registry; entries naming
    /// unknown providers are ignored
    pub fn apply(&self, registry: &mut ProviderRegistry) {
        for entry in &self.providers {
            let Some(descriptor) = registry.get_mut(&entry.id) else {
                continue;
            };
            descriptor.enabled = entry.enabled;
            if entry.output_cap_override.is_some() {
                descriptor.output_cap_override = entry.output_cap_override;
            }
            if let Some(base_url) = &entry.base_url {
                descriptor.base_url = base_url.clone();
            }
            if let Some(model) = &entry.default_model {
                descriptor.default_model = model.clone();
            }
            if let Some(credential_env) = &entry.credential_env {
                descriptor.credential_env = credential_env.clone();
            }
        }
    }

    /// Retry policy derived from the retry section
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay_ms: self.retry.base_delay_ms,
            ..Default::default()
        }
    }

    /// Request timeout derived from the timeouts section
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_secs)
    }

    /// Connect timeout derived from the timeouts section
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.connect_secs)
    }
}
