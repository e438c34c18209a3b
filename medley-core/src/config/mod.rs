//! Runtime configuration
//!
//! Everything here is optional: an absent file or field falls back to the
//! hard-coded defaults, so the core runs with no configuration at all.
//! Files may be YAML or JSON and support `${ENV_VAR}` interpolation.

mod env;
mod error;
mod schema;
mod secrets;

pub use error::ConfigError;
pub use schema::{MedleyConfig, ProviderOverride, RetryConfig, TimeoutConfig};
pub use secrets::SecretString;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<MedleyConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let interpolated = env::interpolate_env_vars(&content)?;

    let config: MedleyConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;

    config.validate()?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<MedleyConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    let interpolated = env::interpolate_env_vars(&content)?;

    let config: MedleyConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_falls_back_to_defaults() {
        let config: MedleyConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.providers.is_empty());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.timeouts.request_secs, 120);
        assert_eq!(config.timeouts.connect_secs, 10);
    }

    #[test]
    fn yaml_round_trip_with_overrides() {
        let yaml = r#"
providers:
  - id: openai
    enabled: false
  - id: gemini
    output_cap_override: 2048
retry:
  max_retries: 5
"#;
        let config: MedleyConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert!(!config.providers[0].enabled);
        assert_eq!(config.providers[1].output_cap_override, Some(2048));
        assert_eq!(config.retry.max_retries, 5);
        // Unset fields keep their defaults.
        assert_eq!(config.retry.base_delay_ms, 500);
    }
}
