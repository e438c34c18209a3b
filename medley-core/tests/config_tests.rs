//! Tests for configuration loading and registry reconciliation

use medley_core::config::{load_from_json, load_from_yaml, ConfigError, MedleyConfig, SecretString};
use medley_core::providers::ProviderRegistry;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn yaml_config_loads_with_env_interpolation() {
    std::env::set_var("MEDLEY_CFG_TEST_MODEL", "gpt-4o-mini");
    let file = write_temp(
        r#"
providers:
  - id: openai
    default_model: ${MEDLEY_CFG_TEST_MODEL}
retry:
  max_retries: 1
timeouts:
  request_secs: 30
"#,
    );

    let config = load_from_yaml(file.path()).unwrap();
    assert_eq!(
        config.providers[0].default_model.as_deref(),
        Some("gpt-4o-mini")
    );
    assert_eq!(config.retry.max_retries, 1);
    assert_eq!(config.request_timeout().as_secs(), 30);
    // Absent sections keep their defaults.
    assert_eq!(config.connect_timeout().as_secs(), 10);
}

#[test]
fn json_config_loads() {
    let file = write_temp(r#"{"retry": {"base_delay_ms": 250}}"#);
    let config = load_from_json(file.path()).unwrap();
    assert_eq!(config.retry.base_delay_ms, 250);
    assert_eq!(config.retry_policy().base_delay_ms, 250);
    assert_eq!(config.retry_policy().max_retries, 3);
}

#[test]
fn missing_env_var_is_an_error() {
    let file = write_temp("providers:\n  - id: openai\n    default_model: ${MEDLEY_CFG_SURELY_UNSET}\n");
    assert!(matches!(
        load_from_yaml(file.path()),
        Err(ConfigError::MissingEnvVar(var)) if var == "MEDLEY_CFG_SURELY_UNSET"
    ));
}

#[test]
fn unparseable_file_is_a_parse_error() {
    let file = write_temp("providers: [unclosed");
    assert!(matches!(
        load_from_yaml(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn duplicate_provider_entries_are_invalid() {
    let file = write_temp("providers:\n  - id: openai\n  - id: openai\n");
    assert!(matches!(
        load_from_yaml(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn bad_base_url_is_invalid() {
    let file = write_temp("providers:\n  - id: openai\n    base_url: \"not a url\"\n");
    assert!(matches!(
        load_from_yaml(file.path()),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn apply_reconciles_overrides_onto_the_registry() {
    let config: MedleyConfig = serde_yaml::from_str(
        r#"
providers:
  - id: openai
    enabled: false
  - id: gemini
    output_cap_override: 2048
    credential_env: ALT_GEMINI_KEY
  - id: not-a-provider
    enabled: false
"#,
    )
    .unwrap();

    let mut registry = ProviderRegistry::builtin();
    config.apply(&mut registry);

    assert!(!registry.get("openai").unwrap().enabled);
    assert_eq!(
        registry.get("gemini").unwrap().output_cap_override,
        Some(2048)
    );
    assert_eq!(registry.get("gemini").unwrap().credential_env, "ALT_GEMINI_KEY");
    // Untouched providers keep builtin settings; unknown entries are ignored.
    assert!(registry.get("anthropic").unwrap().enabled);
    assert_eq!(registry.enabled().count(), 2);
}

#[test]
fn secret_strings_never_leak_through_formatting() {
    let secret = SecretString::new("sk-live-abc123");
    let debugged = format!("{secret:?}");
    let displayed = format!("{secret}");
    assert!(!debugged.contains("abc123"));
    assert!(!displayed.contains("abc123"));
    assert_eq!(secret.expose_secret(), "sk-live-abc123");
}
