//! Provider descriptors and the registry
//!
//! One descriptor per supported provider: identity, wire family, declared
//! context and output ceilings, default model, and the environment variable
//! that names its credential. The output ceiling is authoritative; adapters
//! clamp every requested cap against it no matter what the estimator
//! proposed.

use super::adapter::WireAdapter;
use super::anthropic::AnthropicAdapter;
use super::gemini::GeminiAdapter;
use super::openai::OpenAiAdapter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire-protocol family a provider speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFamily {
    /// OpenAI-style chat completions
    OpenAiChat,
    /// Anthropic-style messages with a separate system field
    AnthropicMessages,
    /// Gemini-style contents with parts
    GeminiContents,
}

static OPENAI_ADAPTER: OpenAiAdapter = OpenAiAdapter;
static ANTHROPIC_ADAPTER: AnthropicAdapter = AnthropicAdapter;
static GEMINI_ADAPTER: GeminiAdapter = GeminiAdapter;

impl WireFamily {
    /// Fixed adapter for this family; tagged dispatch, no runtime inspection
    pub fn adapter(&self) -> &'static dyn WireAdapter {
        match self {
            WireFamily::OpenAiChat => &OPENAI_ADAPTER,
            WireFamily::AnthropicMessages => &ANTHROPIC_ADAPTER,
            WireFamily::GeminiContents => &GEMINI_ADAPTER,
        }
    }
}

/// Descriptor for one supported provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique provider id
    pub id: String,

    /// Human-readable name
    pub display_name: String,

    /// Wire-protocol family
    pub family: WireFamily,

    /// Base URL for the provider API
    pub base_url: String,

    /// Model used when a request names none
    pub default_model: String,

    /// Declared maximum context window, input and output combined
    pub max_context_tokens: u32,

    /// Authoritative ceiling on generated tokens; never exceeded
    pub max_output_tokens: u32,

    /// Name of the environment variable holding the credential
    pub credential_env: String,

    /// Whether dispatch may use this provider
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fixed output-cap override from configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_cap_override: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// Registry of provider descriptors, exactly one per provider id
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    descriptors: HashMap<String, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the built-in providers
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(ProviderDescriptor {
            id: "openai".to_string(),
            display_name: "OpenAI".to_string(),
            family: WireFamily::OpenAiChat,
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: "gpt-4o".to_string(),
            max_context_tokens: 128_000,
            max_output_tokens: 16_384,
            credential_env: "OPENAI_API_KEY".to_string(),
            enabled: true,
            output_cap_override: None,
        });
        registry.insert(ProviderDescriptor {
            id: "anthropic".to_string(),
            display_name: "Anthropic".to_string(),
            family: WireFamily::AnthropicMessages,
            base_url: "https://api.anthropic.com".to_string(),
            default_model: "claude-sonnet-4-20250514".to_string(),
            max_context_tokens: 200_000,
            max_output_tokens: 8_192,
            credential_env: "ANTHROPIC_API_KEY".to_string(),
            enabled: true,
            output_cap_override: None,
        });
        registry.insert(ProviderDescriptor {
            id: "gemini".to_string(),
            display_name: "Google Gemini".to_string(),
            family: WireFamily::GeminiContents,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            default_model: "gemini-2.0-flash".to_string(),
            max_context_tokens: 1_048_576,
            max_output_tokens: 8_192,
            credential_env: "GEMINI_API_KEY".to_string(),
            enabled: true,
            output_cap_override: None,
        });
        registry
    }

    /// Insert or replace a descriptor (ids are unique)
    pub fn insert(&mut self, descriptor: ProviderDescriptor) {
        self.descriptors.insert(descriptor.id.clone(), descriptor);
    }

    /// Look up a descriptor by id
    pub fn get(&self, id: &str) -> Option<&ProviderDescriptor> {
        self.descriptors.get(id)
    }

    /// Mutable lookup, used when applying configuration overrides
    pub fn get_mut(&mut self, id: &str) -> Option<&mut ProviderDescriptor> {
        self.descriptors.get_mut(id)
    }

    /// All registered provider ids, sorted for stable output
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.descriptors.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Descriptors dispatch may use
    pub fn enabled(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.descriptors.values().filter(|d| d.enabled)
    }
}
