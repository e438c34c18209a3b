//! Token and cost estimation
//!
//! Closed-form approximations only: word and character counts blended with
//! family-specific coefficients, a 90% context reservation when deriving
//! output caps, and a per-million-token price table that refuses to guess
//! unknown prices.

use crate::protocol::ChatRequest;
use crate::providers::{ProviderDescriptor, WireFamily};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fraction of the remaining context window offered to output; guards
/// providers that count input and output against one shared window.
const CONTEXT_RESERVATION: f64 = 0.9;

/// Tokenizer family, one coefficient set per wire family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerFamily {
    /// OpenAI BPE (cl100k-style) vocabularies
    Cl100k,
    /// Anthropic Claude vocabularies
    Claude,
    /// Worst-case bound for SentencePiece and unknown vocabularies:
    /// close to one token per character, deliberately pessimistic
    SentencePiece,
}

impl TokenizerFamily {
    /// Coefficients: (tokens per word, tokens per character)
    fn coefficients(&self) -> (f64, f64) {
        match self {
            TokenizerFamily::Cl100k => (0.75, 0.10),
            TokenizerFamily::Claude => (0.80, 0.12),
            TokenizerFamily::SentencePiece => (0.50, 0.90),
        }
    }

    /// Parse a family name; unknown names fall back to the most
    /// conservative family rather than underestimating
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "cl100k" | "openai" => TokenizerFamily::Cl100k,
            "claude" | "anthropic" => TokenizerFamily::Claude,
            _ => TokenizerFamily::SentencePiece,
        }
    }
}

impl From<WireFamily> for TokenizerFamily {
    fn from(family: WireFamily) -> Self {
        match family {
            WireFamily::OpenAiChat => TokenizerFamily::Cl100k,
            WireFamily::AnthropicMessages => TokenizerFamily::Claude,
            WireFamily::GeminiContents => TokenizerFamily::SentencePiece,
        }
    }
}

/// Approximate the token count of raw text
pub fn estimate_tokens(text: &str, family: TokenizerFamily) -> u32 {
    if text.is_empty() {
        return 0;
    }
    let words = text.split_whitespace().count() as f64;
    let chars = text.chars().count() as f64;
    let (per_word, per_char) = family.coefficients();
    (words * per_word + chars * per_char).ceil() as u32
}

/// Approximate the input token count of a whole request
pub fn estimate_request_tokens(request: &ChatRequest, family: TokenizerFamily) -> u32 {
    let mut total = request
        .system
        .as_deref()
        .map(|s| estimate_tokens(s, family))
        .unwrap_or(0);
    for message in &request.messages {
        total += estimate_tokens(&message.content, family);
    }
    total
}

/// Derive the output-token cap for one request against one provider
///
/// A fixed override is returned verbatim; the adapter still clamps it to
/// the descriptor ceiling. Otherwise 90% of the remaining context window,
/// clamped to the output ceiling and floored at zero.
pub fn compute_output_cap(
    descriptor: &ProviderDescriptor,
    input_tokens: u32,
    fixed_override: Option<u32>,
) -> u32 {
    if let Some(cap) = fixed_override {
        return cap;
    }
    let remaining = descriptor.max_context_tokens.saturating_sub(input_tokens);
    let reserved = (f64::from(remaining) * CONTEXT_RESERVATION).floor() as u32;
    reserved.min(descriptor.max_output_tokens)
}

/// Per-million-token rates for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelRate {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

/// Price table keyed by (provider id, model id)
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    rates: HashMap<(String, String), ModelRate>,
}

impl PriceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded with rates for the built-in models
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.insert(
            "openai",
            "gpt-4o",
            ModelRate {
                input_per_mtok: 2.50,
                output_per_mtok: 10.00,
            },
        );
        table.insert(
            "anthropic",
            "claude-sonnet-4-20250514",
            ModelRate {
                input_per_mtok: 3.00,
                output_per_mtok: 15.00,
            },
        );
        table.insert(
            "gemini",
            "gemini-2.0-flash",
            ModelRate {
                input_per_mtok: 0.10,
                output_per_mtok: 0.40,
            },
        );
        table
    }

    /// Register rates for one model
    pub fn insert(&mut self, provider_id: &str, model: &str, rate: ModelRate) {
        self.rates
            .insert((provider_id.to_string(), model.to_string()), rate);
    }

    /// Estimated cost in dollars, or `None` for unknown combinations —
    /// a missing price is never silently substituted
    pub fn cost(
        &self,
        provider_id: &str,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Option<f64> {
        let rate = self
            .rates
            .get(&(provider_id.to_string(), model.to_string()))?;
        Some(
            f64::from(input_tokens) * rate.input_per_mtok / 1_000_000.0
                + f64::from(output_tokens) * rate.output_per_mtok / 1_000_000.0,
        )
    }
}
