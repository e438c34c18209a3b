//! Client-facing event frames
//!
//! Every frame is tagged with the provider it belongs to. Fragments keep
//! per-provider arrival order; nothing is guaranteed across providers.

use crate::providers::RelayError;
use serde::Serialize;

/// Terminal metadata for a completed provider stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoneMeta {
    /// Model that produced the response
    pub model: String,

    /// Attempts made, initial call included
    pub attempts: u32,

    /// Estimated input tokens
    pub input_tokens: u32,

    /// Estimated output tokens
    pub output_tokens: u32,

    /// Estimated cost in dollars; absent when the model has no known price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,

    /// Milliseconds to the first byte, when any arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_byte_ms: Option<u64>,

    /// Total milliseconds from dispatch to termination
    pub total_ms: u64,
}

/// Event payload of one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FrameEvent {
    /// Incremental text delta
    Fragment { text: String },

    /// Stream completed; carries final metadata
    Done { meta: DoneMeta },

    /// Stream failed terminally; kind and user-safe message only
    Error { kind: String, message: String },
}

/// One frame on the multiplexed client connection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Provider this frame belongs to
    pub provider_id: String,

    #[serde(flatten)]
    pub event: FrameEvent,
}

impl Frame {
    /// Fragment frame carrying one text delta
    pub fn fragment(provider_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            event: FrameEvent::Fragment { text: text.into() },
        }
    }

    /// Done frame carrying terminal metadata
    pub fn done(provider_id: impl Into<String>, meta: DoneMeta) -> Self {
        Self {
            provider_id: provider_id.into(),
            event: FrameEvent::Done { meta },
        }
    }

    /// Error frame for a classified terminal failure
    pub fn error(provider_id: impl Into<String>, error: &RelayError) -> Self {
        Self {
            provider_id: provider_id.into(),
            event: FrameEvent::Error {
                kind: error.kind().to_string(),
                message: error.user_message(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_serialize_with_provider_tag() {
        let frame = Frame::fragment("openai", "hello");
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["provider_id"], "openai");
        assert_eq!(json["event"], "fragment");
        assert_eq!(json["text"], "hello");
    }

    #[test]
    fn error_frame_carries_kind_and_safe_message() {
        let error = RelayError::RateLimited { retry_after: None };
        let frame = Frame::error("gemini", &error);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["kind"], "rate_limited");
        assert_eq!(json["message"], "rate limited by provider");
    }
}
