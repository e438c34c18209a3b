//! Anthropic-family adapter (messages wire shape)
//!
//! System content travels in a separate top-level field rather than in the
//! message list, so in-sequence system messages are folded into it before
//! translation. Streaming payloads are typed events; only
//! `content_block_delta` text deltas become fragments.

use super::adapter::{clamp_output_cap, resolve_model, validate_request, WireAdapter, WireRequest};
use super::descriptor::ProviderDescriptor;
use super::error::{classify_status, RelayError, RelayResult};
use crate::protocol::{ChatRequest, MessageRole};
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages request body
#[derive(Debug, Serialize, Deserialize)]
struct AnthropicBody {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<AnthropicDelta>,
}

#[derive(Debug, Deserialize)]
struct AnthropicDelta {
    #[serde(rename = "type")]
    delta_type: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Adapter for Anthropic-style message providers
pub struct AnthropicAdapter;

impl WireAdapter for AnthropicAdapter {
    fn to_wire_request(
        &self,
        request: &ChatRequest,
        descriptor: &ProviderDescriptor,
        api_key: &str,
    ) -> RelayResult<WireRequest> {
        validate_request(request)?;

        // Fold the preamble and any in-sequence system messages into the
        // top-level system field; the wire has no system role.
        let mut system_parts: Vec<String> = Vec::new();
        if let Some(system) = &request.system {
            system_parts.push(system.clone());
        }
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            match message.role {
                MessageRole::System => system_parts.push(message.content.clone()),
                MessageRole::User => messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: message.content.clone(),
                }),
                MessageRole::Assistant => messages.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: message.content.clone(),
                }),
            }
        }
        if messages.is_empty() {
            return Err(RelayError::InvalidRequest(
                "message sequence holds no user or assistant messages".to_string(),
            ));
        }

        let body = AnthropicBody {
            model: resolve_model(request, descriptor),
            max_tokens: clamp_output_cap(request.max_output_tokens, descriptor),
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
            messages,
            stream: request.stream,
        };
        let body =
            serde_json::to_value(&body).map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        Ok(WireRequest {
            endpoint: "/v1/messages".to_string(),
            body,
            headers: vec![
                ("x-api-key".to_string(), api_key.to_string()),
                ("anthropic-version".to_string(), ANTHROPIC_VERSION.to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
        })
    }

    fn from_wire_chunk(&self, payload: &str) -> Vec<String> {
        match serde_json::from_str::<AnthropicStreamEvent>(payload) {
            Ok(event) if event.event_type == "content_block_delta" => event
                .delta
                .filter(|d| d.delta_type.as_deref() == Some("text_delta"))
                .and_then(|d| d.text)
                .filter(|text| !text.is_empty())
                .into_iter()
                .collect(),
            Ok(_) => Vec::new(),
            Err(err) => {
                tracing::warn!("skipping unparseable stream event: {err}");
                Vec::new()
            }
        }
    }

    fn from_wire_response(&self, body: &str) -> RelayResult<String> {
        let response: AnthropicResponse =
            serde_json::from_str(body).map_err(|e| RelayError::DecodeError(e.to_string()))?;
        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(RelayError::DecodeError(
                "response carries no text content".to_string(),
            ));
        }
        Ok(text)
    }

    fn from_wire_error(&self, status: u16, body: &str) -> RelayError {
        let message = serde_json::from_str::<AnthropicErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| "provider error".to_string());
        classify_status(status, message, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;
    use crate::providers::descriptor::ProviderRegistry;

    fn descriptor() -> ProviderDescriptor {
        ProviderRegistry::builtin()
            .get("anthropic")
            .cloned()
            .unwrap()
    }

    #[test]
    fn system_messages_fold_into_top_level_field() {
        let request = ChatRequest::new(
            "",
            vec![
                Message::system("stay factual"),
                Message::user("hi"),
                Message::assistant("hello"),
                Message::user("continue"),
            ],
        )
        .with_system("be brief");
        let wire = AnthropicAdapter
            .to_wire_request(&request, &descriptor(), "key")
            .unwrap();

        assert_eq!(wire.endpoint, "/v1/messages");
        assert_eq!(wire.body["system"], "be brief\n\nstay factual");
        assert_eq!(wire.body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(wire.body["messages"][1]["role"], "assistant");
        assert_eq!(wire.body["model"], "claude-sonnet-4-20250514");
        assert!(wire.headers.iter().any(|(k, _)| k == "anthropic-version"));
    }

    #[test]
    fn system_only_sequence_is_rejected() {
        let request = ChatRequest::new("", vec![Message::system("just rules")]);
        assert!(matches!(
            AnthropicAdapter.to_wire_request(&request, &descriptor(), "key"),
            Err(RelayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn only_text_deltas_become_fragments() {
        let delta =
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        assert_eq!(AnthropicAdapter.from_wire_chunk(delta), vec!["Hi"]);

        let other = r#"{"type":"message_start","message":{}}"#;
        assert!(AnthropicAdapter.from_wire_chunk(other).is_empty());

        let json_delta = r#"{"type":"content_block_delta","index":0,"delta":{"type":"input_json_delta","partial_json":"{"}}"#;
        assert!(AnthropicAdapter.from_wire_chunk(json_delta).is_empty());
    }

    #[test]
    fn response_concatenates_text_blocks() {
        let body = r#"{"content":[{"type":"text","text":"Hello "},{"type":"text","text":"world"}]}"#;
        assert_eq!(
            AnthropicAdapter.from_wire_response(body).unwrap(),
            "Hello world"
        );
    }

    #[test]
    fn error_body_extraction() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"overloaded"}}"#;
        let err = AnthropicAdapter.from_wire_error(529, body);
        assert!(matches!(
            err,
            RelayError::ProviderServerError { status: Some(529), ref message } if message == "overloaded"
        ));
    }
}
