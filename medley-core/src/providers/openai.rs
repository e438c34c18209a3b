//! OpenAI-family adapter (chat-completions wire shape)
//!
//! Covers every provider speaking the OpenAI chat completions protocol:
//! system messages travel inline in the message list and streaming uses
//! `data:` SSE payloads terminated by `[DONE]`.

use super::adapter::{
    clamp_output_cap, resolve_model, validate_request, WireAdapter, WireRequest,
};
use super::descriptor::ProviderDescriptor;
use super::error::{classify_status, RelayError, RelayResult};
use crate::protocol::{ChatRequest, MessageRole};
use serde::{Deserialize, Serialize};

/// OpenAI chat completion request body
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiBody {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

/// Adapter for OpenAI-style chat completion providers
pub struct OpenAiAdapter;

impl WireAdapter for OpenAiAdapter {
    fn to_wire_request(
        &self,
        request: &ChatRequest,
        descriptor: &ProviderDescriptor,
        api_key: &str,
    ) -> RelayResult<WireRequest> {
        validate_request(request)?;

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(|m| OpenAiMessage {
            role: role_name(m.role).to_string(),
            content: m.content.clone(),
        }));

        let body = OpenAiBody {
            model: resolve_model(request, descriptor),
            messages,
            max_tokens: clamp_output_cap(request.max_output_tokens, descriptor),
            stream: request.stream,
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        Ok(WireRequest {
            endpoint: "/chat/completions".to_string(),
            body,
            headers: vec![
                ("authorization".to_string(), format!("Bearer {api_key}")),
                ("content-type".to_string(), "application/json".to_string()),
            ],
        })
    }

    fn from_wire_chunk(&self, payload: &str) -> Vec<String> {
        if payload.trim() == "[DONE]" {
            return Vec::new();
        }
        match serde_json::from_str::<OpenAiStreamChunk>(payload) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .filter_map(|c| c.delta.content)
                .filter(|text| !text.is_empty())
                .collect(),
            Err(err) => {
                tracing::warn!("skipping unparseable stream chunk: {err}");
                Vec::new()
            }
        }
    }

    fn from_wire_response(&self, body: &str) -> RelayResult<String> {
        let response: OpenAiResponse =
            serde_json::from_str(body).map_err(|e| RelayError::DecodeError(e.to_string()))?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                RelayError::DecodeError("response carries no message content".to_string())
            })
    }

    fn from_wire_error(&self, status: u16, body: &str) -> RelayError {
        let message = serde_json::from_str::<OpenAiErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| "provider error".to_string());
        classify_status(status, message, None)
    }
}
