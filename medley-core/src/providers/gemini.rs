//! Gemini-family adapter (contents-with-parts wire shape)
//!
//! The assistant role is called "model" on this wire, system content rides
//! in `systemInstruction`, and the endpoint path carries both the model and
//! the streaming verb.

use super::adapter::{clamp_output_cap, resolve_model, validate_request, WireAdapter, WireRequest};
use super::descriptor::ProviderDescriptor;
use super::error::{classify_status, RelayError, RelayResult};
use crate::protocol::{ChatRequest, MessageRole};
use serde::{Deserialize, Serialize};

/// Gemini generate-content request body
#[derive(Debug, Serialize, Deserialize)]
struct GeminiBody {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        // The wire calls the assistant "model"; system is folded away.
        MessageRole::Assistant => "model",
        _ => "user",
    }
}

fn candidate_texts(response: GeminiResponse) -> Vec<String> {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Adapter for Gemini-style generate-content providers
pub struct GeminiAdapter;

impl WireAdapter for GeminiAdapter {
    fn to_wire_request(
        &self,
        request: &ChatRequest,
        descriptor: &ProviderDescriptor,
        api_key: &str,
    ) -> RelayResult<WireRequest> {
        validate_request(request)?;

        let mut system_parts: Vec<GeminiPart> = Vec::new();
        if let Some(system) = &request.system {
            system_parts.push(GeminiPart {
                text: system.clone(),
            });
        }
        let mut contents = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            if message.role == MessageRole::System {
                system_parts.push(GeminiPart {
                    text: message.content.clone(),
                });
                continue;
            }
            contents.push(GeminiContent {
                role: Some(role_name(message.role).to_string()),
                parts: vec![GeminiPart {
                    text: message.content.clone(),
                }],
            });
        }
        if contents.is_empty() {
            return Err(RelayError::InvalidRequest(
                "message sequence holds no user or assistant messages".to_string(),
            ));
        }

        let body = GeminiBody {
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(GeminiContent {
                    role: None,
                    parts: system_parts,
                })
            },
            contents,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: clamp_output_cap(request.max_output_tokens, descriptor),
            },
        };
        let body =
            serde_json::to_value(&body).map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        let model = resolve_model(request, descriptor);
        let verb = if request.stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };

        Ok(WireRequest {
            endpoint: format!("/v1beta/models/{model}:{verb}"),
            body,
            headers: vec![
                ("x-goog-api-key".to_string(), api_key.to_string()),
                ("content-type".to_string(), "application/json".to_string()),
            ],
        })
    }

    fn from_wire_chunk(&self, payload: &str) -> Vec<String> {
        match serde_json::from_str::<GeminiResponse>(payload) {
            Ok(response) => candidate_texts(response),
            Err(err) => {
                tracing::warn!("skipping unparseable stream chunk: {err}");
                Vec::new()
            }
        }
    }

    fn from_wire_response(&self, body: &str) -> RelayResult<String> {
        let response: GeminiResponse =
            serde_json::from_str(body).map_err(|e| RelayError::DecodeError(e.to_string()))?;
        let text = candidate_texts(response).concat();
        if text.is_empty() {
            return Err(RelayError::DecodeError(
                "response carries no candidate text".to_string(),
            ));
        }
        Ok(text)
    }

    fn from_wire_error(&self, status: u16, body: &str) -> RelayError {
        let message = serde_json::from_str::<GeminiErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| "provider error".to_string());
        classify_status(status, message, None)
    }
}
