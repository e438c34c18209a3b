//! Wire adapter contract shared by every provider family

use super::descriptor::ProviderDescriptor;
use super::error::{RelayError, RelayResult};
use crate::protocol::ChatRequest;
use serde_json::Value;

/// A provider-ready request: endpoint path, JSON body, and headers
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Path (and query) appended to the descriptor's base URL
    pub endpoint: String,

    /// JSON body in the provider's wire shape
    pub body: Value,

    /// Headers, credential included
    pub headers: Vec<(String, String)>,
}

/// Pure translation between the canonical protocol and one wire family
///
/// Implementations carry no state and perform no I/O; dispatch selects one
/// through `WireFamily::adapter`.
pub trait WireAdapter: Send + Sync {
    /// Translate a canonical request into the provider's wire shape.
    ///
    /// Fails fast with `InvalidRequest` on an empty message sequence, maps
    /// the canonical roles into the provider's vocabulary, and clamps the
    /// requested output cap to the descriptor's ceiling.
    fn to_wire_request(
        &self,
        request: &ChatRequest,
        descriptor: &ProviderDescriptor,
        api_key: &str,
    ) -> RelayResult<WireRequest>;

    /// Extract text fragments from one streaming data payload.
    ///
    /// Unparseable payloads yield no fragments, never an error.
    fn from_wire_chunk(&self, payload: &str) -> Vec<String>;

    /// Extract the response text from a full non-streaming body
    fn from_wire_response(&self, body: &str) -> RelayResult<String>;

    /// Classify a non-success response into a `RelayError`.
    ///
    /// Bodies that are not parseable JSON classify by status alone with a
    /// generic provider-error message.
    fn from_wire_error(&self, status: u16, body: &str) -> RelayError;
}

/// Clamp a requested output cap to the descriptor's declared ceiling
pub fn clamp_output_cap(requested: Option<u32>, descriptor: &ProviderDescriptor) -> u32 {
    requested
        .unwrap_or(descriptor.max_output_tokens)
        .min(descriptor.max_output_tokens)
}

/// Fail-fast validation shared by every adapter
pub fn validate_request(request: &ChatRequest) -> RelayResult<()> {
    if request.messages.is_empty() {
        return Err(RelayError::InvalidRequest(
            "message sequence is empty".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the model to use: the request's, or the descriptor default
pub fn resolve_model(request: &ChatRequest, descriptor: &ProviderDescriptor) -> String {
    if request.model.is_empty() {
        descriptor.default_model.clone()
    } else {
        request.model.clone()
    }
}
