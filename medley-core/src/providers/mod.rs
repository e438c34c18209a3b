//! Provider adapters and the descriptor registry
//!
//! Each supported provider gets exactly one descriptor and one wire
//! adapter. Adapters are pure translation: canonical request in, provider
//! wire shape out, and back again for stream chunks, response bodies, and
//! error payloads. Nothing here performs I/O.

pub mod adapter;
pub mod anthropic;
pub mod descriptor;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod retry;

pub use adapter::{clamp_output_cap, resolve_model, WireAdapter, WireRequest};
pub use descriptor::{ProviderDescriptor, ProviderRegistry, WireFamily};
pub use error::{classify_status, RelayError, RelayResult};
pub use retry::RetryPolicy;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use openai::OpenAiAdapter;
