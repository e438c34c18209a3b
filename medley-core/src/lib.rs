//! Medley Core Library
//!
//! This crate implements the conversation orchestration pipeline behind a
//! multi-provider chat product: fan one prompt out to several LLM
//! providers at once, relay each provider's answer as an independent
//! stream, decompose finished answers into typed content blocks, and
//! rebuild the next turn's context from the user's curated block
//! selections.
//!
//! The modules follow the data flow:
//! - [`protocol`] — the canonical request model
//! - [`providers`] — per-provider wire adapters and the descriptor registry
//! - [`estimate`] — token counts, output caps, and price estimates
//! - [`relay`] — concurrent dispatch and streaming relay
//! - [`blocks`] — block decomposition of response text
//! - [`context`] — preferred-block curation and context reconstruction
//! - [`config`] / [`http`] — the ambient configuration and HTTP plumbing

pub mod blocks;
pub mod config;
pub mod context;
pub mod estimate;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod relay;

pub use blocks::{decompose, BlockKind, ResponseBlock};
pub use context::{Conversation, SelectionEntry, Turn};
pub use protocol::{ChatRequest, Message, MessageRole};
pub use providers::{ProviderDescriptor, ProviderRegistry, RelayError, WireFamily};
pub use relay::{Dispatcher, Frame, FrameEvent, StreamHandle, StreamState};

/// Returns the version of the medley-core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
