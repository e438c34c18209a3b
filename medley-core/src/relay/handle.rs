//! Per-(turn, provider) stream state

use crate::providers::RelayError;
use std::time::Instant;

/// Lifecycle state of one provider stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Stream is being relayed
    Active,
    /// Stream finished successfully
    Complete,
    /// Stream failed after retry policy was exhausted
    Failed,
    /// User cancelled the turn
    Cancelled,
}

/// Mutable state owned by exactly one relay task
///
/// Created when dispatch begins, mutated only by the owning task, marked
/// terminal exactly once, then read-only history.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    /// Provider this handle belongs to
    pub provider_id: String,

    /// Text relayed so far
    pub accumulated: String,

    /// Lifecycle state
    pub state: StreamState,

    /// Classified error for failed streams
    pub error: Option<RelayError>,

    /// Attempts made, initial call included
    pub attempts: u32,

    /// When dispatch began
    pub started_at: Instant,

    /// When the first fragment arrived
    pub first_byte_at: Option<Instant>,

    /// When the stream reached a terminal state
    pub finished_at: Option<Instant>,
}

impl StreamHandle {
    /// Fresh handle in the active state
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            accumulated: String::new(),
            state: StreamState::Active,
            error: None,
            attempts: 0,
            started_at: Instant::now(),
            first_byte_at: None,
            finished_at: None,
        }
    }

    /// Append one fragment, stamping time-to-first-byte on the first
    pub fn append_fragment(&mut self, text: &str) {
        if self.first_byte_at.is_none() {
            self.first_byte_at = Some(Instant::now());
        }
        self.accumulated.push_str(text);
    }

    /// Whether the handle has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        self.state != StreamState::Active
    }

    /// Mark the stream complete
    pub fn mark_complete(&mut self) {
        self.finish(StreamState::Complete, None);
    }

    /// Mark the stream failed with its classified error
    pub fn mark_failed(&mut self, error: RelayError) {
        self.finish(StreamState::Failed, Some(error));
    }

    /// Mark the stream cancelled
    pub fn mark_cancelled(&mut self) {
        self.finish(StreamState::Cancelled, None);
    }

    // Terminal transition happens exactly once; later calls are ignored.
    fn finish(&mut self, state: StreamState, error: Option<RelayError>) {
        if self.is_terminal() {
            return;
        }
        self.state = state;
        self.error = error;
        self.finished_at = Some(Instant::now());
    }

    /// Milliseconds to the first byte, when any arrived
    pub fn first_byte_ms(&self) -> Option<u64> {
        self.first_byte_at
            .map(|t| t.duration_since(self.started_at).as_millis() as u64)
    }

    /// Milliseconds from dispatch to termination (to now while active)
    pub fn total_ms(&self) -> u64 {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
            .as_millis() as u64
    }
}
