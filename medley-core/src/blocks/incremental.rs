//! Incremental re-decomposition for active streams
//!
//! Re-running full decomposition on every byte is wasteful and makes the
//! provisional view jitter, so re-runs are gated on accumulated growth;
//! the relay calls `refresh` when a flush goes quiet instead of arming
//! timers. The tail past the last blank-line boundary may still grow, so
//! it stays out of the provisional blocks as an in-progress fragment.
//! Indices are only assigned by `finalize`, once the provider stream has
//! terminated — nothing provisional is ever persisted.

use super::{decompose, ResponseBlock};

/// Accumulated growth (bytes) that triggers a re-decomposition
const DEFAULT_GROWTH_THRESHOLD: usize = 256;

/// Incremental decomposition state for one provider stream
#[derive(Debug, Clone)]
pub struct IncrementalDecomposer {
    growth_threshold: usize,
    last_decomposed_len: usize,
    blocks: Vec<ResponseBlock>,
    pending_tail: String,
}

impl IncrementalDecomposer {
    /// State with the default growth threshold
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_GROWTH_THRESHOLD)
    }

    /// State with a custom growth threshold
    pub fn with_threshold(growth_threshold: usize) -> Self {
        Self {
            growth_threshold,
            last_decomposed_len: 0,
            blocks: Vec::new(),
            pending_tail: String::new(),
        }
    }

    /// Re-decompose if the accumulated text has grown past the threshold
    /// since the last run. Returns whether the provisional view changed.
    pub fn update(&mut self, accumulated: &str) -> bool {
        if accumulated.len() < self.last_decomposed_len + self.growth_threshold {
            return false;
        }
        self.refresh(accumulated);
        true
    }

    /// Unconditional re-decomposition; the relay calls this on quiescence
    pub fn refresh(&mut self, accumulated: &str) {
        self.last_decomposed_len = accumulated.len();
        let (stable, tail) = split_stable_prefix(accumulated);
        self.blocks = decompose(stable);
        self.pending_tail = tail.to_string();
    }

    /// Provisional blocks covering the stable prefix
    pub fn blocks(&self) -> &[ResponseBlock] {
        &self.blocks
    }

    /// The unsegmented in-progress fragment
    pub fn pending_tail(&self) -> &str {
        &self.pending_tail
    }

    /// Final decomposition once the provider stream has terminated; only
    /// here do block indices become authoritative
    pub fn finalize(self, accumulated: &str) -> Vec<ResponseBlock> {
        decompose(accumulated)
    }
}

impl Default for IncrementalDecomposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Split at the last blank-line boundary: everything before it has settled,
/// everything after may still grow
fn split_stable_prefix(text: &str) -> (&str, &str) {
    match text.rfind("\n\n") {
        Some(pos) => (&text[..pos], text[pos..].trim_start_matches('\n')),
        None => ("", text),
    }
}
