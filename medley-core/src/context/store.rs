//! Persistence boundary for turns and selections
//!
//! Storage itself is an external collaborator; the core only needs
//! write-once turn persistence, incremental selection writes, and a load
//! call that reconstructs a conversation for context building. The
//! in-memory implementation backs tests and demos.

use super::{Conversation, SelectionEntry, Turn};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from the storage collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation {0} not found")]
    NotFound(String),

    #[error("turn {turn} is already persisted for conversation {conversation}")]
    TurnExists { conversation: String, turn: u32 },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Write-once turn persistence and incremental selection writes
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a completed turn; turns are write-once
    async fn persist_turn(&self, conversation_id: &str, turn: Turn) -> Result<(), StoreError>;

    /// Persist a turn's current selection, replacing the previous one
    async fn persist_selection(
        &self,
        conversation_id: &str,
        turn_number: u32,
        selection: Vec<SelectionEntry>,
    ) -> Result<(), StoreError>;

    /// Reconstruct a conversation for context building
    async fn load(&self, conversation_id: &str) -> Result<Conversation, StoreError>;
}

/// In-memory store backing tests and demos
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: Mutex<HashMap<String, Conversation>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Conversation>>, StoreError> {
        self.conversations
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn persist_turn(&self, conversation_id: &str, turn: Turn) -> Result<(), StoreError> {
        let mut conversations = self.lock()?;
        let conversation = conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| Conversation::new(conversation_id));
        if conversation
            .turns()
            .iter()
            .any(|t| t.turn_number == turn.turn_number)
        {
            return Err(StoreError::TurnExists {
                conversation: conversation_id.to_string(),
                turn: turn.turn_number,
            });
        }
        conversation
            .push_turn(turn)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn persist_selection(
        &self,
        conversation_id: &str,
        turn_number: u32,
        selection: Vec<SelectionEntry>,
    ) -> Result<(), StoreError> {
        let mut conversations = self.lock()?;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))?;
        conversation
            .replace_selection(turn_number, selection)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn load(&self, conversation_id: &str) -> Result<Conversation, StoreError> {
        self.lock()?
            .get(conversation_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(conversation_id.to_string()))
    }
}
