//! Preferred-block curation and context reconstruction
//!
//! A conversation replays as: each prior turn's user message, then one
//! assistant message built from the blocks the user actually selected for
//! that turn, joined by a blank line in the user's chosen order. Everything
//! the user did not select is discarded, so upstream token cost is bounded
//! by user intent rather than by provider verbosity.

pub mod store;

pub use store::{ConversationStore, MemoryStore, StoreError};

use crate::blocks::ResponseBlock;
use crate::protocol::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from selection and turn bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("turn {0} does not exist")]
    UnknownTurn(u32),

    #[error("turn {turn} has no response from provider {provider}")]
    UnknownProvider { turn: u32, provider: String },

    #[error("block {index} does not exist in turn {turn} response from {provider}")]
    UnknownBlock {
        turn: u32,
        provider: String,
        index: usize,
    },

    #[error("selection entry is already present")]
    DuplicateSelection,

    #[error("reorder must be a permutation of the current selection")]
    NotAPermutation,

    #[error("turn numbers must be strictly increasing (got {got}, expected {expected})")]
    NonMonotonicTurn { got: u32, expected: u32 },
}

/// Reference to one block of one provider's response in one turn
///
/// Selections are weak references into block storage: deleting the
/// referenced response drops every entry pointing into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub turn_number: u32,
    pub provider_id: String,
    pub block_index: usize,
}

/// One user message and every provider's response to it
///
/// Immutable once its provider streams have terminated, except for the
/// attached selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based, strictly increasing within a conversation
    pub turn_number: u32,

    /// The user message that started this turn
    pub user_message: String,

    /// Decomposed responses keyed by provider id
    #[serde(default)]
    pub responses: HashMap<String, Vec<ResponseBlock>>,

    /// The user's curated answer for this turn; order is user-controlled
    #[serde(default)]
    pub selection: Vec<SelectionEntry>,
}

impl Turn {
    /// Turn with no responses yet
    pub fn new(turn_number: u32, user_message: impl Into<String>) -> Self {
        Self {
            turn_number,
            user_message: user_message.into(),
            responses: HashMap::new(),
            selection: Vec::new(),
        }
    }

    /// Attach one provider's decomposed response
    pub fn with_response(mut self, provider_id: impl Into<String>, blocks: Vec<ResponseBlock>) -> Self {
        self.responses.insert(provider_id.into(), blocks);
        self
    }
}

/// A conversation: ordered turns plus their selections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation id, owned by the storage collaborator
    pub id: String,

    turns: Vec<Turn>,
}

impl Conversation {
    /// Empty conversation
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
        }
    }

    /// All turns in order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turn number the next `push_turn` must carry
    pub fn next_turn_number(&self) -> u32 {
        self.turns.len() as u32 + 1
    }

    /// Append a completed turn; numbers are 1-based and strictly increasing
    pub fn push_turn(&mut self, turn: Turn) -> Result<(), ContextError> {
        let expected = self.next_turn_number();
        if turn.turn_number != expected {
            return Err(ContextError::NonMonotonicTurn {
                got: turn.turn_number,
                expected,
            });
        }
        self.turns.push(turn);
        Ok(())
    }

    fn turn_mut(&mut self, turn_number: u32) -> Result<&mut Turn, ContextError> {
        (turn_number as usize)
            .checked_sub(1)
            .and_then(|i| self.turns.get_mut(i))
            .ok_or(ContextError::UnknownTurn(turn_number))
    }

    /// Resolve an entry to its persisted block
    fn resolve(&self, entry: &SelectionEntry) -> Result<&ResponseBlock, ContextError> {
        let turn = (entry.turn_number as usize)
            .checked_sub(1)
            .and_then(|i| self.turns.get(i))
            .ok_or(ContextError::UnknownTurn(entry.turn_number))?;
        let blocks = turn
            .responses
            .get(&entry.provider_id)
            .ok_or_else(|| ContextError::UnknownProvider {
                turn: entry.turn_number,
                provider: entry.provider_id.clone(),
            })?;
        blocks
            .get(entry.block_index)
            .ok_or_else(|| ContextError::UnknownBlock {
                turn: entry.turn_number,
                provider: entry.provider_id.clone(),
                index: entry.block_index,
            })
    }

    /// Add one preferred block to `turn_number`'s selection
    pub fn select_block(
        &mut self,
        turn_number: u32,
        entry: SelectionEntry,
    ) -> Result<(), ContextError> {
        self.resolve(&entry)?;
        let turn = self.turn_mut(turn_number)?;
        if turn.selection.contains(&entry) {
            return Err(ContextError::DuplicateSelection);
        }
        turn.selection.push(entry);
        Ok(())
    }

    /// Remove one entry; returns whether anything was removed
    pub fn deselect_block(
        &mut self,
        turn_number: u32,
        entry: &SelectionEntry,
    ) -> Result<bool, ContextError> {
        let turn = self.turn_mut(turn_number)?;
        let before = turn.selection.len();
        turn.selection.retain(|e| e != entry);
        Ok(turn.selection.len() != before)
    }

    /// Replace the selection order; must be an exact permutation of the
    /// current selection (same entries, order the only difference)
    pub fn reorder_selection(
        &mut self,
        turn_number: u32,
        new_order: Vec<SelectionEntry>,
    ) -> Result<(), ContextError> {
        let turn = self.turn_mut(turn_number)?;
        if new_order.len() != turn.selection.len() {
            return Err(ContextError::NotAPermutation);
        }
        let mut remaining = turn.selection.clone();
        for entry in &new_order {
            match remaining.iter().position(|e| e == entry) {
                Some(pos) => {
                    remaining.remove(pos);
                }
                None => return Err(ContextError::NotAPermutation),
            }
        }
        turn.selection = new_order;
        Ok(())
    }

    /// Replace a turn's selection wholesale, validating every entry
    pub fn replace_selection(
        &mut self,
        turn_number: u32,
        selection: Vec<SelectionEntry>,
    ) -> Result<(), ContextError> {
        for entry in &selection {
            self.resolve(entry)?;
        }
        let turn = self.turn_mut(turn_number)?;
        turn.selection = selection;
        Ok(())
    }

    /// Delete one provider's response from a turn and drop every selection
    /// entry pointing into it, in any turn
    pub fn delete_response(
        &mut self,
        turn_number: u32,
        provider_id: &str,
    ) -> Result<(), ContextError> {
        {
            let turn = self.turn_mut(turn_number)?;
            if turn.responses.remove(provider_id).is_none() {
                return Err(ContextError::UnknownProvider {
                    turn: turn_number,
                    provider: provider_id.to_string(),
                });
            }
        }
        for turn in &mut self.turns {
            turn.selection
                .retain(|e| !(e.turn_number == turn_number && e.provider_id == provider_id));
        }
        Ok(())
    }

    /// Build the linear message context for the next request.
    ///
    /// Cold start (no prior turns): exactly the new user message. Otherwise
    /// each prior turn contributes its user message and, when its selection
    /// is non-empty, one assistant message of the selected block contents
    /// joined by a blank line in the user's order; a turn with an empty
    /// selection still anchors its user message but contributes no
    /// assistant content.
    pub fn build_context(&self, new_user_message: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2 + 1);
        for turn in &self.turns {
            messages.push(Message::user(turn.user_message.clone()));
            if turn.selection.is_empty() {
                continue;
            }
            let curated: Vec<&str> = turn
                .selection
                .iter()
                .filter_map(|entry| self.resolve(entry).ok())
                .map(|block| block.content.as_str())
                .collect();
            if !curated.is_empty() {
                messages.push(Message::assistant(curated.join("\n\n")));
            }
        }
        messages.push(Message::user(new_user_message));
        messages
    }
}
