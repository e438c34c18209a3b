//! Tests for preferred-block curation and context reconstruction

use medley_core::blocks::decompose;
use medley_core::context::{
    Conversation, ContextError, ConversationStore, MemoryStore, SelectionEntry, StoreError, Turn,
};
use medley_core::protocol::MessageRole;

fn entry(turn: u32, provider: &str, index: usize) -> SelectionEntry {
    SelectionEntry {
        turn_number: turn,
        provider_id: provider.to_string(),
        block_index: index,
    }
}

/// Conversation with one completed turn and two provider responses
fn seeded_conversation() -> Conversation {
    let mut conversation = Conversation::new("conv-1");
    let turn = Turn::new(1, "compare these approaches")
        .with_response("openai", decompose("first answer\n\nsecond thought"))
        .with_response("anthropic", decompose("alpha\n\nbeta\n\ngamma"));
    conversation.push_turn(turn).unwrap();
    conversation
}

#[test]
fn cold_start_context_is_exactly_one_user_message() {
    let conversation = Conversation::new("fresh");
    let context = conversation.build_context("hello there");

    assert_eq!(context.len(), 1);
    assert_eq!(context[0].role, MessageRole::User);
    assert_eq!(context[0].content, "hello there");
}

#[test]
fn preferred_mode_joins_selected_blocks_in_user_order() {
    let mut conversation = seeded_conversation();
    // User picks across providers, anthropic block first.
    conversation.select_block(1, entry(1, "anthropic", 2)).unwrap();
    conversation.select_block(1, entry(1, "openai", 0)).unwrap();

    let context = conversation.build_context("next question");
    assert_eq!(context.len(), 3);
    assert_eq!(context[0].role, MessageRole::User);
    assert_eq!(context[0].content, "compare these approaches");
    assert_eq!(context[1].role, MessageRole::Assistant);
    // User order, not block-index or provider order.
    assert_eq!(context[1].content, "gamma\n\nfirst answer");
    assert_eq!(context[2].role, MessageRole::User);
    assert_eq!(context[2].content, "next question");
}

#[test]
fn empty_selection_anchors_user_message_without_assistant_content() {
    let conversation = seeded_conversation();
    let context = conversation.build_context("follow up");

    assert_eq!(context.len(), 2);
    assert_eq!(context[0].role, MessageRole::User);
    assert_eq!(context[1].role, MessageRole::User);
    assert_eq!(context[1].content, "follow up");
}

#[test]
fn unselected_output_is_discarded_from_context() {
    let mut conversation = seeded_conversation();
    conversation.select_block(1, entry(1, "openai", 1)).unwrap();

    let context = conversation.build_context("next");
    let assistant = &context[1];
    assert_eq!(assistant.content, "second thought");
    assert!(!assistant.content.contains("alpha"));
    assert!(!assistant.content.contains("first answer"));
}

#[test]
fn selection_must_resolve_to_a_real_block() {
    let mut conversation = seeded_conversation();

    assert_eq!(
        conversation.select_block(1, entry(1, "openai", 99)),
        Err(ContextError::UnknownBlock {
            turn: 1,
            provider: "openai".to_string(),
            index: 99,
        })
    );
    assert!(matches!(
        conversation.select_block(1, entry(1, "mistral", 0)),
        Err(ContextError::UnknownProvider { .. })
    ));
    assert_eq!(
        conversation.select_block(1, entry(7, "openai", 0)),
        Err(ContextError::UnknownTurn(7))
    );
}

#[test]
fn duplicate_selection_is_rejected() {
    let mut conversation = seeded_conversation();
    conversation.select_block(1, entry(1, "openai", 0)).unwrap();
    assert_eq!(
        conversation.select_block(1, entry(1, "openai", 0)),
        Err(ContextError::DuplicateSelection)
    );
}

#[test]
fn deselect_removes_one_entry() {
    let mut conversation = seeded_conversation();
    conversation.select_block(1, entry(1, "openai", 0)).unwrap();

    assert!(conversation.deselect_block(1, &entry(1, "openai", 0)).unwrap());
    assert!(!conversation.deselect_block(1, &entry(1, "openai", 0)).unwrap());
    assert_eq!(conversation.build_context("x").len(), 2);
}

#[test]
fn reorder_is_a_pure_permutation() {
    let mut conversation = seeded_conversation();
    conversation.select_block(1, entry(1, "openai", 0)).unwrap();
    conversation.select_block(1, entry(1, "anthropic", 0)).unwrap();
    conversation.select_block(1, entry(1, "anthropic", 1)).unwrap();

    let reordered = vec![
        entry(1, "anthropic", 1),
        entry(1, "openai", 0),
        entry(1, "anthropic", 0),
    ];
    conversation.reorder_selection(1, reordered.clone()).unwrap();
    assert_eq!(conversation.turns()[0].selection, reordered);

    let context = conversation.build_context("next");
    assert_eq!(context[1].content, "beta\n\nfirst answer\n\nalpha");
}

#[test]
fn reorder_rejects_non_permutations() {
    let mut conversation = seeded_conversation();
    conversation.select_block(1, entry(1, "openai", 0)).unwrap();
    conversation.select_block(1, entry(1, "openai", 1)).unwrap();

    // Wrong length.
    assert_eq!(
        conversation.reorder_selection(1, vec![entry(1, "openai", 0)]),
        Err(ContextError::NotAPermutation)
    );
    // Same length, different entries.
    assert_eq!(
        conversation.reorder_selection(
            1,
            vec![entry(1, "openai", 0), entry(1, "anthropic", 0)]
        ),
        Err(ContextError::NotAPermutation)
    );
    // Duplicated entry is not a permutation either.
    assert_eq!(
        conversation.reorder_selection(1, vec![entry(1, "openai", 0), entry(1, "openai", 0)]),
        Err(ContextError::NotAPermutation)
    );
}

#[test]
fn deleting_a_response_drops_selections_and_keeps_remaining_order() {
    let mut conversation = seeded_conversation();
    conversation.select_block(1, entry(1, "anthropic", 0)).unwrap();
    conversation.select_block(1, entry(1, "openai", 0)).unwrap();
    conversation.select_block(1, entry(1, "anthropic", 2)).unwrap();

    conversation.delete_response(1, "anthropic").unwrap();

    assert_eq!(conversation.turns()[0].selection, vec![entry(1, "openai", 0)]);
    assert!(!conversation.turns()[0].responses.contains_key("anthropic"));

    let context = conversation.build_context("next");
    assert_eq!(context[1].content, "first answer");
}

#[test]
fn turn_numbers_are_strictly_increasing() {
    let mut conversation = Conversation::new("c");
    conversation.push_turn(Turn::new(1, "one")).unwrap();

    assert_eq!(
        conversation.push_turn(Turn::new(1, "dup")),
        Err(ContextError::NonMonotonicTurn {
            got: 1,
            expected: 2
        })
    );
    assert_eq!(
        conversation.push_turn(Turn::new(5, "skip")),
        Err(ContextError::NonMonotonicTurn {
            got: 5,
            expected: 2
        })
    );
    conversation.push_turn(Turn::new(2, "two")).unwrap();
}

#[test]
fn multi_turn_replay_preserves_turn_order() {
    let mut conversation = Conversation::new("c");
    conversation
        .push_turn(Turn::new(1, "first question").with_response("openai", decompose("one")))
        .unwrap();
    conversation
        .push_turn(Turn::new(2, "second question").with_response("openai", decompose("two")))
        .unwrap();
    conversation.select_block(2, entry(2, "openai", 0)).unwrap();

    let context = conversation.build_context("third question");
    let roles: Vec<MessageRole> = context.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![
            MessageRole::User,      // turn 1 (no selection, no assistant)
            MessageRole::User,      // turn 2
            MessageRole::Assistant, // turn 2 curated answer
            MessageRole::User,      // new message
        ]
    );
    assert_eq!(context[2].content, "two");
}

#[tokio::test]
async fn memory_store_round_trip() {
    let store = MemoryStore::new();
    let turn = Turn::new(1, "hello").with_response("openai", decompose("answer text"));
    store.persist_turn("conv-9", turn).await.unwrap();

    store
        .persist_selection("conv-9", 1, vec![entry(1, "openai", 0)])
        .await
        .unwrap();

    let loaded = store.load("conv-9").await.unwrap();
    assert_eq!(loaded.turns().len(), 1);
    assert_eq!(loaded.turns()[0].selection.len(), 1);
    assert_eq!(loaded.build_context("next")[1].content, "answer text");
}

#[tokio::test]
async fn memory_store_turns_are_write_once() {
    let store = MemoryStore::new();
    store.persist_turn("c", Turn::new(1, "a")).await.unwrap();

    let result = store.persist_turn("c", Turn::new(1, "again")).await;
    assert!(matches!(result, Err(StoreError::TurnExists { turn: 1, .. })));
}

#[tokio::test]
async fn memory_store_missing_conversation() {
    let store = MemoryStore::new();
    assert!(matches!(
        store.load("nope").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.persist_selection("nope", 1, vec![]).await,
        Err(StoreError::NotFound(_))
    ));
}
