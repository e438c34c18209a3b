//! Replay a curated two-turn conversation into the next request's context.
//!
//! Run with: cargo run --example curation_demo

use anyhow::Result;
use medley_core::blocks::decompose;
use medley_core::context::{Conversation, SelectionEntry, Turn};

fn entry(turn: u32, provider: &str, index: usize) -> SelectionEntry {
    SelectionEntry {
        turn_number: turn,
        provider_id: provider.to_string(),
        block_index: index,
    }
}

fn main() -> Result<()> {
    let mut conversation = Conversation::new("demo");

    // Turn 1: two providers answered; the user curates across both.
    conversation.push_turn(
        Turn::new(1, "Explain the trade-offs of event sourcing.")
            .with_response(
                "openai",
                decompose("Event sourcing stores every change.\n\nIt complicates reads."),
            )
            .with_response(
                "anthropic",
                decompose("The audit trail is free.\n\nReplays can rebuild state."),
            ),
    )?;
    conversation.select_block(1, entry(1, "anthropic", 0))?;
    conversation.select_block(1, entry(1, "openai", 1))?;

    // Turn 2: answered, but nothing was selected; it still anchors the
    // user message in the replay.
    conversation.push_turn(
        Turn::new(2, "Is it worth it for a CRUD app?")
            .with_response("openai", decompose("Usually not.")),
    )?;

    let context = conversation.build_context("What about for a ledger?");
    println!("next request carries {} messages:\n", context.len());
    for message in &context {
        println!("[{:?}] {}", message.role, message.content.replace("\n\n", " / "));
    }

    Ok(())
}
