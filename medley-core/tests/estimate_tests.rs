//! Tests for the token/cost estimator

use medley_core::estimate::*;
use medley_core::protocol::{ChatRequest, Message};
use medley_core::providers::{ProviderDescriptor, ProviderRegistry, WireFamily};
use test_case::test_case;

fn descriptor(max_context: u32, max_output: u32) -> ProviderDescriptor {
    ProviderDescriptor {
        id: "test".to_string(),
        display_name: "Test".to_string(),
        family: WireFamily::GeminiContents,
        base_url: "https://example.invalid".to_string(),
        default_model: "test-model".to_string(),
        max_context_tokens: max_context,
        max_output_tokens: max_output,
        credential_env: "TEST_KEY".to_string(),
        enabled: true,
        output_cap_override: None,
    }
}

#[test_case(TokenizerFamily::Cl100k)]
#[test_case(TokenizerFamily::Claude)]
#[test_case(TokenizerFamily::SentencePiece)]
fn estimates_are_positive_and_monotonic(family: TokenizerFamily) {
    assert_eq!(estimate_tokens("", family), 0);
    let short = estimate_tokens("one sentence here", family);
    let long = estimate_tokens("one sentence here, and then quite a bit more text", family);
    assert!(short > 0);
    assert!(long > short);
}

#[test]
fn unknown_family_name_falls_back_to_most_conservative() {
    let text = "some arbitrary prompt text";
    let unknown = TokenizerFamily::from_name("qwen-flavored");
    assert_eq!(unknown, TokenizerFamily::SentencePiece);
    assert_eq!(
        estimate_tokens(text, unknown),
        estimate_tokens(text, TokenizerFamily::SentencePiece)
    );
    // The fallback family never estimates below the others.
    assert!(
        estimate_tokens(text, TokenizerFamily::SentencePiece)
            >= estimate_tokens(text, TokenizerFamily::Cl100k)
    );
    assert!(
        estimate_tokens(text, TokenizerFamily::SentencePiece)
            >= estimate_tokens(text, TokenizerFamily::Claude)
    );
}

#[test]
fn family_names_resolve() {
    assert_eq!(TokenizerFamily::from_name("openai"), TokenizerFamily::Cl100k);
    assert_eq!(TokenizerFamily::from_name("Claude"), TokenizerFamily::Claude);
    assert_eq!(
        TokenizerFamily::from(WireFamily::AnthropicMessages),
        TokenizerFamily::Claude
    );
}

#[test]
fn request_tokens_sum_system_and_messages() {
    let family = TokenizerFamily::Cl100k;
    let request = ChatRequest::new("m", vec![Message::user("hello there")])
        .with_system("be helpful");
    let expected =
        estimate_tokens("be helpful", family) + estimate_tokens("hello there", family);
    assert_eq!(estimate_request_tokens(&request, family), expected);
}

#[test]
fn output_cap_never_exceeds_ceiling() {
    let descriptor = descriptor(1_000_000, 8_192);
    for input in [0u32, 1, 100, 10_000, 500_000, 999_999, u32::MAX] {
        assert!(compute_output_cap(&descriptor, input, None) <= 8_192);
    }
}

#[test]
fn output_cap_reserves_ninety_percent_of_remaining_context() {
    let descriptor = descriptor(10_000, 100_000);
    // floor(0.9 * (10_000 - 1_000)) = 8_100
    assert_eq!(compute_output_cap(&descriptor, 1_000, None), 8_100);
}

#[test]
fn huge_input_drives_cap_to_exactly_zero_never_negative() {
    let descriptor = descriptor(8_000, 4_096);
    assert_eq!(compute_output_cap(&descriptor, 8_000, None), 0);
    assert_eq!(compute_output_cap(&descriptor, u32::MAX, None), 0);
}

#[test]
fn nine_thousand_char_prompt_against_8000_context_caps_at_zero() {
    let descriptor = descriptor(8_000, 4_096);
    let prompt = "word ".repeat(1_800); // exactly 9_000 characters
    assert_eq!(prompt.chars().count(), 9_000);

    let family = TokenizerFamily::from(descriptor.family);
    let input_tokens = estimate_tokens(&prompt, family);
    assert_eq!(compute_output_cap(&descriptor, input_tokens, None), 0);
}

#[test]
fn fixed_override_is_returned_verbatim() {
    let descriptor = descriptor(8_000, 4_096);
    assert_eq!(compute_output_cap(&descriptor, u32::MAX, Some(512)), 512);
    // Even an override above the ceiling comes back verbatim; adapters
    // clamp it at translation time.
    assert_eq!(
        compute_output_cap(&descriptor, 0, Some(1_000_000)),
        1_000_000
    );
}

#[test]
fn builtin_prices_are_linear_in_both_counts() {
    let table = PriceTable::builtin();
    let base = table.cost("openai", "gpt-4o", 1_000_000, 0).unwrap();
    assert!((base - 2.50).abs() < 1e-9);

    let with_output = table.cost("openai", "gpt-4o", 1_000_000, 1_000_000).unwrap();
    assert!((with_output - 12.50).abs() < 1e-9);

    assert_eq!(table.cost("openai", "gpt-4o", 0, 0), Some(0.0));
}

#[test]
fn unknown_model_yields_no_price() {
    let table = PriceTable::builtin();
    assert_eq!(table.cost("openai", "gpt-unreleased", 1000, 1000), None);
    assert_eq!(table.cost("nobody", "gpt-4o", 1000, 1000), None);
}

#[test]
fn builtin_models_all_have_prices() {
    let table = PriceTable::builtin();
    let registry = ProviderRegistry::builtin();
    for id in registry.ids() {
        let descriptor = registry.get(&id).unwrap();
        assert!(
            table.cost(&id, &descriptor.default_model, 1000, 1000).is_some(),
            "no price for {id}/{}",
            descriptor.default_model
        );
    }
}
