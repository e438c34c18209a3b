//! Tests for the canonical protocol module

use medley_core::protocol::*;

#[test]
fn test_message_construction() {
    let sys_msg = Message::system("You are a helpful assistant");
    assert_eq!(sys_msg.role, MessageRole::System);
    assert_eq!(sys_msg.content, "You are a helpful assistant");

    let user_msg = Message::user("Hello!");
    assert_eq!(user_msg.role, MessageRole::User);
    assert_eq!(user_msg.content, "Hello!");

    let asst_msg = Message::assistant("Hi there! How can I help?");
    assert_eq!(asst_msg.role, MessageRole::Assistant);
    assert_eq!(asst_msg.content, "Hi there! How can I help?");
}

#[test]
fn test_chat_request_construction() {
    let messages = vec![Message::user("What is 2+2?")];

    let request = ChatRequest::new("gpt-4o", messages)
        .with_system("You are helpful")
        .with_max_output_tokens(1000)
        .with_streaming(true);

    assert_eq!(request.model, "gpt-4o");
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.system.as_deref(), Some("You are helpful"));
    assert_eq!(request.max_output_tokens, Some(1000));
    assert!(request.stream);
}

#[test]
fn test_roles_serialize_lowercase() {
    assert_eq!(
        serde_json::to_string(&MessageRole::System).unwrap(),
        "\"system\""
    );
    assert_eq!(
        serde_json::to_string(&MessageRole::Assistant).unwrap(),
        "\"assistant\""
    );
}

#[test]
fn test_request_serde_round_trip() {
    let request = ChatRequest::new(
        "claude-sonnet-4-20250514",
        vec![
            Message::system("Stay terse"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("go on"),
        ],
    )
    .with_max_output_tokens(256);

    let json = serde_json::to_string(&request).unwrap();
    let parsed: ChatRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, request);
}

#[test]
fn test_system_messages_may_appear_anywhere() {
    // The canonical model does not force alternation; adapters deal with
    // provider-specific role rules.
    let request = ChatRequest::new(
        "m",
        vec![
            Message::user("a"),
            Message::user("b"),
            Message::system("mid-stream instruction"),
            Message::assistant("c"),
        ],
    );
    assert_eq!(request.messages.len(), 4);
    assert_eq!(request.messages[2].role, MessageRole::System);
}
