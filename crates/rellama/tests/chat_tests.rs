//! Integration tests for the interactive chat session state machine.
//!
//! The input loop itself reads stdin, so these tests drive the session
//! through its public turn and command methods against a wiremock backend.

use std::sync::Arc;

use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

use rellama::RellamaError;
use rellama::api::{OllamaClient, Role};
use rellama::chat::{InteractiveChatSession, SessionCommand};
use rellama::config::ConfigStore;

fn session_for(
    server: &MockServer,
    model: &str,
    redirects: &[(&str, &str)],
) -> (tempfile::TempDir, InteractiveChatSession) {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigStore::new(dir.path().join("config.json"));
    for (source, destination) in redirects {
        config.set_redirect(source, destination).unwrap();
    }

    let client = OllamaClient::new(format!("{}/api/", server.uri())).unwrap();
    let session = InteractiveChatSession::new(client, Arc::new(config), model);
    (dir, session)
}

fn chat_stream(deltas: &[&str]) -> String {
    let mut body = String::new();
    for delta in deltas {
        body.push_str(&format!(
            "{{\"message\":{{\"role\":\"assistant\",\"content\":\"{delta}\"}},\"done\":false}}\n"
        ));
    }
    body.push_str("{\"done\":true}\n");
    body
}

#[tokio::test]
async fn test_session_applies_redirect_at_construction() {
    let server = MockServer::start().await;
    let (_dir, session) = session_for(&server, "mymodel", &[("mymodel", "mymodel-v2")]);
    assert_eq!(session.model(), "mymodel-v2");
}

#[tokio::test]
async fn test_chat_turn_aggregates_streamed_deltas() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(chat_stream(&["Hel", "lo", "!"])),
        )
        .mount(&server)
        .await;

    let (_dir, mut session) = session_for(&server, "llama3", &[]);
    session.chat_turn("hi").await.unwrap();

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "hi");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, "Hello!");
}

#[tokio::test]
async fn test_clear_empties_history_and_next_turn_sends_only_new_message() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(chat_stream(&["ok"])),
        )
        .mount(&server)
        .await;

    let (_dir, mut session) = session_for(&server, "llama3", &[]);
    session.chat_turn("first").await.unwrap();
    assert_eq!(session.history().len(), 2);

    session.dispatch(SessionCommand::Clear).await.unwrap();
    assert!(session.history().is_empty());

    // The cleared history must not leak into the next request body.
    server.reset().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/chat"))
        .and(matchers::body_json(serde_json::json!({
            "model": "llama3",
            "messages": [{"role": "user", "content": "second"}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string(chat_stream(&["fresh"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    session.chat_turn("second").await.unwrap();
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[1].content, "fresh");
}

#[tokio::test]
async fn test_load_unknown_model_reports_error_and_keeps_model() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "llama3:latest"}]
        })))
        .mount(&server)
        .await;

    let (_dir, mut session) = session_for(&server, "llama3:latest", &[]);
    let err = session.load_model("mistral").await.unwrap_err();

    assert!(matches!(err, RellamaError::NotFound(_)));
    assert_eq!(session.model(), "llama3:latest");
}

#[tokio::test]
async fn test_load_prefix_match_switches_to_full_name() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "qwen2.5:7b"}, {"name": "llama3:latest"}]
        })))
        .mount(&server)
        .await;
    // Warm-up fires against the newly loaded model.
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .and(matchers::body_json(serde_json::json!({
            "model": "qwen2.5:7b",
            "prompt": ""
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string("{\"response\":\"\",\"done\":true}\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, mut session) = session_for(&server, "llama3:latest", &[]);
    session.load_model("qwen").await.unwrap();

    assert_eq!(session.model(), "qwen2.5:7b");
}

#[tokio::test]
async fn test_load_applies_redirect_to_resolved_name() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("GET"))
        .and(matchers::path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "qwen2.5:7b"}]
        })))
        .mount(&server)
        .await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-ndjson")
                .set_body_string("{\"response\":\"\",\"done\":true}\n"),
        )
        .mount(&server)
        .await;

    let (_dir, mut session) =
        session_for(&server, "llama3", &[("qwen2.5:7b", "qwen2.5:7b-tuned")]);
    session.load_model("qwen").await.unwrap();

    assert_eq!(session.model(), "qwen2.5:7b-tuned");
}
