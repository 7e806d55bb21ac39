//! Provider clients against mocked HTTP endpoints, and router fallback

mod common;

use common::mocks::RecordingSink;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use strata::llm::{
    GeminiClient, LLMClient, OpenAiCompatClient, ProviderErrorKind, ProviderName, ProviderRouter,
    RoutedProvider,
};
use strata::types::{AppError, ProviderStatus};
use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn groq(base_url: &str) -> OpenAiCompatClient {
    OpenAiCompatClient::new(
        reqwest::Client::new(),
        ProviderName::Groq,
        base_url,
        "test-key".to_string(),
        "llama-3.1-8b-instant",
        0.3,
        1024,
    )
}

fn gemini(base_url: &str) -> GeminiClient {
    GeminiClient::new(
        reqwest::Client::new(),
        base_url,
        "gem-key".to_string(),
        "gemini-2.0-flash",
        0.3,
        1024,
    )
}

fn chat_reply(text: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
}

// ============= OpenAI-compatible =============

#[tokio::test]
async fn openai_compat_sends_system_and_user_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(bearer_token("test-key"))
        .and(body_partial_json(json!({
            "model": "llama-3.1-8b-instant",
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let text = groq(&server.uri()).generate("be brief", "hello").await.unwrap();
    assert_eq!(text, "hi there");
}

#[tokio::test]
async fn openai_compat_classifies_rate_limit_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/limited/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/denied/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let limited = groq(&format!("{}/limited", server.uri()))
        .generate("", "x")
        .await
        .unwrap_err();
    assert_eq!(limited.kind, ProviderErrorKind::RateLimit);
    assert!(limited.message.contains("429"));
    assert!(limited.message.contains("slow down"));

    let denied = groq(&format!("{}/denied/", server.uri()))
        .generate("", "x")
        .await
        .unwrap_err();
    assert_eq!(denied.kind, ProviderErrorKind::Auth);
    assert_eq!(denied.provider, ProviderName::Groq);
}

#[tokio::test]
async fn openai_compat_empty_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = groq(&server.uri()).generate("", "x").await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Malformed);
}

// ============= Gemini =============

#[tokio::test]
async fn gemini_passes_key_and_system_instruction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "gem-key"))
        .and(body_partial_json(json!({
            "systemInstruction": {"parts": [{"text": "be brief"}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("bonjour")))
        .expect(1)
        .mount(&server)
        .await;

    let client = gemini(&server.uri());
    assert_eq!(client.model_name(), "gemini-2.0-flash");
    let text = client.generate("be brief", "hello").await.unwrap();
    assert_eq!(text, "bonjour");
}

#[tokio::test]
async fn gemini_without_candidates_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = gemini(&server.uri()).generate("", "x").await.unwrap_err();
    assert_eq!(err.kind, ProviderErrorKind::Malformed);
    assert_eq!(err.provider, ProviderName::Gemini);
}

// ============= Router =============

#[tokio::test]
async fn router_falls_back_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("draft")))
        .expect(1)
        .mount(&server)
        .await;

    let router = ProviderRouter::new(vec![
        RoutedProvider::new(Arc::new(groq(&server.uri())), Duration::from_secs(5)),
        RoutedProvider::new(Arc::new(gemini(&server.uri())), Duration::from_secs(5)),
    ])
    .unwrap();
    let sink = RecordingSink::new();

    let routed = router.generate("sys", "prompt", &sink).await.unwrap();

    assert_eq!(routed.value, "draft");
    assert_eq!(routed.provider, ProviderName::Gemini);
    assert_eq!(routed.provider_used, "gemini:gemini-2.0-flash");
    assert_eq!(routed.failures.len(), 1);
    assert_eq!(routed.failures[0].kind, ProviderErrorKind::RateLimit);
    assert_eq!(
        sink.provider_events(),
        vec![
            (ProviderName::Groq, ProviderStatus::Executing),
            (ProviderName::Groq, ProviderStatus::Failed),
            (ProviderName::Gemini, ProviderStatus::Executing),
            (ProviderName::Gemini, ProviderStatus::Completed),
        ]
    );
}

#[tokio::test]
async fn router_times_out_a_slow_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slow/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_reply("late"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fast/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("on time")))
        .mount(&server)
        .await;

    let fast = OpenAiCompatClient::new(
        reqwest::Client::new(),
        ProviderName::OpenRouter,
        &format!("{}/fast", server.uri()),
        "k".into(),
        "free-model",
        0.3,
        256,
    );
    let router = ProviderRouter::new(vec![
        RoutedProvider::new(
            Arc::new(groq(&format!("{}/slow", server.uri()))),
            Duration::from_millis(200),
        ),
        RoutedProvider::new(Arc::new(fast), Duration::from_secs(5)),
    ])
    .unwrap();

    let routed = router
        .generate("", "x", &RecordingSink::new())
        .await
        .unwrap();

    assert_eq!(routed.value, "on time");
    assert_eq!(routed.provider, ProviderName::OpenRouter);
    assert_eq!(routed.failures[0].kind, ProviderErrorKind::Timeout);
}

#[tokio::test]
async fn router_treats_unparseable_output_as_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("not json")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("{\"n\": 4}")))
        .mount(&server)
        .await;

    let router = ProviderRouter::new(vec![
        RoutedProvider::new(Arc::new(groq(&server.uri())), Duration::from_secs(5)),
        RoutedProvider::new(Arc::new(gemini(&server.uri())), Duration::from_secs(5)),
    ])
    .unwrap();

    let routed = router
        .generate_with("", "x", &RecordingSink::new(), |text| {
            serde_json::from_str::<serde_json::Value>(text).map_err(|e| e.to_string())
        })
        .await
        .unwrap();

    assert_eq!(routed.value["n"], 4);
    assert_eq!(routed.failures[0].kind, ProviderErrorKind::Malformed);
}

#[tokio::test]
async fn router_reports_exhaustion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let router = ProviderRouter::new(vec![
        RoutedProvider::new(Arc::new(groq(&server.uri())), Duration::from_secs(5)),
        RoutedProvider::new(Arc::new(gemini(&server.uri())), Duration::from_secs(5)),
    ])
    .unwrap();
    let sink = RecordingSink::new();

    let err = router.generate("", "x", &sink).await.unwrap_err();

    assert!(matches!(err, AppError::ProvidersExhausted(_)));
    let last: Vec<_> = sink
        .provider_events()
        .into_iter()
        .filter(|(_, s)| *s == ProviderStatus::Failed)
        .map(|(p, _)| p)
        .collect();
    assert_eq!(last, vec![ProviderName::Groq, ProviderName::Gemini]);
}

#[test]
fn empty_router_is_a_configuration_error() {
    assert!(matches!(
        ProviderRouter::new(Vec::new()),
        Err(AppError::Configuration(_))
    ));
}
