//! Provider adapters against mocked upstream APIs

use std::time::Duration;

use serde_json::json;
use social_leaf::clients::{
    ElevenLabsClient, GeminiClient, GenerationRequest, HuggingFaceClient, OpenAiCompatClient,
    ProviderError, ProviderSettings, RetryPolicy, TextProvider,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEMINI_PATH: &str = "/models/gemini-1.5-flash:generateContent";

fn settings(server: &MockServer, model: &str) -> ProviderSettings {
    ProviderSettings::new(server.uri(), "test-key", model)
        .with_timeout(Duration::from_secs(5))
        .with_retry(RetryPolicy::new(3, 1))
}

fn prompt(text: &str) -> GenerationRequest {
    GenerationRequest {
        prompt: text.to_string(),
        ..Default::default()
    }
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
}

#[tokio::test]
async fn gemini_retries_after_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("hello")))
        .mount(&server)
        .await;

    let client = GeminiClient::new(settings(&server, "gemini-1.5-flash")).unwrap();
    let text = client.generate(&prompt("hi")).await.unwrap();
    assert_eq!(text, "hello");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn persistent_rate_limit_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = GeminiClient::new(settings(&server, "gemini-1.5-flash")).unwrap();
    let err = client.generate(&prompt("hi")).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited { attempts: 3 }));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(settings(&server, "gemini-1.5-flash")).unwrap();
    let err = client.generate(&prompt("hi")).await.unwrap_err();
    assert!(matches!(err, ProviderError::Http { status: 401, .. }));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn blocked_prompt_reads_as_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"promptFeedback": {"blockReason": "SAFETY"}})),
        )
        .mount(&server)
        .await;

    let client = GeminiClient::new(settings(&server, "gemini-1.5-flash")).unwrap();
    assert_eq!(client.generate(&prompt("hi")).await.unwrap(), "");
}

#[tokio::test]
async fn missing_key_is_not_configured() {
    let server = MockServer::start().await;
    let settings = ProviderSettings::new(server.uri(), "  ", "gemini-1.5-flash");
    assert!(matches!(
        GeminiClient::new(settings),
        Err(ProviderError::NotConfigured(_))
    ));
}

#[tokio::test]
async fn openai_reads_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  {\"answer\": \"ok\"} "}}]
        })))
        .mount(&server)
        .await;

    let client = OpenAiCompatClient::openai(settings(&server, "gpt-3.5-turbo")).unwrap();
    assert_eq!(client.generate(&prompt("q")).await.unwrap(), "{\"answer\": \"ok\"}");
}

#[tokio::test]
async fn huggingface_accepts_list_and_object_envelopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/list-model"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"generated_text": "from list"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/object-model"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"generated_text": "from object"})),
        )
        .mount(&server)
        .await;

    let list = HuggingFaceClient::new(settings(&server, "list-model")).unwrap();
    let object = HuggingFaceClient::new(settings(&server, "object-model")).unwrap();
    assert_eq!(list.generate(&prompt("x")).await.unwrap(), "from list");
    assert_eq!(object.generate(&prompt("x")).await.unwrap(), "from object");
}

#[tokio::test]
async fn elevenlabs_returns_audio_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text-to-speech/voice-1"))
        .and(header("xi-api-key", "test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(vec![0xFF, 0xFB, 0x90]),
        )
        .mount(&server)
        .await;

    let client = ElevenLabsClient::new(settings(&server, "eleven_multilingual_v2")).unwrap();
    let audio = client.synthesize("hello", "voice-1").await.unwrap();
    assert_eq!(audio, vec![0xFF, 0xFB, 0x90]);
}
