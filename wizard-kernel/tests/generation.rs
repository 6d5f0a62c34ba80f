mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    GEMINI_KEY, OPENAI_KEY, ScriptedTransport, chat_reply, gateway_with_key, gemini_reply,
    openai_gateway,
};
use wizard_adapters::{AdapterError, TransportResponse};
use wizard_config::SynthesisConfig;
use wizard_kernel::{
    Document, FieldMap, GenerationClient, GenerationError, ProviderGateway, RetryPolicy, assemble,
};
use wizard_prompts::builtin_steps;

const COOLDOWN: Duration = Duration::from_secs(180);

fn client(gateway: ProviderGateway) -> GenerationClient {
    GenerationClient::new(gateway, RetryPolicy::default(), SynthesisConfig::default(), COOLDOWN)
}

fn document() -> Document {
    let steps = builtin_steps().unwrap();
    assemble(&FieldMap::for_steps(&steps), &steps)
}

#[tokio::test(start_paused = true)]
async fn chat_completion_synthesis_and_cooldown() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(chat_reply("## Goal\nShop\n## Audience\nAdults"))
            .reply(chat_reply("second prompt")),
    );
    let client = client(openai_gateway(Arc::clone(&transport)));
    let document = document();

    let artifact = client.synthesize(&document, "openai").await.unwrap();
    assert_eq!(artifact.provider(), "openai");
    assert_eq!(artifact.document(), &document);
    assert_eq!(artifact.sections().len(), 2);

    let requests = transport.requests();
    let request = &requests[0];
    assert_eq!(request.url(), "https://api.openai.com/v1/chat/completions");
    assert_eq!(
        request.header("Authorization"),
        Some(format!("Bearer {OPENAI_KEY}").as_str())
    );
    let body = request.body();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 2048);
    assert_eq!(body["messages"][0]["role"], "user");
    let prompt = body["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.starts_with("Turn the following requirements into a structured, detailed prompt:"));
    assert!(prompt.contains("Project goal:\n"));

    let err = client.synthesize(&document, "openai").await.unwrap_err();
    let GenerationError::CoolingDown { remaining } = err else {
        panic!("expected cooldown, got {err:?}");
    };
    assert_eq!(remaining, COOLDOWN);
    assert_eq!(transport.calls(), 1);

    tokio::time::advance(COOLDOWN).await;
    let again = client.synthesize(&document, "openai").await.unwrap();
    assert_eq!(again.text(), "second prompt");
}

#[tokio::test]
async fn generate_content_wire_shape() {
    let transport = Arc::new(ScriptedTransport::new().reply(gemini_reply("Structured prompt")));
    let client = client(gateway_with_key(Arc::clone(&transport), "gemini", Some(GEMINI_KEY)));

    let artifact = client.synthesize(&document(), "gemini").await.unwrap();
    assert_eq!(artifact.text(), "Structured prompt");

    let requests = transport.requests();
    let request = &requests[0];
    assert!(request.url().ends_with(&format!(":generateContent?key={GEMINI_KEY}")));
    assert!(request.header("Authorization").is_none());
    let body = request.body();
    assert!(body["contents"][0]["parts"][0]["text"].is_string());
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_without_arming_cooldown() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(TransportResponse::new(502, "bad gateway"))
            .reply(TransportResponse::new(503, "unavailable"))
            .reply(TransportResponse::new(500, "boom")),
    );
    let client = client(openai_gateway(Arc::clone(&transport)));

    let err = client.synthesize(&document(), "openai").await.unwrap_err();
    assert!(matches!(err, GenerationError::Failed { attempts: 3, .. }));
    assert_eq!(transport.calls(), 3);
    assert!(client.cooldown_remaining().is_none());
}

#[tokio::test]
async fn permanent_failure_reports_a_single_attempt() {
    let transport = Arc::new(ScriptedTransport::new().fail(AdapterError::configuration("bad endpoint")));
    let client = client(openai_gateway(Arc::clone(&transport)));

    let err = client.synthesize(&document(), "openai").await.unwrap_err();
    assert!(matches!(err, GenerationError::Failed { attempts: 1, .. }));
    assert_eq!(transport.calls(), 1);
    assert!(err.to_string().starts_with("generation failed after 1 attempt(s)"));
}

#[tokio::test]
async fn missing_credential_is_reported_before_any_request() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client(gateway_with_key(Arc::clone(&transport), "openai", None));

    let err = client.synthesize(&document(), "openai").await.unwrap_err();
    assert!(matches!(err, GenerationError::CredentialRequired { ref provider } if provider == "openai"));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn stored_credential_unblocks_synthesis() {
    let transport = Arc::new(ScriptedTransport::new().reply(chat_reply("ok")));
    let gateway = gateway_with_key(Arc::clone(&transport), "openrouter", None);
    let client = client(gateway.clone());

    assert!(
        gateway
            .store_credential("openrouter", "sk-live-wrong-prefix".into())
            .await
            .is_err()
    );
    gateway
        .store_credential("openrouter", "  sk-or-abc123 ".into())
        .await
        .unwrap();

    client.synthesize(&document(), "openrouter").await.unwrap();
    let requests = transport.requests();
    let request = &requests[0];
    assert_eq!(request.header("Authorization"), Some("Bearer sk-or-abc123"));
    assert_eq!(request.header("X-Title"), Some("Prompt Wizard"));
    assert!(request.header("HTTP-Referer").is_some());
}

#[tokio::test]
async fn unknown_provider_is_an_error() {
    let client = client(openai_gateway(Arc::new(ScriptedTransport::new())));
    let err = client.synthesize(&document(), "mistral").await.unwrap_err();
    assert!(err.to_string().contains("unknown provider `mistral`"));
}
