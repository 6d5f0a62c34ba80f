#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;
use wizard_adapters::{
    AdapterError, AdapterResult, HttpTransport, ProviderRegistry, TransportRequest,
    TransportResponse,
};
use wizard_credentials::{CredentialResolver, MemoryCredentialStore, StaticOverrides};
use wizard_kernel::{ProviderGateway, RetryPolicy, SuggestionEngine, SuggestionSettings};
use wizard_primitives::{FieldId, Secret};

pub const OPENAI_KEY: &str = "sk-test-key";
pub const GEMINI_KEY: &str = "AIza-test-key";

/// Replays queued answers in order and records every request.
///
/// With a hold installed, each send waits for one `release` before answering.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<AdapterResult<TransportResponse>>>,
    requests: Mutex<Vec<TransportRequest>>,
    hold: Option<Arc<Notify>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held() -> (Self, Arc<Notify>) {
        let notify = Arc::new(Notify::new());
        let transport = Self {
            hold: Some(Arc::clone(&notify)),
            ..Self::default()
        };
        (transport, notify)
    }

    pub fn reply(self, response: TransportResponse) -> Self {
        self.replies.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn fail(self, error: AdapterError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> AdapterResult<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AdapterError::transport("script exhausted")))
    }
}

pub fn chat_reply(text: &str) -> TransportResponse {
    let body = json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] });
    TransportResponse::new(200, body.to_string())
}

pub fn gemini_reply(text: &str) -> TransportResponse {
    let body = json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] });
    TransportResponse::new(200, body.to_string())
}

pub fn gateway_with_key(
    transport: Arc<ScriptedTransport>,
    provider: &str,
    key: Option<&str>,
) -> ProviderGateway {
    let mut resolver = CredentialResolver::new(Arc::new(MemoryCredentialStore::new()));
    if let Some(key) = key {
        resolver = resolver.with_override(Arc::new(StaticOverrides::new().with(provider, Secret::new(key))));
    }
    ProviderGateway::new(ProviderRegistry::builtin(), resolver, transport, provider).unwrap()
}

pub fn openai_gateway(transport: Arc<ScriptedTransport>) -> ProviderGateway {
    gateway_with_key(transport, "openai", Some(OPENAI_KEY))
}

pub fn engine(gateway: ProviderGateway) -> SuggestionEngine {
    SuggestionEngine::new(gateway, RetryPolicy::default(), SuggestionSettings::default())
}

pub fn field(id: &str) -> FieldId {
    FieldId::new(id).unwrap()
}
