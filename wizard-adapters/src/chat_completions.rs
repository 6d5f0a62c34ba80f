//! Chat-completions codec, spoken by `OpenAI` and `OpenRouter`.
//!
//! Request: `{model, messages, temperature, max_tokens}` with a bearer key.
//! Reply: `.choices[0].message.content`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wizard_primitives::Secret;

use crate::completion::{AdapterInfo, CompletionAdapter, CompletionRequest, Speaker, Turn};
use crate::error::{AdapterError, AdapterResult};
use crate::transport::{HttpTransport, TransportRequest, validate_endpoint};

/// `OpenAI` chat-completions URL.
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// `OpenRouter` chat-completions URL.
pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Adapter for any chat-completions compatible endpoint.
pub struct ChatCompletionsAdapter {
    info: AdapterInfo,
    endpoint: String,
    api_key: Secret,
    headers: Vec<(String, String)>,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for ChatCompletionsAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsAdapter")
            .field("info", &self.info)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsAdapter {
    /// Binds `api_key` to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when the key is blank or the
    /// endpoint is not an absolute http(s) URL.
    pub fn new(
        info: AdapterInfo,
        endpoint: &str,
        api_key: Secret,
        transport: Arc<dyn HttpTransport>,
    ) -> AdapterResult<Self> {
        if api_key.is_blank() {
            return Err(AdapterError::configuration(format!(
                "{} needs a non-empty API key",
                info.provider()
            )));
        }
        Ok(Self {
            endpoint: validate_endpoint(endpoint)?,
            info,
            api_key,
            headers: Vec::new(),
            transport,
        })
    }

    /// Sends `name: value` with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn encode(&self, request: &CompletionRequest) -> ChatBody<'_> {
        let system = request.system().map(|text| ChatMessage {
            role: Speaker::System.as_str(),
            content: text.to_owned(),
        });
        let messages = system
            .into_iter()
            .chain(request.turns().iter().map(ChatMessage::from))
            .collect();

        ChatBody {
            model: self.info.model(),
            messages,
            temperature: request.temperature(),
            max_tokens: request.max_tokens(),
        }
    }
}

#[async_trait]
impl CompletionAdapter for ChatCompletionsAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn complete(&self, request: CompletionRequest) -> AdapterResult<String> {
        let body = serde_json::to_value(self.encode(&request))
            .map_err(|err| AdapterError::invalid_request(err.to_string()))?;

        let outgoing = self.headers.iter().fold(
            TransportRequest::post_json(&self.endpoint, body)
                .with_header("Authorization", format!("Bearer {}", self.api_key.expose())),
            |outgoing, (name, value)| outgoing.with_header(name, value),
        );

        let response = self.transport.send(outgoing).await?.error_for_status()?;
        let text = first_choice(response.body())?;
        debug!(provider = self.info.provider(), chars = text.len(), "chat completion decoded");
        Ok(text)
    }
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.speaker().as_str(),
            content: turn.text().to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

fn first_choice(bytes: &[u8]) -> AdapterResult<String> {
    let reply: ChatReply = serde_json::from_slice(bytes)
        .map_err(|err| AdapterError::response(format!("chat reply is not valid JSON: {err}")))?;

    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message?.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| AdapterError::response("chat reply has no choices[0].message.content"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::transport::TransportResponse;

    #[derive(Default)]
    struct OneShot {
        sent: Mutex<Vec<TransportRequest>>,
        reply: Mutex<Option<TransportResponse>>,
    }

    impl OneShot {
        fn replying(status: u16, body: &'static str) -> Arc<Self> {
            let transport = Self::default();
            *transport.reply.lock().unwrap() = Some(TransportResponse::new(status, body));
            Arc::new(transport)
        }
    }

    #[async_trait]
    impl HttpTransport for OneShot {
        async fn send(&self, request: TransportRequest) -> AdapterResult<TransportResponse> {
            self.sent.lock().unwrap().push(request);
            self.reply
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| AdapterError::transport("no reply scripted"))
        }
    }

    fn adapter(transport: Arc<OneShot>) -> ChatCompletionsAdapter {
        ChatCompletionsAdapter::new(
            AdapterInfo::new("openrouter", "openai/gpt-4o-mini"),
            OPENROUTER_ENDPOINT,
            Secret::new("sk-or-test"),
            transport,
        )
        .unwrap()
        .with_header("X-Title", "Prompt Wizard")
    }

    #[test]
    fn blank_key_or_bad_endpoint_is_rejected() {
        let transport: Arc<dyn HttpTransport> = Arc::new(OneShot::default());
        let info = AdapterInfo::new("openai", "gpt-4o-mini");

        let blank = ChatCompletionsAdapter::new(
            info.clone(),
            OPENAI_ENDPOINT,
            Secret::new("  "),
            Arc::clone(&transport),
        );
        assert!(matches!(blank, Err(AdapterError::Configuration { .. })));

        let relative =
            ChatCompletionsAdapter::new(info, "/v1/chat/completions", Secret::new("sk-x"), transport);
        assert!(matches!(relative, Err(AdapterError::Configuration { .. })));
    }

    #[test]
    fn system_text_leads_the_message_list() {
        let adapter = adapter(Arc::new(OneShot::default()));
        let request = CompletionRequest::from_prompt("hello")
            .with_system("be brief")
            .with_temperature(0.9)
            .with_max_tokens(1024);

        let value = serde_json::to_value(adapter.encode(&request)).unwrap();
        assert_eq!(value["model"], "openai/gpt-4o-mini");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1], serde_json::json!({"role": "user", "content": "hello"}));
        assert_eq!(value["max_tokens"], 1024);
        assert!(value["temperature"].is_number());
    }

    #[test]
    fn reply_without_content_is_a_response_error() {
        assert_eq!(first_choice(br#"{"choices":[{"message":{"content":"hi"}}]}"#).unwrap(), "hi");

        let unusable: [&[u8]; 3] = [
            br#"{"choices":[]}"#,
            br#"{"choices":[{"message":{"content":"  "}}]}"#,
            b"<html>",
        ];
        for body in unusable {
            assert!(matches!(first_choice(body), Err(AdapterError::Response { .. })));
        }
    }

    #[tokio::test]
    async fn bearer_key_and_extra_headers_are_sent() {
        let transport = OneShot::replying(200, r#"{"choices":[{"message":{"content":"1. One"}}]}"#);
        let adapter = adapter(Arc::clone(&transport));

        let text = adapter.complete(CompletionRequest::from_prompt("ping")).await.unwrap();
        assert_eq!(text, "1. One");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].url(), OPENROUTER_ENDPOINT);
        assert_eq!(sent[0].header("Authorization"), Some("Bearer sk-or-test"));
        assert_eq!(sent[0].header("X-Title"), Some("Prompt Wizard"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_status_error() {
        let transport = OneShot::replying(401, "bad key");
        let err = adapter(transport)
            .complete(CompletionRequest::from_prompt("ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Status { status: 401, .. }));
    }
}
