//! Generate-content codec used by Google Gemini.
//!
//! The key travels as a `?key=` query parameter rather than a header, and the
//! v1 endpoint has no system slot, so system text is folded into the first
//! user part.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wizard_primitives::Secret;

use crate::completion::{AdapterInfo, CompletionAdapter, CompletionRequest, Speaker, Turn};
use crate::error::{AdapterError, AdapterResult};
use crate::transport::{HttpTransport, TransportRequest, validate_endpoint};

/// Gemini Pro generate-content URL.
pub const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-pro:generateContent";

/// Adapter for the generate-content wire format.
pub struct GenerateContentAdapter {
    info: AdapterInfo,
    endpoint: String,
    api_key: Secret,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for GenerateContentAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateContentAdapter")
            .field("info", &self.info)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GenerateContentAdapter {
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
            transport,
        })
    }

    fn encode(request: &CompletionRequest) -> AdapterResult<GenerateBody> {
        let preamble: Vec<&str> = request
            .system()
            .into_iter()
            .chain(
                request
                    .turns()
                    .iter()
                    .filter(|turn| turn.speaker() == Speaker::System)
                    .map(Turn::text),
            )
            .collect();

        let mut contents: Vec<Content> = request
            .turns()
            .iter()
            .filter(|turn| turn.speaker() != Speaker::System)
            .map(Content::from)
            .collect();
        let first = contents
            .first_mut()
            .and_then(|content| content.parts.first_mut())
            .ok_or_else(|| AdapterError::invalid_request("generate-content needs a user turn"))?;
        if !preamble.is_empty() {
            first.text = format!("{}\n\n{}", preamble.join("\n\n"), first.text);
        }

        let generation_config = (request.temperature().is_some() || request.max_tokens().is_some())
            .then(|| GenerationConfig {
                temperature: request.temperature(),
                max_output_tokens: request.max_tokens(),
            });

        Ok(GenerateBody {
            contents,
            generation_config,
        })
    }
}

#[async_trait]
impl CompletionAdapter for GenerateContentAdapter {
    fn info(&self) -> &AdapterInfo {
        &self.info
    }

    async fn complete(&self, request: CompletionRequest) -> AdapterResult<String> {
        let body = serde_json::to_value(Self::encode(&request)?)
            .map_err(|err| AdapterError::invalid_request(err.to_string()))?;
        let url = format!("{}?key={}", self.endpoint, self.api_key.expose());

        let response = self
            .transport
            .send(TransportRequest::post_json(url, body))
            .await?
            .error_for_status()?;
        let text = first_candidate(response.body())?;
        debug!(provider = self.info.provider(), chars = text.len(), "candidate decoded");
        Ok(text)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

// User turns go unlabelled; earlier model output is "model".
impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Self {
            role: (turn.speaker() == Speaker::Assistant).then(|| "model".to_owned()),
            parts: vec![Part {
                text: turn.text().to_owned(),
            }],
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn first_candidate(bytes: &[u8]) -> AdapterResult<String> {
    let reply: GenerateReply = serde_json::from_slice(bytes).map_err(|err| {
        AdapterError::response(format!("generate-content reply is not valid JSON: {err}"))
    })?;

    reply
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content?.parts.into_iter().next())
        .map(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            AdapterError::response("generate-content reply has no candidates[0].content.parts[0].text")
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::transport::TransportResponse;

    struct Fixed {
        sent: Mutex<Vec<TransportRequest>>,
        reply: TransportResponse,
    }

    #[async_trait]
    impl HttpTransport for Fixed {
        async fn send(&self, request: TransportRequest) -> AdapterResult<TransportResponse> {
            self.sent.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn adapter(reply: &'static str) -> (GenerateContentAdapter, Arc<Fixed>) {
        let transport = Arc::new(Fixed {
            sent: Mutex::new(Vec::new()),
            reply: TransportResponse::new(200, reply),
        });
        let adapter = GenerateContentAdapter::new(
            AdapterInfo::new("gemini", "gemini-pro"),
            GEMINI_ENDPOINT,
            Secret::new("AIzaTest"),
            Arc::clone(&transport) as Arc<dyn HttpTransport>,
        )
        .unwrap();
        (adapter, transport)
    }

    #[test]
    fn system_text_is_folded_into_the_first_part() {
        let request = CompletionRequest::from_prompt("hello")
            .with_system("You are helpful")
            .with_temperature(0.9)
            .with_max_tokens(1024);

        let value = serde_json::to_value(GenerateContentAdapter::encode(&request).unwrap()).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "You are helpful\n\nhello");
        assert!(value["contents"][0].get("role").is_none());
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 1024);
        assert!(value["generationConfig"]["temperature"].is_number());
    }

    #[test]
    fn settings_block_is_omitted_when_unset() {
        let request = CompletionRequest::from_prompt("hello");
        let value = serde_json::to_value(GenerateContentAdapter::encode(&request).unwrap()).unwrap();
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn assistant_turns_use_model_role() {
        let content = Content::from(&Turn::new(Speaker::Assistant, "earlier"));
        assert_eq!(content.role.as_deref(), Some("model"));
        assert_eq!(content.parts[0].text, "earlier");
    }

    #[test]
    fn system_only_conversation_is_rejected() {
        let request = CompletionRequest::new(vec![Turn::new(Speaker::System, "rules")]).unwrap();
        let err = GenerateContentAdapter::encode(&request).err().unwrap();
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn reply_without_text_is_a_response_error() {
        let text =
            first_candidate(br#"{"candidates":[{"content":{"parts":[{"text":"prompt"}]}}]}"#).unwrap();
        assert_eq!(text, "prompt");

        let err = first_candidate(br#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, AdapterError::Response { .. }));
    }

    #[tokio::test]
    async fn key_travels_as_query_parameter() {
        let (adapter, transport) =
            adapter(r#"{"candidates":[{"content":{"parts":[{"text":"done"}]}}]}"#);

        let text = adapter.complete(CompletionRequest::from_prompt("go")).await.unwrap();
        assert_eq!(text, "done");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].url(), format!("{GEMINI_ENDPOINT}?key=AIzaTest"));
        assert!(sent[0].header("Authorization").is_none());
    }
}
