//! Groq chat-completion client.
//!
//! Sends the prompt as a single user message and turns whatever comes back into either a
//! [`ProfileSummary`], a quota notice, or a [`CompletionError`]. No retries are made.

use crate::config::GroqConfig;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const TEMPERATURE: f64 = 0.6;
pub const MAX_TOKENS: u32 = 1024;

lazy_static! {
    static ref QUOTA_WORDS: Regex =
        Regex::new(r"\b(quota|credit|limit|exceeded|expired|rate)\b").unwrap();
    static ref OPENING_FENCE: Regex = Regex::new(r"^\s*```(?:json)?\s*\n?").unwrap();
    static ref CLOSING_FENCE: Regex = Regex::new(r"\n?\s*```\s*$").unwrap();
}

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    #[error("request to completion API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion API returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("completion API returned no message content")]
    EmptyReply,
}

/// How a non-200 upstream answer should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Rate limiting, expired credit and similar account-level exhaustion
    QuotaLike,
    Other,
}

/// Classify a failed completion call from its status code and error message.
pub fn classify_failure(status: u16, message: &str) -> FailureClass {
    if status == 429 || status == 403 || QUOTA_WORDS.is_match(&message.to_lowercase()) {
        FailureClass::QuotaLike
    } else {
        FailureClass::Other
    }
}

/// The two paragraphs returned to the simulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub moral_summary: String,
    pub laws_explanation: String,
}

/// A completion call that reached the API and got an answer worth forwarding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Summary(ProfileSummary),
    QuotaExhausted,
}

/// Remove a leading ```` ```json ```` / ```` ``` ```` fence and a trailing ```` ``` ````
pub fn strip_code_fence(text: &str) -> String {
    let without_opening = OPENING_FENCE.replace(text, "");
    CLOSING_FENCE.replace(&without_opening, "").into_owned()
}

/// Interpret the model's reply text. Never fails: anything that is not a JSON object
/// becomes the moral summary verbatim.
pub fn parse_reply(content: &str) -> ProfileSummary {
    let stripped = strip_code_fence(content);
    match serde_json::from_str::<Value>(stripped.trim()) {
        Ok(Value::Object(fields)) => ProfileSummary {
            moral_summary: field_text(fields.get("moralSummary")),
            laws_explanation: field_text(fields.get("lawsExplanation")),
        },
        _ => ProfileSummary {
            moral_summary: stripped,
            laws_explanation: String::new(),
        },
    }
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatReply>,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the chat-completions endpoint
#[derive(Clone)]
pub struct CompletionClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl CompletionClient {
    pub fn new(config: &GroqConfig, api_key: &str) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CompletionError::ClientBuild)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` and interpret the answer
    pub async fn complete(&self, prompt: &str) -> Result<CompletionOutcome, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_default();
            return match classify_failure(status.as_u16(), &message) {
                FailureClass::QuotaLike => Ok(CompletionOutcome::QuotaExhausted),
                FailureClass::Other => Err(CompletionError::Upstream {
                    status: status.as_u16(),
                    message,
                }),
            };
        }

        let content = serde_json::from_str::<ChatResponse>(&body)
            .ok()
            .and_then(|reply| reply.choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(CompletionError::EmptyReply);
        }

        Ok(CompletionOutcome::Summary(parse_reply(&content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> CompletionClient {
        let config = GroqConfig {
            api_url: format!("{}/openai/v1/chat/completions", server.url()),
            timeout_secs: 5,
            ..GroqConfig::default()
        };
        CompletionClient::new(&config, "gsk_test").unwrap()
    }

    fn chat_body(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
        .to_string()
    }

    #[test]
    fn classifies_quota_like_failures() {
        assert_eq!(classify_failure(429, ""), FailureClass::QuotaLike);
        assert_eq!(classify_failure(403, "forbidden"), FailureClass::QuotaLike);
        assert_eq!(
            classify_failure(400, "Rate limit reached for model"),
            FailureClass::QuotaLike
        );
        assert_eq!(
            classify_failure(401, "Your credit has EXPIRED"),
            FailureClass::QuotaLike
        );
        assert_eq!(
            classify_failure(500, "internal server error"),
            FailureClass::Other
        );
        // Whole words only
        assert_eq!(
            classify_failure(500, "failed to generate response"),
            FailureClass::Other
        );
        assert_eq!(classify_failure(503, "unlimited"), FailureClass::Other);
    }

    #[test]
    fn parses_fenced_json() {
        let reply = parse_reply("```json\n{\"moralSummary\":\"a\",\"lawsExplanation\":\"b\"}\n```");
        assert_eq!(
            reply,
            ProfileSummary {
                moral_summary: "a".into(),
                laws_explanation: "b".into()
            }
        );

        let reply = parse_reply("  ```\n{\"moralSummary\":\"x\"}\n```  ");
        assert_eq!(reply.moral_summary, "x");
        assert_eq!(reply.laws_explanation, "");
    }

    #[test]
    fn plain_text_falls_back_to_moral_summary() {
        let reply = parse_reply("Hello there.");
        assert_eq!(
            reply,
            ProfileSummary {
                moral_summary: "Hello there.".into(),
                laws_explanation: String::new()
            }
        );
    }

    #[test]
    fn non_object_json_falls_back() {
        assert_eq!(parse_reply("[1, 2]").moral_summary, "[1, 2]");
        assert_eq!(parse_reply("\"just a string\"").moral_summary, "\"just a string\"");
    }

    #[test]
    fn extra_fields_are_dropped_and_odd_types_stringified() {
        let reply = parse_reply(r#"{"moralSummary": "m", "lawsExplanation": 3, "score": 9}"#);
        assert_eq!(reply.moral_summary, "m");
        assert_eq!(reply.laws_explanation, "3");
    }

    #[tokio::test]
    async fn sends_chat_request_and_parses_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/v1/chat/completions")
            .match_header("authorization", "Bearer gsk_test")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama-3.1-70b-versatile",
                "messages": [{ "role": "user", "content": "the prompt" }],
                "temperature": 0.6,
                "max_tokens": 1024
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body(
                "{\"moralSummary\":\"You trust institutions.\",\"lawsExplanation\":\"PIDA protects you.\"}",
            ))
            .create_async()
            .await;

        let outcome = client_for(&server).complete("the prompt").await.unwrap();
        assert_eq!(
            outcome,
            CompletionOutcome::Summary(ProfileSummary {
                moral_summary: "You trust institutions.".into(),
                laws_explanation: "PIDA protects you.".into()
            })
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_is_quota_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(429)
            .with_body(r#"{"error": {"message": "rate limit exceeded"}}"#)
            .create_async()
            .await;

        let outcome = client_for(&server).complete("p").await.unwrap();
        assert_eq!(outcome, CompletionOutcome::QuotaExhausted);
    }

    #[tokio::test]
    async fn quota_message_on_other_status_is_quota_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(400)
            .with_body(r#"{"error": {"message": "Organization quota exhausted"}}"#)
            .create_async()
            .await;

        let outcome = client_for(&server).complete("p").await.unwrap();
        assert_eq!(outcome, CompletionOutcome::QuotaExhausted);
    }

    #[tokio::test]
    async fn server_error_is_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(500)
            .with_body(r#"{"error": {"message": "something broke"}}"#)
            .expect(1)
            .create_async()
            .await;

        let result = client_for(&server).complete("p").await;
        assert!(matches!(
            result,
            Err(CompletionError::Upstream { status: 500, .. })
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_content_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/openai/v1/chat/completions")
            .with_status(200)
            .with_body(chat_body(""))
            .create_async()
            .await;

        let result = client_for(&server).complete("p").await;
        assert!(matches!(result, Err(CompletionError::EmptyReply)));
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let config = GroqConfig {
            api_url: "http://127.0.0.1:1/openai/v1/chat/completions".to_string(),
            timeout_secs: 2,
            ..GroqConfig::default()
        };
        let client = CompletionClient::new(&config, "gsk_test").unwrap();
        let result = client.complete("p").await;
        assert!(matches!(result, Err(CompletionError::Transport(_))));
    }

    #[test]
    fn debug_redacts_key() {
        let client = CompletionClient::new(&GroqConfig::default(), "gsk_secret").unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
