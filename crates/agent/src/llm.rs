//! Reasoning-engine seam.
//!
//! The runtime only sees [`LlmClient`]; [`MessagesApiClient`] is the HTTP
//! implementation for the Anthropic Messages API. Calls are never retried here:
//! a failed call ends the current turn.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use resolute_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::conversation::{partition, ContentBlock, Conversation, ToolRequest, Turn};
use crate::tools::ToolSpec;

const ANTHROPIC_API_VERSION: &str = "2023-06-01";

/// One reasoning-engine invocation: transcript, directive and tool declarations.
#[derive(Clone, Copy, Debug)]
pub struct ReasoningRequest<'a> {
    pub system: &'a str,
    pub conversation: &'a Conversation,
    pub tools: &'a [ToolSpec],
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReasoningResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl ReasoningResponse {
    pub fn from_blocks(content: Vec<ContentBlock>) -> Self {
        Self { content, stop_reason: None }
    }

    pub fn tool_requests(&self) -> Vec<ToolRequest> {
        partition(&self.content).0
    }

    pub fn first_text(&self) -> Option<&str> {
        partition(&self.content).1
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("reasoning engine API key is not configured")]
    MissingApiKey,
    #[error("reasoning engine transport failed: {0}")]
    Transport(String),
    #[error("reasoning engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("reasoning engine response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ReasoningRequest<'_>) -> Result<ReasoningResponse, LlmError>;
}

#[derive(Clone, Debug)]
pub struct MessagesApiClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl MessagesApiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn body<'a>(&'a self, request: &ReasoningRequest<'a>) -> MessagesBody<'a> {
        MessagesBody {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: request.system,
            messages: request.conversation.turns(),
            tools: request.tools,
        }
    }
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [Turn],
    tools: &'a [ToolSpec],
}

#[derive(Deserialize)]
struct MessagesReply {
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[async_trait]
impl LlmClient for MessagesApiClient {
    async fn complete(&self, request: &ReasoningRequest<'_>) -> Result<ReasoningResponse, LlmError> {
        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|error| LlmError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status: status.as_u16(), body });
        }

        let reply: MessagesReply =
            response.json().await.map_err(|error| LlmError::Decode(error.to_string()))?;
        debug!(
            event_name = "llm.response.raw",
            stop_reason = reply.stop_reason.as_deref().unwrap_or("none"),
            content = %serde_json::Value::Array(reply.content.clone()),
            "full reasoning engine response"
        );

        Ok(ReasoningResponse {
            content: decode_blocks(reply.content),
            stop_reason: reply.stop_reason,
        })
    }
}

/// Decodes the block kinds the loop understands. Anything else is kept as
/// [`ContentBlock::Opaque`] so the stored transcript stays faithful.
fn decode_blocks(raw: Vec<Value>) -> Vec<ContentBlock> {
    raw.into_iter()
        .map(|block| {
            let decoded = serde_json::from_value::<ContentBlock>(block.clone())
                .unwrap_or(ContentBlock::Opaque(block));
            if let ContentBlock::Opaque(opaque) = &decoded {
                debug!(
                    event_name = "llm.response.block_opaque",
                    block_type =
                        opaque.get("type").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
                    "keeping uninterpreted content block"
                );
            }
            decoded
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use resolute_core::config::LlmConfig;
    use secrecy::SecretString;
    use serde_json::json;

    use super::{decode_blocks, LlmError, MessagesApiClient, ReasoningRequest, ReasoningResponse};
    use crate::conversation::{ContentBlock, Conversation};
    use crate::tools::ToolRegistry;

    fn llm_config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(|key| SecretString::from(key.to_string())),
            base_url: "https://api.anthropic.com/".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }

    #[test]
    fn client_requires_api_key() {
        assert!(matches!(
            MessagesApiClient::from_config(&llm_config(None)),
            Err(LlmError::MissingApiKey)
        ));
        assert!(matches!(
            MessagesApiClient::from_config(&llm_config(Some("  "))),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[test]
    fn request_body_carries_directive_history_and_tools() {
        let client = MessagesApiClient::from_config(&llm_config(Some("sk-test"))).expect("client");
        let registry = ToolRegistry::standard().expect("registry");
        let tools = registry.specs();
        let mut conversation = Conversation::new();
        conversation.push_user_text("hello");

        let request =
            ReasoningRequest { system: "be helpful", conversation: &conversation, tools: &tools };
        let body = serde_json::to_value(client.body(&request)).expect("serialize body");

        assert_eq!(client.messages_url(), "https://api.anthropic.com/v1/messages");
        assert_eq!(body["model"], "claude-sonnet-4-5-20250929");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], "be helpful");
        assert_eq!(body["messages"], json!([{ "role": "user", "content": "hello" }]));
        assert_eq!(body["tools"].as_array().map(Vec::len), Some(5));
        assert!(body["tools"][0]["input_schema"]["properties"].is_object());
    }

    #[test]
    fn unknown_block_types_are_kept_verbatim() {
        let thinking = json!({ "type": "thinking", "thinking": "...", "signature": "sig" });
        let blocks = decode_blocks(vec![
            thinking.clone(),
            json!({ "type": "text", "text": "Hi" }),
            json!({ "type": "tool_use", "id": "t1", "name": "look_up_order", "input": {} }),
        ]);

        let response = ReasoningResponse::from_blocks(blocks);
        assert_eq!(response.content.len(), 3);
        assert_eq!(response.first_text(), Some("Hi"));
        assert_eq!(response.tool_requests().len(), 1);
        assert_eq!(response.content[0], ContentBlock::Opaque(thinking.clone()));
        assert_eq!(serde_json::to_value(&response.content[0]).expect("serialize"), thinking);
        assert!(matches!(response.content[1], ContentBlock::Text { .. }));
    }
}
