//! Transcript model shared with the reasoning engine.
//!
//! Turns serialize to the Messages API wire shape directly, so the transcript
//! the engine sees is exactly what the session holds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
    /// Block kinds the loop does not interpret (`thinking`, ...), kept verbatim
    /// so the transcript resubmits them unchanged.
    #[serde(untagged)]
    Opaque(Value),
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse { id: id.into(), name: name.into(), input }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: MessageContent,
}

/// A tool invocation proposed by the reasoning engine.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// The answer to one [`ToolRequest`]; `content` is the JSON text of the payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: String,
}

impl ToolResult {
    pub fn new(tool_use_id: impl Into<String>, payload: &Value) -> Self {
        Self { tool_use_id: tool_use_id.into(), content: payload.to_string() }
    }

    pub fn payload(&self) -> Option<Value> {
        serde_json::from_str(&self.content).ok()
    }
}

impl From<ToolResult> for ContentBlock {
    fn from(result: ToolResult) -> Self {
        Self::ToolResult { tool_use_id: result.tool_use_id, content: result.content }
    }
}

/// Splits a response into its tool requests (in response order) and the first text block.
pub fn partition(blocks: &[ContentBlock]) -> (Vec<ToolRequest>, Option<&str>) {
    let requests = blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => {
                Some(ToolRequest { id: id.clone(), name: name.clone(), input: input.clone() })
            }
            _ => None,
        })
        .collect();
    let first_text = blocks.iter().find_map(ContentBlock::as_text);
    (requests, first_text)
}

/// Append-only transcript of one session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user_text(&mut self, text: impl Into<String>) {
        self.turns.push(Turn { role: Role::User, content: MessageContent::Text(text.into()) });
    }

    pub fn push_assistant_blocks(&mut self, blocks: Vec<ContentBlock>) {
        self.turns.push(Turn { role: Role::Assistant, content: MessageContent::Blocks(blocks) });
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.turns.push(Turn { role: Role::Assistant, content: MessageContent::Text(text.into()) });
    }

    /// All results of one dispatch round travel back as a single user turn.
    pub fn push_tool_results(&mut self, results: Vec<ToolResult>) {
        let blocks = results.into_iter().map(ContentBlock::from).collect();
        self.turns.push(Turn { role: Role::User, content: MessageContent::Blocks(blocks) });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Every tool result recorded so far, oldest first.
    pub fn tool_results(&self) -> impl Iterator<Item = (&str, &str)> {
        self.turns.iter().flat_map(|turn| match &turn.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolResult { tool_use_id, content } => {
                        Some((tool_use_id.as_str(), content.as_str()))
                    }
                    _ => None,
                })
                .collect::<Vec<_>>(),
            MessageContent::Text(_) => Vec::new(),
        })
    }

    /// Names of every tool the engine requested, oldest first.
    pub fn requested_tools(&self) -> Vec<&str> {
        self.turns
            .iter()
            .filter(|turn| turn.role == Role::Assistant)
            .flat_map(|turn| match &turn.content {
                MessageContent::Blocks(blocks) => blocks
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolUse { name, .. } => Some(name.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>(),
                MessageContent::Text(_) => Vec::new(),
            })
            .collect()
    }
}
