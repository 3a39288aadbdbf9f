use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Message, ToolCall};

/// What the dispatch loop asks the round tripper to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// Tool advertisement; `None` leaves `tools` out of the body.
    pub tools: Option<Vec<Value>>,
}

/// Wire body for `POST /v1/chat/completions`.
#[derive(Serialize)]
pub struct RequestBody<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [Value]>,
    pub temperature: f32,
    pub stream: bool,
}

/// The assistant message of the first choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelReply {
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set when the reply arrived as an SSE stream and was already
    /// forwarded to the stream sink.
    #[serde(skip)]
    pub streamed: bool,
}

impl ModelReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.tool_calls.first()
    }

    pub fn content_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

#[derive(Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    pub reasoning: Option<String>,
    pub reasoning_content: Option<String>,
}

#[derive(Deserialize)]
pub struct StreamChoice {
    pub delta: Option<Delta>,
}

#[derive(Deserialize)]
pub struct StreamResponse {
    pub choices: Option<Vec<StreamChoice>>,
}
