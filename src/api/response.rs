use serde_json::Value;

use super::models::ModelReply;
use crate::error::{Result, ToolChatError};
use crate::models::ToolCall;

fn first_message(response_json: &Value) -> Result<&Value> {
    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| ToolChatError::Other("No choices in response".to_string()))?;

    let first_choice = choices
        .first()
        .ok_or_else(|| ToolChatError::Other("Empty choices array".to_string()))?;

    first_choice
        .get("message")
        .ok_or_else(|| ToolChatError::Other("No message in response".to_string()))
}

/// Parse a non-streaming API response and extract tool calls if present
pub fn parse_tool_calls(response_json: &Value) -> Result<Option<Vec<Value>>> {
    let message = first_message(response_json)?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(|tc| tc.as_array()) {
        if !tool_calls.is_empty() {
            return Ok(Some(tool_calls.clone()));
        }
    }

    Ok(None)
}

/// Extract content from a non-streaming response
pub fn extract_content(response_json: &Value) -> Result<Option<String>> {
    let message = first_message(response_json)?;
    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string()))
}

/// Extract reasoning content from a non-streaming response
pub fn extract_reasoning(response_json: &Value) -> Result<Option<String>> {
    let message = first_message(response_json)?;
    Ok(message
        .get("reasoning_content")
        .or_else(|| message.get("reasoning"))
        .and_then(|r| r.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string()))
}

/// Decode the first choice into a [`ModelReply`]. Tool calls that do not
/// match the wire shape are dropped with a warning.
pub fn parse_reply(response_json: &Value) -> Result<ModelReply> {
    let tool_calls = parse_tool_calls(response_json)?
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<ToolCall>(raw.clone()) {
            Ok(call) => Some(call),
            Err(e) => {
                tracing::warn!(tool_call = %raw, error = %e, "ignoring malformed tool call");
                None
            }
        })
        .collect();

    Ok(ModelReply {
        content: extract_content(response_json)?,
        reasoning: extract_reasoning(response_json)?,
        tool_calls,
        streamed: false,
    })
}
