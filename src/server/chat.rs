use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::dispatch::{Exchange, ExchangeOutcome, ToolRun};
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::ui::{present, RenderedReply};

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InputRequired {
    pub tool: String,
    pub call_id: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<RenderedReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_required: Option<InputRequired>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub tool_runs: Vec<ToolRun>,
    pub round_trips: u32,
}

/// Exchange failures are reported in the body with status 200 so the page
/// can show them as a chat message and carry on.
pub(crate) async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = body.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let report = Exchange::new(state.client.as_ref(), &state.registry, &state.settings)
        .with_cancellation(state.cancel.child_token())
        .run(message)
        .await;

    let mut response = ChatResponse {
        success: true,
        reply: None,
        input_required: None,
        error: None,
        kind: None,
        tool_runs: report.tool_runs,
        round_trips: report.round_trips,
    };

    match report.outcome {
        ExchangeOutcome::Done(reply) => response.reply = Some(present(&reply)),
        ExchangeOutcome::InputRequired(call) => {
            response.input_required = Some(InputRequired {
                tool: call.tool_name,
                call_id: call.id,
                arguments: call.arguments,
            })
        }
        ExchangeOutcome::Failed(error) => {
            response.success = false;
            response.kind = Some(error.kind().to_string());
            response.error = Some(error.to_string());
        }
    }

    Ok(Json(response))
}
