use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::ToolEntryConfig;
use crate::server::error::ApiError;
use crate::server::AppState;
use crate::tools::catalog::{catalog_executor, persist_declaration, stage_declaration};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Deserialize)]
pub struct AddToolBody {
    #[serde(rename = "toolDefinition")]
    pub tool_definition: Option<ToolDefinition>,
    pub executor: Option<String>,
    #[serde(default, rename = "executorFunction")]
    pub executor_function: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AddToolResponse {
    pub success: bool,
    pub message: String,
    pub tool: ToolDefinition,
}

pub(crate) async fn list_tools(State(state): State<Arc<AppState>>) -> Json<Vec<Value>> {
    Json(state.registry.read().await.format_tools_for_llm())
}

pub(crate) async fn add_tool(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddToolBody>,
) -> Result<Json<AddToolResponse>, ApiError> {
    if body.executor_function.is_some() {
        return Err(ApiError::bad_request(
            "executorFunction is not supported; set 'executor' to one of the built-in executors",
        ));
    }
    let definition = body
        .tool_definition
        .ok_or_else(|| ApiError::bad_request("toolDefinition is required"))?;
    if definition.tool_type != "function" {
        return Err(ApiError::bad_request("Invalid tool definition format"));
    }
    let executor = body
        .executor
        .ok_or_else(|| ApiError::bad_request("executor is required"))?;
    if catalog_executor(&executor).is_none() {
        return Err(ApiError::bad_request(format!("Unknown executor '{}'", executor)));
    }

    let declaration = ToolEntryConfig {
        name: definition.function.name.clone(),
        enabled: true,
        executor: Some(executor),
        description: Some(definition.function.description.clone()),
        parameters: Some(definition.function.parameters.clone()),
        requires_interactive_input: None,
    };

    // Register only after the write succeeds; the lock spans both steps.
    let mut registry = state.registry.write().await;
    let staged = stage_declaration(&registry, &declaration)?;
    if let Err(e) = persist_declaration(&state.tools_file, &declaration).await {
        tracing::error!(tool = %declaration.name, error = %e, "could not persist tool");
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            e.kind(),
            format!("Failed to add tool: {}", e),
        ));
    }
    registry.commit(staged);
    drop(registry);

    tracing::info!(tool = %declaration.name, "tool declared");

    Ok(Json(AddToolResponse {
        success: true,
        message: "Tool added successfully".to_string(),
        tool: definition,
    }))
}
