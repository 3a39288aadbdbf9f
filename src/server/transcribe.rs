use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::error::ToolChatError;
use crate::server::error::ApiError;
use crate::server::AppState;

const TOOL: &str = "transcribe_audio";

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub success: bool,
    pub message: String,
    pub transcription: String,
}

/// Accept an upload in the `file` field and run it through `transcribe_audio`.
pub(crate) async fn transcribe(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("audio").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    tracing::info!(file = %file_name, bytes = bytes.len(), "received audio upload");

    let suffix = Path::new(&file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let temp = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut temp = tempfile::Builder::new()
            .prefix("toolchat-upload-")
            .suffix(&suffix)
            .tempfile()?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        Ok(temp)
    })
    .await
    .map_err(|e| failure(ToolChatError::Other(format!("Upload writer stopped: {}", e))))?
    .map_err(|e| failure(e.into()))?;

    let prepared = {
        let registry = state.registry.read().await;
        registry
            .prepare(TOOL, json!({ "path": temp.path().to_string_lossy() }))
            .map_err(failure)?
    };
    let result = prepared
        .run(&state.cancel.child_token())
        .await
        .map_err(failure)?;

    let transcription = result
        .get("transcription")
        .and_then(|t| t.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(Json(TranscribeResponse {
        success: true,
        message: format!("Transcribed {}", file_name),
        transcription,
    }))
}

fn failure(err: ToolChatError) -> ApiError {
    tracing::warn!(error = %err, "transcription failed");
    ApiError::new(
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        err.kind(),
        err.to_string(),
    )
}
