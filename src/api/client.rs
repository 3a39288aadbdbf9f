use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tokio::time::Duration;

use super::models::{ChatRequest, ModelReply, RequestBody};
use super::response::parse_reply;
use super::streaming::{collect_streaming_reply, StreamSink};
use crate::config::Config;
use crate::error::{Result, ToolChatError};

/// One request/response cycle with the inference endpoint.
#[async_trait]
pub trait RoundTripper: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ModelReply>;
}

/// HTTP round tripper for an OpenAI-compatible chat-completions endpoint.
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    stream: bool,
    stream_timeout: Duration,
    sink: Option<StreamSink>,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                    ToolChatError::ConfigError(format!("Invalid authorization header: {}", e))
                })?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            endpoint: config.api_endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            stream: config.stream,
            stream_timeout: Duration::from_secs(config.stream_timeout),
            sink: None,
        })
    }

    /// Forward streamed deltas to `sink` as they arrive.
    pub fn with_stream_sink(mut self, sink: StreamSink) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn without_streaming(mut self) -> Self {
        self.stream = false;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RoundTripper for ChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ModelReply> {
        // Tool-call arguments are not reliably streamed, so only tool-less
        // requests use SSE.
        let stream = self.stream && request.tools.is_none();

        let body = RequestBody {
            model: &self.model,
            messages: &request.messages,
            tools: request.tools.as_deref(),
            temperature: self.temperature,
            stream,
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, |t| t.len()),
            stream,
            "sending chat request"
        );

        let response = self.http.post(&self.endpoint).json(&body).send().await?;

        tracing::debug!(status = %response.status(), "chat response received");

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ToolChatError::ApiError { status, message });
        }

        if stream {
            return collect_streaming_reply(response, self.stream_timeout, self.sink.as_ref()).await;
        }

        let response_text = response.text().await?;
        tracing::trace!(body = %response_text, "raw chat response");
        let response_json: Value = serde_json::from_str(&response_text)?;
        parse_reply(&response_json)
    }
}
