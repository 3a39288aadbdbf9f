use futures::StreamExt;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

use super::models::{ModelReply, StreamResponse};
use crate::error::{Result, ToolChatError};

/// One increment of a streamed reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDelta {
    pub content: Option<String>,
    pub reasoning: Option<String>,
}

pub type StreamSink = Arc<dyn Fn(&StreamDelta) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    Delta(StreamDelta),
    Done,
}

/// Incremental decoder for a chat-completions SSE body.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across chunks decode correctly.
#[derive(Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = Self::parse_line(line.trim_end_matches(['\r', '\n'])) {
                events.push(event);
            }
        }

        events
    }

    /// Decode whatever is left once the body ends without a final newline.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Self::parse_line(line.trim_end()).into_iter().collect()
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        if line.is_empty() || line.starts_with(':') {
            return None;
        }

        let (field, value) = line.split_once(':')?;
        let value = value.trim_start();

        match field.trim() {
            "data" => {
                if value == "[DONE]" {
                    return Some(SseEvent::Done);
                }
                match serde_json::from_str::<StreamResponse>(value) {
                    Ok(parsed) => {
                        let mut delta = StreamDelta::default();
                        for choice in parsed.choices.unwrap_or_default() {
                            if let Some(d) = choice.delta {
                                append(&mut delta.content, d.content);
                                append(&mut delta.reasoning, d.reasoning.or(d.reasoning_content));
                            }
                        }
                        if delta.content.is_none() && delta.reasoning.is_none() {
                            None
                        } else {
                            Some(SseEvent::Delta(delta))
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "skipping unparseable SSE data");
                        None
                    }
                }
            }
            other => {
                tracing::trace!(field = other, value, "ignoring SSE field");
                None
            }
        }
    }
}

fn append(target: &mut Option<String>, piece: Option<String>) {
    if let Some(piece) = piece.filter(|p| !p.is_empty()) {
        target.get_or_insert_with(String::new).push_str(&piece);
    }
}

/// Drain an SSE response into a full reply, forwarding each delta to
/// `sink`. `idle_timeout` bounds the wait for every chunk.
pub async fn collect_streaming_reply(
    response: reqwest::Response,
    idle_timeout: Duration,
    sink: Option<&StreamSink>,
) -> Result<ModelReply> {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut content = String::new();
    let mut reasoning = String::new();

    let mut handle = |events: Vec<SseEvent>| -> bool {
        for event in events {
            match event {
                SseEvent::Done => return true,
                SseEvent::Delta(delta) => {
                    if let Some(sink) = sink {
                        sink(&delta);
                    }
                    if let Some(piece) = &delta.reasoning {
                        reasoning.push_str(piece);
                    }
                    if let Some(piece) = &delta.content {
                        content.push_str(piece);
                    }
                }
            }
        }
        false
    };

    loop {
        match timeout(idle_timeout, stream.next()).await {
            Ok(Some(chunk)) => {
                let chunk = chunk?;
                if handle(decoder.feed(&chunk)) {
                    break;
                }
            }
            Ok(None) => {
                handle(decoder.finish());
                break;
            }
            Err(_) => {
                tracing::warn!(
                    idle_secs = idle_timeout.as_secs(),
                    "no streamed data received before the idle timeout"
                );
                return Err(ToolChatError::Timeout);
            }
        }
    }

    Ok(ModelReply {
        content: Some(content),
        reasoning: (!reasoning.is_empty()).then_some(reasoning),
        tool_calls: Vec::new(),
        streamed: true,
    })
}
