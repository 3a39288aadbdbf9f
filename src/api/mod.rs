pub mod client;
pub mod models;
pub mod response;
pub mod streaming;

pub use client::{ChatClient, RoundTripper};
pub use models::{ChatRequest, ModelReply, RequestBody};
pub use streaming::{collect_streaming_reply, SseDecoder, SseEvent, StreamDelta, StreamSink};
