use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Whole-request deadline for one round trip, in seconds.
    #[serde(default)]
    pub request_timeout: Option<u64>,
    /// Idle timeout between streamed chunks, in seconds.
    #[serde(default)]
    pub stream_timeout: Option<u64>,
    #[serde(default)]
    pub stream: Option<bool>,
}
