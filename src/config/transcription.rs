use serde::{Deserialize, Serialize};

use crate::config::defaults::{
    default_transcription_args, default_transcription_binary, default_transcription_model,
    default_transcription_timeout,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_binary")]
    pub binary: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    /// Argument template; `{model}`, `{input}` and `{output}` are substituted.
    #[serde(default = "default_transcription_args")]
    pub args: Vec<String>,
    /// Where transcript files are written. Defaults to the system temp dir.
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            binary: default_transcription_binary(),
            model: default_transcription_model(),
            args: default_transcription_args(),
            output_dir: None,
            timeout_secs: default_transcription_timeout(),
        }
    }
}
