pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:1234/v1/chat/completions";

pub const DEFAULT_MODEL: &str = "qwen3-8b";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

pub fn default_tools_enabled() -> bool {
    true
}

pub fn default_tool_enabled() -> bool {
    true
}

pub fn default_max_hops() -> u32 {
    1
}

pub fn default_stream_timeout() -> u64 {
    30
}

pub fn default_transcription_binary() -> String {
    "whisper-cli".to_string()
}

pub fn default_transcription_model() -> String {
    "models/ggml-base.en.bin".to_string()
}

pub fn default_transcription_args() -> Vec<String> {
    ["-m", "{model}", "-f", "{input}", "-otxt", "-of", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_transcription_timeout() -> u64 {
    600
}

pub fn default_static_dir() -> String {
    "static".to_string()
}

pub fn default_tools_file() -> String {
    ".toolchat-tools.yaml".to_string()
}
