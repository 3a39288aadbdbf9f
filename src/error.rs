use std::fmt;

#[derive(Debug)]
pub enum ToolChatError {
    UnknownTool(String),
    DuplicateTool(String),
    InvalidArguments {
        tool: String,
        message: String,
    },
    ExecutorFailure {
        tool: String,
        message: String,
    },
    ApiError {
        status: u16,
        message: String,
    },
    NetworkError(reqwest::Error),
    ExternalProcess(String),
    Timeout,
    Cancelled,
    ConfigError(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    YamlError(serde_yaml::Error),
    Other(String),
}

impl ToolChatError {
    /// Stable snake-case label, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolChatError::UnknownTool(_) => "unknown_tool",
            ToolChatError::DuplicateTool(_) => "duplicate_tool",
            ToolChatError::InvalidArguments { .. } => "invalid_arguments",
            ToolChatError::ExecutorFailure { .. } => "executor_failure",
            ToolChatError::ApiError { .. } | ToolChatError::NetworkError(_) => "network_error",
            ToolChatError::ExternalProcess(_) => "external_process_error",
            ToolChatError::Timeout => "timeout",
            ToolChatError::Cancelled => "cancelled",
            ToolChatError::ConfigError(_) => "config_error",
            ToolChatError::IoError(_) => "io_error",
            ToolChatError::JsonError(_) => "json_error",
            ToolChatError::YamlError(_) => "yaml_error",
            ToolChatError::Other(_) => "other",
        }
    }
}

impl fmt::Display for ToolChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolChatError::UnknownTool(name) => write!(f, "Tool '{}' not found", name),
            ToolChatError::DuplicateTool(name) => {
                write!(f, "Tool '{}' is already registered", name)
            }
            ToolChatError::InvalidArguments { tool, message } => {
                write!(f, "Invalid arguments for tool '{}': {}", tool, message)
            }
            ToolChatError::ExecutorFailure { tool, message } => {
                write!(f, "Tool '{}' failed: {}", tool, message)
            }
            ToolChatError::ApiError { status, message } => {
                write!(f, "API error (status {}): {}", status, message)
            }
            ToolChatError::NetworkError(e) => write!(f, "Network error: {}", e),
            ToolChatError::ExternalProcess(msg) => write!(f, "External process error: {}", msg),
            ToolChatError::Timeout => write!(f, "Request timeout"),
            ToolChatError::Cancelled => write!(f, "Request cancelled"),
            ToolChatError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            ToolChatError::IoError(e) => write!(f, "IO error: {}", e),
            ToolChatError::JsonError(e) => write!(f, "JSON error: {}", e),
            ToolChatError::YamlError(e) => write!(f, "YAML error: {}", e),
            ToolChatError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ToolChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ToolChatError::NetworkError(e) => Some(e),
            ToolChatError::IoError(e) => Some(e),
            ToolChatError::JsonError(e) => Some(e),
            ToolChatError::YamlError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ToolChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ToolChatError::Timeout
        } else {
            ToolChatError::NetworkError(err)
        }
    }
}

impl From<std::io::Error> for ToolChatError {
    fn from(err: std::io::Error) -> Self {
        ToolChatError::IoError(err)
    }
}

impl From<serde_json::Error> for ToolChatError {
    fn from(err: serde_json::Error) -> Self {
        ToolChatError::JsonError(err)
    }
}

impl From<serde_yaml::Error> for ToolChatError {
    fn from(err: serde_yaml::Error) -> Self {
        ToolChatError::YamlError(err)
    }
}

impl From<anyhow::Error> for ToolChatError {
    fn from(err: anyhow::Error) -> Self {
        ToolChatError::ConfigError(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, ToolChatError>;
