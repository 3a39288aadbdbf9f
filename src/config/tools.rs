use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::defaults::{default_max_hops, default_tool_enabled, default_tools_enabled};
use crate::tools::DuplicatePolicy;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_tools_enabled")]
    pub enabled: bool,
    /// Upper bound on tool calls serviced in one exchange.
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
    #[serde(default)]
    pub tools: Vec<ToolEntryConfig>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tools_enabled(),
            max_hops: default_max_hops(),
            on_duplicate: DuplicatePolicy::default(),
            tools: Vec::new(),
        }
    }
}

/// A tool entry in configuration.
///
/// With only `name` (and optionally `enabled`) it toggles a catalog tool.
/// With `executor` set it declares a new tool bound to a catalog executor,
/// in which case `description` and `parameters` are required.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ToolEntryConfig {
    pub name: String,
    #[serde(default = "default_tool_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_interactive_input: Option<bool>,
}

impl ToolEntryConfig {
    pub fn is_declaration(&self) -> bool {
        self.executor.is_some()
    }
}
