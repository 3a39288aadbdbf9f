use serde::{Deserialize, Serialize};

use crate::config::defaults::{default_static_dir, default_tools_file};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// YAML file holding tools declared through the admin endpoint.
    #[serde(default = "default_tools_file")]
    pub tools_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: None,
            static_dir: default_static_dir(),
            tools_file: default_tools_file(),
        }
    }
}
