mod api;
pub mod defaults;
mod server;
mod tools;
mod transcription;
mod validation;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use api::ApiConfig;
pub use server::ServerConfig;
pub use tools::{ToolEntryConfig, ToolsConfig};
pub use transcription::TranscriptionConfig;
pub use validation::{expand_env_var_in_string, normalize_endpoint};

use defaults::{default_stream_timeout, DEFAULT_API_ENDPOINT, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub verbose: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Values supplied on the command line. They take precedence over the
/// environment and the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub max_hops: Option<u32>,
    pub no_tools: bool,
    pub no_stream: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: Option<String>,
    pub request_timeout: Option<u64>,
    pub stream_timeout: u64,
    pub stream: bool,
    pub verbose: bool,
    pub tools_enabled: bool,
    pub max_hops: u32,
    pub tools: ToolsConfig,
    pub transcription: TranscriptionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct JsonConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    pub fn from_env_and_overrides(overrides: &ConfigOverrides) -> Result<Self> {
        let json_config = match &overrides.config_path {
            Some(path) => JsonConfig::load_file(path)?,
            None => JsonConfig::load()?,
        };
        Ok(Self::resolve(overrides, json_config, |key| env::var(key).ok()))
    }

    /// Merge CLI overrides > environment > config file > defaults.
    pub fn resolve<F>(overrides: &ConfigOverrides, json_config: JsonConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_truthy = |v: String| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes");

        let api_endpoint = overrides
            .api_endpoint
            .clone()
            .or_else(|| env("TOOLCHAT_API_ENDPOINT"))
            .or(json_config.api.endpoint.clone())
            .map(|endpoint| normalize_endpoint(&endpoint))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());

        let api_key = env("TOOLCHAT_API_KEY").filter(|k| !k.is_empty());

        let model = overrides
            .model
            .clone()
            .or_else(|| env("TOOLCHAT_MODEL"))
            .or(json_config.model.default_model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let system_prompt = env("TOOLCHAT_SYSTEM_PROMPT").or(json_config.model.system_prompt.clone());

        let temperature = json_config.api.temperature.unwrap_or(DEFAULT_TEMPERATURE);

        let request_timeout = env("TOOLCHAT_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .or(json_config.api.request_timeout)
            .filter(|secs| *secs > 0);

        let stream_timeout = env("TOOLCHAT_STREAM_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .or(json_config.api.stream_timeout)
            .unwrap_or_else(default_stream_timeout);

        let stream = !overrides.no_stream && json_config.api.stream.unwrap_or(true);

        let verbose = overrides.verbose
            || env("TOOLCHAT_VERBOSE")
                .map(is_truthy)
                .or(json_config.output.verbose)
                .unwrap_or(false);

        // --no-tools wins over everything else
        let tools_enabled = if overrides.no_tools {
            false
        } else {
            match env("TOOLCHAT_TOOLS_ENABLED") {
                Some(v) => is_truthy(v),
                None => json_config.tools.enabled,
            }
        };

        let max_hops = overrides
            .max_hops
            .or_else(|| env("TOOLCHAT_MAX_HOPS").and_then(|s| s.parse::<u32>().ok()))
            .unwrap_or(json_config.tools.max_hops)
            .max(1);

        let mut transcription = json_config.transcription;
        transcription.binary = expand_env_var_in_string(&transcription.binary);
        transcription.model = expand_env_var_in_string(&transcription.model);
        transcription.output_dir = transcription
            .output_dir
            .map(|dir| expand_env_var_in_string(&dir));

        Config {
            api_key,
            api_endpoint,
            model,
            temperature,
            system_prompt,
            request_timeout,
            stream_timeout,
            stream,
            verbose,
            tools_enabled,
            max_hops,
            tools: json_config.tools,
            transcription,
            server: json_config.server,
        }
    }
}

impl JsonConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_file(&path);
            }
        }

        Ok(JsonConfig::default())
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("yaml") | Some("yml")
        );

        let config = if is_yaml {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?
        } else {
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))?
        };

        Ok(config)
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(".toolchat.yaml"),
            PathBuf::from(".toolchat.yml"),
            PathBuf::from(".toolchat.json"),
        ];

        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("toolchat");
            paths.push(config_dir.join("toolchat.yaml"));
            paths.push(config_dir.join("toolchat.yml"));
            paths.push(config_dir.join("toolchat.json"));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::DuplicatePolicy;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_any_source() {
        let config = Config::resolve(&ConfigOverrides::default(), JsonConfig::default(), no_env);
        assert_eq!(config.api_endpoint, DEFAULT_API_ENDPOINT);
        assert_eq!(config.model, "qwen3-8b");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_hops, 1);
        assert!(config.tools_enabled);
        assert!(config.stream);
        assert!(config.request_timeout.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let mut json_config = JsonConfig::default();
        json_config.model.default_model = Some("file-model".to_string());
        json_config.api.endpoint = Some("http://file:1/v1".to_string());
        json_config.tools.max_hops = 4;

        let env: HashMap<&str, &str> = [
            ("TOOLCHAT_MODEL", "env-model"),
            ("TOOLCHAT_API_ENDPOINT", "http://env:2"),
            ("TOOLCHAT_MAX_HOPS", "2"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let overrides = ConfigOverrides {
            model: Some("cli-model".to_string()),
            ..Default::default()
        };
        let config = Config::resolve(&overrides, json_config, lookup);

        assert_eq!(config.model, "cli-model");
        assert_eq!(config.api_endpoint, "http://env:2/v1/chat/completions");
        assert_eq!(config.max_hops, 2);
    }

    #[test]
    fn test_no_tools_and_zero_hops_clamp() {
        let overrides = ConfigOverrides {
            no_tools: true,
            max_hops: Some(0),
            ..Default::default()
        };
        let config = Config::resolve(&overrides, JsonConfig::default(), |key| {
            (key == "TOOLCHAT_TOOLS_ENABLED").then(|| "true".to_string())
        });
        assert!(!config.tools_enabled);
        assert_eq!(config.max_hops, 1);
    }

    #[test]
    fn test_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("toolchat.yaml");
        fs::write(
            &path,
            r#"
api:
  endpoint: http://127.0.0.1:8080/v1
  request_timeout: 45
model:
  default_model: llama
tools:
  max_hops: 3
  on_duplicate: shadow
  tools:
    - name: multiply_numbers
      enabled: false
    - name: sum
      executor: add_numbers
      description: Sum two values
      parameters:
        type: object
transcription:
  binary: /usr/local/bin/whisper-cli
"#,
        )
        .unwrap();

        let json_config = JsonConfig::load_file(&path).unwrap();
        assert_eq!(json_config.tools.on_duplicate, DuplicatePolicy::Shadow);
        assert_eq!(json_config.tools.tools.len(), 2);
        assert!(!json_config.tools.tools[0].enabled);
        assert!(json_config.tools.tools[1].is_declaration());
        assert_eq!(json_config.transcription.binary, "/usr/local/bin/whisper-cli");
        assert_eq!(json_config.transcription.args[0], "-m");

        let config = Config::resolve(&ConfigOverrides::default(), json_config, no_env);
        assert_eq!(config.api_endpoint, "http://127.0.0.1:8080/v1/chat/completions");
        assert_eq!(config.request_timeout, Some(45));
        assert_eq!(config.model, "llama");
        assert_eq!(config.max_hops, 3);
    }

    #[test]
    fn test_load_file_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("toolchat.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonConfig::load_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse JSON config file"));
    }
}
