//! The executors compiled into this binary, and the construction of a
//! registry from configuration.
//!
//! New tools are never built from source text. A tool declared in
//! configuration (or through the server's admin endpoint) gets its own name,
//! description and schema but always runs one of the catalog executors.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;

use super::builtins::{handle_add_numbers, handle_multiply_numbers, handle_transcribe_audio};
use super::registry::{
    executor, StagedTool, ToolDescriptor, ToolExecutor, ToolRegistry, ToolSettings,
};
use crate::config::{ToolEntryConfig, ToolsConfig};
use crate::error::{Result, ToolChatError};

pub struct CatalogEntry {
    pub descriptor: ToolDescriptor,
    pub executor: ToolExecutor,
}

/// Catalog tools in advertisement order.
pub fn catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            descriptor: ToolDescriptor {
                name: "add_numbers".to_string(),
                description: "Add two numbers together. Use this when the user wants to perform addition.".to_string(),
                parameters: two_numbers_schema("add"),
                requires_interactive_input: false,
            },
            executor: executor(handle_add_numbers),
        },
        CatalogEntry {
            descriptor: ToolDescriptor {
                name: "multiply_numbers".to_string(),
                description: "Multiply two numbers together. Use this when the user wants to perform multiplication.".to_string(),
                parameters: two_numbers_schema("multiply"),
                requires_interactive_input: false,
            },
            executor: executor(handle_multiply_numbers),
        },
        CatalogEntry {
            descriptor: ToolDescriptor {
                name: "transcribe_audio".to_string(),
                description: "Transcribe an audio file to timestamped text. Use this when the user wants to transcribe a recording; the user will be asked to provide the file.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path to the audio file to transcribe"
                        }
                    },
                    "required": ["path"],
                    "additionalProperties": false
                }),
                requires_interactive_input: true,
            },
            executor: executor(handle_transcribe_audio),
        },
    ]
}

pub fn catalog_executor(name: &str) -> Option<ToolExecutor> {
    catalog()
        .into_iter()
        .find(|entry| entry.descriptor.name == name)
        .map(|entry| entry.executor)
}

/// Build a registry: enabled catalog tools first, then declared tools.
/// Declarations that cannot be bound are logged and skipped.
pub fn build_registry(config: &ToolsConfig, settings: ToolSettings) -> ToolRegistry {
    let mut registry = ToolRegistry::new(config.on_duplicate, settings);

    let is_enabled = |name: &str| -> bool {
        config
            .tools
            .iter()
            .find(|t| t.name == name && !t.is_declaration())
            .map(|t| t.enabled)
            .unwrap_or(true)
    };

    for entry in catalog() {
        if !is_enabled(&entry.descriptor.name) {
            tracing::debug!(tool = %entry.descriptor.name, "catalog tool disabled by config");
            continue;
        }
        let name = entry.descriptor.name.clone();
        if let Err(e) = registry.register(entry.descriptor, entry.executor) {
            tracing::warn!(tool = %name, error = %e, "failed to register catalog tool");
        }
    }

    for declaration in config.tools.iter().filter(|t| t.is_declaration() && t.enabled) {
        if let Err(e) = declare_tool(&mut registry, declaration) {
            tracing::warn!(tool = %declaration.name, error = %e, "skipping declared tool");
        }
    }

    registry
}

/// Register a declared tool bound to a catalog executor.
pub fn declare_tool(registry: &mut ToolRegistry, declaration: &ToolEntryConfig) -> Result<()> {
    let staged = stage_declaration(registry, declaration)?;
    registry.commit(staged);
    Ok(())
}

/// Check a declaration against `registry` without registering it.
pub fn stage_declaration(
    registry: &ToolRegistry,
    declaration: &ToolEntryConfig,
) -> Result<StagedTool> {
    let descriptor = descriptor_from_declaration(declaration)?;
    let executor_name = declaration
        .executor
        .as_deref()
        .unwrap_or(declaration.name.as_str());
    let executor = catalog_executor(executor_name).ok_or_else(|| {
        ToolChatError::ConfigError(format!(
            "Tool '{}' refers to unknown executor '{}'",
            declaration.name, executor_name
        ))
    })?;

    registry.stage(descriptor, executor)
}

fn descriptor_from_declaration(declaration: &ToolEntryConfig) -> Result<ToolDescriptor> {
    let missing = |field: &str| {
        ToolChatError::ConfigError(format!(
            "Tool '{}' is missing '{}' field",
            declaration.name, field
        ))
    };

    if declaration.name.trim().is_empty() {
        return Err(ToolChatError::ConfigError("Tool name must not be empty".to_string()));
    }

    Ok(ToolDescriptor {
        name: declaration.name.clone(),
        description: declaration
            .description
            .clone()
            .ok_or_else(|| missing("description"))?,
        parameters: declaration
            .parameters
            .clone()
            .ok_or_else(|| missing("parameters"))?,
        requires_interactive_input: declaration.requires_interactive_input.unwrap_or(false),
    })
}

/// On-disk list of tools declared at runtime.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolDeclarations {
    #[serde(default)]
    pub tools: Vec<ToolEntryConfig>,
}

pub fn load_declarations(path: &Path) -> Result<Vec<ToolEntryConfig>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)?;
    let declarations: ToolDeclarations = serde_yaml::from_str(&contents)?;
    Ok(declarations.tools)
}

/// Append (or replace by name) a declaration in the file at `path`.
pub async fn persist_declaration(path: &Path, declaration: &ToolEntryConfig) -> Result<()> {
    let mut tools = match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_yaml::from_str::<ToolDeclarations>(&contents)?.tools,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    match tools.iter_mut().find(|t| t.name == declaration.name) {
        Some(existing) => *existing = declaration.clone(),
        None => tools.push(declaration.clone()),
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let contents = serde_yaml::to_string(&ToolDeclarations { tools })?;
    tokio::fs::write(path, contents).await?;
    Ok(())
}

fn two_numbers_schema(verb: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "num1": {
                "type": "number",
                "description": format!("First number to {}", verb)
            },
            "num2": {
                "type": "number",
                "description": format!("Second number to {}", verb)
            }
        },
        "required": ["num1", "num2"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::DuplicatePolicy;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn declaration(name: &str, executor: &str) -> ToolEntryConfig {
        ToolEntryConfig {
            name: name.to_string(),
            enabled: true,
            executor: Some(executor.to_string()),
            description: Some(format!("{} via {}", name, executor)),
            parameters: Some(two_numbers_schema("sum")),
            requires_interactive_input: None,
        }
    }

    #[test]
    fn test_default_registry_has_catalog_in_order() {
        let registry = build_registry(&ToolsConfig::default(), ToolSettings::default());
        let names: Vec<&str> = registry.list_tools().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["add_numbers", "multiply_numbers", "transcribe_audio"]);
        assert!(registry.get("transcribe_audio").unwrap().requires_interactive_input);
    }

    #[test]
    fn test_config_disables_catalog_tool() {
        let mut config = ToolsConfig::default();
        config.tools.push(ToolEntryConfig {
            name: "multiply_numbers".to_string(),
            enabled: false,
            executor: None,
            description: None,
            parameters: None,
            requires_interactive_input: None,
        });
        let registry = build_registry(&config, ToolSettings::default());
        assert!(!registry.contains("multiply_numbers"));
        assert!(registry.contains("add_numbers"));
    }

    #[tokio::test]
    async fn test_declared_tool_runs_catalog_executor() {
        let mut config = ToolsConfig::default();
        config.tools.push(declaration("sum", "add_numbers"));
        let registry = build_registry(&config, ToolSettings::default());

        assert_eq!(registry.list_tools().last().unwrap().name, "sum");
        let value = registry
            .invoke("sum", json!({"num1": 4, "num2": 5}), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(value, json!({"result": 9}));
    }

    #[test]
    fn test_declaration_with_unknown_executor_is_skipped() {
        let mut config = ToolsConfig::default();
        config.tools.push(declaration("eval", "javascript"));
        let registry = build_registry(&config, ToolSettings::default());
        assert!(!registry.contains("eval"));
        assert_eq!(registry.list_tools().len(), 3);
    }

    #[test]
    fn test_declaring_catalog_name_twice_is_rejected_by_default() {
        let mut registry = build_registry(&ToolsConfig::default(), ToolSettings::default());
        assert_eq!(registry.list_tools().len(), 3);
        let err = declare_tool(&mut registry, &declaration("add_numbers", "add_numbers")).unwrap_err();
        assert_eq!(err.kind(), "duplicate_tool");

        let mut shadowing = ToolRegistry::new(DuplicatePolicy::Shadow, ToolSettings::default());
        declare_tool(&mut shadowing, &declaration("sum", "add_numbers")).unwrap();
        declare_tool(&mut shadowing, &declaration("sum", "multiply_numbers")).unwrap();
        assert_eq!(shadowing.list_tools().len(), 1);
        assert_eq!(shadowing.list_tools()[0].description, "sum via multiply_numbers");
    }

    #[tokio::test]
    async fn test_persist_declaration_appends_and_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tools.yaml");

        persist_declaration(&path, &declaration("sum", "add_numbers")).await.unwrap();
        persist_declaration(&path, &declaration("product", "multiply_numbers")).await.unwrap();
        persist_declaration(&path, &declaration("sum", "multiply_numbers")).await.unwrap();

        let tools = load_declarations(&path).unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "sum");
        assert_eq!(tools[0].executor.as_deref(), Some("multiply_numbers"));
    }

    #[tokio::test]
    async fn test_persist_declaration_fails_when_parent_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let err = persist_declaration(&blocker.join("tools.yaml"), &declaration("sum", "add_numbers"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "io_error");
    }

    #[test]
    fn test_stage_declaration_does_not_register() {
        let registry = build_registry(&ToolsConfig::default(), ToolSettings::default());
        stage_declaration(&registry, &declaration("sum", "add_numbers")).unwrap();
        assert!(!registry.contains("sum"));

        let err = stage_declaration(&registry, &declaration("sum", "eval")).err().unwrap();
        assert_eq!(err.kind(), "config_error");
    }
}
