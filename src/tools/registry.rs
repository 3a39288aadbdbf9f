use futures::future::{BoxFuture, FutureExt};
use jsonschema::{Draft, JSONSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ToolChatError};
use crate::transcription::Transcriber;

/// What the model is told about a tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema (draft 7) for the argument object.
    pub parameters: Value,
    #[serde(default)]
    pub requires_interactive_input: bool,
}

impl ToolDescriptor {
    /// The `{"type": "function", ...}` shape chat-completions APIs expect.
    pub fn to_wire(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Shared resources executors may need.
#[derive(Clone, Default)]
pub struct ToolSettings {
    pub transcriber: Option<Arc<Transcriber>>,
}

/// Per-invocation context handed to an executor.
#[derive(Clone)]
pub struct ToolContext {
    pub settings: ToolSettings,
    pub cancel: CancellationToken,
}

pub type ToolExecutor =
    Arc<dyn Fn(Value, ToolContext) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Wrap an async function as a [`ToolExecutor`].
pub fn executor<F, Fut>(f: F) -> ToolExecutor
where
    F: Fn(Value, ToolContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |arguments: Value, context: ToolContext| {
        f(arguments, context).boxed()
    })
}

/// What happens when a name is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateTool` and leave the registry untouched.
    #[default]
    Reject,
    /// Replace the earlier descriptor in place along with its executor.
    Shadow,
}

struct Binding {
    executor: ToolExecutor,
    schema: Arc<JSONSchema>,
}

/// A checked registration waiting for [`ToolRegistry::commit`].
pub struct StagedTool {
    descriptor: ToolDescriptor,
    binding: Binding,
}

pub type SharedRegistry = Arc<RwLock<ToolRegistry>>;

pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    bindings: HashMap<String, Binding>,
    policy: DuplicatePolicy,
    settings: ToolSettings,
}

impl ToolRegistry {
    pub fn new(policy: DuplicatePolicy, settings: ToolSettings) -> Self {
        Self {
            descriptors: Vec::new(),
            bindings: HashMap::new(),
            policy,
            settings,
        }
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    pub fn register(&mut self, descriptor: ToolDescriptor, executor: ToolExecutor) -> Result<()> {
        let staged = self.stage(descriptor, executor)?;
        self.commit(staged);
        Ok(())
    }

    /// Run every check `register` would (schema compilation and the
    /// duplicate policy) without touching the registry.
    pub fn stage(&self, descriptor: ToolDescriptor, executor: ToolExecutor) -> Result<StagedTool> {
        let schema = compile_schema(&descriptor)?;
        if self.policy == DuplicatePolicy::Reject && self.position(&descriptor.name).is_some() {
            return Err(ToolChatError::DuplicateTool(descriptor.name));
        }
        Ok(StagedTool {
            descriptor,
            binding: Binding {
                executor,
                schema: Arc::new(schema),
            },
        })
    }

    /// Apply a staged registration. Only valid for a registry that has not
    /// changed since `stage`, which holding the write lock guarantees.
    pub fn commit(&mut self, staged: StagedTool) {
        let StagedTool {
            descriptor,
            binding,
        } = staged;
        match self.position(&descriptor.name) {
            Some(index) => {
                tracing::warn!(tool = %descriptor.name, "shadowing previously registered tool");
                self.bindings.insert(descriptor.name.clone(), binding);
                self.descriptors[index] = descriptor;
            }
            None => {
                self.bindings.insert(descriptor.name.clone(), binding);
                self.descriptors.push(descriptor);
            }
        }
    }

    /// Registered descriptors in registration order.
    pub fn list_tools(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.position(name).map(|index| &self.descriptors[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn resolve_executor(&self, name: &str) -> Result<ToolExecutor> {
        self.bindings
            .get(name)
            .map(|binding| binding.executor.clone())
            .ok_or_else(|| ToolChatError::UnknownTool(name.to_string()))
    }

    pub fn validate_arguments(&self, name: &str, arguments: &Value) -> Result<()> {
        let binding = self
            .bindings
            .get(name)
            .ok_or_else(|| ToolChatError::UnknownTool(name.to_string()))?;

        if let Err(errors) = binding.schema.validate(arguments) {
            let messages: Vec<String> = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{}: {}", path, e)
                    }
                })
                .collect();
            return Err(ToolChatError::InvalidArguments {
                tool: name.to_string(),
                message: messages.join("; "),
            });
        }

        Ok(())
    }

    /// Resolve and validate a call without running it, so the caller can
    /// drop any lock on the registry before awaiting the executor.
    pub fn prepare(&self, name: &str, arguments: Value) -> Result<PreparedCall> {
        let executor = self.resolve_executor(name)?;
        self.validate_arguments(name, &arguments)?;
        Ok(PreparedCall {
            tool: name.to_string(),
            executor,
            arguments,
            settings: self.settings.clone(),
        })
    }

    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        self.prepare(name, arguments)?.run(cancel).await
    }

    /// Tool advertisement sent with the first request of an exchange.
    pub fn format_tools_for_llm(&self) -> Vec<Value> {
        self.descriptors.iter().map(ToolDescriptor::to_wire).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }
}

pub struct PreparedCall {
    tool: String,
    executor: ToolExecutor,
    arguments: Value,
    settings: ToolSettings,
}

impl PreparedCall {
    pub async fn run(self, cancel: &CancellationToken) -> Result<Value> {
        let context = ToolContext {
            settings: self.settings,
            cancel: cancel.clone(),
        };
        tracing::debug!(tool = %self.tool, arguments = %self.arguments, "invoking tool");
        (self.executor)(self.arguments, context).await
    }
}

fn compile_schema(descriptor: &ToolDescriptor) -> Result<JSONSchema> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&descriptor.parameters)
        .map_err(|e| {
            ToolChatError::ConfigError(format!(
                "Invalid parameter schema for tool '{}': {}",
                descriptor.name, e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn descriptor(name: &str, description: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": { "x": { "type": "number" } },
                "required": ["x"],
                "additionalProperties": false
            }),
            requires_interactive_input: false,
        }
    }

    fn constant(value: Value) -> ToolExecutor {
        executor(move |_args, _ctx| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    #[test]
    fn test_list_tools_keeps_registration_order() {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject, ToolSettings::default());
        for name in ["zeta", "alpha", "mid"] {
            registry.register(descriptor(name, name), constant(json!(1))).unwrap();
        }
        let names: Vec<&str> = registry.list_tools().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.format_tools_for_llm()[1]["function"]["name"], "alpha");
    }

    #[test]
    fn test_reject_policy_leaves_registry_unchanged() {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject, ToolSettings::default());
        registry.register(descriptor("t", "first"), constant(json!(1))).unwrap();

        let err = registry
            .register(descriptor("t", "second"), constant(json!(2)))
            .unwrap_err();
        assert!(matches!(err, ToolChatError::DuplicateTool(ref n) if n == "t"));
        assert_eq!(registry.list_tools().len(), 1);
        assert_eq!(registry.list_tools()[0].description, "first");
    }

    #[test]
    fn test_stage_leaves_registry_untouched_until_commit() {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject, ToolSettings::default());
        registry.register(descriptor("t", "first"), constant(json!(1))).unwrap();

        let staged = registry
            .stage(descriptor("u", "second"), constant(json!(2)))
            .unwrap();
        assert!(!registry.contains("u"));
        assert_eq!(registry.format_tools_for_llm().len(), 1);

        let err = registry
            .stage(descriptor("t", "again"), constant(json!(3)))
            .err()
            .unwrap();
        assert_eq!(err.kind(), "duplicate_tool");

        registry.commit(staged);
        assert!(registry.contains("u"));
        assert_eq!(registry.list_tools()[1].description, "second");
    }

    #[tokio::test]
    async fn test_shadow_policy_replaces_in_place() {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Shadow, ToolSettings::default());
        registry.register(descriptor("a", "a"), constant(json!(1))).unwrap();
        registry.register(descriptor("t", "first"), constant(json!(1))).unwrap();
        registry.register(descriptor("t", "second"), constant(json!(2))).unwrap();

        assert_eq!(registry.list_tools().len(), 2);
        assert_eq!(registry.list_tools()[1].description, "second");

        let value = registry
            .invoke("t", json!({"x": 1}), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(value, json!(2));
    }

    #[test]
    fn test_resolve_unknown_tool_has_no_side_effect() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject, ToolSettings::default());
        registry
            .register(
                descriptor("known", "known"),
                executor(move |_args, _ctx| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(Value::Null) }
                }),
            )
            .unwrap();

        let err = registry.resolve_executor("missing").err().unwrap();
        assert!(matches!(err, ToolChatError::UnknownTool(ref n) if n == "missing"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.list_tools().len(), 1);
    }

    #[test]
    fn test_validate_arguments_reports_schema_mismatch() {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject, ToolSettings::default());
        registry.register(descriptor("t", "t"), constant(json!(1))).unwrap();

        assert!(registry.validate_arguments("t", &json!({"x": 3})).is_ok());
        let err = registry
            .validate_arguments("t", &json!({"x": "three"}))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
        assert!(err.to_string().contains("/x"));
    }

    #[test]
    fn test_register_rejects_invalid_schema() {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject, ToolSettings::default());
        let mut bad = descriptor("bad", "bad");
        bad.parameters = json!({"type": 12});
        assert!(registry.register(bad, constant(json!(1))).is_err());
        assert!(registry.list_tools().is_empty());
    }
}
