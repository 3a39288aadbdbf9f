use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    pub function: FunctionCall,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, exactly as the model produced it.
    #[serde(default)]
    pub arguments: String,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// A tool call whose arguments have been decoded.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl ToolCall {
    /// Decode `function.arguments`. An empty string is treated as `{}`.
    pub fn parse_arguments(&self) -> Result<ToolCallRequest, serde_json::Error> {
        let raw = self.function.arguments.trim();
        let arguments = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw)?
        };
        Ok(ToolCallRequest {
            id: self.id.clone(),
            tool_name: self.function.name.clone(),
            arguments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            tool_type: "function".to_string(),
            function: FunctionCall {
                name: "add_numbers".to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[test]
    fn test_parse_arguments_decodes_object() {
        let request = call(r#"{"num1": 2, "num2": 3}"#).parse_arguments().unwrap();
        assert_eq!(request.tool_name, "add_numbers");
        assert_eq!(request.arguments, json!({"num1": 2, "num2": 3}));
    }

    #[test]
    fn test_parse_arguments_empty_is_empty_object() {
        let request = call("  ").parse_arguments().unwrap();
        assert_eq!(request.arguments, json!({}));
    }

    #[test]
    fn test_parse_arguments_rejects_garbage() {
        assert!(call("{num1: 2").parse_arguments().is_err());
    }
}
