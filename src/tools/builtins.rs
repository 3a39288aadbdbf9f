use serde_json::{json, Number, Value};
use std::path::PathBuf;

use super::registry::ToolContext;
use crate::error::{Result, ToolChatError};

// Tool handlers

pub async fn handle_add_numbers(args: Value, _ctx: ToolContext) -> Result<Value> {
    arithmetic("add_numbers", &args, i64::checked_add, |a, b| a + b)
}

pub async fn handle_multiply_numbers(args: Value, _ctx: ToolContext) -> Result<Value> {
    arithmetic("multiply_numbers", &args, i64::checked_mul, |a, b| a * b)
}

pub async fn handle_transcribe_audio(args: Value, ctx: ToolContext) -> Result<Value> {
    let path = args
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| failure("transcribe_audio", "Missing required argument: path"))?;

    let transcriber = ctx
        .settings
        .transcriber
        .as_ref()
        .ok_or_else(|| failure("transcribe_audio", "Transcription is not configured"))?;

    let transcription = transcriber
        .transcribe(&PathBuf::from(path), &ctx.cancel)
        .await?;

    Ok(json!({ "transcription": transcription }))
}

/// Integer inputs produce an integer result unless it overflows, in which
/// case the computation falls back to floating point.
fn arithmetic(
    tool: &str,
    args: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let num1 = number_arg(tool, args, "num1")?;
    let num2 = number_arg(tool, args, "num2")?;

    if let (Some(a), Some(b)) = (num1.as_i64(), num2.as_i64()) {
        if let Some(result) = int_op(a, b) {
            return Ok(json!({ "result": result }));
        }
    }

    let (a, b) = match (num1.as_f64(), num2.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(failure(tool, "Arguments are not representable as numbers")),
    };

    let result = Number::from_f64(float_op(a, b))
        .ok_or_else(|| failure(tool, "Result is not a finite number"))?;
    Ok(json!({ "result": result }))
}

fn number_arg<'a>(tool: &str, args: &'a Value, name: &str) -> Result<&'a Number> {
    match args.get(name) {
        Some(Value::Number(n)) => Ok(n),
        Some(_) => Err(failure(tool, &format!("Argument '{}' must be a number", name))),
        None => Err(failure(tool, &format!("Missing required argument: {}", name))),
    }
}

fn failure(tool: &str, message: &str) -> ToolChatError {
    ToolChatError::ExecutorFailure {
        tool: tool.to_string(),
        message: message.to_string(),
    }
}
