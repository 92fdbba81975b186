//! Tool trait definition

use crate::{Result, ToolError};
use async_trait::async_trait;
use serde_json::{Value, json};

/// A search tool the language model can call
///
/// Every tool takes a single free-text `query` and returns free text: the fragments
/// it found joined with blank lines, or the empty string when nothing matched.
/// Failures of the external service are returned as errors, never as text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run one lookup for `query`
    async fn invoke(&self, query: &str) -> Result<String>;

    /// Tool name as the model sees it
    fn name(&self) -> &str;

    /// Description that tells the model when to use the tool
    fn description(&self) -> &str;

    /// JSON schema for the tool input
    fn input_schema(&self) -> Value {
        query_schema("Search query, passed through verbatim")
    }
}

/// Schema of a tool input holding one required `query` string
pub fn query_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description,
            }
        },
        "required": ["query"],
        "additionalProperties": false,
    })
}

/// Extract the `query` argument from a tool-call input
///
/// Some models send the arguments as a bare string; that string is taken as the query.
pub fn query_from_input(input: &Value) -> Result<String> {
    match input {
        Value::String(query) => Ok(query.clone()),
        Value::Object(map) => map
            .get("query")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ToolError::InvalidInput("missing string field 'query'".to_string())),
        other => Err(ToolError::InvalidInput(format!(
            "expected an object with 'query', got {other}"
        ))),
    }
}
