//! OpenAI-compatible chat completions provider
//!
//! Speaks the `/chat/completions` wire format, which Ollama serves under
//! `http://localhost:11434/v1`. Tool calls, structured output (`response_format`)
//! and separately reported reasoning (`reasoning_content` / `reasoning`) are mapped
//! onto the provider-agnostic types of this crate.
//!
//! ```no_run
//! use sentiment_llm::{CompletionRequest, LLMProvider, Message};
//! use sentiment_llm::providers::{OpenAIConfig, OpenAIProvider};
//!
//! # async fn example() -> sentiment_llm::Result<()> {
//! let config = OpenAIConfig::new("ollama").with_api_base("http://localhost:11434/v1");
//! let provider = OpenAIProvider::with_config(config)?;
//!
//! let request = CompletionRequest::builder("qwen3:8b")
//!     .add_message(Message::user("Hello!"))
//!     .build();
//! let response = provider.complete(request).await?;
//! println!("{:?}", response.message.text());
//! # Ok(())
//! # }
//! ```

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, ResponseFormat, Result, Role, StopReason, TokenUsage, ToolDefinition,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OPENAI_API_BASE: &str = "http://localhost:11434/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication (any non-empty value for Ollama)
    pub api_key: String,

    /// Base URL of the API, without the `/chat/completions` suffix
    pub api_base: String,

    /// Request timeout
    pub timeout: Duration,

    /// Optional list of accepted model identifiers
    /// If None, any model string is accepted
    pub supported_models: Option<Vec<String>>,
}

impl OpenAIConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Set custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Restrict the provider to a set of models
    pub fn with_supported_models(mut self, models: Vec<String>) -> Self {
        self.supported_models = Some(models);
        self
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            supported_models: None,
        }
    }
}

/// OpenAI-compatible provider
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIProvider {
    /// Create a new provider with custom configuration
    pub fn with_config(config: OpenAIConfig) -> Result<Self> {
        if config.api_base.is_empty() {
            return Err(LLMError::ConfigurationError("API base URL is empty".to_string()));
        }
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Validate model name against supported models list (if configured)
    fn validate_model(&self, model: &str) -> Result<()> {
        if let Some(supported) = &self.config.supported_models {
            if !supported.iter().any(|m| m == model) {
                return Err(LLMError::InvalidRequest(format!(
                    "Model '{model}' is not in the supported models list: {supported:?}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    #[instrument(skip(self, request), fields(model = %request.model, api_base = %self.config.api_base))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.validate_model(&request.model)?;

        let openai_request = OpenAIRequest {
            model: request.model.clone(),
            messages: build_openai_messages(request.system, request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            tools: request.tools.as_deref().map(convert_tools),
            response_format: request.response_format,
        };

        debug!(
            structured = openai_request.response_format.is_some(),
            tool_count = openai_request.tools.as_ref().map_or(0, Vec::len),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(request.model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::UnexpectedResponse(format!("Failed to parse response: {e}")))?;

        let usage = openai_response.usage.unwrap_or_default();
        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::UnexpectedResponse("No choices in response".to_string()))?;

        debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("none"),
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Received chat completion"
        );

        let finish_reason = choice.finish_reason.unwrap_or_default();
        let (message, reasoning) = parse_openai_response(choice.message)?;
        let stop_reason = if message.has_tool_uses() {
            StopReason::ToolUse
        } else {
            map_stop_reason(&finish_reason)
        };

        Ok(CompletionResponse {
            message,
            reasoning,
            stop_reason,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAIMessage {
    fn text(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAIResponseToolCall>>,
    #[serde(default)]
    refusal: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: OpenAIResponseFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseFunctionCall {
    name: String,
    arguments: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Build OpenAI messages; the system prompt goes first in the array
fn build_openai_messages(system: Option<String>, messages: Vec<Message>) -> Vec<OpenAIMessage> {
    let mut result = Vec::new();

    if let Some(sys) = system {
        result.push(OpenAIMessage::text("system", sys));
    }

    for msg in messages {
        result.extend(convert_message(msg));
    }

    result
}

/// Convert a single message; tool results become separate `tool` messages
fn convert_message(msg: Message) -> Vec<OpenAIMessage> {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    };

    match msg.content {
        Some(MessageContent::Text(text)) => vec![OpenAIMessage::text(role, text)],
        Some(MessageContent::Blocks(blocks)) => convert_blocks(role, blocks),
        None => vec![OpenAIMessage::text(role, String::new())],
    }
}

fn convert_blocks(role: &str, blocks: Vec<ContentBlock>) -> Vec<OpenAIMessage> {
    let mut messages = Vec::new();
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text: part } => text.push_str(&part),
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = serde_json::to_string(&input).unwrap_or_default();
                tool_calls.push(OpenAIToolCall {
                    id,
                    tool_type: "function".to_string(),
                    function: OpenAIFunctionCall { name, arguments },
                });
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => messages.push(OpenAIMessage {
                role: "tool".to_string(),
                content: Some(content),
                tool_calls: None,
                tool_call_id: Some(tool_use_id),
            }),
        }
    }

    if !text.is_empty() || !tool_calls.is_empty() {
        messages.insert(
            0,
            OpenAIMessage {
                role: role.to_string(),
                content: (!text.is_empty()).then_some(text),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: None,
            },
        );
    }

    messages
}

fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
    tools
        .iter()
        .map(|tool| OpenAITool {
            tool_type: "function".to_string(),
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        })
        .collect()
}

/// Parse the response message into our format plus any reported reasoning
///
/// Tool-call arguments arrive as a JSON string from OpenAI and as an object from
/// some compatible servers; both are accepted.
fn parse_openai_response(msg: OpenAIResponseMessage) -> Result<(Message, Option<String>)> {
    if let Some(refusal) = msg.refusal.filter(|r| !r.is_empty()) {
        return Err(LLMError::Refusal(refusal));
    }

    let mut blocks = Vec::new();

    if let Some(content) = msg.content.filter(|c| !c.is_empty()) {
        blocks.push(ContentBlock::Text { text: content });
    }

    for (index, call) in msg.tool_calls.unwrap_or_default().into_iter().enumerate() {
        let input = match call.function.arguments {
            serde_json::Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
                LLMError::UnexpectedResponse(format!("Failed to parse tool arguments: {e}"))
            })?,
            other => other,
        };

        blocks.push(ContentBlock::ToolUse {
            id: call.id.unwrap_or_else(|| format!("call_{index}")),
            name: call.function.name,
            input,
        });
    }

    let reasoning = msg
        .reasoning_content
        .or(msg.reasoning)
        .filter(|r| !r.trim().is_empty());

    Ok((
        Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(blocks)),
        },
        reasoning,
    ))
}

fn map_stop_reason(reason: &str) -> StopReason {
    match reason {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        "tool_calls" => StopReason::ToolUse,
        _ => {
            debug!("Unknown stop reason: {}", reason);
            StopReason::EndTurn
        }
    }
}
