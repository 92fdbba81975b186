//! Language model abstraction layer for sentiment-rs
//!
//! This crate provides provider-agnostic types for talking to a hosted or local
//! language model. It includes:
//!
//! - Message types, including tool calls and tool results
//! - Completion request/response types with an optional structured-output format
//! - Tool definitions for function calling
//! - [`ModelReply`], which separates a model's reasoning trace from its answer
//! - An OpenAI-compatible provider (works against Ollama's `/v1` endpoint)

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod reply;
pub mod tools;

pub use completion::{
    CompletionRequest, CompletionResponse, JsonSchemaFormat, ResponseFormat, StopReason,
    TokenUsage,
};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, MessageContent, Role};
pub use provider::LLMProvider;
pub use reply::{ModelReply, REASONING_END_MARKER};
pub use tools::ToolDefinition;

#[cfg(feature = "openai")]
pub mod providers;
