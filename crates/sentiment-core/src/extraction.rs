//! Extraction agent: one model conversation around one tool call
//!
//! The agent loop follows the usual shape (call the model with the tool definition,
//! execute requested tool calls, feed the results back, stop on a final answer) with
//! two additions. The tool is wrapped in a [`SingleUseTool`] for the run, so a second
//! call is answered with an error result instead of a second lookup. And a run whose
//! model never called the tool fails, since its answer would not rest on tool data.

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::prompts::InstructionTemplate;
use sentiment_llm::{
    CompletionRequest, ContentBlock, LLMProvider, Message, ModelReply, StopReason, ToolDefinition,
};
use sentiment_tools::tool::query_from_input;
use sentiment_tools::{SingleUseTool, Tool, ToolInvocation};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Outcome of a successful extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The model's final reply, reasoning separated from the answer
    pub reply: ModelReply,
    /// The single tool call that reached the external service
    pub invocation: ToolInvocation,
}

/// Runs one instructed conversation in which the model may call one tool once
pub struct ExtractionAgent {
    provider: Arc<dyn LLMProvider>,
    config: Arc<AnalysisConfig>,
}

impl ExtractionAgent {
    /// Create an agent over a provider
    pub fn new(provider: Arc<dyn LLMProvider>, config: Arc<AnalysisConfig>) -> Self {
        Self { provider, config }
    }

    /// Run the conversation
    ///
    /// The system prompt is `template` rendered with `query`; the user message is
    /// `query` itself.
    #[instrument(skip(self, template, tool), fields(template = %template.name(), tool_name = %tool.name()))]
    pub async fn run(
        &self,
        template: &InstructionTemplate,
        tool: Arc<dyn Tool>,
        query: &str,
    ) -> Result<Extraction> {
        let guard = SingleUseTool::new(tool);
        let system = template.render(query, guard.name())?;
        let definition =
            ToolDefinition::new(guard.name(), guard.description(), guard.input_schema());
        let mut conversation = vec![Message::user(query)];

        for iteration in 1..=self.config.max_iterations {
            let request = CompletionRequest::builder(self.config.model.id())
                .messages(conversation.clone())
                .system(system.clone())
                .max_tokens(self.config.max_tokens)
                .temperature(self.config.temperature)
                .tools(vec![definition.clone()])
                .build();

            let response = self.provider.complete(request).await?;
            info!(
                iteration,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Model response received"
            );

            if response.message.has_tool_uses() {
                let results = self.execute_tool_calls(&guard, &response.message).await?;
                conversation.push(response.message);
                conversation.extend(results);
                continue;
            }

            if response.stop_reason == StopReason::MaxTokens {
                warn!(iteration, "Final answer hit the token limit");
            }

            let reply = ModelReply::from_response(&response);
            debug!(
                has_reasoning = reply.reasoning().is_some(),
                answer_length = reply.answer().len(),
                "Final answer received"
            );

            let attempts = guard.attempts();
            return match guard.into_invocation() {
                Some(invocation) => Ok(Extraction { reply, invocation }),
                None => {
                    warn!(attempts, "Model answered without a successful tool call");
                    Err(Error::ToolNotInvoked {
                        tool: definition.name,
                    })
                }
            };
        }

        Err(Error::ModelUnavailable(format!(
            "no final answer within {} model calls",
            self.config.max_iterations
        )))
    }

    /// Execute every tool call in `message`, returning one result message per call
    ///
    /// Calls refused by the guard and malformed calls are reported back to the model
    /// as error results. A failure of the external service ends the run.
    async fn execute_tool_calls(
        &self,
        guard: &SingleUseTool,
        message: &Message,
    ) -> Result<Vec<Message>> {
        let mut results = Vec::new();

        for block in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            if name != guard.name() {
                warn!(tool_name = %name, "Model requested an unknown tool");
                results.push(Message::tool_error(
                    id.clone(),
                    format!("Error: unknown tool '{name}', the only tool is '{}'", guard.name()),
                ));
                continue;
            }

            let query = match query_from_input(input) {
                Ok(query) => query,
                Err(e) => {
                    warn!(tool_name = %name, error = %e, "Malformed tool call");
                    results.push(Message::tool_error(id.clone(), format!("Error: {e}")));
                    continue;
                }
            };

            info!(tool_name = %name, tool_id = %id, query = %query, "Executing tool");
            let started = Instant::now();
            match guard.invoke(&query).await {
                Ok(output) => {
                    info!(
                        tool_name = %name,
                        duration_ms = started.elapsed().as_millis() as u64,
                        result_length = output.len(),
                        "Tool execution succeeded"
                    );
                    results.push(Message::tool_result(id.clone(), output));
                }
                Err(e) if e.is_call_limit() => {
                    results.push(Message::tool_error(id.clone(), format!("Error: {e}")));
                }
                Err(e) => {
                    warn!(tool_name = %name, error = %e, "Tool execution failed");
                    return Err(e.into());
                }
            }
        }

        Ok(results)
    }
}
