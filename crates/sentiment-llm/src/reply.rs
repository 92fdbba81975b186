//! Reasoning/answer separation for model replies
//!
//! Reasoning models either report their deliberation in a dedicated response field
//! or inline it before a terminal `</think>` marker. [`ModelReply`] gives callers the
//! answer alone, whichever way the provider delivered it.

use crate::CompletionResponse;
use serde::{Deserialize, Serialize};

/// Marker that ends an inline reasoning trace
pub const REASONING_END_MARKER: &str = "</think>";

const REASONING_START_MARKER: &str = "<think>";

/// A model reply split into reasoning trace and final answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    reasoning: Option<String>,
    answer: String,
}

impl ModelReply {
    /// Split raw model text on the last reasoning marker
    ///
    /// The answer is exactly the text after the final `</think>`; when the marker is
    /// absent the whole text is the answer.
    pub fn parse(raw: &str) -> Self {
        match raw.rfind(REASONING_END_MARKER) {
            Some(idx) => {
                let trace = raw[..idx].trim();
                let trace = trace
                    .strip_prefix(REASONING_START_MARKER)
                    .unwrap_or(trace)
                    .trim();
                Self {
                    reasoning: (!trace.is_empty()).then(|| trace.to_string()),
                    answer: raw[idx + REASONING_END_MARKER.len()..].to_string(),
                }
            }
            None => Self {
                reasoning: None,
                answer: raw.to_string(),
            },
        }
    }

    /// Build a reply from a completion response
    ///
    /// A reasoning field reported by the provider takes precedence over an inline
    /// trace; the inline marker is still stripped from the answer.
    pub fn from_response(response: &CompletionResponse) -> Self {
        let text = response.message.text().unwrap_or_default();
        let parsed = Self::parse(&text);
        Self {
            reasoning: response.reasoning.clone().or(parsed.reasoning),
            answer: parsed.answer,
        }
    }

    /// The final answer
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// The reasoning trace, if the model produced one
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    /// Consume the reply, keeping only the answer
    pub fn into_answer(self) -> String {
        self.answer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message, StopReason, TokenUsage};

    #[test]
    fn test_answer_is_text_after_last_marker() {
        let raw = "<think>call the tool</think>draft</think>-Query: NVDA\n-Sentiment: 3.5\n-Summary: ok";
        let reply = ModelReply::parse(raw);

        assert_eq!(reply.answer(), "-Query: NVDA\n-Sentiment: 3.5\n-Summary: ok");
        assert_eq!(reply.reasoning(), Some("call the tool</think>draft"));
    }

    #[test]
    fn test_answer_keeps_surrounding_whitespace() {
        let reply = ModelReply::parse("<think>x</think>\n\nQuery: a\n");
        assert_eq!(reply.answer(), "\n\nQuery: a\n");
    }

    #[test]
    fn test_no_marker_is_whole_text() {
        let reply = ModelReply::parse("Query: a\nSummary: empty");
        assert_eq!(reply.answer(), "Query: a\nSummary: empty");
        assert_eq!(reply.reasoning(), None);
    }

    #[test]
    fn test_marker_at_end_gives_empty_answer() {
        let reply = ModelReply::parse("<think>nothing to say</think>");
        assert_eq!(reply.answer(), "");
        assert_eq!(reply.reasoning(), Some("nothing to say"));
    }

    #[test]
    fn test_native_reasoning_field_wins() {
        let response = CompletionResponse {
            message: Message::assistant("<think>inline</think>Summary: empty"),
            reasoning: Some("native trace".to_string()),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        };
        let reply = ModelReply::from_response(&response);

        assert_eq!(reply.reasoning(), Some("native trace"));
        assert_eq!(reply.answer(), "Summary: empty");
    }

    #[test]
    fn test_response_without_text() {
        let response = CompletionResponse {
            message: Message {
                role: crate::Role::Assistant,
                content: None,
            },
            reasoning: None,
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        };
        assert_eq!(ModelReply::from_response(&response).answer(), "");
    }
}
