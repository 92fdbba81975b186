//! Structured normalizer: free-form model answer to [`ClassificationRecord`]
//!
//! A second model call with a strict JSON schema copies the Query, Sentiment and
//! Summary parts of the answer into fields. The reply is only parsed and checked;
//! nothing is repaired except stripping a Markdown code fence.

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::prompts::{NORMALIZER_INSTRUCTIONS, QUERY_FIELD, SENTIMENT_FIELD, SUMMARY_FIELD};
use crate::record::{ClassificationRecord, SENTIMENT_MAX, SENTIMENT_MIN};
use sentiment_llm::tools::schema;
use sentiment_llm::{CompletionRequest, LLMProvider, Message, ModelReply, ResponseFormat};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const SCHEMA_NAME: &str = "classification";

/// Wire shape of the structured reply; every field must be present
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClassification {
    query: String,
    #[serde(deserialize_with = "Option::deserialize")]
    sentiment: Option<f64>,
    summary: String,
}

/// JSON schema of a classification record
pub fn classification_schema() -> Value {
    schema::object(
        json!({
            "query": schema::string(QUERY_FIELD),
            "sentiment": schema::nullable_number(SENTIMENT_FIELD),
            "summary": schema::string(SUMMARY_FIELD),
        }),
        &["query", "sentiment", "summary"],
    )
}

/// Projects model answers onto classification records
pub struct StructuredNormalizer {
    provider: Arc<dyn LLMProvider>,
    config: Arc<AnalysisConfig>,
}

impl StructuredNormalizer {
    /// Create a normalizer over a provider
    pub fn new(provider: Arc<dyn LLMProvider>, config: Arc<AnalysisConfig>) -> Self {
        Self { provider, config }
    }

    /// Coerce `raw_text` into a record
    #[instrument(skip_all, fields(raw_length = raw_text.len()))]
    pub async fn coerce(&self, raw_text: &str) -> Result<ClassificationRecord> {
        let request = CompletionRequest::builder(self.config.model.id())
            .system(NORMALIZER_INSTRUCTIONS)
            .add_message(Message::user(raw_text))
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .response_format(ResponseFormat::json_schema(
                SCHEMA_NAME,
                classification_schema(),
            ))
            .build();

        let response = self.provider.complete(request).await.map_err(|e| {
            if e.is_compliance_failure() {
                Error::SchemaCoercion(e.to_string())
            } else {
                Error::from(e)
            }
        })?;

        let answer = ModelReply::from_response(&response).into_answer();
        debug!(answer_length = answer.len(), "Structured reply received");

        parse_record(&answer).inspect_err(|e| warn!(error = %e, "Structured reply rejected"))
    }
}

/// Parse and check a structured reply
pub fn parse_record(text: &str) -> Result<ClassificationRecord> {
    let json = strip_code_fence(text);
    if json.is_empty() {
        return Err(Error::SchemaCoercion("empty reply".to_string()));
    }

    let raw: RawClassification = serde_json::from_str(json)
        .map_err(|e| Error::SchemaCoercion(format!("reply does not match schema: {e}")))?;
    let record = ClassificationRecord::new(raw.query, raw.sentiment, raw.summary);

    // An empty result is not an error; its sentiment is never shown
    if record.is_degenerate() {
        if let Some(s) = record.sentiment() {
            debug!(sentiment = s, "Dropping sentiment of a degenerate record");
        }
        return Ok(ClassificationRecord::new(record.query(), None, record.summary()));
    }

    match record.sentiment() {
        Some(s) if !s.is_finite() || !(SENTIMENT_MIN..=SENTIMENT_MAX).contains(&s) => {
            Err(Error::SchemaCoercion(format!(
                "sentiment {s} outside [{SENTIMENT_MIN}, {SENTIMENT_MAX}]"
            )))
        }
        None => Err(Error::SchemaCoercion(
            "sentiment missing for a non-empty summary".to_string(),
        )),
        Some(_) => Ok(record),
    }
}

/// Remove a surrounding Markdown code fence, with or without a language tag
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}
