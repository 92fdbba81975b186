//! Instruction templates and search queries
//!
//! Templates use MiniJinja syntax and receive two variables: `query`, the search
//! query the model must pass to its tool verbatim, and `tool_name`.

use crate::error::Result;
use crate::record::Source;
use minijinja::{Environment, context};

const FINANCIAL_INSTRUCTIONS: &str = "\
You are a financial news and stock market expert. Call the {{ tool_name }} tool once, \
using the _query_ below exactly as the user provided it. Do NOT modify it! \
You HAVE TO call the {{ tool_name }} tool once and ONLY once.
_query_ = {{ query }}
Extract the information from the tool reply and analyze it as it is. You must be neutral.
---
**IMPORTANT**: If the tool reply is empty, DO NOT INVENT any information. Just write 'empty' for Summary.
---
Only extract the sentiment and write a summary, following the structure below. Do not add anything else to your message:
-Query: the query you used when calling the tool
-Sentiment: the sentiment of the information on a scale from 0.0 (negative) to 5.0 (positive)
-Summary: a detailed and long summary of the retrieved information";

const SOCIAL_INSTRUCTIONS: &str = "\
You are a social media expert and analyst. Call the {{ tool_name }} tool once, \
using the _query_ below exactly as the user provided it. Do NOT modify it! \
You HAVE TO call the {{ tool_name }} tool once and ONLY once.
Extract the social media messages from the tool reply and analyze them as they are. You must be neutral.
---
**IMPORTANT**: If the tool reply is empty, DO NOT INVENT any information. Just write 'empty' for Summary.
---
_query_ = {{ query }}
Only extract the sentiment and write a summary, following the structure below. Do not add anything else to your message:
-Query: the query you used when calling the tool
-Sentiment: the sentiment of the messages on a scale from 0.0 (negative) to 5.0 (positive)
-Summary: a detailed summary representing the overall comments";

/// System instruction of the structured normalizer
pub const NORMALIZER_INSTRUCTIONS: &str = "\
Fill in the classification fields from the message you are given. Copy, do not rewrite.
- query: exactly the text from the Query part of the message
- sentiment: exactly the number written in the Sentiment part of the message, or null if there is none
- summary: exactly what is written in the Summary part of the message";

/// Field description of `query` in the output schema
pub const QUERY_FIELD: &str = "Add here exactly the text from the 'Query' part of the message";
/// Field description of `sentiment` in the output schema
pub const SENTIMENT_FIELD: &str =
    "Add here exactly what is written in the Sentiment part of the message, as a number";
/// Field description of `summary` in the output schema
pub const SUMMARY_FIELD: &str =
    "Add here exactly what is written in the Summary part of the message";

/// System instruction for one extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTemplate {
    name: String,
    source: String,
}

impl InstructionTemplate {
    /// Create a template from MiniJinja source
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Template of the financial news pipeline
    pub fn financial() -> Self {
        Self::new("financial", FINANCIAL_INSTRUCTIONS)
    }

    /// Template of the social media pipeline
    pub fn social() -> Self {
        Self::new("social", SOCIAL_INSTRUCTIONS)
    }

    /// Template for a source
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Financial => Self::financial(),
            Source::Social => Self::social(),
        }
    }

    /// Template name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render with the query and the tool name
    pub fn render(&self, query: &str, tool_name: &str) -> Result<String> {
        let env = Environment::new();
        Ok(env.render_str(&self.source, context! { query, tool_name })?)
    }
}

/// Query of the financial news search
pub fn financial_query(ticker: &str, company: &str) -> String {
    format!("What are the most relevant financial news about {ticker} or {company}?")
}

/// Query of the social media search
pub fn social_query(ticker: &str, company: &str) -> String {
    format!("{ticker} OR {company}")
}

/// Query for a source
pub fn query_for(source: Source, ticker: &str, company: &str) -> String {
    match source {
        Source::Financial => financial_query(ticker, company),
        Source::Social => social_query(ticker, company),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_financial_template_embeds_query_verbatim() {
        let query = financial_query("NVDA", "NVIDIA Corporation");
        let rendered = InstructionTemplate::financial()
            .render(&query, "tav_search")
            .unwrap();

        assert!(rendered.contains(
            "_query_ = What are the most relevant financial news about NVDA or NVIDIA Corporation?"
        ));
        assert!(rendered.contains("call the tav_search tool once and ONLY once"));
        assert!(rendered.contains("Just write 'empty' for Summary."));
        assert!(!rendered.contains("{{"));
    }

    #[test]
    fn test_social_template() {
        let rendered = InstructionTemplate::for_source(Source::Social)
            .render(&social_query("EQNR", "Equinor ASA"), "reddit_tool")
            .unwrap();

        assert!(rendered.starts_with("You are a social media expert"));
        assert!(rendered.contains("_query_ = EQNR OR Equinor ASA"));
        assert!(rendered.contains("reddit_tool"));
    }

    #[test]
    fn test_query_is_not_html_escaped() {
        let rendered = InstructionTemplate::social()
            .render("AT&T OR \"AT&T Inc.\"", "reddit_tool")
            .unwrap();
        assert!(rendered.contains("_query_ = AT&T OR \"AT&T Inc.\""));
    }

    #[test]
    fn test_queries() {
        assert_eq!(
            query_for(Source::Financial, "EQNR", "Equinor ASA"),
            "What are the most relevant financial news about EQNR or Equinor ASA?"
        );
        assert_eq!(query_for(Source::Social, "EQNR", "Equinor ASA"), "EQNR OR Equinor ASA");
    }

    #[test]
    fn test_broken_template_is_prompt_error() {
        let template = InstructionTemplate::new("broken", "{% if query %}unclosed");
        assert!(matches!(
            template.render("q", "t"),
            Err(Error::Prompt(_))
        ));
    }
}
