//! News search tool and its Tavily client

use crate::tool::query_schema;
use crate::{Result, Tool, ToolError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Source of recent news fragments
#[async_trait]
pub trait NewsSearchClient: Send + Sync {
    /// Search news from the last `window_days` days, at most `result_count` results
    ///
    /// Returns one text fragment per result, in relevance order.
    async fn search(
        &self,
        query: &str,
        window_days: u32,
        result_count: u32,
    ) -> Result<Vec<String>>;
}

/// Tavily search API client
pub struct TavilyClient {
    client: Client,
    api_key: String,
}

impl TavilyClient {
    /// Create a client with the given API key and request timeout
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ToolError::Config("Tavily API key is empty".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_key })
    }
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    topic: &'static str,
    days: u32,
    max_results: u32,
    search_depth: &'static str,
    include_answer: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl TavilyResponse {
    /// Answer first, then `title\ncontent` per result; blank pieces are dropped
    fn into_fragments(self) -> Vec<String> {
        let answer = self
            .answer
            .filter(|a| !a.trim().is_empty())
            .into_iter();

        let results = self.results.into_iter().filter_map(|r| {
            let title = r.title.trim();
            let content = r.content.trim();
            match (title.is_empty(), content.is_empty()) {
                (true, true) => None,
                (false, true) => Some(title.to_string()),
                (true, false) => Some(content.to_string()),
                (false, false) => Some(format!("{title}\n{content}")),
            }
        });

        answer.chain(results).collect()
    }
}

#[async_trait]
impl NewsSearchClient for TavilyClient {
    #[instrument(skip(self), fields(provider = "tavily"))]
    async fn search(
        &self,
        query: &str,
        window_days: u32,
        result_count: u32,
    ) -> Result<Vec<String>> {
        let request = TavilyRequest {
            query,
            topic: "news",
            days: window_days,
            max_results: result_count,
            search_depth: "advanced",
            include_answer: "advanced",
        };

        let response = self
            .client
            .post(TAVILY_SEARCH_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => ToolError::AuthenticationFailed(format!("Tavily: {body}")),
                429 => ToolError::RateLimited(format!("Tavily: {body}")),
                _ => ToolError::Unavailable(format!("Tavily HTTP {status}: {body}")),
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Unavailable(format!("Failed to parse Tavily response: {e}")))?;

        debug!(results = parsed.results.len(), "Tavily search complete");
        Ok(parsed.into_fragments())
    }
}

/// Financial news search tool (`tav_search`)
pub struct NewsSearchTool {
    client: Arc<dyn NewsSearchClient>,
    window_days: u32,
    result_count: u32,
}

impl NewsSearchTool {
    /// Tool name as the model sees it
    pub const NAME: &'static str = "tav_search";

    /// Create the tool over a search client
    pub fn new(client: Arc<dyn NewsSearchClient>, window_days: u32, result_count: u32) -> Self {
        Self {
            client,
            window_days,
            result_count,
        }
    }
}

#[async_trait]
impl Tool for NewsSearchTool {
    #[instrument(skip(self), fields(tool_name = "tav_search"))]
    async fn invoke(&self, query: &str) -> Result<String> {
        let fragments = self
            .client
            .search(query, self.window_days, self.result_count)
            .await?;

        info!(fragments = fragments.len(), "News search returned");
        Ok(fragments.join("\n\n"))
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Search recent financial news and market coverage. Input is a free-text query."
    }

    fn input_schema(&self) -> Value {
        query_schema("The news search query, exactly as given")
    }
}
