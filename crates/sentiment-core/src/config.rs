//! Configuration for ticker analysis
//!
//! [`AnalysisConfig`] is built once (defaults, then environment, then explicit
//! overrides) and shared by `Arc` with every component. Nothing here is read from or
//! written to process-global state after construction.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sentiment_tools::social::DEFAULT_COMMUNITIES;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Ticker analyzed when none is given
pub const DEFAULT_TICKER: &str = "EQNR";

const DEFAULT_API_BASE: &str = "http://localhost:11434/v1";
const DEFAULT_API_KEY: &str = "ollama";

/// Language models offered for analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ModelChoice {
    /// Qwen 3, 8B parameters
    #[default]
    #[serde(rename = "qwen3:8b")]
    #[cfg_attr(feature = "clap", value(name = "qwen3:8b"))]
    Qwen3_8b,
    /// Qwen 3, 14B parameters
    #[serde(rename = "qwen3:14b")]
    #[cfg_attr(feature = "clap", value(name = "qwen3:14b"))]
    Qwen3_14b,
    /// Llama 3.1, 8B parameters
    #[serde(rename = "llama3.1:8b")]
    #[cfg_attr(feature = "clap", value(name = "llama3.1:8b"))]
    Llama31_8b,
    /// Mistral NeMo
    #[serde(rename = "mistral-nemo")]
    #[cfg_attr(feature = "clap", value(name = "mistral-nemo"))]
    MistralNemo,
}

impl ModelChoice {
    /// Every supported model
    pub const ALL: [ModelChoice; 4] = [
        ModelChoice::Qwen3_8b,
        ModelChoice::Qwen3_14b,
        ModelChoice::Llama31_8b,
        ModelChoice::MistralNemo,
    ];

    /// Model identifier sent to the provider
    pub fn id(self) -> &'static str {
        match self {
            Self::Qwen3_8b => "qwen3:8b",
            Self::Qwen3_14b => "qwen3:14b",
            Self::Llama31_8b => "llama3.1:8b",
            Self::MistralNemo => "mistral-nemo",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ModelChoice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.id() == s.trim())
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|m| m.id()).collect();
                Error::Config(format!("Unknown model '{s}', expected one of {known:?}"))
            })
    }
}

/// Reddit script-app credentials
#[derive(Clone, PartialEq, Eq)]
pub struct RedditCredentials {
    /// Client id
    pub client_id: String,
    /// Client secret
    pub client_secret: String,
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Configuration for one analysis session
#[derive(Clone, Serialize)]
pub struct AnalysisConfig {
    /// Model used for both extraction and normalization
    pub model: ModelChoice,

    /// Base URL of the OpenAI-compatible model endpoint
    pub api_base: String,

    /// API key for the model endpoint
    #[serde(skip)]
    pub api_key: String,

    /// Sampling temperature for every model call
    pub temperature: f32,

    /// Token limit per model call
    pub max_tokens: usize,

    /// Model round trips allowed in one extraction run
    pub max_iterations: usize,

    /// Recency window of both searches, in days
    pub search_window_days: u32,

    /// Maximum news results and forum submissions per search
    pub result_limit: u32,

    /// Maximum top comments loaded per submission
    pub comment_limit: u32,

    /// Forum communities searched, in order
    pub communities: Vec<String>,

    /// Timeout applied to every HTTP request (tools, model and market data)
    pub request_timeout: Duration,

    /// Pacing quota for the forum API
    pub forum_requests_per_minute: u32,

    /// Tavily API key
    #[serde(skip)]
    pub tavily_api_key: Option<String>,

    /// Reddit credentials
    #[serde(skip)]
    pub reddit: Option<RedditCredentials>,
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_iterations", &self.max_iterations)
            .field("search_window_days", &self.search_window_days)
            .field("result_limit", &self.result_limit)
            .field("comment_limit", &self.comment_limit)
            .field("communities", &self.communities)
            .field("request_timeout", &self.request_timeout)
            .field("forum_requests_per_minute", &self.forum_requests_per_minute)
            .field("tavily_api_key", &self.tavily_api_key.as_ref().map(|_| "<redacted>"))
            .field("reddit", &self.reddit)
            .finish_non_exhaustive()
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: ModelChoice::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            max_iterations: 4,
            search_window_days: 30,
            result_limit: 5,
            comment_limit: 10,
            communities: DEFAULT_COMMUNITIES.iter().map(ToString::to_string).collect(),
            request_timeout: Duration::from_secs(120),
            forum_requests_per_minute: 60,
            tavily_api_key: None,
            reddit: None,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Defaults overlaid with environment variables
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(Error::Config("api_base must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be within [0.0, 2.0], got {}",
                self.temperature
            )));
        }

        // One round trip for the tool call, one for the answer
        if self.max_iterations < 2 {
            return Err(Error::Config(
                "max_iterations must be at least 2".to_string(),
            ));
        }

        if self.search_window_days == 0 || self.result_limit == 0 || self.comment_limit == 0 {
            return Err(Error::Config(
                "search_window_days, result_limit and comment_limit must be greater than 0"
                    .to_string(),
            ));
        }

        if self.communities.is_empty() {
            return Err(Error::Config(
                "at least one community is required".to_string(),
            ));
        }

        // Each name becomes a path segment of the forum search URL
        if let Some(bad) = self
            .communities
            .iter()
            .find(|c| c.is_empty() || c.contains(|ch: char| ch.is_whitespace() || ch == '/'))
        {
            return Err(Error::Config(format!("invalid community name {bad:?}")));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// The Tavily key, required by the financial pipeline
    pub fn require_tavily_key(&self) -> Result<&str> {
        self.tavily_api_key
            .as_deref()
            .ok_or_else(|| Error::Config("TAVILY_API_KEY is not set".to_string()))
    }

    /// The Reddit credentials, required by the social pipeline
    pub fn require_reddit(&self) -> Result<&RedditCredentials> {
        self.reddit.as_ref().ok_or_else(|| {
            Error::Config("REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET are not set".to_string())
        })
    }
}

/// Builder for AnalysisConfig
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    model: Option<ModelChoice>,
    api_base: Option<String>,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    max_iterations: Option<usize>,
    search_window_days: Option<u32>,
    result_limit: Option<u32>,
    comment_limit: Option<u32>,
    communities: Option<Vec<String>>,
    request_timeout: Option<Duration>,
    forum_requests_per_minute: Option<u32>,
    tavily_api_key: Option<String>,
    reddit_client_id: Option<String>,
    reddit_client_secret: Option<String>,
    env_model: Option<String>,
}

impl AnalysisConfigBuilder {
    /// Set the model
    pub fn model(mut self, model: ModelChoice) -> Self {
        self.model = Some(model);
        self
    }

    /// Set the model endpoint
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set the model API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the sampling temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the token limit per call
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the round-trip limit of an extraction run
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Set the search recency window
    pub fn search_window_days(mut self, days: u32) -> Self {
        self.search_window_days = Some(days);
        self
    }

    /// Set the result limit
    pub fn result_limit(mut self, limit: u32) -> Self {
        self.result_limit = Some(limit);
        self
    }

    /// Set the comment limit
    pub fn comment_limit(mut self, limit: u32) -> Self {
        self.comment_limit = Some(limit);
        self
    }

    /// Set the forum communities
    pub fn communities(mut self, communities: Vec<String>) -> Self {
        self.communities = Some(communities);
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the forum pacing quota
    pub fn forum_requests_per_minute(mut self, rpm: u32) -> Self {
        self.forum_requests_per_minute = Some(rpm);
        self
    }

    /// Set the Tavily API key
    pub fn tavily_api_key(mut self, key: impl Into<String>) -> Self {
        self.tavily_api_key = Some(key.into());
        self
    }

    /// Set the Reddit credentials
    pub fn reddit_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.reddit_client_id = Some(client_id.into());
        self.reddit_client_secret = Some(client_secret.into());
        self
    }

    /// Load credentials and endpoint settings from the environment
    ///
    /// Reads `TAVILY_API_KEY`, `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`,
    /// `OPENAI_API_BASE`, `OPENAI_API_KEY` and `PULSE_MODEL`. Values already set on
    /// the builder win over the environment.
    pub fn with_env(self) -> Self {
        self.with_vars(|name| std::env::var(name).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        self.tavily_api_key = self.tavily_api_key.or_else(|| var("TAVILY_API_KEY"));
        self.reddit_client_id = self.reddit_client_id.or_else(|| var("REDDIT_CLIENT_ID"));
        self.reddit_client_secret = self
            .reddit_client_secret
            .or_else(|| var("REDDIT_CLIENT_SECRET"));
        self.api_base = self.api_base.or_else(|| var("OPENAI_API_BASE"));
        self.api_key = self.api_key.or_else(|| var("OPENAI_API_KEY"));
        self.env_model = var("PULSE_MODEL");
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalysisConfig> {
        let defaults = AnalysisConfig::default();

        let model = match (self.model, self.env_model) {
            (Some(model), _) => model,
            (None, Some(name)) => name.parse()?,
            (None, None) => defaults.model,
        };

        let reddit = match (self.reddit_client_id, self.reddit_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(RedditCredentials {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "Reddit client id and secret must be given together".to_string(),
                ));
            }
        };

        let config = AnalysisConfig {
            model,
            api_base: self.api_base.unwrap_or(defaults.api_base),
            api_key: self.api_key.unwrap_or(defaults.api_key),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            search_window_days: self.search_window_days.unwrap_or(defaults.search_window_days),
            result_limit: self.result_limit.unwrap_or(defaults.result_limit),
            comment_limit: self.comment_limit.unwrap_or(defaults.comment_limit),
            communities: self.communities.unwrap_or(defaults.communities),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            forum_requests_per_minute: self
                .forum_requests_per_minute
                .unwrap_or(defaults.forum_requests_per_minute),
            tavily_api_key: self.tavily_api_key,
            reddit,
        };

        config.validate()?;
        Ok(config)
    }
}
