//! Source pipelines and the dashboard that runs them
//!
//! A [`SourcePipeline`] is search tool, extraction and normalization for one
//! source. The [`Dashboard`] runs both pipelines and the market data fetch
//! concurrently and isolates their failures: each ends up as an outcome in the
//! [`AnalysisReport`], never as an error of the whole analysis.

use crate::config::AnalysisConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::extraction::ExtractionAgent;
use crate::market::{ChartArtifact, CompanyProfile, MarketDataSource, YahooMarketData};
use crate::normalizer::StructuredNormalizer;
use crate::prompts::{InstructionTemplate, query_for};
use crate::record::{ClassificationRecord, EMPTY_SENTINEL, Source};
use sentiment_llm::LLMProvider;
use sentiment_llm::providers::{OpenAIConfig, OpenAIProvider};
use sentiment_tools::{
    NewsSearchTool, RedditClient, SocialSearchTool, TavilyClient, Tool, ToolInvocation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of one source pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// A record was produced
    Completed {
        /// The record
        record: ClassificationRecord,
        /// Reasoning trace of the extraction, if the model produced one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    /// The pipeline failed
    Failed {
        /// Error category
        kind: ErrorKind,
        /// Error description, for logs and JSON output only
        message: String,
    },
}

impl PipelineOutcome {
    /// Failed outcome describing `error`
    pub fn failed(error: &Error) -> Self {
        Self::Failed {
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// The record, if the pipeline completed
    pub fn record(&self) -> Option<&ClassificationRecord> {
        match self {
            Self::Completed { record, .. } => Some(record),
            Self::Failed { .. } => None,
        }
    }
}

/// Search, extraction and normalization for one source
pub struct SourcePipeline {
    source: Source,
    template: InstructionTemplate,
    tool: Arc<dyn Tool>,
    agent: ExtractionAgent,
    normalizer: StructuredNormalizer,
}

impl SourcePipeline {
    /// Create a pipeline for `source` around its search tool
    pub fn new(
        source: Source,
        tool: Arc<dyn Tool>,
        provider: Arc<dyn LLMProvider>,
        config: Arc<AnalysisConfig>,
    ) -> Self {
        Self {
            source,
            template: InstructionTemplate::for_source(source),
            tool,
            agent: ExtractionAgent::new(provider.clone(), config.clone()),
            normalizer: StructuredNormalizer::new(provider, config),
        }
    }

    /// The source this pipeline serves
    pub fn source(&self) -> Source {
        self.source
    }

    /// Produce a record for `query`, plus the extraction's reasoning trace
    #[instrument(skip(self), fields(source = %self.source))]
    pub async fn run(&self, query: &str) -> Result<(ClassificationRecord, Option<String>)> {
        let extraction = self
            .agent
            .run(&self.template, self.tool.clone(), query)
            .await?;
        let record = self.normalizer.coerce(extraction.reply.answer()).await?;

        // The record reports the query the tool actually ran with
        let ToolInvocation { query: invoked, output } = extraction.invocation;
        if record.query() != invoked {
            warn!(
                reported = %record.query(),
                invoked = %invoked,
                "Model misreported the tool query"
            );
        }

        // Without tool content there is nothing to summarize or score
        let record = if output.trim().is_empty() {
            if !record.is_degenerate() {
                warn!(
                    summary = %record.summary(),
                    "Model summarized an empty tool result, discarding"
                );
            }
            ClassificationRecord::new(invoked, None, EMPTY_SENTINEL)
        } else if record.query() == invoked {
            record
        } else {
            ClassificationRecord::new(invoked, record.sentiment(), record.summary())
        };

        info!(
            degenerate = record.is_degenerate(),
            sentiment = ?record.sentiment(),
            "Record produced"
        );
        Ok((record, extraction.reply.reasoning().map(str::to_string)))
    }

    /// Like [`run`](Self::run), with the error folded into the outcome
    pub async fn outcome(&self, query: &str) -> PipelineOutcome {
        match self.run(query).await {
            Ok((record, reasoning)) => PipelineOutcome::Completed { record, reasoning },
            Err(e) => {
                warn!(source = %self.source, kind = %e.kind(), error = %e, "Pipeline failed");
                PipelineOutcome::failed(&e)
            }
        }
    }
}

/// Result of the market data fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MarketPanel {
    /// Chart ready to draw
    Ready {
        /// The chart
        chart: ChartArtifact,
    },
    /// Fetch or indicator computation failed
    Failed {
        /// Error category
        kind: ErrorKind,
        /// Error description
        message: String,
    },
}

impl MarketPanel {
    /// The chart, if it loaded
    pub fn chart(&self) -> Option<&ChartArtifact> {
        match self {
            Self::Ready { chart } => Some(chart),
            Self::Failed { .. } => None,
        }
    }
}

/// Everything one analysis produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Ticker analyzed
    pub ticker: String,
    /// Company name used in the queries
    pub company: String,
    /// Quote currency, if known
    pub currency: Option<String>,
    /// Model used
    pub model: String,
    /// Financial news pipeline
    pub financial: PipelineOutcome,
    /// Social media pipeline
    pub social: PipelineOutcome,
    /// Market data panel
    pub market: MarketPanel,
}

impl AnalysisReport {
    /// Outcome of a source
    pub fn outcome(&self, source: Source) -> &PipelineOutcome {
        match source {
            Source::Financial => &self.financial,
            Source::Social => &self.social,
        }
    }
}

/// Runs complete ticker analyses
pub struct Dashboard {
    config: Arc<AnalysisConfig>,
    market: Arc<dyn MarketDataSource>,
    financial: std::result::Result<SourcePipeline, Error>,
    social: std::result::Result<SourcePipeline, Error>,
}

impl Dashboard {
    /// Assemble a dashboard from ready collaborators
    pub fn new(
        config: Arc<AnalysisConfig>,
        provider: Arc<dyn LLMProvider>,
        news_tool: Arc<dyn Tool>,
        social_tool: Arc<dyn Tool>,
        market: Arc<dyn MarketDataSource>,
    ) -> Self {
        Self {
            financial: Ok(SourcePipeline::new(
                Source::Financial,
                news_tool,
                provider.clone(),
                config.clone(),
            )),
            social: Ok(SourcePipeline::new(
                Source::Social,
                social_tool,
                provider,
                config.clone(),
            )),
            config,
            market,
        }
    }

    /// Build the production clients from `config`
    ///
    /// A source whose credentials are missing is kept but reports a configuration
    /// failure on every analysis; the other source and the market panel still work.
    pub fn from_config(config: Arc<AnalysisConfig>) -> Result<Self> {
        config.validate()?;

        let supported = crate::config::ModelChoice::ALL
            .iter()
            .map(|m| m.id().to_string())
            .collect();
        let provider: Arc<dyn LLMProvider> = Arc::new(OpenAIProvider::with_config(
            OpenAIConfig::new(config.api_key.clone())
                .with_api_base(config.api_base.clone())
                .with_timeout(config.request_timeout)
                .with_supported_models(supported),
        )?);

        let news_tool = config.require_tavily_key().and_then(|key| {
            let client = TavilyClient::new(key, config.request_timeout)?;
            Ok(Arc::new(NewsSearchTool::new(
                Arc::new(client),
                config.search_window_days,
                config.result_limit,
            )) as Arc<dyn Tool>)
        });

        let social_tool = config.require_reddit().and_then(|credentials| {
            let client = RedditClient::new(
                credentials.client_id.clone(),
                credentials.client_secret.clone(),
                config.request_timeout,
                config.forum_requests_per_minute,
            )?;
            Ok(Arc::new(SocialSearchTool::new(
                Arc::new(client),
                config.communities.clone(),
                config.search_window_days,
                config.result_limit,
                config.comment_limit,
            )) as Arc<dyn Tool>)
        });

        for (source, tool) in [(Source::Financial, &news_tool), (Source::Social, &social_tool)] {
            if let Err(e) = tool {
                warn!(source = %source, error = %e, "Source disabled");
            }
        }

        let market = Arc::new(YahooMarketData::new(config.request_timeout)?);

        let pipeline = |source, tool: Result<Arc<dyn Tool>>| {
            tool.map(|tool| SourcePipeline::new(source, tool, provider.clone(), config.clone()))
        };

        Ok(Self {
            financial: pipeline(Source::Financial, news_tool),
            social: pipeline(Source::Social, social_tool),
            config: config.clone(),
            market,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `ticker`
    ///
    /// Fails only for an invalid ticker. When the profile lookup itself fails the
    /// ticker stands in for the company name.
    #[instrument(skip(self), fields(model = %self.config.model))]
    pub async fn analyze(&self, ticker: &str) -> Result<AnalysisReport> {
        let ticker = normalize_ticker(ticker)?;

        let profile = match self.market.profile(&ticker).await {
            Ok(profile) => profile,
            Err(e @ Error::InvalidTicker(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Company lookup failed, using the ticker as company name");
                CompanyProfile {
                    symbol: ticker.clone(),
                    long_name: None,
                    currency: None,
                }
            }
        };
        let company = profile.display_name().to_string();
        info!(ticker = %ticker, company = %company, "Analysis started");

        let (financial, social, market) = tokio::join!(
            self.source_outcome(Source::Financial, &ticker, &company),
            self.source_outcome(Source::Social, &ticker, &company),
            self.market_panel(&ticker, profile.currency.as_deref()),
        );

        Ok(AnalysisReport {
            ticker,
            company,
            currency: profile.currency,
            model: self.config.model.id().to_string(),
            financial,
            social,
            market,
        })
    }

    async fn source_outcome(&self, source: Source, ticker: &str, company: &str) -> PipelineOutcome {
        let pipeline = match source {
            Source::Financial => &self.financial,
            Source::Social => &self.social,
        };

        match pipeline {
            Ok(pipeline) => pipeline.outcome(&query_for(source, ticker, company)).await,
            Err(e) => PipelineOutcome::failed(e),
        }
    }

    async fn market_panel(&self, ticker: &str, currency: Option<&str>) -> MarketPanel {
        let chart = match self.market.candles(ticker).await {
            Ok(candles) => ChartArtifact::build(ticker, currency, candles),
            Err(e) => Err(e),
        };

        match chart {
            Ok(chart) => MarketPanel::Ready { chart },
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "Market data failed");
                MarketPanel::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Trim and upper-case a ticker; empty or space-containing input is invalid
pub fn normalize_ticker(ticker: &str) -> Result<String> {
    let ticker = ticker.trim();
    if ticker.is_empty() || ticker.contains(char::is_whitespace) {
        return Err(Error::InvalidTicker(format!("'{ticker}'")));
    }
    Ok(ticker.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeMarket, ScriptedProvider, StaticTool, text_response, tool_call_response,
    };
    use tokio_test::{assert_err, assert_ok};

    const FINANCIAL_QUERY: &str =
        "What are the most relevant financial news about NVDA or NVIDIA Corporation?";

    fn config() -> Arc<AnalysisConfig> {
        Arc::new(AnalysisConfig::default())
    }

    #[tokio::test]
    async fn test_pipeline_produces_record() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(tool_call_response("c1", "tav_search", FINANCIAL_QUERY))
                .then(text_response(&format!(
                    "<think>ok</think>-Query: {FINANCIAL_QUERY}\n-Sentiment: 4.0\n-Summary: Record revenue"
                )))
                .then(text_response(&format!(
                    r#"{{"query": "{FINANCIAL_QUERY}", "sentiment": 4.0, "summary": "Record revenue"}}"#
                ))),
        );
        let tool = Arc::new(StaticTool::new("tav_search", "NVDA reports record revenue"));
        let pipeline = SourcePipeline::new(Source::Financial, tool, provider.clone(), config());

        let (record, reasoning) = pipeline.run(FINANCIAL_QUERY).await.unwrap();

        assert_eq!(record.query(), FINANCIAL_QUERY);
        assert_eq!(record.sentiment(), Some(4.0));
        assert_eq!(record.summary(), "Record revenue");
        assert_eq!(reasoning.as_deref(), Some("ok"));

        // The normalizer sees only the text after the reasoning marker
        let normalizer_request = &provider.requests()[2];
        assert_eq!(
            normalizer_request.messages[0].text().unwrap(),
            format!("-Query: {FINANCIAL_QUERY}\n-Sentiment: 4.0\n-Summary: Record revenue")
        );
    }

    #[tokio::test]
    async fn test_misreported_query_replaced_by_invocation() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(tool_call_response("c1", "reddit_tool", "NVDA OR NVIDIA Corporation"))
                .then(text_response("-Query: NVDA\n-Sentiment: 2.0\n-Summary: Bearish chatter"))
                .then(text_response(
                    r#"{"query": "NVDA", "sentiment": 2.0, "summary": "Bearish chatter"}"#,
                )),
        );
        let tool = Arc::new(StaticTool::new("reddit_tool", "sell everything"));
        let pipeline = SourcePipeline::new(Source::Social, tool, provider, config());

        let (record, _) = pipeline.run("NVDA OR NVIDIA Corporation").await.unwrap();
        assert_eq!(record.query(), "NVDA OR NVIDIA Corporation");
        assert_eq!(record.sentiment(), Some(2.0));
    }

    #[tokio::test]
    async fn test_empty_news_gives_degenerate_record() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(tool_call_response("c1", "tav_search", FINANCIAL_QUERY))
                .then(text_response(&format!(
                    "-Query: {FINANCIAL_QUERY}\n-Sentiment: \n-Summary: empty"
                )))
                .then(text_response(&format!(
                    r#"{{"query": "{FINANCIAL_QUERY}", "sentiment": null, "summary": "empty"}}"#
                ))),
        );
        let tool = Arc::new(StaticTool::new("tav_search", ""));
        let pipeline = SourcePipeline::new(Source::Financial, tool, provider, config());

        let outcome = pipeline.outcome(FINANCIAL_QUERY).await;
        let record = outcome.record().unwrap();
        assert!(record.is_degenerate());
        assert_eq!(record.query(), FINANCIAL_QUERY);
    }

    #[tokio::test]
    async fn test_invented_summary_of_empty_news_is_discarded() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(tool_call_response("c1", "tav_search", FINANCIAL_QUERY))
                .then(text_response(&format!(
                    "-Query: {FINANCIAL_QUERY}\n-Sentiment: 4.5\n-Summary: Record revenue and strong guidance"
                )))
                .then(text_response(&format!(
                    r#"{{"query": "{FINANCIAL_QUERY}", "sentiment": 4.5, "summary": "Record revenue and strong guidance"}}"#
                ))),
        );
        let tool = Arc::new(StaticTool::new("tav_search", "  \n"));
        let pipeline = SourcePipeline::new(Source::Financial, tool, provider, config());

        let outcome = pipeline.outcome(FINANCIAL_QUERY).await;
        let record = outcome.record().unwrap();
        assert!(record.is_degenerate());
        assert_eq!(record.summary(), EMPTY_SENTINEL);
        assert_eq!(record.sentiment(), None);
        assert_eq!(record.query(), FINANCIAL_QUERY);

        let view = crate::presentation::render_section(Source::Financial, &outcome);
        assert_eq!(view.summary, "No financial news was retrieved for the ticker.");
        assert_eq!(view.sentiment, None);
    }

    #[tokio::test]
    async fn test_pipeline_failure_becomes_outcome() {
        let provider =
            Arc::new(ScriptedProvider::new().then(text_response("-Summary: made up")));
        let tool = Arc::new(StaticTool::new("tav_search", "unused"));
        let pipeline = SourcePipeline::new(Source::Financial, tool, provider, config());

        match pipeline.outcome(FINANCIAL_QUERY).await {
            PipelineOutcome::Failed { kind, .. } => assert_eq!(kind, ErrorKind::ToolNotInvoked),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dashboard_isolates_failures() {
        // Scripted collaborators never suspend, so join! completes the financial
        // pipeline before the social one starts
        let provider = Arc::new(
            ScriptedProvider::new()
                .then(tool_call_response("f1", "tav_search", FINANCIAL_QUERY))
                .then(text_response("-Query: q\n-Sentiment: 3.5\n-Summary: Solid quarter"))
                .then(text_response(
                    r#"{"query": "q", "sentiment": 3.5, "summary": "Solid quarter"}"#,
                ))
                .then(tool_call_response("s1", "reddit_tool", "NVDA OR NVIDIA Corporation")),
        );
        let news = Arc::new(StaticTool::new("tav_search", "news"));
        let social = Arc::new(StaticTool::failing("reddit_tool", "HTTP 503"));
        let market = Arc::new(FakeMarket::new("NVDA", "NVIDIA Corporation", "USD", 48));

        let dashboard = Dashboard::new(config(), provider, news, social, market);
        let report = dashboard.analyze(" nvda ").await.unwrap();

        assert_eq!(report.ticker, "NVDA");
        assert_eq!(report.company, "NVIDIA Corporation");
        assert_eq!(report.model, "qwen3:8b");
        let financial = report.outcome(Source::Financial).record().unwrap();
        assert_eq!(financial.query(), FINANCIAL_QUERY);
        assert_eq!(financial.sentiment(), Some(3.5));
        assert!(matches!(
            report.outcome(Source::Social),
            PipelineOutcome::Failed { kind: ErrorKind::ToolUnavailable, .. }
        ));
        assert!(report.market.chart().is_some());
        assert_eq!(report.market.chart().unwrap().price_label, "Price (USD)");
    }

    #[tokio::test]
    async fn test_dashboard_rejects_unknown_ticker() {
        let market = Arc::new(FakeMarket {
            profile: None,
            ..FakeMarket::new("X", "X", "USD", 1)
        });
        let provider = Arc::new(ScriptedProvider::new());
        let dashboard = Dashboard::new(
            config(),
            provider.clone(),
            Arc::new(StaticTool::new("tav_search", "")),
            Arc::new(StaticTool::new("reddit_tool", "")),
            market,
        );

        assert!(matches!(dashboard.analyze("ZZZZ").await, Err(Error::InvalidTicker(_))));
        assert!(matches!(dashboard.analyze("   ").await, Err(Error::InvalidTicker(_))));
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_market_failure_is_panel_outcome() {
        let market = Arc::new(FakeMarket {
            candles: Err("HTTP 429".to_string()),
            ..FakeMarket::new("EQNR", "Equinor ASA", "NOK", 0)
        });
        let dashboard = Dashboard::new(
            config(),
            Arc::new(ScriptedProvider::new()),
            Arc::new(StaticTool::new("tav_search", "")),
            Arc::new(StaticTool::new("reddit_tool", "")),
            market,
        );

        let report = dashboard.analyze("EQNR").await.unwrap();
        assert!(matches!(
            report.market,
            MarketPanel::Failed { kind: ErrorKind::MarketData, .. }
        ));
        // The scripted provider has nothing queued, so both pipelines fail too
        assert!(report.financial.record().is_none());
        assert!(report.social.record().is_none());
    }

    #[test]
    fn test_from_config_without_credentials() {
        let dashboard = assert_ok!(Dashboard::from_config(config()));
        assert!(matches!(dashboard.financial, Err(Error::Config(_))));
        assert!(matches!(dashboard.social, Err(Error::Config(_))));
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" eqnr ").unwrap(), "EQNR");
        assert_eq!(normalize_ticker("eqnr.ol").unwrap(), "EQNR.OL");
        assert_err!(normalize_ticker(""));
        assert_err!(normalize_ticker("EQ NR"));
    }

    #[test]
    fn test_report_serialization() {
        let outcome = PipelineOutcome::Completed {
            record: ClassificationRecord::new("q", Some(1.5), "Weak guidance"),
            reasoning: None,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["record"]["sentiment"], 1.5);
        assert!(value.get("reasoning").is_none());

        let failed = PipelineOutcome::failed(&Error::SchemaCoercion("bad".to_string()));
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["kind"], "schema_coercion");
    }
}
