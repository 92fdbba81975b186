//! Command-line arguments

use clap::Parser;
use sentiment_core::{AnalysisConfig, ModelChoice};
use std::path::PathBuf;
use std::time::Duration;

/// Sentiment dashboard for a stock ticker
///
/// Credentials come from the environment: TAVILY_API_KEY for news search,
/// REDDIT_CLIENT_ID and REDDIT_CLIENT_SECRET for forum search, OPENAI_API_KEY for
/// the model endpoint.
#[derive(Parser, Debug)]
#[command(name = "ticker-pulse", version)]
pub struct Args {
    /// Ticker to analyze (defaults to EQNR)
    pub ticker: Option<String>,

    /// Prompt for tickers until /exit
    #[arg(short, long, conflicts_with = "ticker")]
    pub interactive: bool,

    /// Model used for extraction and normalization
    #[arg(short, long, env = "PULSE_MODEL", value_enum, default_value_t)]
    pub model: ModelChoice,

    /// Base URL of the OpenAI-compatible model endpoint
    #[arg(long, env = "OPENAI_API_BASE")]
    pub api_base: Option<String>,

    /// Recency window of both searches, in days
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub window_days: Option<u32>,

    /// Maximum news results and forum submissions per search
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub result_limit: Option<u32>,

    /// Maximum top comments per forum submission
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub comment_limit: Option<u32>,

    /// Timeout of every HTTP request, in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: Option<u64>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also write the chart data as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub chart_out: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Environment-backed configuration with the flags applied on top
    pub fn config(&self) -> sentiment_core::Result<AnalysisConfig> {
        let mut builder = AnalysisConfig::builder().with_env().model(self.model);

        if let Some(api_base) = &self.api_base {
            builder = builder.api_base(api_base.clone());
        }
        if let Some(days) = self.window_days {
            builder = builder.search_window_days(days);
        }
        if let Some(limit) = self.result_limit {
            builder = builder.result_limit(limit);
        }
        if let Some(limit) = self.comment_limit {
            builder = builder.comment_limit(limit);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_one_shot() {
        let args = Args::try_parse_from([
            "ticker-pulse",
            "NVDA",
            "--model",
            "llama3.1:8b",
            "--window-days",
            "7",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.ticker.as_deref(), Some("NVDA"));
        assert_eq!(args.model, ModelChoice::Llama31_8b);
        assert_eq!(args.window_days, Some(7));
        assert!(args.json);
        assert!(!args.interactive);
    }

    #[test]
    fn test_rejects_unknown_model_and_zero_limits() {
        assert!(Args::try_parse_from(["ticker-pulse", "--model", "gpt-4"]).is_err());
        assert!(Args::try_parse_from(["ticker-pulse", "--result-limit", "0"]).is_err());
    }

    #[test]
    fn test_interactive_conflicts_with_ticker() {
        assert!(Args::try_parse_from(["ticker-pulse", "NVDA", "--interactive"]).is_err());
        assert!(Args::try_parse_from(["ticker-pulse", "-i"]).unwrap().interactive);
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::try_parse_from([
            "ticker-pulse",
            "--model",
            "qwen3:14b",
            "--comment-limit",
            "3",
            "--timeout-secs",
            "30",
        ])
        .unwrap();
        let config = args.config().unwrap();

        assert_eq!(config.model, ModelChoice::Qwen3_14b);
        assert_eq!(config.comment_limit, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
