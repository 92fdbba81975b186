//! Ticker sentiment analysis
//!
//! This crate turns free-form search output into structured sentiment records and
//! renders them next to a market chart. One analysis runs:
//!
//! - A financial pipeline: news search, extraction by the model, normalization
//! - A social pipeline: forum search, extraction by the model, normalization
//! - A market data fetch: hourly candles with RSI and Bollinger bands
//!
//! # Architecture
//!
//! Each pipeline is a [`SourcePipeline`]: an [`ExtractionAgent`] lets the model call
//! its search tool exactly once and write a free-form answer, then the
//! [`StructuredNormalizer`] projects that answer onto a [`ClassificationRecord`].
//! The [`Dashboard`] runs both pipelines and the market fetch concurrently. A failure
//! in one of them is reported in the [`AnalysisReport`] without affecting the others.
//!
//! # Example
//!
//! ```rust,ignore
//! use sentiment_core::{AnalysisConfig, Dashboard, presentation};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(AnalysisConfig::from_env()?);
//!     let dashboard = Dashboard::from_config(config)?;
//!
//!     let report = dashboard.analyze("NVDA").await?;
//!     println!("{}", presentation::render_report(&report));
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extraction;
pub mod indicators;
pub mod market;
pub mod normalizer;
pub mod pipeline;
pub mod presentation;
pub mod prompts;
pub mod record;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AnalysisConfig, AnalysisConfigBuilder, DEFAULT_TICKER, ModelChoice};
pub use error::{Error, ErrorKind, Result};
pub use extraction::{Extraction, ExtractionAgent};
pub use market::{ChartArtifact, CompanyProfile, MarketDataSource, YahooMarketData};
pub use normalizer::StructuredNormalizer;
pub use pipeline::{AnalysisReport, Dashboard, MarketPanel, PipelineOutcome, SourcePipeline};
pub use prompts::InstructionTemplate;
pub use record::{ClassificationRecord, Source};
