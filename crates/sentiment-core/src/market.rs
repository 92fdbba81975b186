//! Market data: company profile, hourly candles and the chart artifact

use crate::error::{Error, Result};
use crate::indicators::{
    BOLLINGER_PERIOD, BOLLINGER_STD_DEV, BandPoint, RSI_OVERBOUGHT, RSI_OVERSOLD, RSI_PERIOD,
    bollinger_bands, rolling_rsi,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

/// Chart title of the market panel
pub const CHART_TITLE: &str = "Candlestick with RSI on Subplot";

/// Days of hourly candles loaded for the chart
pub const HISTORY_DAYS: i64 = 30;

const CANDLE_INTERVAL: &str = "1h";
const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; ticker-pulse/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// One OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle start
    pub timestamp: DateTime<Utc>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Traded volume
    pub volume: u64,
}

/// Company name and quote currency of a ticker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    /// Symbol as reported by the exchange
    pub symbol: String,
    /// Full company name
    pub long_name: Option<String>,
    /// Quote currency
    pub currency: Option<String>,
}

impl CompanyProfile {
    /// Company name, or the symbol when the name is unknown
    pub fn display_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.symbol)
    }
}

/// Source of company profiles and price history
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Profile of `ticker`; [`Error::InvalidTicker`] when it has no recent quote
    async fn profile(&self, ticker: &str) -> Result<CompanyProfile>;

    /// Hourly candles covering the last [`HISTORY_DAYS`] days, oldest first
    async fn candles(&self, ticker: &str) -> Result<Vec<Candle>>;
}

/// Yahoo Finance market data
pub struct YahooMarketData {
    http: Client,
    timeout: Duration,
    chart_url: String,
}

impl YahooMarketData {
    /// Create a client with a per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::MarketData(e.to_string()))?;

        Ok(Self {
            http,
            timeout,
            chart_url: YAHOO_CHART_URL.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

/// Profile from a one-day chart response; a ticker without quotes is invalid
fn profile_from_chart(ticker: &str, envelope: ChartEnvelope) -> Result<CompanyProfile> {
    if let Some(error) = envelope.chart.error {
        return Err(Error::InvalidTicker(format!("{ticker}: {}", error.description)));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .filter(|result| !result.timestamp.is_empty())
        .ok_or_else(|| Error::InvalidTicker(format!("{ticker}: no recent quotes")))?;

    let meta = result.meta;
    Ok(CompanyProfile {
        symbol: meta.symbol,
        long_name: meta.long_name.or(meta.short_name),
        currency: meta.currency,
    })
}

#[async_trait]
impl MarketDataSource for YahooMarketData {
    #[instrument(skip(self), fields(provider = "yahoo"))]
    async fn profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let response = self
            .http
            .get(format!("{}/{ticker}", self.chart_url))
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| Error::MarketData(format!("Yahoo request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::InvalidTicker(ticker.to_string()));
        }
        if !status.is_success() {
            return Err(Error::MarketData(format!("Yahoo HTTP {status} for {ticker}")));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .map_err(|e| Error::MarketData(format!("Failed to parse Yahoo chart: {e}")))?;

        let profile = profile_from_chart(ticker, envelope)?;
        debug!(name = ?profile.long_name, currency = ?profile.currency, "Company profile loaded");
        Ok(profile)
    }

    #[instrument(skip(self), fields(provider = "yahoo"))]
    async fn candles(&self, ticker: &str) -> Result<Vec<Candle>> {
        let provider =
            yahoo::YahooConnector::new().map_err(|e| Error::MarketData(e.to_string()))?;

        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(HISTORY_DAYS);

        let response = tokio::time::timeout(
            self.timeout,
            provider.get_quote_history_interval(ticker, start, end, CANDLE_INTERVAL),
        )
        .await
        .map_err(|_| Error::MarketData(format!("Yahoo history for {ticker} timed out")))?
        .map_err(|e| Error::MarketData(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| Error::MarketData(e.to_string()))?;

        let candles: Vec<Candle> = quotes
            .iter()
            .filter_map(|q| {
                Some(Candle {
                    timestamp: DateTime::from_timestamp(q.timestamp as i64, 0)?,
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect();

        debug!(candles = candles.len(), "Price history loaded");
        Ok(candles)
    }
}

/// RSI guide levels drawn on the indicator subplot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiGuides {
    /// Upper guide
    pub overbought: f64,
    /// Lower guide
    pub oversold: f64,
}

/// One candle with its indicator values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// The candle
    #[serde(flatten)]
    pub candle: Candle,
    /// RSI, once the look-back window is full
    pub rsi: Option<f64>,
    /// Bollinger bands, once the look-back window is full
    pub bollinger: Option<BandPoint>,
}

/// Everything needed to draw the candlestick chart with its RSI subplot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    /// Ticker charted
    pub ticker: String,
    /// Chart title
    pub title: String,
    /// Price axis label, with the quote currency
    pub price_label: String,
    /// RSI guide levels
    pub rsi_guides: RsiGuides,
    /// Candles with indicators, oldest first
    pub points: Vec<ChartPoint>,
}

impl ChartArtifact {
    /// Compute indicators over `candles` and assemble the chart
    pub fn build(ticker: &str, currency: Option<&str>, candles: Vec<Candle>) -> Result<Self> {
        if candles.is_empty() {
            return Err(Error::MarketData(format!("no price history for {ticker}")));
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let rsi = rolling_rsi(&closes, RSI_PERIOD)?;
        let bands = bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV)?;

        let points = candles
            .into_iter()
            .zip(rsi)
            .zip(bands)
            .map(|((candle, rsi), bollinger)| ChartPoint {
                candle,
                rsi,
                bollinger,
            })
            .collect();

        Ok(Self {
            ticker: ticker.to_string(),
            title: CHART_TITLE.to_string(),
            price_label: currency.map_or_else(|| "Price".to_string(), |c| format!("Price ({c})")),
            rsi_guides: RsiGuides {
                overbought: RSI_OVERBOUGHT,
                oversold: RSI_OVERSOLD,
            },
            points,
        })
    }

    /// The most recent point
    pub fn latest(&self) -> Option<&ChartPoint> {
        self.points.last()
    }
}
