//! Scripted collaborators shared by the unit tests

use crate::error::{Error, Result};
use crate::market::{Candle, CompanyProfile, MarketDataSource};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sentiment_llm::{
    CompletionRequest, CompletionResponse, LLMError, LLMProvider, Message, StopReason, TokenUsage,
};
use sentiment_tools::{Tool, ToolError};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Provider that replays queued responses and records every request
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    responses: Mutex<VecDeque<std::result::Result<CompletionResponse, LLMError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn then(self, response: CompletionResponse) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub(crate) fn then_error(self, error: LLMError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, LLMError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::RequestFailed("script exhausted".to_string())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub(crate) fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(text),
        reasoning: None,
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

pub(crate) fn tool_call_response(id: &str, tool: &str, query: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::tool_call(id, tool, json!({ "query": query })),
        reasoning: None,
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage::default(),
    }
}

/// Tool returning a fixed text and counting calls
pub(crate) struct StaticTool {
    name: &'static str,
    output: std::result::Result<String, String>,
    calls: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl StaticTool {
    pub(crate) fn new(name: &'static str, output: &str) -> Self {
        Self {
            name,
            output: Ok(output.to_string()),
            calls: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(name: &'static str, message: &str) -> Self {
        Self {
            output: Err(message.to_string()),
            ..Self::new(name, "")
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for StaticTool {
    async fn invoke(&self, query: &str) -> sentiment_tools::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());
        self.output
            .clone()
            .map_err(ToolError::Unavailable)
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "static test tool"
    }
}

/// Market data source with a fixed profile and a synthetic price series
pub(crate) struct FakeMarket {
    pub(crate) profile: Option<CompanyProfile>,
    pub(crate) candles: std::result::Result<Vec<Candle>, String>,
}

impl FakeMarket {
    pub(crate) fn new(symbol: &str, name: &str, currency: &str, count: usize) -> Self {
        Self {
            profile: Some(CompanyProfile {
                symbol: symbol.to_string(),
                long_name: Some(name.to_string()),
                currency: Some(currency.to_string()),
            }),
            candles: Ok(sample_candles(count)),
        }
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn profile(&self, ticker: &str) -> Result<CompanyProfile> {
        self.profile
            .clone()
            .ok_or_else(|| Error::InvalidTicker(ticker.to_string()))
    }

    async fn candles(&self, _ticker: &str) -> Result<Vec<Candle>> {
        self.candles.clone().map_err(Error::MarketData)
    }
}

/// Hourly candles with a gently oscillating close
pub(crate) fn sample_candles(count: usize) -> Vec<Candle> {
    let start = DateTime::<Utc>::from_timestamp(1_760_000_000, 0).unwrap_or_default();
    (0..count)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.7).sin() * 3.0 + i as f64 * 0.1;
            Candle {
                timestamp: start + Duration::hours(i as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + i as u64,
            }
        })
        .collect()
}
