//! Terminal rendering of analysis results
//!
//! Sections render as Markdown-style text. Failures never show the raw error, only
//! the fixed fallback text of the affected panel.

use crate::market::ChartArtifact;
use crate::pipeline::{AnalysisReport, MarketPanel, PipelineOutcome};
use crate::record::Source;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, Table};
use std::fmt;

/// Heading of the market panel
pub const MARKET_HEADING: &str = "Market Data";

/// Shown instead of the chart when market data failed
pub const MARKET_UNAVAILABLE: &str = "Problem loading market data";

/// Candles listed in the market table
pub const MARKET_TABLE_ROWS: usize = 10;

/// Display model of one source section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionView {
    /// Section heading
    pub heading: &'static str,
    /// Query shown verbatim; absent for a failed pipeline
    pub query: Option<String>,
    /// Summary, or the fixed no-data/unavailable message
    pub summary: String,
    /// Formatted sentiment; suppressed for degenerate records and failures
    pub sentiment: Option<String>,
}

/// Build the display model of a source section
pub fn render_section(source: Source, outcome: &PipelineOutcome) -> SectionView {
    match outcome {
        PipelineOutcome::Completed { record, .. } if record.is_degenerate() => SectionView {
            heading: source.heading(),
            query: Some(record.query().to_string()),
            summary: source.no_data_message().to_string(),
            sentiment: None,
        },
        PipelineOutcome::Completed { record, .. } => SectionView {
            heading: source.heading(),
            query: Some(record.query().to_string()),
            summary: record.summary().to_string(),
            sentiment: record.sentiment().map(|s| format!("{s:.1}")),
        },
        PipelineOutcome::Failed { .. } => SectionView {
            heading: source.heading(),
            query: None,
            summary: source.unavailable_message().to_string(),
            sentiment: None,
        },
    }
}

impl fmt::Display for SectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## {}", self.heading)?;

        let Some(query) = &self.query else {
            return writeln!(f, "\n{}", self.summary);
        };
        writeln!(f, "\n### Query\n{query}")?;
        writeln!(f, "\n### Summary\n{}", self.summary)?;
        if let Some(sentiment) = &self.sentiment {
            writeln!(f, "\n### Sentiment\n{sentiment}")?;
        }
        Ok(())
    }
}

/// Display model of the market panel
#[derive(Debug)]
pub enum MarketView {
    /// Chart loaded
    Chart {
        /// Chart title
        title: String,
        /// Price axis label
        price_label: String,
        /// Latest candles with their indicators
        table: Table,
    },
    /// Market data failed
    Unavailable,
}

/// Build the display model of the market panel
pub fn render_market(panel: &MarketPanel) -> MarketView {
    match panel {
        MarketPanel::Ready { chart } => MarketView::Chart {
            title: chart.title.clone(),
            price_label: chart.price_label.clone(),
            table: candle_table(chart),
        },
        MarketPanel::Failed { .. } => MarketView::Unavailable,
    }
}

fn candle_table(chart: &ChartArtifact) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Time", "Open", "High", "Low", "Close", "RSI", "BB Lower", "BB Middle", "BB Upper",
    ]);

    let skip = chart.points.len().saturating_sub(MARKET_TABLE_ROWS);
    for point in chart.points.iter().skip(skip) {
        let candle = &point.candle;
        let band = point.bollinger.as_ref();
        table.add_row(vec![
            candle.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            price(Some(candle.open)),
            price(Some(candle.high)),
            price(Some(candle.low)),
            price(Some(candle.close)),
            price(point.rsi),
            price(band.map(|b| b.lower)),
            price(band.map(|b| b.middle)),
            price(band.map(|b| b.upper)),
        ]);
    }

    for index in 1..9 {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

fn price(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

impl fmt::Display for MarketView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## {MARKET_HEADING}")?;
        match self {
            Self::Chart {
                title,
                price_label,
                table,
            } => {
                writeln!(f, "\n### {title}")?;
                writeln!(f, "{price_label}")?;
                writeln!(f, "{table}")
            }
            Self::Unavailable => writeln!(f, "\n{MARKET_UNAVAILABLE}"),
        }
    }
}

/// Render a whole report: title, both sections, then the market panel
pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = format!("# {} ({})\n\n", report.company, report.ticker);
    for source in Source::ALL {
        out.push_str(&render_section(source, report.outcome(source)).to_string());
        out.push('\n');
    }
    out.push_str(&render_market(&report.market).to_string());
    out
}
