//! Ticker sentiment dashboard
//!
//! # Usage
//!
//! ```bash
//! export TAVILY_API_KEY="..."
//! export REDDIT_CLIENT_ID="..." REDDIT_CLIENT_SECRET="..."
//! export OPENAI_API_BASE="http://localhost:11434/v1"
//!
//! # One analysis
//! cargo run --bin ticker-pulse -- NVDA
//!
//! # Prompt loop
//! cargo run --bin ticker-pulse -- --interactive
//! ```

mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::Args;
use sentiment_core::{DEFAULT_TICKER, Dashboard, presentation};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_tracing(args.log_json);

    let config = Arc::new(args.config()?);
    info!(?config, "Configuration loaded");
    let dashboard = Dashboard::from_config(config)?;

    if args.interactive {
        repl(&dashboard, &args).await
    } else {
        let ticker = args.ticker.as_deref().unwrap_or(DEFAULT_TICKER);
        let output = analyze(&dashboard, ticker, &args).await?;
        println!("{output}");
        Ok(())
    }
}

/// Run one analysis and render it as text or JSON
async fn analyze(dashboard: &Dashboard, ticker: &str, args: &Args) -> anyhow::Result<String> {
    let report = dashboard.analyze(ticker).await?;

    if let Some(path) = &args.chart_out {
        match report.market.chart() {
            Some(chart) => {
                tokio::fs::write(path, serde_json::to_vec_pretty(chart)?)
                    .await
                    .with_context(|| format!("failed to write chart to {}", path.display()))?;
                info!(path = %path.display(), "Chart data written");
            }
            None => eprintln!("Warning: no chart data to write for {}", report.ticker),
        }
    }

    if args.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(presentation::render_report(&report))
    }
}

async fn repl(dashboard: &Dashboard, args: &Args) -> anyhow::Result<()> {
    println!("Ticker sentiment dashboard (model: {})", dashboard.config().model);
    println!("Enter a ticker, an empty line for {DEFAULT_TICKER}, or /exit to quit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("ticker> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        if input == "/exit" {
            println!("Goodbye!");
            break;
        }
        let ticker = if input.is_empty() { DEFAULT_TICKER } else { input };

        match analyze(dashboard, ticker, args).await {
            Ok(output) => println!("{output}\n"),
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    Ok(())
}
