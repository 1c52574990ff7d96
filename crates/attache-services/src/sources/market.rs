//! Market data via the Yahoo Finance chart API.

use async_trait::async_trait;
use attache_core::{error::AttacheError, traits::ContextSource};
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::warn;

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Display names for common symbols.
fn symbol_name(symbol: &str) -> &str {
    match symbol {
        "^GSPC" => "S&P 500",
        "^IXIC" => "NASDAQ",
        "^TA125.TA" => "TA-125",
        "NVDA" => "NVIDIA",
        "MSFT" => "Microsoft",
        "GOOGL" => "Google",
        "META" => "Meta",
        "AAPL" => "Apple",
        other => other,
    }
}

#[derive(Debug, Clone)]
struct Quote {
    name: String,
    price: f64,
    change_pct: f64,
    is_index: bool,
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    regular_market_price: f64,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

pub struct MarketSource {
    client: reqwest::Client,
    indices: Vec<String>,
    watchlist: Vec<String>,
}

impl MarketSource {
    pub fn new(indices: Vec<String>, watchlist: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            indices,
            watchlist,
        }
    }

    /// Watchlist plus any ticker the user named in the query.
    fn watch_symbols(&self, query: &str) -> Vec<String> {
        let mut symbols = self.watchlist.clone();
        for ticker in tickers_in_query(query) {
            if !symbols.contains(&ticker) && !self.indices.contains(&ticker) {
                symbols.push(ticker);
            }
        }
        symbols
    }

    async fn fetch_symbol(
        client: &reqwest::Client,
        symbol: &str,
        is_index: bool,
    ) -> Result<Quote, AttacheError> {
        let url = format!("{YAHOO_CHART_URL}/{symbol}?range=1d&interval=1d");
        let resp: ChartResponse = client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await
            .map_err(|e| AttacheError::Service(format!("market fetch {symbol} failed: {e}")))?
            .json()
            .await
            .map_err(|e| AttacheError::Service(format!("market parse {symbol} failed: {e}")))?;

        let meta = resp
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .map(|r| r.meta)
            .ok_or_else(|| AttacheError::Service(format!("market: no data for {symbol}")))?;

        let prev = meta
            .chart_previous_close
            .or(meta.previous_close)
            .unwrap_or(0.0);
        let change_pct = if prev != 0.0 {
            (meta.regular_market_price - prev) / prev * 100.0
        } else {
            0.0
        };

        Ok(Quote {
            name: symbol_name(symbol).to_string(),
            price: meta.regular_market_price,
            change_pct,
            is_index,
        })
    }
}

#[async_trait]
impl ContextSource for MarketSource {
    fn name(&self) -> &str {
        "market"
    }

    async fn fetch(&self, query: &str, _target_date: Option<&str>) -> Result<String, AttacheError> {
        let mut set = JoinSet::new();
        for symbol in &self.indices {
            let client = self.client.clone();
            let symbol = symbol.clone();
            set.spawn(async move { Self::fetch_symbol(&client, &symbol, true).await });
        }
        for symbol in self.watch_symbols(query) {
            let client = self.client.clone();
            set.spawn(async move { Self::fetch_symbol(&client, &symbol, false).await });
        }

        let mut quotes = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(quote)) => quotes.push(quote),
                Ok(Err(e)) => warn!("[market] {e}"),
                Err(e) => warn!("[market] fetch task panicked: {e}"),
            }
        }

        if quotes.is_empty() {
            return Ok("📊 No market data available.".to_string());
        }

        // Indices first, then tickers.
        quotes.sort_by_key(|q| !q.is_index);

        let lines: Vec<String> = quotes.iter().map(format_quote).collect();
        Ok(format!("📊 Market Data (live):\n{}", lines.join("\n")))
    }
}

/// Ticker-like tokens in the query: 2-5 letters, all uppercase.
fn tickers_in_query(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| {
            (2..=5).contains(&w.len()) && w.chars().all(|c| c.is_ascii_uppercase())
        })
        .map(String::from)
        .collect()
}

fn format_quote(q: &Quote) -> String {
    let arrow = if q.change_pct >= 0.0 { "🟢" } else { "🔴" };
    if q.is_index {
        format!("{arrow} {}: {:.0} ({:+.1}%)", q.name, q.price, q.change_pct)
    } else {
        format!("{arrow} {}: ${:.2} ({:+.1}%)", q.name, q.price, q.change_pct)
    }
}
