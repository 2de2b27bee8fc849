//! Last-trade lookups through the Yahoo Finance chart API.

use async_trait::async_trait;
use serde::Deserialize;

use magpie_core::error::{BotError, Result};
use magpie_core::gateway::{StockProvider, StockQuote};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
/// Yahoo rejects requests that do not look like a browser.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; magpie-bot/0.1)";

pub struct YahooFinance {
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    regular_market_price: f64,
    chart_previous_close: f64,
}

impl YahooFinance {
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }
}

fn quote_from(meta: ChartMeta) -> StockQuote {
    let price = meta.regular_market_price;
    let change = price - meta.chart_previous_close;
    let change_percent = if meta.chart_previous_close == 0.0 {
        0.0
    } else {
        change / meta.chart_previous_close * 100.0
    };
    let name = meta
        .long_name
        .or(meta.short_name)
        .unwrap_or_else(|| meta.symbol.clone());
    StockQuote {
        name,
        symbol: meta.symbol,
        price,
        change,
        change_percent,
    }
}

#[async_trait]
impl StockProvider for YahooFinance {
    async fn last_trade(&self, ticker: &str) -> Result<StockQuote> {
        let response = self
            .http
            .get(format!("{CHART_URL}/{ticker}"))
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await
            .map_err(stock_err)?;
        if !response.status().is_success() {
            return Err(BotError::Stock(format!(
                "{ticker}: HTTP {}",
                response.status()
            )));
        }
        let body: ChartResponse = response.json().await.map_err(stock_err)?;
        let result = body
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| BotError::Stock(format!("no data for {ticker}")))?;
        Ok(quote_from(result.meta))
    }
}

fn stock_err(err: reqwest::Error) -> BotError {
    BotError::Stock(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(json: &str) -> ChartMeta {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn change_is_measured_from_the_previous_close() {
        let quote = quote_from(meta(
            r#"{
                "symbol": "PG",
                "longName": "Procter &amp; Gamble",
                "regularMarketPrice": 153.0,
                "chartPreviousClose": 150.0
            }"#,
        ));
        assert_eq!(quote.symbol, "PG");
        assert_eq!(quote.name, "Procter &amp; Gamble");
        assert!((quote.price - 153.0).abs() < 1e-9);
        assert!((quote.change - 3.0).abs() < 1e-9);
        assert!((quote.change_percent - 2.0).abs() < 1e-9);
    }

    #[test]
    fn the_name_falls_back_to_short_name_then_symbol() {
        let quote = quote_from(meta(
            r#"{
                "symbol": "PG",
                "shortName": "Procter & Gamble",
                "regularMarketPrice": 1.0,
                "chartPreviousClose": 1.0
            }"#,
        ));
        assert_eq!(quote.name, "Procter & Gamble");

        let quote = quote_from(meta(
            r#"{"symbol": "PG", "regularMarketPrice": 1.0, "chartPreviousClose": 1.0}"#,
        ));
        assert_eq!(quote.name, "PG");
    }

    #[test]
    fn a_zero_previous_close_does_not_divide() {
        let quote = quote_from(meta(
            r#"{"symbol": "X", "regularMarketPrice": 5.0, "chartPreviousClose": 0.0}"#,
        ));
        assert!((quote.change - 5.0).abs() < 1e-9);
        assert_eq!(quote.change_percent, 0.0);
    }
}
