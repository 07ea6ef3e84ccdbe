//! Snapshot files
//!
//! A snapshot file is a JSON object mapping ticker to snapshot fields:
//! `{"AAPL": {"price": 185.5, "rsi": 58.0}, "MSFT": {}}`.

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::snapshot::{AnalystRating, InsiderActivity, MarketSnapshot};
use crate::error::Result;

/// Read a ticker to snapshot map from a JSON file
pub async fn load_snapshots<P: AsRef<Path>>(path: P) -> Result<HashMap<String, MarketSnapshot>> {
    let path = path.as_ref();
    let data = tokio::fs::read_to_string(path).await?;
    let snapshots = parse_snapshots(&data)?;
    debug!("Loaded {} snapshots from {}", snapshots.len(), path.display());
    Ok(snapshots)
}

/// Parse a ticker to snapshot map; tickers are upper-cased
pub fn parse_snapshots(data: &str) -> Result<HashMap<String, MarketSnapshot>> {
    let raw: HashMap<String, MarketSnapshot> = serde_json::from_str(data)?;
    Ok(raw
        .into_iter()
        .map(|(ticker, snapshot)| (ticker.to_uppercase(), snapshot))
        .collect())
}

/// Built-in large-cap snapshot used when no data is supplied
pub fn sample_snapshot() -> MarketSnapshot {
    MarketSnapshot {
        price: Some(185.50),
        sma_20: Some(182.30),
        sma_50: Some(178.90),
        rsi: Some(58.0),
        macd: Some(1.5),
        atr: Some(3.2),
        volatility: Some(0.02),
        pe_ratio: Some(28.5),
        roe: Some(1.47),
        debt_equity: Some(1.1),
        revenue_growth: Some(0.085),
        news_sentiment: Some(0.4),
        social_sentiment: Some(0.3),
        analyst_rating: Some(AnalystRating::Buy),
        insider_activity: Some(InsiderActivity::Neutral),
    }
}
