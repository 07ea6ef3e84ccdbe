//! Market snapshot
//!
//! Every field is optional. Models read through the accessors below, which
//! substitute the documented default when a field is absent, so a sparse
//! snapshot never fails analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Price used when the snapshot carries none
pub const DEFAULT_PRICE: f64 = 100.0;
/// Volatility used when the snapshot carries none
pub const DEFAULT_VOLATILITY: f64 = 0.02;
/// ATR as a fraction of price when the snapshot carries none
pub const DEFAULT_ATR_PCT: f64 = 0.02;

/// Consensus analyst rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalystRating {
    Buy,
    Sell,
    #[default]
    #[serde(other)]
    Hold,
}

impl fmt::Display for AnalystRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalystRating::Buy => write!(f, "buy"),
            AnalystRating::Hold => write!(f, "hold"),
            AnalystRating::Sell => write!(f, "sell"),
        }
    }
}

/// Recent insider transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsiderActivity {
    Buying,
    Selling,
    #[default]
    #[serde(other)]
    Neutral,
}

impl fmt::Display for InsiderActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsiderActivity::Buying => write!(f, "buying"),
            InsiderActivity::Neutral => write!(f, "neutral"),
            InsiderActivity::Selling => write!(f, "selling"),
        }
    }
}

/// Point-in-time view of a single ticker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    // Technical
    pub price: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub atr: Option<f64>,
    pub volatility: Option<f64>,

    // Fundamental
    pub pe_ratio: Option<f64>,
    pub roe: Option<f64>,
    pub debt_equity: Option<f64>,
    pub revenue_growth: Option<f64>,

    // Sentiment (-1.0 to 1.0)
    pub news_sentiment: Option<f64>,
    pub social_sentiment: Option<f64>,
    pub analyst_rating: Option<AnalystRating>,
    pub insider_activity: Option<InsiderActivity>,
}

impl MarketSnapshot {
    /// Snapshot with only a price set
    pub fn with_price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn price(&self) -> f64 {
        self.price.unwrap_or(DEFAULT_PRICE)
    }

    pub fn sma_20(&self) -> f64 {
        self.sma_20.unwrap_or_else(|| self.price() * 0.98)
    }

    pub fn sma_50(&self) -> f64 {
        self.sma_50.unwrap_or_else(|| self.price() * 0.95)
    }

    pub fn rsi(&self) -> f64 {
        self.rsi.unwrap_or(50.0)
    }

    pub fn macd(&self) -> f64 {
        self.macd.unwrap_or(0.0)
    }

    /// Average true range, defaulting to 2% of price
    pub fn atr(&self) -> f64 {
        self.atr.unwrap_or_else(|| self.price() * DEFAULT_ATR_PCT)
    }

    pub fn volatility(&self) -> f64 {
        self.volatility.unwrap_or(DEFAULT_VOLATILITY)
    }

    pub fn pe_ratio(&self) -> f64 {
        self.pe_ratio.unwrap_or(20.0)
    }

    pub fn roe(&self) -> f64 {
        self.roe.unwrap_or(0.15)
    }

    pub fn debt_equity(&self) -> f64 {
        self.debt_equity.unwrap_or(0.5)
    }

    pub fn revenue_growth(&self) -> f64 {
        self.revenue_growth.unwrap_or(0.05)
    }

    pub fn news_sentiment(&self) -> f64 {
        self.news_sentiment.unwrap_or(0.0)
    }

    pub fn social_sentiment(&self) -> f64 {
        self.social_sentiment.unwrap_or(0.0)
    }

    pub fn analyst_rating(&self) -> AnalystRating {
        self.analyst_rating.unwrap_or_default()
    }

    pub fn insider_activity(&self) -> InsiderActivity {
        self.insider_activity.unwrap_or_default()
    }
}
