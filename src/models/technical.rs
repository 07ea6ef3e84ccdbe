//! Technical model
//!
//! Scores price against its moving averages plus RSI and MACD.

use super::{AccuracyHistory, ScoreMapping, Signal, SignalModel, SignalSource, MODEL_HISTORY_CAPACITY};
use crate::market::MarketSnapshot;

const MAPPING: ScoreMapping = ScoreMapping {
    long_at: 2,
    short_at: -2,
    base: 0.5,
    step: 0.1,
    cap: 0.9,
    neutral_confidence: 0.3,
};

/// Technical analysis model
#[derive(Debug, Clone)]
pub struct TechnicalModel {
    history: AccuracyHistory,
}

impl TechnicalModel {
    pub fn new() -> Self {
        Self {
            history: AccuracyHistory::new(MODEL_HISTORY_CAPACITY),
        }
    }
}

impl Default for TechnicalModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalModel for TechnicalModel {
    fn name(&self) -> &'static str {
        "TechnicalAI"
    }

    fn specialty(&self) -> &'static str {
        "candlestick_patterns"
    }

    fn source(&self) -> SignalSource {
        SignalSource::Technical
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Signal {
        let price = snapshot.price();
        let rsi = snapshot.rsi();
        let macd = snapshot.macd();

        let mut score = 0;
        let mut reasons = Vec::new();

        if price > snapshot.sma_20() {
            score += 1;
            reasons.push("Price above SMA20".to_string());
        }
        if price > snapshot.sma_50() {
            score += 1;
            reasons.push("Price above SMA50".to_string());
        }

        if rsi < 30.0 {
            score += 2;
            reasons.push(format!("RSI oversold ({:.1})", rsi));
        } else if rsi > 70.0 {
            score -= 2;
            reasons.push(format!("RSI overbought ({:.1})", rsi));
        } else {
            reasons.push(format!("RSI neutral ({:.1})", rsi));
        }

        if macd > 0.0 {
            score += 1;
            reasons.push("MACD bullish".to_string());
        } else if macd < 0.0 {
            score -= 1;
            reasons.push("MACD bearish".to_string());
        }

        let (direction, confidence) = MAPPING.map(score);
        Signal::new(direction, confidence, self.source(), reasons.join("; "))
    }

    fn accuracy_history(&self) -> &AccuracyHistory {
        &self.history
    }

    fn record_accuracy(&mut self, accuracy: f64) {
        self.history.push(accuracy);
    }
}
