//! Sentiment model
//!
//! Scores news and social tone, the analyst rating and insider flow.

use super::{AccuracyHistory, ScoreMapping, Signal, SignalModel, SignalSource, MODEL_HISTORY_CAPACITY};
use crate::market::{AnalystRating, InsiderActivity, MarketSnapshot};

const MAPPING: ScoreMapping = ScoreMapping {
    long_at: 2,
    short_at: -2,
    base: 0.4,
    step: 0.1,
    cap: 0.80,
    neutral_confidence: 0.3,
};

/// Market sentiment model
#[derive(Debug, Clone)]
pub struct SentimentModel {
    history: AccuracyHistory,
}

impl SentimentModel {
    pub fn new() -> Self {
        Self {
            history: AccuracyHistory::new(MODEL_HISTORY_CAPACITY),
        }
    }
}

impl Default for SentimentModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalModel for SentimentModel {
    fn name(&self) -> &'static str {
        "SentimentAI"
    }

    fn specialty(&self) -> &'static str {
        "news_social_media"
    }

    fn source(&self) -> SignalSource {
        SignalSource::Sentiment
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Signal {
        let news = snapshot.news_sentiment();
        let social = snapshot.social_sentiment();

        let mut score = 0;
        let mut reasons = Vec::new();

        if news > 0.3 {
            score += 2;
            reasons.push("Positive news sentiment");
        } else if news < -0.3 {
            score -= 2;
            reasons.push("Negative news sentiment");
        } else {
            reasons.push("Neutral news");
        }

        if social > 0.4 {
            score += 1;
            reasons.push("Bullish social media");
        } else if social < -0.4 {
            score -= 1;
            reasons.push("Bearish social media");
        }

        match snapshot.analyst_rating() {
            AnalystRating::Buy => {
                score += 1;
                reasons.push("Analyst: Buy");
            }
            AnalystRating::Sell => {
                score -= 1;
                reasons.push("Analyst: Sell");
            }
            AnalystRating::Hold => {}
        }

        // Insider buying is weighted more heavily than selling
        match snapshot.insider_activity() {
            InsiderActivity::Buying => {
                score += 2;
                reasons.push("Insider buying");
            }
            InsiderActivity::Selling => {
                score -= 1;
                reasons.push("Insider selling");
            }
            InsiderActivity::Neutral => {}
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
