//! Fundamental model
//!
//! Scores valuation, profitability, leverage and growth.

use super::{AccuracyHistory, ScoreMapping, Signal, SignalModel, SignalSource, MODEL_HISTORY_CAPACITY};
use crate::market::MarketSnapshot;

const MAPPING: ScoreMapping = ScoreMapping {
    long_at: 3,
    short_at: -2,
    base: 0.5,
    step: 0.08,
    cap: 0.85,
    neutral_confidence: 0.4,
};

/// Fundamental analysis model
#[derive(Debug, Clone)]
pub struct FundamentalModel {
    history: AccuracyHistory,
}

impl FundamentalModel {
    pub fn new() -> Self {
        Self {
            history: AccuracyHistory::new(MODEL_HISTORY_CAPACITY),
        }
    }
}

impl Default for FundamentalModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalModel for FundamentalModel {
    fn name(&self) -> &'static str {
        "FundamentalAI"
    }

    fn specialty(&self) -> &'static str {
        "financial_statements"
    }

    fn source(&self) -> SignalSource {
        SignalSource::Fundamental
    }

    fn analyze(&self, snapshot: &MarketSnapshot) -> Signal {
        let pe_ratio = snapshot.pe_ratio();
        let roe = snapshot.roe();
        let debt_equity = snapshot.debt_equity();
        let revenue_growth = snapshot.revenue_growth();

        let mut score = 0;
        let mut reasons = Vec::new();

        // Valuation
        if pe_ratio < 15.0 {
            score += 2;
            reasons.push(format!("Undervalued P/E ({:.1})", pe_ratio));
        } else if pe_ratio > 30.0 {
            score -= 1;
            reasons.push(format!("High P/E ({:.1})", pe_ratio));
        } else {
            reasons.push(format!("Fair P/E ({:.1})", pe_ratio));
        }

        // Profitability
        if roe > 0.20 {
            score += 2;
            reasons.push(format!("Strong ROE ({:.1}%)", roe * 100.0));
        } else if roe > 0.10 {
            score += 1;
            reasons.push(format!("Good ROE ({:.1}%)", roe * 100.0));
        } else if roe < 0.0 {
            score -= 2;
            reasons.push(format!("Negative ROE ({:.1}%)", roe * 100.0));
        }

        // Leverage
        if debt_equity < 0.5 {
            score += 1;
            reasons.push("Low debt".to_string());
        } else if debt_equity > 2.0 {
            score -= 1;
            reasons.push("High debt".to_string());
        }

        // Growth
        if revenue_growth > 0.15 {
            score += 2;
            reasons.push(format!("Strong growth ({:.1}%)", revenue_growth * 100.0));
        } else if revenue_growth > 0.05 {
            score += 1;
            reasons.push(format!("Moderate growth ({:.1}%)", revenue_growth * 100.0));
        } else if revenue_growth < 0.0 {
            score -= 1;
            reasons.push(format!("Declining revenue ({:.1}%)", revenue_growth * 100.0));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    #[test]
    fn test_quality_value_stock() {
        let snapshot = MarketSnapshot {
            pe_ratio: Some(12.0),
            roe: Some(0.25),
            debt_equity: Some(0.3),
            revenue_growth: Some(0.20),
            ..Default::default()
        };

        // 2 + 2 + 1 + 2 = 7, 0.5 + 0.56 capped at 0.85
        let signal = FundamentalModel::new().analyze(&snapshot);
        assert_eq!(signal.direction, Direction::Long);
        assert!((signal.confidence - 0.85).abs() < 1e-9);
        assert!(signal.reasoning.contains("Undervalued P/E (12.0)"));
        assert!(signal.reasoning.contains("Strong ROE (25.0%)"));
    }

    #[test]
    fn test_distressed_stock() {
        let snapshot = MarketSnapshot {
            pe_ratio: Some(45.0),
            roe: Some(-0.05),
            debt_equity: Some(3.0),
            revenue_growth: Some(-0.10),
            ..Default::default()
        };

        // -1 - 2 - 1 - 1 = -5, 0.5 + 0.40 capped at 0.85
        let signal = FundamentalModel::new().analyze(&snapshot);
        assert_eq!(signal.direction, Direction::Short);
        assert!((signal.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_defaults_are_neutral() {
        // Fair P/E, good ROE, debt exactly 0.5, growth exactly 0.05: score 1
        let signal = FundamentalModel::new().analyze(&MarketSnapshot::default());
        assert_eq!(signal.direction, Direction::Neutral);
        assert_eq!(signal.confidence, 0.4);
    }

    #[test]
    fn test_long_threshold_is_three() {
        let snapshot = MarketSnapshot {
            pe_ratio: Some(14.0),
            roe: Some(0.15),
            debt_equity: Some(1.0),
            revenue_growth: Some(0.0),
            ..Default::default()
        };

        // 2 + 1 = 3
        let signal = FundamentalModel::new().analyze(&snapshot);
        assert_eq!(signal.direction, Direction::Long);
        assert!((signal.confidence - 0.74).abs() < 1e-9);
    }
}
