//! Consensus Engine
//!
//! Runs every signal model over a snapshot, weighs their confidence per
//! direction and turns an actionable verdict into a sized trade proposal.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::sizing::{RiskSizingModel, SizingConfig};
use super::types::{
    ConsensusResult, DirectionScores, ModelWeights, ProposalStatus, TradeProposal, MIN_CONFIDENCE,
    MIN_STRENGTH,
};
use crate::market::MarketSnapshot;
use crate::models::{
    AccuracyHistory, FundamentalModel, SentimentModel, SignalModel, SignalSource, TechnicalModel,
};

/// Accuracy assumed for a model with no recorded history
const DEFAULT_ACCURACY: f64 = 0.5;

/// Configuration for the consensus engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub weights: ModelWeights,
    /// Fraction of the portfolio lost if the stop is hit
    pub risk_per_trade: f64,
    pub risk_reward: f64,
    pub atr_multiplier: f64,
    pub max_position_pct: f64,
    /// Accuracy samples kept per model for weight adaptation
    pub performance_window: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            weights: ModelWeights::default(),
            risk_per_trade: 0.02,
            risk_reward: 2.0,
            atr_multiplier: 2.0,
            max_position_pct: 0.25,
            performance_window: 50,
        }
    }
}

/// Consensus Engine
pub struct ConsensusEngine {
    config: ConsensusConfig,
    models: Vec<Box<dyn SignalModel>>,
    weights: ModelWeights,
    performance: HashMap<SignalSource, AccuracyHistory>,
    sizer: RiskSizingModel,
}

impl ConsensusEngine {
    /// Create an engine with the technical, fundamental and sentiment models
    pub fn new(config: ConsensusConfig) -> Self {
        let models: Vec<Box<dyn SignalModel>> = vec![
            Box::new(TechnicalModel::new()),
            Box::new(FundamentalModel::new()),
            Box::new(SentimentModel::new()),
        ];

        let performance = SignalSource::ALL
            .iter()
            .map(|source| (*source, AccuracyHistory::new(config.performance_window)))
            .collect();

        let sizer = RiskSizingModel::new(SizingConfig {
            max_position_pct: config.max_position_pct,
            atr_multiplier: config.atr_multiplier,
        });

        Self {
            weights: config.weights,
            config,
            models,
            performance,
            sizer,
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn weights(&self) -> ModelWeights {
        self.weights
    }

    pub fn models(&self) -> impl Iterator<Item = &dyn SignalModel> {
        self.models.iter().map(|m| m.as_ref())
    }

    /// Recent accuracy samples used for weighting
    pub fn performance(&self, source: SignalSource) -> Option<&AccuracyHistory> {
        self.performance.get(&source)
    }

    /// Combine all model signals into one verdict
    pub fn analyze(&self, snapshot: &MarketSnapshot) -> ConsensusResult {
        let signals: Vec<_> = self
            .models
            .iter()
            .map(|model| {
                let signal = model.analyze(snapshot);
                debug!(model = model.name(), "{}", signal);
                signal
            })
            .collect();

        let mut scores = DirectionScores::default();
        for signal in &signals {
            scores.add(signal.direction, signal.confidence * self.weights.get(signal.source));
        }

        let (direction, best_score) = scores.best();

        let total_weight = self.weights.total();
        let confidence = if total_weight > 0.0 {
            best_score / total_weight
        } else {
            0.0
        };

        let agreeing = signals.iter().filter(|s| s.direction == direction).count();
        let strength = if signals.is_empty() {
            0.0
        } else {
            agreeing as f64 / signals.len() as f64
        };

        let is_actionable =
            direction.is_directional() && confidence > MIN_CONFIDENCE && strength >= MIN_STRENGTH;

        let result = ConsensusResult {
            direction,
            confidence,
            strength,
            scores,
            signals,
            is_actionable,
        };
        debug!("Consensus: {}", result);
        result
    }

    /// Build a pending proposal when the consensus is actionable
    pub fn generate_proposal(
        &self,
        ticker: &str,
        snapshot: &MarketSnapshot,
        portfolio_value: f64,
    ) -> Option<TradeProposal> {
        let consensus = self.analyze(snapshot);
        if !consensus.is_actionable {
            return None;
        }

        let entry = snapshot.price();
        let plan = self.sizer.plan(
            entry,
            consensus.direction,
            snapshot.atr(),
            portfolio_value,
            self.config.risk_per_trade,
            self.config.risk_reward,
        );

        Some(TradeProposal {
            id: format!("prop_{}_{}", ticker, Uuid::new_v4().simple()),
            ticker: ticker.to_string(),
            direction: consensus.direction,
            entry_price: entry,
            take_profit: plan.take_profit,
            stop_loss: plan.stop_loss,
            size_pct: plan.size_pct,
            risk_reward: plan.risk_reward,
            confidence: consensus.confidence,
            signals: consensus.signals,
            status: ProposalStatus::Pending,
            created_at: chrono::Utc::now(),
        })
    }

    /// Fold new per-model accuracy into the weights
    ///
    /// Each weight becomes the model's mean recent accuracy, normalized across
    /// models. Models without history count as 0.5.
    pub fn update_model_weights(&mut self, accuracy_by_model: &HashMap<SignalSource, f64>) {
        for (source, accuracy) in accuracy_by_model {
            if let Some(history) = self.performance.get_mut(source) {
                history.push(*accuracy);
            }
            if let Some(model) = self.models.iter_mut().find(|m| m.source() == *source) {
                model.record_accuracy(*accuracy);
            }
        }

        let mut recent = ModelWeights {
            technical: 0.0,
            fundamental: 0.0,
            sentiment: 0.0,
        };
        for source in SignalSource::ALL {
            let mean = self
                .performance
                .get(&source)
                .and_then(|h| h.mean())
                .unwrap_or(DEFAULT_ACCURACY);
            recent.set(source, mean);
        }

        if recent.total() > 0.0 {
            self.weights = recent.normalized();
        }

        debug!(
            technical = self.weights.technical,
            fundamental = self.weights.fundamental,
            sentiment = self.weights.sentiment,
            "Model weights updated"
        );
    }
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(ConsensusConfig::default())
    }
}

impl std::fmt::Debug for ConsensusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusEngine")
            .field("weights", &self.weights)
            .field("models", &self.models.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{random_snapshot, AnalystRating, InsiderActivity};
    use crate::models::Direction;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bullish_snapshot() -> MarketSnapshot {
        MarketSnapshot {
            price: Some(110.0),
            sma_20: Some(105.0),
            sma_50: Some(100.0),
            rsi: Some(25.0),
            macd: Some(1.0),
            pe_ratio: Some(12.0),
            roe: Some(0.25),
            debt_equity: Some(0.3),
            revenue_growth: Some(0.20),
            news_sentiment: Some(0.6),
            social_sentiment: Some(0.7),
            analyst_rating: Some(AnalystRating::Buy),
            insider_activity: Some(InsiderActivity::Buying),
            ..Default::default()
        }
    }

    #[test]
    fn test_unanimous_long() {
        let engine = ConsensusEngine::default();
        let result = engine.analyze(&bullish_snapshot());

        // 0.9 * 0.40 + 0.85 * 0.35 + 0.8 * 0.25
        assert_eq!(result.direction, Direction::Long);
        assert!((result.confidence - 0.8575).abs() < 1e-9);
        assert_eq!(result.strength, 1.0);
        assert!(result.is_actionable);
        assert_eq!(result.agreement(), "3/3 models agree");
        assert_eq!(result.signals.len(), 3);
        assert_eq!(result.signals[0].source, SignalSource::Technical);
    }

    #[test]
    fn test_two_of_three_is_actionable() {
        let snapshot = MarketSnapshot {
            news_sentiment: None,
            social_sentiment: None,
            analyst_rating: None,
            insider_activity: None,
            ..bullish_snapshot()
        };

        let result = ConsensusEngine::default().analyze(&snapshot);
        assert_eq!(result.direction, Direction::Long);
        assert!((result.strength - 2.0 / 3.0).abs() < 1e-9);
        assert!((result.confidence - 0.6575).abs() < 1e-9);
        assert!(result.is_actionable);
    }

    #[test]
    fn test_lone_signal_not_actionable() {
        // Technical LONG 0.7, the others neutral
        let result = ConsensusEngine::default().analyze(&MarketSnapshot::default());
        assert_eq!(result.direction, Direction::Long);
        assert!((result.confidence - 0.28).abs() < 1e-9);
        assert!((result.scores.neutral - 0.215).abs() < 1e-9);
        assert!(!result.is_actionable);
        assert_eq!(result.agreement(), "1/3 models agree");
    }

    #[test]
    fn test_proposal_from_actionable_consensus() {
        let engine = ConsensusEngine::default();
        let proposal = engine
            .generate_proposal("AAPL", &bullish_snapshot(), 100_000.0)
            .expect("actionable");

        // ATR defaults to 2% of price: 2.2, stop 2 ATRs below entry
        assert!(proposal.id.starts_with("prop_AAPL_"));
        assert_eq!(proposal.status, ProposalStatus::Pending);
        assert!((proposal.stop_loss - 105.6).abs() < 1e-9);
        assert!((proposal.take_profit - 118.8).abs() < 1e-9);
        // 2% risk over a 4% stop is 50%, capped at 25%
        assert!((proposal.size_pct - 0.25).abs() < 1e-9);
        assert_eq!(proposal.signals.len(), 3);
    }

    #[test]
    fn test_no_proposal_without_consensus() {
        let engine = ConsensusEngine::default();
        assert!(engine
            .generate_proposal("MSFT", &MarketSnapshot::default(), 100_000.0)
            .is_none());
    }

    #[test]
    fn test_proposal_ids_unique() {
        let engine = ConsensusEngine::default();
        let a = engine.generate_proposal("AAPL", &bullish_snapshot(), 100_000.0).unwrap();
        let b = engine.generate_proposal("AAPL", &bullish_snapshot(), 100_000.0).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_update_model_weights() {
        let mut engine = ConsensusEngine::default();
        let accuracy = HashMap::from([
            (SignalSource::Technical, 0.8),
            (SignalSource::Fundamental, 0.6),
            (SignalSource::Sentiment, 0.6),
        ]);
        engine.update_model_weights(&accuracy);

        let weights = engine.weights();
        assert!((weights.technical - 0.4).abs() < 1e-9);
        assert!((weights.fundamental - 0.3).abs() < 1e-9);
        assert!((weights.total() - 1.0).abs() < 1e-9);

        let technical = engine.models().find(|m| m.source() == SignalSource::Technical).unwrap();
        assert_eq!(technical.accuracy_history().len(), 1);
    }

    #[test]
    fn test_missing_history_defaults_to_half() {
        let mut engine = ConsensusEngine::default();
        engine.update_model_weights(&HashMap::from([(SignalSource::Technical, 0.9)]));

        // 0.9 / (0.9 + 0.5 + 0.5)
        let weights = engine.weights();
        assert!((weights.technical - 0.9 / 1.9).abs() < 1e-9);
        assert!((weights.sentiment - 0.5 / 1.9).abs() < 1e-9);
        assert!(engine.performance(SignalSource::Sentiment).unwrap().is_empty());
    }

    #[test]
    fn test_performance_window_bounded() {
        let mut engine = ConsensusEngine::default();
        for i in 0..60 {
            let accuracy = if i < 10 { 0.0 } else { 1.0 };
            engine.update_model_weights(&HashMap::from([(SignalSource::Technical, accuracy)]));
        }
        let history = engine.performance(SignalSource::Technical).unwrap();
        assert_eq!(history.len(), 50);
        assert_eq!(history.mean(), Some(1.0));
    }

    #[test]
    fn test_actionable_implies_thresholds() {
        let engine = ConsensusEngine::default();
        let mut rng = StdRng::seed_from_u64(2024);

        for _ in 0..500 {
            let result = engine.analyze(&random_snapshot(&mut rng));
            assert!((0.0..=1.0).contains(&result.confidence));
            for signal in &result.signals {
                assert!((0.0..=1.0).contains(&signal.confidence));
            }
            if result.is_actionable {
                assert!(result.strength >= 0.66);
                assert!(result.confidence > 0.5);
                assert_ne!(result.direction, Direction::Neutral);
            }
        }
    }
}
