//! Shared types for the consensus strategy
//!
//! Proposals, consensus verdicts and model weights passed between the
//! consensus engine, the risk manager and the analyst.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Direction, Signal, SignalSource};

/// Minimum agreement for an actionable consensus (2 of 3 models)
pub const MIN_STRENGTH: f64 = 0.66;

/// Minimum overall confidence for an actionable consensus
pub const MIN_CONFIDENCE: f64 = 0.5;

/// Relative weight of each model in the consensus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelWeights {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            technical: 0.40,
            fundamental: 0.35,
            sentiment: 0.25,
        }
    }
}

impl ModelWeights {
    pub fn get(&self, source: SignalSource) -> f64 {
        match source {
            SignalSource::Technical => self.technical,
            SignalSource::Fundamental => self.fundamental,
            SignalSource::Sentiment => self.sentiment,
        }
    }

    pub fn set(&mut self, source: SignalSource, weight: f64) {
        match source {
            SignalSource::Technical => self.technical = weight,
            SignalSource::Fundamental => self.fundamental = weight,
            SignalSource::Sentiment => self.sentiment = weight,
        }
    }

    pub fn total(&self) -> f64 {
        self.technical + self.fundamental + self.sentiment
    }

    /// Weights scaled to sum to 1; unchanged if the sum is not positive
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 {
            return *self;
        }
        Self {
            technical: self.technical / total,
            fundamental: self.fundamental / total,
            sentiment: self.sentiment / total,
        }
    }
}

/// Accumulated weighted confidence per direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionScores {
    pub long: f64,
    pub short: f64,
    pub neutral: f64,
}

impl DirectionScores {
    pub fn get(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Long => self.long,
            Direction::Short => self.short,
            Direction::Neutral => self.neutral,
        }
    }

    pub fn add(&mut self, direction: Direction, value: f64) {
        match direction {
            Direction::Long => self.long += value,
            Direction::Short => self.short += value,
            Direction::Neutral => self.neutral += value,
        }
    }

    /// Highest-scoring direction; ties go to the earlier of LONG, SHORT, NEUTRAL
    pub fn best(&self) -> (Direction, f64) {
        let mut best = (Direction::Long, self.long);
        for direction in [Direction::Short, Direction::Neutral] {
            let score = self.get(direction);
            if score > best.1 {
                best = (direction, score);
            }
        }
        best
    }
}

/// Weighted verdict across all models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub direction: Direction,
    /// Winning score divided by the total weight
    pub confidence: f64,
    /// Fraction of models agreeing with the winning direction
    pub strength: f64,
    pub scores: DirectionScores,
    /// One signal per model, in model order
    pub signals: Vec<Signal>,
    pub is_actionable: bool,
}

impl ConsensusResult {
    /// Number of models whose direction matches the verdict
    pub fn agreeing_models(&self) -> usize {
        self.signals
            .iter()
            .filter(|s| s.direction == self.direction)
            .count()
    }

    /// e.g. "2/3 models agree"
    pub fn agreement(&self) -> String {
        format!("{}/{} models agree", self.agreeing_models(), self.signals.len())
    }
}

impl std::fmt::Display for ConsensusResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (conf: {:.1}%, {}){}",
            self.direction,
            self.confidence * 100.0,
            self.agreement(),
            if self.is_actionable { " ACTIONABLE" } else { "" }
        )
    }
}

/// Currency P&L of a position of `size` moved from `entry` to `exit`
pub fn directional_pnl(direction: Direction, entry: f64, exit: f64, size: f64) -> f64 {
    if entry <= 0.0 {
        return 0.0;
    }
    match direction {
        Direction::Long => (exit - entry) * size / entry,
        Direction::Short => (entry - exit) * size / entry,
        Direction::Neutral => 0.0,
    }
}

/// Proposal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Executed,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Pending => write!(f, "pending"),
            ProposalStatus::Approved => write!(f, "approved"),
            ProposalStatus::Rejected => write!(f, "rejected"),
            ProposalStatus::Executed => write!(f, "executed"),
        }
    }
}

/// A sized trade idea awaiting approval or already executed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeProposal {
    pub id: String,
    pub ticker: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Size as a fraction of the portfolio
    pub size_pct: f64,
    pub risk_reward: f64,
    pub confidence: f64,
    pub signals: Vec<Signal>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

impl TradeProposal {
    /// Realized P&L in currency for a position of `notional` closed at `exit_price`
    pub fn realized_pnl(&self, exit_price: f64, notional: f64) -> f64 {
        directional_pnl(self.direction, self.entry_price, exit_price, notional)
    }

    /// Time held since creation, in hours
    pub fn hold_duration_hours(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now - self.created_at;
        (elapsed.num_milliseconds() as f64 / 3_600_000.0).max(0.0)
    }
}

impl std::fmt::Display for TradeProposal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} @ {:.2} | TP {:.2} | SL {:.2} | size {:.2}% | conf {:.1}% [{}]",
            self.id,
            self.ticker,
            self.direction,
            self.entry_price,
            self.take_profit,
            self.stop_loss,
            self.size_pct * 100.0,
            self.confidence * 100.0,
            self.status
        )
    }
}
