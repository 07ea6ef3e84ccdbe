//! Signal models
//!
//! Each model turns a [`MarketSnapshot`] into a directional [`Signal`] by summing
//! integer rule scores and mapping the total to a direction and confidence.
//! Models are combined by the consensus engine in `strategy::consensus`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::market::MarketSnapshot;

pub mod fundamental;
pub mod sentiment;
pub mod technical;

pub use fundamental::FundamentalModel;
pub use sentiment::SentimentModel;
pub use technical::TechnicalModel;

/// Capacity of each model's own accuracy buffer
pub const MODEL_HISTORY_CAPACITY: usize = 100;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    /// All directions, in tie-break order
    pub const ALL: [Direction; 3] = [Direction::Long, Direction::Short, Direction::Neutral];

    /// Returns true for LONG or SHORT
    pub fn is_directional(&self) -> bool {
        !matches!(self, Direction::Neutral)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
            Direction::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Which model produced a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Technical,
    Fundamental,
    Sentiment,
}

impl SignalSource {
    pub const ALL: [SignalSource; 3] = [
        SignalSource::Technical,
        SignalSource::Fundamental,
        SignalSource::Sentiment,
    ];
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Technical => write!(f, "technical"),
            SignalSource::Fundamental => write!(f, "fundamental"),
            SignalSource::Sentiment => write!(f, "sentiment"),
        }
    }
}

/// A directional opinion from one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Confidence in this signal (0.0 to 1.0)
    pub confidence: f64,
    pub source: SignalSource,
    /// Human-readable explanation
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Create a new signal
    pub fn new(
        direction: Direction,
        confidence: f64,
        source: SignalSource,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            source,
            reasoning: reasoning.into(),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (conf: {:.2}) - {}",
            self.source, self.direction, self.confidence, self.reasoning
        )
    }
}

/// Thresholds that turn an integer score into a direction and confidence
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScoreMapping {
    pub long_at: i32,
    pub short_at: i32,
    pub base: f64,
    pub step: f64,
    pub cap: f64,
    pub neutral_confidence: f64,
}

impl ScoreMapping {
    pub fn map(&self, score: i32) -> (Direction, f64) {
        if score >= self.long_at {
            let confidence = (self.base + f64::from(score) * self.step).min(self.cap);
            (Direction::Long, confidence)
        } else if score <= self.short_at {
            let confidence = (self.base + f64::from(score.abs()) * self.step).min(self.cap);
            (Direction::Short, confidence)
        } else {
            (Direction::Neutral, self.neutral_confidence)
        }
    }
}

/// Fixed-capacity accuracy buffer; the oldest sample is evicted on overflow
#[derive(Debug, Clone)]
pub struct AccuracyHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl AccuracyHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, accuracy: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(accuracy);
    }

    /// Mean accuracy, or `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }
}

/// Trait for signal models
///
/// `analyze` is pure with respect to scoring; the accuracy history is only
/// bookkeeping for later weight adjustment.
pub trait SignalModel: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &'static str;

    /// What the model looks at
    fn specialty(&self) -> &'static str;

    /// Tag stamped on every signal this model emits
    fn source(&self) -> SignalSource;

    /// Produce a signal for a snapshot
    fn analyze(&self, snapshot: &MarketSnapshot) -> Signal;

    fn accuracy_history(&self) -> &AccuracyHistory;

    fn record_accuracy(&mut self, accuracy: f64);

    /// Identity and track record for display
    fn profile(&self) -> ModelProfile {
        ModelProfile {
            name: self.name(),
            specialty: self.specialty(),
            source: self.source(),
            mean_accuracy: self.accuracy_history().mean(),
        }
    }
}

/// Display summary of a model
#[derive(Debug, Clone, Serialize)]
pub struct ModelProfile {
    pub name: &'static str,
    pub specialty: &'static str,
    pub source: SignalSource,
    pub mean_accuracy: Option<f64>,
}
