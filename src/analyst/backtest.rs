//! Market backtester
//!
//! Drives the full propose, approve, simulate and close cycle over random
//! snapshots. Throttling limits are relaxed for the run and restored when it
//! ends, however it ends.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::AiAnalyst;
use crate::analytics::PerformanceMetrics;
use crate::market::random_snapshot;
use crate::models::Direction;
use crate::strategy::TradeLimits;

/// Share of consensus confidence that becomes the simulated win probability
const WIN_PROBABILITY_FACTOR: f64 = 0.8;

/// Simulated fill of one proposal
#[derive(Debug, Clone, Serialize)]
pub struct TradeOutcome {
    pub proposal_id: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub exit_price: f64,
    pub win: bool,
}

/// One simulated market step
#[derive(Debug, Clone, Serialize)]
pub struct BacktestIteration {
    pub iteration: usize,
    pub consensus: Direction,
    pub confidence: f64,
    pub trading_allowed: bool,
    pub outcome: Option<TradeOutcome>,
}

/// Result of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct BacktestSummary {
    pub ticker: String,
    pub iterations: usize,
    pub proposals: usize,
    pub wins: usize,
    pub losses: usize,
    /// Analyst metrics after the run, including any earlier trades
    pub metrics: PerformanceMetrics,
}

/// Market backtester
pub struct MarketBacktester {
    analyst: Arc<AiAnalyst>,
    rng: StdRng,
    history: Vec<BacktestIteration>,
}

impl MarketBacktester {
    /// Create a backtester; a seed makes the run reproducible
    pub fn new(analyst: Arc<AiAnalyst>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            analyst,
            rng,
            history: Vec::new(),
        }
    }

    pub fn analyst(&self) -> &Arc<AiAnalyst> {
        &self.analyst
    }

    /// Every iteration run so far, across simulations
    pub fn history(&self) -> &[BacktestIteration] {
        &self.history
    }

    /// Run `iterations` synthetic trading steps for `ticker`
    pub fn run_simulation(&mut self, ticker: &str, iterations: usize) -> BacktestSummary {
        info!(ticker = %ticker, iterations = iterations, "Starting backtest simulation");

        let analyst = Arc::clone(&self.analyst);
        let relaxed = TradeLimits {
            cooldown_seconds: 0,
            max_trades_per_day: u32::try_from(iterations.saturating_add(10)).unwrap_or(u32::MAX),
        };
        let _limits = analyst.relax_trade_limits(relaxed);

        let mut summary = BacktestSummary {
            ticker: ticker.to_string(),
            iterations,
            proposals: 0,
            wins: 0,
            losses: 0,
            metrics: PerformanceMetrics::default(),
        };

        for i in 0..iterations {
            let snapshot = random_snapshot(&mut self.rng);
            let analysis = analyst.analyze_stock(ticker, &snapshot);

            let outcome = analyst
                .generate_trade_proposal(ticker, &snapshot)
                .map(|proposal| {
                    analyst.approve_proposal(&proposal.id);

                    let win_probability = (proposal.confidence * WIN_PROBABILITY_FACTOR).min(1.0);
                    let win = self.rng.gen::<f64>() < win_probability;
                    let exit_price = if win {
                        proposal.take_profit
                    } else {
                        proposal.stop_loss
                    };

                    analyst.close_trade(&proposal.id, exit_price);

                    TradeOutcome {
                        proposal_id: proposal.id,
                        direction: proposal.direction,
                        entry_price: proposal.entry_price,
                        exit_price,
                        win,
                    }
                });

            if let Some(outcome) = &outcome {
                summary.proposals += 1;
                if outcome.win {
                    summary.wins += 1;
                } else {
                    summary.losses += 1;
                }
            }

            self.history.push(BacktestIteration {
                iteration: i + 1,
                consensus: analysis.consensus.direction,
                confidence: analysis.consensus.confidence,
                trading_allowed: analysis.trading_allowed,
                outcome,
            });

            if (i + 1) % 5 == 0 {
                info!("Processed {}/{} iterations", i + 1, iterations);
            }
        }

        summary.metrics = analyst.performance_metrics();

        info!(
            ticker = %ticker,
            proposals = summary.proposals,
            wins = summary.wins,
            losses = summary.losses,
            "Simulation complete"
        );
        summary
    }
}
