//! Performance analytics
//!
//! Append-only ledger of closed trades. Metrics are recomputed from the ledger
//! on every call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Direction;
use crate::strategy::directional_pnl;

pub mod report;

pub use report::render_report;

/// Annualization factor for per-trade returns
const TRADING_DAYS: f64 = 252.0;

/// A closed trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub entry: f64,
    pub exit: f64,
    pub direction: Direction,
    /// Position size in currency
    pub size: f64,
    pub pnl: f64,
    /// P&L as a fraction of size
    pub pnl_pct: f64,
    pub duration_hours: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate trading metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Trades that did not make money, including flat ones
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub total_return_pct: f64,
    pub win_rate: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough drop of cumulative returns, as a fraction
    pub max_drawdown: f64,
    pub avg_trade_duration: f64,
    pub biggest_win: f64,
    pub biggest_loss: f64,
}

/// Performance analytics
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalytics {
    records: Vec<PerformanceRecord>,
}

impl PerformanceAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a closed trade and return its realized P&L
    pub fn record_trade(
        &mut self,
        entry: f64,
        exit: f64,
        direction: Direction,
        size: f64,
        duration_hours: f64,
    ) -> f64 {
        let pnl = directional_pnl(direction, entry, exit, size);
        let pnl_pct = if size != 0.0 { pnl / size } else { 0.0 };

        self.records.push(PerformanceRecord {
            entry,
            exit,
            direction,
            size,
            pnl,
            pnl_pct,
            duration_hours,
            timestamp: Utc::now(),
        });

        pnl
    }

    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-trade returns in close order
    pub fn returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.pnl_pct)
    }

    /// Calculate all metrics
    pub fn calculate_metrics(&self) -> PerformanceMetrics {
        if self.records.is_empty() {
            return PerformanceMetrics::default();
        }

        let total_trades = self.records.len();
        let winning_trades = self.records.iter().filter(|r| r.pnl > 0.0).count();
        let total_pnl: f64 = self.records.iter().map(|r| r.pnl).sum();
        let total_size: f64 = self.records.iter().map(|r| r.size).sum();

        let total_return_pct = if total_size != 0.0 {
            total_pnl / total_size * 100.0
        } else {
            0.0
        };

        let avg_trade_duration =
            self.records.iter().map(|r| r.duration_hours).sum::<f64>() / total_trades as f64;

        let biggest_win = self
            .records
            .iter()
            .map(|r| r.pnl)
            .fold(f64::NEG_INFINITY, f64::max);
        let biggest_loss = self
            .records
            .iter()
            .map(|r| r.pnl)
            .fold(f64::INFINITY, f64::min);

        let returns: Vec<f64> = self.returns().collect();

        PerformanceMetrics {
            total_trades,
            winning_trades,
            losing_trades: total_trades - winning_trades,
            total_pnl,
            total_return_pct,
            win_rate: winning_trades as f64 / total_trades as f64,
            sharpe_ratio: sharpe_ratio(&returns),
            max_drawdown: max_drawdown(&returns),
            avg_trade_duration,
            biggest_win,
            biggest_loss,
        }
    }

    /// Fixed-width report stamped with the current time
    pub fn generate_report(&self) -> String {
        render_report(&self.calculate_metrics(), Utc::now())
    }
}

/// Annualized Sharpe ratio of per-trade returns (population std)
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();

    if std > 0.0 {
        mean / std * TRADING_DAYS.sqrt()
    } else {
        0.0
    }
}

/// Largest drop of the running sum of returns below its running peak
///
/// The peak starts at the first cumulative value, not at zero.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in returns {
        cumulative += r;
        peak = peak.max(cumulative);
        worst = worst.max(peak - cumulative);
    }

    worst
}
