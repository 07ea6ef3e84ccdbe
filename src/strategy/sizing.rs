//! Risk-based sizing
//!
//! Stop-loss from ATR, take-profit from a reward multiple, and position size
//! from a fixed fraction of capital at risk. All calculators are pure.

use serde::{Deserialize, Serialize};

use crate::models::Direction;

/// Sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Hard cap on a single position as a fraction of the portfolio
    pub max_position_pct: f64,
    /// Stop distance in ATRs
    pub atr_multiplier: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            max_position_pct: 0.25,
            atr_multiplier: 2.0,
        }
    }
}

/// Risk sizing model
#[derive(Debug, Clone)]
pub struct RiskSizingModel {
    config: SizingConfig,
}

impl RiskSizingModel {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SizingConfig {
        &self.config
    }

    /// Position size in currency: the smaller of the hard cap and the size
    /// that loses `risk_per_trade` of the portfolio when stopped out
    pub fn calculate_position_size(
        &self,
        portfolio_value: f64,
        risk_per_trade: f64,
        stop_loss_pct: f64,
    ) -> f64 {
        let max_position = portfolio_value * self.config.max_position_pct;
        if stop_loss_pct <= 0.0 {
            return max_position.max(0.0);
        }
        let risk_based = (portfolio_value * risk_per_trade) / stop_loss_pct;
        max_position.min(risk_based).max(0.0)
    }

    /// Stop-loss `atr_multiplier` ATRs away from entry, on the losing side
    pub fn calculate_stop_loss(&self, entry: f64, direction: Direction, atr: f64) -> f64 {
        let distance = atr.abs() * self.config.atr_multiplier;
        match direction {
            Direction::Long => entry - distance,
            Direction::Short => entry + distance,
            Direction::Neutral => entry,
        }
    }

    /// Take-profit at `risk_reward` times the stop distance, on the winning side
    pub fn calculate_take_profit(
        &self,
        entry: f64,
        stop_loss: f64,
        direction: Direction,
        risk_reward: f64,
    ) -> f64 {
        let reward = (entry - stop_loss).abs() * risk_reward;
        match direction {
            Direction::Long => entry + reward,
            Direction::Short => entry - reward,
            Direction::Neutral => entry,
        }
    }

    /// Build the full stop/target/size plan for an entry
    pub fn plan(
        &self,
        entry: f64,
        direction: Direction,
        atr: f64,
        portfolio_value: f64,
        risk_per_trade: f64,
        risk_reward: f64,
    ) -> RiskPlan {
        let stop_loss = self.calculate_stop_loss(entry, direction, atr);
        let take_profit = self.calculate_take_profit(entry, stop_loss, direction, risk_reward);

        let stop_loss_pct = if entry > 0.0 {
            (entry - stop_loss).abs() / entry
        } else {
            0.0
        };

        let position_size = self.calculate_position_size(portfolio_value, risk_per_trade, stop_loss_pct);
        let size_pct = if portfolio_value > 0.0 {
            position_size / portfolio_value
        } else {
            0.0
        };

        RiskPlan {
            entry,
            stop_loss,
            take_profit,
            stop_loss_pct,
            risk_reward,
            position_size,
            size_pct,
        }
    }
}

impl Default for RiskSizingModel {
    fn default() -> Self {
        Self::new(SizingConfig::default())
    }
}

/// Stops, target and size derived for one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPlan {
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub stop_loss_pct: f64,
    pub risk_reward: f64,
    /// Position size in currency
    pub position_size: f64,
    /// Position size as a fraction of the portfolio
    pub size_pct: f64,
}

impl std::fmt::Display for RiskPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Risk Plan:")?;
        writeln!(f, "  Entry: {:.2}", self.entry)?;
        writeln!(f, "  Stop loss: {:.2} ({:.2}%)", self.stop_loss, self.stop_loss_pct * 100.0)?;
        writeln!(f, "  Take profit: {:.2} (R:R {:.1})", self.take_profit, self.risk_reward)?;
        write!(f, "  Size: {:.2} ({:.2}% of portfolio)", self.position_size, self.size_pct * 100.0)
    }
}
